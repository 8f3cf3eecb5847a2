use serde::Deserialize;

use crate::error::Error;

const DEFAULT_PER_PAGE: u32 = 5;
const DEFAULT_SEARCH_PER_PAGE: u32 = 10;
const DEFAULT_MAX_PER_PAGE: u32 = 100;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Clone, Debug, Deserialize)]
struct Deploy {
    host: String,
    port: u16,
}

#[derive(Clone, Debug, Deserialize)]
struct Database {
    connection_url: String,
    max_connections: Option<u32>,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct Pagination {
    per_page: Option<u32>,
    search_per_page: Option<u32>,
    max_per_page: Option<u32>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    deploy: Deploy,
    database: Database,
    #[serde(default)]
    pagination: Pagination,
}

impl Config {
    pub fn new(path: &str) -> Result<Self, Error> {
        let config_content = std::fs::read_to_string(path)?;
        Self::parse(&config_content)
    }

    pub fn parse(content: &str) -> Result<Self, Error> {
        let config: Self = toml::from_str(content).map_err(Error::Toml)?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        // check the deployment config.
        if self.deploy.host.is_empty() || self.deploy.port == 0 {
            return Err(Error::ConfigValidation(
                "invalid deployment config, please specify the host and port".to_string(),
            ));
        }
        // check the database config.
        if self.database.connection_url.trim().is_empty() {
            return Err(Error::ConfigValidation(
                "invalid database config, please specify the connection URL".to_string(),
            ));
        }
        if self.database.max_connections == Some(0) {
            return Err(Error::ConfigValidation(
                "invalid database config, max_connections must be positive".to_string(),
            ));
        }
        // check the pagination config.
        let pagination = &self.pagination;
        if [
            pagination.per_page,
            pagination.search_per_page,
            pagination.max_per_page,
        ]
        .contains(&Some(0))
        {
            return Err(Error::ConfigValidation(
                "invalid pagination config, page sizes must be positive".to_string(),
            ));
        }

        Ok(())
    }

    // get the server URL according to the config, this will be used to run the server.
    pub fn server_url(&self) -> String {
        format!("{}:{}", self.deploy.host, self.deploy.port)
    }

    pub fn database_url(&self) -> &str {
        &self.database.connection_url
    }

    pub fn max_connections(&self) -> u32 {
        self.database
            .max_connections
            .unwrap_or(DEFAULT_MAX_CONNECTIONS)
    }

    pub fn per_page(&self) -> u32 {
        self.pagination.per_page.unwrap_or(DEFAULT_PER_PAGE)
    }

    pub fn search_per_page(&self) -> u32 {
        self.pagination
            .search_per_page
            .unwrap_or(DEFAULT_SEARCH_PER_PAGE)
    }

    pub fn max_per_page(&self) -> u32 {
        self.pagination.max_per_page.unwrap_or(DEFAULT_MAX_PER_PAGE)
    }
}

#[cfg(test)]
mod tests {
    use super::Config;
    use crate::Error;

    const MINIMAL: &str = r#"
[deploy]
host = "127.0.0.1"
port = 5000

[database]
connection_url = "sqlite::memory:"
"#;

    #[test]
    fn test_defaults() {
        let config = Config::parse(MINIMAL).unwrap();
        assert_eq!(config.server_url(), "127.0.0.1:5000");
        assert_eq!(config.database_url(), "sqlite::memory:");
        assert_eq!(config.max_connections(), 5);
        assert_eq!(config.per_page(), 5);
        assert_eq!(config.search_per_page(), 10);
        assert_eq!(config.max_per_page(), 100);
    }

    #[test]
    fn test_pagination_overrides() {
        let content = format!("{MINIMAL}\n[pagination]\nper_page = 8\nmax_per_page = 20\n");
        let config = Config::parse(&content).unwrap();
        assert_eq!(config.per_page(), 8);
        assert_eq!(config.search_per_page(), 10);
        assert_eq!(config.max_per_page(), 20);
    }

    #[test]
    fn test_validate() {
        let bad_port = MINIMAL.replace("5000", "0");
        assert!(matches!(
            Config::parse(&bad_port),
            Err(Error::ConfigValidation(_))
        ));

        let bad_url = MINIMAL.replace("sqlite::memory:", " ");
        assert!(matches!(
            Config::parse(&bad_url),
            Err(Error::ConfigValidation(_))
        ));

        let zero_page = format!("{MINIMAL}\n[pagination]\nsearch_per_page = 0\n");
        assert!(matches!(
            Config::parse(&zero_page),
            Err(Error::ConfigValidation(_))
        ));

        assert!(matches!(Config::parse("[deploy]"), Err(Error::Toml(_))));
    }
}
