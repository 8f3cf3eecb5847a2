use std::sync::Arc;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use sqlx::sqlite::SqlitePoolOptions;
use tower_http::trace::{self, TraceLayer};
use tracing::{info, Level};

use crate::{
    config::Config,
    error::Error,
    handlers::{
        handler_404, handler_add_project_article, handler_all_articles, handler_archives,
        handler_article, handler_articles, handler_comments, handler_create_article,
        handler_create_comment, handler_create_project, handler_delete_article,
        handler_delete_comment, handler_delete_project, handler_hot_articles, handler_like,
        handler_ping, handler_project, handler_projects, handler_remove_project_article,
        handler_search, handler_tags, handler_update_article, handler_update_project,
        handler_view,
    },
    models::{connect_options, create_tables},
};

const CONFIG_FILE_PATH: &str = "config.toml";
const CONFIG_FILE_ENV: &str = "BLOG_CONFIG";

// AppState is used to pass the global states to the handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub db: sqlx::SqlitePool,
}

impl AppState {
    pub async fn new() -> Result<Self, Error> {
        let config_path =
            std::env::var(CONFIG_FILE_ENV).unwrap_or_else(|_| CONFIG_FILE_PATH.to_string());
        info!("parsing config file {}", config_path);
        let config = Config::new(&config_path)?;

        info!("connecting to the database");
        let db = SqlitePoolOptions::new()
            .max_connections(config.max_connections())
            .connect_with(connect_options(config.database_url())?)
            .await?;
        info!("initializing the database");
        // create the tables if they don't exist.
        create_tables(&db).await?;

        Ok(Self { config, db })
    }
}

pub struct App {
    state: AppState,
}

impl App {
    pub async fn new() -> Result<Self, Error> {
        Ok(Self {
            state: AppState::new().await?,
        })
    }

    pub fn router(state: AppState) -> Router {
        let article_router = Router::new()
            .route("/get-page", get(handler_articles))
            .route("/all-articles", get(handler_all_articles))
            .route("/single/:id", get(handler_article))
            .route("/create", post(handler_create_article))
            .route("/hot-articles", get(handler_hot_articles))
            .route("/archives", get(handler_archives))
            .route("/search", get(handler_search))
            .route("/update/:id", put(handler_update_article))
            .route("/delete/:id", delete(handler_delete_article));

        let comment_router = Router::new()
            .route("/get-all/:article_id", get(handler_comments))
            .route("/create/:article_id", post(handler_create_comment))
            .route("/delete/:comment_id", delete(handler_delete_comment));

        let statistic_router = Router::new()
            .route("/:article_id/view", post(handler_view))
            .route("/:article_id/like", post(handler_like));

        let program_router = Router::new()
            .route("/get-all", get(handler_projects))
            .route("/single/:id", get(handler_project))
            .route("/create", post(handler_create_project))
            .route("/update/:id", put(handler_update_project))
            .route("/delete/:id", delete(handler_delete_project))
            .route("/:id/add-article", post(handler_add_project_article))
            .route(
                "/:id/remove-article/:article_id",
                delete(handler_remove_project_article),
            );

        Router::new()
            .fallback(handler_404)
            .nest("/article", article_router)
            .nest("/comment", comment_router)
            .nest("/statistic", statistic_router)
            .nest("/program", program_router)
            .route("/other/tag", get(handler_tags))
            .route("/ping", get(handler_ping))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                    .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
            )
            .with_state(Arc::new(state))
    }

    pub async fn serve(&self) -> Result<(), Error> {
        let app = Self::router(self.state.clone());

        let listener = tokio::net::TcpListener::bind(self.state.config.server_url()).await?;
        info!("listening on {}", listener.local_addr()?);
        axum::serve(listener, app).await?;

        Ok(())
    }
}
