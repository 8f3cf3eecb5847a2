mod articles;
mod comments;
mod projects;
mod statistics;
mod tags;

pub(crate) use articles::*;
pub(crate) use comments::*;
pub(crate) use projects::*;
pub(crate) use statistics::*;
pub(crate) use tags::*;

use std::{str::FromStr, time::Duration};

use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode},
    Sqlite, Transaction,
};

// how long a connection waits for another writer before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const CREATE_TABLE_ARTICLES_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS articles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    excerpt TEXT,
    read_time INTEGER NOT NULL DEFAULT 5,
    view_count INTEGER NOT NULL DEFAULT 0 CHECK (view_count >= 0),
    like_count INTEGER NOT NULL DEFAULT 0 CHECK (like_count >= 0),
    comment_count INTEGER NOT NULL DEFAULT 0 CHECK (comment_count >= 0),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    is_published BOOLEAN NOT NULL DEFAULT TRUE,
    program_name TEXT
);
"#;

const CREATE_INDEX_ARTICLES_CREATED_AT_SQL: &str =
    "CREATE INDEX IF NOT EXISTS idx_articles_created_at ON articles (created_at);";

const CREATE_TABLE_TAGS_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS tags (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);
"#;

const CREATE_TABLE_ARTICLE_TAGS_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS article_tags (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    article_id INTEGER NOT NULL REFERENCES articles (id),
    tag_id INTEGER NOT NULL REFERENCES tags (id),
    UNIQUE (article_id, tag_id)
);
"#;

const CREATE_TABLE_COMMENTS_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS comments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    article_id INTEGER NOT NULL REFERENCES articles (id),
    author_name TEXT NOT NULL,
    author_email TEXT,
    content TEXT NOT NULL,
    created_at TEXT NOT NULL,
    is_approved BOOLEAN NOT NULL DEFAULT TRUE
);
"#;

const CREATE_TABLE_PROJECTS_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS projects (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    description TEXT,
    image_url TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#;

const CREATE_TABLE_PROJECT_ARTICLES_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS project_articles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id INTEGER NOT NULL REFERENCES projects (id),
    article_id INTEGER NOT NULL REFERENCES articles (id),
    UNIQUE (project_id, article_id)
);
"#;

pub fn connect_options(url: &str) -> Result<SqliteConnectOptions, sqlx::Error> {
    Ok(SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT))
}

/// Begins a transaction holding the write lock from the start, so that concurrent
/// writers wait on the busy timeout instead of failing on a lock upgrade.
pub(crate) async fn begin_write(
    db: &sqlx::SqlitePool,
) -> Result<Transaction<'static, Sqlite>, sqlx::Error> {
    db.begin_with("BEGIN IMMEDIATE").await
}

pub async fn create_tables(db: &sqlx::SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(CREATE_TABLE_ARTICLES_SQL).execute(db).await?;
    sqlx::query(CREATE_INDEX_ARTICLES_CREATED_AT_SQL)
        .execute(db)
        .await?;
    sqlx::query(CREATE_TABLE_TAGS_SQL).execute(db).await?;
    sqlx::query(CREATE_TABLE_ARTICLE_TAGS_SQL).execute(db).await?;
    sqlx::query(CREATE_TABLE_COMMENTS_SQL).execute(db).await?;
    sqlx::query(CREATE_TABLE_PROJECTS_SQL).execute(db).await?;
    sqlx::query(CREATE_TABLE_PROJECT_ARTICLES_SQL)
        .execute(db)
        .await?;
    Ok(())
}

// An in-memory database with the tables created. A single connection is kept alive
// for the lifetime of the pool since every new in-memory connection is a new database.
#[cfg(test)]
pub(crate) async fn test_pool() -> sqlx::SqlitePool {
    let db = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    create_tables(&db).await.unwrap();
    db
}

// A database file in a temporary directory, shared by several pooled connections so
// that concurrent callers really run side by side. The directory lives as long as the
// returned guard.
#[cfg(test)]
pub(crate) async fn test_file_pool(connections: u32) -> (sqlx::SqlitePool, tempfile::TempDir) {
    let dir = tempfile::TempDir::new().unwrap();
    let url = format!("sqlite://{}", dir.path().join("blog.db").display());
    let db = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(connections)
        .connect_with(connect_options(&url).unwrap())
        .await
        .unwrap();
    create_tables(&db).await.unwrap();
    (db, dir)
}
