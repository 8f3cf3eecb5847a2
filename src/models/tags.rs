use std::collections::HashMap;

use serde::Serialize;
use sqlx::{prelude::FromRow, QueryBuilder, Sqlite, SqliteConnection, SqliteExecutor};

use crate::{utils::normalize_tags, Error};

pub const TOP_TAG_LIMIT: i64 = 8;

/// A tag together with the number of articles it is attached to.
#[derive(Debug, FromRow, Serialize, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub count: i64,
}

impl Tag {
    // only published articles count, a tag used by drafts alone is not listed.
    pub async fn get_top_with_count(db: &sqlx::SqlitePool, limit: i64) -> Result<Vec<Self>, Error> {
        sqlx::query_as(
            "SELECT t.name, COUNT(a.id) AS count
             FROM tags AS t
             JOIN article_tags AS at ON at.tag_id = t.id
             JOIN articles AS a ON a.id = at.article_id AND a.is_published = 1
             GROUP BY t.id
             ORDER BY count DESC, t.id ASC
             LIMIT ?",
        )
        .bind(limit)
        .fetch_all(db)
        .await
        .map_err(|e| e.into())
    }

    /// Returns the id of the tag called `name`, creating it first if needed.
    ///
    /// The insert relies on the unique constraint on `tags.name`, so concurrent callers
    /// racing on the same new name all end up with the single row that won.
    pub async fn get_or_create(conn: &mut SqliteConnection, name: &str) -> Result<i64, Error> {
        sqlx::query("INSERT INTO tags (name) VALUES (?) ON CONFLICT (name) DO NOTHING")
            .bind(name)
            .execute(&mut *conn)
            .await?;
        sqlx::query_scalar("SELECT id FROM tags WHERE name = ?")
            .bind(name)
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| e.into())
    }

    // Attach the tags to the article, keeping the given order as the link order.
    pub async fn attach_to_article<S: AsRef<str>>(
        conn: &mut SqliteConnection,
        article_id: i64,
        tags: &[S],
    ) -> Result<(), Error> {
        for name in normalize_tags(tags) {
            let tag_id = Self::get_or_create(conn, &name).await?;
            sqlx::query(
                "INSERT INTO article_tags (article_id, tag_id) VALUES (?, ?)
                 ON CONFLICT (article_id, tag_id) DO NOTHING",
            )
            .bind(article_id)
            .bind(tag_id)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }

    pub async fn detach_from_article(conn: &mut SqliteConnection, article_id: i64) -> Result<(), Error> {
        sqlx::query("DELETE FROM article_tags WHERE article_id = ?")
            .bind(article_id)
            .execute(conn)
            .await
            .map_err(|e| e.into())
            .map(|_| ())
    }

    pub async fn get_names_for_article(
        db: impl SqliteExecutor<'_>,
        article_id: i64,
    ) -> Result<Vec<String>, Error> {
        sqlx::query_scalar(
            "SELECT t.name
             FROM article_tags AS at
             INNER JOIN tags AS t ON t.id = at.tag_id
             WHERE at.article_id = ?
             ORDER BY at.id",
        )
        .bind(article_id)
        .fetch_all(db)
        .await
        .map_err(|e| e.into())
    }

    /// Looks up the tag names of many articles with a single query.
    ///
    /// Names are listed in link order. Articles without tags are absent from the map.
    pub async fn get_names_for_articles(
        db: impl SqliteExecutor<'_>,
        article_ids: &[i64],
    ) -> Result<HashMap<i64, Vec<String>>, Error> {
        if article_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT at.article_id, t.name
             FROM article_tags AS at
             INNER JOIN tags AS t ON t.id = at.tag_id
             WHERE at.article_id IN (",
        );
        let mut separated = builder.separated(", ");
        for article_id in article_ids {
            separated.push_bind(*article_id);
        }
        separated.push_unseparated(") ORDER BY at.id");

        let rows: Vec<(i64, String)> = builder.build_query_as().fetch_all(db).await?;
        Ok(rows
            .into_iter()
            .fold(HashMap::new(), |mut acc, (article_id, name)| {
                acc.entry(article_id).or_insert_with(Vec::new).push(name);
                acc
            }))
    }
}
