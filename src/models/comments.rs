use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use tracing::info;

use crate::{
    models::{begin_write, Article},
    utils::serialize_datetime,
    Error,
};

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Comment {
    pub id: i64,
    #[serde(skip)]
    pub article_id: i64,
    pub author_name: String,
    pub author_email: Option<String>,
    pub content: String,
    #[serde(serialize_with = "serialize_datetime")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NewComment {
    #[serde(default)]
    pub author_name: String,
    pub author_email: Option<String>,
    #[serde(default)]
    pub content: String,
}

impl NewComment {
    fn validate(&self) -> Result<(), Error> {
        if self.author_name.trim().is_empty() {
            return Err(Error::Validation("comment author name is required".to_string()));
        }
        if self.content.trim().is_empty() {
            return Err(Error::Validation("comment content is required".to_string()));
        }
        Ok(())
    }
}

impl Comment {
    // newest first, every comment is approved on creation.
    pub async fn get_by_article(db: &sqlx::SqlitePool, article_id: i64) -> Result<Vec<Self>, Error> {
        sqlx::query_as(
            "SELECT id, article_id, author_name, author_email, content, created_at
             FROM comments
             WHERE article_id = ? AND is_approved = 1
             ORDER BY created_at DESC, id DESC",
        )
        .bind(article_id)
        .fetch_all(db)
        .await
        .map_err(|e| e.into())
    }

    /// Stores the comment and bumps the article's comment count in the same transaction.
    pub async fn insert(
        db: &sqlx::SqlitePool,
        article_id: i64,
        comment: &NewComment,
    ) -> Result<i64, Error> {
        comment.validate()?;

        let mut tx = begin_write(db).await?;

        if Article::get_by_id(&mut *tx, article_id).await?.is_none() {
            return Err(Error::NotFound(format!("article {}", article_id)));
        }
        let id = sqlx::query(
            "INSERT INTO comments (article_id, author_name, author_email, content, created_at, is_approved)
             VALUES (?, ?, ?, ?, ?, 1)",
        )
        .bind(article_id)
        .bind(comment.author_name.trim())
        .bind(comment.author_email.as_deref().map(str::trim).filter(|email| !email.is_empty()))
        .bind(&comment.content)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();
        sqlx::query("UPDATE articles SET comment_count = comment_count + 1 WHERE id = ?")
            .bind(article_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        info!("inserted comment {} for article {}", id, article_id);

        Ok(id)
    }

    /// Removes the comment and decrements the article's comment count in the same transaction.
    pub async fn delete(db: &sqlx::SqlitePool, id: i64) -> Result<(), Error> {
        let mut tx = begin_write(db).await?;

        let article_id: i64 = sqlx::query_scalar("SELECT article_id FROM comments WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| Error::NotFound(format!("comment {}", id)))?;
        sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE articles SET comment_count = MAX(comment_count - 1, 0) WHERE id = ?")
            .bind(article_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        info!("deleted comment {} of article {}", id, article_id);

        Ok(())
    }
}
