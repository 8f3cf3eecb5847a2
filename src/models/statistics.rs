use serde::Serialize;
use tracing::info;

use crate::Error;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LikeAction {
    #[default]
    Like,
    Unlike,
}

impl LikeAction {
    // anything but an explicit "unlike" counts as a like.
    pub fn parse(action: Option<&str>) -> Self {
        match action.map(str::trim) {
            Some(action) if action.eq_ignore_ascii_case("unlike") => Self::Unlike,
            _ => Self::Like,
        }
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct LikeResult {
    pub like_count: i64,
    pub action: LikeAction,
}

// The counters are updated in place so that concurrent requests on the same article
// never lose an increment.
pub struct Statistics;

impl Statistics {
    pub async fn increment_view_count(db: &sqlx::SqlitePool, article_id: i64) -> Result<i64, Error> {
        let view_count: Option<i64> = sqlx::query_scalar(
            "UPDATE articles SET view_count = view_count + 1 WHERE id = ? RETURNING view_count",
        )
        .bind(article_id)
        .fetch_optional(db)
        .await?;

        view_count.ok_or_else(|| Error::NotFound(format!("article {}", article_id)))
    }

    pub async fn toggle_like(
        db: &sqlx::SqlitePool,
        article_id: i64,
        action: LikeAction,
    ) -> Result<LikeResult, Error> {
        let sql = match action {
            LikeAction::Like => {
                "UPDATE articles SET like_count = like_count + 1 WHERE id = ? RETURNING like_count"
            }
            // never goes below zero.
            LikeAction::Unlike => {
                "UPDATE articles SET like_count = MAX(like_count - 1, 0) WHERE id = ? RETURNING like_count"
            }
        };
        let like_count: Option<i64> = sqlx::query_scalar(sql)
            .bind(article_id)
            .fetch_optional(db)
            .await?;
        let like_count =
            like_count.ok_or_else(|| Error::NotFound(format!("article {}", article_id)))?;
        info!(
            "applied {:?} to article {}, like count is now {}",
            action, article_id, like_count
        );

        Ok(LikeResult { like_count, action })
    }
}
