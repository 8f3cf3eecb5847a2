use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, QueryBuilder, Sqlite, SqliteConnection, SqliteExecutor};
use tracing::{info, warn};

use crate::{
    models::{begin_write, Article},
    utils::serialize_date,
    Error,
};

#[derive(Debug, Clone, FromRow)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LinkedArticle {
    pub id: i64,
    pub title: String,
    pub excerpt: Option<String>,
    #[serde(serialize_with = "serialize_date")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ProjectDetail {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    #[serde(serialize_with = "serialize_date")]
    pub created_at: DateTime<Utc>,
    #[serde(serialize_with = "serialize_date")]
    pub updated_at: DateTime<Utc>,
    pub article_count: usize,
    pub articles: Vec<LinkedArticle>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NewProject {
    #[serde(default)]
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub article_ids: Option<Vec<i64>>,
}

/// A partial update. A supplied `article_ids` list, even an empty one, replaces every link.
#[derive(Debug, Default, Deserialize)]
pub struct ProjectUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub article_ids: Option<Vec<i64>>,
}

fn validate_name(name: &str) -> Result<(), Error> {
    if name.trim().is_empty() {
        return Err(Error::Validation("project name is required".to_string()));
    }
    Ok(())
}

impl Project {
    fn into_detail(self, articles: Vec<LinkedArticle>) -> ProjectDetail {
        ProjectDetail {
            id: self.id,
            name: self.name,
            description: self.description,
            image_url: self.image_url,
            created_at: self.created_at,
            updated_at: self.updated_at,
            article_count: articles.len(),
            articles,
        }
    }

    pub async fn get_by_id(db: impl SqliteExecutor<'_>, id: i64) -> Result<Option<Self>, Error> {
        sqlx::query_as("SELECT * FROM projects WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await
            .map_err(|e| e.into())
    }

    async fn get_existing(conn: &mut SqliteConnection, id: i64) -> Result<Self, Error> {
        Self::get_by_id(conn, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("project {}", id)))
    }

    /// Lists every project with its articles, resolved with one batched query.
    pub async fn get_all(db: &sqlx::SqlitePool) -> Result<Vec<ProjectDetail>, Error> {
        let projects: Vec<Self> =
            sqlx::query_as("SELECT * FROM projects ORDER BY created_at DESC, id DESC")
                .fetch_all(db)
                .await?;
        if projects.is_empty() {
            return Ok(vec![]);
        }

        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT pa.project_id, a.id, a.title, a.excerpt, a.created_at
             FROM project_articles AS pa
             INNER JOIN articles AS a ON a.id = pa.article_id
             WHERE pa.project_id IN (",
        );
        let mut separated = builder.separated(", ");
        for project in &projects {
            separated.push_bind(project.id);
        }
        separated.push_unseparated(") ORDER BY a.created_at DESC, a.id DESC");
        let rows: Vec<(i64, i64, String, Option<String>, DateTime<Utc>)> =
            builder.build_query_as().fetch_all(db).await?;

        let mut articles = rows.into_iter().fold(
            HashMap::new(),
            |mut acc: HashMap<i64, Vec<LinkedArticle>>, (project_id, id, title, excerpt, created_at)| {
                acc.entry(project_id).or_default().push(LinkedArticle {
                    id,
                    title,
                    excerpt,
                    created_at,
                });
                acc
            },
        );

        Ok(projects
            .into_iter()
            .map(|project| {
                let linked = articles.remove(&project.id).unwrap_or_default();
                project.into_detail(linked)
            })
            .collect())
    }

    pub async fn get_detail(db: &sqlx::SqlitePool, id: i64) -> Result<ProjectDetail, Error> {
        let project = Self::get_by_id(db, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("project {}", id)))?;
        let articles = sqlx::query_as(
            "SELECT a.id, a.title, a.excerpt, a.created_at
             FROM project_articles AS pa
             INNER JOIN articles AS a ON a.id = pa.article_id
             WHERE pa.project_id = ?
             ORDER BY a.created_at DESC, a.id DESC",
        )
        .bind(id)
        .fetch_all(db)
        .await?;

        Ok(project.into_detail(articles))
    }

    pub async fn insert(db: &sqlx::SqlitePool, project: &NewProject) -> Result<i64, Error> {
        validate_name(&project.name)?;
        let now = Utc::now();

        let mut tx = begin_write(db).await?;

        let id = sqlx::query(
            "INSERT INTO projects (name, description, image_url, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(project.name.trim())
        .bind(&project.description)
        .bind(&project.image_url)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();
        if let Some(article_ids) = &project.article_ids {
            let created = Self::get_existing(&mut tx, id).await?;
            created.link_articles(&mut tx, article_ids).await?;
        }

        tx.commit().await?;
        info!("inserted project {} with id {}", project.name, id);

        Ok(id)
    }

    pub async fn update(db: &sqlx::SqlitePool, id: i64, update: &ProjectUpdate) -> Result<(), Error> {
        if let Some(name) = &update.name {
            validate_name(name)?;
        }

        let mut tx = begin_write(db).await?;

        let mut project = Self::get_existing(&mut tx, id).await?;
        let old_name = project.name.clone();
        if let Some(name) = &update.name {
            project.name = name.trim().to_string();
        }
        if let Some(description) = &update.description {
            project.description = Some(description.clone());
        }
        if let Some(image_url) = &update.image_url {
            project.image_url = Some(image_url.clone());
        }
        sqlx::query(
            "UPDATE projects SET name = ?, description = ?, image_url = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&project.name)
        .bind(&project.description)
        .bind(&project.image_url)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *tx)
        .await?;
        // keep the cached project name of the linked articles in sync with a rename.
        if project.name != old_name {
            sqlx::query(
                "UPDATE articles SET program_name = ?
                 WHERE program_name = ?
                 AND id IN (SELECT article_id FROM project_articles WHERE project_id = ?)",
            )
            .bind(&project.name)
            .bind(&old_name)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }
        if let Some(article_ids) = &update.article_ids {
            project.unlink_all(&mut tx).await?;
            project.link_articles(&mut tx, article_ids).await?;
        }

        tx.commit().await?;
        info!("updated project {} with id {}", project.name, id);

        Ok(())
    }

    pub async fn delete(db: &sqlx::SqlitePool, id: i64) -> Result<(), Error> {
        let mut tx = begin_write(db).await?;

        let project = Self::get_existing(&mut tx, id).await?;
        project.unlink_all(&mut tx).await?;
        sqlx::query("DELETE FROM projects WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        info!("deleted project {} with id {}", project.name, id);

        Ok(())
    }

    pub async fn add_article(db: &sqlx::SqlitePool, project_id: i64, article_id: i64) -> Result<(), Error> {
        let mut tx = begin_write(db).await?;

        let project = Self::get_existing(&mut tx, project_id).await?;
        let article = Article::get_by_id(&mut *tx, article_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("article {}", article_id)))?;
        project.link_article(&mut tx, &article).await?;

        tx.commit().await?;
        info!("added article {} to project {}", article_id, project_id);

        Ok(())
    }

    pub async fn remove_article(
        db: &sqlx::SqlitePool,
        project_id: i64,
        article_id: i64,
    ) -> Result<(), Error> {
        let mut tx = begin_write(db).await?;

        let project = Self::get_existing(&mut tx, project_id).await?;
        let removed = sqlx::query("DELETE FROM project_articles WHERE project_id = ? AND article_id = ?")
            .bind(project_id)
            .bind(article_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if removed == 0 {
            return Err(Error::NotFound(format!(
                "link between project {} and article {}",
                project_id, article_id
            )));
        }
        // only clear the cached name if it still points at this project.
        sqlx::query("UPDATE articles SET program_name = NULL WHERE id = ? AND program_name = ?")
            .bind(article_id)
            .bind(&project.name)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        info!("removed article {} from project {}", article_id, project_id);

        Ok(())
    }

    // An article belongs to at most one project at a time.
    async fn link_article(&self, conn: &mut SqliteConnection, article: &Article) -> Result<(), Error> {
        let claimed_elsewhere = match &article.program_name {
            Some(program_name) => program_name != &self.name,
            None => false,
        };
        let linked_elsewhere: Option<i64> = sqlx::query_scalar(
            "SELECT project_id FROM project_articles WHERE article_id = ? AND project_id != ? LIMIT 1",
        )
        .bind(article.id)
        .bind(self.id)
        .fetch_optional(&mut *conn)
        .await?;
        if claimed_elsewhere || linked_elsewhere.is_some() {
            warn!("refused to link {} to project {}", article, self.id);
            return Err(Error::Conflict(format!(
                "article {} already belongs to another project",
                article.id
            )));
        }

        let inserted = sqlx::query(
            "INSERT INTO project_articles (project_id, article_id) VALUES (?, ?)
             ON CONFLICT (project_id, article_id) DO NOTHING",
        )
        .bind(self.id)
        .bind(article.id)
        .execute(&mut *conn)
        .await?
        .rows_affected();
        if inserted == 0 {
            return Err(Error::Conflict(format!(
                "article {} is already linked to project {}",
                article.id, self.id
            )));
        }
        sqlx::query("UPDATE articles SET program_name = ? WHERE id = ?")
            .bind(&self.name)
            .bind(article.id)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }

    // ids that do not resolve to an article are skipped.
    async fn link_articles(&self, conn: &mut SqliteConnection, article_ids: &[i64]) -> Result<(), Error> {
        let mut seen = HashSet::new();
        for article_id in article_ids.iter().filter(|id| seen.insert(**id)) {
            match Article::get_by_id(&mut *conn, *article_id).await? {
                Some(article) => self.link_article(conn, &article).await?,
                None => warn!("skipped missing article {} for project {}", article_id, self.id),
            }
        }
        Ok(())
    }

    async fn unlink_all(&self, conn: &mut SqliteConnection) -> Result<(), Error> {
        sqlx::query(
            "UPDATE articles SET program_name = NULL
             WHERE program_name = ?
             AND id IN (SELECT article_id FROM project_articles WHERE project_id = ?)",
        )
        .bind(&self.name)
        .bind(self.id)
        .execute(&mut *conn)
        .await?;
        sqlx::query("DELETE FROM project_articles WHERE project_id = ?")
            .bind(self.id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }
}
