use std::{
    collections::{BTreeMap, HashMap},
    fmt::{self, Display},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, QueryBuilder, Sqlite, SqliteExecutor};
use tracing::{debug, info};

use crate::{
    models::{begin_write, Tag},
    utils::{like_pattern, serialize_date, ArchiveMonth, PageRequest},
    Error,
};

pub const HOT_ARTICLE_LIMIT: i64 = 4;
pub const DEFAULT_READ_TIME: i64 = 5;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub read_time: i64,
    pub view_count: i64,
    pub like_count: i64,
    pub comment_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_published: bool,
    pub program_name: Option<String>,
}

/// The list representation of an article, without its content.
#[derive(Debug, Clone, Serialize)]
pub struct ArticleSummary {
    pub id: i64,
    pub title: String,
    pub excerpt: Option<String>,
    pub read_time: i64,
    pub view_count: i64,
    pub like_count: i64,
    pub comment_count: i64,
    #[serde(serialize_with = "serialize_date")]
    pub created_at: DateTime<Utc>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArticleDetail {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub read_time: i64,
    #[serde(serialize_with = "serialize_date")]
    pub created_at: DateTime<Utc>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, FromRow, Serialize, PartialEq, Eq)]
pub struct HotArticle {
    pub id: i64,
    pub title: String,
    pub view_count: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Archive {
    pub date: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct ArticlePage {
    pub articles: Vec<ArticleSummary>,
    pub total: i64,
    pub pages: i64,
    pub current_page: i64,
}

impl ArticlePage {
    fn empty(page: &PageRequest) -> Self {
        Self {
            articles: vec![],
            total: 0,
            pages: 0,
            current_page: page.page,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ArticleFilter {
    pub tag: Option<String>,
    pub archive: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NewArticle {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub excerpt: Option<String>,
    pub read_time: Option<i64>,
    pub is_published: Option<bool>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// A partial update, only the supplied fields change.
#[derive(Debug, Default, Deserialize)]
pub struct ArticleUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub read_time: Option<i64>,
    pub is_published: Option<bool>,
    pub tags: Option<Vec<String>>,
}

fn validate_fields(
    title: Option<&str>,
    content: Option<&str>,
    read_time: Option<i64>,
) -> Result<(), Error> {
    if title.is_some_and(|title| title.trim().is_empty()) {
        return Err(Error::Validation("article title is required".to_string()));
    }
    if content.is_some_and(|content| content.trim().is_empty()) {
        return Err(Error::Validation("article content is required".to_string()));
    }
    if read_time.is_some_and(|read_time| read_time < 0) {
        return Err(Error::Validation(
            "article read time must not be negative".to_string(),
        ));
    }
    Ok(())
}

// A listing filter with the archive token already resolved into a month range.
struct ListingFilter<'a> {
    tag: Option<&'a str>,
    range: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

impl<'a> ListingFilter<'a> {
    // `None` means the filter can never match, e.g. a malformed archive token.
    fn resolve(filter: &'a ArticleFilter) -> Option<Self> {
        let tag = filter.tag.as_deref().filter(|tag| !tag.is_empty());
        let range = match filter.archive.as_deref().filter(|archive| !archive.is_empty()) {
            Some(archive) => {
                let month = ArchiveMonth::parse(archive)?;
                debug!("filtering articles by archive month {}", month.key());
                Some(month.bounds()?)
            }
            None => None,
        };
        Some(Self { tag, range })
    }

    fn push_to(&self, builder: &mut QueryBuilder<'a, Sqlite>) {
        if let Some(tag) = self.tag {
            builder
                .push(
                    " INNER JOIN article_tags AS at ON at.article_id = a.id
                      INNER JOIN tags AS t ON t.id = at.tag_id AND t.name = ",
                )
                .push_bind(tag);
        }
        builder.push(" WHERE a.is_published = 1");
        if let Some((start, end)) = self.range {
            builder
                .push(" AND a.created_at >= ")
                .push_bind(start)
                .push(" AND a.created_at < ")
                .push_bind(end);
        }
    }
}

fn push_search_predicate<'a>(builder: &mut QueryBuilder<'a, Sqlite>, pattern: &'a str) {
    builder
        .push(" WHERE a.is_published = 1 AND (LOWER(a.title) LIKE ")
        .push_bind(pattern)
        .push(
            r" ESCAPE '\' OR EXISTS (
                SELECT 1 FROM article_tags AS at
                INNER JOIN tags AS t ON t.id = at.tag_id
                WHERE at.article_id = a.id AND LOWER(t.name) LIKE ",
        )
        .push_bind(pattern)
        .push(r" ESCAPE '\'))");
}

impl Article {
    pub async fn get_by_id(db: impl SqliteExecutor<'_>, id: i64) -> Result<Option<Self>, Error> {
        sqlx::query_as("SELECT * FROM articles WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await
            .map_err(|e| e.into())
    }

    pub async fn get_detail(db: &sqlx::SqlitePool, id: i64) -> Result<ArticleDetail, Error> {
        let article = match Self::get_by_id(db, id).await? {
            Some(article) if article.is_published => article,
            _ => return Err(Error::NotFound(format!("article {}", id))),
        };
        let tags = Tag::get_names_for_article(db, id).await?;

        Ok(ArticleDetail {
            id: article.id,
            title: article.title,
            content: article.content,
            excerpt: article.excerpt,
            read_time: article.read_time,
            created_at: article.created_at,
            tags,
        })
    }

    pub async fn get_on_page(
        db: &sqlx::SqlitePool,
        filter: &ArticleFilter,
        page: &PageRequest,
    ) -> Result<ArticlePage, Error> {
        let Some(filter) = ListingFilter::resolve(filter) else {
            return Ok(ArticlePage::empty(page));
        };

        let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM articles AS a");
        filter.push_to(&mut builder);
        let total: i64 = builder.build_query_scalar().fetch_one(db).await?;

        let mut builder = QueryBuilder::new("SELECT a.* FROM articles AS a");
        filter.push_to(&mut builder);
        builder
            .push(" ORDER BY a.created_at DESC, a.id DESC LIMIT ")
            .push_bind(page.per_page)
            .push(" OFFSET ")
            .push_bind(page.offset());
        let articles: Vec<Self> = builder.build_query_as().fetch_all(db).await?;

        Ok(ArticlePage {
            articles: Self::summarize(db, articles).await?,
            total,
            pages: page.total_pages(total),
            current_page: page.page,
        })
    }

    pub async fn get_all_published(db: &sqlx::SqlitePool) -> Result<Vec<ArticleSummary>, Error> {
        let articles = sqlx::query_as(
            "SELECT * FROM articles WHERE is_published = 1 ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(db)
        .await?;
        Self::summarize(db, articles).await
    }

    /// Matches the query as a substring of the title or of any tag name.
    ///
    /// An article matching both ways is listed once. Results are ordered newest first
    /// so that slicing into pages is stable across calls.
    pub async fn search(
        db: &sqlx::SqlitePool,
        query: &str,
        page: &PageRequest,
    ) -> Result<ArticlePage, Error> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(ArticlePage::empty(page));
        }
        let pattern = like_pattern(query);

        let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM articles AS a");
        push_search_predicate(&mut builder, &pattern);
        let total: i64 = builder.build_query_scalar().fetch_one(db).await?;

        let mut builder = QueryBuilder::new("SELECT a.* FROM articles AS a");
        push_search_predicate(&mut builder, &pattern);
        builder
            .push(" ORDER BY a.created_at DESC, a.id DESC LIMIT ")
            .push_bind(page.per_page)
            .push(" OFFSET ")
            .push_bind(page.offset());
        let articles: Vec<Self> = builder.build_query_as().fetch_all(db).await?;

        Ok(ArticlePage {
            articles: Self::summarize(db, articles).await?,
            total,
            pages: page.total_pages(total),
            current_page: page.page,
        })
    }

    // ties on the view count keep the insertion order.
    pub async fn get_hot(db: &sqlx::SqlitePool) -> Result<Vec<HotArticle>, Error> {
        sqlx::query_as(
            "SELECT id, title, view_count FROM articles
             WHERE is_published = 1
             ORDER BY view_count DESC, id ASC
             LIMIT ?",
        )
        .bind(HOT_ARTICLE_LIMIT)
        .fetch_all(db)
        .await
        .map_err(|e| e.into())
    }

    pub async fn get_archives(db: &sqlx::SqlitePool) -> Result<Vec<Archive>, Error> {
        let dates: Vec<DateTime<Utc>> =
            sqlx::query_scalar("SELECT created_at FROM articles WHERE is_published = 1")
                .fetch_all(db)
                .await?;
        let counts = dates.iter().fold(BTreeMap::new(), |mut acc, created_at| {
            *acc.entry(ArchiveMonth::of(created_at).label()).or_insert(0) += 1;
            acc
        });

        Ok(counts
            .into_iter()
            .rev()
            .map(|(date, count)| Archive { date, count })
            .collect())
    }

    // attach the tags to the articles with one batched lookup.
    async fn summarize(
        db: &sqlx::SqlitePool,
        articles: Vec<Self>,
    ) -> Result<Vec<ArticleSummary>, Error> {
        let ids = articles.iter().map(|article| article.id).collect::<Vec<_>>();
        let mut tags: HashMap<i64, Vec<String>> = Tag::get_names_for_articles(db, &ids).await?;

        Ok(articles
            .into_iter()
            .map(|article| ArticleSummary {
                tags: tags.remove(&article.id).unwrap_or_default(),
                id: article.id,
                title: article.title,
                excerpt: article.excerpt,
                read_time: article.read_time,
                view_count: article.view_count,
                like_count: article.like_count,
                comment_count: article.comment_count,
                created_at: article.created_at,
            })
            .collect())
    }

    pub async fn insert(db: &sqlx::SqlitePool, article: &NewArticle) -> Result<i64, Error> {
        validate_fields(
            Some(article.title.as_str()),
            Some(article.content.as_str()),
            article.read_time,
        )?;
        let created_at = article.created_at.unwrap_or_else(Utc::now);

        let mut tx = begin_write(db).await?;

        // insert into the articles table
        let id = sqlx::query(
            "INSERT INTO articles (title, content, excerpt, read_time, is_published, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(article.title.trim())
        .bind(&article.content)
        .bind(&article.excerpt)
        .bind(article.read_time.unwrap_or(DEFAULT_READ_TIME))
        .bind(article.is_published.unwrap_or(true))
        .bind(created_at)
        .bind(created_at)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();
        // link the tags, creating the missing ones.
        Tag::attach_to_article(&mut tx, id, article.tags.as_slice()).await?;

        tx.commit().await?;
        info!("inserted article {} with id {}", article.title, id);

        Ok(id)
    }

    pub async fn update(db: &sqlx::SqlitePool, id: i64, update: &ArticleUpdate) -> Result<(), Error> {
        validate_fields(
            update.title.as_deref(),
            update.content.as_deref(),
            update.read_time,
        )?;

        let mut tx = begin_write(db).await?;

        let article = Self::get_by_id(&mut *tx, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("article {}", id)))?;
        sqlx::query(
            "UPDATE articles
             SET title = ?, content = ?, excerpt = ?, read_time = ?, is_published = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(update.title.as_deref().map_or(article.title.as_str(), str::trim))
        .bind(update.content.as_ref().unwrap_or(&article.content))
        .bind(update.excerpt.as_ref().or(article.excerpt.as_ref()))
        .bind(update.read_time.unwrap_or(article.read_time))
        .bind(update.is_published.unwrap_or(article.is_published))
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *tx)
        .await?;
        // replace the tag links only when a tag list is supplied.
        if let Some(tags) = &update.tags {
            Tag::detach_from_article(&mut tx, id).await?;
            Tag::attach_to_article(&mut tx, id, tags.as_slice()).await?;
            info!("replaced tags for article {} with {:?}", id, tags);
        }

        tx.commit().await?;
        info!("updated article {}", id);

        Ok(())
    }

    pub async fn delete(db: &sqlx::SqlitePool, id: i64) -> Result<(), Error> {
        let mut tx = begin_write(db).await?;

        let article = Self::get_by_id(&mut *tx, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("article {}", id)))?;
        // remove everything referencing the article before the article itself.
        for sql in [
            "DELETE FROM comments WHERE article_id = ?",
            "DELETE FROM project_articles WHERE article_id = ?",
        ] {
            sqlx::query(sql).bind(id).execute(&mut *tx).await?;
        }
        Tag::detach_from_article(&mut tx, id).await?;
        sqlx::query("DELETE FROM articles WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        info!("deleted {}", article);

        Ok(())
    }
}

impl Display for Article {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "article {}", self.id)?;
        if !self.title.is_empty() {
            write!(f, " <{}>", self.title)?;
        }
        if let Some(program_name) = &self.program_name {
            write!(f, " in project <{}>", program_name)?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashSet;

    use chrono::{DateTime, Duration, TimeZone, Utc};

    use super::{Archive, Article, ArticleFilter, ArticleUpdate, HotArticle, NewArticle};
    use crate::{models::test_pool, utils::PageRequest, Error};

    pub(crate) async fn create_article_at(
        db: &sqlx::SqlitePool,
        title: &str,
        tags: &[&str],
        created_at: DateTime<Utc>,
    ) -> i64 {
        Article::insert(
            db,
            &NewArticle {
                title: title.to_string(),
                content: format!("content of {}", title),
                tags: tags.iter().map(|tag| tag.to_string()).collect(),
                created_at: Some(created_at),
                ..Default::default()
            },
        )
        .await
        .unwrap()
    }

    fn day(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap() + Duration::days(n)
    }

    fn page(page: i64, per_page: i64) -> PageRequest {
        PageRequest::new(Some(page), Some(per_page), 5, 100)
    }

    #[tokio::test]
    async fn test_insert_and_get_detail() {
        let db = test_pool().await;
        let id = Article::insert(
            &db,
            &NewArticle {
                title: "  Hello  ".to_string(),
                content: "# Hello".to_string(),
                excerpt: Some("greeting".to_string()),
                tags: vec!["rust".to_string(), " web ".to_string(), "rust".to_string()],
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let article = Article::get_by_id(&db, id).await.unwrap().unwrap();
        assert_eq!(article.title, "Hello");
        assert_eq!(article.read_time, 5);
        assert_eq!(article.view_count, 0);
        assert_eq!(article.comment_count, 0);
        assert!(article.is_published);
        assert_eq!(article.program_name, None);

        let detail = Article::get_detail(&db, id).await.unwrap();
        assert_eq!(detail.content, "# Hello");
        assert_eq!(detail.excerpt.as_deref(), Some("greeting"));
        assert_eq!(detail.tags, vec!["rust", "web"]);

        assert!(matches!(
            Article::get_detail(&db, id + 1).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_insert_validation() {
        let db = test_pool().await;
        for article in [
            NewArticle {
                content: "content".to_string(),
                ..Default::default()
            },
            NewArticle {
                title: "title".to_string(),
                content: "  ".to_string(),
                ..Default::default()
            },
            NewArticle {
                title: "title".to_string(),
                content: "content".to_string(),
                read_time: Some(-1),
                ..Default::default()
            },
        ] {
            assert!(matches!(
                Article::insert(&db, &article).await,
                Err(Error::Validation(_))
            ));
        }
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles")
            .fetch_one(&db)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_pagination_completeness() {
        let db = test_pool().await;
        let mut expected = vec![];
        for i in 0..11 {
            expected.push(create_article_at(&db, &format!("article {}", i), &[], day(i)).await);
        }
        // created_at descending.
        expected.reverse();

        let mut seen = vec![];
        let first = Article::get_on_page(&db, &ArticleFilter::default(), &page(1, 4))
            .await
            .unwrap();
        assert_eq!(first.total, 11);
        assert_eq!(first.pages, 3);
        for n in 1..=first.pages {
            let result = Article::get_on_page(&db, &ArticleFilter::default(), &page(n, 4))
                .await
                .unwrap();
            assert_eq!(result.current_page, n);
            seen.extend(result.articles.into_iter().map(|article| article.id));
        }
        assert_eq!(seen, expected);

        // beyond the last page is empty, not an error.
        let beyond = Article::get_on_page(&db, &ArticleFilter::default(), &page(4, 4))
            .await
            .unwrap();
        assert!(beyond.articles.is_empty());
        assert_eq!(beyond.total, 11);
        assert_eq!(beyond.current_page, 4);
    }

    #[tokio::test]
    async fn test_unpublished_articles_are_hidden() {
        let db = test_pool().await;
        let visible = create_article_at(&db, "visible rust", &["rust"], day(0)).await;
        let hidden = Article::insert(
            &db,
            &NewArticle {
                title: "hidden rust".to_string(),
                content: "draft".to_string(),
                is_published: Some(false),
                tags: vec!["rust".to_string()],
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let listed = Article::get_on_page(&db, &ArticleFilter::default(), &page(1, 10))
            .await
            .unwrap();
        assert_eq!(listed.total, 1);
        assert_eq!(listed.articles[0].id, visible);

        let all = Article::get_all_published(&db).await.unwrap();
        assert_eq!(all.len(), 1);

        let found = Article::search(&db, "rust", &page(1, 10)).await.unwrap();
        assert_eq!(found.total, 1);

        assert!(matches!(
            Article::get_detail(&db, hidden).await,
            Err(Error::NotFound(_))
        ));
        assert_eq!(Article::get_hot(&db).await.unwrap().len(), 1);
        assert_eq!(Article::get_archives(&db).await.unwrap()[0].count, 1);
    }

    #[tokio::test]
    async fn test_filter_by_tag_and_archive() {
        let db = test_pool().await;
        let jan = Utc.with_ymd_and_hms(2025, 1, 31, 23, 59, 59).unwrap();
        let feb = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
        let a = create_article_at(&db, "a", &["rust", "web"], jan).await;
        let b = create_article_at(&db, "b", &["rust"], feb).await;
        let c = create_article_at(&db, "c", &["web"], feb).await;

        let by_tag = |tag: &str| ArticleFilter {
            tag: Some(tag.to_string()),
            archive: None,
        };
        let result = Article::get_on_page(&db, &by_tag("rust"), &page(1, 10))
            .await
            .unwrap();
        assert_eq!(
            result.articles.iter().map(|a| a.id).collect::<Vec<_>>(),
            vec![b, a]
        );
        assert_eq!(result.articles[1].tags, vec!["rust", "web"]);
        // exact match only.
        let result = Article::get_on_page(&db, &by_tag("rus"), &page(1, 10))
            .await
            .unwrap();
        assert_eq!(result.total, 0);

        let by_archive = |archive: &str| ArticleFilter {
            tag: None,
            archive: Some(archive.to_string()),
        };
        let result = Article::get_on_page(&db, &by_archive("2025年02月"), &page(1, 10))
            .await
            .unwrap();
        assert_eq!(
            result.articles.iter().map(|a| a.id).collect::<Vec<_>>(),
            vec![c, b]
        );
        let result = Article::get_on_page(&db, &by_archive("2025年1月"), &page(1, 10))
            .await
            .unwrap();
        assert_eq!(result.articles.iter().map(|a| a.id).collect::<Vec<_>>(), vec![a]);
        let result = Article::get_on_page(&db, &by_archive("not a month"), &page(1, 10))
            .await
            .unwrap();
        assert_eq!(result.total, 0);
        assert_eq!(result.pages, 0);

        let both = ArticleFilter {
            tag: Some("web".to_string()),
            archive: Some("2025年02月".to_string()),
        };
        let result = Article::get_on_page(&db, &both, &page(1, 10)).await.unwrap();
        assert_eq!(result.articles.iter().map(|a| a.id).collect::<Vec<_>>(), vec![c]);
    }

    #[tokio::test]
    async fn test_search_union() {
        let db = test_pool().await;
        let a = create_article_at(&db, "All about FOO", &["foo"], day(0)).await;
        let b = create_article_at(&db, "Something else", &["foobar"], day(1)).await;
        let _c = create_article_at(&db, "Unrelated", &["bar"], day(2)).await;

        let result = Article::search(&db, "foo", &page(1, 10)).await.unwrap();
        assert_eq!(result.total, 2);
        assert_eq!(result.pages, 1);
        assert_eq!(
            result.articles.iter().map(|a| a.id).collect::<Vec<_>>(),
            vec![b, a]
        );
        let ids = result.articles.iter().map(|a| a.id).collect::<HashSet<_>>();
        assert_eq!(ids.len(), 2);
        assert_eq!(result.articles[0].tags, vec!["foobar"]);

        let result = Article::search(&db, "foo", &page(2, 1)).await.unwrap();
        assert_eq!(result.total, 2);
        assert_eq!(result.pages, 2);
        assert_eq!(result.articles.len(), 1);
        assert_eq!(result.articles[0].id, a);

        let result = Article::search(&db, "   ", &page(1, 10)).await.unwrap();
        assert!(result.articles.is_empty());
        assert_eq!(result.total, 0);

        // wildcards are matched literally.
        let result = Article::search(&db, "%", &page(1, 10)).await.unwrap();
        assert_eq!(result.total, 0);
    }

    #[tokio::test]
    async fn test_hot_articles() {
        let db = test_pool().await;
        let mut ids = vec![];
        for i in 0..6 {
            ids.push(create_article_at(&db, &format!("hot {}", i), &[], day(i)).await);
        }
        for (id, views) in ids.iter().zip([3, 10, 0, 10, 7, 1]) {
            sqlx::query("UPDATE articles SET view_count = ? WHERE id = ?")
                .bind(views)
                .bind(id)
                .execute(&db)
                .await
                .unwrap();
        }

        let hot = Article::get_hot(&db).await.unwrap();
        assert_eq!(
            hot,
            vec![
                HotArticle {
                    id: ids[1],
                    title: "hot 1".to_string(),
                    view_count: 10
                },
                HotArticle {
                    id: ids[3],
                    title: "hot 3".to_string(),
                    view_count: 10
                },
                HotArticle {
                    id: ids[4],
                    title: "hot 4".to_string(),
                    view_count: 7
                },
                HotArticle {
                    id: ids[0],
                    title: "hot 0".to_string(),
                    view_count: 3
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_archives() {
        let db = test_pool().await;
        create_article_at(&db, "a", &[], Utc.with_ymd_and_hms(2025, 1, 3, 0, 0, 0).unwrap()).await;
        create_article_at(&db, "b", &[], Utc.with_ymd_and_hms(2025, 1, 28, 0, 0, 0).unwrap()).await;
        create_article_at(&db, "c", &[], Utc.with_ymd_and_hms(2025, 3, 2, 0, 0, 0).unwrap()).await;
        create_article_at(&db, "d", &[], Utc.with_ymd_and_hms(2024, 11, 2, 0, 0, 0).unwrap()).await;

        assert_eq!(
            Article::get_archives(&db).await.unwrap(),
            vec![
                Archive {
                    date: "2025年03月".to_string(),
                    count: 1
                },
                Archive {
                    date: "2025年01月".to_string(),
                    count: 2
                },
                Archive {
                    date: "2024年11月".to_string(),
                    count: 1
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_update() {
        let db = test_pool().await;
        let id = create_article_at(&db, "before", &["old", "keep"], day(0)).await;

        Article::update(
            &db,
            id,
            &ArticleUpdate {
                title: Some("after".to_string()),
                tags: Some(vec!["keep".to_string(), "new".to_string()]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let article = Article::get_by_id(&db, id).await.unwrap().unwrap();
        assert_eq!(article.title, "after");
        assert_eq!(article.content, "content of before");
        assert!(article.updated_at > article.created_at);
        let detail = Article::get_detail(&db, id).await.unwrap();
        assert_eq!(detail.tags, vec!["keep", "new"]);

        // without a tag list the links are left alone.
        Article::update(
            &db,
            id,
            &ArticleUpdate {
                read_time: Some(12),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let detail = Article::get_detail(&db, id).await.unwrap();
        assert_eq!(detail.read_time, 12);
        assert_eq!(detail.tags, vec!["keep", "new"]);

        assert!(matches!(
            Article::update(&db, id + 1, &ArticleUpdate::default()).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            Article::update(
                &db,
                id,
                &ArticleUpdate {
                    title: Some(" ".to_string()),
                    ..Default::default()
                }
            )
            .await,
            Err(Error::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_delete() {
        let db = test_pool().await;
        let id = create_article_at(&db, "doomed", &["rust"], day(0)).await;
        sqlx::query(
            "INSERT INTO comments (article_id, author_name, content, created_at) VALUES (?, 'x', 'y', ?)",
        )
        .bind(id)
        .bind(day(1))
        .execute(&db)
        .await
        .unwrap();

        Article::delete(&db, id).await.unwrap();
        assert!(Article::get_by_id(&db, id).await.unwrap().is_none());
        let links: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM article_tags")
            .fetch_one(&db)
            .await
            .unwrap();
        assert_eq!(links, 0);
        assert!(matches!(
            Article::delete(&db, id).await,
            Err(Error::NotFound(_))
        ));
    }
}
