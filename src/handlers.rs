use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    app::AppState,
    models::{
        Article, ArticleDetail, ArticleFilter, ArticlePage, ArticleUpdate, Comment, LikeAction,
        LikeResult, NewArticle, NewComment, NewProject, Project, ProjectDetail, ProjectUpdate,
        Statistics, Tag, TOP_TAG_LIMIT,
    },
    utils::{JsonBody, PageRequest, Path, Query},
    Error,
};

type JsonResult<T = Value> = Result<Json<T>, Error>;

#[derive(Deserialize)]
pub struct ListQuery {
    page: Option<i64>,
    per_page: Option<i64>,
    tag: Option<String>,
    archive: Option<String>,
}

pub async fn handler_articles(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> JsonResult<ArticlePage> {
    let page = PageRequest::new(
        query.page,
        query.per_page,
        state.config.per_page(),
        state.config.max_per_page(),
    );
    let filter = ArticleFilter {
        tag: query.tag,
        archive: query.archive,
    };
    Ok(Json(Article::get_on_page(&state.db, &filter, &page).await?))
}

pub async fn handler_all_articles(State(state): State<Arc<AppState>>) -> JsonResult {
    let articles = Article::get_all_published(&state.db).await?;
    Ok(Json(json!({
        "total": articles.len(),
        "articles": articles,
    })))
}

pub async fn handler_article(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> JsonResult<ArticleDetail> {
    Ok(Json(Article::get_detail(&state.db, id).await?))
}

pub async fn handler_create_article(
    State(state): State<Arc<AppState>>,
    JsonBody(article): JsonBody<NewArticle>,
) -> Result<impl IntoResponse, Error> {
    let id = Article::insert(&state.db, &article).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "article created", "article_id": id })),
    ))
}

pub async fn handler_update_article(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    JsonBody(update): JsonBody<ArticleUpdate>,
) -> JsonResult {
    Article::update(&state.db, id, &update).await?;
    Ok(Json(json!({ "message": "article updated", "article_id": id })))
}

pub async fn handler_delete_article(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> JsonResult {
    Article::delete(&state.db, id).await?;
    Ok(Json(json!({ "message": "article deleted" })))
}

pub async fn handler_hot_articles(State(state): State<Arc<AppState>>) -> JsonResult {
    let hot_articles = Article::get_hot(&state.db).await?;
    Ok(Json(json!({ "hot_articles": hot_articles })))
}

pub async fn handler_archives(State(state): State<Arc<AppState>>) -> JsonResult {
    let archives = Article::get_archives(&state.db).await?;
    Ok(Json(json!({ "archives": archives })))
}

#[derive(Deserialize)]
pub struct SearchQuery {
    query: Option<String>,
    page: Option<i64>,
    per_page: Option<i64>,
}

pub async fn handler_search(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> JsonResult<ArticlePage> {
    let page = PageRequest::new(
        query.page,
        query.per_page,
        state.config.search_per_page(),
        state.config.max_per_page(),
    );
    let text = query.query.unwrap_or_default();
    Ok(Json(Article::search(&state.db, &text, &page).await?))
}

pub async fn handler_comments(
    State(state): State<Arc<AppState>>,
    Path(article_id): Path<i64>,
) -> JsonResult {
    let comments = Comment::get_by_article(&state.db, article_id).await?;
    Ok(Json(json!({ "comments": comments })))
}

pub async fn handler_create_comment(
    State(state): State<Arc<AppState>>,
    Path(article_id): Path<i64>,
    JsonBody(comment): JsonBody<NewComment>,
) -> Result<impl IntoResponse, Error> {
    let id = Comment::insert(&state.db, article_id, &comment).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "comment created", "comment_id": id })),
    ))
}

pub async fn handler_delete_comment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> JsonResult {
    Comment::delete(&state.db, id).await?;
    Ok(Json(json!({ "message": "comment deleted" })))
}

pub async fn handler_view(
    State(state): State<Arc<AppState>>,
    Path(article_id): Path<i64>,
) -> JsonResult {
    let view_count = Statistics::increment_view_count(&state.db, article_id).await?;
    Ok(Json(json!({ "view_count": view_count })))
}

#[derive(Deserialize)]
pub struct LikeRequest {
    action: Option<String>,
}

// the body is optional, a missing or unreadable one counts as a like.
pub async fn handler_like(
    State(state): State<Arc<AppState>>,
    Path(article_id): Path<i64>,
    request: Option<Json<LikeRequest>>,
) -> JsonResult<LikeResult> {
    let action = LikeAction::parse(
        request
            .as_ref()
            .and_then(|Json(request)| request.action.as_deref()),
    );
    Ok(Json(
        Statistics::toggle_like(&state.db, article_id, action).await?,
    ))
}

pub async fn handler_tags(State(state): State<Arc<AppState>>) -> JsonResult {
    let tags = Tag::get_top_with_count(&state.db, TOP_TAG_LIMIT).await?;
    Ok(Json(json!({ "tags": tags })))
}

pub async fn handler_projects(State(state): State<Arc<AppState>>) -> JsonResult {
    let projects = Project::get_all(&state.db).await?;
    Ok(Json(json!({
        "total": projects.len(),
        "projects": projects,
    })))
}

pub async fn handler_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> JsonResult<ProjectDetail> {
    Ok(Json(Project::get_detail(&state.db, id).await?))
}

pub async fn handler_create_project(
    State(state): State<Arc<AppState>>,
    JsonBody(project): JsonBody<NewProject>,
) -> Result<impl IntoResponse, Error> {
    let id = Project::insert(&state.db, &project).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "project created", "project_id": id })),
    ))
}

pub async fn handler_update_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    JsonBody(update): JsonBody<ProjectUpdate>,
) -> JsonResult {
    Project::update(&state.db, id, &update).await?;
    Ok(Json(json!({ "message": "project updated", "project_id": id })))
}

pub async fn handler_delete_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> JsonResult {
    Project::delete(&state.db, id).await?;
    Ok(Json(json!({ "message": "project deleted" })))
}

#[derive(Deserialize)]
pub struct ArticleLink {
    article_id: Option<i64>,
}

pub async fn handler_add_project_article(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<i64>,
    JsonBody(link): JsonBody<ArticleLink>,
) -> JsonResult {
    let article_id = link
        .article_id
        .ok_or_else(|| Error::Validation("article_id is required".to_string()))?;
    Project::add_article(&state.db, project_id, article_id).await?;
    Ok(Json(json!({
        "message": "article added to project",
        "project_id": project_id,
        "article_id": article_id,
    })))
}

pub async fn handler_remove_project_article(
    State(state): State<Arc<AppState>>,
    Path((project_id, article_id)): Path<(i64, i64)>,
) -> JsonResult {
    Project::remove_article(&state.db, project_id, article_id).await?;
    Ok(Json(json!({
        "message": "article removed from project",
        "project_id": project_id,
        "article_id": article_id,
    })))
}

pub async fn handler_404() -> Error {
    Error::NotFound("resource".to_string())
}

pub async fn handler_ping() -> impl IntoResponse {
    "pong"
}
