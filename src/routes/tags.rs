use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppResult,
    models::Tag,
    response::ApiResponse,
    services::catalog_service,
};

#[derive(Serialize, ToSchema)]
pub struct TagList {
    pub items: Vec<Tag>,
}

pub fn router() -> Router<DbPool> {
    Router::new()
        .route("/", get(list_tags))
        .route("/{id}", get(get_tag))
}

#[utoipa::path(
    get,
    path = "/api/tags",
    responses(
        (status = 200, description = "List tags", body = ApiResponse<TagList>)
    ),
    tag = "Tags"
)]
pub async fn list_tags(State(pool): State<DbPool>) -> AppResult<Json<ApiResponse<TagList>>> {
    let items = catalog_service::list_tags(&pool).await?;
    Ok(Json(ApiResponse::success("OK", TagList { items }, None)))
}

#[utoipa::path(
    get,
    path = "/api/tags/{id}",
    params(
        ("id" = Uuid, Path, description = "Tag ID")
    ),
    responses(
        (status = 200, description = "Get tag", body = ApiResponse<Tag>),
        (status = 404, description = "Tag not found")
    ),
    tag = "Tags"
)]
pub async fn get_tag(
    State(pool): State<DbPool>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Tag>>> {
    let tag = catalog_service::get_tag(&pool, id).await?;
    Ok(Json(ApiResponse::success("OK", tag, None)))
}
