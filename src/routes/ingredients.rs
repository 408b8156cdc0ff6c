use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppResult,
    models::Ingredient,
    response::ApiResponse,
    services::catalog_service,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct IngredientQuery {
    /// Name prefix for type-ahead search.
    pub name: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct IngredientList {
    pub items: Vec<Ingredient>,
}

pub fn router() -> Router<DbPool> {
    Router::new()
        .route("/", get(list_ingredients))
        .route("/{id}", get(get_ingredient))
}

#[utoipa::path(
    get,
    path = "/api/ingredients",
    params(
        ("name" = Option<String>, Query, description = "Name prefix filter")
    ),
    responses(
        (status = 200, description = "List ingredients", body = ApiResponse<IngredientList>)
    ),
    tag = "Ingredients"
)]
pub async fn list_ingredients(
    State(pool): State<DbPool>,
    Query(query): Query<IngredientQuery>,
) -> AppResult<Json<ApiResponse<IngredientList>>> {
    let items = catalog_service::search_ingredients(&pool, query.name.as_deref()).await?;
    Ok(Json(ApiResponse::success(
        "OK",
        IngredientList { items },
        None,
    )))
}

#[utoipa::path(
    get,
    path = "/api/ingredients/{id}",
    params(
        ("id" = Uuid, Path, description = "Ingredient ID")
    ),
    responses(
        (status = 200, description = "Get ingredient", body = ApiResponse<Ingredient>),
        (status = 404, description = "Ingredient not found")
    ),
    tag = "Ingredients"
)]
pub async fn get_ingredient(
    State(pool): State<DbPool>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Ingredient>>> {
    let ingredient = catalog_service::get_ingredient(&pool, id).await?;
    Ok(Json(ApiResponse::success("OK", ingredient, None)))
}
