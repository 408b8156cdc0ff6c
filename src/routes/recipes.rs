use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use uuid::Uuid;

use crate::{
    db::DbPool,
    dto::recipes::{
        CreateRecipeRequest, RecipeDetail, RecipeList, RecipeMinified, ShortLinkResponse,
        UpdateRecipeRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    routes::params::RecipeListQuery,
    services::{
        membership_service::{self, MembershipList},
        recipe_service, shopping_list, short_link_service,
    },
};

pub fn router() -> Router<DbPool> {
    Router::new()
        .route("/", get(list_recipes).post(create_recipe))
        .route("/download_shopping_cart", get(download_shopping_cart))
        .route(
            "/{id}",
            get(get_recipe).patch(update_recipe).delete(delete_recipe),
        )
        .route("/{id}/favorite", axum::routing::post(add_favorite).delete(remove_favorite))
        .route(
            "/{id}/shopping_cart",
            axum::routing::post(add_to_cart).delete(remove_from_cart),
        )
        .route("/{id}/get-link", get(get_link))
}

#[utoipa::path(
    get,
    path = "/api/recipes",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("author" = Option<Uuid>, Query, description = "Filter by author"),
        ("tags" = Option<String>, Query, description = "Comma-separated tag slugs"),
        ("is_favorited" = Option<String>, Query, description = "Only favorited recipes"),
        ("is_in_shopping_cart" = Option<String>, Query, description = "Only recipes in the cart")
    ),
    responses(
        (status = 200, description = "List recipes", body = ApiResponse<RecipeList>)
    ),
    tag = "Recipes"
)]
pub async fn list_recipes(
    State(pool): State<DbPool>,
    user: Option<AuthUser>,
    Query(query): Query<RecipeListQuery>,
) -> AppResult<Json<ApiResponse<RecipeList>>> {
    let viewer = user.map(|u| u.user_id);
    let resp = recipe_service::list_recipes(&pool, viewer, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/recipes/{id}",
    params(
        ("id" = Uuid, Path, description = "Recipe ID")
    ),
    responses(
        (status = 200, description = "Recipe detail", body = ApiResponse<RecipeDetail>),
        (status = 404, description = "Recipe not found")
    ),
    tag = "Recipes"
)]
pub async fn get_recipe(
    State(pool): State<DbPool>,
    user: Option<AuthUser>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<RecipeDetail>>> {
    let viewer = user.map(|u| u.user_id);
    let detail = recipe_service::get_recipe(&pool, id, viewer).await?;
    Ok(Json(ApiResponse::success("OK", detail, None)))
}

#[utoipa::path(
    post,
    path = "/api/recipes",
    request_body = CreateRecipeRequest,
    responses(
        (status = 201, description = "Recipe created", body = ApiResponse<RecipeDetail>),
        (status = 400, description = "Validation error")
    ),
    security(("bearer_auth" = [])),
    tag = "Recipes"
)]
pub async fn create_recipe(
    State(pool): State<DbPool>,
    user: AuthUser,
    Json(payload): Json<CreateRecipeRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<RecipeDetail>>)> {
    let resp = recipe_service::create_recipe(&pool, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    patch,
    path = "/api/recipes/{id}",
    params(
        ("id" = Uuid, Path, description = "Recipe ID")
    ),
    request_body = UpdateRecipeRequest,
    responses(
        (status = 200, description = "Recipe updated", body = ApiResponse<RecipeDetail>),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Recipe not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Recipes"
)]
pub async fn update_recipe(
    State(pool): State<DbPool>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRecipeRequest>,
) -> AppResult<Json<ApiResponse<RecipeDetail>>> {
    let resp = recipe_service::update_recipe(&pool, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/recipes/{id}",
    params(
        ("id" = Uuid, Path, description = "Recipe ID")
    ),
    responses(
        (status = 204, description = "Recipe deleted"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Recipe not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Recipes"
)]
pub async fn delete_recipe(
    State(pool): State<DbPool>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    recipe_service::delete_recipe(&pool, &user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/recipes/{id}/favorite",
    params(
        ("id" = Uuid, Path, description = "Recipe ID")
    ),
    responses(
        (status = 201, description = "Added to favorites", body = ApiResponse<RecipeMinified>),
        (status = 400, description = "Already in favorites"),
        (status = 404, description = "Recipe not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Favorites"
)]
pub async fn add_favorite(
    State(pool): State<DbPool>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<ApiResponse<RecipeMinified>>)> {
    let recipe = membership_service::add_recipe(&pool, MembershipList::Favorites, &user, id).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Added to favorites", recipe, None)),
    ))
}

#[utoipa::path(
    delete,
    path = "/api/recipes/{id}/favorite",
    params(
        ("id" = Uuid, Path, description = "Recipe ID")
    ),
    responses(
        (status = 204, description = "Removed from favorites"),
        (status = 404, description = "Recipe was not in favorites")
    ),
    security(("bearer_auth" = [])),
    tag = "Favorites"
)]
pub async fn remove_favorite(
    State(pool): State<DbPool>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    membership_service::remove_recipe(&pool, MembershipList::Favorites, &user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/recipes/{id}/shopping_cart",
    params(
        ("id" = Uuid, Path, description = "Recipe ID")
    ),
    responses(
        (status = 201, description = "Added to shopping cart", body = ApiResponse<RecipeMinified>),
        (status = 400, description = "Already in the cart"),
        (status = 404, description = "Recipe not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn add_to_cart(
    State(pool): State<DbPool>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<ApiResponse<RecipeMinified>>)> {
    let recipe =
        membership_service::add_recipe(&pool, MembershipList::ShoppingCart, &user, id).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Added to shopping cart", recipe, None)),
    ))
}

#[utoipa::path(
    delete,
    path = "/api/recipes/{id}/shopping_cart",
    params(
        ("id" = Uuid, Path, description = "Recipe ID")
    ),
    responses(
        (status = 204, description = "Removed from shopping cart"),
        (status = 404, description = "Recipe was not in the cart")
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn remove_from_cart(
    State(pool): State<DbPool>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    membership_service::remove_recipe(&pool, MembershipList::ShoppingCart, &user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/recipes/download_shopping_cart",
    responses(
        (status = 200, description = "Plain-text shopping list attachment"),
        (status = 400, description = "Shopping cart is empty")
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn download_shopping_cart(
    State(pool): State<DbPool>,
    user: AuthUser,
) -> AppResult<Response> {
    let (filename, body) = shopping_list::build_report(&pool, &user).await?;
    let headers = [
        (
            header::CONTENT_TYPE,
            "text/plain; charset=utf-8".to_string(),
        ),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        ),
    ];
    Ok((headers, body).into_response())
}

#[utoipa::path(
    get,
    path = "/api/recipes/{id}/get-link",
    params(
        ("id" = Uuid, Path, description = "Recipe ID")
    ),
    responses(
        (status = 200, description = "Short link", body = ApiResponse<ShortLinkResponse>),
        (status = 404, description = "Recipe not found")
    ),
    tag = "Recipes"
)]
pub async fn get_link(
    State(pool): State<DbPool>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ShortLinkResponse>>> {
    let token = short_link_service::get_or_create(&pool, id).await?;
    let resp = ShortLinkResponse {
        short_link: short_link_service::short_link_path(&token),
    };
    Ok(Json(ApiResponse::success("OK", resp, None)))
}

/// Top-level `/s/{token}` resolver, mounted outside `/api`.
pub async fn resolve_short_link(
    State(pool): State<DbPool>,
    Path(token): Path<String>,
) -> AppResult<axum::response::Redirect> {
    let recipe_id = short_link_service::resolve(&pool, &token).await?;
    Ok(axum::response::Redirect::to(&format!(
        "/api/recipes/{recipe_id}"
    )))
}
