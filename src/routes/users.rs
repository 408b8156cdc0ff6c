use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
};

use uuid::Uuid;

use crate::{
    db::DbPool,
    dto::users::{AvatarRequest, AvatarResponse, SubscriptionEntry, SubscriptionList, UserList, UserProfile},
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    routes::params::{Pagination, SubscriptionQuery},
    services::{subscription_service, user_service},
};

pub fn router() -> Router<DbPool> {
    Router::new()
        .route("/", get(list_users))
        .route("/me", get(me))
        .route("/me/avatar", put(set_avatar).delete(delete_avatar))
        .route("/subscriptions", get(list_subscriptions))
        .route("/{id}", get(get_user))
        .route("/{id}/subscribe", post(subscribe).delete(unsubscribe))
}

#[utoipa::path(
    get,
    path = "/api/users",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20")
    ),
    responses(
        (status = 200, description = "List users", body = ApiResponse<UserList>)
    ),
    tag = "Users"
)]
pub async fn list_users(
    State(pool): State<DbPool>,
    user: Option<AuthUser>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<UserList>>> {
    let viewer = user.map(|u| u.user_id);
    let resp = user_service::list_users(&pool, viewer, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/users/me",
    responses(
        (status = 200, description = "Current user profile", body = ApiResponse<UserProfile>)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn me(
    State(pool): State<DbPool>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<UserProfile>>> {
    let profile = user_service::get_user(&pool, user.user_id, None).await?;
    Ok(Json(ApiResponse::success("OK", profile, None)))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User profile", body = ApiResponse<UserProfile>),
        (status = 404, description = "User not found")
    ),
    tag = "Users"
)]
pub async fn get_user(
    State(pool): State<DbPool>,
    user: Option<AuthUser>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<UserProfile>>> {
    let viewer = user.map(|u| u.user_id);
    let profile = user_service::get_user(&pool, id, viewer).await?;
    Ok(Json(ApiResponse::success("OK", profile, None)))
}

#[utoipa::path(
    put,
    path = "/api/users/me/avatar",
    request_body = AvatarRequest,
    responses(
        (status = 200, description = "Avatar updated", body = ApiResponse<AvatarResponse>),
        (status = 400, description = "Missing avatar field")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn set_avatar(
    State(pool): State<DbPool>,
    user: AuthUser,
    Json(payload): Json<AvatarRequest>,
) -> AppResult<Json<ApiResponse<AvatarResponse>>> {
    let resp = user_service::set_avatar(&pool, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/users/me/avatar",
    responses(
        (status = 204, description = "Avatar removed"),
        (status = 400, description = "No avatar set")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn delete_avatar(State(pool): State<DbPool>, user: AuthUser) -> AppResult<StatusCode> {
    user_service::delete_avatar(&pool, &user).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/users/subscriptions",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("recipes_limit" = Option<String>, Query, description = "Cap on recipes per author")
    ),
    responses(
        (status = 200, description = "List subscriptions", body = ApiResponse<SubscriptionList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Subscriptions"
)]
pub async fn list_subscriptions(
    State(pool): State<DbPool>,
    user: AuthUser,
    Query(query): Query<SubscriptionQuery>,
) -> AppResult<Json<ApiResponse<SubscriptionList>>> {
    let recipes_limit = query.recipes_limit();
    let resp =
        subscription_service::list_subscriptions(&pool, &user, query.pagination(), recipes_limit)
            .await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/users/{id}/subscribe",
    params(
        ("id" = Uuid, Path, description = "Author ID"),
        ("recipes_limit" = Option<String>, Query, description = "Cap on recipes returned")
    ),
    responses(
        (status = 201, description = "Subscribed", body = ApiResponse<SubscriptionEntry>),
        (status = 400, description = "Self-subscription or duplicate"),
        (status = 404, description = "Author not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Subscriptions"
)]
pub async fn subscribe(
    State(pool): State<DbPool>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Query(query): Query<SubscriptionQuery>,
) -> AppResult<(StatusCode, Json<ApiResponse<SubscriptionEntry>>)> {
    let entry = subscription_service::subscribe(&pool, &user, id, query.recipes_limit()).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Subscribed", entry, None)),
    ))
}

#[utoipa::path(
    delete,
    path = "/api/users/{id}/subscribe",
    params(
        ("id" = Uuid, Path, description = "Author ID")
    ),
    responses(
        (status = 204, description = "Unsubscribed"),
        (status = 404, description = "Subscription not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Subscriptions"
)]
pub async fn unsubscribe(
    State(pool): State<DbPool>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    subscription_service::unsubscribe(&pool, &user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
