use uuid::Uuid;

use crate::{
    db::DbPool,
    dto::users::{AvatarRequest, AvatarResponse, UserList, UserProfile},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::User,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
};

pub async fn list_users(
    pool: &DbPool,
    viewer: Option<Uuid>,
    pagination: Pagination,
) -> AppResult<ApiResponse<UserList>> {
    let (page, limit, offset) = pagination.normalize();
    let users = sqlx::query_as::<_, User>(
        "SELECT * FROM users ORDER BY username LIMIT $1 OFFSET $2",
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;

    let mut items = Vec::with_capacity(users.len());
    for user in users {
        let is_subscribed = is_subscribed_to(pool, viewer, user.id).await?;
        items.push(UserProfile::from_user(user, is_subscribed));
    }

    Ok(ApiResponse::success(
        "OK",
        UserList { items },
        Some(Meta::new(page, limit, total.0)),
    ))
}

pub async fn get_user(pool: &DbPool, id: Uuid, viewer: Option<Uuid>) -> AppResult<UserProfile> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound)?;

    let is_subscribed = is_subscribed_to(pool, viewer, user.id).await?;
    Ok(UserProfile::from_user(user, is_subscribed))
}

pub async fn set_avatar(
    pool: &DbPool,
    user: &AuthUser,
    payload: AvatarRequest,
) -> AppResult<ApiResponse<AvatarResponse>> {
    let avatar = match payload.avatar.filter(|a| !a.trim().is_empty()) {
        Some(a) => a,
        None => return Err(AppError::validation("avatar", "this field is required")),
    };

    sqlx::query("UPDATE users SET avatar = $2 WHERE id = $1")
        .bind(user.user_id)
        .bind(avatar.as_str())
        .execute(pool)
        .await?;

    Ok(ApiResponse::success(
        "Avatar updated",
        AvatarResponse { avatar },
        Some(Meta::empty()),
    ))
}

pub async fn delete_avatar(pool: &DbPool, user: &AuthUser) -> AppResult<()> {
    let result = sqlx::query("UPDATE users SET avatar = NULL WHERE id = $1 AND avatar IS NOT NULL")
        .bind(user.user_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::BadRequest("no avatar set".into()));
    }
    Ok(())
}

pub(crate) async fn is_subscribed_to(
    pool: &DbPool,
    viewer: Option<Uuid>,
    author_id: Uuid,
) -> AppResult<bool> {
    let viewer = match viewer {
        Some(v) => v,
        None => return Ok(false),
    };
    let (exists,): (bool,) = sqlx::query_as(
        "SELECT EXISTS (SELECT 1 FROM subscriptions WHERE follower_id = $1 AND author_id = $2)",
    )
    .bind(viewer)
    .bind(author_id)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}
