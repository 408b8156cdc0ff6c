use uuid::Uuid;

use crate::{
    db::DbPool,
    dto::recipes::RecipeMinified,
    dto::users::{SubscriptionEntry, SubscriptionList},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::User,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
};

pub async fn subscribe(
    pool: &DbPool,
    user: &AuthUser,
    author_id: Uuid,
    recipes_limit: Option<i64>,
) -> AppResult<SubscriptionEntry> {
    if user.user_id == author_id {
        return Err(AppError::validation(
            "author",
            "cannot subscribe to yourself",
        ));
    }

    let author = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(author_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound)?;

    let result = sqlx::query(
        "INSERT INTO subscriptions (id, follower_id, author_id) VALUES ($1, $2, $3) \
         ON CONFLICT (follower_id, author_id) DO NOTHING",
    )
    .bind(Uuid::new_v4())
    .bind(user.user_id)
    .bind(author_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::Conflict(
            "already subscribed to this user".into(),
        ));
    }

    build_entry(pool, author, recipes_limit).await
}

pub async fn unsubscribe(pool: &DbPool, user: &AuthUser, author_id: Uuid) -> AppResult<()> {
    let result =
        sqlx::query("DELETE FROM subscriptions WHERE follower_id = $1 AND author_id = $2")
            .bind(user.user_id)
            .bind(author_id)
            .execute(pool)
            .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

pub async fn list_subscriptions(
    pool: &DbPool,
    user: &AuthUser,
    pagination: Pagination,
    recipes_limit: Option<i64>,
) -> AppResult<ApiResponse<SubscriptionList>> {
    let (page, limit, offset) = pagination.normalize();
    let authors = sqlx::query_as::<_, User>(
        r#"
        SELECT u.*
        FROM subscriptions s
        JOIN users u ON u.id = s.author_id
        WHERE s.follower_id = $1
        ORDER BY u.username
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(user.user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM subscriptions WHERE follower_id = $1")
            .bind(user.user_id)
            .fetch_one(pool)
            .await?;

    let mut items = Vec::with_capacity(authors.len());
    for author in authors {
        items.push(build_entry(pool, author, recipes_limit).await?);
    }

    Ok(ApiResponse::success(
        "OK",
        SubscriptionList { items },
        Some(Meta::new(page, limit, total.0)),
    ))
}

/// Author profile plus their recipes; a NULL limit means all of them.
async fn build_entry(
    pool: &DbPool,
    author: User,
    recipes_limit: Option<i64>,
) -> AppResult<SubscriptionEntry> {
    let recipes = sqlx::query_as::<_, RecipeMinified>(
        r#"
        SELECT id, name, image, cooking_time
        FROM recipes
        WHERE author_id = $1
        ORDER BY created_at DESC
        LIMIT $2::bigint
        "#,
    )
    .bind(author.id)
    .bind(recipes_limit)
    .fetch_all(pool)
    .await?;

    let (recipes_count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM recipes WHERE author_id = $1")
            .bind(author.id)
            .fetch_one(pool)
            .await?;

    Ok(SubscriptionEntry {
        id: author.id,
        email: author.email,
        username: author.username,
        first_name: author.first_name,
        last_name: author.last_name,
        is_subscribed: true,
        avatar: author.avatar,
        recipes,
        recipes_count,
    })
}
