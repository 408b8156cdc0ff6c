use uuid::Uuid;

use crate::{
    db::DbPool,
    dto::recipes::RecipeMinified,
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
};

/// The two per-user recipe lists with identical toggle semantics. The target
/// table is an explicit parameter so both toggles share one code path without
/// any per-request mutable state.
#[derive(Debug, Clone, Copy)]
pub enum MembershipList {
    Favorites,
    ShoppingCart,
}

impl MembershipList {
    fn table(self) -> &'static str {
        match self {
            MembershipList::Favorites => "favorites",
            MembershipList::ShoppingCart => "shopping_cart",
        }
    }

    fn label(self) -> &'static str {
        match self {
            MembershipList::Favorites => "favorites",
            MembershipList::ShoppingCart => "shopping cart",
        }
    }
}

/// Insert the (user, recipe) pair. The insert and the duplicate check are one
/// atomic statement; the unique constraint decides races.
pub async fn add_recipe(
    pool: &DbPool,
    list: MembershipList,
    user: &AuthUser,
    recipe_id: Uuid,
) -> AppResult<RecipeMinified> {
    let recipe: Option<RecipeMinified> =
        sqlx::query_as("SELECT id, name, image, cooking_time FROM recipes WHERE id = $1")
            .bind(recipe_id)
            .fetch_optional(pool)
            .await?;
    let recipe = recipe.ok_or(AppError::NotFound)?;

    let sql = format!(
        "INSERT INTO {} (id, user_id, recipe_id) VALUES ($1, $2, $3) \
         ON CONFLICT (user_id, recipe_id) DO NOTHING",
        list.table()
    );
    let result = sqlx::query(&sql)
        .bind(Uuid::new_v4())
        .bind(user.user_id)
        .bind(recipe_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::Conflict(format!(
            "recipe is already in {}",
            list.label()
        )));
    }

    tracing::debug!(user_id = %user.user_id, recipe_id = %recipe_id, list = list.table(), "added to list");
    Ok(recipe)
}

pub async fn remove_recipe(
    pool: &DbPool,
    list: MembershipList,
    user: &AuthUser,
    recipe_id: Uuid,
) -> AppResult<()> {
    let sql = format!(
        "DELETE FROM {} WHERE user_id = $1 AND recipe_id = $2",
        list.table()
    );
    let result = sqlx::query(&sql)
        .bind(user.user_id)
        .bind(recipe_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}
