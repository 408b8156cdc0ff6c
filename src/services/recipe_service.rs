use std::collections::HashSet;

use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    db::DbPool,
    dto::recipes::{
        CreateRecipeRequest, IngredientAmount, RecipeDetail, RecipeIngredientDto, RecipeList,
        UpdateRecipeRequest,
    },
    dto::users::UserProfile,
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, can_edit_recipe},
    models::{MAX_AMOUNT, MAX_COOKING_TIME, MIN_AMOUNT, MIN_COOKING_TIME, Recipe, Tag, User},
    response::{ApiResponse, Meta},
    routes::params::RecipeListQuery,
    services::user_service,
};

pub async fn create_recipe(
    pool: &DbPool,
    user: &AuthUser,
    payload: CreateRecipeRequest,
) -> AppResult<ApiResponse<RecipeDetail>> {
    validate_name(&payload.name)?;
    validate_cooking_time(payload.cooking_time)?;
    validate_tag_refs(&payload.tags)?;
    validate_ingredient_refs(&payload.ingredients)?;
    validate_image(&payload.image)?;

    let mut txn = pool.begin().await?;
    ensure_tags_exist(&mut txn, &payload.tags).await?;
    ensure_ingredients_exist(&mut txn, &payload.ingredients).await?;

    let recipe: Recipe = sqlx::query_as(
        r#"
        INSERT INTO recipes (id, name, author_id, text, cooking_time, image)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(payload.name.as_str())
    .bind(user.user_id)
    .bind(payload.text.as_str())
    .bind(payload.cooking_time)
    .bind(payload.image.as_str())
    .fetch_one(&mut *txn)
    .await?;

    insert_associations(&mut txn, recipe.id, &payload.tags, &payload.ingredients).await?;
    txn.commit().await?;

    tracing::info!(recipe_id = %recipe.id, author = %user.user_id, "recipe created");

    let detail = get_recipe(pool, recipe.id, Some(user.user_id)).await?;
    Ok(ApiResponse::success("Recipe created", detail, None))
}

/// Replaces the recipe's fields and both association sets in one transaction;
/// a failure anywhere rolls back to the prior state. The author column is
/// never touched.
pub async fn update_recipe(
    pool: &DbPool,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateRecipeRequest,
) -> AppResult<ApiResponse<RecipeDetail>> {
    let existing = sqlx::query_as::<_, Recipe>("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound)?;

    if !can_edit_recipe(user, existing.author_id) {
        return Err(AppError::Forbidden);
    }

    validate_name(&payload.name)?;
    validate_cooking_time(payload.cooking_time)?;
    validate_tag_refs(&payload.tags)?;
    validate_ingredient_refs(&payload.ingredients)?;
    // An absent image keeps the stored one; a supplied one must not be blank.
    if let Some(image) = payload.image.as_deref() {
        validate_image(image)?;
    }

    let mut txn = pool.begin().await?;
    ensure_tags_exist(&mut txn, &payload.tags).await?;
    ensure_ingredients_exist(&mut txn, &payload.ingredients).await?;

    sqlx::query(
        r#"
        UPDATE recipes
        SET name = $2, text = $3, cooking_time = $4, image = COALESCE($5, image)
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(payload.name.as_str())
    .bind(payload.text.as_str())
    .bind(payload.cooking_time)
    .bind(payload.image.as_deref())
    .execute(&mut *txn)
    .await?;

    // clear-then-recreate of both association sets
    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *txn)
        .await?;
    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *txn)
        .await?;
    insert_associations(&mut txn, id, &payload.tags, &payload.ingredients).await?;

    txn.commit().await?;

    let detail = get_recipe(pool, id, Some(user.user_id)).await?;
    Ok(ApiResponse::success("Recipe updated", detail, None))
}

/// Cascades to associations, favorites, cart rows and the short link.
pub async fn delete_recipe(pool: &DbPool, user: &AuthUser, id: Uuid) -> AppResult<()> {
    let existing = sqlx::query_as::<_, Recipe>("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound)?;

    if !can_edit_recipe(user, existing.author_id) {
        return Err(AppError::Forbidden);
    }

    sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    tracing::info!(recipe_id = %id, "recipe deleted");
    Ok(())
}

pub async fn get_recipe(pool: &DbPool, id: Uuid, viewer: Option<Uuid>) -> AppResult<RecipeDetail> {
    let recipe = sqlx::query_as::<_, Recipe>("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound)?;

    build_detail(pool, recipe, viewer).await
}

pub async fn list_recipes(
    pool: &DbPool,
    viewer: Option<Uuid>,
    query: RecipeListQuery,
) -> AppResult<ApiResponse<RecipeList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let tag_slugs: Option<Vec<String>> = query.tag_slugs();
    // The membership filters only mean something for an authenticated caller.
    let favorited = query.favorited_flag() && viewer.is_some();
    let in_cart = query.in_cart_flag() && viewer.is_some();

    let filter_sql = r#"
        FROM recipes r
        WHERE ($1::uuid IS NULL OR r.author_id = $1)
          AND ($2::text[] IS NULL OR EXISTS (
              SELECT 1 FROM recipe_tags rt
              JOIN tags t ON t.id = rt.tag_id
              WHERE rt.recipe_id = r.id AND t.slug = ANY($2)))
          AND (NOT $3::bool OR EXISTS (
              SELECT 1 FROM favorites f
              WHERE f.recipe_id = r.id AND f.user_id = $4))
          AND (NOT $5::bool OR EXISTS (
              SELECT 1 FROM shopping_cart sc
              WHERE sc.recipe_id = r.id AND sc.user_id = $4))
    "#;

    let rows = sqlx::query_as::<_, Recipe>(&format!(
        "SELECT r.* {filter_sql} ORDER BY r.created_at DESC LIMIT $6 OFFSET $7"
    ))
    .bind(query.author)
    .bind(tag_slugs.as_deref())
    .bind(favorited)
    .bind(viewer)
    .bind(in_cart)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let (total,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) {filter_sql}"))
        .bind(query.author)
        .bind(tag_slugs.as_deref())
        .bind(favorited)
        .bind(viewer)
        .bind(in_cart)
        .fetch_one(pool)
        .await?;

    let mut items = Vec::with_capacity(rows.len());
    for recipe in rows {
        items.push(build_detail(pool, recipe, viewer).await?);
    }

    Ok(ApiResponse::success(
        "OK",
        RecipeList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

async fn build_detail(
    pool: &DbPool,
    recipe: Recipe,
    viewer: Option<Uuid>,
) -> AppResult<RecipeDetail> {
    let author = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(recipe.author_id)
        .fetch_one(pool)
        .await?;
    let is_subscribed = user_service::is_subscribed_to(pool, viewer, author.id).await?;

    let tags = sqlx::query_as::<_, Tag>(
        r#"
        SELECT t.* FROM recipe_tags rt
        JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = $1
        ORDER BY t.name
        "#,
    )
    .bind(recipe.id)
    .fetch_all(pool)
    .await?;

    let ingredients = sqlx::query_as::<_, RecipeIngredientDto>(
        r#"
        SELECT i.id, i.name, i.measurement_unit, ri.amount
        FROM recipe_ingredients ri
        JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = $1
        ORDER BY i.name
        "#,
    )
    .bind(recipe.id)
    .fetch_all(pool)
    .await?;

    let (is_favorited, is_in_shopping_cart) = match viewer {
        Some(viewer_id) => {
            let (fav, cart): (bool, bool) = sqlx::query_as(
                r#"
                SELECT
                    EXISTS (SELECT 1 FROM favorites WHERE user_id = $1 AND recipe_id = $2),
                    EXISTS (SELECT 1 FROM shopping_cart WHERE user_id = $1 AND recipe_id = $2)
                "#,
            )
            .bind(viewer_id)
            .bind(recipe.id)
            .fetch_one(pool)
            .await?;
            (fav, cart)
        }
        None => (false, false),
    };

    Ok(RecipeDetail {
        id: recipe.id,
        tags,
        author: UserProfile::from_user(author, is_subscribed),
        ingredients,
        is_favorited,
        is_in_shopping_cart,
        name: recipe.name,
        image: recipe.image,
        text: recipe.text,
        cooking_time: recipe.cooking_time,
        created_at: recipe.created_at,
    })
}

async fn insert_associations(
    conn: &mut PgConnection,
    recipe_id: Uuid,
    tags: &[Uuid],
    ingredients: &[IngredientAmount],
) -> AppResult<()> {
    for tag_id in tags {
        sqlx::query("INSERT INTO recipe_tags (recipe_id, tag_id) VALUES ($1, $2)")
            .bind(recipe_id)
            .bind(tag_id)
            .execute(&mut *conn)
            .await?;
    }
    for item in ingredients {
        sqlx::query(
            "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) VALUES ($1, $2, $3)",
        )
        .bind(recipe_id)
        .bind(item.id)
        .bind(item.amount)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn ensure_tags_exist(conn: &mut PgConnection, tags: &[Uuid]) -> AppResult<()> {
    let (found,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tags WHERE id = ANY($1)")
        .bind(tags)
        .fetch_one(&mut *conn)
        .await?;
    if found as usize != tags.len() {
        return Err(AppError::validation("tags", "unknown tag reference"));
    }
    Ok(())
}

async fn ensure_ingredients_exist(
    conn: &mut PgConnection,
    ingredients: &[IngredientAmount],
) -> AppResult<()> {
    let ids: Vec<Uuid> = ingredients.iter().map(|i| i.id).collect();
    let (found,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM ingredients WHERE id = ANY($1)")
        .bind(&ids)
        .fetch_one(&mut *conn)
        .await?;
    if found as usize != ids.len() {
        return Err(AppError::validation(
            "ingredients",
            "unknown ingredient reference",
        ));
    }
    Ok(())
}

fn validate_name(name: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::validation("name", "this field is required"));
    }
    Ok(())
}

fn validate_image(image: &str) -> AppResult<()> {
    if image.trim().is_empty() {
        return Err(AppError::validation("image", "this field is required"));
    }
    Ok(())
}

fn validate_cooking_time(value: i32) -> AppResult<()> {
    if !(MIN_COOKING_TIME..=MAX_COOKING_TIME).contains(&value) {
        return Err(AppError::validation(
            "cooking_time",
            format!("must be between {MIN_COOKING_TIME} and {MAX_COOKING_TIME} minutes"),
        ));
    }
    Ok(())
}

fn validate_tag_refs(tags: &[Uuid]) -> AppResult<()> {
    if tags.is_empty() {
        return Err(AppError::validation(
            "tags",
            "at least one tag is required",
        ));
    }
    let mut seen = HashSet::new();
    for tag_id in tags {
        if !seen.insert(tag_id) {
            return Err(AppError::validation("tags", "duplicate tag reference"));
        }
    }
    Ok(())
}

fn validate_ingredient_refs(ingredients: &[IngredientAmount]) -> AppResult<()> {
    if ingredients.is_empty() {
        return Err(AppError::validation(
            "ingredients",
            "at least one ingredient is required",
        ));
    }
    let mut seen = HashSet::new();
    for item in ingredients {
        if !seen.insert(item.id) {
            return Err(AppError::validation(
                "ingredients",
                "duplicate ingredient reference",
            ));
        }
        if !(MIN_AMOUNT..=MAX_AMOUNT).contains(&item.amount) {
            return Err(AppError::validation(
                "amount",
                format!("must be between {MIN_AMOUNT} and {MAX_AMOUNT}"),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ing(id: Uuid, amount: i32) -> IngredientAmount {
        IngredientAmount { id, amount }
    }

    #[test]
    fn empty_tag_list_is_rejected() {
        let err = validate_tag_refs(&[]).unwrap_err();
        assert!(matches!(err, AppError::Validation { field: "tags", .. }));
    }

    #[test]
    fn duplicate_tag_is_rejected() {
        let id = Uuid::new_v4();
        let err = validate_tag_refs(&[id, id]).unwrap_err();
        assert!(matches!(err, AppError::Validation { field: "tags", .. }));
    }

    #[test]
    fn distinct_tags_pass() {
        assert!(validate_tag_refs(&[Uuid::new_v4(), Uuid::new_v4()]).is_ok());
    }

    #[test]
    fn empty_ingredient_list_is_rejected() {
        let err = validate_ingredient_refs(&[]).unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation {
                field: "ingredients",
                ..
            }
        ));
    }

    #[test]
    fn duplicate_ingredient_is_rejected() {
        let id = Uuid::new_v4();
        let err = validate_ingredient_refs(&[ing(id, 10), ing(id, 20)]).unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation {
                field: "ingredients",
                ..
            }
        ));
    }

    #[test]
    fn zero_amount_is_rejected() {
        let err = validate_ingredient_refs(&[ing(Uuid::new_v4(), 0)]).unwrap_err();
        assert!(matches!(err, AppError::Validation { field: "amount", .. }));
    }

    #[test]
    fn amount_above_upper_bound_is_rejected() {
        let err = validate_ingredient_refs(&[ing(Uuid::new_v4(), MAX_AMOUNT + 1)]).unwrap_err();
        assert!(matches!(err, AppError::Validation { field: "amount", .. }));
    }

    #[test]
    fn blank_image_is_rejected() {
        let err = validate_image("   ").unwrap_err();
        assert!(matches!(err, AppError::Validation { field: "image", .. }));
        assert!(validate_image("data:image/png;base64,xyz").is_ok());
    }

    #[test]
    fn cooking_time_bounds() {
        assert!(validate_cooking_time(0).is_err());
        assert!(validate_cooking_time(1).is_ok());
        assert!(validate_cooking_time(MAX_COOKING_TIME).is_ok());
        assert!(validate_cooking_time(MAX_COOKING_TIME + 1).is_err());
    }
}
