use uuid::Uuid;

use crate::{
    db::DbPool,
    error::{AppError, AppResult},
    models::{Ingredient, Tag},
};

pub async fn list_tags(pool: &DbPool) -> AppResult<Vec<Tag>> {
    let tags = sqlx::query_as::<_, Tag>("SELECT * FROM tags ORDER BY name")
        .fetch_all(pool)
        .await?;
    Ok(tags)
}

pub async fn get_tag(pool: &DbPool, id: Uuid) -> AppResult<Tag> {
    sqlx::query_as::<_, Tag>("SELECT * FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound)
}

/// Type-ahead lookup: case-insensitive prefix match on name, ordered by name.
pub async fn search_ingredients(
    pool: &DbPool,
    name_prefix: Option<&str>,
) -> AppResult<Vec<Ingredient>> {
    let ingredients = match name_prefix.filter(|p| !p.is_empty()) {
        Some(prefix) => {
            let pattern = format!("{}%", escape_like(prefix));
            sqlx::query_as::<_, Ingredient>(
                "SELECT * FROM ingredients WHERE name ILIKE $1 ORDER BY name",
            )
            .bind(pattern)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, Ingredient>("SELECT * FROM ingredients ORDER BY name")
                .fetch_all(pool)
                .await?
        }
    };
    Ok(ingredients)
}

pub async fn get_ingredient(pool: &DbPool, id: Uuid) -> AppResult<Ingredient> {
    sqlx::query_as::<_, Ingredient>("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound)
}

/// LIKE/ILIKE treats `%`, `_` and `\` specially; user input must match them
/// literally.
fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::escape_like;

    #[test]
    fn escape_like_passes_plain_text_through() {
        assert_eq!(escape_like("sugar"), "sugar");
    }

    #[test]
    fn escape_like_escapes_wildcards() {
        assert_eq!(escape_like("100%_pure\\"), "100\\%\\_pure\\\\");
    }
}
