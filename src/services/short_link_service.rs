use rand::{Rng, distr::Alphanumeric};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::{AppError, AppResult},
    models::SHORT_LINK_TOKEN_LEN,
};

const MAX_TOKEN_RETRIES: usize = 5;

/// Fixed-length alphanumeric token. Randomness is injected so tests can pin
/// the output with a seeded rng.
pub fn generate_token<R: Rng + ?Sized>(rng: &mut R) -> String {
    (&mut *rng)
        .sample_iter(Alphanumeric)
        .take(SHORT_LINK_TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// Get-or-create keyed by recipe id. The first call persists a token; every
/// later call returns the same one. Concurrent first calls are resolved by
/// the unique constraint on recipe_id, token collisions by regeneration.
pub async fn get_or_create(pool: &DbPool, recipe_id: Uuid) -> AppResult<String> {
    let recipe: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM recipes WHERE id = $1")
        .bind(recipe_id)
        .fetch_optional(pool)
        .await?;
    if recipe.is_none() {
        return Err(AppError::NotFound);
    }

    if let Some((token,)) =
        sqlx::query_as::<_, (String,)>("SELECT token FROM short_links WHERE recipe_id = $1")
            .bind(recipe_id)
            .fetch_optional(pool)
            .await?
    {
        return Ok(token);
    }

    for _ in 0..MAX_TOKEN_RETRIES {
        let token = generate_token(&mut rand::rng());
        let inserted: Result<Option<(String,)>, sqlx::Error> = sqlx::query_as(
            "INSERT INTO short_links (recipe_id, token) VALUES ($1, $2) \
             ON CONFLICT (recipe_id) DO NOTHING RETURNING token",
        )
        .bind(recipe_id)
        .bind(token.as_str())
        .fetch_optional(pool)
        .await;

        match inserted {
            Ok(Some((token,))) => return Ok(token),
            Ok(None) => {
                // Lost the get-or-create race; the winner's token stands.
                let (token,): (String,) =
                    sqlx::query_as("SELECT token FROM short_links WHERE recipe_id = $1")
                        .bind(recipe_id)
                        .fetch_one(pool)
                        .await?;
                return Ok(token);
            }
            // Token collided with another recipe's link; draw again.
            Err(err) if is_unique_violation(&err) => continue,
            Err(err) => return Err(err.into()),
        }
    }

    Err(AppError::Internal(anyhow::anyhow!(
        "could not allocate a unique short link token"
    )))
}

/// `/s/{token}` -> recipe id.
pub async fn resolve(pool: &DbPool, token: &str) -> AppResult<Uuid> {
    let row: Option<(Uuid,)> =
        sqlx::query_as("SELECT recipe_id FROM short_links WHERE token = $1")
            .bind(token)
            .fetch_optional(pool)
            .await?;
    row.map(|(id,)| id).ok_or(AppError::NotFound)
}

pub fn short_link_path(token: &str) -> String {
    format!("/s/{token}")
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn token_has_fixed_length_and_alphabet() {
        let token = generate_token(&mut rand::rng());
        assert_eq!(token.len(), SHORT_LINK_TOKEN_LEN);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn seeded_rng_gives_deterministic_tokens() {
        let a = generate_token(&mut StdRng::seed_from_u64(7));
        let b = generate_token(&mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
    }

    #[test]
    fn different_seeds_give_different_tokens() {
        let a = generate_token(&mut StdRng::seed_from_u64(1));
        let b = generate_token(&mut StdRng::seed_from_u64(2));
        assert_ne!(a, b);
    }

    #[test]
    fn short_link_path_is_prefixed() {
        assert_eq!(short_link_path("abc123XY"), "/s/abc123XY");
    }
}
