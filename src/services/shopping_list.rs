use chrono::{NaiveDate, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
};

/// One aggregated line of the report.
///
/// Grouping is by (name, measurement_unit), not by ingredient id: two catalog
/// rows sharing a display name and unit merge into a single line.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct ShoppingListLine {
    pub name: String,
    pub measurement_unit: String,
    pub total: i64,
}

/// Aggregate ingredient demand across every recipe in the user's cart.
pub async fn collect_lines(pool: &DbPool, user_id: Uuid) -> AppResult<Vec<ShoppingListLine>> {
    let lines = sqlx::query_as::<_, ShoppingListLine>(
        r#"
        SELECT i.name, i.measurement_unit, SUM(ri.amount)::bigint AS total
        FROM shopping_cart sc
        JOIN recipe_ingredients ri ON ri.recipe_id = sc.recipe_id
        JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE sc.user_id = $1
        GROUP BY i.name, i.measurement_unit
        ORDER BY i.name
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(lines)
}

/// Build the downloadable report for the acting user.
///
/// An empty cart is an error, not an empty file; the route turns it into a
/// 400 response.
pub async fn build_report(pool: &DbPool, user: &AuthUser) -> AppResult<(String, String)> {
    let lines = collect_lines(pool, user.user_id).await?;
    if lines.is_empty() {
        return Err(AppError::BadRequest("shopping cart is empty".into()));
    }

    let body = render_report(&user.username, Utc::now().date_naive(), &lines);
    let filename = format!("{}_shopping_list.txt", user.username);
    Ok((filename, body))
}

/// Render aggregated lines as `{name} - {total} {unit}` under a small header.
pub fn render_report(username: &str, date: NaiveDate, lines: &[ShoppingListLine]) -> String {
    let mut out = String::new();
    out.push_str(&format!("Shopping list for {username}\n"));
    out.push_str(&format!("Date: {date}\n\n"));
    for line in lines {
        out.push_str(&format!(
            "{} - {} {}\n",
            line.name, line.total, line.measurement_unit
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(name: &str, unit: &str, total: i64) -> ShoppingListLine {
        ShoppingListLine {
            name: name.into(),
            measurement_unit: unit.into(),
            total,
        }
    }

    #[test]
    fn render_report_formats_each_line() {
        let lines = vec![line("flour", "g", 300), line("sugar", "g", 250)];
        let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let out = render_report("alice", date, &lines);

        assert!(out.starts_with("Shopping list for alice\nDate: 2025-03-01\n\n"));
        assert!(out.contains("flour - 300 g\n"));
        assert!(out.contains("sugar - 250 g\n"));
    }

    #[test]
    fn render_report_keeps_input_order() {
        let lines = vec![line("apple", "pcs", 3), line("flour", "g", 100)];
        let out = render_report("bob", NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(), &lines);
        let apple = out.find("apple").unwrap();
        let flour = out.find("flour").unwrap();
        assert!(apple < flour);
    }
}
