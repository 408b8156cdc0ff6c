use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct Pagination {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl Pagination {
    pub fn normalize(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;
        (page, per_page, offset)
    }
}

// Pagination fields are inlined rather than flattened in: query extraction
// goes through serde_urlencoded, which cannot deserialize numbers inside a
// #[serde(flatten)] struct.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RecipeListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub author: Option<Uuid>,
    /// Comma-separated tag slugs.
    pub tags: Option<String>,
    pub is_favorited: Option<String>,
    pub is_in_shopping_cart: Option<String>,
}

impl RecipeListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }

    pub fn tag_slugs(&self) -> Option<Vec<String>> {
        let raw = self.tags.as_deref()?;
        let slugs: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        if slugs.is_empty() { None } else { Some(slugs) }
    }

    pub fn favorited_flag(&self) -> bool {
        parse_flag(self.is_favorited.as_deref())
    }

    pub fn in_cart_flag(&self) -> bool {
        parse_flag(self.is_in_shopping_cart.as_deref())
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct SubscriptionQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    /// Cap on recipes returned per author; anything that is not a positive
    /// integer is treated as absent.
    pub recipes_limit: Option<String>,
}

impl SubscriptionQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }

    pub fn recipes_limit(&self) -> Option<i64> {
        parse_recipes_limit(self.recipes_limit.as_deref())
    }
}

pub fn parse_recipes_limit(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|v| v.parse::<i64>().ok()).filter(|v| *v > 0)
}

fn parse_flag(raw: Option<&str>) -> bool {
    matches!(raw, Some("1") | Some("true") | Some("True"))
}

#[cfg(test)]
mod tests {
    use axum::extract::Query;
    use axum::http::Uri;

    use super::*;

    #[test]
    fn recipe_query_extracts_pagination_from_uri() {
        let uri: Uri = "/api/recipes/?page=2&per_page=10&tags=breakfast"
            .parse()
            .unwrap();
        let Query(query) = Query::<RecipeListQuery>::try_from_uri(&uri).unwrap();
        assert_eq!(query.pagination().normalize(), (2, 10, 10));
        assert_eq!(query.tag_slugs(), Some(vec!["breakfast".to_string()]));
    }

    #[test]
    fn subscription_query_extracts_pagination_from_uri() {
        let uri: Uri = "/api/users/subscriptions?page=3&per_page=5&recipes_limit=2"
            .parse()
            .unwrap();
        let Query(query) = Query::<SubscriptionQuery>::try_from_uri(&uri).unwrap();
        assert_eq!(query.pagination().normalize(), (3, 5, 10));
        assert_eq!(query.recipes_limit(), Some(2));
    }

    #[test]
    fn recipes_limit_accepts_positive_integers() {
        assert_eq!(parse_recipes_limit(Some("3")), Some(3));
    }

    #[test]
    fn recipes_limit_treats_garbage_as_absent() {
        assert_eq!(parse_recipes_limit(Some("abc")), None);
        assert_eq!(parse_recipes_limit(Some("0")), None);
        assert_eq!(parse_recipes_limit(Some("-2")), None);
        assert_eq!(parse_recipes_limit(None), None);
    }

    #[test]
    fn tag_slugs_splits_and_trims() {
        let query = RecipeListQuery {
            tags: Some("breakfast, dinner,,".into()),
            ..Default::default()
        };
        assert_eq!(
            query.tag_slugs(),
            Some(vec!["breakfast".to_string(), "dinner".to_string()])
        );
        assert_eq!(RecipeListQuery::default().tag_slugs(), None);
    }

    #[test]
    fn membership_flags_accept_common_truthy_values() {
        for raw in ["1", "true", "True"] {
            assert!(parse_flag(Some(raw)));
        }
        assert!(!parse_flag(Some("0")));
        assert!(!parse_flag(None));
    }

    #[test]
    fn pagination_clamps_out_of_range_values() {
        let (page, per_page, offset) = Pagination {
            page: Some(-1),
            per_page: Some(1000),
        }
        .normalize();
        assert_eq!((page, per_page, offset), (1, 100, 0));
    }
}
