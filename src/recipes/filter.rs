//! Translates recognized recipe-listing query parameters into a filter
//! struct the repository turns into SQL. Parsing is pure so the parameter
//! semantics can be tested without a database.

use uuid::Uuid;

use crate::error::ApiError;

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeFilter {
    pub is_favorited: Option<bool>,
    pub is_in_shopping_cart: Option<bool>,
    pub author: Option<Uuid>,
    /// Tag slugs; a recipe matches when its tag set intersects this set
    /// (OR semantics across values, never AND).
    pub tags: Vec<String>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for RecipeFilter {
    fn default() -> Self {
        Self {
            is_favorited: None,
            is_in_shopping_cart: None,
            author: None,
            tags: Vec::new(),
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ApiError> {
    match value {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(ApiError::Validation(format!(
            "{name} must be a boolean, got {value:?}"
        ))),
    }
}

impl RecipeFilter {
    /// Builds a filter from raw query pairs. `tags` may repeat and may also
    /// carry comma-separated lists; both accumulate. Unrecognized parameters
    /// are ignored.
    pub fn from_pairs<I>(pairs: I) -> Result<Self, ApiError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut filter = RecipeFilter::default();
        for (key, value) in pairs {
            match key.as_str() {
                "is_favorited" => filter.is_favorited = Some(parse_bool(&key, &value)?),
                "is_in_shopping_cart" => {
                    filter.is_in_shopping_cart = Some(parse_bool(&key, &value)?)
                }
                "author" => {
                    let id = value.parse::<Uuid>().map_err(|_| {
                        ApiError::Validation(format!("author must be a user id, got {value:?}"))
                    })?;
                    filter.author = Some(id);
                }
                "tags" => {
                    for slug in value.split(',').filter(|s| !s.is_empty()) {
                        filter.tags.push(slug.to_string());
                    }
                }
                "limit" => {
                    let limit = value.parse::<i64>().map_err(|_| {
                        ApiError::Validation(format!("limit must be an integer, got {value:?}"))
                    })?;
                    filter.limit = limit.clamp(1, MAX_LIMIT);
                }
                "offset" => {
                    let offset = value.parse::<i64>().map_err(|_| {
                        ApiError::Validation(format!("offset must be an integer, got {value:?}"))
                    })?;
                    filter.offset = offset.max(0);
                }
                _ => {}
            }
        }
        Ok(filter)
    }

    /// The favorite/basket constraints are relative to the caller, so they
    /// are meaningless without one; such requests fail fast with 401.
    pub fn requires_actor(&self) -> bool {
        self.is_favorited.is_some() || self.is_in_shopping_cart.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn empty_query_means_no_constraints() {
        let filter = RecipeFilter::from_pairs(pairs(&[])).unwrap();
        assert_eq!(filter, RecipeFilter::default());
        assert!(!filter.requires_actor());
    }

    #[test]
    fn parses_boolean_flags() {
        let filter = RecipeFilter::from_pairs(pairs(&[
            ("is_favorited", "true"),
            ("is_in_shopping_cart", "0"),
        ]))
        .unwrap();
        assert_eq!(filter.is_favorited, Some(true));
        assert_eq!(filter.is_in_shopping_cart, Some(false));
        assert!(filter.requires_actor());
    }

    #[test]
    fn rejects_malformed_boolean() {
        let err = RecipeFilter::from_pairs(pairs(&[("is_favorited", "yes")])).unwrap_err();
        assert!(err.to_string().contains("is_favorited"));
    }

    #[test]
    fn repeated_tags_accumulate() {
        let filter =
            RecipeFilter::from_pairs(pairs(&[("tags", "lunch"), ("tags", "dinner")])).unwrap();
        assert_eq!(filter.tags, vec!["lunch", "dinner"]);
    }

    #[test]
    fn comma_separated_tags_accumulate_too() {
        let filter =
            RecipeFilter::from_pairs(pairs(&[("tags", "lunch,dinner"), ("tags", "snack")]))
                .unwrap();
        assert_eq!(filter.tags, vec!["lunch", "dinner", "snack"]);
    }

    #[test]
    fn author_must_be_a_uuid() {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let ok = RecipeFilter::from_pairs(pairs(&[("author", id_str.as_str())])).unwrap();
        assert_eq!(ok.author, Some(id));

        let err = RecipeFilter::from_pairs(pairs(&[("author", "42")])).unwrap_err();
        assert!(err.to_string().contains("author"));
    }

    #[test]
    fn unknown_parameters_are_ignored() {
        let filter = RecipeFilter::from_pairs(pairs(&[("page_size", "5"), ("q", "soup")])).unwrap();
        assert_eq!(filter, RecipeFilter::default());
    }

    #[test]
    fn limit_is_clamped_and_offset_floored() {
        let filter =
            RecipeFilter::from_pairs(pairs(&[("limit", "5000"), ("offset", "-3")])).unwrap();
        assert_eq!(filter.limit, 100);
        assert_eq!(filter.offset, 0);
    }
}
