use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::ApiError;
use crate::tags::repo::Tag;
use crate::users::dto::UserProfile;

/// Ingredient occurrence inside a recipe representation.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct IngredientInRecipe {
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// Full recipe representation returned by the read endpoints.
#[derive(Debug, Serialize)]
pub struct RecipeResponse {
    pub id: Uuid,
    pub tags: Vec<Tag>,
    pub author: UserProfile,
    pub ingredients: Vec<IngredientInRecipe>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: Option<String>,
    pub text: String,
    pub cooking_time: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngredientAmount {
    pub id: Uuid,
    pub amount: i32,
}

/// Payload for creating or replacing a recipe.
#[derive(Debug, Deserialize)]
pub struct RecipeUpsert {
    pub ingredients: Vec<IngredientAmount>,
    pub tags: Vec<Uuid>,
    pub image: Option<String>,
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
}

impl RecipeUpsert {
    /// Checks the payload before anything is written, so a rejected recipe
    /// never leaves partial rows behind.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.name.trim().is_empty() {
            return Err(ApiError::Validation("name must not be empty".into()));
        }
        if self.cooking_time < 1 {
            return Err(ApiError::Validation(
                "cooking_time must be at least 1".into(),
            ));
        }
        if self.ingredients.is_empty() {
            return Err(ApiError::Validation(
                "recipe must have at least one ingredient".into(),
            ));
        }
        if self.tags.is_empty() {
            return Err(ApiError::Validation("recipe must have at least one tag".into()));
        }

        let mut seen_ingredients = HashSet::new();
        for item in &self.ingredients {
            if item.amount < 1 {
                return Err(ApiError::Validation(format!(
                    "amount for ingredient {} must be at least 1",
                    item.id
                )));
            }
            if !seen_ingredients.insert(item.id) {
                return Err(ApiError::Validation(format!(
                    "duplicate ingredient {} in payload",
                    item.id
                )));
            }
        }

        let mut seen_tags = HashSet::new();
        for tag in &self.tags {
            if !seen_tags.insert(*tag) {
                return Err(ApiError::Validation(format!(
                    "duplicate tag {tag} in payload"
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_payload() -> RecipeUpsert {
        RecipeUpsert {
            ingredients: vec![
                IngredientAmount {
                    id: Uuid::new_v4(),
                    amount: 100,
                },
                IngredientAmount {
                    id: Uuid::new_v4(),
                    amount: 2,
                },
            ],
            tags: vec![Uuid::new_v4()],
            image: None,
            name: "Borscht".into(),
            text: "Chop, boil, serve.".into(),
            cooking_time: 90,
        }
    }

    #[test]
    fn accepts_valid_payload() {
        assert!(valid_payload().validate().is_ok());
    }

    #[test]
    fn rejects_duplicate_ingredient_ids() {
        let mut payload = valid_payload();
        let dup = payload.ingredients[0].clone();
        payload.ingredients.push(dup);
        let err = payload.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate ingredient"));
    }

    #[test]
    fn rejects_duplicate_tag_ids() {
        let mut payload = valid_payload();
        let dup = payload.tags[0];
        payload.tags.push(dup);
        let err = payload.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate tag"));
    }

    #[test]
    fn rejects_non_positive_amount() {
        let mut payload = valid_payload();
        payload.ingredients[0].amount = 0;
        assert!(payload.validate().is_err());
    }

    #[test]
    fn rejects_non_positive_cooking_time() {
        let mut payload = valid_payload();
        payload.cooking_time = 0;
        assert!(payload.validate().is_err());
    }

    #[test]
    fn rejects_empty_ingredient_and_tag_sets() {
        let mut payload = valid_payload();
        payload.ingredients.clear();
        assert!(payload.validate().is_err());

        let mut payload = valid_payload();
        payload.tags.clear();
        assert!(payload.validate().is_err());
    }

    #[test]
    fn rejects_blank_name() {
        let mut payload = valid_payload();
        payload.name = "   ".into();
        assert!(payload.validate().is_err());
    }
}
