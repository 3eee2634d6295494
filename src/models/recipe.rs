use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result, ValidationErrors};
use crate::image::{decode_data_uri, ImageBlob};

use super::Ingredient;

pub const COOKING_TIME_MIN: i64 = 1;
pub const COOKING_TIME_MAX: i64 = 32000;
pub const AMOUNT_MIN: i64 = 1;
pub const AMOUNT_MAX: i64 = 32000;
pub const NAME_MAX_LEN: usize = 200;

const REQUIRED: &str = "This field is required.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineItem {
    pub ingredient: Ingredient,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recipe {
    pub id: i64,
    pub author_id: i64,
    pub name: String,
    pub instructions: String,
    pub image_name: String,
    pub cooking_time: u32,
    pub published_at: DateTime<Utc>,
    pub line_items: Vec<LineItem>,
}

impl Recipe {
    pub fn summary(&self) -> RecipeSummary {
        RecipeSummary {
            id: self.id,
            name: self.name.clone(),
            image_name: self.image_name.clone(),
            cooking_time: self.cooking_time,
        }
    }
}

/// Short form used in relation responses and author listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeSummary {
    pub id: i64,
    pub name: String,
    pub image_name: String,
    pub cooking_time: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorView {
    pub id: i64,
    pub username: String,
    pub is_subscribed: bool,
}

/// A recipe as seen by a particular viewer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeView {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub author: AuthorView,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineItemInput {
    #[serde(rename = "id")]
    pub ingredient_id: i64,
    #[serde(alias = "amount")]
    pub quantity: i64,
}

impl LineItemInput {
    pub fn new(ingredient_id: i64, quantity: i64) -> Self {
        Self {
            ingredient_id,
            quantity,
        }
    }
}

/// Client payload for create and update. Every field is optional here so
/// missing ones can be reported together.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipeInput {
    pub ingredients: Option<Vec<LineItemInput>>,
    pub image: Option<String>,
    pub name: Option<String>,
    #[serde(alias = "text")]
    pub instructions: Option<String>,
    pub cooking_time: Option<i64>,
}

impl RecipeInput {
    /// Names of required fields absent from the payload, in field order.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.ingredients.is_none() {
            missing.push("ingredients");
        }
        if self.image.is_none() {
            missing.push("image");
        }
        if self.name.is_none() {
            missing.push("name");
        }
        if self.instructions.is_none() {
            missing.push("instructions");
        }
        if self.cooking_time.is_none() {
            missing.push("cooking_time");
        }
        missing
    }

    /// Require every field and decode the image.
    pub fn into_draft(self) -> Result<RecipeDraft> {
        let missing = self.missing_fields();
        let RecipeInput {
            ingredients: Some(ingredients),
            image: Some(image),
            name: Some(name),
            instructions: Some(instructions),
            cooking_time: Some(cooking_time),
        } = self
        else {
            let mut errors = ValidationErrors::new();
            for field in missing {
                errors.add(field, REQUIRED);
            }
            return Err(AppError::Validation(errors));
        };

        Ok(RecipeDraft {
            name,
            instructions,
            image: decode_data_uri(&image)?,
            cooking_time,
            ingredients,
        })
    }
}

/// A complete recipe payload with a decoded image.
#[derive(Debug, Clone)]
pub struct RecipeDraft {
    pub name: String,
    pub instructions: String,
    pub image: ImageBlob,
    pub cooking_time: i64,
    pub ingredients: Vec<LineItemInput>,
}

impl RecipeDraft {
    /// Every field-level check that needs no catalog access.
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();

        if self.name.trim().is_empty() {
            errors.add("name", "This field may not be blank.");
        } else if self.name.chars().count() > NAME_MAX_LEN {
            errors.add(
                "name",
                format!("Ensure this field has no more than {} characters.", NAME_MAX_LEN),
            );
        }

        if self.instructions.trim().is_empty() {
            errors.add("instructions", "This field may not be blank.");
        }

        if !(COOKING_TIME_MIN..=COOKING_TIME_MAX).contains(&self.cooking_time) {
            errors.add(
                "cooking_time",
                format!(
                    "Cooking time must be between {} and {} minutes.",
                    COOKING_TIME_MIN, COOKING_TIME_MAX
                ),
            );
        }

        validate_line_items(&self.ingredients, &mut errors);
        errors
    }
}

fn validate_line_items(items: &[LineItemInput], errors: &mut ValidationErrors) {
    if items.is_empty() {
        errors.add("ingredients", "At least one ingredient is required.");
        return;
    }

    let mut seen = HashSet::new();
    let mut duplicated = false;
    for item in items {
        if !seen.insert(item.ingredient_id) && !duplicated {
            errors.add("ingredients", "Ingredients must not repeat.");
            duplicated = true;
        }
        if !(AMOUNT_MIN..=AMOUNT_MAX).contains(&item.quantity) {
            errors.add(
                "ingredients",
                format!(
                    "Amount for ingredient {} must be between {} and {}.",
                    item.ingredient_id, AMOUNT_MIN, AMOUNT_MAX
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(ingredients: Vec<LineItemInput>) -> RecipeDraft {
        RecipeDraft {
            name: "Pancakes".to_string(),
            instructions: "Mix and fry.".to_string(),
            image: ImageBlob::new(vec![0x89], "png"),
            cooking_time: 20,
            ingredients,
        }
    }

    #[test]
    fn valid_draft_has_no_errors() {
        let d = draft(vec![LineItemInput::new(1, 200), LineItemInput::new(2, 2)]);
        assert!(d.validate().is_empty());
    }

    #[test]
    fn amount_bounds_are_inclusive() {
        let d = draft(vec![
            LineItemInput::new(1, AMOUNT_MIN),
            LineItemInput::new(2, AMOUNT_MAX),
        ]);
        assert!(d.validate().is_empty());

        let d = draft(vec![LineItemInput::new(1, AMOUNT_MIN - 1)]);
        assert!(d.validate().contains("ingredients"));
        let d = draft(vec![LineItemInput::new(1, AMOUNT_MAX + 1)]);
        assert!(d.validate().contains("ingredients"));
    }

    #[test]
    fn empty_and_duplicate_ingredients_are_rejected() {
        assert_eq!(
            draft(vec![]).validate().messages("ingredients"),
            ["At least one ingredient is required."]
        );

        let d = draft(vec![
            LineItemInput::new(3, 1),
            LineItemInput::new(3, 2),
            LineItemInput::new(3, 3),
        ]);
        assert_eq!(d.validate().messages("ingredients"), ["Ingredients must not repeat."]);
    }

    #[test]
    fn validation_reports_every_offending_field() {
        let mut d = draft(vec![LineItemInput::new(1, 0)]);
        d.name = "   ".to_string();
        d.cooking_time = 0;
        let errors = d.validate();
        assert_eq!(
            errors.fields().collect::<Vec<_>>(),
            vec!["cooking_time", "ingredients", "name"]
        );
    }

    #[test]
    fn summary_keeps_listing_fields() {
        let recipe = Recipe {
            id: 3,
            author_id: 1,
            name: "Pancakes".to_string(),
            instructions: "Mix and fry.".to_string(),
            image_name: "recipes/images/recipe_x.png".to_string(),
            cooking_time: 20,
            published_at: Utc::now(),
            line_items: Vec::new(),
        };
        let summary = recipe.summary();
        assert_eq!((summary.id, summary.cooking_time), (3, 20));
        assert_eq!(summary.image_name, recipe.image_name);
    }

    #[test]
    fn overlong_name_is_rejected() {
        let mut d = draft(vec![LineItemInput::new(1, 1)]);
        d.name = "x".repeat(NAME_MAX_LEN + 1);
        assert!(d.validate().contains("name"));
    }

    #[test]
    fn missing_fields_are_listed_exactly() {
        let input = RecipeInput {
            name: Some("Soup".to_string()),
            cooking_time: Some(10),
            ..Default::default()
        };
        assert_eq!(input.missing_fields(), vec!["ingredients", "image", "instructions"]);

        match input.into_draft() {
            Err(AppError::Validation(errors)) => {
                assert_eq!(
                    errors.fields().collect::<Vec<_>>(),
                    vec!["image", "ingredients", "instructions"]
                );
                assert_eq!(errors.messages("image"), [REQUIRED]);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn input_accepts_transport_field_names() {
        let input: RecipeInput = serde_json::from_str(
            r#"{
                "ingredients": [{"id": 4, "amount": 10}],
                "image": "data:image/png;base64,aGVsbG8=",
                "name": "Toast",
                "text": "Toast the bread.",
                "cooking_time": 5
            }"#,
        )
        .unwrap();

        let draft = input.into_draft().unwrap();
        assert_eq!(draft.ingredients, vec![LineItemInput::new(4, 10)]);
        assert_eq!(draft.instructions, "Toast the bread.");
        assert_eq!(draft.image.extension, "png");
    }

    #[test]
    fn undecodable_image_is_a_decode_error() {
        let input = RecipeInput {
            ingredients: Some(vec![LineItemInput::new(1, 1)]),
            image: Some("not an image".to_string()),
            name: Some("Toast".to_string()),
            instructions: Some("Toast it.".to_string()),
            cooking_time: Some(5),
        };
        assert!(matches!(input.into_draft(), Err(AppError::Decode(_))));
    }
}
