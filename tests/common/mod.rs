// tests/common/mod.rs

//! Shared fixtures for integration tests.

#![allow(dead_code)]

use recipe_box::image::ImageBlob;
use recipe_box::models::{
    Ingredient, IngredientQuery, LineItemInput, NewIngredient, NewUser, RecipeDraft, RecipeInput,
    User,
};
use recipe_box::Repository;

/// Eight-byte PNG signature as a data URI.
pub const PNG_DATA_URI: &str = "data:image/png;base64,iVBORw0KGgo=";

pub struct Fixture {
    pub repo: Repository,
    pub alice: User,
    pub bob: User,
    pub flour: Ingredient,
    pub egg: Ingredient,
    pub sugar: Ingredient,
}

/// In-memory database with two users and a small catalog.
pub async fn setup() -> Fixture {
    let repo = Repository::in_memory().await.unwrap();
    let alice = repo
        .create_user(NewUser::new("alice", "alice@example.com"))
        .await
        .unwrap();
    let bob = repo
        .create_user(NewUser::new("bob", "bob@example.com"))
        .await
        .unwrap();

    repo.import_ingredients(vec![
        NewIngredient::new("flour", "g"),
        NewIngredient::new("egg", "pcs"),
        NewIngredient::new("sugar", "g"),
    ])
    .await
    .unwrap();

    let flour = ingredient(&repo, "flour").await;
    let egg = ingredient(&repo, "egg").await;
    let sugar = ingredient(&repo, "sugar").await;

    Fixture {
        repo,
        alice,
        bob,
        flour,
        egg,
        sugar,
    }
}

pub async fn ingredient(repo: &Repository, name: &str) -> Ingredient {
    repo.search_ingredients(&IngredientQuery::name_starts_with(name))
        .await
        .unwrap()
        .remove(0)
}

pub fn items(pairs: &[(i64, i64)]) -> Vec<LineItemInput> {
    pairs
        .iter()
        .map(|&(id, quantity)| LineItemInput::new(id, quantity))
        .collect()
}

pub fn draft(name: &str, pairs: &[(i64, i64)]) -> RecipeDraft {
    RecipeDraft {
        name: name.to_string(),
        instructions: format!("Make {}.", name),
        image: ImageBlob::new(vec![0x89, 0x50, 0x4e, 0x47], "png"),
        cooking_time: 30,
        ingredients: items(pairs),
    }
}

/// A complete update payload.
pub fn full_input(name: &str, pairs: &[(i64, i64)]) -> RecipeInput {
    RecipeInput {
        ingredients: Some(items(pairs)),
        image: Some(PNG_DATA_URI.to_string()),
        name: Some(name.to_string()),
        instructions: Some(format!("Make {} again.", name)),
        cooking_time: Some(45),
    }
}
