//! Recipe aggregate persistence.
//!
//! A recipe and its line items are only ever written together: creation
//! inserts both in one transaction, and an update swaps the whole line item
//! set after the new one has been validated. Nothing outside this module
//! touches `line_items` directly.

use chrono::Utc;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, Transaction};

use crate::error::{AppError, Result, ValidationErrors};
use crate::image::ImageBlob;
use crate::models::{
    AuthorView, Favorite, LineItem, LineItemInput, Recipe, RecipeDraft, RecipeInput, RecipeQuery,
    RecipeView, ShoppingCart, Subscription, Viewer,
};

use super::relations::pair_exists;
use super::repository::{
    datetime_column, format_datetime, ingredient_from_row, load_user, row_exists,
};
use super::Repository;

const RECIPE_COLUMNS: &str =
    "r.id, r.author_id, r.name, r.instructions, r.image_name, r.cooking_time, r.published_at";

impl Repository {
    /// Validate the draft against field bounds and the catalog, then store
    /// the recipe with its line items.
    pub async fn create_recipe(&self, author_id: i64, draft: RecipeDraft) -> Result<Recipe> {
        let recipe = self
            .run(move |conn| {
                let tx = conn.transaction()?;
                if !row_exists(&tx, "users", author_id)? {
                    return Err(AppError::NotFound(format!("user {}", author_id)));
                }
                validate_draft(&tx, &draft)?;

                let image_name = draft.image.file_name("recipe");
                tx.execute(
                    r#"INSERT INTO recipes (author_id, name, instructions, image, image_ext, image_name, cooking_time, published_at)
                       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
                    params![
                        author_id,
                        draft.name,
                        draft.instructions,
                        draft.image.data,
                        draft.image.extension,
                        image_name,
                        draft.cooking_time,
                        format_datetime(&Utc::now()),
                    ],
                )?;
                let recipe_id = tx.last_insert_rowid();
                insert_line_items(&tx, recipe_id, &draft.ingredients)?;

                let recipe = load_recipe(&tx, recipe_id)?;
                tx.commit()?;
                Ok(recipe)
            })
            .await?;
        tracing::info!(
            "Created recipe {} '{}' with {} ingredients",
            recipe.id,
            recipe.name,
            recipe.line_items.len()
        );
        Ok(recipe)
    }

    /// Full replace of a recipe owned by `caller_id`. Every field must be
    /// present; on any failure the stored recipe is left as it was.
    pub async fn update_recipe(
        &self,
        recipe_id: i64,
        caller_id: i64,
        input: RecipeInput,
    ) -> Result<Recipe> {
        let recipe = self
            .run(move |conn| {
                let tx = conn.transaction()?;
                ensure_author(&tx, recipe_id, caller_id)?;

                let draft = input.into_draft()?;
                validate_draft(&tx, &draft)?;

                let image_name = draft.image.file_name("recipe");
                tx.execute(
                    r#"UPDATE recipes
                       SET name = ?1, instructions = ?2, image = ?3, image_ext = ?4, image_name = ?5, cooking_time = ?6
                       WHERE id = ?7"#,
                    params![
                        draft.name,
                        draft.instructions,
                        draft.image.data,
                        draft.image.extension,
                        image_name,
                        draft.cooking_time,
                        recipe_id,
                    ],
                )?;
                tx.execute("DELETE FROM line_items WHERE recipe_id = ?1", params![recipe_id])?;
                insert_line_items(&tx, recipe_id, &draft.ingredients)?;

                let recipe = load_recipe(&tx, recipe_id)?;
                tx.commit()?;
                Ok(recipe)
            })
            .await?;
        tracing::info!("Updated recipe {}", recipe.id);
        Ok(recipe)
    }

    /// Delete a recipe owned by `caller_id`. Line items, favorites and cart
    /// entries go with it.
    pub async fn delete_recipe(&self, recipe_id: i64, caller_id: i64) -> Result<()> {
        self.run(move |conn| {
            let tx = conn.transaction()?;
            ensure_author(&tx, recipe_id, caller_id)?;
            tx.execute("DELETE FROM recipes WHERE id = ?1", params![recipe_id])?;
            tx.commit()?;
            Ok(())
        })
        .await?;
        tracing::info!("Deleted recipe {}", recipe_id);
        Ok(())
    }

    pub async fn get_recipe(&self, recipe_id: i64) -> Result<Recipe> {
        self.run(move |conn| load_recipe(conn, recipe_id)).await
    }

    /// Recipes matching every predicate of `query`, newest first.
    pub async fn list_recipes(&self, query: &RecipeQuery) -> Result<Vec<Recipe>> {
        let (clause, bound) = query.where_clause();
        let recipes = self
            .run(move |conn| {
                let sql = format!(
                    "SELECT {} FROM recipes r {} ORDER BY r.published_at DESC, r.id DESC",
                    RECIPE_COLUMNS, clause
                );
                let mut stmt = conn.prepare(&sql)?;
                let mut recipes = stmt
                    .query_map(params_from_iter(bound.iter()), recipe_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                for recipe in &mut recipes {
                    recipe.line_items = load_line_items(conn, recipe.id)?;
                }
                Ok(recipes)
            })
            .await?;
        tracing::debug!("Recipe query returned {} recipes", recipes.len());
        Ok(recipes)
    }

    /// The recipe with author details and the viewer's relation flags.
    pub async fn recipe_view(&self, recipe_id: i64, viewer: Viewer) -> Result<RecipeView> {
        self.run(move |conn| {
            let recipe = load_recipe(conn, recipe_id)?;
            let author = load_user(conn, recipe.author_id)?;

            let (is_subscribed, is_favorited, is_in_shopping_cart) = match viewer.user_id() {
                Some(user_id) => (
                    pair_exists::<Subscription>(conn, user_id, author.id)?,
                    pair_exists::<Favorite>(conn, user_id, recipe_id)?,
                    pair_exists::<ShoppingCart>(conn, user_id, recipe_id)?,
                ),
                None => (false, false, false),
            };

            Ok(RecipeView {
                recipe,
                author: AuthorView {
                    id: author.id,
                    username: author.username,
                    is_subscribed,
                },
                is_favorited,
                is_in_shopping_cart,
            })
        })
        .await
    }

    pub async fn recipe_image(&self, recipe_id: i64) -> Result<ImageBlob> {
        self.run(move |conn| {
            conn.query_row(
                "SELECT image, image_ext FROM recipes WHERE id = ?1",
                params![recipe_id],
                |row| Ok(ImageBlob::new(row.get(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?
            .ok_or_else(|| AppError::NotFound(format!("recipe {}", recipe_id)))
        })
        .await
    }
}

fn ensure_author(conn: &Connection, recipe_id: i64, caller_id: i64) -> Result<()> {
    let author_id: i64 = conn
        .query_row(
            "SELECT author_id FROM recipes WHERE id = ?1",
            params![recipe_id],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| AppError::NotFound(format!("recipe {}", recipe_id)))?;

    if author_id != caller_id {
        return Err(AppError::PermissionDenied(format!(
            "recipe {} belongs to another user",
            recipe_id
        )));
    }
    Ok(())
}

/// Field checks plus catalog membership of every referenced ingredient,
/// reported together.
fn validate_draft(conn: &Connection, draft: &RecipeDraft) -> Result<()> {
    let mut errors = draft.validate();
    check_catalog(conn, &draft.ingredients, &mut errors)?;
    errors.into_result()
}

fn check_catalog(
    conn: &Connection,
    items: &[LineItemInput],
    errors: &mut ValidationErrors,
) -> Result<()> {
    let mut stmt = conn.prepare_cached("SELECT COUNT(*) FROM ingredients WHERE id = ?1")?;
    for item in items {
        let count: i64 = stmt.query_row(params![item.ingredient_id], |row| row.get(0))?;
        if count == 0 {
            errors.add(
                "ingredients",
                format!("Ingredient {} does not exist.", item.ingredient_id),
            );
        }
    }
    Ok(())
}

fn insert_line_items(tx: &Transaction, recipe_id: i64, items: &[LineItemInput]) -> Result<()> {
    let mut stmt = tx.prepare_cached(
        "INSERT INTO line_items (recipe_id, ingredient_id, quantity) VALUES (?1, ?2, ?3)",
    )?;
    for item in items {
        stmt.execute(params![recipe_id, item.ingredient_id, item.quantity])?;
    }
    Ok(())
}

fn load_recipe(conn: &Connection, recipe_id: i64) -> Result<Recipe> {
    let mut recipe = conn
        .query_row(
            &format!("SELECT {} FROM recipes r WHERE r.id = ?1", RECIPE_COLUMNS),
            params![recipe_id],
            recipe_from_row,
        )
        .optional()?
        .ok_or_else(|| AppError::NotFound(format!("recipe {}", recipe_id)))?;
    recipe.line_items = load_line_items(conn, recipe_id)?;
    Ok(recipe)
}

fn load_line_items(conn: &Connection, recipe_id: i64) -> Result<Vec<LineItem>> {
    let mut stmt = conn.prepare_cached(
        r#"SELECT i.id, i.name, i.unit, li.quantity
           FROM line_items li
           JOIN ingredients i ON i.id = li.ingredient_id
           WHERE li.recipe_id = ?1
           ORDER BY li.id"#,
    )?;
    let items = stmt
        .query_map(params![recipe_id], |row| {
            Ok(LineItem {
                ingredient: ingredient_from_row(row)?,
                quantity: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(items)
}

/// Columns in `RECIPE_COLUMNS` order; line items are loaded separately.
fn recipe_from_row(row: &Row) -> rusqlite::Result<Recipe> {
    Ok(Recipe {
        id: row.get(0)?,
        author_id: row.get(1)?,
        name: row.get(2)?,
        instructions: row.get(3)?,
        image_name: row.get(4)?,
        cooking_time: row.get(5)?,
        published_at: datetime_column(row, 6)?,
        line_items: Vec::new(),
    })
}
