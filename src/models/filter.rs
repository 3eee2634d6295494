//! Composable recipe and ingredient filters.
//!
//! Recipe predicates compile to SQL fragments joined with `AND`. The
//! relation predicates are vacuous for anonymous viewers: they match every
//! recipe instead of none.

use super::{Ingredient, Viewer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipePredicate {
    Author(i64),
    FavoritedBy(Viewer),
    InCartOf(Viewer),
}

impl RecipePredicate {
    /// SQL condition over `recipes r` with one bound id, or `None` when the
    /// predicate matches everything.
    fn to_sql(self) -> Option<(&'static str, i64)> {
        match self {
            RecipePredicate::Author(id) => Some(("r.author_id = ?", id)),
            RecipePredicate::FavoritedBy(viewer) => viewer.user_id().map(|id| {
                (
                    "EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ?)",
                    id,
                )
            }),
            RecipePredicate::InCartOf(viewer) => viewer.user_id().map(|id| {
                (
                    "EXISTS (SELECT 1 FROM shopping_cart c WHERE c.recipe_id = r.id AND c.user_id = ?)",
                    id,
                )
            }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeQuery {
    predicates: Vec<RecipePredicate>,
}

impl RecipeQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn and(mut self, predicate: RecipePredicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn author(self, author_id: i64) -> Self {
        self.and(RecipePredicate::Author(author_id))
    }

    pub fn favorited_by(self, viewer: Viewer) -> Self {
        self.and(RecipePredicate::FavoritedBy(viewer))
    }

    pub fn in_cart_of(self, viewer: Viewer) -> Self {
        self.and(RecipePredicate::InCartOf(viewer))
    }

    /// Build from list parameters. Flags that are absent or false add
    /// nothing.
    pub fn from_params(
        viewer: Viewer,
        author: Option<i64>,
        is_favorited: Option<bool>,
        is_in_shopping_cart: Option<bool>,
    ) -> Self {
        let mut query = Self::new();
        if let Some(author) = author {
            query = query.author(author);
        }
        if is_favorited == Some(true) {
            query = query.favorited_by(viewer);
        }
        if is_in_shopping_cart == Some(true) {
            query = query.in_cart_of(viewer);
        }
        query
    }

    pub fn predicates(&self) -> &[RecipePredicate] {
        &self.predicates
    }

    /// `WHERE ...` clause (empty when nothing filters) and its parameters.
    pub fn where_clause(&self) -> (String, Vec<i64>) {
        let (conditions, params): (Vec<_>, Vec<_>) = self
            .predicates
            .iter()
            .filter_map(|p| p.to_sql())
            .unzip();

        if conditions.is_empty() {
            (String::new(), params)
        } else {
            (format!("WHERE {}", conditions.join(" AND ")), params)
        }
    }
}

/// Case-insensitive name prefix match over the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngredientQuery {
    prefix: Option<String>,
}

impl IngredientQuery {
    pub fn name_starts_with(prefix: &str) -> Self {
        let prefix = prefix.trim().to_lowercase();
        Self {
            prefix: (!prefix.is_empty()).then_some(prefix),
        }
    }

    pub fn matches(&self, ingredient: &Ingredient) -> bool {
        match &self.prefix {
            Some(prefix) => ingredient.name.to_lowercase().starts_with(prefix.as_str()),
            None => true,
        }
    }
}
