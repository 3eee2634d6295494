//! Unique (subject, object) pair relations.
//!
//! Favorites, shopping cart entries and subscriptions share one storage
//! contract: a pair exists at most once, adding it twice is a conflict and
//! removing a missing pair is an error. Each relation only describes where
//! it lives and any extra rule it enforces.

use serde::Serialize;

use crate::error::ValidationErrors;

use super::RecipeSummary;

pub trait PairRelation: Send + Sync + 'static {
    /// Human-readable name used in error messages.
    const NAME: &'static str;
    const TABLE: &'static str;
    const SUBJECT_COLUMN: &'static str;
    const OBJECT_COLUMN: &'static str;
    /// Table the object id must exist in.
    const OBJECT_TABLE: &'static str;
    const OBJECT_LABEL: &'static str;

    /// Extra checks run before the pair is stored.
    fn check(_subject: i64, _object: i64) -> Result<(), ValidationErrors> {
        Ok(())
    }
}

/// user -> recipe
pub struct Favorite;

/// user -> recipe
pub struct ShoppingCart;

/// follower -> author
pub struct Subscription;

impl PairRelation for Favorite {
    const NAME: &'static str = "favorites";
    const TABLE: &'static str = "favorites";
    const SUBJECT_COLUMN: &'static str = "user_id";
    const OBJECT_COLUMN: &'static str = "recipe_id";
    const OBJECT_TABLE: &'static str = "recipes";
    const OBJECT_LABEL: &'static str = "recipe";
}

impl PairRelation for ShoppingCart {
    const NAME: &'static str = "shopping cart";
    const TABLE: &'static str = "shopping_cart";
    const SUBJECT_COLUMN: &'static str = "user_id";
    const OBJECT_COLUMN: &'static str = "recipe_id";
    const OBJECT_TABLE: &'static str = "recipes";
    const OBJECT_LABEL: &'static str = "recipe";
}

impl PairRelation for Subscription {
    const NAME: &'static str = "subscriptions";
    const TABLE: &'static str = "subscriptions";
    const SUBJECT_COLUMN: &'static str = "user_id";
    const OBJECT_COLUMN: &'static str = "author_id";
    const OBJECT_TABLE: &'static str = "users";
    const OBJECT_LABEL: &'static str = "author";

    fn check(subject: i64, object: i64) -> Result<(), ValidationErrors> {
        if subject == object {
            return Err(ValidationErrors::single(
                "author",
                "You cannot subscribe to yourself.",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationRecord {
    pub id: i64,
    pub subject_id: i64,
    pub object_id: i64,
}

/// An author the user follows, with a preview of their recipes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Subscribed {
    pub author_id: i64,
    pub username: String,
    pub recipes: Vec<RecipeSummary>,
    pub recipes_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_subscriptions_forbid_self_pairs() {
        assert!(Favorite::check(1, 1).is_ok());
        assert!(ShoppingCart::check(1, 1).is_ok());
        assert!(Subscription::check(1, 2).is_ok());

        let errors = Subscription::check(7, 7).unwrap_err();
        assert!(errors.contains("author"));
    }
}
