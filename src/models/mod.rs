mod filter;
mod ingredient;
mod recipe;
mod relation;
mod user;

pub use filter::{IngredientQuery, RecipePredicate, RecipeQuery};
pub use ingredient::{parse_seed, Ingredient, NewIngredient};
pub use recipe::{
    AuthorView, LineItem, LineItemInput, Recipe, RecipeDraft, RecipeInput, RecipeSummary,
    RecipeView, AMOUNT_MAX, AMOUNT_MIN, COOKING_TIME_MAX, COOKING_TIME_MIN, NAME_MAX_LEN,
};
pub use relation::{
    Favorite, PairRelation, RelationRecord, ShoppingCart, Subscribed, Subscription,
};
pub use user::{NewUser, User, Viewer};
