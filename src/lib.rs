//! Core of a recipe sharing backend.
//!
//! Recipes are aggregates of ingredient line items that are created and
//! replaced as a whole. Users relate to recipes (favorites, shopping cart)
//! and to each other (subscriptions) through unique pair relations, and the
//! recipes in a cart consolidate into one shopping list.

pub mod config;
pub mod db;
pub mod error;
pub mod image;
pub mod links;
pub mod models;
pub mod shopping;
pub mod transport;

pub use db::Repository;
pub use error::{AppError, Result, ValidationErrors};
