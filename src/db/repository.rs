use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{ffi, params, OptionalExtension, Row};
use tokio_rusqlite::Connection;

use crate::error::{AppError, Result};
use crate::links::canonical_path;
use crate::models::{Ingredient, IngredientQuery, NewIngredient, NewUser, User, NAME_MAX_LEN};
use crate::shopping::{consolidate, ShoppingList};

use super::schema::SCHEMA;

pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;
        Self::init(conn).await
    }

    /// Private database that disappears with the repository.
    pub async fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self> {
        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    /// Run `f` on the connection thread. Everything `f` does is one unit of
    /// work; use a transaction inside when it writes more than one row.
    pub(crate) async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut rusqlite::Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        self.conn.call(move |conn| Ok(f(conn))).await?
    }

    // User operations

    pub async fn create_user(&self, user: NewUser) -> Result<User> {
        let created = self
            .run(move |conn| {
                let inserted = conn.execute(
                    "INSERT INTO users (username, email, first_name, last_name) VALUES (?1, ?2, ?3, ?4)",
                    params![user.username, user.email, user.first_name, user.last_name],
                );
                match inserted {
                    Ok(_) => load_user(conn, conn.last_insert_rowid()),
                    Err(e) if violated_constraint(&e) == Some(Constraint::Unique) => Err(
                        AppError::Conflict(format!("user '{}' or email already registered", user.username)),
                    ),
                    Err(e) => Err(e.into()),
                }
            })
            .await?;
        tracing::info!("Created user {} ({})", created.username, created.id);
        Ok(created)
    }

    pub async fn get_user(&self, id: i64) -> Result<User> {
        self.run(move |conn| load_user(conn, id)).await
    }

    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let username = username.to_string();
        self.run(move |conn| {
            let user = conn
                .query_row(
                    "SELECT id, username, email, first_name, last_name FROM users WHERE username = ?1",
                    params![username],
                    user_from_row,
                )
                .optional()?;
            Ok(user)
        })
        .await
    }

    /// Removes the user together with their recipes and relation records.
    pub async fn delete_user(&self, id: i64) -> Result<()> {
        self.run(move |conn| {
            let deleted = conn.execute("DELETE FROM users WHERE id = ?1", params![id])?;
            if deleted == 0 {
                return Err(AppError::NotFound(format!("user {}", id)));
            }
            Ok(())
        })
        .await?;
        tracing::info!("Deleted user {}", id);
        Ok(())
    }

    // Ingredient catalog operations

    /// Get-or-create every complete entry in one transaction. Returns how
    /// many rows were new.
    pub async fn import_ingredients(&self, items: Vec<NewIngredient>) -> Result<usize> {
        let created = self
            .run(move |conn| {
                let tx = conn.transaction()?;
                let mut created = 0;
                {
                    let mut stmt =
                        tx.prepare("INSERT OR IGNORE INTO ingredients (name, unit) VALUES (?1, ?2)")?;
                    for item in &items {
                        let (name, unit) = (item.name.trim(), item.unit.trim());
                        if !item.is_complete()
                            || name.chars().count() > NAME_MAX_LEN
                            || unit.chars().count() > NAME_MAX_LEN
                        {
                            tracing::warn!("Skipping catalog entry {:?}", item);
                            continue;
                        }
                        created += stmt.execute(params![name, unit])?;
                    }
                }
                tx.commit()?;
                Ok(created)
            })
            .await?;
        tracing::info!("Imported {} new ingredients", created);
        Ok(created)
    }

    pub async fn get_ingredient(&self, id: i64) -> Result<Ingredient> {
        self.run(move |conn| {
            conn.query_row(
                "SELECT id, name, unit FROM ingredients WHERE id = ?1",
                params![id],
                ingredient_from_row,
            )
            .optional()?
            .ok_or_else(|| AppError::NotFound(format!("ingredient {}", id)))
        })
        .await
    }

    pub async fn list_ingredients(&self) -> Result<Vec<Ingredient>> {
        self.search_ingredients(&IngredientQuery::default()).await
    }

    pub async fn search_ingredients(&self, query: &IngredientQuery) -> Result<Vec<Ingredient>> {
        let query = query.clone();
        let ingredients = self
            .run(move |conn| {
                let mut stmt =
                    conn.prepare("SELECT id, name, unit FROM ingredients ORDER BY name, unit")?;
                let ingredients = stmt
                    .query_map([], ingredient_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(ingredients
                    .into_iter()
                    .filter(|ingredient| query.matches(ingredient))
                    .collect::<Vec<_>>())
            })
            .await?;
        tracing::debug!("Ingredient search returned {} rows", ingredients.len());
        Ok(ingredients)
    }

    // Shopping list

    /// Consolidated ingredients of every recipe in the user's cart. Read
    /// only; an empty cart gives an empty list.
    pub async fn shopping_list(&self, user_id: i64) -> Result<ShoppingList> {
        let list = self
            .run(move |conn| {
                let mut stmt = conn.prepare(
                    r#"SELECT i.name, i.unit, li.quantity
                       FROM shopping_cart c
                       JOIN line_items li ON li.recipe_id = c.recipe_id
                       JOIN ingredients i ON i.id = li.ingredient_id
                       WHERE c.user_id = ?1"#,
                )?;
                let items = stmt
                    .query_map(params![user_id], |row| {
                        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, u32>(2)?))
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(consolidate(items))
            })
            .await?;
        tracing::debug!("Shopping list for user {} has {} rows", user_id, list.len());
        Ok(list)
    }

    // Short links

    pub async fn resolve_short_link(&self, recipe_id: i64) -> Result<String> {
        self.run(move |conn| {
            if !row_exists(conn, "recipes", recipe_id)? {
                return Err(AppError::NotFound(format!("recipe {}", recipe_id)));
            }
            Ok(canonical_path(recipe_id))
        })
        .await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Constraint {
    Unique,
    ForeignKey,
    Check,
}

pub(crate) fn violated_constraint(err: &rusqlite::Error) -> Option<Constraint> {
    let rusqlite::Error::SqliteFailure(failure, _) = err else {
        return None;
    };
    if failure.code != rusqlite::ErrorCode::ConstraintViolation {
        return None;
    }
    match failure.extended_code {
        ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => Some(Constraint::Unique),
        ffi::SQLITE_CONSTRAINT_FOREIGNKEY => Some(Constraint::ForeignKey),
        ffi::SQLITE_CONSTRAINT_CHECK => Some(Constraint::Check),
        _ => None,
    }
}

/// `table` is always a compile-time table name, never caller input.
pub(crate) fn row_exists(conn: &rusqlite::Connection, table: &str, id: i64) -> Result<bool> {
    let count: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM {} WHERE id = ?1", table),
        params![id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub(crate) fn load_user(conn: &rusqlite::Connection, id: i64) -> Result<User> {
    conn.query_row(
        "SELECT id, username, email, first_name, last_name FROM users WHERE id = ?1",
        params![id],
        user_from_row,
    )
    .optional()?
    .ok_or_else(|| AppError::NotFound(format!("user {}", id)))
}

pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    // Try RFC3339 first (e.g., "2026-01-11T12:34:56.000000Z")
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Try SQLite datetime format (e.g., "2026-01-11 12:34:56")
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

pub(crate) fn datetime_column(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_datetime(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("invalid timestamp '{}'", raw).into(),
        )
    })
}

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
    })
}

pub(crate) fn ingredient_from_row(row: &Row) -> rusqlite::Result<Ingredient> {
    Ok(Ingredient {
        id: row.get(0)?,
        name: row.get(1)?,
        unit: row.get(2)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_timestamp_formats() {
        let dt = parse_datetime("2026-01-11T12:34:56.000001Z").unwrap();
        assert_eq!(format_datetime(&dt), "2026-01-11T12:34:56.000001Z");
        assert!(parse_datetime("2026-01-11 12:34:56").is_some());
        assert!(parse_datetime("yesterday").is_none());
    }

    #[tokio::test]
    async fn catalog_import_is_get_or_create() {
        let repo = Repository::in_memory().await.unwrap();
        let created = repo
            .import_ingredients(vec![
                NewIngredient::new("flour", "g"),
                NewIngredient::new("flour", "g"),
                NewIngredient::new("flour", "kg"),
                NewIngredient::new("", "g"),
            ])
            .await
            .unwrap();
        assert_eq!(created, 2);

        let again = repo
            .import_ingredients(vec![NewIngredient::new("flour", "g"), NewIngredient::new("egg", "pcs")])
            .await
            .unwrap();
        assert_eq!(again, 1);
        assert_eq!(repo.list_ingredients().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn ingredient_search_is_prefix_and_case_insensitive() {
        let repo = Repository::in_memory().await.unwrap();
        repo.import_ingredients(vec![
            NewIngredient::new("Flour", "g"),
            NewIngredient::new("flaxseed", "g"),
            NewIngredient::new("cauliflower", "pcs"),
        ])
        .await
        .unwrap();

        let found = repo
            .search_ingredients(&IngredientQuery::name_starts_with("fl"))
            .await
            .unwrap();
        let names: Vec<_> = found.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Flour", "flaxseed"]);
    }

    #[tokio::test]
    async fn duplicate_users_conflict() {
        let repo = Repository::in_memory().await.unwrap();
        let user = repo.create_user(NewUser::new("alice", "alice@example.com")).await.unwrap();
        assert_eq!(repo.get_user(user.id).await.unwrap().username, "alice");

        let err = repo
            .create_user(NewUser::new("alice", "other@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert!(matches!(repo.get_user(999).await, Err(AppError::NotFound(_))));
        assert_eq!(repo.find_user_by_username("alice").await.unwrap(), Some(user));
        assert!(repo.find_user_by_username("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn file_database_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recipes.db");
        let path = path.to_str().unwrap();

        {
            let repo = Repository::new(path).await.unwrap();
            repo.import_ingredients(vec![NewIngredient::new("salt", "g")]).await.unwrap();
        }

        let repo = Repository::new(path).await.unwrap();
        let salt = repo.list_ingredients().await.unwrap().remove(0);
        assert_eq!(repo.get_ingredient(salt.id).await.unwrap().name, "salt");
        assert!(matches!(repo.get_ingredient(salt.id + 1).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn missing_recipe_short_link_is_not_found() {
        let repo = Repository::in_memory().await.unwrap();
        assert!(matches!(
            repo.resolve_short_link(1).await,
            Err(AppError::NotFound(_))
        ));
    }
}
