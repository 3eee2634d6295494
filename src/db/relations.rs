use rusqlite::{params, Connection};

use crate::error::{AppError, Result, ValidationErrors};
use crate::models::{PairRelation, RecipeSummary, RelationRecord, Subscribed};

use super::repository::{row_exists, violated_constraint, Constraint};
use super::Repository;

impl Repository {
    /// Store the pair. Fails with a conflict if it is already there; the
    /// table's unique constraint decides, so concurrent double submissions
    /// leave exactly one row.
    pub async fn add_relation<R: PairRelation>(
        &self,
        subject_id: i64,
        object_id: i64,
    ) -> Result<RelationRecord> {
        let record = self
            .run(move |conn| {
                R::check(subject_id, object_id)?;
                ensure_object::<R>(conn, object_id)?;

                let inserted = conn.execute(
                    &format!(
                        "INSERT INTO {} ({}, {}) VALUES (?1, ?2)",
                        R::TABLE,
                        R::SUBJECT_COLUMN,
                        R::OBJECT_COLUMN
                    ),
                    params![subject_id, object_id],
                );

                match inserted {
                    Ok(_) => Ok(RelationRecord {
                        id: conn.last_insert_rowid(),
                        subject_id,
                        object_id,
                    }),
                    Err(e) => Err(match violated_constraint(&e) {
                        Some(Constraint::Unique) => AppError::Conflict(format!(
                            "{} {} is already in {}",
                            R::OBJECT_LABEL,
                            object_id,
                            R::NAME
                        )),
                        Some(Constraint::ForeignKey) => {
                            AppError::NotFound(format!("user {}", subject_id))
                        }
                        Some(Constraint::Check) => AppError::Validation(ValidationErrors::single(
                            R::OBJECT_LABEL,
                            format!("{} {} cannot be added to {}", R::OBJECT_LABEL, object_id, R::NAME),
                        )),
                        None => e.into(),
                    }),
                }
            })
            .await?;
        tracing::info!(
            "User {} added {} {} to {}",
            subject_id,
            R::OBJECT_LABEL,
            object_id,
            R::NAME
        );
        Ok(record)
    }

    /// Delete the pair. A missing pair is an error, also on a repeated
    /// removal.
    pub async fn remove_relation<R: PairRelation>(&self, subject_id: i64, object_id: i64) -> Result<()> {
        self.run(move |conn| {
            ensure_object::<R>(conn, object_id)?;
            let deleted = conn.execute(
                &format!(
                    "DELETE FROM {} WHERE {} = ?1 AND {} = ?2",
                    R::TABLE,
                    R::SUBJECT_COLUMN,
                    R::OBJECT_COLUMN
                ),
                params![subject_id, object_id],
            )?;
            if deleted == 0 {
                return Err(AppError::NotFound(format!(
                    "{} {} is not in {}",
                    R::OBJECT_LABEL,
                    object_id,
                    R::NAME
                )));
            }
            Ok(())
        })
        .await?;
        tracing::info!(
            "User {} removed {} {} from {}",
            subject_id,
            R::OBJECT_LABEL,
            object_id,
            R::NAME
        );
        Ok(())
    }

    pub async fn relation_exists<R: PairRelation>(&self, subject_id: i64, object_id: i64) -> Result<bool> {
        self.run(move |conn| pair_exists::<R>(conn, subject_id, object_id))
            .await
    }

    /// Authors `user_id` follows, by username. Each carries its recipes,
    /// newest first, cut to `recipes_limit` when that is positive.
    pub async fn subscriptions(
        &self,
        user_id: i64,
        recipes_limit: Option<usize>,
    ) -> Result<Vec<Subscribed>> {
        self.run(move |conn| {
            let mut stmt = conn.prepare(
                r#"SELECT u.id, u.username
                   FROM subscriptions s
                   JOIN users u ON u.id = s.author_id
                   WHERE s.user_id = ?1
                   ORDER BY u.username"#,
            )?;
            let authors = stmt
                .query_map(params![user_id], |row| {
                    Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let mut subscribed = Vec::with_capacity(authors.len());
            for (author_id, username) in authors {
                let mut recipes = recipe_summaries(conn, author_id)?;
                let recipes_count = recipes.len();
                if let Some(limit) = recipes_limit.filter(|l| *l > 0) {
                    recipes.truncate(limit);
                }
                subscribed.push(Subscribed {
                    author_id,
                    username,
                    recipes,
                    recipes_count,
                });
            }
            Ok(subscribed)
        })
        .await
    }
}

pub(crate) fn pair_exists<R: PairRelation>(
    conn: &Connection,
    subject_id: i64,
    object_id: i64,
) -> Result<bool> {
    let count: i64 = conn.query_row(
        &format!(
            "SELECT COUNT(*) FROM {} WHERE {} = ?1 AND {} = ?2",
            R::TABLE,
            R::SUBJECT_COLUMN,
            R::OBJECT_COLUMN
        ),
        params![subject_id, object_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn ensure_object<R: PairRelation>(conn: &Connection, object_id: i64) -> Result<()> {
    if !row_exists(conn, R::OBJECT_TABLE, object_id)? {
        return Err(AppError::NotFound(format!("{} {}", R::OBJECT_LABEL, object_id)));
    }
    Ok(())
}

fn recipe_summaries(conn: &Connection, author_id: i64) -> Result<Vec<RecipeSummary>> {
    let mut stmt = conn.prepare_cached(
        r#"SELECT id, name, image_name, cooking_time
           FROM recipes
           WHERE author_id = ?1
           ORDER BY published_at DESC, id DESC"#,
    )?;
    let recipes = stmt
        .query_map(params![author_id], |row| {
            Ok(RecipeSummary {
                id: row.get(0)?,
                name: row.get(1)?,
                image_name: row.get(2)?,
                cooking_time: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(recipes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ImageBlob;
    use crate::models::{
        Favorite, IngredientQuery, LineItemInput, NewIngredient, NewUser, RecipeDraft,
        Subscription,
    };

    async fn stored_pairs<R: PairRelation>(repo: &Repository, subject_id: i64, object_id: i64) -> i64 {
        repo.run(move |conn| {
            let count: i64 = conn.query_row(
                &format!(
                    "SELECT COUNT(*) FROM {} WHERE {} = ?1 AND {} = ?2",
                    R::TABLE,
                    R::SUBJECT_COLUMN,
                    R::OBJECT_COLUMN
                ),
                params![subject_id, object_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn repeated_adds_never_store_a_second_row() {
        let repo = Repository::in_memory().await.unwrap();
        let cook = repo.create_user(NewUser::new("cook", "cook@example.com")).await.unwrap();
        let fan = repo.create_user(NewUser::new("fan", "fan@example.com")).await.unwrap();
        repo.import_ingredients(vec![NewIngredient::new("rice", "g")]).await.unwrap();
        let rice = repo
            .search_ingredients(&IngredientQuery::name_starts_with("rice"))
            .await
            .unwrap()
            .remove(0);
        let recipe = repo
            .create_recipe(
                cook.id,
                RecipeDraft {
                    name: "Risotto".to_string(),
                    instructions: "Stir for a long time.".to_string(),
                    image: ImageBlob::new(vec![0xff, 0xd8], "jpeg"),
                    cooking_time: 40,
                    ingredients: vec![LineItemInput::new(rice.id, 300)],
                },
            )
            .await
            .unwrap();

        for _ in 0..3 {
            let _ = repo.add_relation::<Favorite>(fan.id, recipe.id).await;
            let _ = repo.add_relation::<Subscription>(fan.id, cook.id).await;
        }
        assert_eq!(stored_pairs::<Favorite>(&repo, fan.id, recipe.id).await, 1);
        assert_eq!(stored_pairs::<Subscription>(&repo, fan.id, cook.id).await, 1);

        repo.remove_relation::<Favorite>(fan.id, recipe.id).await.unwrap();
        assert_eq!(stored_pairs::<Favorite>(&repo, fan.id, recipe.id).await, 0);
    }

    #[tokio::test]
    async fn unknown_subject_is_not_found() {
        let repo = Repository::in_memory().await.unwrap();
        let author = repo.create_user(NewUser::new("author", "a@example.com")).await.unwrap();

        let err = repo.add_relation::<Subscription>(999, author.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
