use chrono::Utc;
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};

use crate::models::{from_millis, Recipe, RecipeFields, RecipePatch};

/// Recipe persistence with soft-delete support.
///
/// Every read filters on `deleted_at IS NULL`. The connection-level
/// functions (`insert`, `overwrite`, `soft_delete`) let the sync push run
/// a whole batch inside one transaction.
#[derive(Clone)]
pub struct RecipeRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct RecipeRow {
    id: i64,
    user_id: i64,
    title: String,
    description: String,
    ingredients: String,
    steps: String,
    cooking_time: String,
    image_url: Option<String>,
    created_at: i64,
    updated_at: i64,
    deleted_at: Option<i64>,
}

impl From<RecipeRow> for Recipe {
    fn from(row: RecipeRow) -> Self {
        Recipe {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            description: row.description,
            ingredients: row.ingredients,
            steps: row.steps,
            cooking_time: row.cooking_time,
            image_url: row.image_url,
            created_at: from_millis(row.created_at),
            updated_at: from_millis(row.updated_at),
            deleted_at: row.deleted_at.map(from_millis),
        }
    }
}

impl RecipeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>, sqlx::Error> {
        self.pool.begin().await
    }

    pub async fn list_active(&self, user_id: i64) -> Result<Vec<Recipe>, sqlx::Error> {
        let rows: Vec<RecipeRow> = sqlx::query_as(
            "SELECT * FROM recipes WHERE user_id = ? AND deleted_at IS NULL ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Recipe::from).collect())
    }

    pub async fn create(&self, user_id: i64, fields: &RecipeFields) -> Result<Recipe, sqlx::Error> {
        let now = Utc::now().timestamp_millis();
        // Release the connection before the re-read takes another
        let id = {
            let mut conn = self.pool.acquire().await?;
            Self::insert(&mut conn, user_id, fields, now).await?
        };

        self.get_active(id, user_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// Fetches an active recipe owned by `user_id`.
    pub async fn get_active(&self, id: i64, user_id: i64) -> Result<Option<Recipe>, sqlx::Error> {
        let row: Option<RecipeRow> = sqlx::query_as(
            "SELECT * FROM recipes WHERE id = ? AND user_id = ? AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Recipe::from))
    }

    /// Applies a partial update to an active recipe owned by `user_id`.
    ///
    /// Returns `None` if no row matched.
    pub async fn update(
        &self,
        id: i64,
        user_id: i64,
        patch: &RecipePatch,
    ) -> Result<Option<Recipe>, sqlx::Error> {
        let now = Utc::now().timestamp_millis();

        let result = sqlx::query(
            r#"
            UPDATE recipes
            SET title = COALESCE(?, title),
                description = COALESCE(?, description),
                ingredients = COALESCE(?, ingredients),
                steps = COALESCE(?, steps),
                cooking_time = COALESCE(?, cooking_time),
                image_url = COALESCE(?, image_url),
                updated_at = ?
            WHERE id = ? AND user_id = ? AND deleted_at IS NULL
            "#,
        )
        .bind(&patch.title)
        .bind(&patch.description)
        .bind(&patch.ingredients)
        .bind(&patch.steps)
        .bind(&patch.cooking_time)
        .bind(&patch.image_url)
        .bind(now)
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get_active(id, user_id).await
    }

    /// Physically removes a recipe by id, whoever owns it.
    pub async fn hard_delete(&self, id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM recipes WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Active recipes of `user_id` with `updated_at` strictly after `since`.
    pub async fn changed_since(&self, user_id: i64, since: i64) -> Result<Vec<Recipe>, sqlx::Error> {
        let rows: Vec<RecipeRow> = sqlx::query_as(
            r#"
            SELECT * FROM recipes
            WHERE user_id = ? AND updated_at > ? AND deleted_at IS NULL
            ORDER BY updated_at, id
            "#,
        )
        .bind(user_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Recipe::from).collect())
    }

    /// Soft-deletes every active recipe of `user_id`.
    pub async fn soft_delete_all(&self, user_id: i64, now: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE recipes SET deleted_at = ?, updated_at = ? WHERE user_id = ? AND deleted_at IS NULL",
        )
        .bind(now)
        .bind(now)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Physically removes soft-deleted recipes, optionally for one user only.
    pub async fn purge_deleted(&self, user_id: Option<i64>) -> Result<u64, sqlx::Error> {
        let result = match user_id {
            Some(user_id) => {
                sqlx::query("DELETE FROM recipes WHERE deleted_at IS NOT NULL AND user_id = ?")
                    .bind(user_id)
                    .execute(&self.pool)
                    .await?
            }
            None => {
                sqlx::query("DELETE FROM recipes WHERE deleted_at IS NOT NULL")
                    .execute(&self.pool)
                    .await?
            }
        };
        Ok(result.rows_affected())
    }

    /// Inserts a recipe and returns its new id.
    pub async fn insert(
        conn: &mut SqliteConnection,
        user_id: i64,
        fields: &RecipeFields,
        now: i64,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO recipes (user_id, title, description, ingredients, steps, cooking_time, image_url, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(&fields.title)
        .bind(&fields.description)
        .bind(&fields.ingredients)
        .bind(&fields.steps)
        .bind(&fields.cooking_time)
        .bind(&fields.image_url)
        .bind(now)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Overwrites the text fields of an active recipe owned by `user_id`.
    ///
    /// The image reference is left untouched.
    pub async fn overwrite(
        conn: &mut SqliteConnection,
        id: i64,
        user_id: i64,
        fields: &RecipeFields,
        now: i64,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE recipes
            SET title = ?, description = ?, ingredients = ?, steps = ?, cooking_time = ?, updated_at = ?
            WHERE id = ? AND user_id = ? AND deleted_at IS NULL
            "#,
        )
        .bind(&fields.title)
        .bind(&fields.description)
        .bind(&fields.ingredients)
        .bind(&fields.steps)
        .bind(&fields.cooking_time)
        .bind(now)
        .bind(id)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected())
    }

    /// Soft-deletes an active recipe owned by `user_id`.
    pub async fn soft_delete(
        conn: &mut SqliteConnection,
        id: i64,
        user_id: i64,
        now: i64,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE recipes SET deleted_at = ?, updated_at = ? WHERE id = ? AND user_id = ? AND deleted_at IS NULL",
        )
        .bind(now)
        .bind(now)
        .bind(id)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected())
    }

    /// Fetches a recipe by id regardless of owner or deletion state.
    #[cfg(test)]
    pub async fn get_any(&self, id: i64) -> Result<Option<Recipe>, sqlx::Error> {
        let row: Option<RecipeRow> = sqlx::query_as("SELECT * FROM recipes WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Recipe::from))
    }
}
