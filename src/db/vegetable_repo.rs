use chrono::Utc;
use sqlx::SqlitePool;

use super::{decode_timestamp, encode_timestamp};
use crate::models::{Category, Vegetable, VegetableDraft, VegetableId};

/// The vegetable catalog.
#[derive(Debug, Clone)]
pub struct VegetableRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct VegetableRow {
    id: String,
    name: String,
    price: f64,
    category: String,
    photo: String,
    created_at: String,
    updated_at: String,
}

impl VegetableRow {
    fn into_vegetable(self) -> Result<Vegetable, sqlx::Error> {
        let id: VegetableId = self
            .id
            .parse()
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
        let category: Category = self
            .category
            .parse()
            .map_err(|e: String| sqlx::Error::Decode(e.into()))?;

        Ok(Vegetable {
            id,
            name: self.name,
            price: self.price,
            category,
            photo: self.photo,
            created_at: decode_timestamp(&self.created_at)?,
            updated_at: decode_timestamp(&self.updated_at)?,
        })
    }
}

const SELECT_COLUMNS: &str =
    "SELECT id, name, price, category, photo, created_at, updated_at FROM vegetables";

impl VegetableRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Inserts a new vegetable under a freshly generated id.
    pub async fn create(&self, draft: &VegetableDraft) -> Result<Vegetable, sqlx::Error> {
        let vegetable = Vegetable::from_draft(draft);
        let created_at = encode_timestamp(&vegetable.created_at);

        sqlx::query(
            r#"
            INSERT INTO vegetables (id, name, price, category, photo, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(vegetable.id.to_string())
        .bind(&vegetable.name)
        .bind(vegetable.price)
        .bind(vegetable.category.as_str())
        .bind(&vegetable.photo)
        .bind(&created_at)
        .bind(&created_at)
        .execute(&self.pool)
        .await?;

        tracing::info!("Created vegetable {} ({})", vegetable.id, vegetable.name);

        // Return the stored vegetable
        self.get_by_id(&vegetable.id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn get_by_id(&self, id: &VegetableId) -> Result<Option<Vegetable>, sqlx::Error> {
        let row: Option<VegetableRow> = sqlx::query_as(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(VegetableRow::into_vegetable).transpose()
    }

    pub async fn exists(&self, id: &VegetableId) -> Result<bool, sqlx::Error> {
        let found: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM vegetables WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    /// All vegetables in the order they were added.
    pub async fn list(&self) -> Result<Vec<Vegetable>, sqlx::Error> {
        let rows: Vec<VegetableRow> =
            sqlx::query_as(&format!("{} ORDER BY rowid", SELECT_COLUMNS))
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(VegetableRow::into_vegetable).collect()
    }

    /// Replaces name, price and category. The photo only changes when the
    /// draft carries one. Returns `None` when no vegetable has this id.
    pub async fn update(
        &self,
        id: &VegetableId,
        draft: &VegetableDraft,
    ) -> Result<Option<Vegetable>, sqlx::Error> {
        let updated_at = encode_timestamp(&Utc::now());

        let result = sqlx::query(
            r#"
            UPDATE vegetables
            SET name = ?, price = ?, category = ?, photo = COALESCE(?, photo), updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&draft.name)
        .bind(draft.price)
        .bind(draft.category.as_str())
        .bind(draft.photo.as_deref())
        .bind(&updated_at)
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        tracing::info!("Updated vegetable {}", id);
        self.get_by_id(id).await
    }

    /// Returns whether a vegetable was removed.
    pub async fn delete(&self, id: &VegetableId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM vegetables WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        let deleted = result.rows_affected() > 0;
        if deleted {
            tracing::info!("Deleted vegetable {}", id);
        }
        Ok(deleted)
    }
}
