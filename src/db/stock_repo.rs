use chrono::{NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::{decode_timestamp, encode_timestamp};
use crate::dates::{format_stock_date, parse_stock_date};
use crate::models::{DailyStock, QuantityOverflow, StockEntry, StockLedger, VegetableId};

/// Failure of a daily stock write.
#[derive(Debug, Error)]
pub enum StockError {
    #[error(transparent)]
    Overflow(#[from] QuantityOverflow),
    #[error(transparent)]
    Store(#[from] sqlx::Error),
}

/// Result of a merge-or-create write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Merged,
}

/// Result of a full replace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceOutcome {
    Created,
    Replaced,
}

/// Result of removing one vegetable from a day's stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    RecordNotFound,
    EntryNotFound,
}

type LockMap = HashMap<NaiveDate, Arc<AsyncMutex<()>>>;

/// One async mutex per date, so writes to the same day run one at a time.
///
/// An entry lives only while some write holds or waits for it.
#[derive(Debug, Clone, Default)]
struct DateLocks {
    inner: Arc<Mutex<LockMap>>,
}

impl DateLocks {
    async fn acquire(&self, date: NaiveDate) -> DateGuard {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            map.entry(date).or_default().clone()
        };
        // Built before waiting so a cancelled waiter still prunes its entry
        let mut held = DateGuard {
            locks: self.inner.clone(),
            date,
            lock,
            guard: None,
        };
        held.guard = Some(held.lock.clone().lock_owned().await);
        held
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Held for the duration of a write; prunes its map entry when released.
struct DateGuard {
    locks: Arc<Mutex<LockMap>>,
    date: NaiveDate,
    lock: Arc<AsyncMutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for DateGuard {
    fn drop(&mut self) {
        drop(self.guard.take());

        // Every holder takes its first clone under the map lock, so a count
        // of two (the map's and ours) means nobody else holds or waits.
        let mut map = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        let ours = map
            .get(&self.date)
            .is_some_and(|current| Arc::ptr_eq(current, &self.lock));
        if ours && Arc::strong_count(&self.lock) == 2 {
            map.remove(&self.date);
        }
    }
}

/// Daily stock documents, keyed by date.
#[derive(Debug, Clone)]
pub struct StockRepository {
    pool: SqlitePool,
    locks: DateLocks,
}

#[derive(sqlx::FromRow)]
struct StockRow {
    date: String,
    vegetables: String,
    created_at: String,
    updated_at: String,
}

impl StockRow {
    fn into_daily_stock(self) -> Result<DailyStock, sqlx::Error> {
        let date = parse_stock_date(&self.date).ok_or_else(|| {
            sqlx::Error::Decode(format!("invalid stock date '{}'", self.date).into())
        })?;
        let vegetables: StockLedger = serde_json::from_str(&self.vegetables)
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

        Ok(DailyStock {
            date,
            vegetables,
            created_at: decode_timestamp(&self.created_at)?,
            updated_at: decode_timestamp(&self.updated_at)?,
        })
    }
}

const SELECT_COLUMNS: &str = "SELECT date, vegetables, created_at, updated_at FROM daily_stock";

impl StockRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            locks: DateLocks::default(),
        }
    }

    /// Merge-or-create for one date.
    ///
    /// Without a record for `date`, one is created holding `entries`, with
    /// repeated ids already collapsed into a single entry each. Otherwise
    /// each entry is merged into the stored ledger: quantities of known ids
    /// accumulate and unseen ids are appended.
    ///
    /// A sum that would leave the finite range fails with
    /// [`StockError::Overflow`] and nothing is written.
    pub async fn merge(
        &self,
        date: NaiveDate,
        entries: Vec<StockEntry>,
    ) -> Result<(DailyStock, UpsertOutcome), StockError> {
        let _guard = self.locks.acquire(date).await;
        let mut tx = self.pool.begin().await?;

        let now = Utc::now();
        let (stock, outcome) = match fetch(&mut tx, date).await? {
            Some(mut stock) => {
                stock.vegetables.merge_all(entries)?;
                stock.updated_at = now;
                (stock, UpsertOutcome::Merged)
            }
            None => (
                DailyStock::new(date, StockLedger::from_entries(entries)?),
                UpsertOutcome::Created,
            ),
        };

        write(&mut tx, &stock).await?;
        tx.commit().await?;

        tracing::info!(
            "{} daily stock for {} ({} vegetable(s))",
            match outcome {
                UpsertOutcome::Created => "Created",
                UpsertOutcome::Merged => "Merged into",
            },
            date,
            stock.vegetables.len()
        );
        Ok((stock, outcome))
    }

    /// Replaces the whole record for `date`, creating it if needed.
    ///
    /// Repeated ids in `entries` are collapsed additively, as in [`merge`].
    ///
    /// [`merge`]: StockRepository::merge
    pub async fn replace(
        &self,
        date: NaiveDate,
        entries: Vec<StockEntry>,
    ) -> Result<(DailyStock, ReplaceOutcome), StockError> {
        let vegetables = StockLedger::from_entries(entries)?;
        let _guard = self.locks.acquire(date).await;
        let mut tx = self.pool.begin().await?;

        let mut stock = DailyStock::new(date, vegetables);
        let outcome = match fetch(&mut tx, date).await? {
            Some(existing) => {
                stock.created_at = existing.created_at;
                ReplaceOutcome::Replaced
            }
            None => ReplaceOutcome::Created,
        };

        write(&mut tx, &stock).await?;
        tx.commit().await?;

        tracing::info!("Replaced daily stock for {} ({:?})", date, outcome);
        Ok((stock, outcome))
    }

    pub async fn get(&self, date: NaiveDate) -> Result<Option<DailyStock>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        fetch(&mut conn, date).await
    }

    /// Every record, oldest date first.
    pub async fn list(&self) -> Result<Vec<DailyStock>, sqlx::Error> {
        let rows: Vec<StockRow> = sqlx::query_as(&format!("{} ORDER BY date", SELECT_COLUMNS))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(StockRow::into_daily_stock).collect()
    }

    /// Returns whether a record was removed.
    pub async fn delete(&self, date: NaiveDate) -> Result<bool, sqlx::Error> {
        let _guard = self.locks.acquire(date).await;
        let result = sqlx::query("DELETE FROM daily_stock WHERE date = ?")
            .bind(format_stock_date(date))
            .execute(&self.pool)
            .await?;
        let deleted = result.rows_affected() > 0;
        if deleted {
            tracing::info!("Deleted daily stock for {}", date);
        }
        Ok(deleted)
    }

    /// Removes a single vegetable from a day's stock.
    ///
    /// Nothing is written unless the entry was actually present.
    pub async fn remove_entry(
        &self,
        date: NaiveDate,
        id: &VegetableId,
    ) -> Result<RemoveOutcome, StockError> {
        let _guard = self.locks.acquire(date).await;
        let mut tx = self.pool.begin().await?;

        let Some(mut stock) = fetch(&mut tx, date).await? else {
            return Ok(RemoveOutcome::RecordNotFound);
        };
        if stock.vegetables.remove(id).is_none() {
            return Ok(RemoveOutcome::EntryNotFound);
        }
        stock.updated_at = Utc::now();

        write(&mut tx, &stock).await?;
        tx.commit().await?;

        tracing::info!("Removed vegetable {} from daily stock for {}", id, date);
        Ok(RemoveOutcome::Removed)
    }
}

async fn fetch(
    conn: &mut SqliteConnection,
    date: NaiveDate,
) -> Result<Option<DailyStock>, sqlx::Error> {
    let row: Option<StockRow> = sqlx::query_as(&format!("{} WHERE date = ?", SELECT_COLUMNS))
        .bind(format_stock_date(date))
        .fetch_optional(&mut *conn)
        .await?;

    row.map(StockRow::into_daily_stock).transpose()
}

async fn write(conn: &mut SqliteConnection, stock: &DailyStock) -> Result<(), StockError> {
    // JSON has no infinity, so a non-finite quantity would not read back
    if let Some(entry) = stock.vegetables.iter().find(|e| !e.quantity.is_finite()) {
        return Err(QuantityOverflow(entry.id).into());
    }

    let vegetables =
        serde_json::to_string(&stock.vegetables).map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

    sqlx::query(
        r#"
        INSERT INTO daily_stock (date, vegetables, created_at, updated_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(date) DO UPDATE SET
            vegetables = excluded.vegetables,
            created_at = excluded.created_at,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(format_stock_date(stock.date))
    .bind(&vegetables)
    .bind(encode_timestamp(&stock.created_at))
    .bind(encode_timestamp(&stock.updated_at))
    .execute(&mut *conn)
    .await?;

    Ok(())
}
