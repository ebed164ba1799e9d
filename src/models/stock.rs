use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use super::vegetable::VegetableId;

/// One vegetable's stock for a day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockEntry {
    pub id: VegetableId,
    pub quantity: f64,
    pub photo: String,
}

impl StockEntry {
    pub fn new(id: VegetableId, quantity: f64, photo: impl Into<String>) -> Self {
        Self {
            id,
            quantity,
            photo: photo.into(),
        }
    }
}

/// What happened to an entry merged into a ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Quantity added onto an existing entry with the same id.
    Accumulated,
    /// New id, appended at the end.
    Appended,
}

/// An accumulated quantity left the finite `f64` range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Quantity for vegetable {0} is too large")]
pub struct QuantityOverflow(pub VegetableId);

/// Ordered stock entries with an id index.
///
/// Entries live in insertion order; `index` maps each id to its slot so
/// merging an incoming entry is a single lookup. On the wire the ledger is
/// just the ordered array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<StockEntry>", into = "Vec<StockEntry>")]
pub struct StockLedger {
    entries: Vec<StockEntry>,
    index: HashMap<VegetableId, usize>,
}

impl StockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a ledger, collapsing repeated ids additively.
    ///
    /// The result therefore holds one entry per id, not necessarily every
    /// input entry as given.
    pub fn from_entries(
        entries: impl IntoIterator<Item = StockEntry>,
    ) -> Result<Self, QuantityOverflow> {
        let mut ledger = Self::new();
        ledger.merge_all(entries)?;
        Ok(ledger)
    }

    /// Adds the quantity onto an existing entry (taking the incoming photo)
    /// or appends an unseen id.
    ///
    /// A sum that is not finite is refused and leaves the ledger unchanged.
    pub fn merge(&mut self, entry: StockEntry) -> Result<MergeOutcome, QuantityOverflow> {
        if !entry.quantity.is_finite() {
            return Err(QuantityOverflow(entry.id));
        }
        match self.index.get(&entry.id) {
            Some(&slot) => {
                let existing = &mut self.entries[slot];
                let total = existing.quantity + entry.quantity;
                if !total.is_finite() {
                    return Err(QuantityOverflow(entry.id));
                }
                existing.quantity = total;
                existing.photo = entry.photo;
                Ok(MergeOutcome::Accumulated)
            }
            None => {
                self.index.insert(entry.id, self.entries.len());
                self.entries.push(entry);
                Ok(MergeOutcome::Appended)
            }
        }
    }

    /// Merges entries in order, stopping at the first overflow.
    pub fn merge_all(
        &mut self,
        entries: impl IntoIterator<Item = StockEntry>,
    ) -> Result<(), QuantityOverflow> {
        for entry in entries {
            self.merge(entry)?;
        }
        Ok(())
    }

    pub fn remove(&mut self, id: &VegetableId) -> Option<StockEntry> {
        let slot = self.index.remove(id)?;
        let removed = self.entries.remove(slot);
        for entry in &self.entries[slot..] {
            if let Some(pos) = self.index.get_mut(&entry.id) {
                *pos -= 1;
            }
        }
        Some(removed)
    }

    pub fn get(&self, id: &VegetableId) -> Option<&StockEntry> {
        self.index.get(id).map(|&slot| &self.entries[slot])
    }

    pub fn entries(&self) -> &[StockEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &StockEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TryFrom<Vec<StockEntry>> for StockLedger {
    type Error = QuantityOverflow;

    fn try_from(entries: Vec<StockEntry>) -> Result<Self, Self::Error> {
        Self::from_entries(entries)
    }
}

impl From<StockLedger> for Vec<StockEntry> {
    fn from(ledger: StockLedger) -> Self {
        ledger.entries
    }
}

/// Stock snapshot for one calendar date. The date is the record's key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStock {
    pub date: NaiveDate,
    pub vegetables: StockLedger,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DailyStock {
    pub fn new(date: NaiveDate, vegetables: StockLedger) -> Self {
        let now = Utc::now();
        Self {
            date,
            vegetables,
            created_at: now,
            updated_at: now,
        }
    }

    /// Entries with stock left over, in stored order.
    pub fn remaining(&self) -> impl Iterator<Item = &StockEntry> {
        self.vegetables.iter().filter(|e| e.quantity > 0.0)
    }
}
