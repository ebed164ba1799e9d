//! Request payloads and the rules that turn them into domain values.
//!
//! Payloads are deserialized first, then validated into typed values
//! ([`VegetableDraft`], [`StockEntry`]) before any store write happens.
//! Rules run in a fixed order and the first failure is reported.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::db::VegetableRepository;
use crate::models::{Category, StockEntry, VegetableDraft, VegetableId};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Name is required and cannot be empty")]
    NameRequired,
    #[error("Price must be a valid non-negative number")]
    InvalidPrice,
    #[error("Category is required")]
    CategoryRequired,
    #[error("Category must be one of: {}", Category::valid_values())]
    InvalidCategory,
    #[error("Vegetables must be an array")]
    EntriesNotArray,
    #[error("Each vegetable must have a valid 24-character hexadecimal id")]
    InvalidEntryId,
    #[error("Each vegetable must have a valid non-negative quantity")]
    InvalidQuantity,
    #[error("Each vegetable must have a non-empty photo URL")]
    MissingPhoto,
    /// Carries the id exactly as the client sent it.
    #[error("Vegetable with id {0} not found")]
    UnknownVegetable(String),
    #[error("Invalid vegetable id format")]
    CatalogLookup,
}

/// Body of `POST /vegetables` and `PUT /vegetables/:id`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VegetablePayload {
    #[serde(default)]
    pub name: Option<String>,
    /// A JSON number or a numeric string.
    #[serde(default)]
    pub price: Option<Value>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub photo: Option<String>,
}

impl VegetablePayload {
    /// Checks name, then price, then category.
    pub fn validate(&self) -> Result<VegetableDraft, ValidationError> {
        let name = self
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or(ValidationError::NameRequired)?;

        let price = self
            .price
            .as_ref()
            .and_then(coerce_number)
            .filter(|p| *p >= 0.0)
            .ok_or(ValidationError::InvalidPrice)?;

        let category = match self.category.as_deref() {
            None | Some("") => return Err(ValidationError::CategoryRequired),
            Some(raw) => raw
                .parse::<Category>()
                .map_err(|_| ValidationError::InvalidCategory)?,
        };

        Ok(VegetableDraft {
            name: name.to_string(),
            price,
            category,
            photo: self.photo.clone(),
        })
    }
}

fn coerce_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Body of `POST /daily-stock` and `PUT /daily-stock/:date`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StockPayload {
    /// Kept untyped so a non-array gets its own message.
    #[serde(default)]
    pub vegetables: Option<Value>,
    #[serde(default)]
    pub date: Option<String>,
}

/// Checks the shape of one stock entry: id, then quantity, then photo.
pub fn parse_stock_entry(value: &Value) -> Result<StockEntry, ValidationError> {
    let id: VegetableId = value
        .get("id")
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok())
        .ok_or(ValidationError::InvalidEntryId)?;

    let quantity = value
        .get("quantity")
        .filter(|q| q.is_number())
        .and_then(Value::as_f64)
        .filter(|q| q.is_finite() && *q >= 0.0)
        .ok_or(ValidationError::InvalidQuantity)?;

    let photo = value
        .get("photo")
        .and_then(Value::as_str)
        .filter(|p| !p.trim().is_empty())
        .ok_or(ValidationError::MissingPhoto)?;

    Ok(StockEntry::new(id, quantity, photo))
}

/// Validates every stock entry against its shape rules and the catalog.
///
/// Entries are checked in order and the first failing entry aborts; nothing
/// is returned unless all of them pass.
pub async fn validate_stock_entries(
    vegetables: Option<&Value>,
    catalog: &VegetableRepository,
) -> Result<Vec<StockEntry>, ValidationError> {
    let items = vegetables
        .and_then(Value::as_array)
        .ok_or(ValidationError::EntriesNotArray)?;

    let mut entries = Vec::with_capacity(items.len());
    for item in items {
        let entry = parse_stock_entry(item)?;
        match catalog.exists(&entry.id).await {
            Ok(true) => {}
            Ok(false) => {
                let raw = item.get("id").and_then(Value::as_str).unwrap_or_default();
                return Err(ValidationError::UnknownVegetable(raw.to_string()));
            }
            Err(e) => {
                tracing::error!("Catalog lookup for {} failed: {}", entry.id, e);
                return Err(ValidationError::CatalogLookup);
            }
        }
        entries.push(entry);
    }
    Ok(entries)
}
