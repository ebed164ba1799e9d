use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};

use super::category::Category;

static ID_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Store-assigned vegetable identifier: 12 bytes, rendered as 24 hex chars.
///
/// Layout is 4 bytes of Unix seconds (big-endian), 5 random bytes and a
/// 3 byte process-wide counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VegetableId([u8; 12]);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidVegetableId(pub String);

impl fmt::Display for InvalidVegetableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid vegetable id '{}': must be a 24-character hexadecimal string",
            self.0
        )
    }
}

impl std::error::Error for InvalidVegetableId {}

impl VegetableId {
    pub fn generate() -> Self {
        Self::generate_at(Utc::now())
    }

    fn generate_at(now: DateTime<Utc>) -> Self {
        let mut bytes = [0u8; 12];
        let secs = now.timestamp().clamp(0, u32::MAX as i64) as u32;
        bytes[..4].copy_from_slice(&secs.to_be_bytes());
        bytes[4..9].copy_from_slice(&rand::random::<[u8; 5]>());
        let count = ID_COUNTER.fetch_add(1, Ordering::Relaxed) & 0x00ff_ffff;
        bytes[9..].copy_from_slice(&count.to_be_bytes()[1..]);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 12] {
        &self.0
    }

    /// Checks the textual shape without allocating an id.
    pub fn is_valid(s: &str) -> bool {
        s.len() == 24 && s.bytes().all(|b| b.is_ascii_hexdigit())
    }
}

impl fmt::Display for VegetableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

impl FromStr for VegetableId {
    type Err = InvalidVegetableId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !Self::is_valid(s) {
            return Err(InvalidVegetableId(s.to_string()));
        }
        let mut bytes = [0u8; 12];
        for (i, chunk) in s.as_bytes().chunks(2).enumerate() {
            // Both bytes are ASCII hex digits, so the slice is valid UTF-8.
            let pair = std::str::from_utf8(chunk).map_err(|_| InvalidVegetableId(s.to_string()))?;
            bytes[i] =
                u8::from_str_radix(pair, 16).map_err(|_| InvalidVegetableId(s.to_string()))?;
        }
        Ok(Self(bytes))
    }
}

impl Serialize for VegetableId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for VegetableId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Validated fields of a vegetable, ready to be written to the catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VegetableDraft {
    pub name: String,
    pub price: f64,
    pub category: Category,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
}

impl VegetableDraft {
    pub fn new(name: impl Into<String>, price: f64, category: Category) -> Self {
        Self {
            name: name.into(),
            price,
            category,
            photo: None,
        }
    }

    pub fn with_photo(mut self, photo: impl Into<String>) -> Self {
        self.photo = Some(photo.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vegetable {
    pub id: VegetableId,
    pub name: String,
    pub price: f64,
    pub category: Category,
    #[serde(default)]
    pub photo: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Vegetable {
    pub fn from_draft(draft: &VegetableDraft) -> Self {
        let now = Utc::now();
        Self {
            id: VegetableId::generate(),
            name: draft.name.clone(),
            price: draft.price,
            category: draft.category,
            photo: draft.photo.clone().unwrap_or_default(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl fmt::Display for Vegetable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        writeln!(f, "{}", "=".repeat(self.name.len()))?;
        writeln!(f, "ID: {}", self.id)?;
        writeln!(f, "Category: {}", self.category)?;
        writeln!(f, "Price: {:.2}", self.price)?;
        if !self.photo.is_empty() {
            writeln!(f, "Photo: {}", self.photo)?;
        }
        Ok(())
    }
}
