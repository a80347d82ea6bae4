use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Identifier of one grid column (a work type).
///
/// Opaque to the engine; the backend decides the format.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(String);

impl CategoryId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CategoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CategoryId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for CategoryId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A category column: id + display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

impl Category {
    pub fn new(id: impl Into<CategoryId>, name: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into() }
    }
}

/// A persisted row as returned by `fetch_entries`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryRecord {
    /// Backend identifier of the row
    #[serde(rename = "id")]
    pub persisted_id: String,
    pub date: NaiveDate,
    pub category_id: CategoryId,
    /// Hours booked
    pub quantity: f64,
    /// Auxiliary owner (e.g. the driver who did the work)
    #[serde(default)]
    pub owner_ref: Option<String>,
}

/// Body sent on create/update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryPayload {
    pub date: NaiveDate,
    pub category_id: CategoryId,
    pub quantity: f64,
    pub owner_ref: Option<String>,
}
