use serde::{Deserialize, Serialize};

/// Feature identifier of a mapped entity (the `fid` of a site or parcel).
pub type EntityId = i64;

/// One row of an identifier lookup: `{"id": 42}`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdRow {
    pub id: EntityId,
}

/// A result row keyed by column name, as returned by the value lookups.
pub type JsonRow = serde_json::Map<String, serde_json::Value>;

/// Everything shown for one excavation site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteDetails {
    pub details: JsonRow,
    pub discoveries: Vec<JsonRow>,
    pub vestiges: Vec<JsonRow>,
    pub bibliographies: Vec<JsonRow>,
}
