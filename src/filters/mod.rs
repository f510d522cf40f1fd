//! Client-side facet state and its resolution into identifier sets.

pub mod category;
pub mod collection;
pub mod lookup;
pub mod spec;
pub mod state;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::db::models::{EntityId, JsonRow};

pub use category::FilterCategory;
pub use collection::{FilterCollection, LookupPlan};
pub use lookup::{FacetValueSource, HttpLookup, IdLookup};
pub use spec::{EntitySpec, FilterSpec, SubFilterSpec};
pub use state::SubFilterState;

#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error("unknown filter category: {0}")]
    UnknownCategory(String),

    #[error("unknown sub-filter {sub_filter} in category {category}")]
    UnknownSubFilter { category: String, sub_filter: String },

    #[error("sub-filter {category}.{sub_filter} is not {expected}")]
    WrongKind {
        category: String,
        sub_filter: String,
        expected: &'static str,
    },

    #[error("lookup for {category} failed")]
    Network {
        category: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("lookup for {category} returned HTTP {status}")]
    Status { category: String, status: u16 },

    #[error("lookup for {category} returned a malformed body")]
    Decode {
        category: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("value {value:?} for {category}.{sub_filter} contains the value separator")]
    InvalidValue {
        category: String,
        sub_filter: String,
        value: String,
    },
}

/// What the map should show after a resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FilterOutcome {
    /// No category is active: clear the layer filter and show everything.
    Unfiltered,
    /// Entities satisfying every active category. May be empty.
    Ids(BTreeSet<EntityId>),
}

impl FilterOutcome {
    pub fn ids(&self) -> Option<&BTreeSet<EntityId>> {
        match self {
            FilterOutcome::Unfiltered => None,
            FilterOutcome::Ids(ids) => Some(ids),
        }
    }
}

/// Consumer of the final identifier set (the map layer).
pub trait MapLayer {
    /// `None` clears the filter; `Some` restricts the layer to these ids.
    fn set_filtered_ids(&mut self, ids: Option<&BTreeSet<EntityId>>);
}

/// One entry of a facet's value catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetValue {
    /// Stored value, used in predicates.
    pub internal_value: String,
    /// Presentation label. Never sent back to the server.
    pub display_value: String,
}

impl FacetValue {
    /// Read a catalogue entry from a value-lookup row.
    ///
    /// The display label comes from the `alias` column, then the fixed
    /// queries' `label` column, then falls back to the internal value.
    pub fn from_row(row: &JsonRow, field: &str, alias: Option<&str>) -> Option<Self> {
        let internal_value = scalar_text(row.get(field)?)?;
        let display_value = alias
            .and_then(|a| row.get(a))
            .or_else(|| row.get("label"))
            .and_then(scalar_text)
            .unwrap_or_else(|| internal_value.clone());

        Some(FacetValue {
            internal_value,
            display_value,
        })
    }
}

fn scalar_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
