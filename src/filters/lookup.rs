use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::debug;

use super::spec::SubFilterSpec;
use super::{FacetValue, FilterError};
use crate::db::models::{EntityId, IdRow, JsonRow};

/// Resolves one category's parameters into the ids of matching entities.
///
/// Implementations are called from several threads at once, one per
/// active category.
pub trait IdLookup: Sync {
    fn entity_ids(
        &self,
        entity_type: &str,
        category: &str,
        params: &[(String, String)],
    ) -> Result<BTreeSet<EntityId>, FilterError>;
}

/// Supplies the value catalogue of a categorical facet.
pub trait FacetValueSource {
    fn facet_values(
        &self,
        table: &str,
        spec: &SubFilterSpec,
    ) -> Result<Vec<FacetValue>, FilterError>;
}

/// Both lookups against a running filter server.
pub struct HttpLookup {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpLookup {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        category: &str,
        path: &str,
        params: &[(String, String)],
    ) -> Result<T, FilterError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, ?params, "GET");

        let resp = self
            .client
            .get(&url)
            .query(params)
            .send()
            .map_err(|source| FilterError::Network {
                category: category.to_string(),
                source,
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FilterError::Status {
                category: category.to_string(),
                status: status.as_u16(),
            });
        }

        resp.json().map_err(|source| FilterError::Decode {
            category: category.to_string(),
            source,
        })
    }
}

impl IdLookup for HttpLookup {
    fn entity_ids(
        &self,
        entity_type: &str,
        category: &str,
        params: &[(String, String)],
    ) -> Result<BTreeSet<EntityId>, FilterError> {
        let path = format!("/entities/{entity_type}/{category}");
        let rows: Vec<IdRow> = self.get_json(category, &path, params)?;
        Ok(rows.into_iter().map(|r| r.id).collect())
    }
}

impl FacetValueSource for HttpLookup {
    fn facet_values(
        &self,
        table: &str,
        spec: &SubFilterSpec,
    ) -> Result<Vec<FacetValue>, FilterError> {
        let path = format!("/facetValues/{table}");
        let rows: Vec<JsonRow> = self.get_json(table, &path, &spec.value_request())?;
        Ok(rows
            .iter()
            .filter_map(|row| FacetValue::from_row(row, &spec.name, spec.alias.as_deref()))
            .collect())
    }
}
