use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

const BUILTIN_SITES_FOUILLES: &str = include_str!("sites_fouilles.yaml");

/// Static description of one facet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubFilterSpec {
    /// Column name, also the query parameter name.
    pub name: String,
    #[serde(default)]
    pub is_numeric: bool,
    /// Table the value lookup qualifies `name` with.
    #[serde(default)]
    pub from_table: Option<String>,
    /// Display label; also the alias column of the value lookup.
    #[serde(default)]
    pub alias: Option<String>,
    /// Column the value catalogue is ordered by.
    #[serde(default)]
    pub order: Option<String>,
    /// Lower-bound column of a numeric facet.
    ///
    /// Informational on the client: the server binds `{name}_floor` to its
    /// own column table in `db::catalog`, which must name the same column.
    #[serde(default)]
    pub floor: Option<String>,
    /// Upper-bound column of a numeric facet. Mirrors the server's column
    /// like `floor`.
    #[serde(default)]
    pub ceil: Option<String>,
}

impl SubFilterSpec {
    pub fn display_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    /// Query options of the distinct-values lookup for this facet.
    pub fn value_request(&self) -> Vec<(String, String)> {
        let mut params = vec![("field".to_string(), self.name.clone())];
        if let Some(ref table) = self.from_table {
            params.push(("fromTable".to_string(), table.clone()));
        }
        if let Some(ref alias) = self.alias {
            params.push(("alias".to_string(), alias.clone()));
        }
        if let Some(ref order) = self.order {
            params.push(("order".to_string(), order.clone()));
        }
        params
    }
}

/// One filter category: a group of facets sharing one join pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub infos: Option<String>,
    pub sub_filters: Vec<SubFilterSpec>,
}

/// All filter categories of one entity type, in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySpec {
    pub entity_type: String,
    pub categories: Vec<FilterSpec>,
}

impl EntitySpec {
    /// The configuration shipped with the binary (excavation sites).
    pub fn builtin() -> Result<Self> {
        Self::from_yaml(BUILTIN_SITES_FOUILLES).context("Built-in filter configuration is invalid")
    }

    /// Load a filter configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read filter config: {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse filter config: {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let spec: EntitySpec = serde_yaml::from_str(content)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Names must be unique, and numeric facets need a bound column.
    pub fn validate(&self) -> Result<()> {
        if self.entity_type.is_empty() {
            bail!("entity_type must not be empty");
        }

        let mut categories = HashSet::new();
        for category in &self.categories {
            if !categories.insert(category.name.as_str()) {
                bail!("duplicate filter category: {}", category.name);
            }

            let mut names = HashSet::new();
            for sub in &category.sub_filters {
                if !names.insert(sub.name.as_str()) {
                    bail!("duplicate sub-filter {} in category {}", sub.name, category.name);
                }
                if sub.is_numeric && sub.floor.is_none() && sub.ceil.is_none() {
                    bail!(
                        "numeric sub-filter {}.{} needs a floor or ceil column",
                        category.name,
                        sub.name
                    );
                }
            }
        }
        Ok(())
    }

    pub fn category(&self, name: &str) -> Option<&FilterSpec> {
        self.categories.iter().find(|c| c.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_config_parses() {
        let spec = EntitySpec::builtin().unwrap();
        assert_eq!(spec.entity_type, "sitesFouilles");

        let names: Vec<&str> = spec.categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["vestiges", "decouvertes", "bibliographies"]);

        let vestiges = spec.category("vestiges").unwrap();
        let datations = &vestiges.sub_filters[2];
        assert!(datations.is_numeric);
        assert_eq!(datations.floor.as_deref(), Some("date_debut"));
        assert!(!vestiges.sub_filters[0].is_numeric);
    }

    #[test]
    fn value_request_carries_projection_options() {
        let spec = EntitySpec::builtin().unwrap();
        let periode = &spec.category("vestiges").unwrap().sub_filters[1];
        assert_eq!(
            periode.value_request(),
            vec![
                ("field".to_string(), "periode".to_string()),
                ("fromTable".to_string(), "periodes".to_string()),
                ("alias".to_string(), "Période".to_string()),
                ("order".to_string(), "date_debut".to_string()),
            ]
        );
        assert_eq!(periode.display_name(), "Période");
    }

    #[test]
    fn rejects_duplicates_and_boundless_ranges() {
        let duplicate = r#"
entity_type: sites
categories:
  - name: a
    display_name: A
    sub_filters:
      - name: x
      - name: x
"#;
        assert!(EntitySpec::from_yaml(duplicate).is_err());

        let boundless = r#"
entity_type: sites
categories:
  - name: a
    display_name: A
    sub_filters:
      - name: range
        is_numeric: true
"#;
        assert!(EntitySpec::from_yaml(boundless).is_err());
    }
}
