use std::collections::BTreeSet;

use super::spec::SubFilterSpec;
use super::FacetValue;
use crate::sql::predicate::VALUE_SEPARATOR;

/// Runtime state of one facet. The variant is fixed by the facet's spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubFilterState {
    Categorical(CategoricalState),
    Numeric(NumericState),
}

/// Selected values of a multi-select facet (OR semantics).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoricalState {
    selected: BTreeSet<String>,
    values: Vec<FacetValue>,
}

/// A numeric range facet. Bounds are kept as typed; the server parses them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NumericState {
    floor: Option<String>,
    ceil: Option<String>,
    enabled: bool,
}

impl SubFilterState {
    pub fn for_spec(spec: &SubFilterSpec) -> Self {
        if spec.is_numeric {
            SubFilterState::Numeric(NumericState::default())
        } else {
            SubFilterState::Categorical(CategoricalState::default())
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, SubFilterState::Numeric(_))
    }

    pub fn as_categorical(&self) -> Option<&CategoricalState> {
        match self {
            SubFilterState::Categorical(state) => Some(state),
            SubFilterState::Numeric(_) => None,
        }
    }

    pub fn as_categorical_mut(&mut self) -> Option<&mut CategoricalState> {
        match self {
            SubFilterState::Categorical(state) => Some(state),
            SubFilterState::Numeric(_) => None,
        }
    }

    pub fn as_numeric(&self) -> Option<&NumericState> {
        match self {
            SubFilterState::Numeric(state) => Some(state),
            SubFilterState::Categorical(_) => None,
        }
    }

    pub fn as_numeric_mut(&mut self) -> Option<&mut NumericState> {
        match self {
            SubFilterState::Numeric(state) => Some(state),
            SubFilterState::Categorical(_) => None,
        }
    }

    /// Drop every selection and bound. The value catalogue is kept.
    pub fn clear(&mut self) {
        match self {
            SubFilterState::Categorical(state) => state.selected.clear(),
            SubFilterState::Numeric(state) => *state = NumericState::default(),
        }
    }

    /// Query parameters this facet contributes to its category's lookup.
    pub fn query_params(&self, name: &str) -> Vec<(String, String)> {
        match self {
            SubFilterState::Categorical(state) => {
                if state.selected.is_empty() {
                    return Vec::new();
                }
                let separator = VALUE_SEPARATOR.to_string();
                let joined = state
                    .selected
                    .iter()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(separator.as_str());
                vec![(name.to_string(), joined)]
            }
            SubFilterState::Numeric(state) => {
                if !state.enabled {
                    return Vec::new();
                }
                let mut params = Vec::new();
                if let Some(ref floor) = state.floor {
                    params.push((format!("{name}_floor"), floor.clone()));
                }
                if let Some(ref ceil) = state.ceil {
                    params.push((format!("{name}_ceil"), ceil.clone()));
                }
                params
            }
        }
    }
}

impl CategoricalState {
    /// Select a value. Returns false if it was already selected.
    pub fn check_value(&mut self, value: &str) -> bool {
        self.selected.insert(value.to_string())
    }

    /// Deselect a value. Returns false if it was not selected.
    pub fn uncheck_value(&mut self, value: &str) -> bool {
        self.selected.remove(value)
    }

    pub fn is_checked(&self, value: &str) -> bool {
        self.selected.contains(value)
    }

    pub fn selected(&self) -> &BTreeSet<String> {
        &self.selected
    }

    pub fn values(&self) -> &[FacetValue] {
        &self.values
    }

    pub fn set_values(&mut self, values: Vec<FacetValue>) {
        self.values = values;
    }
}

impl NumericState {
    /// Set the lower bound; an empty string clears it.
    pub fn set_floor(&mut self, value: &str) {
        self.floor = bound(value);
    }

    /// Set the upper bound; an empty string clears it.
    pub fn set_ceil(&mut self, value: &str) {
        self.ceil = bound(value);
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn floor(&self) -> Option<&str> {
        self.floor.as_deref()
    }

    pub fn ceil(&self) -> Option<&str> {
        self.ceil.as_deref()
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// True when the range narrows results: enabled with at least one bound.
    pub fn is_constraining(&self) -> bool {
        self.enabled && (self.floor.is_some() || self.ceil.is_some())
    }
}

fn bound(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
