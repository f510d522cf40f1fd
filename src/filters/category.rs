use super::spec::{FilterSpec, SubFilterSpec};
use super::state::SubFilterState;
use super::FilterError;

/// One filter category and the state of each of its facets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCategory {
    spec: FilterSpec,
    states: Vec<SubFilterState>,
    active: bool,
}

impl FilterCategory {
    pub fn new(spec: FilterSpec) -> Self {
        let states = spec.sub_filters.iter().map(SubFilterState::for_spec).collect();
        Self {
            spec,
            states,
            active: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn display_name(&self) -> &str {
        &self.spec.display_name
    }

    pub fn spec(&self) -> &FilterSpec {
        &self.spec
    }

    /// Set once the user touches any facet; cleared by a reset.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Facets in spec order.
    pub fn sub_filters(&self) -> impl Iterator<Item = (&SubFilterSpec, &SubFilterState)> {
        self.spec.sub_filters.iter().zip(self.states.iter())
    }

    pub fn sub_filter(&self, name: &str) -> Option<&SubFilterState> {
        self.position(name).map(|i| &self.states[i])
    }

    /// Lookup payload of this category. Empty for an inactive category,
    /// whatever state it still holds.
    pub fn query_params(&self) -> Vec<(String, String)> {
        if !self.active {
            return Vec::new();
        }
        self.sub_filters()
            .flat_map(|(spec, state)| state.query_params(&spec.name))
            .collect()
    }

    pub(crate) fn sub_filter_mut(
        &mut self,
        name: &str,
    ) -> Result<&mut SubFilterState, FilterError> {
        match self.position(name) {
            Some(i) => Ok(&mut self.states[i]),
            None => Err(FilterError::UnknownSubFilter {
                category: self.spec.name.clone(),
                sub_filter: name.to_string(),
            }),
        }
    }

    pub(crate) fn states_mut(
        &mut self,
    ) -> impl Iterator<Item = (&SubFilterSpec, &mut SubFilterState)> {
        self.spec.sub_filters.iter().zip(self.states.iter_mut())
    }

    pub(crate) fn mark_active(&mut self) {
        self.active = true;
    }

    pub(crate) fn reset(&mut self) {
        self.active = false;
        for state in &mut self.states {
            state.clear();
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.spec.sub_filters.iter().position(|s| s.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::spec::EntitySpec;

    fn vestiges() -> FilterCategory {
        let spec = EntitySpec::builtin().unwrap();
        FilterCategory::new(spec.category("vestiges").unwrap().clone())
    }

    #[test]
    fn one_state_per_sub_filter_with_matching_kind() {
        let category = vestiges();
        let kinds: Vec<bool> = category.sub_filters().map(|(_, s)| s.is_numeric()).collect();
        assert_eq!(kinds, [false, false, true]);
        assert!(!category.is_active());
    }

    #[test]
    fn inactive_category_contributes_nothing() {
        let mut category = vestiges();
        category
            .sub_filter_mut("caracterisation")
            .unwrap()
            .as_categorical_mut()
            .unwrap()
            .check_value("mur");
        assert!(category.query_params().is_empty());

        category.mark_active();
        assert_eq!(
            category.query_params(),
            vec![("caracterisation".to_string(), "mur".to_string())]
        );
    }

    #[test]
    fn reset_clears_state_and_flag() {
        let mut category = vestiges();
        category.mark_active();
        category
            .sub_filter_mut("periode")
            .unwrap()
            .as_categorical_mut()
            .unwrap()
            .check_value("romaine");

        category.reset();
        assert!(!category.is_active());
        assert!(category
            .sub_filter("periode")
            .and_then(SubFilterState::as_categorical)
            .unwrap()
            .selected()
            .is_empty());
    }

    #[test]
    fn unknown_sub_filter_is_an_error() {
        let mut category = vestiges();
        assert!(matches!(
            category.sub_filter_mut("inventeur"),
            Err(FilterError::UnknownSubFilter { .. })
        ));
    }
}
