use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use super::category::FilterCategory;
use super::lookup::{FacetValueSource, IdLookup};
use super::spec::EntitySpec;
use super::state::SubFilterState;
use super::{FilterError, FilterOutcome, MapLayer};
use crate::db::models::EntityId;
use crate::sql::predicate::VALUE_SEPARATOR;

/// Lookup payload of one active category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRequest {
    pub category: String,
    pub params: Vec<(String, String)>,
}

/// Everything needed to resolve the state as it was at `generation`.
///
/// A plan is detached from the collection so it can be resolved while the
/// user keeps editing; its result is applied with
/// [`FilterCollection::apply_outcome`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupPlan {
    pub generation: u64,
    pub entity_type: String,
    pub requests: Vec<CategoryRequest>,
}

#[derive(Debug, Clone)]
struct Memo {
    generation: u64,
    outcome: FilterOutcome,
}

/// All filter categories of one entity type, with the last resolved outcome.
#[derive(Debug, Clone)]
pub struct FilterCollection {
    entity_type: String,
    categories: Vec<FilterCategory>,
    generation: u64,
    memo: Option<Memo>,
}

impl FilterCollection {
    pub fn new(spec: EntitySpec) -> Self {
        let categories = spec.categories.into_iter().map(FilterCategory::new).collect();
        Self {
            entity_type: spec.entity_type,
            categories,
            generation: 0,
            memo: None,
        }
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn categories(&self) -> &[FilterCategory] {
        &self.categories
    }

    pub fn category(&self, name: &str) -> Option<&FilterCategory> {
        self.categories.iter().find(|c| c.name() == name)
    }

    /// Active categories, in spec order.
    pub fn active_categories(&self) -> impl Iterator<Item = &FilterCategory> {
        self.categories.iter().filter(|c| c.is_active())
    }

    /// Bumped by every mutation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Select `value`. A value containing the separator could never be sent
    /// intact, so it is refused and the state is left unchanged.
    pub fn check_value(
        &mut self,
        category: &str,
        sub_filter: &str,
        value: &str,
    ) -> Result<bool, FilterError> {
        if value.contains(VALUE_SEPARATOR) {
            return Err(FilterError::InvalidValue {
                category: category.to_string(),
                sub_filter: sub_filter.to_string(),
                value: value.to_string(),
            });
        }
        self.mutate(category, sub_filter, |state| {
            state.as_categorical_mut().map(|s| s.check_value(value)).ok_or("categorical")
        })
    }

    pub fn uncheck_value(
        &mut self,
        category: &str,
        sub_filter: &str,
        value: &str,
    ) -> Result<bool, FilterError> {
        self.mutate(category, sub_filter, |state| {
            state.as_categorical_mut().map(|s| s.uncheck_value(value)).ok_or("categorical")
        })
    }

    pub fn set_floor(
        &mut self,
        category: &str,
        sub_filter: &str,
        value: &str,
    ) -> Result<(), FilterError> {
        self.mutate(category, sub_filter, |state| {
            state.as_numeric_mut().map(|s| s.set_floor(value)).ok_or("numeric")
        })
    }

    pub fn set_ceil(
        &mut self,
        category: &str,
        sub_filter: &str,
        value: &str,
    ) -> Result<(), FilterError> {
        self.mutate(category, sub_filter, |state| {
            state.as_numeric_mut().map(|s| s.set_ceil(value)).ok_or("numeric")
        })
    }

    pub fn set_enabled(
        &mut self,
        category: &str,
        sub_filter: &str,
        enabled: bool,
    ) -> Result<(), FilterError> {
        self.mutate(category, sub_filter, |state| {
            state.as_numeric_mut().map(|s| s.set_enabled(enabled)).ok_or("numeric")
        })
    }

    /// Clear every category.
    pub fn reset(&mut self) {
        for category in &mut self.categories {
            category.reset();
        }
        self.generation += 1;
    }

    pub fn reset_category(&mut self, name: &str) -> Result<(), FilterError> {
        self.category_mut(name)?.reset();
        self.generation += 1;
        Ok(())
    }

    /// Snapshot the active categories' payloads for the current generation.
    pub fn plan(&self) -> LookupPlan {
        let requests = self
            .active_categories()
            .map(|c| CategoryRequest {
                category: c.name().to_string(),
                params: c.query_params(),
            })
            .collect();

        LookupPlan {
            generation: self.generation,
            entity_type: self.entity_type.clone(),
            requests,
        }
    }

    /// Run a plan: one lookup per category, concurrently, then intersect.
    ///
    /// Every lookup is joined before any error is returned, so a failure
    /// never leaves requests running behind the caller.
    pub fn resolve(plan: &LookupPlan, lookup: &dyn IdLookup) -> Result<FilterOutcome, FilterError> {
        if plan.requests.is_empty() {
            return Ok(FilterOutcome::Unfiltered);
        }

        let results: Vec<Result<BTreeSet<EntityId>, FilterError>> = std::thread::scope(|scope| {
            let handles: Vec<_> = plan
                .requests
                .iter()
                .map(|request| {
                    scope.spawn(move || {
                        lookup.entity_ids(&plan.entity_type, &request.category, &request.params)
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|handle| match handle.join() {
                    Ok(result) => result,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        });

        let mut combined: Option<BTreeSet<EntityId>> = None;
        for (request, result) in plan.requests.iter().zip(results) {
            let ids = result?;
            debug!(category = %request.category, matches = ids.len(), "category resolved");
            combined = Some(match combined {
                None => ids,
                Some(acc) => acc.intersection(&ids).copied().collect(),
            });
        }

        Ok(FilterOutcome::Ids(combined.unwrap_or_default()))
    }

    /// Store an outcome resolved for `generation`. Returns false, and keeps
    /// the previous outcome, when the state has changed since.
    pub fn apply_outcome(&mut self, generation: u64, outcome: FilterOutcome) -> bool {
        if generation != self.generation {
            warn!(
                planned = generation,
                current = self.generation,
                "discarding stale filter result"
            );
            return false;
        }
        self.memo = Some(Memo { generation, outcome });
        true
    }

    /// The most recently applied outcome, whatever generation it was for.
    pub fn last_outcome(&self) -> Option<&FilterOutcome> {
        self.memo.as_ref().map(|m| &m.outcome)
    }

    /// The memoized outcome, if it matches the current state.
    pub fn current_outcome(&self) -> Option<&FilterOutcome> {
        self.memo
            .as_ref()
            .filter(|m| m.generation == self.generation)
            .map(|m| &m.outcome)
    }

    /// Resolve the current state, reusing the memo when nothing changed.
    ///
    /// On error the previous outcome is kept and the error returned; no
    /// partial intersection is ever stored.
    pub fn filtered_ids(&mut self, lookup: &dyn IdLookup) -> Result<FilterOutcome, FilterError> {
        if let Some(outcome) = self.current_outcome() {
            return Ok(outcome.clone());
        }

        let plan = self.plan();
        let outcome = Self::resolve(&plan, lookup)?;
        self.apply_outcome(plan.generation, outcome.clone());
        Ok(outcome)
    }

    /// Resolve and push the result to the map. The map is left untouched
    /// when the resolution fails.
    pub fn refresh(
        &mut self,
        lookup: &dyn IdLookup,
        map: &mut dyn MapLayer,
    ) -> Result<FilterOutcome, FilterError> {
        match self.filtered_ids(lookup) {
            Ok(outcome) => {
                map.set_filtered_ids(outcome.ids());
                Ok(outcome)
            }
            Err(err) => {
                warn!("filter refresh failed, keeping previous map state: {err}");
                Err(err)
            }
        }
    }

    /// Fill each categorical facet's value catalogue. Numeric facets have
    /// none. Stops at the first failing lookup.
    pub fn load_values(&mut self, source: &dyn FacetValueSource) -> Result<(), FilterError> {
        for category in &mut self.categories {
            let table = category.name().to_string();
            for (spec, state) in category.states_mut() {
                if let SubFilterState::Categorical(state) = state {
                    let values = source.facet_values(&table, spec)?;
                    info!(
                        category = %table,
                        facet = %spec.name,
                        count = values.len(),
                        "loaded facet values"
                    );
                    state.set_values(values);
                }
            }
        }
        Ok(())
    }

    fn category_mut(&mut self, name: &str) -> Result<&mut FilterCategory, FilterError> {
        self.categories
            .iter_mut()
            .find(|c| c.name() == name)
            .ok_or_else(|| FilterError::UnknownCategory(name.to_string()))
    }

    /// Apply `op` to one facet, then mark its category active and bump the
    /// generation. `op` returns the expected kind name on a kind mismatch.
    fn mutate<T>(
        &mut self,
        category: &str,
        sub_filter: &str,
        op: impl FnOnce(&mut SubFilterState) -> Result<T, &'static str>,
    ) -> Result<T, FilterError> {
        let target = self.category_mut(category)?;
        let state = target.sub_filter_mut(sub_filter)?;
        let value = op(state).map_err(|expected| FilterError::WrongKind {
            category: category.to_string(),
            sub_filter: sub_filter.to_string(),
            expected,
        })?;

        target.mark_active();
        self.generation += 1;
        Ok(value)
    }
}
