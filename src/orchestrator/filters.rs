use super::ListsOrchestrator;
use crate::core::{PriorisError, Result};
use crate::filter::{DateFilter, FilterCriteria, SortOption};
use crate::model::ListType;
use crate::state::StateSnapshot;
use std::sync::Arc;

// Criteria setters are synchronous and never touch the gateway. Each one
// publishes, so the filtered view is recomputed immediately.
impl ListsOrchestrator {
    pub fn update_search_query(&self, query: impl Into<String>) -> Arc<StateSnapshot> {
        let query = query.into();
        self.update_criteria(|criteria| {
            criteria.search_query = (!query.trim().is_empty()).then_some(query);
        })
    }

    pub fn update_type_filter(&self, list_type: Option<ListType>) -> Arc<StateSnapshot> {
        self.update_criteria(|criteria| criteria.selected_type = list_type)
    }

    pub fn update_show_completed(&self, show: bool) -> Arc<StateSnapshot> {
        self.update_criteria(|criteria| criteria.show_completed = show)
    }

    pub fn update_show_in_progress(&self, show: bool) -> Arc<StateSnapshot> {
        self.update_criteria(|criteria| criteria.show_in_progress = show)
    }

    pub fn update_date_filter(&self, filter: Option<DateFilter>) -> Arc<StateSnapshot> {
        self.update_criteria(|criteria| criteria.selected_date_filter = filter)
    }

    /// Set the date filter from its textual name; a blank token clears it.
    ///
    /// An unknown token fails with `InvalidConfig` and leaves the criteria
    /// untouched.
    pub fn update_date_filter_token(&self, token: &str) -> Result<Arc<StateSnapshot>> {
        let filter = if token.trim().is_empty() {
            None
        } else {
            let parsed = DateFilter::parse(token).ok_or_else(|| {
                PriorisError::InvalidConfig(format!("unknown date filter '{}'", token.trim()))
            })?;
            Some(parsed)
        };
        Ok(self.update_date_filter(filter))
    }

    pub fn update_sort_option(&self, sort: SortOption) -> Arc<StateSnapshot> {
        self.update_criteria(|criteria| criteria.sort_option = sort)
    }

    /// Back to the default criteria
    pub fn reset_filters(&self) -> Arc<StateSnapshot> {
        self.update_criteria(|criteria| *criteria = FilterCriteria::default())
    }

    fn update_criteria(&self, f: impl FnOnce(&mut FilterCriteria)) -> Arc<StateSnapshot> {
        self.store.publish(|draft| f(&mut draft.criteria))
    }
}
