// ============================================================================
// Filter Projection
// ============================================================================
//
// Derives the visible, sorted view of the lists from the raw collection and
// the active criteria. Projections are pure: the same lists and criteria
// always produce the same output, which is what lets the state store
// recompute the view from scratch on every publish.
//
// ============================================================================

use crate::model::{CustomList, ListType};
use chrono::{DateTime, Datelike, Duration, Utc};
use im::Vector;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Date bucket applied to `created_at`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateFilter {
    Today,
    ThisWeek,
    ThisMonth,
    ThisYear,
    Older,
}

impl DateFilter {
    /// Accepts the snake_case names and their short forms, case-insensitively.
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_lowercase().as_str() {
            "today" => Some(DateFilter::Today),
            "this_week" | "week" => Some(DateFilter::ThisWeek),
            "this_month" | "month" => Some(DateFilter::ThisMonth),
            "this_year" | "year" => Some(DateFilter::ThisYear),
            "older" => Some(DateFilter::Older),
            _ => None,
        }
    }

    /// Whether `at` falls into this bucket relative to `now`.
    pub fn matches(&self, at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self {
            DateFilter::Today => at.date_naive() == now.date_naive(),
            DateFilter::ThisWeek => {
                let days_from_monday = i64::from(now.weekday().num_days_from_monday());
                let week_start = now.date_naive() - Duration::days(days_from_monday);
                at.date_naive() >= week_start && at <= now
            }
            DateFilter::ThisMonth => at.year() == now.year() && at.month() == now.month(),
            DateFilter::ThisYear => at.year() == now.year(),
            DateFilter::Older => at.year() < now.year(),
        }
    }
}

/// Total order applied after filtering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOption {
    NameAsc,
    NameDesc,
    #[default]
    CreatedNewest,
    CreatedOldest,
    ProgressDesc,
    ProgressAsc,
    ItemCountDesc,
}

impl SortOption {
    fn compare(&self, a: &CustomList, b: &CustomList) -> Ordering {
        match self {
            SortOption::NameAsc => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            SortOption::NameDesc => b.name.to_lowercase().cmp(&a.name.to_lowercase()),
            SortOption::CreatedNewest => b.created_at.cmp(&a.created_at),
            SortOption::CreatedOldest => a.created_at.cmp(&b.created_at),
            SortOption::ProgressDesc => b.progress().total_cmp(&a.progress()),
            SortOption::ProgressAsc => a.progress().total_cmp(&b.progress()),
            SortOption::ItemCountDesc => b.item_count().cmp(&a.item_count()),
        }
    }
}

/// Active filter and sort settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub search_query: Option<String>,
    pub selected_type: Option<ListType>,
    pub show_completed: bool,
    pub show_in_progress: bool,
    pub selected_date_filter: Option<DateFilter>,
    pub sort_option: SortOption,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            search_query: None,
            selected_type: None,
            show_completed: true,
            show_in_progress: true,
            selected_date_filter: None,
            sort_option: SortOption::default(),
        }
    }
}

impl FilterCriteria {
    /// Whether any criterion narrows the view
    pub fn is_filtering(&self) -> bool {
        self.search_query
            .as_deref()
            .is_some_and(|query| !query.trim().is_empty())
            || self.selected_type.is_some()
            || !self.show_completed
            || !self.show_in_progress
            || self.selected_date_filter.is_some()
    }
}

/// Pure derivation of the visible lists.
pub trait FilterProjection: Send + Sync {
    fn apply(&self, lists: &Vector<CustomList>, criteria: &FilterCriteria) -> Vector<CustomList>;
}

/// Default projection used by the orchestrator
#[derive(Debug, Clone, Default)]
pub struct DefaultFilterProjection {
    reference_time: Option<DateTime<Utc>>,
}

impl DefaultFilterProjection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the clock used by date buckets.
    pub fn with_reference_time(reference_time: DateTime<Utc>) -> Self {
        Self {
            reference_time: Some(reference_time),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        self.reference_time.unwrap_or_else(Utc::now)
    }

    fn accepts(&self, list: &CustomList, criteria: &FilterCriteria, now: DateTime<Utc>) -> bool {
        if let Some(query) = criteria.search_query.as_deref() {
            let needle = query.trim().to_lowercase();
            if !needle.is_empty() {
                let in_name = list.name.to_lowercase().contains(&needle);
                let in_description = list
                    .description
                    .as_deref()
                    .is_some_and(|description| description.to_lowercase().contains(&needle));
                if !in_name && !in_description {
                    return false;
                }
            }
        }

        if let Some(list_type) = criteria.selected_type {
            if list.list_type != list_type {
                return false;
            }
        }

        if !criteria.show_completed && list.is_completed() {
            return false;
        }
        if !criteria.show_in_progress && list.is_in_progress() {
            return false;
        }

        if let Some(bucket) = criteria.selected_date_filter {
            if !bucket.matches(list.created_at, now) {
                return false;
            }
        }

        true
    }
}

impl FilterProjection for DefaultFilterProjection {
    fn apply(&self, lists: &Vector<CustomList>, criteria: &FilterCriteria) -> Vector<CustomList> {
        let now = self.now();
        let mut visible: Vec<CustomList> = lists
            .iter()
            .filter(|list| self.accepts(list, criteria, now))
            .cloned()
            .collect();

        // `sort_by` is stable: equal keys keep collection order.
        visible.sort_by(|a, b| criteria.sort_option.compare(a, b));
        visible.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ListItem;
    use chrono::TimeZone;

    fn reference() -> DateTime<Utc> {
        // Wednesday
        Utc.with_ymd_and_hms(2024, 5, 15, 12, 0, 0).unwrap()
    }

    fn sample() -> Vector<CustomList> {
        let now = reference();
        let mut done = ListItem::new("i1", "Passport", "trip");
        done.complete();
        let open = ListItem::new("i2", "Tickets", "trip");

        let mut all_done = ListItem::new("i3", "Milk", "groceries");
        all_done.complete();

        let mut lists = Vector::new();
        lists.push_back(
            CustomList::new("trip", "Summer trip")
                .with_type(ListType::Travel)
                .with_items(vec![done, open])
                .with_created_at(now - Duration::days(1)),
        );
        lists.push_back(
            CustomList::new("groceries", "Groceries")
                .with_type(ListType::Shopping)
                .with_description("weekly market run")
                .with_items(vec![all_done])
                .with_created_at(now),
        );
        lists.push_back(
            CustomList::new("books", "Books to read")
                .with_type(ListType::Books)
                .with_created_at(now - Duration::days(400)),
        );
        lists
    }

    fn ids(lists: &Vector<CustomList>) -> Vec<&str> {
        lists.iter().map(|list| list.id.as_str()).collect()
    }

    #[test]
    fn test_default_criteria_keeps_everything_newest_first() {
        let projection = DefaultFilterProjection::with_reference_time(reference());
        let result = projection.apply(&sample(), &FilterCriteria::default());
        assert_eq!(ids(&result), vec!["groceries", "trip", "books"]);
    }

    #[test]
    fn test_date_filter_tokens() {
        assert_eq!(DateFilter::parse("today"), Some(DateFilter::Today));
        assert_eq!(DateFilter::parse(" This_Week "), Some(DateFilter::ThisWeek));
        assert_eq!(DateFilter::parse("month"), Some(DateFilter::ThisMonth));
        assert_eq!(DateFilter::parse("YEAR"), Some(DateFilter::ThisYear));
        assert_eq!(DateFilter::parse("older"), Some(DateFilter::Older));
        assert_eq!(DateFilter::parse("yesterday"), None);
        assert_eq!(DateFilter::parse(""), None);
    }

    #[test]
    fn test_projection_is_idempotent() {
        let projection = DefaultFilterProjection::with_reference_time(reference());
        let criteria = FilterCriteria {
            search_query: Some("o".into()),
            sort_option: SortOption::NameAsc,
            ..FilterCriteria::default()
        };
        let lists = sample();
        let first = projection.apply(&lists, &criteria);
        let second = projection.apply(&lists, &criteria);
        assert_eq!(first, second);
    }

    #[test]
    fn test_search_matches_name_and_description() {
        let projection = DefaultFilterProjection::with_reference_time(reference());
        let by_description = FilterCriteria {
            search_query: Some("MARKET".into()),
            ..FilterCriteria::default()
        };
        assert_eq!(ids(&projection.apply(&sample(), &by_description)), vec!["groceries"]);

        let blank = FilterCriteria {
            search_query: Some("   ".into()),
            ..FilterCriteria::default()
        };
        assert_eq!(projection.apply(&sample(), &blank).len(), 3);
    }

    #[test]
    fn test_completion_toggles() {
        let projection = DefaultFilterProjection::with_reference_time(reference());
        let hide_completed = FilterCriteria {
            show_completed: false,
            ..FilterCriteria::default()
        };
        assert_eq!(ids(&projection.apply(&sample(), &hide_completed)), vec!["trip", "books"]);

        let hide_in_progress = FilterCriteria {
            show_in_progress: false,
            ..FilterCriteria::default()
        };
        assert_eq!(
            ids(&projection.apply(&sample(), &hide_in_progress)),
            vec!["groceries", "books"]
        );
    }

    #[test]
    fn test_type_and_date_filters() {
        let projection = DefaultFilterProjection::with_reference_time(reference());
        let travel = FilterCriteria {
            selected_type: Some(ListType::Travel),
            ..FilterCriteria::default()
        };
        assert_eq!(ids(&projection.apply(&sample(), &travel)), vec!["trip"]);

        let today = FilterCriteria {
            selected_date_filter: Some(DateFilter::Today),
            ..FilterCriteria::default()
        };
        assert_eq!(ids(&projection.apply(&sample(), &today)), vec!["groceries"]);

        let week = FilterCriteria {
            selected_date_filter: Some(DateFilter::ThisWeek),
            ..FilterCriteria::default()
        };
        assert_eq!(ids(&projection.apply(&sample(), &week)), vec!["groceries", "trip"]);

        let older = FilterCriteria {
            selected_date_filter: Some(DateFilter::Older),
            ..FilterCriteria::default()
        };
        assert_eq!(ids(&projection.apply(&sample(), &older)), vec!["books"]);
    }

    #[test]
    fn test_sort_is_stable_for_equal_keys() {
        let projection = DefaultFilterProjection::with_reference_time(reference());
        let mut lists = Vector::new();
        let at = reference();
        lists.push_back(CustomList::new("a", "Same").with_created_at(at));
        lists.push_back(CustomList::new("b", "same").with_created_at(at));
        lists.push_back(CustomList::new("c", "SAME").with_created_at(at));

        let criteria = FilterCriteria {
            sort_option: SortOption::NameAsc,
            ..FilterCriteria::default()
        };
        assert_eq!(ids(&projection.apply(&lists, &criteria)), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_is_filtering() {
        assert!(!FilterCriteria::default().is_filtering());
        let criteria = FilterCriteria {
            show_completed: false,
            ..FilterCriteria::default()
        };
        assert!(criteria.is_filtering());
    }
}
