// ============================================================================
// Domain Model
// ============================================================================
//
// Lists are the aggregate root; items belong to exactly one list through
// `list_id`. The in-memory snapshot keeps items nested inside their list,
// while gateways store the two kinds separately.
//
// ============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Generate an identifier for an entity the caller did not name.
pub fn new_entity_id() -> String {
    Uuid::new_v4().to_string()
}

pub const DEFAULT_ELO_SCORE: f64 = 1200.0;

/// Category of a list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListType {
    Travel,
    Shopping,
    Movies,
    Books,
    Restaurants,
    Projects,
    #[default]
    Custom,
}

impl ListType {
    /// Parse a list type from user input
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "travel" => Some(ListType::Travel),
            "shopping" => Some(ListType::Shopping),
            "movies" => Some(ListType::Movies),
            "books" => Some(ListType::Books),
            "restaurants" => Some(ListType::Restaurants),
            "projects" => Some(ListType::Projects),
            "custom" => Some(ListType::Custom),
            _ => None,
        }
    }
}

impl fmt::Display for ListType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ListType::Travel => "Travel",
            ListType::Shopping => "Shopping",
            ListType::Movies => "Movies",
            ListType::Books => "Books",
            ListType::Restaurants => "Restaurants",
            ListType::Projects => "Projects",
            ListType::Custom => "Custom",
        };
        write!(f, "{label}")
    }
}

/// A single entry of a list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListItem {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub elo_score: f64,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub list_id: String,
}

impl ListItem {
    pub fn new(id: impl Into<String>, title: impl Into<String>, list_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            category: None,
            elo_score: DEFAULT_ELO_SCORE,
            is_completed: false,
            created_at: Utc::now(),
            completed_at: None,
            due_date: None,
            list_id: list_id.into(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_due_date(mut self, due_date: DateTime<Utc>) -> Self {
        self.due_date = Some(due_date);
        self
    }

    /// Mark the item done, stamping the completion time once.
    pub fn complete(&mut self) {
        self.is_completed = true;
        if self.completed_at.is_none() {
            self.completed_at = Some(Utc::now());
        }
    }

    pub fn reopen(&mut self) {
        self.is_completed = false;
        self.completed_at = None;
    }
}

/// A user list, the aggregate root of the domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomList {
    pub id: String,
    pub name: String,
    pub list_type: ListType,
    pub description: Option<String>,
    #[serde(default)]
    pub items: Vec<ListItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CustomList {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            list_type: ListType::default(),
            description: None,
            items: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_type(mut self, list_type: ListType) -> Self {
        self.list_type = list_type;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_items(mut self, items: Vec<ListItem>) -> Self {
        self.items = items;
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self.updated_at = created_at;
        self
    }

    /// Copy of this list without its nested items, as stored by gateways.
    pub fn without_items(&self) -> Self {
        Self {
            items: Vec::new(),
            ..self.clone()
        }
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn completed_count(&self) -> usize {
        self.items.iter().filter(|item| item.is_completed).count()
    }

    /// Fraction of completed items in `[0.0, 1.0]`; empty lists report `0.0`.
    pub fn progress(&self) -> f64 {
        if self.items.is_empty() {
            return 0.0;
        }
        self.completed_count() as f64 / self.items.len() as f64
    }

    pub fn is_completed(&self) -> bool {
        !self.items.is_empty() && self.completed_count() == self.items.len()
    }

    pub fn is_in_progress(&self) -> bool {
        let progress = self.progress();
        progress > 0.0 && progress < 1.0
    }

    pub fn find_item(&self, item_id: &str) -> Option<&ListItem> {
        self.items.iter().find(|item| item.id == item_id)
    }

    pub fn item_position(&self, item_id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.id == item_id)
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
