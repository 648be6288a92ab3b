// ============================================================================
// Persistence Gateway
// ============================================================================
//
// Durable storage for lists and list items. The orchestrator only talks to
// this trait; concrete backends live in the submodules.
//
// Lists and items are stored separately: `save_list` ignores nested items
// and `get_all_lists` returns lists with empty `items`. Items are attached
// to their parent through `ListItem::list_id`.
//
// ============================================================================

pub mod file;
pub mod memory;

pub use file::JsonFileGateway;
pub use memory::InMemoryGateway;

use crate::core::Result;
use crate::model::{CustomList, ListItem};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Write operation whose effect `verify` confirms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistOperation {
    CreateList,
    UpdateList,
    DeleteList,
    CreateItem,
    UpdateItem,
    DeleteItem,
}

impl PersistOperation {
    /// Delete operations verify absence; all others verify presence.
    pub fn expects_presence(&self) -> bool {
        !matches!(self, PersistOperation::DeleteList | PersistOperation::DeleteItem)
    }

    pub fn targets_list(&self) -> bool {
        matches!(
            self,
            PersistOperation::CreateList | PersistOperation::UpdateList | PersistOperation::DeleteList
        )
    }
}

impl fmt::Display for PersistOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PersistOperation::CreateList => "create_list",
            PersistOperation::UpdateList => "update_list",
            PersistOperation::DeleteList => "delete_list",
            PersistOperation::CreateItem => "create_item",
            PersistOperation::UpdateItem => "update_item",
            PersistOperation::DeleteItem => "delete_item",
        };
        write!(f, "{label}")
    }
}

#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    async fn get_all_lists(&self) -> Result<Vec<CustomList>>;

    async fn get_list(&self, id: &str) -> Result<Option<CustomList>>;

    async fn save_list(&self, list: &CustomList) -> Result<()>;

    /// Delete a list together with the items that belong to it.
    async fn delete_list(&self, id: &str) -> Result<()>;

    async fn get_items_by_list(&self, list_id: &str) -> Result<Vec<ListItem>>;

    async fn get_item(&self, id: &str) -> Result<Option<ListItem>>;

    async fn save_item(&self, item: &ListItem) -> Result<()>;

    async fn delete_item(&self, id: &str) -> Result<()>;

    async fn clear_all(&self) -> Result<()>;

    /// Confirm that `operation` on `entity_id` is durably applied.
    async fn verify(&self, operation: PersistOperation, entity_id: &str) -> Result<bool>;
}

/// Plain storage image shared by the bundled backends.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct StoreImage {
    #[serde(default)]
    lists: BTreeMap<String, CustomList>,
    #[serde(default)]
    items: BTreeMap<String, ListItem>,
}

impl StoreImage {
    /// Lists in creation order, ties broken by id.
    fn all_lists(&self) -> Vec<CustomList> {
        let mut lists: Vec<CustomList> = self.lists.values().cloned().collect();
        lists.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        lists
    }

    fn list(&self, id: &str) -> Option<CustomList> {
        self.lists.get(id).cloned()
    }

    fn put_list(&mut self, list: &CustomList) {
        self.lists.insert(list.id.clone(), list.without_items());
    }

    fn remove_list(&mut self, id: &str) {
        self.lists.remove(id);
        self.items.retain(|_, item| item.list_id != id);
    }

    fn items_of(&self, list_id: &str) -> Vec<ListItem> {
        let mut items: Vec<ListItem> = self
            .items
            .values()
            .filter(|item| item.list_id == list_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        items
    }

    fn item(&self, id: &str) -> Option<ListItem> {
        self.items.get(id).cloned()
    }

    fn put_item(&mut self, item: &ListItem) {
        self.items.insert(item.id.clone(), item.clone());
    }

    fn remove_item(&mut self, id: &str) {
        self.items.remove(id);
    }

    fn clear(&mut self) {
        self.lists.clear();
        self.items.clear();
    }

    fn verify(&self, operation: PersistOperation, entity_id: &str) -> bool {
        let present = if operation.targets_list() {
            self.lists.contains_key(entity_id)
        } else {
            self.items.contains_key(entity_id)
        };
        present == operation.expects_presence()
    }
}
