use super::{PersistOperation, PersistenceGateway, StoreImage};
use crate::core::Result;
use crate::model::{CustomList, ListItem};
use async_trait::async_trait;
use tokio::sync::RwLock;

/// Process-local gateway, the default backend
#[derive(Debug, Default)]
pub struct InMemoryGateway {
    store: RwLock<StoreImage>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn list_count(&self) -> usize {
        self.store.read().await.lists.len()
    }

    pub async fn item_count(&self) -> usize {
        self.store.read().await.items.len()
    }
}

#[async_trait]
impl PersistenceGateway for InMemoryGateway {
    async fn get_all_lists(&self) -> Result<Vec<CustomList>> {
        Ok(self.store.read().await.all_lists())
    }

    async fn get_list(&self, id: &str) -> Result<Option<CustomList>> {
        Ok(self.store.read().await.list(id))
    }

    async fn save_list(&self, list: &CustomList) -> Result<()> {
        self.store.write().await.put_list(list);
        Ok(())
    }

    async fn delete_list(&self, id: &str) -> Result<()> {
        self.store.write().await.remove_list(id);
        Ok(())
    }

    async fn get_items_by_list(&self, list_id: &str) -> Result<Vec<ListItem>> {
        Ok(self.store.read().await.items_of(list_id))
    }

    async fn get_item(&self, id: &str) -> Result<Option<ListItem>> {
        Ok(self.store.read().await.item(id))
    }

    async fn save_item(&self, item: &ListItem) -> Result<()> {
        self.store.write().await.put_item(item);
        Ok(())
    }

    async fn delete_item(&self, id: &str) -> Result<()> {
        self.store.write().await.remove_item(id);
        Ok(())
    }

    async fn clear_all(&self) -> Result<()> {
        self.store.write().await.clear();
        Ok(())
    }

    async fn verify(&self, operation: PersistOperation, entity_id: &str) -> Result<bool> {
        Ok(self.store.read().await.verify(operation, entity_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lists_are_stored_without_items() {
        let gateway = InMemoryGateway::new();
        let list = CustomList::new("L1", "Groceries")
            .with_items(vec![ListItem::new("i1", "Milk", "L1")]);
        gateway.save_list(&list).await.unwrap();

        let stored = gateway.get_list("L1").await.unwrap().unwrap();
        assert!(stored.items.is_empty());
        assert_eq!(gateway.item_count().await, 0);
    }

    #[tokio::test]
    async fn test_delete_list_cascades_to_items() {
        let gateway = InMemoryGateway::new();
        gateway.save_list(&CustomList::new("L1", "Groceries")).await.unwrap();
        gateway.save_item(&ListItem::new("i1", "Milk", "L1")).await.unwrap();
        gateway.save_item(&ListItem::new("i2", "Tent", "L2")).await.unwrap();

        gateway.delete_list("L1").await.unwrap();
        assert!(gateway.get_item("i1").await.unwrap().is_none());
        assert!(gateway.get_item("i2").await.unwrap().is_some());
        assert!(gateway.verify(PersistOperation::DeleteList, "L1").await.unwrap());
    }

    #[tokio::test]
    async fn test_verify_presence() {
        let gateway = InMemoryGateway::new();
        assert!(!gateway.verify(PersistOperation::CreateList, "L1").await.unwrap());
        gateway.save_list(&CustomList::new("L1", "Groceries")).await.unwrap();
        assert!(gateway.verify(PersistOperation::CreateList, "L1").await.unwrap());
        assert!(!gateway.verify(PersistOperation::CreateItem, "L1").await.unwrap());
    }
}
