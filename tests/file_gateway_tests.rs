use prioris::{
    CustomList, JsonFileGateway, ListItem, ListsOrchestrator, PersistOperation, PersistenceGateway,
    PriorisError,
};
use std::sync::Arc;
use tempfile::tempdir;

#[tokio::test]
async fn missing_file_opens_empty() {
    let dir = tempdir().unwrap();
    let gateway = JsonFileGateway::open(dir.path().join("lists.json")).await.unwrap();

    assert!(gateway.get_all_lists().await.unwrap().is_empty());
    assert!(!gateway.path().exists());
}

#[tokio::test]
async fn writes_survive_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("lists.json");

    {
        let gateway = JsonFileGateway::open(&path).await.unwrap();
        gateway
            .save_list(&CustomList::new("L1", "Groceries").with_description("weekly"))
            .await
            .unwrap();
        gateway.save_item(&ListItem::new("i1", "Milk", "L1")).await.unwrap();
        gateway.save_item(&ListItem::new("i2", "Eggs", "L1")).await.unwrap();
        gateway.delete_item("i2").await.unwrap();
    }

    let reopened = JsonFileGateway::open(&path).await.unwrap();
    let lists = reopened.get_all_lists().await.unwrap();
    assert_eq!(lists.len(), 1);
    assert_eq!(lists[0].description.as_deref(), Some("weekly"));
    assert!(lists[0].items.is_empty());

    let items = reopened.get_items_by_list("L1").await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].title, "Milk");
    assert!(reopened.verify(PersistOperation::DeleteItem, "i2").await.unwrap());
}

#[tokio::test]
async fn no_temp_file_left_behind() {
    let dir = tempdir().unwrap();
    let gateway = JsonFileGateway::open(dir.path().join("lists.json")).await.unwrap();
    gateway.save_list(&CustomList::new("L1", "Groceries")).await.unwrap();
    gateway.clear_all().await.unwrap();

    let entries: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .collect();
    assert_eq!(entries, vec![std::ffi::OsString::from("lists.json")]);
}

#[tokio::test]
async fn corrupt_file_is_a_persistence_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("lists.json");
    std::fs::write(&path, b"{ not json").unwrap();

    let result = JsonFileGateway::open(&path).await;
    assert!(matches!(result, Err(PriorisError::Persistence { .. })));
}

#[tokio::test]
async fn unwritable_location_fails_without_changing_cache() {
    let dir = tempdir().unwrap();
    let parent = dir.path().join("data");
    let gateway = JsonFileGateway::open(parent.join("lists.json")).await.unwrap();
    // A regular file where the parent directory should be
    std::fs::write(&parent, b"").unwrap();

    let result = gateway.save_list(&CustomList::new("L1", "Groceries")).await;

    assert!(matches!(result, Err(PriorisError::Persistence { ref operation, .. }) if operation == "save_list"));
    assert!(gateway.get_list("L1").await.unwrap().is_none());
}

#[tokio::test]
async fn orchestrator_reloads_from_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("lists.json");

    {
        let orchestrator = ListsOrchestrator::new(Arc::new(JsonFileGateway::open(&path).await.unwrap()));
        orchestrator
            .create_list(CustomList::new("L1", "Groceries"))
            .await
            .unwrap();
        orchestrator
            .add_item("L1", ListItem::new("i1", "Milk", "L1"))
            .await
            .unwrap();
    }

    let orchestrator = ListsOrchestrator::new(Arc::new(JsonFileGateway::open(&path).await.unwrap()));
    let snapshot = orchestrator.load_all().await.unwrap();
    assert_eq!(snapshot.find_list("L1").unwrap().items[0].title, "Milk");
}
