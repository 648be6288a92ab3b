use super::{LOG_CONTEXT, ListsOrchestrator};
use crate::core::{PriorisError, Result};
use crate::model::{CustomList, ListItem};
use crate::persistence::PersistOperation;
use serde_json::json;
use std::sync::{Mutex, PoisonError};
use tracing::{Instrument, info_span};

impl ListsOrchestrator {
    /// Persist `item`, verify it, then append it to its parent list.
    ///
    /// `item.list_id` is set to `list_id`. Compensation deletes the item.
    pub async fn add_item(&self, list_id: &str, mut item: ListItem) -> Result<ListItem> {
        let span = info_span!("orchestrator.add_item", list_id = %list_id, item_id = %item.id);
        if let Err(err) = self.require_list(list_id) {
            return self.settle("add_item", Err(err));
        }
        item.list_id = list_id.to_string();
        let item_ref = &item;

        let result = self
            .runner
            .execute_with_rollback(
                "add_item",
                move || async move {
                    self.gateway.save_item(item_ref).await?;
                    self.verify_write(PersistOperation::CreateItem, &item_ref.id)
                        .await?;
                    self.publish_into(list_id, |list| list.items.push(item_ref.clone()))
                },
                move || async move { self.gateway.delete_item(&item_ref.id).await },
            )
            .instrument(span)
            .await;

        self.settle("add_item", result)?;
        Ok(item)
    }

    /// Persist `item` and replace it inside its parent list.
    ///
    /// The rollback target is the item as it was before the call, or `item`
    /// itself when the parent does not hold it yet.
    pub async fn update_item(&self, list_id: &str, mut item: ListItem) -> Result<ListItem> {
        let span =
            info_span!("orchestrator.update_item", list_id = %list_id, item_id = %item.id);
        let parent = match self.require_list(list_id) {
            Ok(parent) => parent,
            Err(err) => return self.settle("update_item", Err(err)),
        };
        item.list_id = list_id.to_string();
        let original = parent
            .find_item(&item.id)
            .cloned()
            .unwrap_or_else(|| item.clone());
        let item_ref = &item;

        let result = self
            .runner
            .execute_with_rollback(
                "update_item",
                move || async move {
                    self.gateway.save_item(item_ref).await?;
                    self.publish_into(list_id, |list| match list.item_position(&item_ref.id) {
                        Some(index) => list.items[index] = item_ref.clone(),
                        None => list.items.push(item_ref.clone()),
                    })
                },
                move || async move {
                    self.gateway.save_item(&original).await?;
                    self.store.publish(|draft| {
                        draft.modify_list(list_id, |list| {
                            if let Some(index) = list.item_position(&original.id) {
                                list.items[index] = original.clone();
                            }
                        });
                    });
                    Ok::<_, PriorisError>(())
                },
            )
            .instrument(span)
            .await;

        self.settle("update_item", result)?;
        Ok(item)
    }

    /// Delete an item from its parent list.
    ///
    /// Fails with `NotFound` when either the list or the item is absent.
    /// Compensation re-saves the item and puts it back at its original index.
    pub async fn remove_item(&self, list_id: &str, item_id: &str) -> Result<()> {
        let span = info_span!("orchestrator.remove_item", list_id = %list_id, item_id = %item_id);
        let located = self.require_list(list_id).and_then(|parent| {
            let index = parent
                .item_position(item_id)
                .ok_or_else(|| PriorisError::not_found("item", item_id))?;
            Ok((index, parent.items[index].clone()))
        });
        let (index, original) = match located {
            Ok(located) => located,
            Err(err) => return self.settle("remove_item", Err(err)),
        };

        let result = self
            .runner
            .execute_with_rollback(
                "remove_item",
                move || async move {
                    self.gateway.delete_item(item_id).await?;
                    self.publish_into(list_id, |list| {
                        list.items.retain(|item| item.id != item_id);
                    })
                },
                move || async move {
                    self.gateway.save_item(&original).await?;
                    self.store.publish(|draft| {
                        draft.modify_list(list_id, |list| {
                            if list.find_item(&original.id).is_none() {
                                let index = index.min(list.items.len());
                                list.items.insert(index, original.clone());
                            }
                        });
                    });
                    Ok::<_, PriorisError>(())
                },
            )
            .instrument(span)
            .await;

        self.settle("remove_item", result)
    }

    /// Persist several items, then append them all in a single publish.
    ///
    /// Compensation deletes every item that was saved before the failure.
    pub async fn add_items(&self, list_id: &str, mut items: Vec<ListItem>) -> Result<Vec<ListItem>> {
        let span = info_span!("orchestrator.add_items", list_id = %list_id, count = items.len());
        if let Err(err) = self.require_list(list_id) {
            return self.settle("add_items", Err(err));
        }
        for item in &mut items {
            item.list_id = list_id.to_string();
        }
        let items_ref = &items;
        let saved: Mutex<Vec<String>> = Mutex::new(Vec::with_capacity(items.len()));
        let saved_ref = &saved;

        let result = self
            .runner
            .execute_with_rollback(
                "add_items",
                move || async move {
                    for item in items_ref {
                        self.gateway.save_item(item).await?;
                        saved_ref
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .push(item.id.clone());
                    }
                    self.publish_into(list_id, |list| list.items.extend(items_ref.iter().cloned()))
                },
                move || async move {
                    let ids = std::mem::take(
                        &mut *saved_ref.lock().unwrap_or_else(PoisonError::into_inner),
                    );
                    for id in ids {
                        self.gateway.delete_item(&id).await?;
                    }
                    Ok::<_, PriorisError>(())
                },
            )
            .instrument(span)
            .await;

        self.settle("add_items", result)?;
        self.sink.debug(
            "Items added",
            LOG_CONTEXT,
            Some(&json!({ "list_id": list_id, "count": items.len() })),
        );
        Ok(items)
    }

    /// Parent list from the current snapshot, or `NotFound`.
    fn require_list(&self, list_id: &str) -> Result<CustomList> {
        self.store
            .current()
            .find_list(list_id)
            .cloned()
            .ok_or_else(|| PriorisError::not_found("list", list_id))
    }

    /// Apply `f` to the parent list and publish, clearing any previous
    /// error. Fails with `NotFound` when the parent vanished meanwhile.
    fn publish_into(&self, list_id: &str, f: impl FnOnce(&mut CustomList)) -> Result<()> {
        let mut found = false;
        self.store.publish(|draft| {
            found = draft.modify_list(list_id, f);
            if found {
                draft.error = None;
            }
        });
        if found {
            Ok(())
        } else {
            Err(PriorisError::not_found("list", list_id))
        }
    }
}
