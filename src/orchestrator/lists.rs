use super::{LOG_CONTEXT, ListsOrchestrator};
use crate::core::{PriorisError, Result};
use crate::model::CustomList;
use crate::persistence::{PersistOperation, PersistenceGateway};
use crate::state::StateSnapshot;
use futures::future::try_join_all;
use im::Vector;
use serde_json::json;
use std::sync::Arc;
use tracing::{Instrument, info_span};

impl ListsOrchestrator {
    /// Persist a new list and its items, verify it, then insert it.
    ///
    /// Nested items are re-parented onto `list` before they are saved.
    /// Compensation deletes the list (and with it any saved items).
    pub async fn create_list(&self, mut list: CustomList) -> Result<CustomList> {
        let span = info_span!("orchestrator.create_list", list_id = %list.id);
        for item in list.items.iter_mut() {
            item.list_id = list.id.clone();
        }
        let list_ref = &list;

        let result = self
            .runner
            .execute_with_rollback(
                "create_list",
                move || async move {
                    self.gateway.save_list(list_ref).await?;
                    for item in &list_ref.items {
                        self.gateway.save_item(item).await?;
                    }
                    self.verify_write(PersistOperation::CreateList, &list_ref.id)
                        .await?;
                    self.store.publish(|draft| {
                        draft.upsert_list(list_ref.clone());
                        draft.error = None;
                    });
                    Ok::<_, PriorisError>(())
                },
                move || async move { self.gateway.delete_list(&list_ref.id).await },
            )
            .instrument(span)
            .await;

        self.settle("create_list", result)?;
        self.sink.info(
            "List created",
            LOG_CONTEXT,
            Some(&json!({ "list_id": list.id, "items": list.items.len() })),
        );
        Ok(list)
    }

    /// Persist the list's own fields and replace the snapshot entry with the
    /// same id.
    ///
    /// `list.items` is ignored: the entry keeps the items it already holds,
    /// which only change through the item operations. The returned list is
    /// the entry as published. The rollback target is the entry currently in
    /// the snapshot, or `list` itself when there is none.
    pub async fn update_list(&self, list: CustomList) -> Result<CustomList> {
        let span = info_span!("orchestrator.update_list", list_id = %list.id);
        let original = self
            .store
            .current()
            .find_list(&list.id)
            .cloned()
            .unwrap_or_else(|| list.clone());
        let list_ref = &list;

        let result = self
            .runner
            .execute_with_rollback(
                "update_list",
                move || async move {
                    self.gateway.save_list(list_ref).await?;
                    self.store.publish(|draft| {
                        let replaced = draft.modify_list(&list_ref.id, |entry| {
                            let items = std::mem::take(&mut entry.items);
                            *entry = list_ref.without_items();
                            entry.items = items;
                        });
                        if !replaced {
                            draft.upsert_list(list_ref.without_items());
                        }
                        draft.error = None;
                    });
                    Ok::<_, PriorisError>(())
                },
                move || async move {
                    self.gateway.save_list(&original).await?;
                    self.store.publish(|draft| {
                        draft.modify_list(&original.id, |entry| *entry = original.clone());
                    });
                    Ok::<_, PriorisError>(())
                },
            )
            .instrument(span)
            .await;

        self.settle("update_list", result)?;
        Ok(self.find_list(&list.id).unwrap_or_else(|| list.without_items()))
    }

    /// Delete a list and its items.
    ///
    /// Fails with `NotFound` without touching the gateway when the list is
    /// not in the snapshot. Compensation re-saves the list and its items and
    /// puts it back at its original position.
    pub async fn delete_list(&self, id: &str) -> Result<()> {
        let span = info_span!("orchestrator.delete_list", list_id = %id);
        let snapshot = self.store.current();
        let (Some(index), Some(original)) = (snapshot.position_of(id), snapshot.find_list(id))
        else {
            return self.settle("delete_list", Err(PriorisError::not_found("list", id)));
        };
        let original = original.clone();

        let result = self
            .runner
            .execute_with_rollback(
                "delete_list",
                move || async move {
                    self.gateway.delete_list(id).await?;
                    self.store.publish(|draft| {
                        draft.remove_list(id);
                        draft.error = None;
                    });
                    Ok::<_, PriorisError>(())
                },
                move || async move {
                    restore_list(self.gateway.as_ref(), &original).await?;
                    self.store
                        .publish(|draft| draft.insert_list_at(index, original.clone()));
                    Ok::<_, PriorisError>(())
                },
            )
            .instrument(span)
            .await;

        self.settle("delete_list", result)
    }

    /// Remove every list and item from the gateway and the snapshot.
    ///
    /// Compensation re-saves everything that was in the snapshot, then
    /// reloads from the gateway (or restores the captured collection when
    /// `reload_after_clear_rollback` is off).
    pub async fn clear_all(&self) -> Result<()> {
        let span = info_span!("orchestrator.clear_all");
        let captured = self.store.current().lists().clone();
        let captured_ref = &captured;

        let result = self
            .runner
            .execute_with_rollback(
                "clear_all",
                move || async move {
                    self.gateway.clear_all().await?;
                    self.store.publish(|draft| {
                        draft.lists = Vector::new();
                        draft.error = None;
                    });
                    Ok::<_, PriorisError>(())
                },
                move || async move {
                    for list in captured_ref {
                        restore_list(self.gateway.as_ref(), list).await?;
                    }
                    if self.config.reload_after_clear_rollback {
                        let lists = self.fetch_all().await?;
                        self.store
                            .publish(|draft| draft.lists = lists.into_iter().collect());
                    } else {
                        self.store.publish(|draft| draft.lists = captured_ref.clone());
                    }
                    Ok::<_, PriorisError>(())
                },
            )
            .instrument(span)
            .await;

        self.settle("clear_all", result)?;
        self.sink.info(
            "All lists cleared",
            LOG_CONTEXT,
            Some(&json!({ "cleared": captured.len() })),
        );
        Ok(())
    }

    /// Replace the in-memory collection with what the gateway holds.
    ///
    /// Not compensated. `is_loading` is set for the duration of the call.
    pub async fn load_all(&self) -> Result<Arc<StateSnapshot>> {
        let span = info_span!("orchestrator.load_all");
        self.store.publish(|draft| draft.is_loading = true);

        match self.fetch_all().instrument(span).await {
            Ok(lists) => {
                let count = lists.len();
                let snapshot = self.store.publish(|draft| {
                    draft.lists = lists.into_iter().collect();
                    draft.is_loading = false;
                    draft.error = None;
                });
                self.sink.debug(
                    "Lists loaded",
                    LOG_CONTEXT,
                    Some(&json!({ "lists": count, "version": snapshot.version() })),
                );
                Ok(snapshot)
            }
            Err(err) => {
                self.report_failure("load_all", &err, true);
                Err(err)
            }
        }
    }

    /// All lists with their items attached, items fetched concurrently.
    pub(super) async fn fetch_all(&self) -> Result<Vec<CustomList>> {
        let gateway = self.gateway.as_ref();
        let lists = gateway.get_all_lists().await?;
        try_join_all(lists.into_iter().map(|mut list| async move {
            list.items = gateway.get_items_by_list(&list.id).await?;
            Ok::<_, PriorisError>(list)
        }))
        .await
    }

    /// Fail with `VerificationFailed` when enabled and the gateway cannot
    /// confirm the write.
    pub(super) async fn verify_write(&self, operation: PersistOperation, id: &str) -> Result<()> {
        if !self.config.verify_writes {
            return Ok(());
        }
        if self.gateway.verify(operation, id).await? {
            Ok(())
        } else {
            Err(PriorisError::verification_failed(operation, id))
        }
    }
}

async fn restore_list(gateway: &dyn PersistenceGateway, list: &CustomList) -> Result<()> {
    gateway.save_list(list).await?;
    for item in &list.items {
        gateway.save_item(item).await?;
    }
    Ok(())
}
