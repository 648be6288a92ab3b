use super::{PersistOperation, PersistenceGateway, StoreImage};
use crate::core::{PriorisError, Result};
use crate::model::{CustomList, ListItem};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

/// Gateway backed by a single JSON document.
///
/// The document is read once at open; every write rewrites it through a
/// temp file and a rename, so a crash leaves either the old or the new
/// image on disk.
#[derive(Debug)]
pub struct JsonFileGateway {
    path: PathBuf,
    store: RwLock<StoreImage>,
}

impl JsonFileGateway {
    /// Open the document at `path`, starting empty if it does not exist.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let store = match fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<StoreImage>(&bytes).map_err(|err| {
                PriorisError::persistence(
                    "open",
                    format!("Failed to parse data file '{}': {}", path.display(), err),
                )
            })?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => StoreImage::default(),
            Err(err) => {
                return Err(PriorisError::persistence(
                    "open",
                    format!("Failed to read data file '{}': {}", path.display(), err),
                ));
            }
        };

        Ok(Self {
            path,
            store: RwLock::new(store),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `mutate` to a copy of the image, write it, then swap it in.
    ///
    /// The cached image only changes once the file write succeeded.
    async fn write_with<F>(&self, operation: &str, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut StoreImage),
    {
        let mut store = self.store.write().await;
        let mut next = store.clone();
        mutate(&mut next);

        let bytes = serde_json::to_vec_pretty(&next).map_err(|err| {
            PriorisError::persistence(operation, format!("Failed to encode data file: {}", err))
        })?;
        atomic_write(&self.path, &bytes, operation).await?;

        *store = next;
        Ok(())
    }
}

#[async_trait]
impl PersistenceGateway for JsonFileGateway {
    async fn get_all_lists(&self) -> Result<Vec<CustomList>> {
        Ok(self.store.read().await.all_lists())
    }

    async fn get_list(&self, id: &str) -> Result<Option<CustomList>> {
        Ok(self.store.read().await.list(id))
    }

    async fn save_list(&self, list: &CustomList) -> Result<()> {
        self.write_with("save_list", |store| store.put_list(list)).await
    }

    async fn delete_list(&self, id: &str) -> Result<()> {
        self.write_with("delete_list", |store| store.remove_list(id)).await
    }

    async fn get_items_by_list(&self, list_id: &str) -> Result<Vec<ListItem>> {
        Ok(self.store.read().await.items_of(list_id))
    }

    async fn get_item(&self, id: &str) -> Result<Option<ListItem>> {
        Ok(self.store.read().await.item(id))
    }

    async fn save_item(&self, item: &ListItem) -> Result<()> {
        self.write_with("save_item", |store| store.put_item(item)).await
    }

    async fn delete_item(&self, id: &str) -> Result<()> {
        self.write_with("delete_item", |store| store.remove_item(id)).await
    }

    async fn clear_all(&self) -> Result<()> {
        self.write_with("clear_all", StoreImage::clear).await
    }

    async fn verify(&self, operation: PersistOperation, entity_id: &str) -> Result<bool> {
        Ok(self.store.read().await.verify(operation, entity_id))
    }
}

/// Replace `path` with `bytes` via a sibling `<name>.tmp` file that is
/// flushed to disk before the rename.
async fn atomic_write(path: &Path, bytes: &[u8], operation: &str) -> Result<()> {
    let io_err = |what: String, err: std::io::Error| {
        PriorisError::persistence(operation, format!("{}: {}", what, err))
    };

    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .await
            .map_err(|err| io_err(format!("cannot create '{}'", dir.display()), err))?;
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let staging = path.with_file_name(tmp_name);

    let mut file = fs::File::create(&staging)
        .await
        .map_err(|err| io_err(format!("cannot create '{}'", staging.display()), err))?;
    file.write_all(bytes)
        .await
        .map_err(|err| io_err(format!("cannot write '{}'", staging.display()), err))?;
    file.sync_all()
        .await
        .map_err(|err| io_err(format!("cannot sync '{}'", staging.display()), err))?;
    drop(file);

    fs::rename(&staging, path)
        .await
        .map_err(|err| io_err(format!("cannot move '{}' into place", staging.display()), err))
}
