use serde::Serialize;
use serde::de::DeserializeOwned;
use slatedb::Db;
use slatedb::object_store::local::LocalFileSystem;
use slatedb::object_store::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// JSON document store backed by SlateDB on a local filesystem.
/// Holds leases for single-host deployments where no Kubernetes API is
/// available.
#[derive(Clone)]
pub struct StateStore {
    db: Db,
    root: String,
}

impl StateStore {
    /// Open (or create) a store rooted at `root` on the local filesystem.
    pub async fn open(root: &str) -> anyhow::Result<Self> {
        info!("Opening SlateDB state store at {}", root);

        std::fs::create_dir_all(root)
            .map_err(|e| anyhow::anyhow!("Failed to create data directory {}: {}", root, e))?;

        let object_store = Arc::new(
            LocalFileSystem::new_with_prefix(root)
                .map_err(|e| anyhow::anyhow!("Failed to create local object store: {}", e))?,
        );
        let db = Db::open(Path::from("/"), object_store)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to open SlateDB at {}: {}", root, e))?;
        Ok(Self {
            db,
            root: root.to_string(),
        })
    }

    /// Serialize `value` as JSON under `key`.
    pub async fn put_json<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        let data = serde_json::to_vec(value)?;
        debug!("SlateDB put {} ({} bytes)", key, data.len());
        self.db
            .put(key.as_bytes(), &data)
            .await
            .map_err(|e| anyhow::anyhow!("SlateDB put {} failed: {}", key, e))?;
        Ok(())
    }

    /// Read and decode the JSON document under `key`, or `None` if absent.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>> {
        let bytes = self
            .db
            .get(key.as_bytes())
            .await
            .map_err(|e| anyhow::anyhow!("SlateDB get {} failed: {}", key, e))?;
        match bytes {
            Some(bytes) => {
                let value = serde_json::from_slice(&bytes)
                    .map_err(|e| anyhow::anyhow!("Corrupt document at {}: {}", key, e))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// Flush and close the underlying database.
    pub async fn close(self) -> anyhow::Result<()> {
        info!("Closing SlateDB state store at {}", self.root);
        self.db
            .close()
            .await
            .map_err(|e| anyhow::anyhow!("SlateDB close failed: {}", e))
    }
}
