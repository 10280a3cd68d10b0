use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tokio::sync::{Mutex, Notify, RwLock};
use tokio::time::{Duration, Instant, sleep_until};

use crate::config::ProviderConfig;
use crate::manager::PoolState;

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("pool file io: {0}")]
    Io(#[from] std::io::Error),
    #[error("pool file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Whole-document persistence for the pool file:
/// `{ providerType: [ProviderConfig, ...] }`.
#[async_trait]
pub trait PoolStore: Send + Sync + 'static {
    async fn read(&self) -> Result<serde_json::Map<String, JsonValue>, PersistError>;
    async fn write(&self, doc: serde_json::Map<String, JsonValue>) -> Result<(), PersistError>;
}

/// JSON file store. Writes go through a temp file and an atomic rename so
/// a concurrent reader never observes a partial document.
pub struct PoolFileStore {
    path: PathBuf,
}

impl PoolFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Deserialize the whole file into typed pools. A missing file is an
    /// empty set of pools; malformed entries fail the load.
    pub async fn load(&self) -> Result<HashMap<String, Vec<ProviderConfig>>, PersistError> {
        let doc = self.read().await?;
        let mut pools = HashMap::with_capacity(doc.len());
        for (provider_type, entry) in doc {
            let configs: Vec<ProviderConfig> = serde_json::from_value(entry)?;
            pools.insert(provider_type, configs);
        }
        Ok(pools)
    }
}

#[async_trait]
impl PoolStore for PoolFileStore {
    async fn read(&self) -> Result<serde_json::Map<String, JsonValue>, PersistError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(serde_json::Map::new());
            }
            Err(err) => return Err(err.into()),
        };
        let doc: serde_json::Map<String, JsonValue> = serde_json::from_slice(&bytes)?;
        Ok(doc)
    }

    async fn write(&self, doc: serde_json::Map<String, JsonValue>) -> Result<(), PersistError> {
        let bytes = serde_json::to_vec_pretty(&JsonValue::Object(doc))?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

/// Debounced batched persistence: a shared pending-set plus one timer task.
///
/// Every mutation re-arms the timer; when it fires, all pending types are
/// flushed in a single read-modify-write that leaves other on-disk types
/// untouched. A failed write keeps the pending set so the next cycle
/// retries the same data.
pub struct DebouncedSaver {
    pending: Mutex<HashSet<String>>,
    deadline: Mutex<Option<Instant>>,
    notify: Notify,
    interval: Duration,
}

impl DebouncedSaver {
    pub fn new(interval: Duration) -> Self {
        Self {
            pending: Mutex::new(HashSet::new()),
            deadline: Mutex::new(None),
            notify: Notify::new(),
            interval,
        }
    }

    /// Queue `provider_type` and restart the shared timer.
    pub async fn schedule(&self, provider_type: &str) {
        self.pending.lock().await.insert(provider_type.to_string());
        *self.deadline.lock().await = Some(Instant::now() + self.interval);
        self.notify.notify_one();
    }

    /// Queue `provider_type` and fire as soon as the task wakes; used for
    /// structural changes (create/delete/enable/disable).
    pub async fn schedule_immediate(&self, provider_type: &str) {
        self.pending.lock().await.insert(provider_type.to_string());
        *self.deadline.lock().await = Some(Instant::now());
        self.notify.notify_one();
    }

    pub fn spawn_flush_task(
        self: Arc<Self>,
        store: Arc<dyn PoolStore>,
        state: Arc<RwLock<PoolState>>,
    ) {
        tokio::spawn(async move {
            loop {
                let deadline = {
                    let deadline = self.deadline.lock().await;
                    *deadline
                };

                match deadline {
                    None => {
                        self.notify.notified().await;
                        continue;
                    }
                    Some(deadline) => {
                        tokio::select! {
                            _ = sleep_until(deadline) => {}
                            // Re-armed or new type queued: recompute.
                            _ = self.notify.notified() => continue,
                        }
                    }
                }

                let batch: HashSet<String> = {
                    let mut pending = self.pending.lock().await;
                    *self.deadline.lock().await = None;
                    std::mem::take(&mut *pending)
                };
                if batch.is_empty() {
                    continue;
                }

                if let Err(err) = flush_types(store.as_ref(), &state, &batch).await {
                    tracing::warn!(error = %err, "pool flush failed; will retry");
                    let mut pending = self.pending.lock().await;
                    pending.extend(batch);
                    *self.deadline.lock().await = Some(Instant::now() + self.interval);
                    self.notify.notify_one();
                }
            }
        });
    }
}

/// One read-modify-write covering every pending type. Types deleted from
/// the in-memory pools are removed from the document.
async fn flush_types(
    store: &dyn PoolStore,
    state: &RwLock<PoolState>,
    batch: &HashSet<String>,
) -> Result<(), PersistError> {
    let mut doc = store.read().await?;
    {
        let state = state.read().await;
        for provider_type in batch {
            match state.pools.get(provider_type) {
                Some(pool) => {
                    doc.insert(provider_type.clone(), serde_json::to_value(pool)?);
                }
                None => {
                    doc.remove(provider_type);
                }
            }
        }
    }
    store.write(doc).await
}
