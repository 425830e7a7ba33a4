//! In-process storage engine.
//!
//! All collections sit behind one lock, so a batch validates and applies
//! without another writer observing a partial state.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::RwLock;

use super::repository::{WriteAction, WriteOp};
use super::StoreError;

type Collection = BTreeMap<String, (i64, serde_json::Value)>;

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    collections: Arc<RwLock<HashMap<&'static str, Collection>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, collection: &str, key: &str) -> Option<(i64, serde_json::Value)> {
        let collections = self.collections.read().await;
        collections
            .get(collection)
            .and_then(|records| records.get(key))
            .cloned()
    }

    pub async fn list(&self, collection: &str) -> Vec<(i64, serde_json::Value)> {
        let collections = self.collections.read().await;
        collections
            .get(collection)
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn commit(&self, ops: Vec<WriteOp>) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;

        // Validate against current versions, letting earlier ops in the batch
        // shadow the stored ones
        let mut staged: HashMap<(&'static str, String), i64> = HashMap::new();
        for op in &ops {
            let slot = (op.collection, op.key.clone());
            let current = match staged.get(&slot) {
                Some(version) => *version,
                None => collections
                    .get(op.collection)
                    .and_then(|records| records.get(&op.key))
                    .map(|(version, _)| *version)
                    .unwrap_or(0),
            };

            if matches!(op.action, WriteAction::Delete) && current == 0 {
                return Err(StoreError::NotFound {
                    collection: op.collection,
                    key: op.key.clone(),
                });
            }
            if current != op.expected_version {
                return Err(StoreError::ConcurrencyConflict {
                    collection: op.collection,
                    key: op.key.clone(),
                    expected: op.expected_version,
                    actual: current,
                });
            }

            let next = match op.action {
                WriteAction::Upsert(_) => current + 1,
                WriteAction::Delete => 0,
            };
            staged.insert(slot, next);
        }

        for op in ops {
            let records = collections.entry(op.collection).or_default();
            match op.action {
                WriteAction::Upsert(data) => {
                    records.insert(op.key, (op.expected_version + 1, data));
                }
                WriteAction::Delete => {
                    records.remove(&op.key);
                }
            }
        }

        Ok(())
    }
}
