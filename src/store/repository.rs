//! Store Repository
//!
//! Versioned key-value repository over JSON documents. Every write names the
//! version it was computed from; a batch is applied atomically or not at all.

use serde::{de::DeserializeOwned, Serialize};
use sqlx::PgPool;

use super::memory::MemoryStore;
use super::postgres::PgStore;
use super::StoreError;

/// A record type that lives in one collection under a string key
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync {
    /// Collection name (for storage)
    const COLLECTION: &'static str;

    /// Primary key within the collection
    fn key(&self) -> String;
}

/// A record together with the version it was read at
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub version: i64,
    pub record: T,
}

/// What a write does to its record
#[derive(Debug, Clone)]
pub enum WriteAction {
    Upsert(serde_json::Value),
    Delete,
}

/// One write inside an atomic batch
#[derive(Debug, Clone)]
pub struct WriteOp {
    pub collection: &'static str,
    pub key: String,
    /// Version the caller read; 0 means the record must not exist yet
    pub expected_version: i64,
    pub action: WriteAction,
}

impl WriteOp {
    /// Write `record` over the version the caller read
    pub fn upsert<T: Entity>(record: &T, expected_version: i64) -> Result<Self, StoreError> {
        Ok(Self {
            collection: T::COLLECTION,
            key: record.key(),
            expected_version,
            action: WriteAction::Upsert(serde_json::to_value(record)?),
        })
    }

    /// Create a record that must not exist yet
    pub fn insert<T: Entity>(record: &T) -> Result<Self, StoreError> {
        Self::upsert(record, 0)
    }

    /// Remove the record at `key`
    pub fn delete<T: Entity>(key: impl Into<String>, expected_version: i64) -> Self {
        Self {
            collection: T::COLLECTION,
            key: key.into(),
            expected_version,
            action: WriteAction::Delete,
        }
    }
}

/// Storage engine selected at startup
#[derive(Debug, Clone)]
pub enum Store {
    Memory(MemoryStore),
    Postgres(PgStore),
}

impl Store {
    /// Create an empty in-process store
    pub fn in_memory() -> Self {
        Store::Memory(MemoryStore::new())
    }

    /// Create a store backed by the `records` table
    pub fn postgres(pool: PgPool) -> Self {
        Store::Postgres(PgStore::new(pool))
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            Store::Memory(_) => "memory",
            Store::Postgres(_) => "postgres",
        }
    }

    /// Connection pool of the Postgres engine, if that is the one in use
    pub fn pg_pool(&self) -> Option<&PgPool> {
        match self {
            Store::Memory(_) => None,
            Store::Postgres(store) => Some(store.pool()),
        }
    }

    /// Load one record
    pub async fn get<T: Entity>(&self, key: &str) -> Result<Option<Versioned<T>>, StoreError> {
        let raw = match self {
            Store::Memory(store) => store.get(T::COLLECTION, key).await,
            Store::Postgres(store) => store.get(T::COLLECTION, key).await?,
        };

        raw.map(|(version, data)| {
            Ok(Versioned {
                version,
                record: serde_json::from_value(data)?,
            })
        })
        .transpose()
    }

    /// Load every record of a collection, ordered by key
    pub async fn list<T: Entity>(&self) -> Result<Vec<Versioned<T>>, StoreError> {
        let raw = match self {
            Store::Memory(store) => store.list(T::COLLECTION).await,
            Store::Postgres(store) => store.list(T::COLLECTION).await?,
        };

        raw.into_iter()
            .map(|(version, data)| {
                Ok(Versioned {
                    version,
                    record: serde_json::from_value(data)?,
                })
            })
            .collect()
    }

    /// Atomically apply a batch of writes
    pub async fn commit(&self, ops: Vec<WriteOp>) -> Result<(), StoreError> {
        if ops.is_empty() {
            return Ok(());
        }
        match self {
            Store::Memory(store) => store.commit(ops).await,
            Store::Postgres(store) => store.commit(ops).await,
        }
    }

    /// Write a single record, returning its new version
    pub async fn upsert<T: Entity>(
        &self,
        record: &T,
        expected_version: i64,
    ) -> Result<i64, StoreError> {
        self.commit(vec![WriteOp::upsert(record, expected_version)?])
            .await?;
        Ok(expected_version + 1)
    }

    /// Create a single record
    pub async fn insert<T: Entity>(&self, record: &T) -> Result<(), StoreError> {
        self.commit(vec![WriteOp::insert(record)?]).await
    }

    /// Delete a single record
    pub async fn delete<T: Entity>(&self, key: &str, expected_version: i64) -> Result<(), StoreError> {
        self.commit(vec![WriteOp::delete::<T>(key, expected_version)])
            .await
    }
}
