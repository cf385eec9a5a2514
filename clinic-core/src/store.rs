//! Cache store: two read-through tables in SQLite.
//!
//! - `episodes`: one detail record per episode id
//! - `images`:   one byte payload per (episode id, image index)
//!
//! Any existing row is a hit, including the empty detail sentinel and empty
//! image payloads, so a negative result is never recomputed. Each lookup and
//! each insert is its own statement; computations for the same key are
//! serialized in-process by a keyed lock so the tables never collect duplicate
//! rows from one server.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use sqlx::SqlitePool;
use thiserror::Error;
use tokio::sync::OwnedMutexGuard;

use crate::config::{CacheConfig, DatabaseConfig};
use crate::db;
use crate::error::ClinicError;
use crate::models::EpisodeDetail;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Episode id {0} does not fit the id column")]
    KeyOutOfRange(u64),

    #[error("Corrupt row for episode {doc_id}: {reason}")]
    Corrupt { doc_id: u64, reason: String },
}

pub struct CacheStore {
    pool: SqlitePool,
    read_only: bool,
    detail_locks: KeyedLocks<u64>,
    image_locks: KeyedLocks<(u64, u32)>,
}

impl CacheStore {
    pub fn new(pool: SqlitePool, read_only: bool) -> Self {
        Self {
            pool,
            read_only,
            detail_locks: KeyedLocks::default(),
            image_locks: KeyedLocks::default(),
        }
    }

    /// Open the configured database and prepare the schema.
    pub async fn open(database: &DatabaseConfig, cache: &CacheConfig) -> Result<Self, ClinicError> {
        let pool = db::create_pool(database, cache).await?;
        let store = Self::new(pool, cache.read_only);
        store.migrate().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Create both tables if missing. A read-only store never touches the schema.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        if self.read_only {
            tracing::info!("Cache store is read-only, skipping schema setup");
            return Ok(());
        }

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS episodes (
                id INTEGER,
                datetime TEXT,
                image_count INTEGER,
                caption TEXT
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS images (
                id INTEGER,
                image_index INTEGER,
                data BLOB
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn select_detail(&self, doc_id: u64) -> Result<Option<EpisodeDetail>, StoreError> {
        let row: Option<(String, i64, String)> = sqlx::query_as(
            "SELECT datetime, image_count, caption FROM episodes WHERE id = ? ORDER BY rowid LIMIT 1",
        )
        .bind(sql_id(doc_id)?)
        .fetch_optional(&self.pool)
        .await?;

        let Some((datetime, image_count, caption)) = row else {
            return Ok(None);
        };
        let images = u32::try_from(image_count).map_err(|_| StoreError::Corrupt {
            doc_id,
            reason: format!("image_count {}", image_count),
        })?;

        Ok(Some(EpisodeDetail {
            datetime,
            images,
            message: caption,
        }))
    }

    pub async fn insert_detail(&self, doc_id: u64, detail: &EpisodeDetail) -> Result<(), StoreError> {
        if self.read_only {
            return Ok(());
        }

        sqlx::query("INSERT INTO episodes (id, datetime, image_count, caption) VALUES (?, ?, ?, ?)")
            .bind(sql_id(doc_id)?)
            .bind(&detail.datetime)
            .bind(i64::from(detail.images))
            .bind(&detail.message)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn select_image(&self, doc_id: u64, image_index: u32) -> Result<Option<Bytes>, StoreError> {
        let row: Option<(Vec<u8>,)> = sqlx::query_as(
            "SELECT data FROM images WHERE id = ? AND image_index = ? ORDER BY rowid LIMIT 1",
        )
        .bind(sql_id(doc_id)?)
        .bind(i64::from(image_index))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(data,)| Bytes::from(data)))
    }

    pub async fn insert_image(&self, doc_id: u64, image_index: u32, data: &[u8]) -> Result<(), StoreError> {
        if self.read_only {
            return Ok(());
        }

        sqlx::query("INSERT INTO images (id, image_index, data) VALUES (?, ?, ?)")
            .bind(sql_id(doc_id)?)
            .bind(i64::from(image_index))
            .bind(data)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Return the stored detail for `doc_id`, or compute, store and return it.
    pub async fn get_or_compute_detail<F, Fut>(
        &self,
        doc_id: u64,
        compute: F,
    ) -> Result<EpisodeDetail, StoreError>
    where
        F: FnOnce(u64) -> Fut,
        Fut: Future<Output = EpisodeDetail>,
    {
        let _key = self.detail_locks.lock(doc_id).await;

        if let Some(detail) = self.select_detail(doc_id).await? {
            tracing::debug!(doc_id, "Detail cache hit");
            return Ok(detail);
        }

        tracing::debug!(doc_id, "Detail cache miss");
        let detail = compute(doc_id).await;
        self.insert_detail(doc_id, &detail).await?;
        tracing::info!(doc_id, images = detail.images, empty = detail.is_empty(), "Stored episode detail");
        Ok(detail)
    }

    /// Return the stored image, or compute, store and return it. An empty
    /// stored payload is returned as-is.
    pub async fn get_or_compute_image<F, Fut>(
        &self,
        doc_id: u64,
        image_index: u32,
        compute: F,
    ) -> Result<Bytes, StoreError>
    where
        F: FnOnce(u64, u32) -> Fut,
        Fut: Future<Output = Bytes>,
    {
        let _key = self.image_locks.lock((doc_id, image_index)).await;

        if let Some(data) = self.select_image(doc_id, image_index).await? {
            tracing::debug!(doc_id, image_index, "Image cache hit");
            return Ok(data);
        }

        tracing::debug!(doc_id, image_index, "Image cache miss");
        let data = compute(doc_id, image_index).await;
        self.insert_image(doc_id, image_index, &data).await?;
        tracing::info!(doc_id, image_index, bytes = data.len(), "Stored image");
        Ok(data)
    }
}

fn sql_id(doc_id: u64) -> Result<i64, StoreError> {
    i64::try_from(doc_id).map_err(|_| StoreError::KeyOutOfRange(doc_id))
}

/// One async mutex per key, created on demand and dropped once unused.
struct KeyedLocks<K> {
    locks: Arc<Mutex<HashMap<K, Arc<tokio::sync::Mutex<()>>>>>,
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    async fn lock(&self, key: K) -> KeyGuard<K> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks.entry(key.clone()).or_default().clone()
        };

        KeyGuard {
            guard: Some(lock.lock_owned().await),
            key,
            locks: Arc::clone(&self.locks),
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

struct KeyGuard<K: Eq + Hash> {
    guard: Option<OwnedMutexGuard<()>>,
    key: K,
    locks: Arc<Mutex<HashMap<K, Arc<tokio::sync::Mutex<()>>>>>,
}

impl<K: Eq + Hash> Drop for KeyGuard<K> {
    fn drop(&mut self) {
        self.guard.take();
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        // Only the map's own handle left: nobody holds or waits on this key.
        if locks.get(&self.key).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(&self.key);
        }
    }
}
