//! In-memory blob store for tests and embedding.

use std::collections::HashMap;
use std::sync::RwLock;

use loom_types::ContentHash;
use tracing::trace;

use crate::error::{BlobError, BlobResult};
use crate::traits::BlobStore;

/// HashMap-backed [`BlobStore`].
///
/// All blobs are held in memory behind a `RwLock`; data is lost when the
/// store is dropped.
pub struct InMemoryBlobStore {
    blobs: RwLock<HashMap<ContentHash, Vec<u8>>>,
}

impl InMemoryBlobStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
        }
    }

    /// Remove all blobs.
    pub fn clear(&self) {
        self.blobs.write().expect("lock poisoned").clear();
    }
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlobStore for InMemoryBlobStore {
    fn store(&self, data: &[u8]) -> BlobResult<ContentHash> {
        let hash = ContentHash::of(data);
        let mut blobs = self.blobs.write().expect("lock poisoned");
        // Content addressing makes duplicate writes free.
        blobs.entry(hash).or_insert_with(|| data.to_vec());
        trace!(hash = %hash.short_hex(), bytes = data.len(), "blob stored");
        Ok(hash)
    }

    fn fetch(&self, hash: &ContentHash) -> BlobResult<Option<Vec<u8>>> {
        let blobs = self.blobs.read().expect("lock poisoned");
        match blobs.get(hash) {
            Some(data) => {
                let actual = ContentHash::of(data);
                if actual != *hash {
                    return Err(BlobError::HashMismatch {
                        expected: *hash,
                        actual,
                    });
                }
                Ok(Some(data.clone()))
            }
            None => Ok(None),
        }
    }

    fn exists(&self, hash: &ContentHash) -> BlobResult<bool> {
        Ok(self
            .blobs
            .read()
            .expect("lock poisoned")
            .contains_key(hash))
    }

    fn delete(&self, hash: &ContentHash) -> BlobResult<bool> {
        Ok(self
            .blobs
            .write()
            .expect("lock poisoned")
            .remove(hash)
            .is_some())
    }

    fn len(&self) -> BlobResult<u64> {
        Ok(self.blobs.read().expect("lock poisoned").len() as u64)
    }

    fn total_bytes(&self) -> BlobResult<u64> {
        Ok(self
            .blobs
            .read()
            .expect("lock poisoned")
            .values()
            .map(|b| b.len() as u64)
            .sum())
    }
}

impl std::fmt::Debug for InMemoryBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBlobStore")
            .field("blob_count", &self.len().unwrap_or(0))
            .finish()
    }
}
