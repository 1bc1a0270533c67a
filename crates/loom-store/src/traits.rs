use loom_types::ContentHash;

use crate::error::BlobResult;

/// Storage boundary for content-addressed blobs.
///
/// Writes are idempotent: storing the same bytes twice yields the same
/// address and a single stored copy. Implementations must verify on
/// fetch that the returned bytes still hash to the requested address.
pub trait BlobStore: Send + Sync {
    /// Store bytes, returning their content address.
    fn store(&self, data: &[u8]) -> BlobResult<ContentHash>;

    /// Fetch the bytes at an address, or `None` if absent.
    fn fetch(&self, hash: &ContentHash) -> BlobResult<Option<Vec<u8>>>;

    /// Returns `true` if the address is present.
    fn exists(&self, hash: &ContentHash) -> BlobResult<bool>;

    /// Delete the blob at an address. Returns `true` if it was present.
    fn delete(&self, hash: &ContentHash) -> BlobResult<bool>;

    /// Number of stored blobs.
    fn len(&self) -> BlobResult<u64>;

    /// Returns `true` if no blobs are stored.
    fn is_empty(&self) -> BlobResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Total bytes across all stored blobs.
    fn total_bytes(&self) -> BlobResult<u64>;

    /// Flush pending writes to durable storage. In-memory backends
    /// treat this as a no-op.
    fn flush(&self) -> BlobResult<()> {
        Ok(())
    }
}
