//! Content-addressed blob storage for the loom record store.
//!
//! Blobs are opaque binary payloads keyed by their BLAKE3 content hash.
//! The loom core stores checkpoint state and large payloads through this
//! boundary and never interprets blob contents; durable backends live
//! behind the same trait.
//!
//! # Modules
//!
//! - [`error`] — Error types for blob operations
//! - [`traits`] — The [`BlobStore`] boundary
//! - [`memory`] — In-memory [`InMemoryBlobStore`] for tests and embedding

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{BlobError, BlobResult};
pub use memory::InMemoryBlobStore;
pub use traits::BlobStore;
