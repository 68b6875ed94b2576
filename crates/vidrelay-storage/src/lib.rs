//! vidrelay storage library
//!
//! This crate provides the destination storage abstraction and its
//! implementations for GCS (resumable uploads over the JSON API) and the
//! local filesystem.
//!
//! # Blob URLs
//!
//! Objects are addressed as `scheme://container/path`:
//!
//! - **GCS**: `gs://{bucket}/{object name}`
//! - **Local**: `file://{directory}/{path}`, relative to the storage root
//!
//! Paths must not contain `..` segments. Parsing is centralized in the
//! `location` module so all backends agree on the format.

pub mod factory;
#[cfg(feature = "storage-gcs")]
pub mod gcs;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod location;
pub mod traits;
pub mod upload;

// Re-export commonly used types
pub use factory::create_storage;
#[cfg(feature = "storage-gcs")]
pub use gcs::GcsStorage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use location::BlobLocation;
pub use traits::{ByteStream, CommitStatus, SessionHandle, Storage, StorageError, StorageResult};
pub use upload::upload_from_path;
pub use vidrelay_core::StorageBackend;
