//! Blob and document store backends for DoorCam artifacts and access records.

pub mod config;
pub mod http;
pub mod keys;
pub mod local;
pub mod media_server;
pub mod mime_detect;
pub mod records;
pub mod unconfigured;

pub use config::{build_blob_store, StorageBackend, StorageConfig};
pub use http::HttpBlobStore;
pub use local::LocalBlobStore;
pub use media_server::media_router;
pub use records::SqliteDocumentStore;
pub use unconfigured::UnconfiguredBlobStore;
