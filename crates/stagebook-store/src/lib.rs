pub mod blob;
pub mod error;
pub mod kv;
#[cfg(feature = "redis")]
pub mod redis_store;
pub mod rest;

pub use blob::{object_key, sanitize_filename, BlobStorage, LocalBlobStorage, S3BlobStorage};
pub use error::StoreError;
pub use kv::{probe, FileStore, KvStore, MemoryStore, ProbeReport, StoreInfo};
#[cfg(feature = "redis")]
pub use redis_store::RedisStore;
pub use rest::RestKvStore;
