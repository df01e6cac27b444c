use stagebook_store::{BlobStorage, KvStore};
use std::sync::Arc;

pub mod config;
pub mod entities;
pub mod error;
pub mod repository;

/// Re-export for convenience
pub use stagebook_store;

pub use config::{BlobConfig, ServerConfig, StoreConfig};
pub use entities::artist::{ApprovalStatus, ArtistFilter, ArtistUpdate, NewArtist};
pub use error::ArtistError;
pub use repository::{ArtistRepository, ARTISTS_KEY};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub artists: ArtistRepository,
    pub kv: Arc<dyn KvStore>,
    pub blobs: Arc<dyn BlobStorage>,
    /// `production` disables destructive maintenance endpoints.
    pub environment: String,
    /// Reviewer recorded on approve/reject when the request names none.
    pub reviewer: String,
}

impl AppState {
    pub fn new(kv: Arc<dyn KvStore>, blobs: Arc<dyn BlobStorage>, server: &ServerConfig) -> Self {
        Self {
            artists: ArtistRepository::new(kv.clone()),
            kv,
            blobs,
            environment: server.environment.clone(),
            reviewer: server.reviewer.clone(),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}
