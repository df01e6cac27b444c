// Shared test utilities for integration tests
use stagebook_db::{ArtistRepository, NewArtist};
use stagebook_store::FileStore;
use std::path::Path;
use std::sync::Arc;

/// A repository backed by JSON files under `dir`.
pub fn file_repository(dir: &Path) -> ArtistRepository {
    ArtistRepository::new(Arc::new(FileStore::new(dir)))
}

pub fn new_artist(name: &str, email: &str) -> NewArtist {
    NewArtist {
        name: name.to_string(),
        email: email.to_string(),
        phone: "9820012345".to_string(),
        category: "Singer".to_string(),
        city: "Mumbai".to_string(),
        bio: "Ghazals and film songs".to_string(),
        experience: "8 years".to_string(),
        languages: vec!["Hindi".to_string(), "Urdu".to_string()],
        fee: 25000,
        image_url: None,
    }
}
