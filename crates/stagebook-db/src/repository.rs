//! Artist repository over a single key-value entry.
//!
//! The whole collection lives as one JSON array under [`ARTISTS_KEY`]. Every
//! write reads the full list, changes it in memory and writes the full list
//! back. Two writers racing through that cycle can lose an update; nothing
//! here locks.

use chrono::Utc;
use serde_json::Value;
use stagebook_store::KvStore;
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::artist::{
    self, ApprovalStatus, ArtistFilter, ArtistUpdate, NewArtist, DEFAULT_CATEGORY,
};
use crate::error::ArtistError;

pub const ARTISTS_KEY: &str = "artists";

#[derive(Clone)]
pub struct ArtistRepository {
    store: Arc<dyn KvStore>,
}

fn same_email(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl ArtistRepository {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    async fn save(&self, artists: &[artist::Model]) -> Result<(), ArtistError> {
        let value = serde_json::to_value(artists)?;
        self.store.set(ARTISTS_KEY, &value).await?;
        Ok(())
    }

    /// Returns every readable artist record.
    ///
    /// A collection stored as a JSON string is re-parsed; anything else that
    /// is not an array resets the key to `[]`. Unreadable entries are
    /// dropped, and when the cleaned collection differs from what was stored
    /// it is written back.
    pub async fn list(&self) -> Result<Vec<artist::Model>, ArtistError> {
        let Some(raw) = self.store.get(ARTISTS_KEY).await? else {
            tracing::debug!("no artist collection stored yet");
            return Ok(Vec::new());
        };

        let (entries, recovered) = match raw {
            Value::Array(entries) => (entries, false),
            Value::String(text) => match serde_json::from_str::<Value>(&text) {
                Ok(Value::Array(entries)) => {
                    tracing::warn!("artist collection was stored as a JSON string, recovering it");
                    (entries, true)
                }
                _ => {
                    tracing::warn!(
                        preview = %text.chars().take(50).collect::<String>(),
                        "artist collection is corrupted, resetting it"
                    );
                    self.save(&[]).await?;
                    return Ok(Vec::new());
                }
            },
            other => {
                tracing::warn!(
                    kind = json_kind(&other),
                    "artist collection is not an array, resetting it"
                );
                self.save(&[]).await?;
                return Ok(Vec::new());
            }
        };

        let artists: Vec<artist::Model> =
            entries.iter().filter_map(artist::Model::from_stored).collect();

        let cleaned = serde_json::to_value(&artists)?;
        if recovered || cleaned.as_array() != Some(&entries) {
            tracing::warn!(
                stored = entries.len(),
                kept = artists.len(),
                "rewriting sanitized artist collection"
            );
            self.store.set(ARTISTS_KEY, &cleaned).await?;
        }

        Ok(artists)
    }

    /// Creates a pending artist. Fails on missing name/email and on an email
    /// that is already registered.
    pub async fn add(&self, new: NewArtist) -> Result<artist::Model, ArtistError> {
        let missing = new.missing_fields();
        if !missing.is_empty() {
            return Err(ArtistError::missing_fields(missing));
        }
        let new = new.normalized();

        let mut artists = self.list().await?;
        if artists.iter().any(|a| same_email(&a.email, &new.email)) {
            tracing::warn!(email = %new.email, "duplicate artist email");
            return Err(ArtistError::DuplicateEmail(new.email));
        }

        let mut created = artist::Model {
            id: Uuid::new_v4().to_string(),
            name: new.name,
            email: new.email,
            phone: new.phone,
            category: if new.category.is_empty() {
                DEFAULT_CATEGORY.to_string()
            } else {
                new.category
            },
            city: new.city,
            bio: new.bio,
            experience: new.experience,
            languages: new.languages,
            fee: new.fee,
            image_url: new.image_url,
            status: ApprovalStatus::Pending,
            rejection_reason: None,
            created_at: Utc::now(),
            updated_at: None,
            reviewed_at: None,
            reviewed_by: None,
        };
        created.sanitize();

        artists.push(created.clone());
        self.save(&artists).await?;

        tracing::info!(id = %created.id, name = %created.name, total = artists.len(), "artist added");
        Ok(created)
    }

    /// Merges `changes` into the artist with `id`. An unknown id leaves the
    /// store untouched.
    pub async fn update(
        &self,
        id: &str,
        changes: ArtistUpdate,
    ) -> Result<artist::Model, ArtistError> {
        if id.trim().is_empty() {
            return Err(ArtistError::missing_fields(["id"]));
        }

        let mut artists = self.list().await?;
        let Some(index) = artists.iter().position(|a| a.id == id) else {
            tracing::warn!(id, "artist not found for update");
            return Err(ArtistError::NotFound(id.to_string()));
        };

        let mut updated = artists[index].clone();
        updated.apply(changes, Utc::now());
        if updated.status == ApprovalStatus::Rejected && updated.rejection_reason.is_none() {
            return Err(ArtistError::invalid(
                "A rejection reason is required when rejecting an artist",
            ));
        }

        artists[index] = updated.clone();
        self.save(&artists).await?;

        tracing::info!(id, status = %updated.status, "artist updated");
        Ok(updated)
    }

    /// Whether an artist with this email (trimmed, ASCII case-insensitive)
    /// already exists.
    pub async fn email_registered(&self, email: &str) -> Result<bool, ArtistError> {
        Ok(self.list().await?.iter().any(|a| same_email(&a.email, email)))
    }

    pub async fn get(&self, id: &str) -> Result<Option<artist::Model>, ArtistError> {
        Ok(self.list().await?.into_iter().find(|a| a.id == id))
    }

    pub async fn search(
        &self,
        filter: &ArtistFilter,
    ) -> Result<Vec<artist::Model>, ArtistError> {
        let artists = self.list().await?;
        if filter.is_empty() {
            return Ok(artists);
        }
        Ok(artists.into_iter().filter(|a| a.matches(filter)).collect())
    }

    /// Replaces the collection with an empty list.
    pub async fn reset(&self) -> Result<(), ArtistError> {
        self.save(&[]).await?;
        tracing::warn!("artist collection reset");
        Ok(())
    }
}
