//! Start-up configuration read from the environment.
//!
//! Every `from_env` constructor has a `from_vars` twin taking a lookup
//! function so the parsing can be tested without touching process state.

use stagebook_store::{
    BlobStorage, FileStore, KvStore, LocalBlobStorage, MemoryStore, RestKvStore, S3BlobStorage,
    StoreError,
};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

fn env_lookup(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn required(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    backend: &str,
) -> Result<String, StoreError> {
    get(key).ok_or_else(|| StoreError::Config(format!("{key} is required when {backend}")))
}

/// Which key-value backend holds the artist collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    Memory,
    File { path: PathBuf },
    Rest { url: String, token: String },
    Redis { url: String },
}

impl StoreConfig {
    pub fn from_env() -> Result<Self, StoreError> {
        Self::from_vars(env_lookup)
    }

    pub fn from_vars(get: impl Fn(&str) -> Option<String>) -> Result<Self, StoreError> {
        let backend = get("STORE_BACKEND").unwrap_or_else(|| "file".to_string());
        match backend.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "file" => Ok(Self::File {
                path: PathBuf::from(
                    get("STORE_DATA_PATH").unwrap_or_else(|| "./data/store".to_string()),
                ),
            }),
            "rest" => Ok(Self::Rest {
                url: required(&get, "KV_REST_API_URL", "STORE_BACKEND=rest")?,
                token: required(&get, "KV_REST_API_TOKEN", "STORE_BACKEND=rest")?,
            }),
            "redis" => Ok(Self::Redis {
                url: required(&get, "REDIS_URL", "STORE_BACKEND=redis")?,
            }),
            other => Err(StoreError::Config(format!(
                "unknown STORE_BACKEND {other:?} (expected memory, file, rest or redis)"
            ))),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::File { .. } => "file",
            Self::Rest { .. } => "rest",
            Self::Redis { .. } => "redis",
        }
    }

    /// Builds the store and checks that it answers.
    pub async fn connect(&self) -> Result<Arc<dyn KvStore>, StoreError> {
        let store: Arc<dyn KvStore> = match self {
            Self::Memory => {
                tracing::warn!("using in-memory store: artist data is lost on restart");
                Arc::new(MemoryStore::new())
            }
            Self::File { path } => {
                tracing::info!(path = %path.display(), "using local file store");
                Arc::new(FileStore::new(path.clone()))
            }
            Self::Rest { url, token } => {
                tracing::info!(%url, "using hosted REST key-value store");
                Arc::new(RestKvStore::new(url, token)?)
            }
            #[cfg(feature = "redis")]
            Self::Redis { url } => {
                tracing::info!("using redis store");
                Arc::new(stagebook_store::RedisStore::from_url(url)?)
            }
            #[cfg(not(feature = "redis"))]
            Self::Redis { .. } => {
                return Err(StoreError::Config(
                    "STORE_BACKEND=redis needs the `redis` feature".to_string(),
                ));
            }
        };

        store.ping().await?;
        Ok(store)
    }
}

/// Where uploaded images are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobConfig {
    Local {
        path: PathBuf,
        public_url: String,
    },
    S3 {
        endpoint: Option<String>,
        region: String,
        access_key: String,
        secret_key: String,
        bucket: String,
        public_url: Option<String>,
    },
}

impl BlobConfig {
    pub fn from_env() -> Result<Self, StoreError> {
        Self::from_vars(env_lookup)
    }

    pub fn from_vars(get: impl Fn(&str) -> Option<String>) -> Result<Self, StoreError> {
        let backend = get("BLOB_BACKEND").unwrap_or_else(|| "local".to_string());
        match backend.to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local {
                path: PathBuf::from(
                    get("UPLOAD_PATH").unwrap_or_else(|| "./data/uploads".to_string()),
                ),
                public_url: get("UPLOAD_PUBLIC_URL").unwrap_or_else(|| "/uploads".to_string()),
            }),
            "s3" => Ok(Self::S3 {
                endpoint: get("S3_ENDPOINT"),
                region: get("S3_REGION").unwrap_or_else(|| "us-east-1".to_string()),
                access_key: required(&get, "S3_ACCESS_KEY", "BLOB_BACKEND=s3")?,
                secret_key: required(&get, "S3_SECRET_KEY", "BLOB_BACKEND=s3")?,
                bucket: required(&get, "S3_BUCKET", "BLOB_BACKEND=s3")?,
                public_url: get("S3_PUBLIC_URL"),
            }),
            other => Err(StoreError::Config(format!(
                "unknown BLOB_BACKEND {other:?} (expected local or s3)"
            ))),
        }
    }

    /// Directory the HTTP server should expose under the public URL, if any.
    pub fn local_mount(&self) -> Option<(&str, &PathBuf)> {
        match self {
            Self::Local { path, public_url } if public_url.starts_with('/') => {
                Some((public_url.as_str(), path))
            }
            _ => None,
        }
    }

    pub fn build(&self) -> Result<Arc<dyn BlobStorage>, StoreError> {
        Ok(match self {
            Self::Local { path, public_url } => {
                tracing::info!(path = %path.display(), "using local image storage");
                Arc::new(LocalBlobStorage::new(path.clone(), public_url.clone()))
            }
            Self::S3 {
                endpoint,
                region,
                access_key,
                secret_key,
                bucket,
                public_url,
            } => {
                tracing::info!(%bucket, "using S3 image storage");
                Arc::new(S3BlobStorage::from_config(
                    endpoint.as_deref(),
                    region,
                    access_key,
                    secret_key,
                    bucket,
                    public_url.as_deref(),
                )?)
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub environment: String,
    pub reviewer: String,
    pub cors_origins: Vec<String>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, StoreError> {
        Self::from_vars(env_lookup)
    }

    pub fn from_vars(get: impl Fn(&str) -> Option<String>) -> Result<Self, StoreError> {
        let bind_raw = get("STAGEBOOK_BIND").unwrap_or_else(|| "0.0.0.0:8080".to_string());
        let bind = bind_raw
            .parse::<SocketAddr>()
            .map_err(|e| StoreError::Config(format!("invalid STAGEBOOK_BIND {bind_raw:?}: {e}")))?;

        Ok(Self {
            bind,
            environment: get("STAGEBOOK_ENV").unwrap_or_else(|| "development".to_string()),
            reviewer: get("STAGEBOOK_REVIEWER")
                .unwrap_or_else(|| "admin@example.com".to_string()),
            cors_origins: get("CORS_ORIGINS")
                .map(|raw| {
                    raw.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}
