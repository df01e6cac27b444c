use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

use crate::error::StoreError;

/// Where uploaded profile images end up.
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Stores `data` and returns the public URL of the new object.
    async fn put(
        &self,
        filename: &str,
        content_type: Option<&str>,
        data: &[u8],
    ) -> Result<String, StoreError>;

    /// Removes an object previously returned by [`BlobStorage::put`].
    /// Deleting an object that is already gone succeeds.
    async fn delete(&self, url: &str) -> Result<(), StoreError>;

    fn backend_name(&self) -> &'static str;
}

/// Object key for an uploaded file: `artists/<unix millis>-<sanitized name>`.
pub fn object_key(filename: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let name = sanitize_filename(filename);
    let name = if name.is_empty() {
        "upload".to_string()
    } else {
        name
    };
    format!("artists/{millis}-{name}")
}

fn join_url(base: &str, relative: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), relative)
}

/// Inverse of [`join_url`]: the object key of a URL under `base`.
fn key_from_url<'a>(base: &str, url: &'a str) -> Result<&'a str, StoreError> {
    let key = url
        .strip_prefix(base.trim_end_matches('/'))
        .and_then(|rest| rest.strip_prefix('/'))
        .filter(|key| !key.is_empty())
        .ok_or_else(|| StoreError::Config(format!("{url} is not served by this storage")))?;
    // SECURITY: keys never leave the storage root
    if key.split('/').any(|part| part == ".." || part.is_empty()) {
        return Err(StoreError::Config(format!("invalid object key in {url}")));
    }
    Ok(key)
}

// ─── Local Filesystem Backend ──────────────────────────────────────

#[derive(Debug, Clone)]
pub struct LocalBlobStorage {
    base_path: PathBuf,
    public_base: String,
}

impl LocalBlobStorage {
    pub fn new(base_path: impl Into<PathBuf>, public_base: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            public_base: public_base.into(),
        }
    }

    pub fn base(&self) -> &Path {
        &self.base_path
    }

    pub fn full_path(&self, relative_path: &str) -> PathBuf {
        self.base_path.join(relative_path)
    }
}

#[async_trait]
impl BlobStorage for LocalBlobStorage {
    async fn put(
        &self,
        filename: &str,
        _content_type: Option<&str>,
        data: &[u8],
    ) -> Result<String, StoreError> {
        let key = object_key(filename);
        let mut path = self.base_path.join(&key);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        if fs::metadata(&path).await.is_ok() {
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("upload")
                .to_string();
            let unique = match path.extension().and_then(|e| e.to_str()) {
                Some(ext) => format!("{stem}_{}.{ext}", Uuid::new_v4()),
                None => format!("{stem}_{}", Uuid::new_v4()),
            };
            path.set_file_name(unique);
        }

        fs::write(&path, data).await?;

        let relative = path
            .strip_prefix(&self.base_path)
            .unwrap_or(&path)
            .to_string_lossy()
            .replace('\\', "/");

        Ok(join_url(&self.public_base, &relative))
    }

    async fn delete(&self, url: &str) -> Result<(), StoreError> {
        let path = self.full_path(key_from_url(&self.public_base, url)?);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}

// ─── S3 Backend ────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct S3BlobStorage {
    client: aws_sdk_s3::Client,
    bucket: String,
    public_base: String,
}

impl S3BlobStorage {
    /// `public_url` is the prefix objects are reachable under; when absent it
    /// is derived from the endpoint (path style) or the AWS bucket host.
    pub fn from_config(
        endpoint: Option<&str>,
        region: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
        public_url: Option<&str>,
    ) -> Result<Self, StoreError> {
        if bucket.is_empty() {
            return Err(StoreError::Config("S3 bucket name is empty".to_string()));
        }

        let creds =
            aws_sdk_s3::config::Credentials::new(access_key, secret_key, None, None, "stagebook");

        let mut config_builder = aws_sdk_s3::Config::builder()
            .region(aws_sdk_s3::config::Region::new(region.to_string()))
            .credentials_provider(creds)
            .behavior_version_latest();

        if let Some(ep) = endpoint {
            config_builder = config_builder.endpoint_url(ep).force_path_style(true);
        }

        let client = aws_sdk_s3::Client::from_conf(config_builder.build());

        let public_base = match (public_url, endpoint) {
            (Some(url), _) => url.to_string(),
            (None, Some(ep)) => join_url(ep, bucket),
            (None, None) => format!("https://{bucket}.s3.{region}.amazonaws.com"),
        };

        Ok(Self {
            client,
            bucket: bucket.to_string(),
            public_base,
        })
    }

    pub fn public_base(&self) -> &str {
        &self.public_base
    }
}

#[async_trait]
impl BlobStorage for S3BlobStorage {
    async fn put(
        &self,
        filename: &str,
        content_type: Option<&str>,
        data: &[u8],
    ) -> Result<String, StoreError> {
        let key = object_key(filename);

        let mut req = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(data.to_vec().into());
        if let Some(ct) = content_type {
            req = req.content_type(ct);
        }

        req.send()
            .await
            .map_err(|e| StoreError::S3(format!("PutObject failed: {e}")))?;

        tracing::info!(bucket = %self.bucket, %key, "image stored in S3");
        Ok(join_url(&self.public_base, &key))
    }

    async fn delete(&self, url: &str) -> Result<(), StoreError> {
        let key = key_from_url(&self.public_base, url)?;
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StoreError::S3(format!("DeleteObject failed: {e}")))?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "s3"
    }
}

// ─── Helpers ───────────────────────────────────────────────────────

/// Keeps ASCII letters, digits, `.` and `-`; drops everything else.
pub fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '.' || *c == '-')
        .collect();
    // SECURITY: reject path traversal sequences
    if sanitized.contains("..") {
        return sanitized.replace("..", "__");
    }
    sanitized
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_filename_clean() {
        assert_eq!(sanitize_filename("headshot.jpg"), "headshot.jpg");
    }

    #[test]
    fn test_sanitize_filename_strips_spaces_and_symbols() {
        assert_eq!(sanitize_filename("my photo (1)!.png"), "myphoto1.png");
    }

    #[test]
    fn test_sanitize_filename_slashes() {
        assert_eq!(sanitize_filename("path/to\\file.jpg"), "pathtofile.jpg");
    }

    #[test]
    fn test_sanitize_filename_traversal() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "____etcpasswd");
        assert!(!sanitize_filename("...").contains(".."));
    }

    #[test]
    fn test_sanitize_filename_unicode_dropped() {
        assert_eq!(sanitize_filename("日本語.png"), ".png");
    }

    #[test]
    fn test_object_key_shape() {
        let key = object_key("Stage Photo.jpg");
        assert!(key.starts_with("artists/"));
        assert!(key.ends_with("-StagePhoto.jpg"));
    }

    #[test]
    fn test_object_key_empty_name() {
        assert!(object_key("???").ends_with("-upload"));
    }

    #[test]
    fn test_join_url_trailing_slash() {
        assert_eq!(join_url("/uploads/", "a/b.png"), "/uploads/a/b.png");
        assert_eq!(join_url("https://cdn.example.com", "x.png"), "https://cdn.example.com/x.png");
    }

    #[tokio::test]
    async fn test_local_put_writes_file() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalBlobStorage::new(tmp.path(), "/uploads");

        let url = storage
            .put("face.png", Some("image/png"), b"png bytes")
            .await
            .unwrap();

        assert!(url.starts_with("/uploads/artists/"));
        assert!(url.ends_with("-face.png"));

        let relative = url.trim_start_matches("/uploads/");
        let data = std::fs::read(storage.full_path(relative)).unwrap();
        assert_eq!(data, b"png bytes");
    }

    #[tokio::test]
    async fn test_local_put_never_overwrites() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalBlobStorage::new(tmp.path(), "/uploads");

        let mut urls = Vec::new();
        for i in 0..5u8 {
            urls.push(storage.put("same.jpg", None, &[i]).await.unwrap());
        }
        urls.sort();
        urls.dedup();
        assert_eq!(urls.len(), 5);
    }

    #[tokio::test]
    async fn test_local_delete() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalBlobStorage::new(tmp.path(), "/uploads");

        let url = storage.put("gone.png", None, b"data").await.unwrap();
        let path = storage.full_path(url.trim_start_matches("/uploads/"));
        assert!(path.exists());

        storage.delete(&url).await.unwrap();
        assert!(!path.exists());

        // already gone
        storage.delete(&url).await.unwrap();
    }

    #[tokio::test]
    async fn test_local_delete_rejects_foreign_urls() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalBlobStorage::new(tmp.path(), "/uploads");

        for url in [
            "https://elsewhere.example.com/a.png",
            "/uploads/",
            "/uploads/../secret.txt",
            "/uploadsX/a.png",
        ] {
            assert!(
                matches!(storage.delete(url).await, Err(StoreError::Config(_))),
                "{url} should be refused"
            );
        }
    }

    #[test]
    fn test_key_from_url() {
        assert_eq!(
            key_from_url("https://cdn.example.com/", "https://cdn.example.com/artists/1-a.png")
                .unwrap(),
            "artists/1-a.png"
        );
        assert!(key_from_url("/uploads", "/uploads//x.png").is_err());
    }

    #[test]
    fn test_local_backend_name() {
        let storage = LocalBlobStorage::new("/tmp/stagebook-test", "/uploads");
        assert_eq!(storage.backend_name(), "local");
        assert_eq!(storage.base(), Path::new("/tmp/stagebook-test"));
    }

    #[tokio::test]
    async fn test_s3_public_base_derivation() {
        let custom = S3BlobStorage::from_config(
            None,
            "eu-west-1",
            "ak",
            "sk",
            "bucket",
            Some("https://cdn.example.com"),
        )
        .unwrap();
        assert_eq!(custom.public_base(), "https://cdn.example.com");

        let minio = S3BlobStorage::from_config(
            Some("http://localhost:9000"),
            "us-east-1",
            "ak",
            "sk",
            "images",
            None,
        )
        .unwrap();
        assert_eq!(minio.public_base(), "http://localhost:9000/images");

        let aws =
            S3BlobStorage::from_config(None, "us-east-1", "ak", "sk", "images", None).unwrap();
        assert_eq!(aws.public_base(), "https://images.s3.us-east-1.amazonaws.com");
    }

    #[tokio::test]
    async fn test_s3_empty_bucket_rejected() {
        let result = S3BlobStorage::from_config(None, "us-east-1", "ak", "sk", "", None);
        assert!(matches!(result, Err(StoreError::Config(_))));
    }
}
