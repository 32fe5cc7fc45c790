use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::config::StorageConfig;
use crate::errors::{AppError, AppResult};
use crate::utils::utc_now;

/// Blob-store seam. Document handlers talk to this trait only, so the
/// backing store can be swapped without touching any authorization logic.
#[async_trait]
pub trait StorageService: Send + Sync {
    async fn upload(&self, path: &str, bytes: &[u8], content_type: &str) -> AppResult<()>;

    /// Returns a relative URL that `GET /files/{path}` will accept until the
    /// configured TTL elapses.
    fn signed_url(&self, path: &str) -> AppResult<String>;

    async fn remove(&self, path: &str) -> AppResult<()>;
}

/// Filesystem-backed store. Blobs live under `root/bucket/<path>`; download
/// URLs carry a unix expiry plus a hex SHA-256 over (secret, path, expiry).
pub struct LocalStorage {
    config: StorageConfig,
}

impl LocalStorage {
    pub fn new(config: StorageConfig) -> Self {
        Self { config }
    }

    pub fn signed_url_ttl_secs(&self) -> i64 {
        self.config.signed_url_ttl_secs
    }

    fn sign(&self, path: &str, expires: i64) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.config.signing_secret);
        hasher.update(b"\n");
        hasher.update(path.as_bytes());
        hasher.update(b"\n");
        hasher.update(expires.to_string().as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Validates a redemption request: untampered signature, not expired,
    /// no traversal components in the path.
    pub fn verify(&self, path: &str, expires: i64, sig: &str) -> AppResult<()> {
        if safe_relative_path(path).is_none() {
            return Err(AppError::validation("invalid storage path"));
        }
        if utc_now().timestamp() > expires {
            return Err(AppError::forbidden("signed url expired"));
        }
        let expected = self.sign(path, expires);
        // Hex digests are fixed-length; a simple comparison is fine here.
        if expected != sig {
            return Err(AppError::forbidden("invalid signature"));
        }
        Ok(())
    }

    pub fn blob_path(&self, path: &str) -> AppResult<PathBuf> {
        let rel = safe_relative_path(path)
            .ok_or_else(|| AppError::validation("invalid storage path"))?;
        Ok(self.config.root.join(&self.config.bucket).join(rel))
    }
}

#[async_trait]
impl StorageService for LocalStorage {
    async fn upload(&self, path: &str, bytes: &[u8], _content_type: &str) -> AppResult<()> {
        let full = self.blob_path(path)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| AppError::internal(format!("failed to create blob dir: {err}")))?;
        }
        tokio::fs::write(&full, bytes)
            .await
            .map_err(|err| AppError::internal(format!("failed to write blob: {err}")))?;
        Ok(())
    }

    fn signed_url(&self, path: &str) -> AppResult<String> {
        if safe_relative_path(path).is_none() {
            return Err(AppError::internal("invalid storage path"));
        }
        let expires = utc_now().timestamp() + self.config.signed_url_ttl_secs;
        let sig = self.sign(path, expires);
        Ok(format!("/files/{path}?expires={expires}&sig={sig}"))
    }

    async fn remove(&self, path: &str) -> AppResult<()> {
        let full = self.blob_path(path)?;
        tokio::fs::remove_file(&full)
            .await
            .map_err(|err| AppError::internal(format!("failed to remove blob: {err}")))?;
        Ok(())
    }
}

/// Accepts only plain relative paths: no root, no `..`, no empty input.
fn safe_relative_path(path: &str) -> Option<&Path> {
    let p = Path::new(path);
    if path.is_empty() {
        return None;
    }
    for component in p.components() {
        match component {
            Component::Normal(_) => {}
            _ => return None,
        }
    }
    Some(p)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage() -> LocalStorage {
        LocalStorage::new(StorageConfig {
            root: "/tmp/teamhub-test".into(),
            bucket: "documents".to_string(),
            signed_url_ttl_secs: 900,
            signing_secret: b"test-secret".to_vec(),
        })
    }

    #[test]
    fn signed_url_roundtrip() {
        let storage = storage();
        let url = storage.signed_url("projects/a/b.pdf").unwrap();
        let query = url.split_once('?').unwrap().1;
        let mut expires = 0;
        let mut sig = String::new();
        for pair in query.split('&') {
            let (k, v) = pair.split_once('=').unwrap();
            match k {
                "expires" => expires = v.parse().unwrap(),
                "sig" => sig = v.to_string(),
                _ => {}
            }
        }
        assert!(storage.verify("projects/a/b.pdf", expires, &sig).is_ok());
        assert!(storage.verify("projects/a/other.pdf", expires, &sig).is_err());
        assert!(storage.verify("projects/a/b.pdf", expires, "deadbeef").is_err());
    }

    #[test]
    fn expired_url_rejected() {
        let storage = storage();
        let expires = utc_now().timestamp() - 1;
        let sig = storage.sign("projects/a/b.pdf", expires);
        assert!(matches!(
            storage.verify("projects/a/b.pdf", expires, &sig),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn traversal_paths_rejected() {
        let storage = storage();
        assert!(storage.blob_path("../secrets").is_err());
        assert!(storage.blob_path("/etc/passwd").is_err());
        assert!(storage.blob_path("projects/ok/file.txt").is_ok());
    }
}
