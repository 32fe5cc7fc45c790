use crate::errors::AppError;

/// Blob-store settings, resolved once at startup and handed to the storage
/// service at construction. Handlers never read the environment themselves.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub root: std::path::PathBuf,
    pub bucket: String,
    pub signed_url_ttl_secs: i64,
    pub signing_secret: Vec<u8>,
}

impl StorageConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let root = std::env::var("STORAGE_ROOT")
            .map_err(|_| AppError::configuration("STORAGE_ROOT not set"))?;
        let bucket = std::env::var("STORAGE_BUCKET").unwrap_or_else(|_| "documents".to_string());
        let signed_url_ttl_secs = std::env::var("SIGNED_URL_TTL_SECONDS")
            .map(|val| val.parse::<i64>())
            .unwrap_or(Ok(900))
            .map_err(|_| AppError::configuration("SIGNED_URL_TTL_SECONDS must be a valid integer"))?;
        let signing_secret = std::env::var("STORAGE_SIGNING_SECRET")
            .map_err(|_| AppError::configuration("STORAGE_SIGNING_SECRET not set"))?;

        Ok(Self {
            root: root.into(),
            bucket,
            signed_url_ttl_secs,
            signing_secret: signing_secret.into_bytes(),
        })
    }
}
