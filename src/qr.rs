use crate::config::AppConfig;
use crate::errors::ApiError;
use image::Luma;
use log::{debug, info};
use qrcode::QrCode;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};

// File-backed store for checkpoint QR images. The payload encodes nothing
// but the checkpoint id; scanners post the id back through the scan endpoint.
#[derive(Clone, Debug)]
pub struct QrStore {
    dir: PathBuf,
    base_url: String,
}

impl QrStore {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            dir: PathBuf::from(&config.qr_code_dir),
            base_url: config.public_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn new(dir: impl AsRef<Path>, base_url: &str) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn file_name(checkpoint_id: i32) -> String {
        format!("checkpoint-{}.png", checkpoint_id)
    }

    pub fn path_for(&self, checkpoint_id: i32) -> PathBuf {
        self.dir.join(Self::file_name(checkpoint_id))
    }

    // Renders and persists the QR image, returning the public URL to store on
    // the checkpoint row.
    pub fn save(&self, checkpoint_id: i32) -> Result<String, ApiError> {
        let payload = json!({ "checkpoint_id": checkpoint_id }).to_string();

        let code = QrCode::new(payload.as_bytes())
            .map_err(|e| ApiError::Internal(format!("failed to encode QR payload: {}", e)))?;
        let image = code.render::<Luma<u8>>().min_dimensions(256, 256).build();

        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(checkpoint_id);
        image
            .save(&path)
            .map_err(|e| ApiError::Internal(format!("failed to write QR image: {}", e)))?;

        info!("QR code written for checkpoint {} at {:?}", checkpoint_id, path);
        Ok(self.public_url(checkpoint_id))
    }

    pub fn public_url(&self, checkpoint_id: i32) -> String {
        format!(
            "{}/api/checkpoints/qr-codes/{}",
            self.base_url,
            Self::file_name(checkpoint_id)
        )
    }

    pub fn load(&self, checkpoint_id: i32) -> Result<Vec<u8>, ApiError> {
        let path = self.path_for(checkpoint_id);
        fs::read(&path).map_err(|_| {
            debug!("QR code not found for checkpoint {}", checkpoint_id);
            ApiError::NotFound(format!("QR code for checkpoint {} not found", checkpoint_id))
        })
    }

    // Compensation for the two-phase checkpoint create: if the row insert
    // succeeded but a later step fails, the orphan image must not linger.
    pub fn remove(&self, checkpoint_id: i32) {
        let _ = fs::remove_file(self.path_for(checkpoint_id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_writes_png_and_returns_public_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = QrStore::new(dir.path(), "http://localhost:8080/");

        let url = store.save(42).unwrap();
        assert_eq!(url, "http://localhost:8080/api/checkpoints/qr-codes/checkpoint-42.png");

        let bytes = store.load(42).unwrap();
        // PNG magic number
        assert_eq!(&bytes[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
    }

    #[test]
    fn load_missing_image_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = QrStore::new(dir.path(), "http://localhost:8080");

        match store.load(999) {
            Err(ApiError::NotFound(_)) => {}
            other => panic!("expected NotFound, got {:?}", other.map(|b| b.len())),
        }
    }

    #[test]
    fn remove_is_silent_for_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = QrStore::new(dir.path(), "http://localhost:8080");
        store.remove(7);

        store.save(7).unwrap();
        store.remove(7);
        assert!(store.load(7).is_err());
    }
}
