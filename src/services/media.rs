use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{ImageFormat, ImageReader};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Directory under the media root holding uploaded project photos.
pub const PHOTO_DIR: &str = "project_photos";

/// URL prefix the media root is served under.
pub const MEDIA_URL: &str = "/media";

/// Local file storage for uploaded images.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Validates `data` as an image and writes it under a fresh name.
    /// Returns the path relative to the media root.
    pub async fn put_image(&self, data: &[u8]) -> AppResult<String> {
        let format = detect_image(data)?;
        let ext = format.extensions_str().first().copied().unwrap_or("img");
        let relative = format!("{PHOTO_DIR}/{}.{ext}", Uuid::new_v4());

        let path = self.root.join(&relative);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Internal(format!("failed to create media directory: {e}")))?;
        }
        tokio::fs::write(&path, data)
            .await
            .map_err(|e| AppError::Internal(format!("failed to store image: {e}")))?;

        tracing::debug!(path = %relative, bytes = data.len(), "stored image");
        Ok(relative)
    }

    /// Removes a stored file. A file that is already gone is not an error.
    pub async fn delete(&self, relative: &str) {
        match tokio::fs::remove_file(self.root.join(relative)).await {
            Ok(()) => tracing::debug!(path = %relative, "removed image"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %relative, error = %e, "failed to remove image"),
        }
    }

    pub fn url(relative: &str) -> String {
        format!("{MEDIA_URL}/{relative}")
    }
}

/// Sniffs the format from the content and checks the header decodes.
fn detect_image(data: &[u8]) -> AppResult<ImageFormat> {
    let invalid = || {
        AppError::Validation(
            "Upload a valid image. The file you uploaded was either not an image or a corrupted image."
                .to_string(),
        )
    };

    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|_| invalid())?;
    let format = reader.format().ok_or_else(invalid)?;
    reader.into_dimensions().map_err(|_| invalid())?;

    Ok(format)
}
