use std::path::Path;

use crate::models::{ImageFormat, UploadedImage};

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("Could not find image: {0}")]
    NotFound(String),
    #[error("Unsupported image format. Only JPEG and PNG are allowed.")]
    UnsupportedFormat,
    #[error("Failed to read image: {0}")]
    Read(String),
}

/// Load an uploaded image from disk. The media type is taken from the file
/// extension alone; the bytes are never inspected.
pub async fn load(path: &Path) -> Result<UploadedImage, ImageError> {
    if !path.exists() {
        return Err(ImageError::NotFound(path.display().to_string()));
    }

    let format = format_from_extension(path).ok_or(ImageError::UnsupportedFormat)?;

    // Whole file in memory, no size limit. Matches the upload flow: files are
    // written moments earlier by the handler and are expected to be small.
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| ImageError::Read(e.to_string()))?;

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(UploadedImage {
        filename,
        stored_path: path.to_path_buf(),
        format,
        bytes,
    })
}

fn format_from_extension(path: &Path) -> Option<ImageFormat> {
    match path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => Some(ImageFormat::Jpeg),
        Some("png") => Some(ImageFormat::Png),
        _ => None,
    }
}
