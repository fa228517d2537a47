use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub filename: String,
    pub stored_path: PathBuf,
    pub format: ImageFormat,
    pub bytes: Vec<u8>,
}

/// The fixed three-part message sent to the model: system instruction,
/// then the image, then the user instruction. Ordering matters.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub system_instruction: String,
    pub user_instruction: String,
    pub image: UploadedImage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

#[derive(Debug, Clone, Serialize)]
pub struct Turn {
    pub role: Role,
    pub payload: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryRecord {
    pub image_name: String,
    pub image_path: String,
    pub response: String,
    pub timestamp: DateTime<Utc>,
    pub history: Vec<Turn>,
}

impl HistoryRecord {
    /// Build the record with the two-turn conversation shape: the user turn
    /// carries the image name, the model turn the formatted response.
    pub fn new(
        image_name: &str,
        image_path: &str,
        response: &str,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            image_name: image_name.to_string(),
            image_path: image_path.to_string(),
            response: response.to_string(),
            timestamp,
            history: vec![
                Turn {
                    role: Role::User,
                    payload: image_name.to_string(),
                },
                Turn {
                    role: Role::Model,
                    payload: response.to_string(),
                },
            ],
        }
    }
}
