use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    extract::multipart::MultipartRejection,
    extract::{Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde_json::json;

use crate::gemini::ModelClient;
use crate::history::HistoryStore;
use crate::image::{self, ImageError};
use crate::models::HistoryRecord;
use crate::{format, prompt};

// ── Shared state ─────────────────────────────────────────────────────────────

/// Long-lived dependencies injected at process start; tests substitute fakes.
#[derive(Clone)]
pub struct AppState {
    pub model: Arc<dyn ModelClient>,
    pub store: Arc<dyn HistoryStore>,
    pub upload_dir: PathBuf,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index).post(upload))
        .route("/health", get(health))
        .with_state(state)
}

// ── Pages ────────────────────────────────────────────────────────────────────

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Image Feature Extractor</title>
</head>
<body>
    <h1>Image Feature Extractor</h1>
    <form method="post" action="/" enctype="multipart/form-data">
        <input type="file" name="image" accept=".jpg,.jpeg,.png">
        <button type="submit">Extract Features</button>
    </form>
</body>
</html>
"#;

const RESULT_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Extraction Result</title>
</head>
<body>
    <h1>Extracted Features</h1>
    <div class="response">{{response}}</div>
    <a href="/">Upload another image</a>
</body>
</html>
"#;

fn render_result(formatted: &str) -> String {
    RESULT_HTML.replace("{{response}}", formatted)
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Drive the pipeline: save the upload, load it back, build the prompt, call
/// the model, format the completion, persist the history record, render.
async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let mut multipart = match multipart {
        Ok(m) => m,
        Err(_) => return (StatusCode::BAD_REQUEST, "No file part").into_response(),
    };

    // Find the `image` field; other fields are ignored.
    let mut upload = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() != Some("image") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let data = match field.bytes().await {
            Ok(data) => data,
            Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
        };
        upload = Some((filename, data));
        break;
    }

    let Some((filename, data)) = upload else {
        return (StatusCode::BAD_REQUEST, "No file part").into_response();
    };
    if filename.is_empty() {
        return (StatusCode::BAD_REQUEST, "No selected file").into_response();
    }

    // Store under the client filename's final path component. Last write wins
    // on collisions; nothing is ever cleaned up.
    let Some(stored_name) = Path::new(&filename).file_name() else {
        return (StatusCode::BAD_REQUEST, "No selected file").into_response();
    };
    let path = state.upload_dir.join(stored_name);
    if let Err(e) = tokio::fs::write(&path, &data).await {
        tracing::error!(path = %path.display(), "failed to save upload: {}", e);
        return (StatusCode::INTERNAL_SERVER_ERROR, "Error saving uploaded file").into_response();
    }
    tracing::info!("saved file to {}", path.display());

    let uploaded = match image::load(&path).await {
        Ok(image) => image,
        Err(e) => {
            let status = match &e {
                ImageError::NotFound(_) => StatusCode::NOT_FOUND,
                ImageError::UnsupportedFormat => StatusCode::BAD_REQUEST,
                ImageError::Read(_) => StatusCode::INTERNAL_SERVER_ERROR,
            };
            return (status, e.to_string()).into_response();
        }
    };

    let request = prompt::build(uploaded);
    let raw = match state.model.infer(&request).await {
        Ok(text) => text,
        Err(e) => {
            tracing::error!("model call failed: {}", e);
            return (StatusCode::BAD_GATEWAY, e.to_string()).into_response();
        }
    };

    let formatted = format::format_response(&raw);

    let record = HistoryRecord::new(
        &filename,
        &path.display().to_string(),
        &formatted,
        Utc::now(),
    );
    match state.store.insert(&record).await {
        Ok(id) => tracing::info!("inserted history record {}", id),
        Err(e) => {
            tracing::error!("history insert failed: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error inserting data into history store",
            )
                .into_response();
        }
    }

    Html(render_result(&formatted)).into_response()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini::ModelError;
    use crate::history::{InMemoryHistoryStore, StoreError};
    use crate::models::ExtractionRequest;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request};
    use std::sync::Mutex;
    use tower::ServiceExt;
    use uuid::Uuid;

    struct FakeModel {
        calls: Mutex<Vec<ExtractionRequest>>,
        response: String,
    }

    impl FakeModel {
        fn new(response: &str) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                response: response.to_string(),
            }
        }
    }

    #[async_trait]
    impl ModelClient for FakeModel {
        async fn infer(&self, request: &ExtractionRequest) -> Result<String, ModelError> {
            self.calls.lock().unwrap().push(request.clone());
            Ok(self.response.clone())
        }
    }

    struct FailingStore;

    #[async_trait]
    impl HistoryStore for FailingStore {
        async fn insert(&self, _record: &HistoryRecord) -> Result<Uuid, StoreError> {
            Err(StoreError::Insert("connection refused".into()))
        }
    }

    fn multipart_request(field: &str, filename: Option<&str>, data: &[u8]) -> Request<Body> {
        let boundary = "test-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!("--{boundary}\r\nContent-Disposition: form-data; name=\"{field}\"").as_bytes(),
        );
        if let Some(name) = filename {
            body.extend_from_slice(format!("; filename=\"{name}\"").as_bytes());
        }
        body.extend_from_slice(b"\r\nContent-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn get_serves_upload_form() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState {
            model: Arc::new(FakeModel::new("x")),
            store: Arc::new(InMemoryHistoryStore::new()),
            upload_dir: dir.path().to_path_buf(),
        };
        let response = router(state)
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert!(body.contains("<form"));
        assert!(body.contains("name=\"image\""));
    }

    #[tokio::test]
    async fn post_without_image_field_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState {
            model: Arc::new(FakeModel::new("x")),
            store: Arc::new(InMemoryHistoryStore::new()),
            upload_dir: dir.path().to_path_buf(),
        };
        let response = router(state)
            .oneshot(multipart_request("other", Some("cat.png"), b"data"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_string(response).await, "No file part");
    }

    #[tokio::test]
    async fn post_with_empty_filename_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState {
            model: Arc::new(FakeModel::new("x")),
            store: Arc::new(InMemoryHistoryStore::new()),
            upload_dir: dir.path().to_path_buf(),
        };
        let response = router(state)
            .oneshot(multipart_request("image", Some(""), b"data"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_string(response).await, "No selected file");
    }

    #[tokio::test]
    async fn upload_runs_full_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let model = Arc::new(FakeModel::new("## Colors\n* Red\n - Blue**"));
        let store = Arc::new(InMemoryHistoryStore::new());
        let state = AppState {
            model: model.clone(),
            store: store.clone(),
            upload_dir: dir.path().to_path_buf(),
        };

        let png = [0x89u8, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a];
        let response = router(state)
            .oneshot(multipart_request("image", Some("cat.png"), &png))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // File saved under its original name.
        let saved = std::fs::read(dir.path().join("cat.png")).unwrap();
        assert_eq!(saved, png);

        // Model called exactly once with a PNG-typed image between the two
        // fixed instructions.
        {
            let calls = model.calls.lock().unwrap();
            assert_eq!(calls.len(), 1);
            assert_eq!(calls[0].image.format.mime_type(), "image/png");
            assert_eq!(calls[0].system_instruction, prompt::SYSTEM_INSTRUCTION);
            assert_eq!(calls[0].user_instruction, prompt::USER_INSTRUCTION);
        }

        // Exactly one record, keyed by the client filename.
        let records = store.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].image_name, "cat.png");
        assert!(records[0].response.starts_with("<ul>"));

        // Result page embeds the formatted HTML.
        let body = body_string(response).await;
        assert!(body.contains("<h6><br> Colors"));
        assert!(body.contains("<li><p>Red"));
    }

    #[tokio::test]
    async fn store_failure_halts_before_rendering() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState {
            model: Arc::new(FakeModel::new("## Colors**")),
            store: Arc::new(FailingStore),
            upload_dir: dir.path().to_path_buf(),
        };
        let response = router(state)
            .oneshot(multipart_request("image", Some("cat.png"), b"\x89PNG"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_string(response).await,
            "Error inserting data into history store"
        );
    }

    #[tokio::test]
    async fn unsupported_extension_is_a_user_visible_error() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState {
            model: Arc::new(FakeModel::new("x")),
            store: Arc::new(InMemoryHistoryStore::new()),
            upload_dir: dir.path().to_path_buf(),
        };
        let response = router(state)
            .oneshot(multipart_request("image", Some("cat.gif"), b"gif data"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_string(response).await,
            "Unsupported image format. Only JPEG and PNG are allowed."
        );
    }
}
