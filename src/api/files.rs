//! Attachment routes.
//!
//! Routes:
//! - POST /api/files - Upload an attachment (multipart, `file` part plus
//!   optional `conversation_id` part)
//! - GET /api/files/:id - Serve the stored bytes back
//! - DELETE /api/files/:id - Delete one attachment

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::header,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::services::MAX_UPLOAD_BYTES;
use crate::{AppState, Error, Result};

/// Build attachment routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(upload_file))
        .route("/:id", get(fetch_file).delete(delete_file))
        // Allow the full payload plus multipart framing overhead; the
        // service enforces the exact 50 MiB cap with a 413.
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + 1024 * 1024))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Upload response.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub id: i64,
    pub url: String,
    pub filename: String,
    pub mime_type: String,
    pub conversation_id: Option<String>,
}

/// Delete response.
#[derive(Debug, Serialize)]
pub struct DeleteFileResponse {
    pub ok: bool,
    pub deleted: i64,
}

// ============================================================================
// Handlers
// ============================================================================

/// Upload an attachment.
///
/// POST /api/files
///
/// Accepts multipart/form-data with a file field named "file" and an
/// optional text field "conversation_id". Persists the payload in the
/// files store and mirrors a companion message into the text store.
#[axum::debug_handler]
async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let mut file: Option<(String, String, Vec<u8>)> = None;
    let mut conversation_id: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::Validation(format!("Failed to read multipart field: {}", e)))?
    {
        match field.name().unwrap_or_default() {
            "file" => {
                let filename = field
                    .file_name()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "unnamed".into());

                let content_type = field.content_type().map(|s| s.to_string());

                let data = field
                    .bytes()
                    .await
                    .map_err(|e| Error::Validation(format!("Failed to read file: {}", e)))?;

                // Fall back to an extension-based guess when the part
                // carries no content type.
                let mime_type = content_type.unwrap_or_else(|| {
                    mime_guess::from_path(&filename)
                        .first_or_octet_stream()
                        .essence_str()
                        .to_string()
                });

                file = Some((filename, mime_type, data.to_vec()));
            }
            "conversation_id" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| Error::Validation(format!("Failed to read field: {}", e)))?;
                if !value.is_empty() {
                    conversation_id = Some(value);
                }
            }
            _ => {}
        }
    }

    let (filename, mime_type, data) =
        file.ok_or_else(|| Error::Validation("No file provided".into()))?;

    let uploaded = state
        .attachments
        .upload(data, filename, mime_type, conversation_id)
        .await?;

    Ok(Json(UploadResponse {
        id: uploaded.id,
        url: uploaded.url,
        filename: uploaded.filename,
        mime_type: uploaded.mime_type,
        conversation_id: uploaded.conversation_id,
    }))
}

/// Serve an attachment's bytes back.
///
/// GET /api/files/:id
///
/// Returns the stored payload verbatim with its recorded content type
/// and an inline content disposition carrying the original filename.
#[axum::debug_handler]
async fn fetch_file(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Response> {
    let file = state.attachments.retrieve(id).await?;

    let mime_type = file
        .mime_type
        .unwrap_or_else(|| "application/octet-stream".into());
    let filename = file.filename.unwrap_or_else(|| "file".into());
    let data = file.file_data.unwrap_or_default();

    let response = Response::builder()
        .header(header::CONTENT_TYPE, mime_type)
        .header(
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"{}\"", disposition_filename(&filename)),
        )
        .header(header::CONTENT_LENGTH, data.len())
        .body(Body::from(data))
        .map_err(|e| Error::Internal(format!("Failed to build response: {}", e)))?;

    Ok(response)
}

/// Delete an attachment.
///
/// DELETE /api/files/:id
///
/// Does not cascade to messages referencing it.
#[axum::debug_handler]
async fn delete_file(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<DeleteFileResponse>> {
    state.attachments.delete(id).await?;

    Ok(Json(DeleteFileResponse {
        ok: true,
        deleted: id,
    }))
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Make a filename safe for a quoted Content-Disposition parameter.
fn disposition_filename(filename: &str) -> String {
    filename
        .chars()
        .filter(|c| !c.is_control() && *c != '"' && *c != '\\')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disposition_filename_passthrough() {
        assert_eq!(disposition_filename("report.pdf"), "report.pdf");
    }

    #[test]
    fn test_disposition_filename_strips_quotes_and_controls() {
        assert_eq!(
            disposition_filename("a\"b\\c\r\nd.txt"),
            "abcd.txt"
        );
    }
}
