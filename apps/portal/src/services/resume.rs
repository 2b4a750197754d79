use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::api_client::{ApiClient, ApiRequest, FileUpload};
use crate::errors::{ApiError, ApiResult};
use crate::models::{ResumeData, SubmitReceipt};
use crate::routes::Route;
use crate::storage::{KeyValueStore, CANDIDATE_ID_KEY};

pub const UPLOAD_PATH: &str = "/api/v1/resume/upload/";
pub const RETRIEVE_PATH: &str = "/api/v1/resume/retrieve/";
pub const SUBMIT_PATH: &str = "/api/v1/resume/submit/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub info: String,
    /// Stored name parsed out of `info`.
    pub file_name: Option<String>,
}

/// Text between the first pair of single quotes,
/// e.g. `File 'cv.pdf' uploaded successfully.` yields `cv.pdf`.
pub fn extract_file_name(info: &str) -> Option<String> {
    let start = info.find('\'')? + 1;
    let len = info[start..].find('\'')?;
    Some(info[start..start + len].to_string())
}

/// The backend reports some failures as `{"error": ".."}` with a 2xx status.
fn embedded_error(value: &Value) -> Option<String> {
    value.get("error").map(|e| match e {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

pub async fn upload_resume(api: &ApiClient, upload: FileUpload) -> ApiResult<UploadReceipt> {
    let name = upload.file_name.clone();
    let value = api.send(ApiRequest::post(UPLOAD_PATH).file(upload)).await?;
    if let Some(message) = embedded_error(&value) {
        return Err(ApiError::server(message));
    }
    let info = value
        .get("info")
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::server("Upload response is missing 'info'"))?
        .to_string();
    info!("Uploaded resume {name}");
    Ok(UploadReceipt {
        file_name: extract_file_name(&info),
        info,
    })
}

/// Reads `path` and uploads it under its own file name.
pub async fn upload_resume_file(api: &ApiClient, path: &Path) -> ApiResult<UploadReceipt> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| ApiError::validation(format!("Cannot read {}: {e}", path.display())))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| ApiError::validation(format!("{} is not a file", path.display())))?;
    let mime = match path.extension().and_then(|e| e.to_str()) {
        Some("pdf") => "application/pdf",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    };
    upload_resume(api, FileUpload::new("file", file_name, bytes).with_mime(mime)).await
}

pub async fn retrieve_resume(api: &ApiClient, file_name: &str) -> ApiResult<ResumeData> {
    let value = api
        .send(ApiRequest::get(RETRIEVE_PATH).query("filename", file_name))
        .await?;
    if let Some(message) = embedded_error(&value) {
        return Err(ApiError::not_found(message));
    }
    serde_json::from_value(value)
        .map_err(|e| ApiError::server(format!("Unexpected response shape: {e}")))
}

/// Submits the reviewed resume and remembers the candidate id it was
/// registered under. The candidate continues to the job list.
pub async fn submit_resume(
    api: &ApiClient,
    store: &dyn KeyValueStore,
    resume: &ResumeData,
) -> ApiResult<Route> {
    let body = serde_json::to_value(resume).map_err(|e| ApiError::validation(e.to_string()))?;
    let receipt: SubmitReceipt = api
        .send_json(ApiRequest::post(SUBMIT_PATH).json(body))
        .await?;
    store.set(CANDIDATE_ID_KEY, &receipt.candidate_id);
    info!("Resume submitted as candidate {}", receipt.candidate_id);
    Ok(Route::Jobs)
}

pub fn stored_candidate_id(store: &dyn KeyValueStore) -> Option<String> {
    store.get(CANDIDATE_ID_KEY).filter(|id| !id.is_empty())
}
