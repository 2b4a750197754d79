//! Resource Fetcher: the single point of entry for every backend call.
//!
//! RULE: no other module talks to reqwest. Services describe a request with
//! `ApiRequest` and get back decoded JSON or an `ApiError`.
//!
//! No retries happen here. A failed call is returned to the caller as-is.

use std::time::Duration;

use anyhow::Context;
use bytes::Bytes;
use reqwest::{multipart, Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{ApiError, ApiResult};
use crate::session::SessionStore;

pub mod request;

pub use request::{ApiRequest, FileUpload, RequestBody};

/// Shape of FastAPI error bodies: `{"detail": "..."}` or a list of
/// `{"msg": "..."}` items for validation failures.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<Value>,
    error: Option<String>,
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: SessionStore,
}

impl ApiClient {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        session: SessionStore,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `request(method, path, body?, requires_auth)` in its plain form.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<RequestBody>,
        requires_auth: bool,
    ) -> ApiResult<Value> {
        let mut req = ApiRequest::new(method, path);
        req.body = body;
        req.requires_auth = requires_auth;
        self.send(req).await
    }

    /// Sends `req` and decodes the 2xx body as JSON (`null` when empty).
    ///
    /// The bearer token goes on every request while a session is live.
    /// Requests that require auth fail fast without one.
    pub async fn send(&self, req: ApiRequest) -> ApiResult<Value> {
        let token = match self.session.get() {
            Some(token) => Some(token),
            None if req.requires_auth => {
                debug!("{} {} skipped: no access token", req.method, req.path);
                return Err(ApiError::unauthorized(
                    "No access token found. Please log in again.",
                ));
            }
            None => None,
        };

        let url = self.url_for(&req.path);
        debug!("HTTP {} {}", req.method, url);

        let mut builder = self.client.request(req.method.clone(), &url);
        if !req.query.is_empty() {
            builder = builder.query(&req.query);
        }
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        builder = match req.body {
            None => builder,
            Some(RequestBody::Json(value)) => builder.json(&value),
            Some(RequestBody::Form(fields)) => builder.form(&fields),
            Some(RequestBody::File(upload)) => builder.multipart(multipart_form(upload)?),
        };

        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(transport_error)?;

        if !status.is_success() {
            let err = ApiError::from_status(status.as_u16(), error_message(status, &body));
            if err.is_auth_failure() {
                warn!("{} {} returned {}; clearing session", req.method, url, status);
                self.session.clear();
            }
            return Err(err);
        }

        decode_body(&body)
    }

    /// Same as [`send`](Self::send), decoding into `T`.
    pub async fn send_json<T: DeserializeOwned>(&self, req: ApiRequest) -> ApiResult<T> {
        let value = self.send(req).await?;
        serde_json::from_value(value)
            .map_err(|e| ApiError::server(format!("Unexpected response shape: {e}")))
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

fn multipart_form(upload: FileUpload) -> ApiResult<multipart::Form> {
    let mut part = multipart::Part::bytes(upload.bytes.to_vec()).file_name(upload.file_name);
    if let Some(mime) = upload.mime {
        part = part
            .mime_str(&mime)
            .map_err(|e| ApiError::validation(format!("Invalid content type '{mime}': {e}")))?;
    }
    Ok(multipart::Form::new().part(upload.field, part))
}

fn transport_error(e: reqwest::Error) -> ApiError {
    if e.is_builder() {
        return ApiError::validation(format!("Invalid request: {e}"));
    }
    if e.is_timeout() {
        return ApiError::network(format!("Request timed out: {e}"));
    }
    ApiError::network(e.to_string())
}

fn decode_body(body: &Bytes) -> ApiResult<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body).map_err(|e| ApiError::server(e.to_string()))
}

/// Best human-readable message out of an error response.
fn error_message(status: StatusCode, body: &[u8]) -> String {
    if let Ok(parsed) = serde_json::from_slice::<ErrorBody>(body) {
        match parsed.detail {
            Some(Value::String(s)) => return s,
            Some(Value::Array(items)) => {
                let msgs: Vec<&str> = items
                    .iter()
                    .filter_map(|i| i.get("msg").and_then(Value::as_str))
                    .collect();
                if !msgs.is_empty() {
                    return msgs.join("; ");
                }
            }
            _ => {}
        }
        if let Some(error) = parsed.error {
            return error;
        }
    }
    let text = String::from_utf8_lossy(body).trim().to_string();
    if text.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string()
    } else {
        text
    }
}
