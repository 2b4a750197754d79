use bytes::Bytes;
use reqwest::Method;
use serde_json::Value;

/// Payload attached to an outgoing request.
#[derive(Debug, Clone)]
pub enum RequestBody {
    Json(Value),
    /// `application/x-www-form-urlencoded` fields, in order.
    Form(Vec<(String, String)>),
    /// Single-file multipart upload.
    File(FileUpload),
}

#[derive(Debug, Clone)]
pub struct FileUpload {
    pub field: String,
    pub file_name: String,
    pub mime: Option<String>,
    pub bytes: Bytes,
}

impl FileUpload {
    pub fn new(field: impl Into<String>, file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            field: field.into(),
            file_name: file_name.into(),
            mime: None,
            bytes: bytes.into(),
        }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }
}

/// Description of one backend call, consumed by `ApiClient::send`.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<RequestBody>,
    pub requires_auth: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            requires_auth: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach the session's bearer token; fail fast if there is none.
    pub fn auth(mut self) -> Self {
        self.requires_auth = true;
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn json(mut self, value: Value) -> Self {
        self.body = Some(RequestBody::Json(value));
        self
    }

    pub fn form<K, V>(mut self, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.body = Some(RequestBody::Form(
            fields.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        ));
        self
    }

    pub fn file(mut self, upload: FileUpload) -> Self {
        self.body = Some(RequestBody::File(upload));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_collects_parts() {
        let req = ApiRequest::get("/api/v1/admin-dashboard/filters")
            .auth()
            .query("skill", "rust")
            .query("interviewed", true);
        assert_eq!(req.method, Method::GET);
        assert!(req.requires_auth);
        assert_eq!(
            req.query,
            vec![
                ("skill".to_string(), "rust".to_string()),
                ("interviewed".to_string(), "true".to_string())
            ]
        );
        assert!(req.body.is_none());
    }

    #[test]
    fn test_requests_are_anonymous_by_default() {
        assert!(!ApiRequest::post("/api/v1/resume/submit/").requires_auth);
    }
}
