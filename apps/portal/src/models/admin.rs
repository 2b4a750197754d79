use serde::{Deserialize, Serialize};

use crate::errors::{ApiError, ApiResult};
use crate::view::{Listable, SortValue};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Admin {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Listable for Admin {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.username.as_str()]
    }

    fn sort_value(&self, key: &str) -> Option<SortValue> {
        let value = match key {
            "id" => SortValue::Int(self.id),
            "username" => self.username.as_str().into(),
            "created_at" => self.created_at.as_deref().into(),
            "updated_at" => self.updated_at.as_deref().into(),
            _ => return None,
        };
        Some(value)
    }
}

/// Create/edit form. Only `username` and `password` go over the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AdminForm {
    pub username: String,
    pub password: String,
    #[serde(skip)]
    pub retype_password: String,
}

impl AdminForm {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        let password = password.into();
        Self {
            username: username.into(),
            retype_password: password.clone(),
            password,
        }
    }

    /// Local checks run before any request is issued.
    pub fn validate(&self) -> ApiResult<()> {
        if self.username.trim().is_empty() {
            return Err(ApiError::validation("Username is required"));
        }
        if self.password.is_empty() {
            return Err(ApiError::validation("Password is required"));
        }
        if self.password != self.retype_password {
            return Err(ApiError::validation("Passwords do not match"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ApiErrorKind;

    #[test]
    fn test_form_serializes_without_retype() {
        let form = AdminForm::new("root", "pw");
        let value = serde_json::to_value(&form).unwrap();
        assert_eq!(value, serde_json::json!({"username": "root", "password": "pw"}));
    }

    #[test]
    fn test_mismatched_passwords_rejected() {
        let form = AdminForm {
            retype_password: "other".into(),
            ..AdminForm::new("root", "pw")
        };
        assert_eq!(form.validate().unwrap_err().kind, ApiErrorKind::Validation);
        assert!(AdminForm::new("root", "pw").validate().is_ok());
        assert!(AdminForm::new(" ", "pw").validate().is_err());
    }
}
