//! Client-side navigation targets.

use std::fmt;

use crate::errors::ApiError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Landing,
    Jobs,
    Job(i64),
    UploadResume,
    Interview(String),
    AdminLogin,
    AdminDashboard,
    AdminPanel,
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Route::Landing => "/".to_string(),
            Route::Jobs => "/jobs".to_string(),
            Route::Job(id) => format!("/jobs/{id}"),
            Route::UploadResume => "/upload-resume".to_string(),
            Route::Interview(id) => format!("/vapi/{id}"),
            Route::AdminLogin => "/login-admin".to_string(),
            Route::AdminDashboard => "/admin-dashboard".to_string(),
            Route::AdminPanel => "/admin-panel".to_string(),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Auth failures send the user back to the admin login; everything else
/// stays on the current view with an inline message.
pub fn redirect_for(err: &ApiError) -> Option<Route> {
    err.is_auth_failure().then_some(Route::AdminLogin)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        assert_eq!(Route::Job(9).path(), "/jobs/9");
        assert_eq!(Route::Interview("abc".into()).to_string(), "/vapi/abc");
        assert_eq!(Route::AdminLogin.path(), "/login-admin");
    }

    #[test]
    fn test_redirect_only_on_auth_failure() {
        assert_eq!(
            redirect_for(&ApiError::forbidden("no")),
            Some(Route::AdminLogin)
        );
        assert_eq!(
            redirect_for(&ApiError::unauthorized("no")),
            Some(Route::AdminLogin)
        );
        assert_eq!(redirect_for(&ApiError::network("down")), None);
        assert_eq!(redirect_for(&ApiError::validation("bad")), None);
    }
}
