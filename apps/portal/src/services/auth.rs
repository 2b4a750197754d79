use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use crate::api_client::{ApiClient, ApiRequest};
use crate::errors::{ApiError, ApiErrorKind, ApiResult};
use crate::routes::Route;

pub const LOGIN_PATH: &str = "/api/v1/login-admin";

#[derive(Debug, Deserialize)]
struct LoginResponse {
    access_token: String,
}

/// Exchanges admin credentials for a bearer token valid for `ttl`.
/// Returns where the caller should navigate next.
pub async fn login_admin(
    api: &ApiClient,
    username: &str,
    password: &str,
    ttl: Duration,
) -> ApiResult<Route> {
    if username.trim().is_empty() || password.is_empty() {
        return Err(ApiError::validation("Username and password are required"));
    }

    let req = ApiRequest::post(LOGIN_PATH).form([("username", username), ("password", password)]);
    let response: LoginResponse = match api.send_json(req).await {
        Ok(r) => r,
        Err(e) if matches!(
            e.kind,
            ApiErrorKind::Unauthorized
                | ApiErrorKind::Forbidden
                | ApiErrorKind::NotFound
                | ApiErrorKind::Validation
        ) =>
        {
            return Err(ApiError {
                kind: ApiErrorKind::Validation,
                message: "Incorrect username or password".to_string(),
                status_code: e.status_code,
            });
        }
        Err(e) => return Err(e),
    };

    api.session().set(response.access_token, ttl);
    info!("Admin '{username}' logged in");
    Ok(Route::AdminDashboard)
}

/// Drops the session. Always succeeds.
pub fn logout(api: &ApiClient) -> Route {
    api.session().clear();
    Route::AdminLogin
}
