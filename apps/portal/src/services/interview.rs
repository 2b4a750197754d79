use serde::Deserialize;
use tracing::{info, warn};

use crate::api_client::{ApiClient, ApiRequest};
use crate::errors::{ApiErrorKind, ApiResult};
use crate::models::CandidateProfile;

#[derive(Debug, Clone, Deserialize)]
pub struct EndInterviewReceipt {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub is_interviewed: Option<bool>,
}

/// Resolves an interview link to its candidate.
///
/// `Ok(None)` means the link is expired, already used, or unknown. The
/// backend answers those with a 400 or 404; anything else is a real error.
pub async fn validate_interview_link(
    api: &ApiClient,
    link_id: &str,
) -> ApiResult<Option<CandidateProfile>> {
    let req = ApiRequest::get(format!("/api/v1/interview/validate_interview_link/{link_id}"));
    match api.send_json::<CandidateProfile>(req).await {
        Ok(profile) => Ok(Some(profile)),
        Err(e) if matches!(e.kind, ApiErrorKind::Validation | ApiErrorKind::NotFound) => {
            warn!("Interview link {link_id} rejected: {}", e.message);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

pub async fn end_interview(api: &ApiClient, token: &str) -> ApiResult<EndInterviewReceipt> {
    let receipt = api
        .send_json(ApiRequest::post(format!("/end_interview/{token}")))
        .await?;
    info!("Interview {token} ended");
    Ok(receipt)
}
