use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use crate::api_client::{ApiClient, ApiRequest};
use crate::errors::{ApiError, ApiResult};
use crate::models::{ApplicationReceipt, Job, JobPage};
use crate::storage::{application_key, KeyValueStore};
use crate::view::{ListQuery, ListResult, PageSource};

use super::resume::stored_candidate_id;

pub const JOBS_PATH: &str = "/api/v1/jobs/";

pub async fn list_jobs(api: &ApiClient, page: u32) -> ApiResult<JobPage> {
    api.send_json(ApiRequest::get(JOBS_PATH).query("page", page))
        .await
}

pub async fn get_job(api: &ApiClient, job_id: i64) -> ApiResult<Job> {
    api.send_json(ApiRequest::get(format!("/api/v1/jobs/{job_id}")))
        .await
}

/// Applies the stored candidate to `job_id` and flags the application
/// locally so the job page can show it as already applied.
pub async fn apply_to_job(
    api: &ApiClient,
    store: &dyn KeyValueStore,
    job_id: i64,
) -> ApiResult<ApplicationReceipt> {
    let candidate_id = stored_candidate_id(store)
        .ok_or_else(|| ApiError::validation("Upload your resume before applying"))?;
    let receipt: ApplicationReceipt = api
        .send_json(
            ApiRequest::post(format!("/api/v1/jobs/apply/{job_id}"))
                .json(json!({ "candidate_id": candidate_id })),
        )
        .await?;
    store.set(&application_key(job_id, &candidate_id), "true");
    info!("Candidate {candidate_id} applied to job {job_id}");
    Ok(receipt)
}

pub fn has_applied(store: &dyn KeyValueStore, job_id: i64) -> bool {
    stored_candidate_id(store)
        .and_then(|id| store.get(&application_key(job_id, &id)))
        .is_some_and(|flag| flag == "true")
}

#[derive(Clone)]
pub struct JobSource {
    api: ApiClient,
}

impl JobSource {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl PageSource<Job> for JobSource {
    async fn fetch_page(&self, query: &ListQuery) -> ApiResult<ListResult<Job>> {
        let page = list_jobs(&self.api, query.page).await?;
        Ok(ListResult::new(page.jobs, page.total_pages, page.page_size))
    }
}
