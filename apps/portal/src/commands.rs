//! Runs one CLI command against the backend and renders its result as text.

use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use chrono::SecondsFormat;
use serde::Serialize;

use crate::api_client::ApiClient;
use crate::cli::Command;
use crate::clock::SystemClock;
use crate::config::Config;
use crate::errors::{ApiError, ApiResult};
use crate::interview::AssistantOverrides;
use crate::models::{Admin, AdminForm, Candidate, CandidateFilters, Job, ResumeData};
use crate::services::{admins, auth, candidates, interview, jobs, resume};
use crate::services::{AdminSource, CandidateSource, JobSource};
use crate::session::SessionStore;
use crate::storage::KeyValueStore;
use crate::view::{ActionTracker, AsyncAction, ListQuery, ListViewController, Pagination};

pub struct App {
    config: Config,
    api: ApiClient,
    store: Arc<dyn KeyValueStore>,
}

impl App {
    /// Restores any persisted session from `store` and builds the client.
    pub fn new(config: Config, store: Arc<dyn KeyValueStore>) -> anyhow::Result<Self> {
        let session = SessionStore::hydrate(Arc::new(SystemClock), store.clone());
        let api = ApiClient::new(config.api_url.clone(), config.request_timeout, session)
            .context("Failed to build HTTP client")?;
        Ok(Self { config, api, store })
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub async fn run(&self, command: Command) -> ApiResult<String> {
        match command {
            Command::Login { username, password } => {
                let next =
                    auth::login_admin(&self.api, &username, &password, self.config.session_ttl)
                        .await?;
                Ok(format!("Logged in as {username}. Next: {next}"))
            }
            Command::Logout => {
                let next = auth::logout(&self.api);
                Ok(format!("Logged out. Next: {next}"))
            }
            Command::Status => Ok(self.status()),
            Command::Jobs {
                page,
                search,
                open_only,
            } => self.jobs(page, search, open_only).await,
            Command::Job { id } => {
                let job = jobs::get_job(&self.api, id).await?;
                let mut out = to_pretty(&job)?;
                if jobs::has_applied(self.store.as_ref(), id) {
                    out.push_str("\nYou have already applied to this job.");
                }
                Ok(out)
            }
            Command::Apply { job_id } => {
                if jobs::has_applied(self.store.as_ref(), job_id) {
                    return Ok(format!("Already applied to job {job_id}."));
                }
                let receipt = tracked(|| jobs::apply_to_job(&self.api, self.store.as_ref(), job_id))
                    .await?;
                let mut out = format!("Applied to job {job_id}.");
                if let Some(status) = receipt.status {
                    let _ = write!(out, " Status: {status}");
                }
                if let Some(link) = receipt.interview_link {
                    let _ = write!(out, "\nInterview link: {link}");
                }
                Ok(out)
            }
            Command::Upload { file } => {
                let receipt = tracked(|| resume::upload_resume_file(&self.api, &file)).await?;
                let name = receipt.file_name.ok_or_else(|| {
                    ApiError::validation(format!(
                        "Upload reply names no stored file: {}",
                        receipt.info
                    ))
                })?;
                let parsed = resume::retrieve_resume(&self.api, &name).await?;
                Ok(format!("{}\n{}", receipt.info, to_pretty(&parsed)?))
            }
            Command::Submit { file } => {
                let data = read_resume(&file).await?;
                let next =
                    tracked(|| resume::submit_resume(&self.api, self.store.as_ref(), &data))
                        .await?;
                let id = resume::stored_candidate_id(self.store.as_ref()).unwrap_or_default();
                Ok(format!("Registered as candidate {id}. Next: {next}"))
            }
            Command::Candidates {
                search,
                sort,
                desc,
                skill,
                interviewed,
                non_interviewed_expired,
                pending_interviews,
            } => {
                let filters = CandidateFilters {
                    skill,
                    interviewed,
                    non_interviewed_expired: non_interviewed_expired.then_some(true),
                    pending_interviews: pending_interviews.then_some(true),
                };
                self.candidates(filters, search, sort, desc).await
            }
            Command::Stats { top } => {
                let rows = candidates::list_candidates(&self.api, &CandidateFilters::default())
                    .await?;
                to_pretty(&candidates::dashboard_stats(&rows, top))
            }
            Command::Admins { search } => {
                let ctrl =
                    ListViewController::new(AdminSource::new(self.api.clone()), ListQuery::default());
                ctrl.refresh().await?;
                ctrl.set_search(search.unwrap_or_default());
                Ok(render_admins(&ctrl.visible()))
            }
            Command::CreateAdmin {
                username,
                password,
                retype_password,
            } => {
                let form = admin_form(username, password, retype_password);
                let admin = tracked(|| admins::create_admin(&self.api, &form)).await?;
                Ok(format!("Created admin {} (id {})", admin.username, admin.id))
            }
            Command::UpdateAdmin {
                id,
                username,
                password,
                retype_password,
            } => {
                let form = admin_form(username, password, retype_password);
                let admin = tracked(|| admins::update_admin(&self.api, id, &form)).await?;
                Ok(format!("Updated admin {} (id {})", admin.username, admin.id))
            }
            Command::DeleteAdmin { id } => {
                tracked(|| admins::delete_admin(&self.api, id)).await?;
                Ok(format!("Deleted admin {id}"))
            }
            Command::ValidateLink { id, overrides } => {
                let Some(profile) = interview::validate_interview_link(&self.api, &id).await?
                else {
                    return Ok("The interview link is not valid.".to_string());
                };
                let mut out = to_pretty(&profile)?;
                if overrides {
                    let assistant = self.config.assistant_id.as_deref().unwrap_or("<unset>");
                    let _ = write!(
                        out,
                        "\nAssistant: {assistant}\n{}",
                        to_pretty(&AssistantOverrides::for_candidate(&profile))?
                    );
                }
                Ok(out)
            }
            Command::EndInterview { token } => {
                let receipt = interview::end_interview(&self.api, &token).await?;
                Ok(receipt
                    .message
                    .unwrap_or_else(|| "Interview ended.".to_string()))
            }
        }
    }

    fn status(&self) -> String {
        let session = self.api.session();
        let admin = match session.expires_at() {
            Some(at) if session.is_authenticated() => {
                format!("logged in until {}", at.to_rfc3339_opts(SecondsFormat::Secs, true))
            }
            _ => "not logged in".to_string(),
        };
        let candidate = resume::stored_candidate_id(self.store.as_ref())
            .unwrap_or_else(|| "none".to_string());
        format!(
            "API: {}\nAdmin: {admin}\nCandidate: {candidate}",
            self.api.base_url()
        )
    }

    async fn jobs(&self, page: u32, search: Option<String>, open_only: bool) -> ApiResult<String> {
        let ctrl = ListViewController::new(JobSource::new(self.api.clone()), ListQuery::page(page));
        ctrl.refresh().await?;
        ctrl.set_search(search.unwrap_or_default());
        let rows: Vec<Job> = ctrl
            .visible()
            .into_iter()
            .filter(|j| !open_only || j.is_opened)
            .collect();
        Ok(render_jobs(&rows, ctrl.pagination()))
    }

    async fn candidates(
        &self,
        filters: CandidateFilters,
        search: Option<String>,
        sort: Option<String>,
        desc: bool,
    ) -> ApiResult<String> {
        let query = ListQuery {
            filters: filters.to_filters(),
            ..ListQuery::default()
        };
        let ctrl = ListViewController::new(CandidateSource::new(self.api.clone()), query);
        ctrl.refresh().await?;
        ctrl.set_search(search.unwrap_or_default());
        if let Some(key) = sort {
            ctrl.toggle_sort(&key);
            if desc {
                ctrl.toggle_sort(&key);
            }
        }
        Ok(render_candidates(&ctrl.visible()))
    }
}

/// Runs a mutation through an action tracker, as the views do for their
/// submit buttons.
async fn tracked<T, F, Fut>(op: F) -> ApiResult<T>
where
    T: Clone,
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = ApiResult<T>>,
{
    let tracker = ActionTracker::new();
    match tracker.run(op).await {
        AsyncAction::Succeeded(value) => Ok(value),
        AsyncAction::Failed(e) => Err(e),
        AsyncAction::Idle | AsyncAction::Pending => {
            Err(ApiError::validation("Action is already in progress"))
        }
    }
}

fn admin_form(username: String, password: String, retype: Option<String>) -> AdminForm {
    let mut form = AdminForm::new(username, password);
    if let Some(retype) = retype {
        form.retype_password = retype;
    }
    form
}

async fn read_resume(path: &Path) -> ApiResult<ResumeData> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ApiError::validation(format!("Cannot read {}: {e}", path.display())))?;
    serde_json::from_str(&raw)
        .map_err(|e| ApiError::validation(format!("{} is not a valid resume: {e}", path.display())))
}

fn to_pretty<T: Serialize>(value: &T) -> ApiResult<String> {
    serde_json::to_string_pretty(value).map_err(|e| ApiError::server(e.to_string()))
}

pub fn render_jobs(rows: &[Job], pagination: Pagination) -> String {
    let mut out = String::new();
    if rows.is_empty() {
        out.push_str("No jobs found.\n");
    }
    for job in rows {
        let _ = writeln!(
            out,
            "#{:<5} {:<40} {:<20} {}",
            job.job_id,
            job.title,
            job.location.as_deref().unwrap_or("-"),
            if job.is_opened { "open" } else { "closed" }
        );
    }
    let _ = write!(
        out,
        "Page {} of {}  [{}Previous] [{}Next]",
        pagination.page,
        pagination.total_pages,
        if pagination.has_previous { "" } else { "x " },
        if pagination.has_next { "" } else { "x " },
    );
    out
}

fn render_candidates(rows: &[Candidate]) -> String {
    if rows.is_empty() {
        return "No candidates found.".to_string();
    }
    let mut out = String::new();
    for c in rows {
        let _ = writeln!(
            out,
            "#{:<5} {:<25} {:<30} {:<12} {}",
            c.candidate_id,
            c.name,
            c.primary_email().unwrap_or("-"),
            if c.is_interviewed { "interviewed" } else { "pending" },
            c.skills.join(", ")
        );
    }
    out.trim_end().to_string()
}

fn render_admins(rows: &[Admin]) -> String {
    if rows.is_empty() {
        return "No admins found.".to_string();
    }
    rows.iter()
        .map(|a| {
            format!(
                "#{:<5} {:<20} {}",
                a.id,
                a.username,
                a.role.as_deref().unwrap_or("-")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use axum::{
        body::Bytes,
        extract::Query,
        routing::{get, post},
        Json, Router,
    };
    use serde_json::json;

    use super::*;
    use crate::errors::ApiErrorKind;
    use crate::routes::redirect_for;
    use crate::routes::Route;
    use crate::storage::MemoryStore;
    use crate::test_support::spawn_backend;

    fn backend() -> Router {
        Router::new()
            .route(
                "/api/v1/jobs/",
                get(|Query(q): Query<HashMap<String, u32>>| async move {
                    let page = q.get("page").copied().unwrap_or(1);
                    Json(json!({
                        "jobs": [
                            {"job_id": 1, "title": "Rust Engineer", "location": "Remote",
                             "salary": null, "date_posted": null, "is_opened": true},
                            {"job_id": 2, "title": "Go Engineer", "location": null,
                             "salary": null, "date_posted": null, "is_opened": false},
                        ],
                        "page": page, "page_size": 2, "total_pages": 3,
                    }))
                }),
            )
            .route(
                "/api/v1/all-admins",
                get(|| async { Json(json!([{"id": 1, "username": "root", "role": "admin"}])) }),
            )
            .route(
                resume::UPLOAD_PATH,
                post(|_body: Bytes| async { Json(json!({"info": "Stored without a name"})) }),
            )
    }

    async fn app() -> App {
        let config = Config {
            api_url: spawn_backend(backend()).await,
            request_timeout: Duration::from_secs(5),
            ..Config::default()
        };
        App::new(config, Arc::new(MemoryStore::new())).unwrap()
    }

    #[tokio::test]
    async fn test_jobs_open_only_and_pagination() {
        let app = app().await;
        let out = app
            .run(Command::Jobs {
                page: 2,
                search: None,
                open_only: true,
            })
            .await
            .unwrap();
        assert!(out.contains("Rust Engineer"));
        assert!(!out.contains("Go Engineer"));
        assert!(out.ends_with("Page 2 of 3  [Previous] [Next]"));
    }

    #[tokio::test]
    async fn test_jobs_search() {
        let app = app().await;
        let out = app
            .run(Command::Jobs {
                page: 3,
                search: Some("go".into()),
                open_only: false,
            })
            .await
            .unwrap();
        assert!(out.contains("Go Engineer"));
        assert!(!out.contains("Rust Engineer"));
        assert!(out.ends_with("[x Next]"));
    }

    #[tokio::test]
    async fn test_admin_commands_need_login() {
        let app = app().await;
        let err = app
            .run(Command::Admins { search: None })
            .await
            .unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::Unauthorized);
        assert_eq!(redirect_for(&err), Some(Route::AdminLogin));

        app.api().session().set("tok", Duration::from_secs(60));
        let out = app.run(Command::Admins { search: None }).await.unwrap();
        assert!(out.contains("root"));
    }

    #[tokio::test]
    async fn test_apply_without_resume_is_validation_error() {
        let app = app().await;
        let err = app.run(Command::Apply { job_id: 1 }).await.unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_submit_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resume.json");
        std::fs::write(&path, "not json").unwrap();
        let app = app().await;
        let err = app.run(Command::Submit { file: path }).await.unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_tracked_passes_outcome_through() {
        assert_eq!(tracked(|| async { Ok(5) }).await.unwrap(), 5);
        let err = tracked(|| async { Err::<(), _>(ApiError::not_found("gone")) })
            .await
            .unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_status_reports_session_and_candidate() {
        let app = app().await;
        let out = app.run(Command::Status).await.unwrap();
        assert!(out.starts_with(&format!("API: {}", app.api().base_url())));
        assert!(out.contains("Admin: not logged in"));
        assert!(out.ends_with("Candidate: none"));

        app.api().session().set("tok", Duration::from_secs(60));
        app.store.set(crate::storage::CANDIDATE_ID_KEY, "42");
        let out = app.run(Command::Status).await.unwrap();
        assert!(out.contains("Admin: logged in until "));
        assert!(out.ends_with("Candidate: 42"));
    }

    #[tokio::test]
    async fn test_upload_reply_without_file_name_keeps_message() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cv.pdf");
        std::fs::write(&path, b"%PDF-1.4").unwrap();
        let app = app().await;

        let err = app.run(Command::Upload { file: path }).await.unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::Validation);
        assert!(err.user_message().contains("Stored without a name"));
    }
}
