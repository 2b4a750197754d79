use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::view::{Listable, SortValue};

fn default_open() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub job_id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub location: Option<String>,
    pub salary: Option<String>,
    pub date_posted: Option<NaiveDateTime>,
    #[serde(default = "default_open")]
    pub is_opened: bool,
}

/// `GET /api/v1/jobs/?page=` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPage {
    pub jobs: Vec<Job>,
    #[serde(default)]
    pub total_jobs: u32,
    #[serde(default)]
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

/// `POST /api/v1/jobs/apply/:job_id` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationReceipt {
    #[serde(default)]
    pub application_id: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub match_score: Option<f64>,
    #[serde(default)]
    pub interview_link: Option<String>,
    #[serde(default)]
    pub explanation: Option<String>,
}

impl Listable for Job {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.title.as_str()]
    }

    fn sort_value(&self, key: &str) -> Option<SortValue> {
        let value = match key {
            "job_id" => SortValue::Int(self.job_id),
            "title" => self.title.as_str().into(),
            "location" => self.location.as_deref().into(),
            "salary" => self.salary.as_deref().into(),
            // ISO-8601 strings order chronologically.
            "date_posted" => SortValue::Text(
                self.date_posted
                    .map(|d| d.format("%Y-%m-%dT%H:%M:%S").to_string())
                    .unwrap_or_default(),
            ),
            "is_opened" => SortValue::Bool(self.is_opened),
            _ => return None,
        };
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_page_decodes_backend_shape() {
        let raw = r#"{
            "jobs": [{
                "job_id": 3, "title": "Backend Engineer", "description": "Rust",
                "location": null, "salary": "100k",
                "date_posted": "2024-10-01T09:30:00.123456", "is_opened": false
            }],
            "total_jobs": 31, "page": 2, "page_size": 15, "total_pages": 3
        }"#;
        let page: JobPage = serde_json::from_str(raw).unwrap();
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.jobs[0].title, "Backend Engineer");
        assert!(!page.jobs[0].is_opened);
        assert!(page.jobs[0].date_posted.is_some());
    }

    #[test]
    fn test_job_defaults_to_open() {
        let job: Job = serde_json::from_str(
            r#"{"job_id": 1, "title": "x", "location": null, "salary": null, "date_posted": null}"#,
        )
        .unwrap();
        assert!(job.is_opened);
    }
}
