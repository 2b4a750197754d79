use std::collections::HashMap;

use async_trait::async_trait;
use serde::Serialize;

use crate::api_client::{ApiClient, ApiRequest};
use crate::errors::ApiResult;
use crate::models::{Candidate, CandidateFilters, CandidateList};
use crate::view::{ListQuery, ListResult, PageSource};

pub const DASHBOARD_PATH: &str = "/api/v1/admin-dashboard";
pub const DASHBOARD_FILTERS_PATH: &str = "/api/v1/admin-dashboard/filters";
pub const TOP_SKILLS: usize = 10;

/// Fetches dashboard candidates. The plain endpoint is used when no filter
/// is set, the `/filters` endpoint otherwise.
pub async fn list_candidates(
    api: &ApiClient,
    filters: &CandidateFilters,
) -> ApiResult<Vec<Candidate>> {
    let params = filters.to_params();
    let mut req = if params.is_empty() {
        ApiRequest::get(DASHBOARD_PATH)
    } else {
        ApiRequest::get(DASHBOARD_FILTERS_PATH)
    }
    .auth();
    for (key, value) in params {
        req = req.query(key, value);
    }
    let list: CandidateList = api.send_json(req).await?;
    Ok(list.candidates)
}

/// The dashboard returns every match at once, so it is served as one page.
#[derive(Clone)]
pub struct CandidateSource {
    api: ApiClient,
}

impl CandidateSource {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl PageSource<Candidate> for CandidateSource {
    async fn fetch_page(&self, query: &ListQuery) -> ApiResult<ListResult<Candidate>> {
        let filters = CandidateFilters::from_filters(&query.filters);
        let candidates = list_candidates(&self.api, &filters).await?;
        Ok(ListResult::single_page(candidates))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkillCount {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total: usize,
    pub interviewed: usize,
    pub not_interviewed: usize,
    pub top_skills: Vec<SkillCount>,
}

/// Summary charts of the dashboard, over the candidates currently loaded.
/// Skills are ranked by frequency, ties broken by name.
pub fn dashboard_stats(candidates: &[Candidate], top_n: usize) -> DashboardStats {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for skill in candidates.iter().flat_map(|c| c.skills.iter()) {
        *counts.entry(skill.as_str()).or_default() += 1;
    }
    let mut top_skills: Vec<SkillCount> = counts
        .into_iter()
        .map(|(name, count)| SkillCount {
            name: name.to_string(),
            count,
        })
        .collect();
    top_skills.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    top_skills.truncate(top_n);

    let interviewed = candidates.iter().filter(|c| c.is_interviewed).count();
    DashboardStats {
        total: candidates.len(),
        interviewed,
        not_interviewed: candidates.len() - interviewed,
        top_skills,
    }
}
