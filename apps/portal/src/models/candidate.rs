use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{id_as_string, null_as_default};
use crate::view::{FilterValue, Listable, SortValue};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(default, deserialize_with = "null_as_default")]
    pub email_address: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub phone_number: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub address_line_1: Option<String>,
    pub address_line_2: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub area: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub province: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub country: String,
    pub postal_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    pub job_title: String,
    pub company_name: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Education {
    pub degree: String,
    pub institution: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Record of a finished voice interview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interview {
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub duration: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub transcript: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub summary: String,
    pub recording_url: Option<String>,
    pub video_recording_url: Option<String>,
    pub success_evaluation: Option<f64>,
}

/// A row of the admin dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub candidate_id: i64,
    pub name: String,
    pub interview_token: Option<String>,
    pub token_expiry: Option<String>,
    #[serde(default)]
    pub is_interviewed: bool,
    #[serde(default)]
    pub is_valid: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub contact: Vec<Contact>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub address: Vec<Address>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub skills: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub projects: Vec<Project>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub experiences: Vec<Experience>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub education: Vec<Education>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub interviews: Vec<Interview>,
}

impl Candidate {
    pub fn primary_email(&self) -> Option<&str> {
        self.contact.first().map(|c| c.email_address.as_str())
    }
}

impl Listable for Candidate {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.name.as_str()];
        fields.extend(self.primary_email());
        fields
    }

    fn sort_value(&self, key: &str) -> Option<SortValue> {
        let value = match key {
            "candidate_id" => SortValue::Int(self.candidate_id),
            "name" => self.name.as_str().into(),
            "email" => self.primary_email().into(),
            "is_interviewed" => SortValue::Bool(self.is_interviewed),
            "is_valid" => SortValue::Bool(self.is_valid),
            "token_expiry" => self.token_expiry.as_deref().into(),
            _ => return None,
        };
        Some(value)
    }
}

/// `GET /api/v1/admin-dashboard[/filters]` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateList {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

/// Candidate data returned when an interview link is validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateProfile {
    #[serde(deserialize_with = "id_as_string")]
    pub candidate_id: String,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub contact: Vec<Contact>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub address: Vec<Address>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub skills: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub projects: Vec<Project>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub experiences: Vec<Experience>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub education: Vec<Education>,
    pub avatar: Option<String>,
}

/// Server-side filters of the admin dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateFilters {
    pub skill: Option<String>,
    pub interviewed: Option<bool>,
    pub non_interviewed_expired: Option<bool>,
    pub pending_interviews: Option<bool>,
}

impl CandidateFilters {
    pub fn is_empty(&self) -> bool {
        self.to_params().is_empty()
    }

    /// Query parameters in the order the backend documents them.
    /// Blank skills are dropped.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(skill) = self.skill.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            params.push(("skill", skill.to_string()));
        }
        if let Some(v) = self.interviewed {
            params.push(("interviewed", v.to_string()));
        }
        if let Some(v) = self.non_interviewed_expired {
            params.push(("non_interviewed_expired", v.to_string()));
        }
        if let Some(v) = self.pending_interviews {
            params.push(("pending_interviews", v.to_string()));
        }
        params
    }

    pub fn to_filters(&self) -> BTreeMap<String, FilterValue> {
        let mut filters = BTreeMap::new();
        if let Some(skill) = self.skill.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            filters.insert("skill".to_string(), FilterValue::Text(skill.to_string()));
        }
        let flags = [
            ("interviewed", self.interviewed),
            ("non_interviewed_expired", self.non_interviewed_expired),
            ("pending_interviews", self.pending_interviews),
        ];
        for (key, value) in flags {
            if let Some(v) = value {
                filters.insert(key.to_string(), FilterValue::Flag(v));
            }
        }
        filters
    }

    pub fn from_filters(filters: &BTreeMap<String, FilterValue>) -> Self {
        let flag = |key: &str| match filters.get(key) {
            Some(FilterValue::Flag(b)) => Some(*b),
            Some(FilterValue::Text(t)) => t.parse().ok(),
            None => None,
        };
        Self {
            skill: match filters.get("skill") {
                Some(FilterValue::Text(s)) => Some(s.clone()),
                _ => None,
            },
            interviewed: flag("interviewed"),
            non_interviewed_expired: flag("non_interviewed_expired"),
            pending_interviews: flag("pending_interviews"),
        }
    }
}
