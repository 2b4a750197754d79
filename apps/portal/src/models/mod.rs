pub mod admin;
pub mod candidate;
pub mod job;
pub mod resume;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub use admin::{Admin, AdminForm};
pub use candidate::{
    Address, Candidate, CandidateFilters, CandidateList, CandidateProfile, Contact, Education,
    Experience, Interview, Project,
};
pub use job::{ApplicationReceipt, Job, JobPage};
pub use resume::{ResumeData, ResumeEducation, ResumeExperience, ResumeProject, SubmitReceipt};

/// Ids come back as numbers from some endpoints and strings from others.
pub(crate) fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or number id, got {other}"
        ))),
    }
}

/// `null` decodes to the type's default instead of failing.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
