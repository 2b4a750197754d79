use serde::Serialize;

use crate::models::CandidateProfile;

pub const CANDIDATE_POSITION: &str = "Software Engineer";
pub const MODEL_PROVIDER: &str = "openai";
pub const MODEL_NAME: &str = "gpt-4o";

/// System prompt for the interviewer. `{{..}}` placeholders are filled by the
/// assistant from `variableValues`.
pub const INTERVIEWER_PROMPT: &str = "\
    You are Elsa, a friendly recruiter. Conduct a natural, conversational interview \
    based on {{candidateName}}'s resume (skills: {{candidateSkills}}, projects: \
    {{candidateProjects}}, experiences: {{candidateExperiences}}, education: \
    {{candidateEducation}}) for the {{candidatePosition}} position. \
    Focus on technical skills and impactful experiences, but keep it casual and engaging.\n\
    Stick strictly to the information in the resume. Do not invent or assume details. \
    If the candidate claims skills or experience not listed, politely remind them that \
    you can only discuss their submitted resume. Ask for clarification when unsure.\n\
    Flow: warm introduction, technical chat about key skills, one project story, \
    a question about their experience, then close by thanking them and ending the call.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableValues {
    pub candidate_id: String,
    pub candidate_name: String,
    pub candidate_position: String,
    pub candidate_projects: String,
    pub candidate_skills: String,
    pub candidate_education: String,
    pub candidate_contact: String,
    pub candidate_experiences: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelOverride {
    pub provider: String,
    pub model: String,
    pub messages: Vec<PromptMessage>,
}

/// Per-call configuration handed to the voice assistant on `start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantOverrides {
    pub variable_values: VariableValues,
    pub model: ModelOverride,
    pub end_call_function_enabled: bool,
}

impl AssistantOverrides {
    pub fn for_candidate(profile: &CandidateProfile) -> Self {
        Self {
            variable_values: variable_values(profile),
            model: ModelOverride {
                provider: MODEL_PROVIDER.to_string(),
                model: MODEL_NAME.to_string(),
                messages: vec![PromptMessage {
                    role: "system".to_string(),
                    content: INTERVIEWER_PROMPT.to_string(),
                }],
            },
            end_call_function_enabled: true,
        }
    }
}

fn or_fallback(lines: Vec<String>, sep: &str, fallback: &str) -> String {
    if lines.is_empty() {
        fallback.to_string()
    } else {
        lines.join(sep)
    }
}

fn period(start: Option<&str>, end: Option<&str>) -> String {
    format!("({} - {})", start.unwrap_or_default(), end.unwrap_or_default())
}

pub fn variable_values(p: &CandidateProfile) -> VariableValues {
    let projects = p
        .projects
        .iter()
        .map(|pr| format!("Project: {}, Description: {}", pr.name, pr.description))
        .collect();
    let education = p
        .education
        .iter()
        .map(|e| {
            format!(
                "{} from {} {}",
                e.degree,
                e.institution,
                period(e.start_date.as_deref(), e.end_date.as_deref())
            )
        })
        .collect();
    let experiences = p
        .experiences
        .iter()
        .map(|e| {
            format!(
                "{} at {} {}",
                e.job_title,
                e.company_name.as_deref().unwrap_or_default(),
                period(e.start_date.as_deref(), e.end_date.as_deref())
            )
        })
        .collect();
    let contact = p
        .contact
        .first()
        .map(|c| format!("Email: {}, Phone: {}", c.email_address, c.phone_number))
        .unwrap_or_else(|| "No contact info".to_string());

    VariableValues {
        candidate_id: p.candidate_id.clone(),
        candidate_name: p.name.clone(),
        candidate_position: CANDIDATE_POSITION.to_string(),
        candidate_projects: or_fallback(projects, "\n", "No projects listed"),
        candidate_skills: or_fallback(p.skills.clone(), ", ", "No skills listed"),
        candidate_education: or_fallback(education, "\n", "No education listed"),
        candidate_contact: contact,
        candidate_experiences: or_fallback(experiences, "\n", "No experiences listed"),
    }
}
