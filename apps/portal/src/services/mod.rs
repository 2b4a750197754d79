//! One typed function per backend operation, plus `PageSource` adapters for
//! the list views. Everything goes through `ApiClient`.

pub mod admins;
pub mod auth;
pub mod candidates;
pub mod interview;
pub mod jobs;
pub mod resume;

pub use admins::AdminSource;
pub use candidates::{CandidateSource, DashboardStats, SkillCount};
pub use jobs::JobSource;
