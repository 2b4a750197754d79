//! Command-line interface definition using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Recruiting portal client: jobs, resumes, admin dashboard and interviews
#[derive(Parser, Debug)]
#[command(name = "portal")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Backend base URL
    #[arg(long, env = "PORTAL_API_URL")]
    pub api_url: Option<String>,

    /// Where the session and candidate id are kept between runs
    #[arg(long, env = "PORTAL_STATE_FILE")]
    pub state_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Log in as an admin
    Login {
        #[arg(short, long)]
        username: String,

        #[arg(short, long, env = "PORTAL_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Drop the stored admin session
    Logout,

    /// Show the backend URL, admin session and stored candidate
    Status,

    /// List job openings
    Jobs {
        #[arg(short, long, default_value_t = 1)]
        page: u32,

        /// Case-insensitive title filter over the fetched page
        #[arg(short, long)]
        search: Option<String>,

        /// Hide closed openings
        #[arg(long)]
        open_only: bool,
    },

    /// Show one job
    Job { id: i64 },

    /// Apply to a job as the candidate of the last submitted resume
    Apply { job_id: i64 },

    /// Upload a resume (PDF or DOCX) and show what was parsed from it
    Upload { file: PathBuf },

    /// Submit a reviewed resume (JSON file) and register as a candidate
    Submit { file: PathBuf },

    /// Admin dashboard candidate list
    Candidates {
        /// Case-insensitive match on name or email
        #[arg(short, long)]
        search: Option<String>,

        /// Column to sort by (candidate_id, name, email, is_interviewed, ...)
        #[arg(long)]
        sort: Option<String>,

        /// Sort descending
        #[arg(long, requires = "sort")]
        desc: bool,

        #[arg(long)]
        skill: Option<String>,

        #[arg(long)]
        interviewed: Option<bool>,

        /// Not interviewed and the interview link has expired
        #[arg(long)]
        non_interviewed_expired: bool,

        /// Interview link sent and still valid
        #[arg(long)]
        pending_interviews: bool,
    },

    /// Dashboard summary: totals and top skills
    Stats {
        #[arg(long, default_value_t = 10)]
        top: usize,
    },

    /// List admin accounts
    Admins {
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Create an admin account
    CreateAdmin {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        password: String,

        /// Defaults to `--password`
        #[arg(long)]
        retype_password: Option<String>,
    },

    /// Change an admin's username and password
    UpdateAdmin {
        id: i64,

        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        password: String,

        #[arg(long)]
        retype_password: Option<String>,
    },

    /// Delete an admin account
    DeleteAdmin { id: i64 },

    /// Check an interview link and show its candidate
    ValidateLink {
        id: String,

        /// Also print the voice assistant overrides for this candidate
        #[arg(long)]
        overrides: bool,
    },

    /// Mark an interview as finished
    EndInterview { token: String },
}
