//! Command-line surface.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::api::JoinStatus;

#[derive(Debug, Parser)]
#[command(name = "teacher-panel", version, about = "Teacher panel for the UzStudents platform")]
pub struct Cli {
    /// Path to config file (default: ~/.config/teacher-panel/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the API base URL
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Login used when a command needs a session
    #[arg(long, global = true, env = "TEACHER_LOGIN")]
    pub login: Option<String>,

    /// Password used when a command needs a session
    #[arg(long, global = true, env = "TEACHER_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Log to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Tab {
    Pending,
    Approved,
}

impl From<Tab> for JoinStatus {
    fn from(tab: Tab) -> Self {
        match tab {
            Tab::Pending => JoinStatus::Pending,
            Tab::Approved => JoinStatus::Approved,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check credentials and show who they belong to
    Login,
    /// End the current session
    Logout,
    /// Show the signed-in teacher
    Me,
    /// Totals across all groups
    Dashboard,
    /// List groups
    Groups {
        /// Only groups whose name or code contains this text
        #[arg(long)]
        filter: Option<String>,
    },
    /// Create a group
    CreateGroup { name: String },
    /// Show a group and its join requests
    Group {
        id: i64,
        #[arg(long, value_enum, default_value_t = Tab::Pending)]
        tab: Tab,
        /// Copy the join code to the clipboard
        #[arg(long)]
        copy_code: bool,
    },
    /// Issue a new join code
    RotateCode { group_id: i64 },
    /// Approve a join request
    Approve { group_id: i64, student_id: i64 },
    /// Deny a join request
    Deny { group_id: i64, student_id: i64 },
    /// List a group's assignments
    Assignments { group_id: i64 },
    /// Ask the AI for a rubric and max score
    Analyze {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Create an assignment with its file
    CreateAssignment {
        group_id: i64,
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        file: Option<PathBuf>,
        /// Upload the file first, then create with the AI analysis attached
        #[arg(long)]
        two_step: bool,
    },
    /// Upload a file to temporary storage
    Upload { file: PathBuf },
    /// Delete an assignment
    DeleteAssignment { assignment_id: i64 },
    /// List submissions for an assignment
    Submissions { assignment_id: i64 },
    /// Let the AI grade a submission
    Grade {
        assignment_id: i64,
        submission_id: i64,
    },
    /// Set the teacher's own score (omit --score to clear it)
    Override {
        assignment_id: i64,
        submission_id: i64,
        #[arg(long)]
        score: Option<f64>,
        #[arg(long)]
        feedback: Option<String>,
    },
    /// Keep join requests (and optionally submissions) refreshed until Ctrl-C
    Watch {
        group_id: i64,
        #[arg(long)]
        assignment: Option<i64>,
    },
}

impl Command {
    /// The protected route this command corresponds to, or `None` for
    /// commands that work without a session.
    pub fn route(&self) -> Option<String> {
        let route = match self {
            Command::Login => return None,
            Command::Logout | Command::Me | Command::Dashboard => "/".to_string(),
            Command::Groups { .. } | Command::CreateGroup { .. } => "/groups".to_string(),
            Command::Group { id, .. } => format!("/groups/{}", id),
            Command::RotateCode { group_id }
            | Command::Approve { group_id, .. }
            | Command::Deny { group_id, .. }
            | Command::Watch { group_id, .. } => format!("/groups/{}", group_id),
            Command::Assignments { group_id } | Command::CreateAssignment { group_id, .. } => {
                format!("/groups/{}/assignments", group_id)
            }
            Command::Analyze { .. } | Command::Upload { .. } => "/assignments".to_string(),
            Command::DeleteAssignment { assignment_id }
            | Command::Submissions { assignment_id }
            | Command::Grade { assignment_id, .. }
            | Command::Override { assignment_id, .. } => {
                format!("/assignments/{}", assignment_id)
            }
        };
        Some(route)
    }
}
