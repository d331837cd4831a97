//! The persisted record of one finished job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum length of a derived job title.
pub const MAX_TITLE_LEN: usize = 80;

/// Terminal status of one launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobOutcome {
    /// The remote command ran to completion with exit status zero.
    Succeeded,
    /// The remote command completed, but with a non-zero exit status.
    ExitedNonZero(i32),
    /// The launch sequence failed before the remote command completed.
    Failed,
}

impl JobOutcome {
    /// Whether the job is considered successful.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

/// Record of one finished job, handed to the job store at run end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub title: String,
    pub script: String,
    pub transcript: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcome: JobOutcome,
}

impl JobRecord {
    /// Build a record, deriving the title from the script body.
    #[must_use]
    pub fn new(
        script: &str,
        transcript: String,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        outcome: JobOutcome,
    ) -> Self {
        Self {
            title: derive_title(script),
            script: script.to_string(),
            transcript,
            started_at,
            finished_at,
            outcome,
        }
    }
}

/// First non-blank line of the script, clipped to [`MAX_TITLE_LEN`].
fn derive_title(script: &str) -> String {
    let first_line = script
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("(empty script)");
    if first_line.len() > MAX_TITLE_LEN {
        first_line.chars().take(MAX_TITLE_LEN).collect()
    } else {
        first_line.to_string()
    }
}
