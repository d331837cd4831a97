//! Classification outcomes for remote output lines.
//!
//! Every line read from the remote process is classified into one or more
//! `LineEvent`s. The sideband channel is authenticated with a per-run
//! `RunToken` so that output from a stale or unrelated remote process cannot
//! inject events into the current run.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-run authentication cookie for the sideband channel.
///
/// Minted once per job launch and threaded into the line classifier; never
/// stored globally, so concurrent runs cannot cross-contaminate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunToken(String);

impl RunToken {
    /// Mint a fresh token for a new run.
    #[must_use]
    pub fn mint() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// The token value as it appears in sideband documents.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RunToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RunToken {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RunToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// One classified line of remote output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEvent {
    /// Ordinary log noise, passed through unchanged.
    Plain(String),
    /// The cluster application master has started.
    MasterLaunched(String),
    /// Scheduler progress report extracted from a task-finished line.
    Progress {
        done: u64,
        total: u64,
        line: String,
    },
    /// Error reported by the remote script over the sideband channel.
    ErrorLine(String),
    /// Output file reported by the remote script over the sideband channel.
    OutputFile {
        filename: String,
        line: String,
    },
    /// A sideband document carried a cookie that does not belong to this run.
    CookieMismatch {
        expected: String,
        got: String,
    },
    /// A framed sideband line could not be decoded.
    Malformed {
        reason: String,
    },
    /// A well-formed, authenticated sideband document of an unknown kind.
    UnknownMessage(String),
}

impl LineEvent {
    /// Whether this event reports a problem with the sideband channel itself.
    #[must_use]
    pub fn is_diagnostic(&self) -> bool {
        matches!(
            self,
            Self::CookieMismatch { .. } | Self::Malformed { .. } | Self::UnknownMessage(_)
        )
    }
}
