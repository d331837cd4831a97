//! Wire flags attached to every published message.
//!
//! Field names serialize in camelCase because that is what the subscribing
//! web tier keys on; a flag that is unset is omitted from the wire entirely.

use serde::{Deserialize, Serialize};

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(value: &bool) -> bool {
    !*value
}

/// Flags describing one published message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LineFlags {
    /// The line came from the remote process output (as opposed to launcher
    /// bookkeeping).
    #[serde(skip_serializing_if = "is_false")]
    pub line_is_from_remote_output: bool,
    /// The cluster application master was observed starting.
    #[serde(skip_serializing_if = "is_false")]
    pub app_master_launched: bool,
    /// The line carried a progress report.
    #[serde(skip_serializing_if = "is_false")]
    pub progress_update: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_done: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_total: Option<u64>,
    /// The line reports an error.
    #[serde(skip_serializing_if = "is_false")]
    pub error_line: bool,
    /// Filename reported by the remote script.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_filename_reported: Option<String>,
    /// First line of remote output was received.
    #[serde(skip_serializing_if = "is_false")]
    pub spark_started: bool,
    /// A job was accepted for execution.
    #[serde(skip_serializing_if = "is_false")]
    pub job_submitted: bool,
    /// A worker picked the job up.
    #[serde(skip_serializing_if = "is_false")]
    pub received_by_worker: bool,
    /// The remote command ran to completion.
    #[serde(skip_serializing_if = "is_false")]
    pub job_finished_ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_status: Option<i32>,
    /// The launch sequence failed before completing.
    #[serde(skip_serializing_if = "is_false")]
    pub job_finished_with_error: bool,
    /// Identifier assigned to the saved job record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_job_id: Option<i64>,
}

impl LineFlags {
    /// Flags for a line read from the remote process output.
    #[must_use]
    pub fn remote() -> Self {
        Self {
            line_is_from_remote_output: true,
            ..Self::default()
        }
    }
}

/// One message on the broadcast channel: the line plus its flags, flattened
/// into a single JSON object on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub line: String,
    #[serde(flatten)]
    pub flags: LineFlags,
}
