//! Errors raised while driving remote commands.

/// Error type for remote process operations.
#[derive(thiserror::Error, Debug)]
pub enum RemoteError {
    /// The command could not be spawned at all; the attempted argument
    /// vector is preserved for diagnostics.
    #[error("failed to spawn remote command {args:?}: {source}")]
    Launch {
        args: Vec<String>,
        source: std::io::Error,
    },
    /// Reading from or writing to the spawned process failed mid-flight.
    #[error("remote I/O failed: {0}")]
    Communication(#[from] std::io::Error),
    /// The argument vector was empty.
    #[error("remote command argument vector is empty")]
    EmptyCommand,
    /// Process stdout was already taken or never piped.
    #[error("remote process stdout not available")]
    NoStdout,
    /// Process stdin was already taken or never piped.
    #[error("remote process stdin not available")]
    NoStdin,
    /// A captured helper command (mktemp, upload) exited non-zero.
    #[error("remote command exited with status {status}")]
    CommandFailed { status: i32 },
    /// The remote mktemp produced no usable path.
    #[error("remote mktemp returned an empty path")]
    EmptyTempPath,
}
