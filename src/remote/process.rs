//! Spawning and supervision of one remote command.
//!
//! A `RemoteProcess` wraps a single spawned command (usually an ssh
//! invocation) and exposes its output either as a lazy line stream, so that
//! events can be published while the remote job is still running, or as a
//! fully captured buffer for short helper commands.

use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};

use crate::remote::RemoteError;

/// Lifecycle of one remote process handle. A handle is never reused across
/// runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunPhase {
    /// The process exists but its output has not been consumed yet.
    #[default]
    Spawned,
    /// The output stream has been handed to a consumer.
    Streaming,
    /// The process exited with the given status.
    Exited(i32),
    /// Reading or writing the process pipes failed.
    CommunicationFailed,
}

/// Captured output of a short-lived remote command.
#[derive(Debug, Clone)]
pub struct CapturedOutput {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

/// A single spawned remote command and its pipes.
#[derive(Debug)]
pub struct RemoteProcess {
    child: Child,
    args: Vec<String>,
    phase: RunPhase,
}

impl RemoteProcess {
    /// Spawn a command whose stdout will be consumed line by line.
    ///
    /// stderr is inherited (remote invocations that need it merged redirect
    /// with `2>&1` on the far side) and stdin is closed.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::Launch` with the attempted argument vector if
    /// the process cannot be spawned.
    pub fn spawn_streaming(args: &[String]) -> Result<Self, RemoteError> {
        Self::spawn(args, Stdio::null(), Stdio::inherit())
    }

    /// Spawn a command whose stdout and stderr are captured in full,
    /// optionally with a writable stdin pipe.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::Launch` if the process cannot be spawned.
    pub fn spawn_captured(args: &[String], pipe_stdin: bool) -> Result<Self, RemoteError> {
        let stdin = if pipe_stdin {
            Stdio::piped()
        } else {
            Stdio::null()
        };
        Self::spawn(args, stdin, Stdio::piped())
    }

    fn spawn(args: &[String], stdin: Stdio, stderr: Stdio) -> Result<Self, RemoteError> {
        let (program, rest) = args.split_first().ok_or(RemoteError::EmptyCommand)?;

        tracing::debug!(?args, "spawning remote command");
        let child = Command::new(program)
            .args(rest)
            .stdin(stdin)
            .stdout(Stdio::piped())
            .stderr(stderr)
            .spawn()
            .map_err(|source| RemoteError::Launch {
                args: args.to_vec(),
                source,
            })?;

        Ok(Self {
            child,
            args: args.to_vec(),
            phase: RunPhase::Spawned,
        })
    }

    /// The argument vector this process was spawned with.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    fn transition(&mut self, next: RunPhase) {
        tracing::debug!(from = ?self.phase, to = ?next, "remote process transition");
        self.phase = next;
    }

    /// Write `content` to the process stdin and close the pipe.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::NoStdin` if stdin was not piped, or
    /// `RemoteError::Communication` on a broken pipe.
    pub async fn write_stdin(&mut self, content: &[u8]) -> Result<(), RemoteError> {
        let mut stdin = self.child.stdin.take().ok_or(RemoteError::NoStdin)?;
        let result = async {
            stdin.write_all(content).await?;
            stdin.shutdown().await?;
            Ok(())
        }
        .await;
        if result.is_err() {
            self.transition(RunPhase::CommunicationFailed);
        }
        // Dropping stdin closes the pipe so the remote `cat` sees EOF.
        drop(stdin);
        result
    }

    /// Expose stdout as a lazy stream of lines.
    ///
    /// Lines are yielded as they arrive, which is what allows progress and
    /// error events to be published while the remote job is still running.
    /// The stream can only be taken once; it ends at EOF, after which
    /// [`wait`](Self::wait) returns the exit status.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::NoStdout` if stdout was already taken.
    pub fn lines(
        &mut self,
    ) -> Result<impl futures_core::Stream<Item = Result<String, RemoteError>>, RemoteError> {
        let stdout = self.child.stdout.take().ok_or(RemoteError::NoStdout)?;
        self.transition(RunPhase::Streaming);
        let reader = BufReader::new(stdout).lines();
        Ok(futures_util::stream::unfold(reader, |mut reader| async {
            match reader.next_line().await {
                Ok(Some(line)) => Some((Ok(line), reader)),
                Ok(None) => None,
                Err(e) => Some((Err(RemoteError::Communication(e)), reader)),
            }
        }))
    }

    /// Block until the process exits and return its integer exit status.
    ///
    /// A non-zero status is returned as data, not raised as an error; the
    /// caller decides what it means for the run.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::Communication` if waiting on the process fails.
    pub async fn wait(&mut self) -> Result<i32, RemoteError> {
        let status = match self.child.wait().await {
            Ok(status) => status,
            Err(e) => {
                self.transition(RunPhase::CommunicationFailed);
                return Err(RemoteError::Communication(e));
            }
        };
        let code = status.code().unwrap_or(-1);
        self.transition(RunPhase::Exited(code));
        Ok(code)
    }

    /// Feed optional stdin content, then collect stdout, stderr and the exit
    /// status. For short helper commands only; streaming runs use
    /// [`lines`](Self::lines).
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::Communication` if the pipes fail mid-flight.
    pub async fn communicate(mut self, input: Option<&[u8]>) -> Result<CapturedOutput, RemoteError> {
        if let Some(content) = input {
            self.write_stdin(content).await?;
        }
        let output = self.child.wait_with_output().await?;
        let status = output.status.code().unwrap_or(-1);
        tracing::debug!(status, "remote command collected");
        Ok(CapturedOutput {
            status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
