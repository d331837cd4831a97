//! The remote operations layered on the process primitive: create a
//! temporary file, upload content, and execute a command while streaming its
//! classified output.

use futures_util::StreamExt;

use crate::protocol::LineClassifier;
use crate::publish::{LineFlags, Publisher};
use crate::remote::{CapturedOutput, RemoteError, RemoteProcess};

/// Executes commands on the remote host through the externally configured
/// base argument prefix (e.g. `["ssh", "user@host"]`).
///
/// The prefix is treated as opaque: it is prepended to every command and
/// never parsed.
#[derive(Debug, Clone)]
pub struct RemoteShell {
    base_args: Vec<String>,
}

impl RemoteShell {
    /// Create a shell with the given base argument prefix.
    #[must_use]
    pub fn new(base_args: Vec<String>) -> Self {
        Self { base_args }
    }

    fn command(&self, tail: &[String]) -> Vec<String> {
        let mut args = self.base_args.clone();
        args.extend_from_slice(tail);
        args
    }

    /// Create a temporary file on the remote host and return its path.
    ///
    /// Runs a `mktemp`-equivalent and takes the first line of its stdout as
    /// the path.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::EmptyTempPath` if mktemp printed nothing, or
    /// any spawn/exit-status error from the underlying command.
    pub async fn create_temp_file(
        &self,
        template: &str,
        suffix: &str,
        publisher: &mut Publisher,
    ) -> Result<String, RemoteError> {
        publisher.log_and_publish(
            "Creating temporary file on the remote host",
            LineFlags::default(),
        );

        let args = self.command(&[
            "mktemp".to_string(),
            "-t".to_string(),
            template.to_string(),
            format!("--suffix={suffix}"),
        ]);
        let output = self.communicate(&args, None, publisher).await?;

        let path = output
            .stdout
            .lines()
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();
        if path.is_empty() {
            publisher.publish(
                "ERROR: mktemp failed: temporary file name is empty",
                LineFlags::default(),
            );
            return Err(RemoteError::EmptyTempPath);
        }

        publisher.log_and_publish(format!("Temporary file: {path}"), LineFlags::default());
        Ok(path)
    }

    /// Upload `content` to `path` on the remote host.
    ///
    /// The far side runs `cat > path`, so the content travels over stdin and
    /// no quoting of the payload is needed.
    ///
    /// # Errors
    ///
    /// Returns a spawn, pipe or exit-status error from the underlying
    /// command.
    pub async fn upload(
        &self,
        content: &[u8],
        path: &str,
        publisher: &mut Publisher,
    ) -> Result<(), RemoteError> {
        publisher.log_and_publish("Sending script to the remote host", LineFlags::default());

        let target = shell_escape::unix::escape(path.into());
        let args = self.command(&[format!("cat > {target}")]);
        self.communicate(&args, Some(content), publisher).await?;

        publisher.log_and_publish("Script contents were sent successfully", LineFlags::default());
        Ok(())
    }

    /// Execute a remote command and stream its classified output.
    ///
    /// Each stdout line is trimmed, logged, classified through `classifier`
    /// and published while the command is still running. At EOF the process
    /// is awaited and its exit status published and returned; a non-zero
    /// status is not an error here, the caller decides what it means.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::Launch` if the command cannot be spawned, or
    /// `RemoteError::Communication` if the output pipe fails mid-stream.
    pub async fn run_streaming(
        &self,
        tail: &[String],
        publisher: &mut Publisher,
        classifier: &LineClassifier,
    ) -> Result<i32, RemoteError> {
        let args = self.command(tail);
        publisher.log_and_publish(format!("Spawning remote command {args:?}"), LineFlags::default());

        let mut process = match RemoteProcess::spawn_streaming(&args) {
            Ok(process) => process,
            Err(e) => {
                publisher.publish(
                    &format!("ERROR: failed to spawn remote command: {e}"),
                    LineFlags::default(),
                );
                return Err(e);
            }
        };

        let lines = process.lines()?;
        tokio::pin!(lines);

        let mut first_line = true;
        while let Some(item) = lines.next().await {
            let line = item?;
            let line = line.trim_end();
            if line.trim().is_empty() {
                continue;
            }

            tracing::info!("remote> {line}");

            if first_line {
                first_line = false;
                publisher.log_and_publish(
                    "The first line of remote output was received",
                    LineFlags {
                        spark_started: true,
                        ..LineFlags::default()
                    },
                );
            }

            for event in classifier.classify(line) {
                publisher.publish_event(&event);
            }
        }

        publisher.log_and_publish("Waiting for the remote process to exit", LineFlags::default());
        let status = process.wait().await?;
        publisher.set_exit_status(status);
        publisher.log_and_publish(
            format!("Remote job ended with exit status {status}"),
            LineFlags {
                job_finished_ok: true,
                exit_status: Some(status),
                ..LineFlags::default()
            },
        );

        Ok(status)
    }

    async fn communicate(
        &self,
        args: &[String],
        input: Option<&[u8]>,
        publisher: &mut Publisher,
    ) -> Result<CapturedOutput, RemoteError> {
        publisher.log_and_publish(format!("Spawning remote command {args:?}"), LineFlags::default());

        let process = match RemoteProcess::spawn_captured(args, input.is_some()) {
            Ok(process) => process,
            Err(e) => {
                publisher.publish(
                    &format!("ERROR: failed to spawn remote command: {e}"),
                    LineFlags::default(),
                );
                return Err(e);
            }
        };

        let output = process.communicate(input).await?;
        Self::check_exit_status(&output, publisher)?;
        Ok(output)
    }

    /// Dump the captured output into the transcript and fail when a helper
    /// command exited non-zero.
    fn check_exit_status(
        output: &CapturedOutput,
        publisher: &mut Publisher,
    ) -> Result<(), RemoteError> {
        if output.status == 0 {
            return Ok(());
        }

        publisher.publish(
            &format!(
                "ERROR: remote command failed with exit status {}",
                output.status
            ),
            LineFlags::default(),
        );
        publisher.publish("===== STDOUT =====", LineFlags::default());
        for line in output.stdout.lines() {
            publisher.publish(line, LineFlags::default());
        }
        publisher.publish("===== STDERR =====", LineFlags::default());
        for line in output.stderr.lines() {
            publisher.publish(line, LineFlags::default());
        }

        tracing::error!(
            status = output.status,
            stdout = %output.stdout,
            stderr = %output.stderr,
            "remote command failed"
        );
        Err(RemoteError::CommandFailed {
            status: output.status,
        })
    }
}
