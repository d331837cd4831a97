//! Orchestration of one job launch.
//!
//! Ties the pieces together for a single run: mint the cookie, build the
//! classifier and publisher, stage the script on the remote host, stream the
//! remote output, and finalize the job record whatever happens.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::broadcast;

use crate::config::LauncherConfig;
use crate::job::{JobOutcome, JobRecord, JobStore};
use crate::protocol::{LineClassifier, RunToken};
use crate::publish::{LineFlags, OutboundMessage, Publisher};
use crate::remote::{RemoteError, RemoteShell};

/// What to do with a submitted script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobAction {
    /// Upload the script and execute it with spark-shell.
    RunScript,
    /// Upload the script and print it back from the remote host.
    DumpScript,
    /// Reachability check: run `echo pong` on the remote host.
    Probe,
}

impl std::fmt::Display for JobAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RunScript => f.write_str("spark-shell"),
            Self::DumpScript => f.write_str("dump-script"),
            Self::Probe => f.write_str("probe"),
        }
    }
}

/// Launches jobs on the remote host.
///
/// The launcher itself is reusable; everything owned by a single run (cookie,
/// classifier, publisher, process handle) is created inside
/// [`launch`](Self::launch), so concurrent launches are fully isolated from
/// one another.
pub struct JobLauncher {
    config: LauncherConfig,
    store: Arc<dyn JobStore>,
    sender: broadcast::Sender<OutboundMessage>,
}

impl JobLauncher {
    /// Create a launcher over the given store and broadcast channel.
    #[must_use]
    pub fn new(
        config: LauncherConfig,
        store: Arc<dyn JobStore>,
        sender: broadcast::Sender<OutboundMessage>,
    ) -> Self {
        Self {
            config,
            store,
            sender,
        }
    }

    /// Launch one job and return its terminal status.
    ///
    /// Every failure inside the launch sequence is caught here: it is logged,
    /// published as a best-effort failure notice, and the job record is still
    /// finalized and saved with whatever transcript accumulated.
    pub async fn launch(&self, script: &str, action: JobAction) -> JobOutcome {
        let started_at = Utc::now();
        let token = RunToken::mint();
        let classifier = LineClassifier::new(token.clone());
        let shell = RemoteShell::new(self.config.ssh.base_args.clone());
        let mut publisher = Publisher::new(self.sender.clone());

        publisher.publish(
            "",
            LineFlags {
                received_by_worker: true,
                ..LineFlags::default()
            },
        );

        let result = self
            .run_action(script, action, &token, &shell, &classifier, &mut publisher)
            .await;

        let outcome = match result {
            Ok(0) => JobOutcome::Succeeded,
            Ok(status) => JobOutcome::ExitedNonZero(status),
            Err(e) => {
                tracing::error!(error = %e, %action, "job launch failed");
                // Losing the failure notice must not lose the record.
                publisher.publish(
                    "Job finished with error",
                    LineFlags {
                        job_finished_with_error: true,
                        ..LineFlags::default()
                    },
                );
                JobOutcome::Failed
            }
        };

        let record = JobRecord::new(
            script,
            publisher.transcript().join(),
            started_at,
            Utc::now(),
            outcome,
        );
        match self.store.save(record).await {
            Ok(id) => publisher.log_and_publish(
                format!("Job saved: {id}"),
                LineFlags {
                    saved_job_id: Some(id),
                    ..LineFlags::default()
                },
            ),
            Err(e) => tracing::error!(error = %e, "failed to save job record"),
        }

        outcome
    }

    async fn run_action(
        &self,
        script: &str,
        action: JobAction,
        token: &RunToken,
        shell: &RemoteShell,
        classifier: &LineClassifier,
        publisher: &mut Publisher,
    ) -> Result<i32, RemoteError> {
        match action {
            JobAction::Probe => {
                shell
                    .run_streaming(
                        &["echo".to_string(), "pong".to_string()],
                        publisher,
                        classifier,
                    )
                    .await
            }
            JobAction::RunScript => {
                let path = self.stage_script(script, shell, publisher).await?;
                publisher.log_and_publish(
                    format!("Will launch {action} job on the remote host"),
                    LineFlags::default(),
                );
                let tail = self.spark_shell_invocation(token, &path);
                shell.run_streaming(&tail, publisher, classifier).await
            }
            JobAction::DumpScript => {
                let path = self.stage_script(script, shell, publisher).await?;
                publisher.log_and_publish(
                    format!("Will launch {action} job on the remote host"),
                    LineFlags::default(),
                );
                shell
                    .run_streaming(&["cat".to_string(), path], publisher, classifier)
                    .await
            }
        }
    }

    /// Finalize the script and upload it to a freshly created remote temp
    /// file. Returns the remote path.
    async fn stage_script(
        &self,
        script: &str,
        shell: &RemoteShell,
        publisher: &mut Publisher,
    ) -> Result<String, RemoteError> {
        let script = finalize_script(script);
        log_script(&script);

        let path = shell
            .create_temp_file(
                &self.config.spark.temp_file_template,
                &self.config.spark.temp_file_suffix,
                publisher,
            )
            .await?;
        shell.upload(script.as_bytes(), &path, publisher).await?;
        Ok(path)
    }

    /// Argument tail that starts spark-shell on the uploaded script with the
    /// run cookie exported into the remote environment.
    ///
    /// The command is wrapped in single quotes because the remote login shell
    /// re-joins the argument vector with spaces; stderr is merged so that
    /// everything arrives on the one streamed pipe.
    fn spark_shell_invocation(&self, token: &RunToken, script_path: &str) -> Vec<String> {
        let spark = &self.config.spark;
        let path = shell_escape::unix::escape(script_path.into());
        let remote_command = format!(
            "'{} {} --master yarn-client -i {} 2>&1'",
            spark.shell_path, spark.shell_opts, path
        );
        vec![
            "env".to_string(),
            format!("{}={}", spark.cookie_env_var, token),
            "sh".to_string(),
            "-c".to_string(),
            remote_command,
        ]
    }
}

/// Append a trailing `exit` so the remote shell terminates even when the
/// submitted script forgot to.
fn finalize_script(script: &str) -> String {
    format!("{script}\n/* EXIT */\nexit\n")
}

/// Write the script into the diagnostic log, line by line.
fn log_script(script: &str) {
    tracing::info!("#-----------------------------------------------------");
    for line in script.lines() {
        tracing::info!("# {line}");
    }
    tracing::info!("#-----------------------------------------------------");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::MemoryJobStore;
    use crate::publish::message_channel;

    fn launcher_with(base_args: Vec<String>) -> (JobLauncher, Arc<MemoryJobStore>) {
        let config = LauncherConfig {
            ssh: crate::config::SshConfig { base_args },
            ..LauncherConfig::default()
        };
        let store = Arc::new(MemoryJobStore::new());
        let (tx, _rx) = message_channel();
        (
            JobLauncher::new(config, Arc::clone(&store) as Arc<dyn JobStore>, tx),
            store,
        )
    }

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(ToString::to_string).collect()
    }

    #[tokio::test]
    async fn test_probe_succeeds_and_saves_record() {
        // With an empty-prefix equivalent, probe runs `echo pong` locally.
        let (launcher, store) = launcher_with(argv(&["/usr/bin/env"]));

        let outcome = launcher.launch("", JobAction::Probe).await;
        assert_eq!(outcome, JobOutcome::Succeeded);

        let saved = store.saved().await;
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].outcome, JobOutcome::Succeeded);
        assert!(saved[0].transcript.contains("pong"));
        assert!(saved[0]
            .transcript
            .contains("Remote job ended with exit status 0"));
    }

    #[tokio::test]
    async fn test_staging_failure_finalizes_failed_record() {
        // The fake remote rejects every command the way a permission problem
        // would.
        let (launcher, store) = launcher_with(argv(&[
            "/bin/sh",
            "-c",
            "echo 'permission denied' >&2; exit 1",
        ]));

        let outcome = launcher.launch("val x = 1", JobAction::RunScript).await;
        assert_eq!(outcome, JobOutcome::Failed);

        let saved = store.saved().await;
        assert_eq!(saved.len(), 1);
        let record = &saved[0];
        assert_eq!(record.outcome, JobOutcome::Failed);
        assert_eq!(record.title, "val x = 1");
        assert!(record.transcript.contains("===== STDOUT ====="));
        assert!(record.transcript.contains("===== STDERR ====="));
        assert!(record.transcript.contains("permission denied"));
        assert!(record.transcript.contains("Job finished with error"));
    }

    #[tokio::test]
    async fn test_spawn_failure_finalizes_failed_record() {
        let (launcher, store) = launcher_with(argv(&["/nonexistent/ssh-for-test"]));

        let outcome = launcher.launch("", JobAction::Probe).await;
        assert_eq!(outcome, JobOutcome::Failed);
        assert_eq!(store.saved().await.len(), 1);
    }

    #[test]
    fn test_finalize_script_appends_exit() {
        let fixed = finalize_script("val x = 1");
        assert!(fixed.starts_with("val x = 1\n"));
        assert!(fixed.ends_with("exit\n"));
    }

    #[test]
    fn test_spark_shell_invocation_shape() {
        let (launcher, _store) = launcher_with(argv(&["ssh", "hadoop@cluster"]));
        let token = RunToken::from("COOKIE123");
        let tail = launcher.spark_shell_invocation(&token, "/tmp/job.scala");

        assert_eq!(tail[0], "env");
        assert_eq!(tail[1], "SPARK_LAUNCHER_COOKIE=COOKIE123");
        assert_eq!(tail[2], "sh");
        assert_eq!(tail[3], "-c");
        assert!(tail[4].starts_with('\''));
        assert!(tail[4].contains("spark-shell"));
        assert!(tail[4].contains("--master yarn-client"));
        assert!(tail[4].contains("-i /tmp/job.scala 2>&1"));
        assert!(tail[4].ends_with('\''));
    }
}
