//! Spark Launcher - run user scripts on a remote Spark host and stream back
//! classified output.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use futures_util::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use spark_launcher::config::ConfigLoader;
use spark_launcher::display;
use spark_launcher::job::{JobAction, JobLauncher, JobStore, MemoryJobStore};
use spark_launcher::publish::{message_channel, LineFlags, OutboundMessage, Publisher};

#[derive(Parser)]
#[command(
    name = "spark-launcher",
    about = "Run user scripts on a remote Spark host and stream back classified output",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to a config file (defaults to the standard search locations).
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a script and execute it with spark-shell on the remote host.
    Run {
        /// The script file to execute.
        script: PathBuf,
    },
    /// Upload a script and print it back from the remote host (staging
    /// sanity check).
    Dump {
        /// The script file to upload.
        script: PathBuf,
    },
    /// Check that the remote host is reachable.
    Probe,
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let loader = cli
        .config
        .map_or_else(ConfigLoader::new, ConfigLoader::with_path);
    let config = match loader.load() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "could not load configuration");
            return ExitCode::FAILURE;
        }
    };

    let (script, action) = match &cli.command {
        Commands::Run { script } => (read_script(script), JobAction::RunScript),
        Commands::Dump { script } => (read_script(script), JobAction::DumpScript),
        Commands::Probe => (Some(String::new()), JobAction::Probe),
    };
    let Some(script) = script else {
        return ExitCode::FAILURE;
    };

    let (sender, receiver) = message_channel();
    let printer = tokio::spawn(async move {
        let mut stream = BroadcastStream::new(receiver);
        while let Some(item) = stream.next().await {
            if let Ok(message) = item {
                display::print_message(&message);
            }
        }
    });

    // Mirror of what the task-scheduling boundary publishes before a worker
    // picks the job up.
    announce_submission(&sender, &action);

    let store = Arc::new(MemoryJobStore::new());
    let launcher = JobLauncher::new(config, store as Arc<dyn JobStore>, sender.clone());
    let outcome = launcher.launch(&script, action).await;

    // Close the channel so the printer drains and exits.
    drop(launcher);
    drop(sender);
    let _ = printer.await;

    if outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        tracing::warn!(?outcome, "job did not succeed");
        ExitCode::FAILURE
    }
}

fn read_script(path: &PathBuf) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(script) => Some(script),
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "could not read script file");
            None
        }
    }
}

fn announce_submission(
    sender: &tokio::sync::broadcast::Sender<OutboundMessage>,
    action: &JobAction,
) {
    let mut publisher = Publisher::new(sender.clone());
    tracing::info!(%action, "scheduling execution of script");
    publisher.publish(
        "Scheduling execution of script",
        LineFlags {
            job_submitted: true,
            ..LineFlags::default()
        },
    );
}
