//! Colored CLI display for published messages.
//!
//! Renders the broadcast stream on a terminal: progress and lifecycle
//! markers highlighted, error lines in red, everything else passed through.

use std::io::{self, Write};

use chrono::Utc;
use owo_colors::OwoColorize;

use crate::publish::OutboundMessage;

/// Get current timestamp in the same format as tracing.
fn timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// Print one published message.
pub fn print_message(message: &OutboundMessage) {
    let ts = timestamp();
    let flags = &message.flags;

    if flags.progress_update {
        let done = flags.progress_done.unwrap_or_default();
        let total = flags.progress_total.unwrap_or_default();
        println!(
            "{} {} {done}/{total} {}",
            ts.dimmed(),
            "[PROGRESS]".cyan().bold(),
            message.line.dimmed()
        );
    } else if flags.app_master_launched {
        println!(
            "{} {} {}",
            ts.dimmed(),
            "[MASTER]".green().bold(),
            message.line
        );
    } else if flags.error_line {
        println!(
            "{} {} {}",
            ts.dimmed(),
            "[ERROR]".red().bold(),
            message.line.red()
        );
    } else if let Some(filename) = &flags.output_filename_reported {
        println!(
            "{} {} {}",
            ts.dimmed(),
            "[OUTPUT]".magenta().bold(),
            filename
        );
    } else if flags.job_finished_ok {
        let status = flags.exit_status.unwrap_or_default();
        let tag = if status == 0 {
            "[DONE]".green().bold().to_string()
        } else {
            "[DONE]".yellow().bold().to_string()
        };
        println!("{} {tag} {}", ts.dimmed(), message.line);
    } else if flags.saved_job_id.is_some() {
        println!("{} {} {}", ts.dimmed(), "[SAVED]".blue().bold(), message.line);
    } else if !message.line.is_empty() {
        println!("{} {}", ts.dimmed(), message.line);
    }
    let _ = io::stdout().flush();
}
