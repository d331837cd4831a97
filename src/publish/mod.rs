//! Publishing of classified events: transcript accumulation plus
//! fire-and-forget forwarding to the broadcast collaborator.

mod flags;
mod transcript;

pub use flags::*;
pub use transcript::*;

use tokio::sync::broadcast;

use crate::protocol::LineEvent;

/// Default capacity of the outbound broadcast channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Create the broadcast channel that carries published messages to
/// subscribers (web tier, CLI display, tests).
#[must_use]
pub fn message_channel() -> (
    broadcast::Sender<OutboundMessage>,
    broadcast::Receiver<OutboundMessage>,
) {
    broadcast::channel(DEFAULT_CHANNEL_CAPACITY)
}

/// Sink for one run's output.
///
/// Appends every non-empty line to the run transcript and forwards the
/// message to the broadcast channel. Delivery is fire-and-forget: a channel
/// without subscribers is not an error and nothing is retried.
pub struct Publisher {
    transcript: Transcript,
    sender: broadcast::Sender<OutboundMessage>,
}

impl Publisher {
    /// Create a publisher for a new run.
    #[must_use]
    pub fn new(sender: broadcast::Sender<OutboundMessage>) -> Self {
        Self {
            transcript: Transcript::new(),
            sender,
        }
    }

    /// Publish one line with its flags.
    ///
    /// An empty line is broadcast (some flags travel without text) but never
    /// recorded in the transcript.
    pub fn publish(&mut self, line: &str, flags: LineFlags) {
        if !line.is_empty() {
            self.transcript.append(line);
        }
        let _ = self.sender.send(OutboundMessage {
            line: line.to_string(),
            flags,
        });
    }

    /// Write the message to the diagnostic log, then publish it.
    pub fn log_and_publish(&mut self, message: impl AsRef<str>, flags: LineFlags) {
        let message = message.as_ref();
        tracing::info!("{message}");
        self.publish(message, flags);
    }

    /// Log at error level and publish with the error flag forced on.
    pub fn log_and_publish_error(&mut self, message: impl AsRef<str>, mut flags: LineFlags) {
        let message = message.as_ref();
        tracing::error!("{message}");
        flags.error_line = true;
        self.publish(message, flags);
    }

    /// Publish one classified event with the flags its kind implies.
    pub fn publish_event(&mut self, event: &LineEvent) {
        match event {
            LineEvent::Plain(line) => self.publish(line, LineFlags::remote()),
            LineEvent::MasterLaunched(line) => self.log_and_publish(
                line,
                LineFlags {
                    app_master_launched: true,
                    ..LineFlags::remote()
                },
            ),
            LineEvent::Progress { done, total, line } => self.log_and_publish(
                line,
                LineFlags {
                    progress_update: true,
                    progress_done: Some(*done),
                    progress_total: Some(*total),
                    ..LineFlags::remote()
                },
            ),
            LineEvent::ErrorLine(text) => self.log_and_publish(
                text,
                LineFlags {
                    error_line: true,
                    ..LineFlags::remote()
                },
            ),
            LineEvent::OutputFile { filename, line } => self.log_and_publish(
                line,
                LineFlags {
                    output_filename_reported: Some(filename.clone()),
                    ..LineFlags::remote()
                },
            ),
            LineEvent::CookieMismatch { expected, got } => self.log_and_publish_error(
                format!("ERROR: cookie mismatch, expected {expected} but message carried {got}"),
                LineFlags::remote(),
            ),
            LineEvent::Malformed { reason } => self.log_and_publish_error(
                format!("ERROR: could not decode message from shell: {reason}"),
                LineFlags::remote(),
            ),
            LineEvent::UnknownMessage(line) => self.log_and_publish_error(
                format!("ERROR: unknown kind of message from shell: {line}"),
                LineFlags::remote(),
            ),
        }
    }

    /// Record the terminal exit status on the transcript.
    pub fn set_exit_status(&mut self, status: i32) {
        self.transcript.set_exit_status(status);
    }

    /// The transcript accumulated so far.
    #[must_use]
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Consume the publisher, handing over the finished transcript.
    #[must_use]
    pub fn into_transcript(self) -> Transcript {
        self.transcript
    }
}
