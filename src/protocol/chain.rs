//! Ordered line classification chain.
//!
//! One raw line of remote output goes through a fixed sequence of pattern
//! matchers; the first matcher that recognizes the line handles it. Lines no
//! matcher claims are plain log noise. The chain is a plain value built fresh
//! for every run, because the sideband matcher closes over the run cookie.

use regex::Regex;

use crate::protocol::shell_message;
use crate::protocol::{LineEvent, RunToken};

/// Error raised by a matcher that recognized a line but failed to handle it.
#[derive(thiserror::Error, Debug)]
pub enum MatchError {
    /// A numeric capture did not fit the target integer type.
    #[error("invalid numeric capture: {0}")]
    InvalidNumber(#[from] std::num::ParseIntError),
}

/// One ordered pattern matcher in the chain.
trait LineMatcher: Send + Sync {
    /// Name used in diagnostics when the handler fails.
    fn name(&self) -> &'static str;

    /// Attempt to match and handle one line.
    ///
    /// `Ok(None)` means the line is not this matcher's concern and the chain
    /// moves on; `Ok(Some(events))` means the line was handled.
    fn try_parse(&self, line: &str) -> Result<Option<Vec<LineEvent>>, MatchError>;
}

/// Recognizes the log line announcing that the cluster application master
/// has started.
///
/// `14/08/19 16:07:31 INFO yarn.Client: Command for starting the Spark
/// ApplicationMaster: List(...)`
struct MasterLaunchedMatcher {
    pattern: Regex,
}

impl MasterLaunchedMatcher {
    fn new() -> Self {
        Self {
            pattern: Regex::new(
                r"^\S+\s\S+\sINFO\syarn\.Client:\sCommand\sfor\sstarting\sthe\sSpark\sApplicationMaster",
            )
            .expect("hard-coded pattern must compile"),
        }
    }
}

impl LineMatcher for MasterLaunchedMatcher {
    fn name(&self) -> &'static str {
        "master-launched"
    }

    fn try_parse(&self, line: &str) -> Result<Option<Vec<LineEvent>>, MatchError> {
        if self.pattern.is_match(line) {
            Ok(Some(vec![LineEvent::MasterLaunched(line.to_string())]))
        } else {
            Ok(None)
        }
    }
}

/// Recognizes scheduler task-finished lines and extracts the progress
/// counters.
///
/// `14/08/19 17:02:15 INFO scheduler.TaskSetManager: Finished TID 24 in 3386
/// ms on node7.example.com (progress: 26/70)`
struct ProgressMatcher {
    pattern: Regex,
}

impl ProgressMatcher {
    fn new() -> Self {
        Self {
            pattern: Regex::new(
                r"^.*INFO\s+scheduler\.TaskSetManager:\s+Finished\s+TID\s+(\d+)\s+in\s+(\d+)\s+ms\s+on\s+(.+)\s+\(progress:\s+(\d+)/(\d+)\)",
            )
            .expect("hard-coded pattern must compile"),
        }
    }
}

impl LineMatcher for ProgressMatcher {
    fn name(&self) -> &'static str {
        "progress"
    }

    fn try_parse(&self, line: &str) -> Result<Option<Vec<LineEvent>>, MatchError> {
        let Some(caps) = self.pattern.captures(line) else {
            return Ok(None);
        };
        // Groups 1-3 (task id, duration, host) are matched but not surfaced.
        let done: u64 = caps[4].parse()?;
        let total: u64 = caps[5].parse()?;
        Ok(Some(vec![LineEvent::Progress {
            done,
            total,
            line: line.to_string(),
        }]))
    }
}

/// Recognizes `@@...@@` framed lines and hands the payload to the sideband
/// decoder.
struct ShellMessageMatcher {
    pattern: Regex,
    token: RunToken,
}

impl ShellMessageMatcher {
    fn new(token: RunToken) -> Self {
        Self {
            pattern: Regex::new(r"^@@(.+)@@$").expect("hard-coded pattern must compile"),
            token,
        }
    }
}

impl LineMatcher for ShellMessageMatcher {
    fn name(&self) -> &'static str {
        "shell-message"
    }

    fn try_parse(&self, line: &str) -> Result<Option<Vec<LineEvent>>, MatchError> {
        let Some(caps) = self.pattern.captures(line) else {
            return Ok(None);
        };
        Ok(Some(shell_message::decode(line, &caps[1], &self.token)))
    }
}

/// Classifies raw remote output lines into events.
///
/// Matchers run in a fixed order: the master-launched pattern is the most
/// specific and goes first; the sideband frame is cheap to detect and must be
/// checked before a line is declared plain text, since framed lines are
/// otherwise indistinguishable from log noise.
pub struct LineClassifier {
    matchers: Vec<Box<dyn LineMatcher>>,
}

impl LineClassifier {
    /// Build the chain for one run; the sideband matcher closes over `token`.
    #[must_use]
    pub fn new(token: RunToken) -> Self {
        Self {
            matchers: vec![
                Box::new(MasterLaunchedMatcher::new()),
                Box::new(ProgressMatcher::new()),
                Box::new(ShellMessageMatcher::new(token)),
            ],
        }
    }

    /// Classify one trimmed line of remote output.
    ///
    /// First match wins. A matcher that recognizes a line but fails
    /// internally yields a single `Malformed` event and ends classification
    /// of that line; the failure must not abort the chain or the run. Lines
    /// no matcher claims come back as `Plain`, unchanged.
    ///
    /// Classification is pure: the result depends only on the line text and
    /// the run token, so calling this twice on the same line is idempotent.
    #[must_use]
    pub fn classify(&self, line: &str) -> Vec<LineEvent> {
        for matcher in &self.matchers {
            match matcher.try_parse(line) {
                Ok(Some(events)) => return events,
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(matcher = matcher.name(), error = %e, "line matcher failed");
                    return vec![LineEvent::Malformed {
                        reason: format!("{} matcher failed: {e}", matcher.name()),
                    }];
                }
            }
        }
        vec![LineEvent::Plain(line.to_string())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MASTER_LINE: &str = "14/08/19 16:07:31 INFO yarn.Client: \
         Command for starting the Spark ApplicationMaster: List(...)";

    const PROGRESS_LINE: &str = "17:13:44 INFO scheduler.TaskSetManager: \
         Finished TID 9 in 11050 ms on host.example.com (progress: 10/10)";

    // Lines no matcher should ever claim.
    const UNMATCHED_LINES: &[&str] = &[
        "xxxxxx",
        "14/08/23 12:48:53 INFO scheduler.DAGScheduler: Completed ShuffleMapTask(1, 0)",
        "@@@@",
        "plain line with an @@embedded@@ marker not at the edges x",
    ];

    fn classifier(token: &str) -> LineClassifier {
        LineClassifier::new(RunToken::from(token))
    }

    #[test]
    fn test_unmatched_lines_are_plain_and_unchanged() {
        let chain = classifier("ABC");
        for line in UNMATCHED_LINES {
            assert_eq!(
                chain.classify(line),
                vec![LineEvent::Plain((*line).to_string())],
                "line: {line}"
            );
        }
    }

    #[test]
    fn test_master_launched() {
        let events = classifier("ABC").classify(MASTER_LINE);
        assert_eq!(events, vec![LineEvent::MasterLaunched(MASTER_LINE.to_string())]);
    }

    #[test]
    fn test_progress_extracts_counters() {
        let events = classifier("ABC").classify(PROGRESS_LINE);
        assert_eq!(
            events,
            vec![LineEvent::Progress {
                done: 10,
                total: 10,
                line: PROGRESS_LINE.to_string(),
            }]
        );
    }

    #[test]
    fn test_progress_with_date_prefix() {
        let line = "14/08/23 12:48:53 INFO scheduler.TaskSetManager: Finished TID 0 \
                    in 7443 ms on node3.example.com (progress: 4/10)";
        let events = classifier("ABC").classify(line);
        assert_eq!(
            events,
            vec![LineEvent::Progress {
                done: 4,
                total: 10,
                line: line.to_string(),
            }]
        );
    }

    #[test]
    fn test_sideband_error_line_with_matching_cookie() {
        let line = "@@<message-from-shell cookie='ABC'>\
                    <error-line>Disk full</error-line></message-from-shell>@@";
        let events = classifier("ABC").classify(line);
        assert_eq!(events, vec![LineEvent::ErrorLine("Disk full".to_string())]);
    }

    #[test]
    fn test_sideband_cookie_mismatch_produces_no_error_line() {
        let line = "@@<message-from-shell cookie='ABC'>\
                    <error-line>Disk full</error-line></message-from-shell>@@";
        let events = classifier("XYZ").classify(line);
        assert_eq!(
            events,
            vec![LineEvent::CookieMismatch {
                expected: "XYZ".to_string(),
                got: "ABC".to_string(),
            }]
        );
    }

    #[test]
    fn test_sideband_garbage_is_malformed_not_plain() {
        let events = classifier("ABC").classify("@@some text@@");
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], LineEvent::Malformed { .. }));
    }

    #[test]
    fn test_empty_line_is_plain() {
        let events = classifier("ABC").classify("");
        assert_eq!(events, vec![LineEvent::Plain(String::new())]);
    }

    #[test]
    fn test_classification_is_idempotent() {
        let chain = classifier("ABC");
        let line = "@@<message-from-shell cookie='ABC'>\
                    <error-line>boom</error-line></message-from-shell>@@";
        assert_eq!(chain.classify(line), chain.classify(line));
        assert_eq!(chain.classify(MASTER_LINE), chain.classify(MASTER_LINE));
    }

    #[test]
    fn test_chains_with_different_tokens_are_independent() {
        let line = "@@<message-from-shell cookie='ABC'>\
                    <error-line>boom</error-line></message-from-shell>@@";
        let accepted = classifier("ABC").classify(line);
        let rejected = classifier("XYZ").classify(line);
        assert_eq!(accepted, vec![LineEvent::ErrorLine("boom".to_string())]);
        assert!(matches!(rejected[0], LineEvent::CookieMismatch { .. }));
    }

    #[test]
    fn test_progress_overflow_is_malformed() {
        // 2^64 does not fit in u64; the handler error must not panic the
        // chain.
        let line = "x INFO scheduler.TaskSetManager: Finished TID 1 in 2 ms on h \
                    (progress: 18446744073709551616/18446744073709551616)";
        let events = classifier("ABC").classify(line);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], LineEvent::Malformed { .. }));
    }
}
