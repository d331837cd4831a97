//! Append-only transcript of one run.

/// Ordered log of every non-empty published line, plus the terminal exit
/// status of the remote command once known. Owned by exactly one run and
/// handed to the job store when the run ends.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    lines: Vec<String>,
    exit_status: Option<i32>,
}

impl Transcript {
    /// Create an empty transcript.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one line. Callers are expected to filter out empty lines.
    pub fn append(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }

    /// Record the exit status of the remote command.
    pub fn set_exit_status(&mut self, status: i32) {
        self.exit_status = Some(status);
    }

    /// The recorded exit status, if the remote command got that far.
    #[must_use]
    pub fn exit_status(&self) -> Option<i32> {
        self.exit_status
    }

    /// All recorded lines in arrival order.
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The transcript as a single newline-joined string.
    #[must_use]
    pub fn join(&self) -> String {
        self.lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_preserves_arrival_order() {
        let mut transcript = Transcript::new();
        transcript.append("first");
        transcript.append("second");
        transcript.append("third");
        assert_eq!(transcript.join(), "first\nsecond\nthird");
        assert_eq!(transcript.len(), 3);
    }

    #[test]
    fn test_empty_transcript() {
        let transcript = Transcript::new();
        assert!(transcript.is_empty());
        assert_eq!(transcript.join(), "");
        assert!(transcript.exit_status().is_none());
    }

    #[test]
    fn test_exit_status_recorded() {
        let mut transcript = Transcript::new();
        transcript.set_exit_status(3);
        assert_eq!(transcript.exit_status(), Some(3));
    }
}
