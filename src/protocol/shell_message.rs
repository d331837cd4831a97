//! Decoder for the `@@...@@` sideband mini-documents.
//!
//! The remote script has no channel of its own back to the launcher, so it
//! multiplexes structured events onto its plain-text output: a single line
//! framed with `@@` markers carrying a small XML document. The root element
//! is authenticated with the per-run cookie before any payload is trusted.

use crate::protocol::{LineEvent, RunToken};

/// Root element of every sideband document.
const ROOT_TAG: &str = "message-from-shell";
/// Attribute on the root element carrying the run cookie.
const COOKIE_ATTR: &str = "cookie";
/// Repeatable child reporting one error line each.
const ERROR_LINE_TAG: &str = "error-line";
/// Single child reporting the name of a produced output file.
const OUTPUT_FILE_TAG: &str = "output-file-name";

/// Decode one framed sideband payload.
///
/// `line` is the original framed line (surfaced in events that echo it back),
/// `payload` the text between the `@@` markers. Decoding never fails as such:
/// malformed documents and cookie mismatches are themselves events, published
/// and logged by the run like any other.
#[must_use]
pub fn decode(line: &str, payload: &str, expected: &RunToken) -> Vec<LineEvent> {
    let document = match roxmltree::Document::parse(payload) {
        Ok(document) => document,
        Err(e) => {
            return vec![LineEvent::Malformed {
                reason: format!("invalid sideband document: {e}"),
            }]
        }
    };

    let root = document.root_element();
    if !root.has_tag_name(ROOT_TAG) {
        return vec![LineEvent::Malformed {
            reason: format!("unexpected root element <{}>", root.tag_name().name()),
        }];
    }

    let Some(got) = root.attribute(COOKIE_ATTR) else {
        return vec![LineEvent::Malformed {
            reason: format!("<{ROOT_TAG}> is missing the {COOKIE_ATTR} attribute"),
        }];
    };

    // An older remote process writing to the same stream must not be able to
    // inject events attributed to this run.
    if got != expected.as_str() {
        return vec![LineEvent::CookieMismatch {
            expected: expected.as_str().to_string(),
            got: got.to_string(),
        }];
    }

    let errors: Vec<LineEvent> = root
        .children()
        .filter(|node| node.has_tag_name(ERROR_LINE_TAG))
        .map(|node| LineEvent::ErrorLine(node.text().unwrap_or_default().trim().to_string()))
        .collect();
    if !errors.is_empty() {
        return errors;
    }

    if let Some(node) = root
        .children()
        .find(|node| node.has_tag_name(OUTPUT_FILE_TAG))
    {
        return vec![LineEvent::OutputFile {
            filename: node.text().unwrap_or_default().trim().to_string(),
            line: line.to_string(),
        }];
    }

    vec![LineEvent::UnknownMessage(line.to_string())]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(payload: &str) -> String {
        format!("@@{payload}@@")
    }

    fn decode_framed(payload: &str, token: &str) -> Vec<LineEvent> {
        decode(&frame(payload), payload, &RunToken::from(token))
    }

    #[test]
    fn test_error_line_with_matching_cookie() {
        let events = decode_framed(
            "<message-from-shell cookie='ABC'><error-line>Disk full</error-line></message-from-shell>",
            "ABC",
        );
        assert_eq!(events, vec![LineEvent::ErrorLine("Disk full".to_string())]);
    }

    #[test]
    fn test_multiple_error_lines_yield_multiple_events() {
        let events = decode_framed(
            "<message-from-shell cookie='ABC'>\
             <error-line>first</error-line>\
             <error-line>  second  </error-line>\
             </message-from-shell>",
            "ABC",
        );
        assert_eq!(
            events,
            vec![
                LineEvent::ErrorLine("first".to_string()),
                LineEvent::ErrorLine("second".to_string()),
            ]
        );
    }

    #[test]
    fn test_cookie_mismatch_suppresses_payload() {
        let events = decode_framed(
            "<message-from-shell cookie='ABC'><error-line>Disk full</error-line></message-from-shell>",
            "XYZ",
        );
        assert_eq!(
            events,
            vec![LineEvent::CookieMismatch {
                expected: "XYZ".to_string(),
                got: "ABC".to_string(),
            }]
        );
    }

    #[test]
    fn test_output_file_name() {
        let payload =
            "<message-from-shell cookie='ABC'><output-file-name> /tmp/out.csv </output-file-name></message-from-shell>";
        let events = decode_framed(payload, "ABC");
        assert_eq!(
            events,
            vec![LineEvent::OutputFile {
                filename: "/tmp/out.csv".to_string(),
                line: frame(payload),
            }]
        );
    }

    #[test]
    fn test_error_lines_win_over_output_file() {
        let events = decode_framed(
            "<message-from-shell cookie='ABC'>\
             <output-file-name>/tmp/out.csv</output-file-name>\
             <error-line>boom</error-line>\
             </message-from-shell>",
            "ABC",
        );
        assert_eq!(events, vec![LineEvent::ErrorLine("boom".to_string())]);
    }

    #[test]
    fn test_unknown_message_kind() {
        let payload = "<message-from-shell cookie='ABC'><something-else/></message-from-shell>";
        let events = decode_framed(payload, "ABC");
        assert_eq!(events, vec![LineEvent::UnknownMessage(frame(payload))]);
    }

    #[test]
    fn test_empty_document_with_cookie_is_unknown() {
        let payload = "<message-from-shell cookie='ABC'></message-from-shell>";
        let events = decode_framed(payload, "ABC");
        assert_eq!(events, vec![LineEvent::UnknownMessage(frame(payload))]);
    }

    #[test]
    fn test_invalid_xml_is_malformed() {
        let events = decode_framed("some text", "ABC");
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], LineEvent::Malformed { .. }));
    }

    #[test]
    fn test_wrong_root_element_is_malformed() {
        let events = decode_framed("<some_xml></some_xml>", "ABC");
        assert!(
            matches!(&events[0], LineEvent::Malformed { reason } if reason.contains("some_xml"))
        );
    }

    #[test]
    fn test_missing_cookie_attribute_is_malformed() {
        let events = decode_framed(
            "<message-from-shell><error-line>ERR</error-line></message-from-shell>",
            "ABC",
        );
        assert!(
            matches!(&events[0], LineEvent::Malformed { reason } if reason.contains("cookie"))
        );
    }
}
