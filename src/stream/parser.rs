use super::citations::normalize_citations;

/// Sentinel tokens delimiting the two segments of a completion stream.
/// These are literal byte-for-byte markers; the server guarantees generated
/// content never contains them.
pub const SEARCH_START_TOKEN: &str = "<search>";
pub const SEARCH_END_TOKEN: &str = "</search>";
pub const LLM_START_TOKEN: &str = "<completion>";
pub const LLM_END_TOKEN: &str = "</completion>";

/// What the buffer yields on one scan. Either side is `None` until its
/// delimiting sentinel has arrived; values are wholesale replacements,
/// never diffs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Snapshot {
    /// Raw sources payload (JSON text by wire contract, not decoded here).
    pub sources: Option<String>,
    /// Answer markdown with citation markers normalized.
    pub answer: Option<String>,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.sources.is_none() && self.answer.is_none()
    }
}

/// Scan the full accumulated buffer for the latest sources and answer.
///
/// Always a whole-buffer re-scan from position 0 — segment boundaries can
/// only be confirmed once a closing sentinel appears, and payloads are
/// small enough that restarting the search each chunk costs nothing. Pure
/// function of the buffer: same input, same output.
pub fn parse_buffer(buffer: &str) -> Snapshot {
    Snapshot {
        sources: extract_sources(buffer),
        answer: extract_answer(buffer),
    }
}

/// Sources: everything before the first `</search>`, with one leading
/// `<search>` stripped if present. The closing sentinel is load-bearing;
/// the opening one is optional.
fn extract_sources(buffer: &str) -> Option<String> {
    let (payload, _) = buffer.split_once(SEARCH_END_TOKEN)?;
    Some(payload.replacen(SEARCH_START_TOKEN, "", 1))
}

/// Answer: everything after the first `<completion>`, truncated at the
/// first `</completion>` if it has arrived, citations normalized.
fn extract_answer(buffer: &str) -> Option<String> {
    let (_, candidate) = buffer.split_once(LLM_START_TOKEN)?;
    let candidate = match candidate.split_once(LLM_END_TOKEN) {
        Some((answer, _)) => answer,
        None => candidate,
    };
    Some(normalize_citations(candidate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_response() {
        let snap = parse_buffer("<search>[]</search><completion>Hello world</completion>");
        assert_eq!(snap.sources.as_deref(), Some("[]"));
        assert_eq!(snap.answer.as_deref(), Some("Hello world"));
    }

    #[test]
    fn test_empty_buffer_yields_nothing() {
        let snap = parse_buffer("");
        assert!(snap.is_empty());
    }

    #[test]
    fn test_sources_absent_until_closing_sentinel() {
        // Opening sentinel and half the payload are not enough
        let snap = parse_buffer(r#"<search>[{"id":"1"}]</sea"#);
        assert_eq!(snap.sources, None);
        assert_eq!(snap.answer, None);
    }

    #[test]
    fn test_opening_sources_sentinel_is_optional() {
        let snap = parse_buffer(r#"[{"id":"1"}]</search>"#);
        assert_eq!(snap.sources.as_deref(), Some(r#"[{"id":"1"}]"#));
    }

    #[test]
    fn test_empty_sources_payload() {
        assert_eq!(parse_buffer("<search></search>").sources.as_deref(), Some(""));
        assert_eq!(parse_buffer("</search>").sources.as_deref(), Some(""));
    }

    #[test]
    fn test_answer_streams_before_closing_sentinel() {
        let snap = parse_buffer("<completion>partial");
        assert_eq!(snap.answer.as_deref(), Some("partial"));
        assert_eq!(snap.sources, None);
    }

    #[test]
    fn test_answer_truncated_at_closing_sentinel() {
        let snap = parse_buffer("<completion>done</completion>trailing junk");
        assert_eq!(snap.answer.as_deref(), Some("done"));
    }

    #[test]
    fn test_first_closing_sentinel_wins() {
        let snap = parse_buffer("<search>[1]</search>x</search><completion>a</completion>b</completion>");
        assert_eq!(snap.sources.as_deref(), Some("[1]"));
        assert_eq!(snap.answer.as_deref(), Some("a"));
    }

    #[test]
    fn test_citations_normalized_in_answer() {
        let snap = parse_buffer("<completion>Answer [[citation:1]] more</completion>");
        assert_eq!(snap.answer.as_deref(), Some("Answer [citation](1) more"));
    }

    #[test]
    fn test_text_between_segments_belongs_to_neither() {
        let snap =
            parse_buffer("<search>[]</search>interlude<completion>answer</completion>");
        assert_eq!(snap.sources.as_deref(), Some("[]"));
        assert_eq!(snap.answer.as_deref(), Some("answer"));
    }

    #[test]
    fn test_rescan_is_idempotent() {
        let buffers = [
            "",
            "<search>",
            "<search>[]</sea",
            "<search>[]</search>",
            "<search>[]</search><completion>Hi [[citation:2]]",
            "<search>[]</search><completion>Hi [[citation:2]]</completion>",
        ];
        for buf in buffers {
            assert_eq!(parse_buffer(buf), parse_buffer(buf), "buffer: {buf:?}");
        }
    }

    #[test]
    fn test_prefix_extension_never_reverts_sources() {
        let full = r#"<search>[{"id":"1"}]</search><completion>ok</completion>"#;
        let mut last_sources: Option<String> = None;
        for end in 0..=full.len() {
            if !full.is_char_boundary(end) {
                continue;
            }
            let snap = parse_buffer(&full[..end]);
            if last_sources.is_some() {
                assert_eq!(snap.sources, last_sources, "reverted at prefix {end}");
            } else if snap.sources.is_some() {
                last_sources = snap.sources;
            }
        }
        assert_eq!(last_sources.as_deref(), Some(r#"[{"id":"1"}]"#));
    }
}
