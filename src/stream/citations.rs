use std::sync::OnceLock;

use regex::Regex;

fn double_open() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[\[[cC]itation").expect("static pattern"))
}

fn double_close() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[cC]itation:(\d+)\]\]").expect("static pattern"))
}

fn link_form() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[[cC]itation:(\d+)\]").expect("static pattern"))
}

/// Rewrite citation markers to a uniform markdown link.
///
/// The generation model emits `[[citation:N]]`, `[[Citation:N]]`, and
/// stray-bracket variants of both. Rendering wants exactly one shape:
/// `[citation](N)`. Rewrites run in stages — collapse the doubled opening
/// bracket, collapse the doubled closing bracket, then convert the single
/// bracketed marker to link form — so every variant funnels through the
/// same final rule.
pub fn normalize_citations(text: &str) -> String {
    let text = double_open().replace_all(text, "[citation");
    let text = double_close().replace_all(&text, "citation:$1]");
    link_form().replace_all(&text, "[citation]($1)").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercase_double_bracket() {
        assert_eq!(normalize_citations("[[citation:3]]"), "[citation](3)");
    }

    #[test]
    fn test_capitalized_double_bracket() {
        assert_eq!(normalize_citations("[[Citation:3]]"), "[citation](3)");
    }

    #[test]
    fn test_single_bracket_variant() {
        assert_eq!(normalize_citations("[citation:7]"), "[citation](7)");
        assert_eq!(normalize_citations("[Citation:7]"), "[citation](7)");
    }

    #[test]
    fn test_trailing_extra_bracket() {
        assert_eq!(normalize_citations("[[citation:3]]]"), "[citation](3)]");
    }

    #[test]
    fn test_zero_and_multi_digit() {
        assert_eq!(normalize_citations("[[citation:0]]"), "[citation](0)");
        assert_eq!(normalize_citations("[[Citation:42]]"), "[citation](42)");
        assert_eq!(normalize_citations("[[citation:1234]]"), "[citation](1234)");
    }

    #[test]
    fn test_marker_inside_prose() {
        assert_eq!(
            normalize_citations("Akash leases run on providers [[citation:1]] today."),
            "Akash leases run on providers [citation](1) today."
        );
    }

    #[test]
    fn test_multiple_markers() {
        assert_eq!(
            normalize_citations("a [[citation:1]] b [[Citation:2]] c"),
            "a [citation](1) b [citation](2) c"
        );
    }

    #[test]
    fn test_text_without_markers_unchanged() {
        let text = "No citations here, just [a link](https://example.com).";
        assert_eq!(normalize_citations(text), text);
    }

    #[test]
    fn test_partial_marker_collapses_eagerly() {
        // Mid-stream an unterminated marker already loses its doubled
        // bracket; the buffer re-scan repairs it once the rest arrives
        assert_eq!(normalize_citations("see [[citation:"), "see [citation:");
    }
}
