//! Tool-call directives embedded in model output.
//!
//! A reply is split into a token stream of plain text and
//! `<tool:NAME>ARGUMENTS</tool>` calls. Names match `[A-Za-z0-9_.-]+`;
//! arguments are free text and may span lines. Both are trimmed.

use regex_lite::Regex;
use std::sync::LazyLock;

static DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<tool:([a-zA-Z0-9_.\-]+)>(.*?)</tool>").expect("invalid directive pattern")
});

/// One piece of a model reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    ToolCall { name: String, args: String },
}

/// Split `text` into segments in source order. Empty text between
/// directives is dropped.
pub fn parse(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut cursor = 0;
    for caps in DIRECTIVE.captures_iter(text) {
        let (Some(whole), Some(name), Some(args)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        if whole.start() > cursor {
            segments.push(Segment::Text(text[cursor..whole.start()].to_string()));
        }
        segments.push(Segment::ToolCall {
            name: name.as_str().trim().to_string(),
            args: args.as_str().trim().to_string(),
        });
        cursor = whole.end();
    }
    if cursor < text.len() {
        segments.push(Segment::Text(text[cursor..].to_string()));
    }
    segments
}

/// Just the `(name, args)` pairs, in order.
pub fn tool_calls(text: &str) -> Vec<(String, String)> {
    parse(text)
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::ToolCall { name, args } => Some((name, args)),
            Segment::Text(_) => None,
        })
        .collect()
}

/// The text with every directive removed.
pub fn strip(text: &str) -> String {
    parse(text)
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Text(t) => Some(t),
            Segment::ToolCall { .. } => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_one_segment() {
        assert_eq!(parse("hello"), vec![Segment::Text("hello".into())]);
        assert!(parse("").is_empty());
    }

    #[test]
    fn directives_are_split_out_in_order() {
        let segments = parse("Listing: <tool:shell> ls -la </tool> then <tool:read_file>a.txt</tool>.");
        assert_eq!(
            segments,
            vec![
                Segment::Text("Listing: ".into()),
                Segment::ToolCall { name: "shell".into(), args: "ls -la".into() },
                Segment::Text(" then ".into()),
                Segment::ToolCall { name: "read_file".into(), args: "a.txt".into() },
                Segment::Text(".".into()),
            ]
        );
    }

    #[test]
    fn arguments_may_span_lines() {
        let calls = tool_calls("<tool:create_file>notes.txt|line one\nline two</tool>");
        assert_eq!(calls, vec![("create_file".into(), "notes.txt|line one\nline two".into())]);
    }

    #[test]
    fn dotted_and_dashed_names() {
        let calls = tool_calls("<tool:editor.diagnostics></tool><tool:my-tool_2>x</tool>");
        assert_eq!(
            calls,
            vec![("editor.diagnostics".into(), String::new()), ("my-tool_2".into(), "x".into())]
        );
    }

    #[test]
    fn matching_is_lazy() {
        let calls = tool_calls("<tool:a>1</tool> mid <tool:b>2</tool>");
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].1, "1");
    }

    #[test]
    fn malformed_directives_stay_text() {
        assert!(tool_calls("<tool:bad name>x</tool>").is_empty());
        assert!(tool_calls("<tool:shell>never closed").is_empty());
    }

    #[test]
    fn strip_removes_markup() {
        assert_eq!(strip("Done. <tool:shell>ls</tool>"), "Done. ");
        assert_eq!(strip("<tool:shell>ls</tool>"), "");
    }
}
