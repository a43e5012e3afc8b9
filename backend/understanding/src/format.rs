//! Output format transforms applied to the final extracted text.

use serde::Serialize;
use textlens_core::OutputFormat;

pub const MARKDOWN_HEADING: &str = "# Extracted Text";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonPayload<'a> {
    text: &'a str,
    lines: Vec<&'a str>,
    word_count: usize,
}

/// Render `text` in the requested format.
pub fn apply_format(text: &str, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => text.to_string(),
        OutputFormat::Json => {
            let payload = JsonPayload {
                text,
                lines: text
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .collect(),
                word_count: text.split_whitespace().count(),
            };
            // Serializing borrowed strings and a count cannot fail
            serde_json::to_string_pretty(&payload).unwrap_or_default()
        }
        OutputFormat::Markdown => format!("{MARKDOWN_HEADING}\n\n{text}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_passes_through() {
        assert_eq!(apply_format("  a\n b ", OutputFormat::Text), "  a\n b ");
    }

    #[test]
    fn json_has_lines_and_word_count() {
        let out = apply_format("Hello\nWorld", OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["text"], "Hello\nWorld");
        assert_eq!(value["lines"], serde_json::json!(["Hello", "World"]));
        assert_eq!(value["wordCount"], 2);
        assert!(out.contains('\n'), "json output should be pretty-printed");
    }

    #[test]
    fn json_drops_blank_lines_and_trims() {
        let out = apply_format("  INVOICE #123 \n\n   Total: 40 EUR\n", OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["lines"], serde_json::json!(["INVOICE #123", "Total: 40 EUR"]));
        assert_eq!(value["wordCount"], 5);
    }

    #[test]
    fn markdown_prepends_heading() {
        let out = apply_format("Hello\nWorld", OutputFormat::Markdown);
        assert_eq!(out, "# Extracted Text\n\nHello\nWorld");
    }

    #[test]
    fn empty_text_json() {
        let out = apply_format("", OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["lines"], serde_json::json!([]));
        assert_eq!(value["wordCount"], 0);
    }
}
