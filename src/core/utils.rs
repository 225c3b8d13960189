use std::sync::OnceLock;

use regex::Regex;

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

fn space_before_punct_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+([,.;:!?])").unwrap())
}

/// Collapses whitespace runs and drops spaces left in front of punctuation,
/// the usual residue of copying a sentence out of a subtitle or e-book.
pub fn clean_context(text: &str) -> String {
    let collapsed = whitespace_re().replace_all(text.trim(), " ");
    space_before_punct_re().replace_all(&collapsed, "$1").into_owned()
}

/// Wraps a value for an Anki search query, escaping embedded double quotes.
pub fn quote_query_value(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_context_collapses_whitespace() {
        assert_eq!(clean_context("Hello   world"), "Hello world");
        assert_eq!(clean_context("  line\n\tbreak  "), "line break");
    }

    #[test]
    fn test_clean_context_removes_space_before_punct() {
        assert_eq!(clean_context("Hello , world !"), "Hello, world!");
        assert_eq!(clean_context(""), "");
    }

    #[test]
    fn test_quote_query_value() {
        assert_eq!(quote_query_value("run"), "\"run\"");
        assert_eq!(quote_query_value("say \"hi\""), "\"say \\\"hi\\\"\"");
    }
}
