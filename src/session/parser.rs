use crate::core::CardError;

pub const CONTEXT_DIRECTIVE: &str = ":context";
pub const QUIT_DIRECTIVES: [&str; 2] = [":quit", ":q"];
pub const SEPARATOR: char = '|';

/// One parsed line of session input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionLine {
    /// Blank or context-only line; nothing to generate.
    Idle { carried: Option<String> },
    Entry { context: String, word: String, carried: Option<String> },
    Quit,
}

/// Parses `context | word`, a bare `word`, or a directive.
///
/// Only the `| word` shorthand falls back to the carried context. A bare word is
/// generated without context even when one is carried.
pub fn parse_session_line(line: &str, carried: Option<&str>) -> Result<SessionLine, CardError> {
    let stripped = line.trim();
    let unchanged = || carried.map(str::to_string);

    if stripped.is_empty() {
        return Ok(SessionLine::Idle { carried: unchanged() });
    }
    if QUIT_DIRECTIVES.contains(&stripped) {
        return Ok(SessionLine::Quit);
    }
    if let Some(rest) = stripped.strip_prefix(CONTEXT_DIRECTIVE) {
        if rest.is_empty() {
            return Ok(SessionLine::Idle { carried: unchanged() });
        }
        if rest.starts_with(char::is_whitespace) {
            let context = rest.trim();
            return Ok(SessionLine::Idle { carried: Some(context.to_string()) });
        }
    }

    let (context, word, separated) = match stripped.split_once(SEPARATOR) {
        Some((left, right)) => (left.trim(), right.trim(), true),
        None => ("", stripped, false),
    };

    if word.is_empty() {
        return Err(CardError::Validation("Provide a word/phrase after the separator.".into()));
    }

    if !context.is_empty() {
        return Ok(SessionLine::Entry {
            context: context.to_string(),
            word: word.to_string(),
            carried: Some(context.to_string()),
        });
    }

    let context = match (separated, carried) {
        (false, _) => String::new(),
        (true, Some(previous)) if !previous.is_empty() => previous.to_string(),
        (true, _) => {
            return Err(CardError::Validation(
                "Context is missing. Use ':context ...' or include it before '|'.".into(),
            ))
        }
    };
    Ok(SessionLine::Entry { context, word: word.to_string(), carried: unchanged() })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(context: &str, word: &str, carried: Option<&str>) -> SessionLine {
        SessionLine::Entry {
            context: context.to_string(),
            word: word.to_string(),
            carried: carried.map(str::to_string),
        }
    }

    #[test]
    fn test_context_and_word() {
        let parsed = parse_session_line("Some context | word", None).unwrap();
        assert_eq!(parsed, entry("Some context", "word", Some("Some context")));

        let replaced = parse_session_line("New one|word", Some("Old one")).unwrap();
        assert_eq!(replaced, entry("New one", "word", Some("New one")));
    }

    #[test]
    fn test_splits_on_first_separator_only() {
        let parsed = parse_session_line("a | b | c", None).unwrap();
        assert_eq!(parsed, entry("a", "b | c", Some("a")));
    }

    #[test]
    fn test_bare_word_has_no_context() {
        let parsed = parse_session_line("  word  ", None).unwrap();
        assert_eq!(parsed, entry("", "word", None));
    }

    #[test]
    fn test_bare_word_does_not_inherit_carried_context() {
        let parsed = parse_session_line("word", Some("Cached context")).unwrap();
        assert_eq!(parsed, entry("", "word", Some("Cached context")));
    }

    #[test]
    fn test_separator_shorthand_reuses_carried_context() {
        let parsed = parse_session_line("| word", Some("Cached context")).unwrap();
        assert_eq!(parsed, entry("Cached context", "word", Some("Cached context")));
    }

    #[test]
    fn test_separator_without_any_context_fails() {
        let err = parse_session_line("| word", None).unwrap_err();
        assert!(matches!(err, CardError::Validation(_)));
        assert!(parse_session_line("|word", Some("")).is_err());
    }

    #[test]
    fn test_empty_word_fails() {
        let err = parse_session_line("Some context |  ", Some("x")).unwrap_err();
        assert!(matches!(err, CardError::Validation(_)));
    }

    #[test]
    fn test_blank_line_keeps_carried_context() {
        assert_eq!(
            parse_session_line("   ", Some("kept")).unwrap(),
            SessionLine::Idle { carried: Some("kept".into()) }
        );
    }

    #[test]
    fn test_context_directive() {
        assert_eq!(
            parse_session_line(":context  The cat sat on the mat. ", None).unwrap(),
            SessionLine::Idle { carried: Some("The cat sat on the mat.".into()) }
        );
        assert_eq!(
            parse_session_line(":context", Some("kept")).unwrap(),
            SessionLine::Idle { carried: Some("kept".into()) }
        );
        assert_eq!(
            parse_session_line(":context   ", Some("kept")).unwrap(),
            SessionLine::Idle { carried: Some("kept".into()) }
        );
    }

    #[test]
    fn test_context_prefixed_word_is_not_a_directive() {
        let parsed = parse_session_line(":contextual", None).unwrap();
        assert_eq!(parsed, entry("", ":contextual", None));
    }

    #[test]
    fn test_quit_directives() {
        assert_eq!(parse_session_line(":quit", Some("x")).unwrap(), SessionLine::Quit);
        assert_eq!(parse_session_line("  :q ", None).unwrap(), SessionLine::Quit);
    }
}
