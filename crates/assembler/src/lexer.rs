//! Text chopping: physical lines to logical lines, logical lines to
//! argument tokens. Tokens keep their surface form (`"..."`, `(...)`,
//! `[...]`, `{...}` stay intact); the parser gives them meaning.

use crate::error::AsmError;

/// Splits source text into cleaned logical lines, each paired with the
/// 1-based number of its first physical line. A trailing backslash joins
/// the next physical line; `//` comments and runs of whitespace are
/// removed outside double-quoted strings; blank lines are dropped.
pub(crate) fn logical_lines(source: &str) -> Vec<(usize, String)> {
    let mut lines = Vec::new();
    let mut pending = String::new();
    let mut start_line = 0;

    for (idx, raw) in source.lines().enumerate() {
        if pending.is_empty() {
            start_line = idx + 1;
        }
        if let Some(head) = raw.strip_suffix('\\') {
            pending.push_str(head);
            pending.push(' ');
            continue;
        }
        pending.push_str(raw);
        let cleaned = clean_line(&pending);
        pending.clear();
        if !cleaned.is_empty() {
            lines.push((start_line, cleaned));
        }
    }
    if !pending.is_empty() {
        // a trailing backslash on the final line has nothing to join
        let cleaned = clean_line(&pending);
        if !cleaned.is_empty() {
            lines.push((start_line, cleaned));
        }
    }
    lines
}

fn clean_line(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut last_space = true;
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            last_space = false;
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                last_space = false;
                out.push(c);
            }
            '/' if chars.peek() == Some(&'/') => break,
            c if c.is_whitespace() => {
                if !last_space {
                    out.push(' ');
                    last_space = true;
                }
            }
            c => {
                last_space = false;
                out.push(c);
            }
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}

/// Splits a logical line on spaces and commas into argument tokens.
/// `(...)`, `[...]`, `{...}` groups and double-quoted strings are kept
/// as single tokens; bracket kinds share one depth count, so a kind
/// mismatch surfaces later as a malformed expression.
pub(crate) fn split_tokens(text: &str, line: usize) -> Result<Vec<String>, AsmError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for c in text.chars() {
        if in_string {
            current.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                current.push(c);
            }
            '(' | '[' | '{' => {
                depth += 1;
                current.push(c);
            }
            ')' | ']' | '}' => {
                if depth == 0 {
                    return Err(AsmError::Unbalanced { line });
                }
                depth -= 1;
                current.push(c);
            }
            ' ' | ',' if depth == 0 => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }
    if in_string {
        return Err(AsmError::UnterminatedString { line });
    }
    if depth != 0 {
        return Err(AsmError::Unbalanced { line });
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    Ok(tokens)
}

/// Splits array literal contents on top-level colons. Empty segments are
/// kept so `[a::b]` still has three slots.
pub(crate) fn split_colons(text: &str, line: usize) -> Result<Vec<String>, AsmError> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for c in text.chars() {
        if in_string {
            current.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                current.push(c);
            }
            '(' | '[' | '{' => {
                depth += 1;
                current.push(c);
            }
            ')' | ']' | '}' => {
                if depth == 0 {
                    return Err(AsmError::Unbalanced { line });
                }
                depth -= 1;
                current.push(c);
            }
            ':' if depth == 0 => parts.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    if in_string {
        return Err(AsmError::UnterminatedString { line });
    }
    if depth != 0 {
        return Err(AsmError::Unbalanced { line });
    }
    parts.push(current);
    Ok(parts)
}

/// Resolves `\n`, `\"`, `\'` and `\\` inside a quoted string body.
/// Unrecognized pairs pass through untouched.
pub(crate) fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logical_lines_strip_comments_and_blanks() {
        let source = "PRINTV 1 // say one\n\n  // only a comment\nPRINTV   2\n";
        let lines = logical_lines(source);
        assert_eq!(
            lines,
            vec![(1, "PRINTV 1".to_string()), (4, "PRINTV 2".to_string())]
        );
    }

    #[test]
    fn backslash_joins_and_reports_the_first_line() {
        let source = "SETVAR \"x\" NULL \\\n 5\nPRINTV x";
        let lines = logical_lines(source);
        assert_eq!(
            lines,
            vec![
                (1, "SETVAR \"x\" NULL 5".to_string()),
                (3, "PRINTV x".to_string())
            ]
        );
    }

    #[test]
    fn comment_markers_inside_strings_survive() {
        let lines = logical_lines("PRINTV \"http://x\" // real comment");
        assert_eq!(lines, vec![(1, "PRINTV \"http://x\"".to_string())]);
    }

    #[test]
    fn spaces_inside_strings_are_not_collapsed() {
        let lines = logical_lines("PRINTV \"a   b\"");
        assert_eq!(lines, vec![(1, "PRINTV \"a   b\"".to_string())]);
    }

    #[test]
    fn tokens_split_on_spaces_and_commas() {
        let tokens = split_tokens("SETVAR \"x\" NULL,5", 1).unwrap();
        assert_eq!(tokens, vec!["SETVAR", "\"x\"", "NULL", "5"]);
    }

    #[test]
    fn bracket_groups_stay_atomic() {
        let tokens = split_tokens("PRINTV (ADDNUM 1 2) [1:2] {RETURN 5}", 1).unwrap();
        assert_eq!(
            tokens,
            vec!["PRINTV", "(ADDNUM 1 2)", "[1:2]", "{RETURN 5}"]
        );
    }

    #[test]
    fn quoted_separators_stay_in_their_token() {
        let tokens = split_tokens("PRINTV \"a, b\" \"c d\"", 1).unwrap();
        assert_eq!(tokens, vec!["PRINTV", "\"a, b\"", "\"c d\""]);
    }

    #[test]
    fn nested_brackets_count_as_one_token() {
        let tokens = split_tokens("RETURN (ADDNUM (MULNUM 2 3) 4)", 1).unwrap();
        assert_eq!(tokens, vec!["RETURN", "(ADDNUM (MULNUM 2 3) 4)"]);
    }

    #[test]
    fn unbalanced_brackets_are_rejected() {
        assert_eq!(
            split_tokens("PRINTV (ADDNUM 1 2", 4),
            Err(AsmError::Unbalanced { line: 4 })
        );
        assert_eq!(
            split_tokens("PRINTV 1)", 4),
            Err(AsmError::Unbalanced { line: 4 })
        );
    }

    #[test]
    fn unterminated_strings_are_rejected() {
        assert_eq!(
            split_tokens("PRINTV \"oops", 9),
            Err(AsmError::UnterminatedString { line: 9 })
        );
    }

    #[test]
    fn colon_split_respects_quotes_and_brackets() {
        let parts = split_colons("1:\"a:b\":[2:3]", 1).unwrap();
        assert_eq!(parts, vec!["1", "\"a:b\"", "[2:3]"]);
    }

    #[test]
    fn colon_split_keeps_empty_segments() {
        let parts = split_colons("a::b", 1).unwrap();
        assert_eq!(parts, vec!["a", "", "b"]);
    }

    #[test]
    fn unescape_resolves_known_pairs() {
        assert_eq!(unescape(r"a\nb"), "a\nb");
        assert_eq!(unescape(r#"say \"hi\""#), "say \"hi\"");
        assert_eq!(unescape(r"it\'s"), "it's");
        assert_eq!(unescape(r"c:\\temp"), r"c:\temp");
    }

    #[test]
    fn unescape_keeps_unknown_pairs() {
        assert_eq!(unescape(r"a\qb"), r"a\qb");
    }
}
