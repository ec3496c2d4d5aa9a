/// Tokenizer for the wildcard micro-syntax
///
/// Recognizes the two token forms embedded in free text:
///
/// - `{name}` — braced token, no modifiers
/// - `[name]`, `[N:name]`, `[name:C]`, `[N:a|b|c:C]` — bracketed token with
///   optional numeric prefix, `|`-alternation, and count suffix
///
/// Matching is a pure left-to-right scan with no side effects. A candidate
/// that does not form a valid token (empty name, stray brace/bracket inside
/// a name, non-numeric count) is left alone; the scan simply continues after
/// the opening delimiter so independent tokens are never consumed together.

/// A recognized wildcard token, decomposed into its parse fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// `{name}` — a fresh random draw on every occurrence.
    Braced { name: String },
    /// `[...]` — supports the numeric prefix, alternation and count suffix.
    Bracketed {
        /// `N:` prefix, if present. Choices are memoized per `(N, set)`
        /// within one resolution pass.
        number: Option<u64>,
        /// The raw name expression between the modifiers, `|`s included.
        expr: String,
        /// The trimmed, non-empty pieces of `expr` split on `|`. Empty when
        /// the expression is degenerate (for example `[ | ]`).
        alternatives: Vec<String>,
        /// `:C` suffix, clamped to a minimum of 1.
        count: u64,
    },
}

impl Token {
    /// The base set name used for storage lookups and scoring keys.
    ///
    /// For bracketed tokens this is the raw name expression; alternation is
    /// resolved at expansion time, not here.
    pub fn base_name(&self) -> &str {
        match self {
            Token::Braced { name } => name,
            Token::Bracketed { expr, .. } => expr,
        }
    }
}

/// A token match within a piece of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMatch {
    pub token: Token,
    /// Byte offset of the opening delimiter.
    pub start: usize,
    /// Byte offset just past the closing delimiter.
    pub end: usize,
    /// The matched text, delimiters included.
    pub text: String,
}

/// Characters that may not appear inside a set name.
fn is_name_terminator(form: char, ch: char) -> bool {
    match form {
        '{' => ch == '}',
        _ => ch == ']' || ch == ':',
    }
}

fn is_name_invalid(ch: char) -> bool {
    matches!(ch, '{' | '}' | '[' | ']' | '\n' | '\r')
}

/// Find the next token in `text` at or after byte offset `from`.
///
/// Returns `None` when no further token exists. Pure function of its input.
pub fn find_next_token(text: &str, from: usize) -> Option<TokenMatch> {
    let bytes = text.as_bytes();
    let mut pos = from;
    while pos < bytes.len() {
        // Delimiters are ASCII, so a byte scan is safe on UTF-8 input.
        match bytes[pos] {
            b'{' => {
                if let Some(m) = match_braced(text, pos) {
                    return Some(m);
                }
                pos += 1;
            }
            b'[' => {
                if let Some(m) = match_bracketed(text, pos) {
                    return Some(m);
                }
                pos += 1;
            }
            _ => pos += 1,
        }
    }
    None
}

/// Find the `index`-th token (1-based) by left-to-right scan.
pub fn find_nth_token(text: &str, index: usize) -> Option<TokenMatch> {
    if index == 0 {
        return None;
    }
    let mut seen = 0;
    let mut offset = 0;
    while let Some(m) = find_next_token(text, offset) {
        seen += 1;
        if seen == index {
            return Some(m);
        }
        offset = m.end;
    }
    None
}

/// Parse `text` as a single token anchored at its start.
///
/// Used by the score updater to re-derive a set name from the originally
/// typed token text (for example `"[colors]"`).
pub fn parse_token(text: &str) -> Option<Token> {
    let m = find_next_token(text, 0)?;
    if m.start != 0 {
        return None;
    }
    Some(m.token)
}

/// True when `text` contains at least one recognizable token.
pub fn contains_token(text: &str) -> bool {
    find_next_token(text, 0).is_some()
}

fn match_braced(text: &str, open: usize) -> Option<TokenMatch> {
    let inner = &text[open + 1..];
    let mut name_end = None;
    for (i, ch) in inner.char_indices() {
        if ch == '}' {
            name_end = Some(i);
            break;
        }
        if is_name_invalid(ch) {
            return None;
        }
    }
    let name_end = name_end?;
    let name = &inner[..name_end];
    if name.is_empty() {
        return None;
    }
    // `{N:...}` belongs to the surrounding filename-template syntax, not to
    // the wildcard grammar. Leave it for that engine.
    if has_numeric_colon_prefix(name) {
        return None;
    }
    let end = open + 1 + name_end + 1;
    Some(TokenMatch {
        token: Token::Braced {
            name: name.to_string(),
        },
        start: open,
        end,
        text: text[open..end].to_string(),
    })
}

fn match_bracketed(text: &str, open: usize) -> Option<TokenMatch> {
    let inner = &text[open + 1..];

    // Optional `N:` prefix.
    let mut cursor = 0;
    let digits_len = inner
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .map(|c| c.len_utf8())
        .sum::<usize>();
    let mut number = None;
    if digits_len > 0 && inner[digits_len..].starts_with(':') {
        // Only treat this as a prefix when a name follows the colon; an
        // out-of-range value degrades to a non-numbered token.
        let rest = &inner[digits_len + 1..];
        if !rest.starts_with(|c| is_name_terminator('[', c)) && !rest.is_empty() {
            number = inner[..digits_len].parse::<u64>().ok();
            cursor = digits_len + 1;
        }
    }

    // Name expression, up to `:` or `]`.
    let expr_start = cursor;
    let mut terminator = None;
    for (i, ch) in inner[cursor..].char_indices() {
        if is_name_terminator('[', ch) {
            terminator = Some((cursor + i, ch));
            break;
        }
        if is_name_invalid(ch) {
            return None;
        }
    }
    let (expr_end, term) = terminator?;
    let expr = &inner[expr_start..expr_end];
    if expr.is_empty() {
        return None;
    }

    // Optional `:C` count suffix.
    let mut count = 1u64;
    let close;
    if term == ':' {
        let suffix = &inner[expr_end + 1..];
        let count_len = suffix
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .map(|c| c.len_utf8())
            .sum::<usize>();
        if count_len == 0 || !suffix[count_len..].starts_with(']') {
            return None;
        }
        count = suffix[..count_len].parse::<u64>().unwrap_or(1).max(1);
        close = expr_end + 1 + count_len;
    } else {
        close = expr_end;
    }

    let alternatives = expr
        .split('|')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    let end = open + 1 + close + 1;
    Some(TokenMatch {
        token: Token::Bracketed {
            number,
            expr: expr.to_string(),
            alternatives,
            count,
        },
        start: open,
        end,
        text: text[open..end].to_string(),
    })
}

fn has_numeric_colon_prefix(name: &str) -> bool {
    let digits = name.chars().take_while(|c| c.is_ascii_digit()).count();
    digits > 0 && name[digits..].starts_with(':')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bracketed(number: Option<u64>, expr: &str, alts: &[&str], count: u64) -> Token {
        Token::Bracketed {
            number,
            expr: expr.to_string(),
            alternatives: alts.iter().map(|s| s.to_string()).collect(),
            count,
        }
    }

    #[test]
    fn test_braced_token() {
        let m = find_next_token("a {colors} car", 0).unwrap();
        assert_eq!(
            m.token,
            Token::Braced {
                name: "colors".to_string()
            }
        );
        assert_eq!((m.start, m.end), (2, 10));
        assert_eq!(m.text, "{colors}");
    }

    #[test]
    fn test_braced_numeric_prefix_is_not_a_token() {
        // {1:...} is filename-template syntax.
        assert!(find_next_token("{1:size}", 0).is_none());
        // But a name that merely starts with digits is fine.
        assert!(find_next_token("{1990s}", 0).is_some());
    }

    #[test]
    fn test_bracketed_plain() {
        let m = find_next_token("[colors]", 0).unwrap();
        assert_eq!(m.token, bracketed(None, "colors", &["colors"], 1));
    }

    #[test]
    fn test_bracketed_numbered() {
        let m = find_next_token("[1:artists]", 0).unwrap();
        assert_eq!(m.token, bracketed(Some(1), "artists", &["artists"], 1));
    }

    #[test]
    fn test_bracketed_count() {
        let m = find_next_token("[colors:3]", 0).unwrap();
        assert_eq!(m.token, bracketed(None, "colors", &["colors"], 3));
    }

    #[test]
    fn test_bracketed_all_modifiers() {
        let m = find_next_token("[2:adjectives|artists:4]", 0).unwrap();
        assert_eq!(
            m.token,
            bracketed(
                Some(2),
                "adjectives|artists",
                &["adjectives", "artists"],
                4
            )
        );
    }

    #[test]
    fn test_count_zero_clamps_to_one() {
        let m = find_next_token("[colors:0]", 0).unwrap();
        assert_eq!(m.token, bracketed(None, "colors", &["colors"], 1));
    }

    #[test]
    fn test_numeric_name_without_colon() {
        let m = find_next_token("[123]", 0).unwrap();
        assert_eq!(m.token, bracketed(None, "123", &["123"], 1));
    }

    #[test]
    fn test_degenerate_alternation() {
        let m = find_next_token("[ | ]", 0).unwrap();
        assert_eq!(m.token, bracketed(None, " | ", &[], 1));
    }

    #[test]
    fn test_non_numeric_count_is_not_a_token() {
        assert!(find_next_token("[name:abc]", 0).is_none());
    }

    #[test]
    fn test_unterminated_forms() {
        assert!(find_next_token("{open", 0).is_none());
        assert!(find_next_token("[open", 0).is_none());
        assert!(find_next_token("plain text", 0).is_none());
        assert!(find_next_token("{}", 0).is_none());
        assert!(find_next_token("[]", 0).is_none());
    }

    #[test]
    fn test_invalid_candidate_does_not_swallow_next_token() {
        // The stray '{' is skipped; the bracketed token after it still matches.
        let m = find_next_token("{oops [colors]", 0).unwrap();
        assert_eq!(m.token, bracketed(None, "colors", &["colors"], 1));
        assert_eq!(m.start, 6);
    }

    #[test]
    fn test_find_nth_token() {
        let text = "[a] and {b} and [2:c]";
        assert_eq!(find_nth_token(text, 1).unwrap().text, "[a]");
        assert_eq!(find_nth_token(text, 2).unwrap().text, "{b}");
        assert_eq!(find_nth_token(text, 3).unwrap().text, "[2:c]");
        assert!(find_nth_token(text, 4).is_none());
        assert!(find_nth_token(text, 0).is_none());
    }

    #[test]
    fn test_parse_token_anchored() {
        assert_eq!(
            parse_token("[colors]").unwrap().base_name(),
            "colors"
        );
        assert_eq!(parse_token("{colors}").unwrap().base_name(), "colors");
        assert!(parse_token("x [colors]").is_none());
        assert!(parse_token("no token").is_none());
    }

    #[test]
    fn test_utf8_names() {
        let m = find_next_token("ein [Künstler] Bild", 0).unwrap();
        assert_eq!(m.token.base_name(), "Künstler");
        assert_eq!(m.text, "[Künstler]");
    }
}
