//! String literal and identifier masking.
//!
//! Rewrite rules are textual, so quoted data must be hidden from them: an
//! INSERT value such as `'int(11) text'` is not a column type. Each
//! terminated `'...'` / `"..."` literal is replaced by an indexed
//! placeholder between its original quotes, and put back once the rules have
//! run. Putting it back is also where backslash-escaped quotes become
//! SQLite's doubled quotes.
//!
//! Backtick identifiers get a placeholder of their own, without quotes, so a
//! column called `` `key` `` or `` `int value` `` is never read as a keyword
//! or a type. They come back unquoted, or double-quoted when they are not a
//! plain word.

use std::borrow::Cow;
use std::fmt::Write as _;

use crate::parser::{tokenize, Token};

/// Brackets the index of a masked literal, inside the literal's quotes.
pub const LITERAL_MARK: char = '\u{E000}';

/// Brackets the index of a masked backtick identifier.
pub const IDENT_MARK: char = '\u{E001}';

/// A statement with its literal and identifier bodies taken out.
#[derive(Debug)]
pub struct Masked<'a> {
    text: String,
    spans: Vec<(char, &'a str)>,
}

impl<'a> Masked<'a> {
    /// The statement text with placeholders in place of masked bodies.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Put the masked bodies back into `text`, normalizing literal escapes
    /// and unquoting identifiers.
    pub fn restore(&self, text: &str) -> String {
        if self.spans.is_empty() {
            return text.to_string();
        }

        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find(|c| c == LITERAL_MARK || c == IDENT_MARK) {
            out.push_str(&rest[..start]);
            let mark = rest[start..].chars().next().unwrap_or(LITERAL_MARK);
            let after = &rest[start + mark.len_utf8()..];
            let span = after.find(mark).and_then(|end| {
                let (quote, body) = after[..end].parse::<usize>().ok().and_then(|i| self.spans.get(i))?;
                Some((end, *quote, *body))
            });
            match span {
                Some((end, '`', body)) if mark == IDENT_MARK => {
                    out.push_str(&unquote_identifier(body));
                    rest = &after[end + mark.len_utf8()..];
                }
                Some((end, quote, body)) if mark == LITERAL_MARK && quote != '`' => {
                    out.push_str(&normalize_escapes(body, quote));
                    rest = &after[end + mark.len_utf8()..];
                }
                _ => {
                    out.push(mark);
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }
}

/// Mask the literals and backtick identifiers of a single statement. Plain
/// comments are dropped; conditional comments stay visible to the rules.
pub fn mask(stmt: &str) -> Masked<'_> {
    let mut text = String::with_capacity(stmt.len());
    let mut spans = Vec::new();

    for tok in tokenize(stmt) {
        match tok {
            Token::Quoted {
                quote: quote @ ('\'' | '"'),
                body,
                terminated: true,
            } => {
                let _ = write!(text, "{q}{s}{i}{s}{q}", q = quote, s = LITERAL_MARK, i = spans.len());
                spans.push((quote, body));
            }
            Token::Quoted {
                quote: '`',
                body,
                terminated: true,
            } => {
                let _ = write!(text, "{s}{i}{s}", s = IDENT_MARK, i = spans.len());
                spans.push(('`', body));
            }
            Token::Comment {
                conditional: false, ..
            } => text.push(' '),
            tok => {
                let _ = write!(text, "{}", tok);
            }
        }
    }

    Masked { text, spans }
}

/// SQLite keywords. An identifier spelled like one stays quoted.
const SQLITE_KEYWORDS: &[&str] = &[
    "ABORT", "ACTION", "ADD", "AFTER", "ALL", "ALTER", "ALWAYS", "ANALYZE", "AND", "AS", "ASC",
    "ATTACH", "AUTOINCREMENT", "BEFORE", "BEGIN", "BETWEEN", "BY", "CASCADE", "CASE", "CAST",
    "CHECK", "COLLATE", "COLUMN", "COMMIT", "CONFLICT", "CONSTRAINT", "CREATE", "CROSS",
    "CURRENT", "CURRENT_DATE", "CURRENT_TIME", "CURRENT_TIMESTAMP", "DATABASE", "DEFAULT",
    "DEFERRABLE", "DEFERRED", "DELETE", "DESC", "DETACH", "DISTINCT", "DO", "DROP", "EACH",
    "ELSE", "END", "ESCAPE", "EXCEPT", "EXCLUDE", "EXCLUSIVE", "EXISTS", "EXPLAIN", "FAIL",
    "FILTER", "FIRST", "FOLLOWING", "FOR", "FOREIGN", "FROM", "FULL", "GENERATED", "GLOB",
    "GROUP", "GROUPS", "HAVING", "IF", "IGNORE", "IMMEDIATE", "IN", "INDEX", "INDEXED",
    "INITIALLY", "INNER", "INSERT", "INSTEAD", "INTERSECT", "INTO", "IS", "ISNULL", "JOIN",
    "KEY", "LAST", "LEFT", "LIKE", "LIMIT", "MATCH", "MATERIALIZED", "NATURAL", "NO", "NOT",
    "NOTHING", "NOTNULL", "NULL", "NULLS", "OF", "OFFSET", "ON", "OR", "ORDER", "OTHERS",
    "OUTER", "OVER", "PARTITION", "PLAN", "PRAGMA", "PRECEDING", "PRIMARY", "QUERY", "RAISE",
    "RANGE", "RECURSIVE", "REFERENCES", "REGEXP", "REINDEX", "RELEASE", "RENAME", "REPLACE",
    "RESTRICT", "RETURNING", "RIGHT", "ROLLBACK", "ROW", "ROWS", "SAVEPOINT", "SELECT", "SET",
    "TABLE", "TEMP", "TEMPORARY", "THEN", "TIES", "TO", "TRANSACTION", "TRIGGER", "UNBOUNDED",
    "UNION", "UNIQUE", "UPDATE", "USING", "VACUUM", "VALUES", "VIEW", "VIRTUAL", "WHEN",
    "WHERE", "WINDOW", "WITH", "WITHOUT",
];

/// The body of a backtick identifier as SQLite spells it: bare when it is a
/// plain word and not a keyword, otherwise `"..."`.
pub fn unquote_identifier(body: &str) -> String {
    let ident = body.replace("``", "`");
    let plain = ident
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && ident.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        && !SQLITE_KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(&ident));
    if plain {
        ident
    } else {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }
}

/// Rewrite `\'` as `''` inside a `'`-quoted body (and `\"` as `""` inside a
/// `"`-quoted one). An escaped opposite quote loses its backslash. Every
/// other backslash pair is kept as written.
pub fn normalize_escapes(body: &str, quote: char) -> Cow<'_, str> {
    if !body.contains('\\') {
        return Cow::Borrowed(body);
    }

    let mut out = String::with_capacity(body.len() + 2);
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(next) if next == quote => {
                out.push(quote);
                out.push(quote);
            }
            Some(next @ ('\'' | '"')) => out.push(next),
            Some(next) => {
                out.push('\\');
                out.push(next);
            }
            None => out.push('\\'),
        }
    }
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_hides_bodies() {
        let masked = mask("INSERT INTO t VALUES ('int(11) text', \"x\")");
        assert!(!masked.text().contains("int(11)"));
        assert!(masked.text().starts_with("INSERT INTO t VALUES ('"));
        assert_eq!(masked.text().matches(LITERAL_MARK).count(), 4);
    }

    #[test]
    fn test_restore_round_trip() {
        let stmt = "INSERT INTO t VALUES ('a  b', 'c''d', \"e\")";
        let masked = mask(stmt);
        assert_eq!(masked.restore(masked.text()), stmt);
    }

    #[test]
    fn test_restore_after_rewrite() {
        let masked = mask("INSERT   INTO t VALUES ('keep   spaces')");
        let squeezed = masked.text().split_whitespace().collect::<Vec<_>>().join(" ");
        assert_eq!(masked.restore(&squeezed), "INSERT INTO t VALUES ('keep   spaces')");
    }

    #[test]
    fn test_backticks_masked_and_unquoted() {
        let masked = mask("CREATE TABLE `t` (`int value` INT, `key` TIME)");
        assert!(!masked.text().contains('`'));
        assert!(!masked.text().contains("int value"));
        assert!(!masked.text().contains("key"));
        assert_eq!(masked.text().matches(IDENT_MARK).count(), 6);
        assert_eq!(
            masked.restore(masked.text()),
            "CREATE TABLE t (\"int value\" INT, \"key\" TIME)"
        );
    }

    #[test]
    fn test_unquote_identifier() {
        assert_eq!(unquote_identifier("users"), "users");
        assert_eq!(unquote_identifier("order items"), "\"order items\"");
        assert_eq!(unquote_identifier("a``b"), "\"a`b\"");
        assert_eq!(unquote_identifier("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(unquote_identifier("1st"), "\"1st\"");
        assert_eq!(unquote_identifier("index"), "\"index\"");
        assert_eq!(unquote_identifier("Order"), "\"Order\"");
    }

    #[test]
    fn test_unterminated_backtick_left_visible() {
        let masked = mask("SELECT `oops");
        assert_eq!(masked.text(), "SELECT `oops");
    }

    #[test]
    fn test_plain_comment_dropped() {
        let masked = mask("SELECT 1 -- note\n, 2");
        assert_eq!(masked.text(), "SELECT 1  \n, 2");
    }

    #[test]
    fn test_normalize_escapes() {
        assert_eq!(normalize_escapes(r"it\'s", '\''), "it''s");
        assert_eq!(normalize_escapes(r#"say \"hi\""#, '\''), r#"say "hi""#);
        assert_eq!(normalize_escapes(r#"say \"hi\""#, '"'), r#"say ""hi"""#);
        assert_eq!(normalize_escapes(r"C:\\dir\n", '\''), r"C:\\dir\n");
        assert_eq!(normalize_escapes("plain", '\''), "plain");
    }

    #[test]
    fn test_escaped_quote_restored_doubled() {
        let masked = mask(r"INSERT INTO t VALUES ('it\'s')");
        assert_eq!(masked.restore(masked.text()), "INSERT INTO t VALUES ('it''s')");
    }
}
