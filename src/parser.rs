//! Dump lexer and statement splitter using nom.
//!
//! A MySQL dump is cut into statements at `;`, except where the `;` sits
//! inside a quoted string, a backtick identifier or a comment.
//!
//! ```text
//! INSERT INTO t VALUES ('a;b'); -- done; really
//! ─────┬───── ─────┬── ──┬──  ┬ ──────┬───────
//!      │           │     │    │       └── Line comment (elided)
//!      │           │     │    └── Terminator
//!      │           │     └── Quoted (';' is data)
//!      │           └── Code
//!      └── Code
//! ```
//!
//! Plain comments are replaced by a single space. Conditional comments
//! (`/*!40101 ... */`) are kept verbatim so the statement filter can see
//! them. An unterminated quote or comment swallows the rest of the input,
//! which then becomes the final statement.

use std::fmt;
use std::fmt::Write as _;

use nom::{
    branch::alt,
    bytes::complete::{tag, take_till, take_until, take_while1},
    character::complete::{anychar, char, multispace1, one_of},
    combinator::{eof, map, opt, peek, recognize},
    sequence::terminated,
    IResult,
};
use tracing::warn;

/// One lexical unit of a dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    /// Anything outside quotes and comments.
    Code(&'a str),
    /// A `'...'`, `"..."` or `` `...` `` run. `body` excludes the quotes.
    Quoted {
        quote: char,
        body: &'a str,
        terminated: bool,
    },
    /// A `--`, `#` or `/* */` comment, including its markers.
    Comment {
        text: &'a str,
        conditional: bool,
        terminated: bool,
    },
    /// A statement-ending `;`.
    Terminator,
}

impl Token<'_> {
    /// Whether the token ran into end-of-input before its closing marker.
    pub fn is_unterminated(&self) -> bool {
        matches!(
            self,
            Token::Quoted { terminated: false, .. } | Token::Comment { terminated: false, .. }
        )
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Code(s) => f.write_str(s),
            Token::Quoted {
                quote,
                body,
                terminated,
            } => {
                write!(f, "{}{}", quote, body)?;
                if *terminated {
                    write!(f, "{}", quote)?;
                }
                Ok(())
            }
            Token::Comment { text, .. } => f.write_str(text),
            Token::Terminator => f.write_str(";"),
        }
    }
}

/// Lazily tokenize a dump.
pub fn tokenize(input: &str) -> Tokens<'_> {
    Tokens { rest: input }
}

/// Iterator over the tokens of a dump.
pub struct Tokens<'a> {
    rest: &'a str,
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        if self.rest.is_empty() {
            return None;
        }
        match parse_token(self.rest) {
            Ok((rest, tok)) => {
                self.rest = rest;
                Some(tok)
            }
            Err(_) => {
                let tok = Token::Code(self.rest);
                self.rest = "";
                Some(tok)
            }
        }
    }
}

/// Lazily split a dump into trimmed, non-empty statements without their `;`.
///
/// # Example
///
/// ```
/// use mysql2sqlite::parser::split;
///
/// let stmts: Vec<String> = split("SELECT 'a;b'; SELECT 2;").collect();
/// assert_eq!(stmts, vec!["SELECT 'a;b'", "SELECT 2"]);
/// ```
pub fn split(input: &str) -> Statements<'_> {
    Statements {
        tokens: tokenize(input),
    }
}

/// Iterator over the statements of a dump.
pub struct Statements<'a> {
    tokens: Tokens<'a>,
}

impl Iterator for Statements<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let mut stmt = String::new();
        loop {
            let Some(tok) = self.tokens.next() else {
                return finish(&stmt);
            };
            if tok.is_unterminated() {
                warn!("Unterminated quote or comment; treating the rest of the input as one statement");
            }
            match tok {
                Token::Terminator => {
                    if let Some(done) = finish(&stmt) {
                        return Some(done);
                    }
                    stmt.clear();
                }
                Token::Comment {
                    conditional: false, ..
                } => stmt.push(' '),
                tok => {
                    let _ = write!(stmt, "{}", tok);
                }
            }
        }
    }
}

fn finish(stmt: &str) -> Option<String> {
    let trimmed = stmt.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Parse the next token.
fn parse_token(input: &str) -> IResult<&str, Token<'_>> {
    alt((
        parse_quoted,
        parse_line_comment,
        parse_block_comment,
        map(char(';'), |_| Token::Terminator),
        map(take_while1(|c: char| !is_special(c)), Token::Code),
        map(recognize(anychar), Token::Code),
    ))(input)
}

fn is_special(c: char) -> bool {
    matches!(c, '\'' | '"' | '`' | ';' | '-' | '#' | '/')
}

/// Parse a quoted run. Backslash escapes apply to `'` and `"`; all three
/// quote kinds accept a doubled quote as an escape.
fn parse_quoted(input: &str) -> IResult<&str, Token<'_>> {
    let (rest, quote) = one_of("'\"`")(input)?;
    let mut chars = rest.char_indices();
    while let Some((i, c)) = chars.next() {
        if c == '\\' && quote != '`' {
            chars.next();
        } else if c == quote {
            if rest[i + 1..].starts_with(quote) {
                chars.next();
            } else {
                return Ok((
                    &rest[i + 1..],
                    Token::Quoted {
                        quote,
                        body: &rest[..i],
                        terminated: true,
                    },
                ));
            }
        }
    }
    Ok((
        "",
        Token::Quoted {
            quote,
            body: rest,
            terminated: false,
        },
    ))
}

/// Parse `-- ...` (dash-dash must be followed by whitespace) or `# ...`.
fn parse_line_comment(input: &str) -> IResult<&str, Token<'_>> {
    let dash_dash = terminated(tag("--"), peek(alt((multispace1, eof))));
    map(
        recognize(terminated(alt((dash_dash, tag("#"))), take_till(|c: char| c == '\n'))),
        |text| Token::Comment {
            text,
            conditional: false,
            terminated: true,
        },
    )(input)
}

/// Parse `/* ... */` or the conditional `/*! ... */` form.
fn parse_block_comment(input: &str) -> IResult<&str, Token<'_>> {
    let (body, _) = tag("/*")(input)?;
    let conditional = body.starts_with('!');
    let (rest, closed) = opt(terminated(take_until("*/"), tag("*/")))(body)?;
    match closed {
        Some(_) => {
            let text = &input[..input.len() - rest.len()];
            Ok((
                rest,
                Token::Comment {
                    text,
                    conditional,
                    terminated: true,
                },
            ))
        }
        None => Ok((
            "",
            Token::Comment {
                text: input,
                conditional,
                terminated: false,
            },
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stmts(input: &str) -> Vec<String> {
        split(input).collect()
    }

    #[test]
    fn test_simple_split() {
        assert_eq!(
            stmts("CREATE TABLE a (id INT);\nINSERT INTO a VALUES (1);\n"),
            vec!["CREATE TABLE a (id INT)", "INSERT INTO a VALUES (1)"]
        );
    }

    #[test]
    fn test_empty_segments_dropped() {
        assert_eq!(stmts(" ;;\n ; SELECT 1 ;  ; "), vec!["SELECT 1"]);
        assert!(stmts("").is_empty());
        assert!(stmts("   \n\t").is_empty());
    }

    #[test]
    fn test_last_statement_without_terminator() {
        assert_eq!(stmts("SELECT 1; SELECT 2"), vec!["SELECT 1", "SELECT 2"]);
    }

    #[test]
    fn test_semicolon_in_single_quotes() {
        assert_eq!(
            stmts("INSERT INTO t VALUES ('a;b'); SELECT 1;"),
            vec!["INSERT INTO t VALUES ('a;b')", "SELECT 1"]
        );
    }

    #[test]
    fn test_escaped_quote_does_not_close() {
        assert_eq!(
            stmts(r"INSERT INTO t VALUES ('it\'s; ok'); SELECT 1;"),
            vec![r"INSERT INTO t VALUES ('it\'s; ok')", "SELECT 1"]
        );
        assert_eq!(
            stmts("INSERT INTO t VALUES ('it''s; ok'); SELECT 1;"),
            vec!["INSERT INTO t VALUES ('it''s; ok')", "SELECT 1"]
        );
    }

    #[test]
    fn test_escaped_backslash_closes() {
        assert_eq!(
            stmts(r"INSERT INTO t VALUES ('C:\\'); SELECT 1;"),
            vec![r"INSERT INTO t VALUES ('C:\\')", "SELECT 1"]
        );
    }

    #[test]
    fn test_semicolon_in_double_quotes_and_backticks() {
        assert_eq!(
            stmts("INSERT INTO `a;b` VALUES (\"x;y\"); SELECT 1"),
            vec!["INSERT INTO `a;b` VALUES (\"x;y\")", "SELECT 1"]
        );
    }

    #[test]
    fn test_comments_elided() {
        let input = "-- dump header; v1\nCREATE TABLE a (id INT); # trailing; note\n/* block; comment */ SELECT 1;";
        assert_eq!(stmts(input), vec!["CREATE TABLE a (id INT)", "SELECT 1"]);
    }

    #[test]
    fn test_comment_only_segment_dropped() {
        assert_eq!(stmts("-- just a comment\n;\nSELECT 1;"), vec!["SELECT 1"]);
    }

    #[test]
    fn test_conditional_comment_kept() {
        assert_eq!(
            stmts("/*!40101 SET NAMES utf8; */;\nSELECT 1;"),
            vec!["/*!40101 SET NAMES utf8; */", "SELECT 1"]
        );
    }

    #[test]
    fn test_dash_without_space_is_code() {
        assert_eq!(stmts("SELECT 5--1;"), vec!["SELECT 5--1"]);
        assert_eq!(stmts("SELECT 10/2-1;"), vec!["SELECT 10/2-1"]);
    }

    #[test]
    fn test_unterminated_quote_takes_rest() {
        assert_eq!(
            stmts("SELECT 1; INSERT INTO t VALUES ('oops); SELECT 2;"),
            vec!["SELECT 1", "INSERT INTO t VALUES ('oops); SELECT 2;"]
        );
    }

    #[test]
    fn test_unterminated_block_comment() {
        assert_eq!(stmts("SELECT 1; /*! SET x; SELECT 2"), vec!["SELECT 1", "/*! SET x; SELECT 2"]);
    }

    #[test]
    fn test_token_round_trip() {
        let input = "INSERT INTO `t` VALUES ('a''b', \"c\\\"d\"); -- x\n/*!1 y */";
        let rebuilt: String = tokenize(input).map(|t| t.to_string()).collect();
        assert_eq!(rebuilt, input);
    }
}
