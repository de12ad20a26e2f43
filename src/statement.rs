//! Statement classification and the directive filter.
//!
//! Classification is prefix matching on the upper-cased statement. A
//! directive prefix must never match real DML.

use std::fmt;

/// Directive prefixes that have no SQLite counterpart.
pub const DIRECTIVE_PREFIXES: &[&str] = &[
    "LOCK TABLES",
    "UNLOCK TABLES",
    "DELIMITER",
    "SET ",
    "/*!",
    "USE ",
    "DROP DATABASE",
    "CREATE DATABASE",
    "START TRANSACTION",
    "BEGIN",
    "COMMIT",
    "ROLLBACK",
];

/// The coarse class of a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    CreateTable,
    AlterTable,
    Dml,
    Directive,
    Other,
}

impl StatementKind {
    /// Whether structural DDL rewrites (types, keys, table options) apply.
    pub fn is_table_ddl(self) -> bool {
        matches!(self, StatementKind::CreateTable | StatementKind::AlterTable)
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatementKind::CreateTable => write!(f, "create-table"),
            StatementKind::AlterTable => write!(f, "alter-table"),
            StatementKind::Dml => write!(f, "dml"),
            StatementKind::Directive => write!(f, "directive"),
            StatementKind::Other => write!(f, "other"),
        }
    }
}

/// Classify a trimmed statement.
pub fn classify(stmt: &str) -> StatementKind {
    let upper = leading_upper(stmt);

    if is_directive_upper(&upper) {
        return StatementKind::Directive;
    }

    let mut words = upper.split_whitespace();
    match (words.next(), words.next(), words.next()) {
        (Some("CREATE"), Some("TABLE"), _) => StatementKind::CreateTable,
        (Some("CREATE"), Some("TEMPORARY"), Some("TABLE")) => StatementKind::CreateTable,
        (Some("ALTER"), Some("TABLE"), _) => StatementKind::AlterTable,
        (Some("INSERT" | "REPLACE" | "UPDATE" | "DELETE" | "SELECT" | "WITH"), _, _) => {
            StatementKind::Dml
        }
        _ => StatementKind::Other,
    }
}

/// Whether a statement should be kept for rewriting.
pub fn keep(stmt: &str) -> bool {
    !is_directive_upper(&leading_upper(stmt))
}

fn is_directive_upper(upper: &str) -> bool {
    DIRECTIVE_PREFIXES.iter().any(|p| upper.starts_with(p)) || is_bare_keyword(upper)
}

/// `SET`, `USE` followed by a tab or newline rather than a space.
fn is_bare_keyword(upper: &str) -> bool {
    let mut words = upper.split_whitespace();
    matches!(words.next(), Some("SET" | "USE")) && words.next().is_some()
}

/// Upper-case only the leading part of a statement; prefixes are short and
/// INSERT statements can be megabytes long.
fn leading_upper(stmt: &str) -> String {
    let end = stmt
        .char_indices()
        .nth(64)
        .map(|(i, _)| i)
        .unwrap_or(stmt.len());
    stmt[..end].to_uppercase()
}
