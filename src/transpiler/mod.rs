//! MySQL → SQLite transpiler.
//!
//! Drives a dump through the pipeline:
//!
//! ```text
//! dump ─► split ─► keep? ─► rewrite ─► emit ─► script
//! ```
//!
//! Statements are independent: nothing learned from one statement is
//! carried into the next, and the output keeps the input order.

pub mod literals;
pub mod rules;
pub mod typemap;

use std::borrow::Cow;
use std::fmt::Write as _;

use tracing::debug;

use crate::parser::{self, Token};
use crate::statement::{self, StatementKind};

pub use rules::{Rule, RuleSet, Scope, Step};
pub use typemap::{Affinity, TypeMapping, TYPE_MAP};

/// Trait for converting MySQL text to SQLite text.
pub trait ToSqlite {
    /// Convert this value to SQLite syntax.
    fn to_sqlite(&self, transpiler: &Transpiler) -> String;
}

impl ToSqlite for str {
    fn to_sqlite(&self, transpiler: &Transpiler) -> String {
        transpiler.convert(self)
    }
}

/// A compiled rule table, reusable across dumps.
#[derive(Debug, Clone, Default)]
pub struct Transpiler {
    rules: RuleSet,
}

impl Transpiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an explicit rule table.
    pub fn with_rules(rules: RuleSet) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Rewrite one kept statement into SQLite syntax.
    ///
    /// Never fails: clauses no rule knows about pass through unchanged.
    pub fn rewrite(&self, stmt: &str) -> String {
        let kind = statement::classify(stmt);
        let masked = literals::mask(stmt);

        let mut text = masked.text().to_string();
        for rule in self.rules.iter().filter(|r| r.applies_to(kind)) {
            if let Cow::Owned(out) = rule.apply(&text) {
                text = out;
            }
        }

        masked.restore(text.trim())
    }

    /// Lazily split, filter and rewrite a dump, in input order.
    pub fn statements<'a>(&'a self, dump: &'a str) -> impl Iterator<Item = String> + 'a {
        parser::split(dump)
            .filter(|stmt| {
                let keep = statement::keep(stmt);
                if !keep {
                    debug!("Dropping directive: {}", preview(stmt));
                }
                keep
            })
            .map(|stmt| {
                let out = self.rewrite(&stmt);
                if out != stmt {
                    debug!("Rewrote {}: {}", statement::classify(&stmt), preview(&out));
                }
                out
            })
            .filter(|stmt| !stmt.is_empty())
    }

    /// Convert a whole dump into an executable SQLite script.
    pub fn convert(&self, dump: &str) -> String {
        emit(self.statements(dump))
    }
}

/// Join statements with `;\n` and a final `;`. No statements, no output.
pub fn emit<I, S>(stmts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for stmt in stmts {
        let stmt = stmt.as_ref();
        if stmt.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push_str(";\n");
        }
        out.push_str(stmt);
    }
    if !out.is_empty() {
        out.push(';');
    }
    out
}

/// Lay a CREATE TABLE out one definition per line for display. Other
/// statements are returned as they are.
///
/// ```
/// use mysql2sqlite::transpiler::format_block;
///
/// assert_eq!(
///     format_block("CREATE TABLE t (id INTEGER, total decimal(10,2))"),
///     "CREATE TABLE t (\n  id INTEGER,\n  total decimal(10,2)\n)"
/// );
/// ```
pub fn format_block(stmt: &str) -> String {
    if statement::classify(stmt) != StatementKind::CreateTable {
        return stmt.to_string();
    }

    let mut out = String::with_capacity(stmt.len() + 64);
    let mut depth = 0usize;
    for tok in parser::tokenize(stmt) {
        let Token::Code(code) = tok else {
            let _ = write!(out, "{}", tok);
            continue;
        };
        let mut chars = code.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '(' => {
                    depth += 1;
                    out.push('(');
                    if depth == 1 {
                        out.push_str("\n  ");
                        while chars.next_if_eq(&' ').is_some() {}
                    }
                }
                ')' => {
                    if depth == 1 {
                        out.push('\n');
                    }
                    depth = depth.saturating_sub(1);
                    out.push(')');
                }
                ',' if depth == 1 => {
                    out.push_str(",\n  ");
                    while chars.next_if_eq(&' ').is_some() {}
                }
                c => out.push(c),
            }
        }
    }
    out
}

fn preview(stmt: &str) -> String {
    const MAX: usize = 80;
    match stmt.char_indices().nth(MAX) {
        Some((i, _)) => format!("{}…", &stmt[..i]),
        None => stmt.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rewrite(stmt: &str) -> String {
        Transpiler::new().rewrite(stmt)
    }

    #[test]
    fn test_auto_increment_table() {
        let t = Transpiler::new();
        assert_eq!(
            t.convert("CREATE TABLE t (id INT(11) NOT NULL AUTO_INCREMENT, name VARCHAR(50), PRIMARY KEY (id)) ENGINE=InnoDB;"),
            "CREATE TABLE t (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT);"
        );
    }

    #[test]
    fn test_enum_column() {
        let out = rewrite("CREATE TABLE t (`col` ENUM('a','b') NOT NULL DEFAULT 'a')");
        assert!(out.contains("col TEXT"), "{}", out);
        assert_eq!(out, "CREATE TABLE t (col TEXT NOT NULL DEFAULT 'a')");
    }

    #[test]
    fn test_lock_tables_dropped() {
        let t = Transpiler::new();
        assert_eq!(t.convert("LOCK TABLES t WRITE;"), "");
        assert_eq!(
            t.convert("LOCK TABLES t WRITE;\nINSERT INTO t VALUES (1);\nUNLOCK TABLES;"),
            "INSERT INTO t VALUES (1);"
        );
    }

    #[test]
    fn test_unique_key_clause() {
        let out = rewrite("CREATE TABLE t (email varchar(100) NOT NULL, UNIQUE KEY uq_name (email))");
        assert!(out.contains("UNIQUE(email)"), "{}", out);
    }

    #[test]
    fn test_no_comma_artifacts() {
        let out = rewrite(
            "CREATE TABLE t (a int(11) DEFAULT NULL COMMENT 'x', KEY idx_a (a), KEY idx_b (a)) ENGINE=InnoDB",
        );
        assert!(!out.contains(",,") && !out.contains(", ,"), "{}", out);
        assert!(!out.contains(",)") && !out.contains(", )"), "{}", out);
        assert_eq!(out, "CREATE TABLE t (a INTEGER DEFAULT NULL)");
    }

    #[test]
    fn test_literal_data_untouched() {
        assert_eq!(
            rewrite("INSERT INTO `notes` VALUES (1,'int(11) text `x`  COLLATE utf8')"),
            "INSERT INTO notes VALUES (1,'int(11) text `x`  COLLATE utf8')"
        );
    }

    #[test]
    fn test_escaped_quotes_doubled() {
        assert_eq!(
            rewrite(r"INSERT INTO t VALUES ('it\'s', 'a\\b')"),
            r"INSERT INTO t VALUES ('it''s', 'a\\b')"
        );
    }

    #[test]
    fn test_timestamp_defaults() {
        assert_eq!(
            rewrite("CREATE TABLE t (updated_at timestamp NOT NULL DEFAULT current_timestamp() ON UPDATE current_timestamp())"),
            "CREATE TABLE t (updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP)"
        );
    }

    #[test]
    fn test_idempotent() {
        let t = Transpiler::new();
        for stmt in [
            "CREATE TABLE `users` (\n  `id` int(10) unsigned NOT NULL AUTO_INCREMENT,\n  `email` varchar(255) COLLATE utf8mb4_unicode_ci NOT NULL,\n  `active` tinyint(1) NOT NULL DEFAULT '1',\n  `role` enum('admin','user') DEFAULT 'user' COMMENT 'role',\n  `created_at` datetime DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP,\n  PRIMARY KEY (`id`),\n  UNIQUE KEY `users_email_unique` (`email`),\n  KEY `users_role_index` (`role`)\n) ENGINE=InnoDB AUTO_INCREMENT=3 DEFAULT CHARSET=utf8mb4",
            r"INSERT INTO `users` VALUES (1,'o\'brien@example.com',1,'admin','2020-01-01 00:00:00')",
            "ALTER TABLE `users` ADD COLUMN `bio` longtext",
        ] {
            let once = t.rewrite(stmt);
            assert_eq!(t.rewrite(&once), once);
        }
    }

    #[test]
    fn test_order_preserved() {
        let t = Transpiler::new();
        let out: Vec<String> = t
            .statements("CREATE TABLE a (id INT); SET NAMES utf8; INSERT INTO a VALUES (1); INSERT INTO a VALUES (2);")
            .collect();
        assert_eq!(
            out,
            vec!["CREATE TABLE a (id INTEGER)", "INSERT INTO a VALUES (1)", "INSERT INTO a VALUES (2)"]
        );
    }

    #[test]
    fn test_emit() {
        assert_eq!(emit(Vec::<String>::new()), "");
        assert_eq!(emit(["SELECT 1"]), "SELECT 1;");
        assert_eq!(emit(["SELECT 1", "", "SELECT 2"]), "SELECT 1;\nSELECT 2;");
    }

    #[test]
    fn test_to_sqlite_trait() {
        let t = Transpiler::new();
        assert_eq!("USE shop; SELECT 1;".to_sqlite(&t), "SELECT 1;");
    }

    #[test]
    fn test_backtick_names_survive_rules() {
        let t = Transpiler::new();
        assert_eq!(
            t.convert("CREATE TABLE `order items` (`a``b` INT);"),
            "CREATE TABLE \"order items\" (\"a`b\" INTEGER);"
        );
        assert_eq!(
            t.convert(
                "CREATE TABLE t (`int value` int(11), `text` text COMMENT 'x');\nINSERT INTO t (`int value`, `text`) VALUES (1, 'a');"
            ),
            "CREATE TABLE t (\"int value\" INTEGER, text TEXT);\nINSERT INTO t (\"int value\", text) VALUES (1, 'a');"
        );
    }

    #[test]
    fn test_key_named_columns_kept() {
        assert_eq!(
            Transpiler::new().convert("CREATE TABLE t (id int(11), `key` time(3), `index` year(4), KEY `idx_key` (`key`));"),
            "CREATE TABLE t (id INTEGER, \"key\" time(3), \"index\" year(4));"
        );
    }

    #[test]
    fn test_non_word_key_names() {
        assert_eq!(
            rewrite("CREATE TABLE t (email varchar(64), UNIQUE KEY `uq-email` (`email`), KEY `idx-e` (`email`))"),
            "CREATE TABLE t (email TEXT, UNIQUE(email))"
        );
    }

    #[test]
    fn test_double_quoted_comment() {
        assert_eq!(
            rewrite(r#"CREATE TABLE t (id int(11) COMMENT "row id") COMMENT="ids""#),
            "CREATE TABLE t (id INTEGER)"
        );
    }

    #[test]
    fn test_every_type_spelling_mapped() {
        let samples = [
            ("tinyint(1)", Affinity::Boolean),
            ("TINYINT(4)", Affinity::Integer),
            ("smallint(6)", Affinity::Integer),
            ("mediumint(9)", Affinity::Integer),
            ("int", Affinity::Integer),
            ("int(11)", Affinity::Integer),
            ("integer", Affinity::Integer),
            ("bigint(20)", Affinity::Integer),
            ("varchar(255)", Affinity::Text),
            ("char(36)", Affinity::Text),
            ("tinytext", Affinity::Text),
            ("text", Affinity::Text),
            ("mediumtext", Affinity::Text),
            ("longtext", Affinity::Text),
            ("json", Affinity::Text),
            ("datetime", Affinity::Text),
            ("datetime(6)", Affinity::Text),
            ("timestamp", Affinity::Text),
            ("timestamp(3)", Affinity::Text),
            ("enum('a','b')", Affinity::Text),
            ("set('x','y')", Affinity::Text),
        ];

        for mapping in TYPE_MAP {
            let row = regex::Regex::new(&format!("(?i)^(?:{})$", mapping.pattern)).unwrap();
            assert!(
                samples.iter().any(|(ty, _)| row.is_match(ty)),
                "no sample for {}",
                mapping.spelling
            );
        }

        let t = Transpiler::new();
        for (ty, affinity) in samples {
            assert_eq!(
                t.rewrite(&format!("CREATE TABLE t (c {} NOT NULL)", ty)),
                format!("CREATE TABLE t (c {} NOT NULL)", affinity),
                "mapping {}",
                ty
            );
        }
    }

    #[test]
    fn test_format_block() {
        assert_eq!(
            format_block("CREATE TABLE t (id INTEGER PRIMARY KEY AUTOINCREMENT, note TEXT DEFAULT 'a, (b)', UNIQUE(id))"),
            "CREATE TABLE t (\n  id INTEGER PRIMARY KEY AUTOINCREMENT,\n  note TEXT DEFAULT 'a, (b)',\n  UNIQUE(id)\n)"
        );
        let insert = "INSERT INTO t VALUES (1, 2)";
        assert_eq!(format_block(insert), insert);
    }

    #[test]
    fn test_preview_truncates() {
        let long = "x".repeat(200);
        assert_eq!(preview(&long).chars().count(), 81);
        assert_eq!(preview("short"), "short");
    }
}
