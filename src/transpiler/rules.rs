//! The ordered MySQL → SQLite rewrite rules.
//!
//! Every rule is a compiled pattern plus an action. Rules are total and
//! leave text that does not match untouched. Order matters: type
//! normalization assumes identifiers are masked or unquoted and the auto-increment
//! column has already been folded, and punctuation cleanup assumes all
//! clause removal is done.

use std::borrow::Cow;
use std::fmt;

use regex::{Captures, Regex};

use crate::statement::StatementKind;
use crate::transpiler::literals::{unquote_identifier, IDENT_MARK};
use crate::transpiler::typemap::{Affinity, DROPPED_QUALIFIERS, PASSTHROUGH_PARAM_TYPES, TYPE_MAP};

/// Transformation classes, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Step {
    UnquoteIdentifiers,
    StripTableOptions,
    StripCollation,
    StripComments,
    StripOnUpdate,
    FoldAutoIncrement,
    NormalizeTypes,
    TranslateKeys,
    CleanPunctuation,
    NormalizeFunctions,
    NormalizeWhitespace,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::UnquoteIdentifiers => "unquote-identifiers",
            Step::StripTableOptions => "strip-table-options",
            Step::StripCollation => "strip-collation",
            Step::StripComments => "strip-comments",
            Step::StripOnUpdate => "strip-on-update",
            Step::FoldAutoIncrement => "fold-auto-increment",
            Step::NormalizeTypes => "normalize-types",
            Step::TranslateKeys => "translate-keys",
            Step::CleanPunctuation => "clean-punctuation",
            Step::NormalizeFunctions => "normalize-functions",
            Step::NormalizeWhitespace => "normalize-whitespace",
        };
        f.write_str(name)
    }
}

/// Which statements a rule runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Every kept statement.
    All,
    /// CREATE TABLE and ALTER TABLE only.
    TableDdl,
    /// CREATE TABLE only.
    CreateTable,
}

/// What a rule does with a match.
#[derive(Debug, Clone, Copy)]
enum Action {
    /// Regex replacement template (`$1` etc).
    Replace(&'static str),
    /// Backtick identifier → bare identifier, or `"..."` when not a plain word.
    Unquote,
    /// Replace with an affinity unless group 1 shows a column-name position.
    Type(Affinity),
    /// `UNIQUE KEY name (cols)` → `UNIQUE(cols)` without prefix lengths.
    UniqueKey,
    /// Drop a secondary index clause, keeping foreign keys.
    DropKey,
}

/// A single rewrite rule.
#[derive(Debug, Clone)]
pub struct Rule {
    step: Step,
    scope: Scope,
    pattern: Regex,
    action: Action,
    requires: Option<Regex>,
}

impl Rule {
    fn new(step: Step, scope: Scope, pattern: &str, action: Action) -> Self {
        Self {
            step,
            scope,
            pattern: compile(pattern),
            action,
            requires: None,
        }
    }

    /// Only run when `pattern` is present somewhere in the statement.
    fn requiring(mut self, pattern: &str) -> Self {
        self.requires = Some(compile(pattern));
        self
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn applies_to(&self, kind: StatementKind) -> bool {
        match self.scope {
            Scope::All => true,
            Scope::TableDdl => kind.is_table_ddl(),
            Scope::CreateTable => kind == StatementKind::CreateTable,
        }
    }

    /// Apply the rule. Returns `Cow::Borrowed` when nothing matched.
    pub fn apply<'t>(&self, text: &'t str) -> Cow<'t, str> {
        if let Some(req) = &self.requires {
            if !req.is_match(text) {
                return Cow::Borrowed(text);
            }
        }

        match self.action {
            Action::Replace(template) => self.pattern.replace_all(text, template),
            Action::Unquote => self.pattern.replace_all(text, |caps: &Captures| unquote_identifier(&caps[1])),
            Action::Type(affinity) => self.pattern.replace_all(text, |caps: &Captures| {
                if caps.get(1).is_some() {
                    caps[0].to_string()
                } else {
                    affinity.to_string()
                }
            }),
            Action::UniqueKey => self.pattern.replace_all(text, |caps: &Captures| {
                format!("UNIQUE({})", strip_prefix_lengths(&caps[1]))
            }),
            Action::DropKey => self.pattern.replace_all(text, |caps: &Captures| {
                let foreign = caps
                    .get(1)
                    .is_some_and(|m| m.as_str().trim().eq_ignore_ascii_case("FOREIGN"));
                let names_type = PASSTHROUGH_PARAM_TYPES
                    .iter()
                    .any(|t| caps[2].eq_ignore_ascii_case(t));
                if foreign || names_type {
                    caps[0].to_string()
                } else {
                    String::new()
                }
            }),
        }
    }
}

/// The full ordered rule table, compiled once.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Build the MySQL → SQLite rule table.
    pub fn mysql_to_sqlite() -> Self {
        use Scope::*;
        use Step::*;

        let name = name_pattern();

        let mut rules = vec![
            // Backticks the mask leaves visible, as inside conditional comments.
            Rule::new(UnquoteIdentifiers, All, r"`((?:[^`]|``)*)`", Action::Unquote),
            Rule::new(
                StripTableOptions,
                CreateTable,
                r"(?i)\)\s*(?:ENGINE|TYPE|AUTO_INCREMENT|DEFAULT\s+CHARSET|DEFAULT\s+CHARACTER\s+SET|DEFAULT\s+COLLATE|CHARSET|CHARACTER\s+SET|COLLATE|ROW_FORMAT|COMMENT)\b[^)]*$",
                Action::Replace(")"),
            ),
            Rule::new(
                StripCollation,
                TableDdl,
                r"(?i)\s*\bCOLLATE\s*=?\s*\w+",
                Action::Replace(""),
            ),
            Rule::new(
                StripCollation,
                TableDdl,
                r"(?i)\s*\b(?:DEFAULT\s+)?(?:CHARACTER\s+SET|CHARSET)\s*=?\s*\w+",
                Action::Replace(""),
            ),
            Rule::new(
                StripComments,
                TableDdl,
                r#"(?i)\s*\bCOMMENT\s*=?\s*(?:'[^']*'|"[^"]*")"#,
                Action::Replace(""),
            ),
            Rule::new(
                StripOnUpdate,
                TableDdl,
                r"(?i)\s*\bON\s+UPDATE\s+(?:CURRENT_TIMESTAMP|NOW)\b(?:\s*\(\s*\d*\s*\))?",
                Action::Replace(""),
            ),
            Rule::new(
                FoldAutoIncrement,
                TableDdl,
                &format!(r"(?i)({name})\s+(?:tinyint|smallint|mediumint|bigint|integer|int)\b(?:\s*\(\s*\d+\s*\))?(?:\s+UNSIGNED)?(?:\s+ZEROFILL)?\s+NOT\s+NULL\s+AUTO_INCREMENT\b"),
                Action::Replace("${1} INTEGER PRIMARY KEY AUTOINCREMENT"),
            ),
            Rule::new(
                FoldAutoIncrement,
                TableDdl,
                r"(?i)(\bPRIMARY\s+KEY\s+AUTOINCREMENT)\s+PRIMARY\s+KEY\b",
                Action::Replace("${1}"),
            ),
            Rule::new(
                FoldAutoIncrement,
                TableDdl,
                r"(?i)\s*\bAUTO_INCREMENT\b(?:\s*=\s*\d+)?",
                Action::Replace(""),
            ),
            Rule::new(
                FoldAutoIncrement,
                TableDdl,
                r"(?i),\s*PRIMARY\s+KEY\s*\([^)]*\)(?:\s+USING\s+\w+)?",
                Action::Replace(""),
            )
            .requiring(r"(?i)\bPRIMARY\s+KEY\s+AUTOINCREMENT\b"),
        ];

        for mapping in TYPE_MAP {
            rules.push(Rule::new(
                NormalizeTypes,
                TableDdl,
                &format!(r"(?i)([(,]\s*)?\b(?:{})", mapping.pattern),
                Action::Type(mapping.affinity),
            ));
        }
        rules.push(Rule::new(
            NormalizeTypes,
            TableDdl,
            &format!(r"(?i)\s+\b(?:{})\b", DROPPED_QUALIFIERS.join("|")),
            Action::Replace(""),
        ));

        rules.extend([
            Rule::new(
                TranslateKeys,
                TableDdl,
                &format!(r"(?i)\bUNIQUE\s+(?:KEY|INDEX)(?:\s+{name})?\s*\(((?:[^()]|\([^()]*\))+)\)(?:\s+USING\s+\w+)?"),
                Action::UniqueKey,
            ),
            Rule::new(
                TranslateKeys,
                TableDdl,
                &format!(r"(?i),?\s*\b((?:FOREIGN|FULLTEXT|SPATIAL)\s+)?(?:KEY|INDEX)\s+({name})\s*\((?:[^()]|\([^()]*\))+\)(?:\s+USING\s+\w+)?"),
                Action::DropKey,
            ),
            Rule::new(CleanPunctuation, All, r",(?:\s*,)+", Action::Replace(",")),
            Rule::new(CleanPunctuation, All, r"\(\s*,", Action::Replace("(")),
            Rule::new(CleanPunctuation, All, r",\s*\)", Action::Replace(")")),
            Rule::new(
                NormalizeFunctions,
                All,
                r"(?i)\bCURRENT_TIMESTAMP\s*\(\s*\d*\s*\)",
                Action::Replace("CURRENT_TIMESTAMP"),
            ),
            Rule::new(
                NormalizeFunctions,
                All,
                r"(?i)\bNOW\s*\(\s*\)",
                Action::Replace("CURRENT_TIMESTAMP"),
            ),
            Rule::new(NormalizeWhitespace, All, r"\s+", Action::Replace(" ")),
            Rule::new(NormalizeWhitespace, All, r" ([,)])", Action::Replace("$1")),
            Rule::new(NormalizeWhitespace, All, r"\( ", Action::Replace("(")),
        ]);

        Self { rules }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::mysql_to_sqlite()
    }
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid rewrite pattern {:?}: {}", pattern, e))
}

/// A column or index name: a bare word, a masked backtick identifier or a
/// `"..."` name.
fn name_pattern() -> String {
    format!(r#"(?:\b[A-Za-z_][A-Za-z0-9_$]*|{m}\d+{m}|"(?:[^"]|"")*")"#, m = IDENT_MARK)
}

/// `email(20), name` → `email, name`.
fn strip_prefix_lengths(cols: &str) -> String {
    cols.split(',')
        .map(|col| match col.find('(') {
            Some(i) => col[..i].trim(),
            None => col.trim(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}
