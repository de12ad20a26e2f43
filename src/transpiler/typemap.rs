//! MySQL column types and the SQLite affinity each one maps to.

use std::fmt;

/// SQLite storage affinity a MySQL column type is mapped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affinity {
    Integer,
    Text,
    Boolean,
}

impl Affinity {
    pub fn as_str(self) -> &'static str {
        match self {
            Affinity::Integer => "INTEGER",
            Affinity::Text => "TEXT",
            Affinity::Boolean => "BOOLEAN",
        }
    }
}

impl fmt::Display for Affinity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the type table.
#[derive(Debug, Clone, Copy)]
pub struct TypeMapping {
    /// Human-readable source spelling.
    pub spelling: &'static str,
    /// Case-insensitive pattern, anchored at a word boundary by the rule builder.
    pub pattern: &'static str,
    pub affinity: Affinity,
}

/// Source type spellings in match order. `tinyint(1)` must precede the
/// generic integer row.
pub const TYPE_MAP: &[TypeMapping] = &[
    TypeMapping {
        spelling: "tinyint(1)",
        pattern: r"tinyint\s*\(\s*1\s*\)",
        affinity: Affinity::Boolean,
    },
    TypeMapping {
        spelling: "tinyint/smallint/mediumint/int/integer/bigint[(N)]",
        pattern: r"(?:tinyint|smallint|mediumint|bigint|integer|int)\b(?:\s*\(\s*\d+\s*\))?",
        affinity: Affinity::Integer,
    },
    TypeMapping {
        spelling: "varchar(N)",
        pattern: r"varchar\s*\(\s*\d+\s*\)",
        affinity: Affinity::Text,
    },
    TypeMapping {
        spelling: "char(N)",
        pattern: r"char\s*\(\s*\d+\s*\)",
        affinity: Affinity::Text,
    },
    TypeMapping {
        spelling: "tinytext/mediumtext/longtext/text",
        pattern: r"(?:tinytext|mediumtext|longtext|text)\b",
        affinity: Affinity::Text,
    },
    TypeMapping {
        spelling: "json",
        pattern: r"json\b",
        affinity: Affinity::Text,
    },
    TypeMapping {
        spelling: "datetime/timestamp[(N)]",
        pattern: r"(?:datetime|timestamp)\b(?:\s*\(\s*\d+\s*\))?",
        affinity: Affinity::Text,
    },
    TypeMapping {
        spelling: "enum(...)",
        pattern: r"enum\s*\([^)]*\)",
        affinity: Affinity::Text,
    },
    TypeMapping {
        spelling: "set(...)",
        pattern: r"set\s*\([^)]*\)",
        affinity: Affinity::Text,
    },
];

/// Column qualifiers with no SQLite equivalent.
pub const DROPPED_QUALIFIERS: &[&str] = &["unsigned", "zerofill"];

/// Types that take a parenthesised argument and are left for SQLite to
/// interpret. A `KEY` clause never names one of these.
pub const PASSTHROUGH_PARAM_TYPES: &[&str] = &[
    "decimal", "numeric", "double", "float", "real", "binary", "varbinary", "bit", "time", "year",
];
