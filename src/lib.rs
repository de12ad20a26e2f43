//! # mysql2sqlite
//!
//! > **Feed it a dump. Get a database.**
//!
//! Rewrites a MySQL-dialect dump into a script SQLite accepts, and loads
//! that script into a database file.
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use mysql2sqlite::prelude::*;
//!
//! let script = mysql2sqlite::convert(&std::fs::read_to_string("dump.sql")?);
//!
//! let mut target = SqliteTarget::open("shop.sqlite").await?;
//! let report = apply(&mut target, parser::split(&script), OnError::Abort).await?;
//! ```
//!
//! ## Pipeline
//!
//! | Stage      | Module        | Does                                   |
//! |------------|---------------|----------------------------------------|
//! | split      | `parser`      | Cuts the dump at unquoted `;`          |
//! | keep       | `statement`   | Drops session directives               |
//! | rewrite    | `transpiler`  | Ordered MySQL → SQLite rules           |
//! | emit       | `transpiler`  | Joins statements into one script       |
//! | apply      | `engine`      | Runs the script against SQLite         |

pub mod config;
pub mod engine;
pub mod error;
pub mod parser;
pub mod statement;
pub mod transpiler;

pub mod prelude {
    pub use crate::config::{Config, OutputFormat};
    pub use crate::engine::{apply, apply_with, ApplyReport, Execute, Failure, OnError, SqliteTarget};
    pub use crate::error::*;
    pub use crate::parser;
    pub use crate::statement::{classify, keep, StatementKind};
    pub use crate::transpiler::{emit, format_block, ToSqlite, Transpiler};
}

/// Convert a MySQL dump into a SQLite script with the default rules.
///
/// # Example
///
/// ```
/// use mysql2sqlite::convert;
///
/// let script = convert("LOCK TABLES `t` WRITE;\nINSERT INTO `t` VALUES (1,'a');\nUNLOCK TABLES;");
/// assert_eq!(script, "INSERT INTO t VALUES (1,'a');");
/// ```
pub fn convert(dump: &str) -> String {
    transpiler::Transpiler::new().convert(dump)
}
