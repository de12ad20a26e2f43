//! mysql2sqlite: load a MySQL dump into a SQLite database
//!
//! # Usage
//!
//! ```bash
//! # Convert and apply
//! mysql2sqlite dump.sql shop.sqlite
//!
//! # Show the SQLite script only
//! mysql2sqlite dump.sql shop.sqlite --dry-run
//!
//! # Apply what SQLite accepts, report the rest
//! mysql2sqlite dump.sql shop.sqlite --keep-going --format json
//! ```

use anyhow::Context;
use clap::{Parser, ValueEnum};
use colored::*;
use mysql2sqlite::prelude::*;
use std::path::PathBuf;
use tracing::{debug, Level};

#[derive(Parser)]
#[command(name = "mysql2sqlite")]
#[command(version)]
#[command(about = "Convert a MySQL dump into a SQLite database", long_about = None)]
#[command(after_help = "EXAMPLES:
    mysql2sqlite dump.sql shop.sqlite
    mysql2sqlite dump.sql shop.sqlite --dry-run
    mysql2sqlite dump.sql shop.sqlite --emit shop.sql --keep-going")]
struct Cli {
    /// MySQL dump to read
    input: PathBuf,

    /// SQLite database file to write (created if missing)
    output_db: PathBuf,

    /// Print the converted script instead of applying it
    #[arg(long)]
    dry_run: bool,

    /// Also write the converted script to this file
    #[arg(long, value_name = "PATH")]
    emit: Option<PathBuf>,

    /// Keep applying after a statement is rejected
    #[arg(long)]
    keep_going: bool,

    /// Print each statement before it runs
    #[arg(long)]
    echo: bool,

    /// Summary format
    #[arg(long, value_enum)]
    format: Option<Format>,

    /// Configuration file
    #[arg(long, env = "MYSQL2SQLITE_CONFIG")]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Warnings only
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

impl From<Format> for OutputFormat {
    fn from(f: Format) -> Self {
        match f {
            Format::Text => OutputFormat::Text,
            Format::Json => OutputFormat::Json,
        }
    }
}

/// Settings after merging the config file with command-line flags.
struct Settings {
    on_error: OnError,
    echo: bool,
    format: OutputFormat,
}

impl Settings {
    fn resolve(cli: &Cli, config: Config) -> Self {
        Self {
            on_error: if cli.keep_going {
                OnError::Continue
            } else {
                config.execution.on_error
            },
            echo: cli.echo || config.execution.echo,
            format: cli.format.map(Into::into).unwrap_or(config.output.format),
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::WARN
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match run(&cli).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}

/// Returns `false` when the database rejected any statement.
async fn run(cli: &Cli) -> anyhow::Result<bool> {
    let config = Config::load(cli.config.as_deref())?;
    let settings = Settings::resolve(cli, config);

    let dump = std::fs::read_to_string(&cli.input)
        .with_context(|| format!("Failed to read {}", cli.input.display()))?;

    let transpiler = Transpiler::new();
    let statements: Vec<String> = transpiler.statements(&dump).collect();
    debug!("{} statement(s) after conversion", statements.len());

    if let Some(path) = &cli.emit {
        std::fs::write(path, emit(&statements))
            .with_context(|| format!("Failed to write {}", path.display()))?;
        if settings.format == OutputFormat::Text {
            println!("{} Wrote script to {}", "✓".green(), path.display().to_string().cyan());
        }
    }

    if cli.dry_run {
        println!("{}", emit(&statements));
        return Ok(true);
    }

    if statements.is_empty() && settings.format == OutputFormat::Text {
        println!("{}", "No statements to apply.".yellow());
    }

    let mut target = SqliteTarget::open(&cli.output_db)
        .await
        .with_context(|| format!("Failed to open {}", cli.output_db.display()))?;

    let echo = settings.echo;
    let report = apply_with(&mut target, &statements, settings.on_error, |i, stmt| {
        if echo {
            println!("\n{}{}:", "Statement ".dimmed(), i.to_string().cyan());
            for line in format_block(stmt).lines() {
                println!("  {}", line.white());
            }
        }
    })
    .await?;
    target.close().await?;

    match settings.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => print_summary(&report, cli),
    }

    Ok(report.is_success())
}

fn print_summary(report: &ApplyReport, cli: &Cli) {
    for failure in &report.failures {
        println!(
            "{} {} {}",
            "✗".red(),
            format!("Statement {}:", failure.index).bold(),
            failure.message.red()
        );
        println!("    {}", failure.statement.dimmed());
    }

    if report.is_success() {
        println!(
            "{} Converted and saved to {}",
            "✓".green(),
            cli.output_db.display().to_string().cyan()
        );
    } else if report.rolled_back {
        println!(
            "{} Rolled back; {} left unchanged",
            "⚠".yellow(),
            cli.output_db.display().to_string().cyan()
        );
    } else {
        println!(
            "{} {} applied, {} rejected",
            "⚠".yellow(),
            report.executed.to_string().green(),
            report.failures.len().to_string().red()
        );
    }
}
