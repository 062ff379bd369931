//! t-rex - Command-line viewer for .trx test result files

use clap::{Parser, ValueEnum};
use std::io::Write;
use std::path::PathBuf;

use trex::error::Result;
use trex::filter::Filter;
use trex::result_set::TestResultSet;
use trex::views::execution_order::{self, ExecutionOrderOptions, SortOrder};
use trex::views::hierarchical::{self, HierarchicalOptions};
use trex::views::{json, Theme};

#[derive(Parser)]
#[command(name = "t-rex")]
#[command(about = "Parses and displays .trx test result files", long_about = None)]
struct Cli {
    /// Specific .trx files to read; bypasses directory discovery
    #[arg(long = "file")]
    files: Vec<PathBuf>,

    /// Directories to search for .trx files
    #[arg(long, default_value = ".")]
    path: Vec<PathBuf>,

    /// Include every discovered .trx file, not just the most recent one
    /// per directory
    #[arg(long)]
    all: bool,

    /// Only show tests whose qualified name matches this wildcard pattern
    #[arg(short = 'f', long)]
    filter: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value = "hierarchical")]
    format: Format,

    /// Hide captured output and stack traces of failed tests
    #[arg(short = 'd', long)]
    hide_test_output: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Tree grouped by outcome, namespace and class
    Hierarchical,
    /// Hierarchical with colors forced on
    Ansi,
    /// Machine-readable JSON array
    Json,
    /// One line per test, ordered by start time
    OrderByStartTime,
    /// One line per test, ordered by end time
    OrderByEndTime,
    /// One line per test, ordered by duration
    OrderByDuration,
}

fn run(cli: &Cli) -> Result<i32> {
    let mut results = if cli.files.is_empty() {
        let mut files = Vec::new();
        for path in &cli.path {
            files.extend(trex::result_set::find_trx_files(path, !cli.all)?);
        }
        TestResultSet::from_files(&files)?
    } else {
        // Named files that do not exist are skipped, not fatal.
        let files: Vec<PathBuf> = cli.files.iter().filter(|f| f.exists()).cloned().collect();
        TestResultSet::from_files(&files)?
    };

    if let Some(pattern) = &cli.filter {
        results = Filter::compile(pattern)?.apply(&results);
    }

    let rendered = match cli.format {
        Format::Hierarchical | Format::Ansi => {
            let options = HierarchicalOptions {
                hide_test_output: cli.hide_test_output,
                theme: match cli.format {
                    Format::Ansi => Theme::ansi(),
                    _ => Theme::auto(),
                },
            };
            hierarchical::render(&results, &options)
        }
        Format::Json => json::render(&results)?,
        Format::OrderByStartTime | Format::OrderByEndTime | Format::OrderByDuration => {
            let options = ExecutionOrderOptions {
                sort: match cli.format {
                    Format::OrderByEndTime => SortOrder::EndTime,
                    Format::OrderByDuration => SortOrder::Duration,
                    _ => SortOrder::StartTime,
                },
                theme: Theme::auto(),
            };
            execution_order::render(&results, &options)
        }
    };
    print!("{}", rendered);

    Ok(results.exit_code())
}

fn main() {
    let cli = Cli::parse();

    match run(&cli) {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            let _ = writeln!(std::io::stderr(), "Error: {}", e);
            std::process::exit(1);
        }
    }
}
