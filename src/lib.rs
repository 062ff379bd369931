//! trex - A parser, writer and viewer for .trx test result files
//!
//! .trx files are the XML test reports produced by .NET test runners
//! (`dotnet test`, VSTest). This library discovers them, parses them into
//! a uniform result model, filters and renders them for the terminal, and
//! writes merged sets back out as TRX.
//!
//! # Overview
//!
//! The library is organized into several key modules:
//!
//! - [`trx`]: The TRX document codec (namespace-agnostic parser and writer)
//! - [`test_result`]: The result model, with name-part inference
//! - [`result_set`]: Ordered, outcome-partitioned result collections and
//!   .trx file discovery
//! - [`filter`]: Wildcard filtering by fully qualified test name
//! - [`views`]: Hierarchical, execution-order and JSON renderings
//! - [`test_id`]: Stable name-based test identifiers for written documents
//! - [`error`]: Error types and Result alias
//!
//! # Example
//!
//! ```no_run
//! use trex::result_set::TestResultSet;
//! use trex::views::hierarchical::{self, HierarchicalOptions};
//! use std::path::Path;
//!
//! # fn main() -> trex::error::Result<()> {
//! // Parse the latest .trx file under each directory and render a tree.
//! let results = TestResultSet::from_directory(Path::new("."), true)?;
//! print!("{}", hierarchical::render(&results, &HierarchicalOptions::default()));
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod filter;
pub mod result_set;
pub mod test_id;
pub mod test_result;
pub mod trx;
pub mod views;

pub use error::{Error, Result};
pub use filter::Filter;
pub use result_set::TestResultSet;
pub use test_result::{TestOutcome, TestResult};
