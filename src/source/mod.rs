//! Data source abstraction for loading the quality table.
//!
//! This module provides a trait-based abstraction for loading the
//! observation table from different backends (Google Sheets, a local JSON
//! export), plus the ingestion step shared by all of them and a TTL cache.

pub mod cache;
mod file;
pub mod schema;
mod sheets;

pub use cache::DatasetCache;
pub use file::FileSource;
pub use schema::RawSheet;
pub use sheets::{RetryPolicy, SheetAuth, SheetsSource};

use std::fmt::Debug;

use thiserror::Error;

use crate::data::Table;

/// Errors that can occur while loading the dataset.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Transient network failure (connect error or timeout).
    #[error("Network error: check the internet connection ({0})")]
    Network(String),

    /// The request failed for a non-transient reason.
    #[error("Request failed: {0}")]
    Http(String),

    /// The server answered with a non-success status.
    #[error("Server returned {status}: {body}")]
    Status { status: u16, body: String },

    /// No usable credentials were found or they were rejected.
    #[error("Credentials error: {0}")]
    Credentials(String),

    /// The response or file could not be parsed.
    #[error("Failed to parse data: {0}")]
    Parse(String),

    /// Required columns are missing after header normalization.
    #[error("Missing required columns: {}. Available columns: {}", missing.join(", "), available.join(", "))]
    MissingColumns {
        missing: Vec<String>,
        available: Vec<String>,
    },

    /// The sheet has no header row, or no row with batch, machine and strength.
    #[error("The sheet is empty or contains no data")]
    Empty,

    /// Reading a local file failed.
    #[error("Read error: {0}")]
    Io(#[from] std::io::Error),
}

impl LoadError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, LoadError::Network(_))
    }
}

impl From<reqwest::Error> for LoadError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            LoadError::Network(err.to_string())
        } else if err.is_decode() {
            LoadError::Parse(err.to_string())
        } else {
            LoadError::Http(err.to_string())
        }
    }
}

/// Trait for loading the observation table from various sources.
///
/// # Example
///
/// ```
/// use millwatch::{DataSource, FileSource};
///
/// let mut source = FileSource::new("quality.json");
/// match source.load() {
///     Ok(table) => println!("Loaded {} observations", table.len()),
///     Err(e) => eprintln!("{}", e),
/// }
/// ```
pub trait DataSource: Send + Debug {
    /// Load a fresh copy of the table.
    ///
    /// This may block on I/O. Callers normally go through [`DatasetCache`]
    /// rather than calling this on every render.
    fn load(&mut self) -> Result<Table, LoadError>;

    /// Returns a human-readable description of the source.
    ///
    /// Used for display in the TUI status bar.
    fn description(&self) -> &str;
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// A source that hands out a fixed table, or a fixed error.
    #[derive(Debug)]
    pub(crate) struct StaticSource {
        pub table: Option<Table>,
        pub loads: Arc<AtomicUsize>,
    }

    impl StaticSource {
        pub fn new(table: Table) -> Self {
            Self {
                table: Some(table),
                loads: Arc::default(),
            }
        }

        pub fn failing() -> Self {
            Self {
                table: None,
                loads: Arc::default(),
            }
        }

        /// Shared load counter, readable after the source is boxed.
        pub fn counter(&self) -> Arc<AtomicUsize> {
            Arc::clone(&self.loads)
        }
    }

    impl DataSource for StaticSource {
        fn load(&mut self) -> Result<Table, LoadError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            self.table
                .clone()
                .ok_or_else(|| LoadError::Network("unreachable".into()))
        }

        fn description(&self) -> &str {
            "static"
        }
    }

    #[test]
    fn test_only_network_errors_are_transient() {
        assert!(LoadError::Network("timeout".into()).is_transient());
        assert!(!LoadError::Empty.is_transient());
        assert!(!LoadError::Status {
            status: 403,
            body: "forbidden".into()
        }
        .is_transient());
    }

    #[test]
    fn test_missing_columns_message() {
        let err = LoadError::MissingColumns {
            missing: vec!["№ ПМ".into()],
            available: vec!["№ партии".into(), "x".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("№ ПМ"));
        assert!(msg.contains("№ партии, x"));
    }
}
