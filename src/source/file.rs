//! File-based data source.
//!
//! Reads a local JSON export in the same shape the values API returns.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use super::schema::{self, RawSheet};
use super::{DataSource, LoadError};
use crate::data::Table;

/// A data source that reads the sheet from a JSON file.
///
/// The file holds `{"values": [[header...], [row...], ...]}`, which is what
/// the Sheets API returns, so a saved API response can be replayed offline.
#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    description: String,
}

impl FileSource {
    /// Create a new file source for the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let description = format!("file: {}", path.display());
        Self { path, description }
    }

    /// Returns the path being read.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DataSource for FileSource {
    fn load(&mut self) -> Result<Table, LoadError> {
        let content = fs::read_to_string(&self.path)?;
        let raw: RawSheet =
            serde_json::from_str(&content).map_err(|e| LoadError::Parse(e.to_string()))?;
        let table = schema::ingest(raw)?;
        info!(path = %self.path.display(), rows = table.len(), "Loaded dataset from file");
        Ok(table)
    }

    fn description(&self) -> &str {
        &self.description
    }
}
