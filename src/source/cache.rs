//! Time-to-live cache in front of a [`DataSource`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error};

use super::{DataSource, LoadError};
use crate::data::Table;

/// Caches the most recent successful load for a fixed time.
///
/// A failed load leaves any previously cached table in place, so the
/// caller decides whether to show stale data or the error.
#[derive(Debug)]
pub struct DatasetCache {
    source: Box<dyn DataSource>,
    cached: Option<(Arc<Table>, Instant)>,
}

impl DatasetCache {
    pub fn new(source: Box<dyn DataSource>) -> Self {
        Self {
            source,
            cached: None,
        }
    }

    /// Return the cached table if younger than `ttl`, otherwise reload.
    pub fn get_or_fetch(&mut self, ttl: Duration) -> Result<Arc<Table>, LoadError> {
        self.get_or_fetch_at(Instant::now(), ttl)
    }

    pub fn get_or_fetch_at(&mut self, now: Instant, ttl: Duration) -> Result<Arc<Table>, LoadError> {
        if let Some((table, fetched)) = &self.cached {
            if now.saturating_duration_since(*fetched) < ttl {
                return Ok(Arc::clone(table));
            }
        }

        debug!(source = self.source.description(), "Fetching dataset");
        match self.source.load().and_then(non_empty) {
            Ok(table) => {
                let table = Arc::new(table);
                self.cached = Some((Arc::clone(&table), now));
                Ok(table)
            }
            Err(e) => {
                error!(source = self.source.description(), error = %e, "Dataset load failed");
                Err(e)
            }
        }
    }

    /// Drop the cached table so the next fetch reloads.
    pub fn invalidate(&mut self) {
        self.cached = None;
    }

    /// The table currently held, regardless of age.
    #[cfg(test)]
    pub fn current(&self) -> Option<Arc<Table>> {
        self.cached.as_ref().map(|(table, _)| Arc::clone(table))
    }

    /// When the cached table was loaded.
    pub fn fetched_at(&self) -> Option<Instant> {
        self.cached.as_ref().map(|(_, at)| *at)
    }

    pub fn description(&self) -> &str {
        self.source.description()
    }
}

/// A table without observations is a load failure, whatever the source.
fn non_empty(table: Table) -> Result<Table, LoadError> {
    if table.is_empty() {
        Err(LoadError::Empty)
    } else {
        Ok(table)
    }
}
