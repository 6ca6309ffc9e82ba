use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, NaiveDateTime};

use crate::error::Result;
use crate::table::Table;
use crate::warehouse::{DataSource, DatasetKind};

struct Entry {
    table: Arc<Table>,
    fetched_at: NaiveDateTime,
}

/// Time-bounded cache in front of a [`DataSource`]. The clock is passed in by the
/// caller so expiry can be tested without waiting.
pub struct DatasetCache {
    source: Box<dyn DataSource>,
    ttl: Duration,
    entries: HashMap<DatasetKind, Entry>,
}

impl DatasetCache {
    pub fn new(source: Box<dyn DataSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn source(&self) -> &dyn DataSource {
        self.source.as_ref()
    }

    /// Cached table for `kind`, fetching when absent or older than the TTL.
    /// A failed fetch leaves any previous entry untouched.
    pub fn get(&mut self, kind: DatasetKind, now: NaiveDateTime) -> Result<Arc<Table>> {
        if let Some(entry) = self.entries.get(&kind) {
            if now - entry.fetched_at < self.ttl {
                tracing::debug!(dataset = kind.key(), "cache hit");
                return Ok(Arc::clone(&entry.table));
            }
            tracing::debug!(dataset = kind.key(), "cache entry expired");
        }

        let table = Arc::new(self.source.fetch(kind)?);
        tracing::info!(
            dataset = kind.key(),
            rows = table.len(),
            source = %self.source.describe(),
            "dataset fetched"
        );
        self.entries.insert(
            kind,
            Entry {
                table: Arc::clone(&table),
                fetched_at: now,
            },
        );
        Ok(table)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
