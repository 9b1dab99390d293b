use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::exporter::error::{ExportError, Result};
use crate::exporter::model::{Record, RecordId};
use crate::exporter::source::RecordSource;

/// Names inserted by [`RecordStore::seed_defaults`] into an empty store.
pub const DEFAULT_RECORD_NAMES: [&str; 2] = ["Record 1", "Record 2"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct RecordTable {
    next_id: RecordId,
    records: Vec<Record>,
}

impl Default for RecordTable {
    fn default() -> Self {
        Self {
            next_id: 1,
            records: Vec::new(),
        }
    }
}

/// Single-table record store persisted as a JSON document.
#[derive(Debug)]
pub struct RecordStore {
    path: PathBuf,
    table: RecordTable,
}

impl RecordStore {
    /// Opens the store at `path`, creating an empty one when the file does
    /// not exist yet.
    #[instrument(level = "debug", skip_all, fields(path = %path.display()))]
    pub fn open(path: &Path) -> Result<Self> {
        if path.exists() {
            let data = fs::read_to_string(path)?;
            let mut table: RecordTable = serde_json::from_str(&data)?;
            table.records.sort_by_key(|record| record.id);
            if let Some(last) = table.records.last() {
                table.next_id = table.next_id.max(last.id.saturating_add(1));
            }
            debug!(record_count = table.records.len(), "record store loaded");
            return Ok(Self {
                path: path.to_path_buf(),
                table,
            });
        }

        let store = Self {
            path: path.to_path_buf(),
            table: RecordTable::default(),
        };
        store.save()?;
        info!("created empty record store");
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records ordered by id.
    pub fn records(&self) -> &[Record] {
        &self.table.records
    }

    pub fn is_empty(&self) -> bool {
        self.table.records.is_empty()
    }

    /// Populates an empty store with the default records. Returns whether
    /// anything was inserted.
    pub fn seed_defaults(&mut self) -> Result<bool> {
        if !self.is_empty() {
            return Ok(false);
        }
        for name in DEFAULT_RECORD_NAMES {
            self.push(name.to_string())?;
        }
        self.save()?;
        info!(record_count = self.table.records.len(), "seeded default records");
        Ok(true)
    }

    /// Adds a record under the next free id and persists the store.
    pub fn insert(&mut self, name: &str) -> Result<Record> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ExportError::InvalidArgument(
                "record name must not be empty".into(),
            ));
        }
        let record = self.push(name.to_string())?;
        self.save()?;
        Ok(record)
    }

    fn push(&mut self, name: String) -> Result<Record> {
        let id = self.table.next_id;
        self.table.next_id = id.checked_add(1).ok_or_else(|| {
            ExportError::InvalidArgument("record id space exhausted".into())
        })?;
        let record = Record::new(id, name);
        self.table.records.push(record.clone());
        Ok(record)
    }

    fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.table)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

impl RecordSource for RecordStore {
    fn load_records(&self) -> Result<Vec<Record>> {
        Ok(self.table.records.clone())
    }
}
