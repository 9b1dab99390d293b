use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::exporter::error::{ExportError, FailureKind};

pub mod workbook;

pub use workbook::{CellValue, Sheet, Workbook};

/// Identifier assigned to a record. Unique within a record set.
pub type RecordId = u32;

/// One unit of batch work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub name: String,
}

impl Record {
    pub fn new(id: RecordId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Parses the `ID:NAME` literal accepted on the command line.
impl FromStr for Record {
    type Err = ExportError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (id, name) = value.split_once(':').ok_or_else(|| {
            ExportError::InvalidArgument(format!("expected ID:NAME, got '{value}'"))
        })?;
        let id = id.trim().parse::<RecordId>().map_err(|error| {
            ExportError::InvalidArgument(format!("invalid record id '{id}': {error}"))
        })?;
        Ok(Record::new(id, name.trim()))
    }
}

/// Result of processing a single record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    Succeeded { path: PathBuf },
    Failed { kind: FailureKind, message: String },
    /// The batch was cancelled before this record was reached.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordOutcome {
    pub record_id: RecordId,
    pub name: String,
    #[serde(flatten)]
    pub status: OutcomeStatus,
}

impl RecordOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, OutcomeStatus::Succeeded { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.status, OutcomeStatus::Failed { .. })
    }

    pub fn output_path(&self) -> Option<&PathBuf> {
        match &self.status {
            OutcomeStatus::Succeeded { path } => Some(path),
            _ => None,
        }
    }
}

/// Ordered outcomes of one batch run, one entry per input record.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct BatchResult {
    pub entries: Vec<RecordOutcome>,
}

impl BatchResult {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn failed(&self) -> impl Iterator<Item = &RecordOutcome> {
        self.entries.iter().filter(|entry| entry.is_failure())
    }

    pub fn has_failures(&self) -> bool {
        self.failed().next().is_some()
    }

    pub fn summary(&self) -> BatchSummary<'_> {
        let mut summary = BatchSummary {
            result: self,
            succeeded: 0,
            failed: 0,
            skipped: 0,
        };
        for entry in &self.entries {
            match entry.status {
                OutcomeStatus::Succeeded { .. } => summary.succeeded += 1,
                OutcomeStatus::Failed { .. } => summary.failed += 1,
                OutcomeStatus::Skipped => summary.skipped += 1,
            }
        }
        summary
    }
}

/// Counts over a [`BatchResult`]; its `Display` form is the end-of-run report.
#[derive(Debug, Clone, Copy)]
pub struct BatchSummary<'a> {
    result: &'a BatchResult,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl fmt::Display for BatchSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} record(s): {} succeeded, {} failed",
            self.result.len(),
            self.succeeded,
            self.failed
        )?;
        if self.skipped > 0 {
            write!(f, ", {} skipped", self.skipped)?;
        }
        for entry in self.result.failed() {
            if let OutcomeStatus::Failed { kind, message } = &entry.status {
                write!(
                    f,
                    "\n  [{}] {}: {kind}: {message}",
                    entry.record_id, entry.name
                )?;
            }
        }
        Ok(())
    }
}
