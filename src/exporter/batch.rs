use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, instrument, warn};

use crate::exporter::duplicate::{TemplateDuplicator, XlsxDuplicator};
use crate::exporter::error::{ExportError, Result};
use crate::exporter::model::{BatchResult, OutcomeStatus, Record, RecordOutcome};
use crate::exporter::naming;
use crate::exporter::source::RecordSource;

/// Receives a notification after each record has been processed.
pub trait ProgressSink {
    /// `position` is one-based; `total` is the number of records in the batch.
    fn record_finished(&self, position: usize, total: usize, outcome: &RecordOutcome);
}

impl<F> ProgressSink for F
where
    F: Fn(usize, usize, &RecordOutcome),
{
    fn record_finished(&self, position: usize, total: usize, outcome: &RecordOutcome) {
        self(position, total, outcome)
    }
}

/// Reports progress through `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn record_finished(&self, position: usize, total: usize, outcome: &RecordOutcome) {
        match &outcome.status {
            OutcomeStatus::Succeeded { path } => info!(
                position,
                total,
                record_id = outcome.record_id,
                path = %path.display(),
                "file created"
            ),
            OutcomeStatus::Failed { kind, message } => warn!(
                position,
                total,
                record_id = outcome.record_id,
                %kind,
                message = %message,
                "record failed"
            ),
            OutcomeStatus::Skipped => info!(
                position,
                total,
                record_id = outcome.record_id,
                "record skipped"
            ),
        }
    }
}

/// Runs a template duplication for every record of a batch.
pub struct BatchOrchestrator<D = XlsxDuplicator, P = TracingProgress> {
    duplicator: D,
    progress: P,
    cancel: Option<Arc<AtomicBool>>,
}

impl Default for BatchOrchestrator {
    fn default() -> Self {
        Self::new(XlsxDuplicator::new())
    }
}

impl<D: TemplateDuplicator> BatchOrchestrator<D> {
    pub fn new(duplicator: D) -> Self {
        Self {
            duplicator,
            progress: TracingProgress,
            cancel: None,
        }
    }
}

impl<D: TemplateDuplicator, P: ProgressSink> BatchOrchestrator<D, P> {
    /// Replaces the progress sink.
    pub fn with_progress<Q: ProgressSink>(self, progress: Q) -> BatchOrchestrator<D, Q> {
        BatchOrchestrator {
            duplicator: self.duplicator,
            progress,
            cancel: self.cancel,
        }
    }

    /// Installs a flag checked before each record. Once set, remaining
    /// records are reported as skipped.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Loads records from `source` and runs the batch over them.
    pub fn run_source(
        &self,
        source: &dyn RecordSource,
        template: &Path,
        output_root: &Path,
    ) -> Result<BatchResult> {
        let records = source.load_records()?;
        self.run(&records, template, output_root)
    }

    /// Produces one derived file per record below `output_root`.
    ///
    /// Argument errors abort before anything is written. Afterwards every
    /// record gets exactly one entry in the result, in input order, and a
    /// failing record never stops the ones after it.
    #[instrument(
        level = "info",
        skip_all,
        fields(template = %template.display(), output_root = %output_root.display(), records = records.len())
    )]
    pub fn run(&self, records: &[Record], template: &Path, output_root: &Path) -> Result<BatchResult> {
        validate_arguments(records, template, output_root)?;

        fs::create_dir_all(output_root).map_err(|source| ExportError::OutputRoot {
            path: output_root.to_path_buf(),
            source,
        })?;

        let total = records.len();
        let mut result = BatchResult {
            entries: Vec::with_capacity(total),
        };

        for (index, record) in records.iter().enumerate() {
            let status = if self.is_cancelled() {
                OutcomeStatus::Skipped
            } else {
                let destination = naming::name_for(record, output_root);
                match self
                    .duplicator
                    .duplicate_record(template, &destination, record)
                {
                    Ok(()) => OutcomeStatus::Succeeded { path: destination },
                    Err(error) => OutcomeStatus::Failed {
                        kind: error.kind(),
                        message: error.to_string(),
                    },
                }
            };

            let outcome = RecordOutcome {
                record_id: record.id,
                name: record.name.clone(),
                status,
            };
            self.progress.record_finished(index + 1, total, &outcome);
            result.entries.push(outcome);
        }

        let summary = result.summary();
        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            skipped = summary.skipped,
            "batch finished"
        );
        Ok(result)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }
}

fn validate_arguments(records: &[Record], template: &Path, output_root: &Path) -> Result<()> {
    if template.as_os_str().is_empty() {
        return Err(ExportError::InvalidArgument(
            "template path must not be empty".into(),
        ));
    }
    if output_root.as_os_str().is_empty() {
        return Err(ExportError::InvalidArgument(
            "output directory must not be empty".into(),
        ));
    }
    if !template.is_file() {
        return Err(ExportError::SourceNotFound(template.to_path_buf()));
    }

    let mut seen = HashSet::with_capacity(records.len());
    for record in records {
        if !seen.insert(record.id) {
            return Err(ExportError::InvalidArgument(format!(
                "duplicate record id {}",
                record.id
            )));
        }
    }
    Ok(())
}
