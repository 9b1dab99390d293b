mod common;

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use excel_exporter::batch::BatchOrchestrator;
use excel_exporter::duplicate::{TemplateDuplicator, XlsxDuplicator};
use excel_exporter::io::excel_read;
use excel_exporter::model::{CellValue, OutcomeStatus, Record, RecordId, RecordOutcome};
use excel_exporter::{DuplicationError, ExportError, FailureKind};
use tempfile::tempdir;

use common::{ORDERS_SHEET, sample_records, write_template};

fn file_names(dir: &Path) -> BTreeSet<String> {
    fs::read_dir(dir)
        .expect("output directory listed")
        .map(|entry| {
            entry
                .expect("directory entry")
                .file_name()
                .to_string_lossy()
                .into_owned()
        })
        .collect()
}

#[test]
fn two_records_produce_two_named_copies() {
    let temp_dir = tempdir().expect("temporary directory");
    let template = temp_dir.path().join("input.xlsx");
    let output_root = temp_dir.path().join("out");
    write_template(&template);

    let result = BatchOrchestrator::default()
        .run(&sample_records(), &template, &output_root)
        .expect("batch completed");

    assert_eq!(result.len(), 2);
    let paths: Vec<PathBuf> = result
        .entries
        .iter()
        .map(|entry| entry.output_path().cloned().expect("record succeeded"))
        .collect();
    assert_eq!(
        paths,
        [output_root.join("1-A.xlsx"), output_root.join("2-B.xlsx")]
    );

    for path in &paths {
        let workbook = excel_read::read_workbook(path).expect("derived file parses");
        let orders = workbook.sheet(ORDERS_SHEET).expect("template sheet kept");
        assert_eq!(orders.get(0, 0), Some(&CellValue::String("Item".into())));
    }
}

#[test]
fn result_keeps_input_order_and_length() {
    let temp_dir = tempdir().expect("temporary directory");
    let template = temp_dir.path().join("input.xlsx");
    write_template(&template);
    let records: Vec<Record> = [9, 3, 5, 1]
        .into_iter()
        .map(|id| Record::new(id, format!("item {id}")))
        .collect();

    let result = BatchOrchestrator::default()
        .run(&records, &template, &temp_dir.path().join("out"))
        .expect("batch completed");

    let ids: Vec<RecordId> = result.entries.iter().map(|e| e.record_id).collect();
    assert_eq!(ids, [9, 3, 5, 1]);
    assert_eq!(result.summary().succeeded, 4);
}

#[test]
fn empty_record_list_yields_empty_result() {
    let temp_dir = tempdir().expect("temporary directory");
    let template = temp_dir.path().join("input.xlsx");
    let output_root = temp_dir.path().join("out");
    write_template(&template);

    let result = BatchOrchestrator::default()
        .run(&[], &template, &output_root)
        .expect("batch completed");

    assert!(result.is_empty());
    assert!(output_root.is_dir());
}

#[test]
fn missing_template_fails_before_creating_output_root() {
    let temp_dir = tempdir().expect("temporary directory");
    let output_root = temp_dir.path().join("out");

    let error = BatchOrchestrator::default()
        .run(
            &sample_records(),
            &temp_dir.path().join("absent.xlsx"),
            &output_root,
        )
        .expect_err("missing template rejected");

    assert!(matches!(error, ExportError::SourceNotFound(_)));
    assert!(!output_root.exists());
}

#[test]
fn empty_paths_are_invalid_arguments() {
    let temp_dir = tempdir().expect("temporary directory");
    let template = temp_dir.path().join("input.xlsx");
    write_template(&template);
    let orchestrator = BatchOrchestrator::default();

    let error = orchestrator
        .run(&sample_records(), Path::new(""), temp_dir.path())
        .expect_err("empty template path rejected");
    assert!(matches!(error, ExportError::InvalidArgument(_)));

    let error = orchestrator
        .run(&sample_records(), &template, Path::new(""))
        .expect_err("empty output path rejected");
    assert!(matches!(error, ExportError::InvalidArgument(_)));
}

#[test]
fn duplicate_ids_are_rejected_up_front() {
    let temp_dir = tempdir().expect("temporary directory");
    let template = temp_dir.path().join("input.xlsx");
    let output_root = temp_dir.path().join("out");
    write_template(&template);
    let records = vec![Record::new(1, "A"), Record::new(1, "B")];

    let error = BatchOrchestrator::default()
        .run(&records, &template, &output_root)
        .expect_err("duplicate ids rejected");

    assert!(matches!(error, ExportError::InvalidArgument(_)));
    assert!(!output_root.exists());
}

#[test]
fn blocked_destination_fails_only_its_record() {
    let temp_dir = tempdir().expect("temporary directory");
    let template = temp_dir.path().join("input.xlsx");
    let output_root = temp_dir.path().join("out");
    write_template(&template);
    let records = vec![
        Record::new(1, "A"),
        Record::new(2, "B"),
        Record::new(3, "C"),
    ];
    // A directory where record 2's file should go makes its write fail.
    fs::create_dir_all(output_root.join("2-B.xlsx")).expect("blocking directory");

    let result = BatchOrchestrator::default()
        .run(&records, &template, &output_root)
        .expect("batch completed");

    assert_eq!(result.len(), 3);
    assert!(result.entries[0].is_success());
    assert!(result.entries[2].is_success());
    match &result.entries[1].status {
        OutcomeStatus::Failed { kind, message } => {
            assert_eq!(*kind, FailureKind::IoFailure);
            assert!(message.contains("2-B.xlsx"));
        }
        other => panic!("expected failure, got {other:?}"),
    }

    let failed: Vec<RecordId> = result.failed().map(|e| e.record_id).collect();
    assert_eq!(failed, [2]);
    excel_read::read_workbook(&output_root.join("1-A.xlsx")).expect("first copy parses");
    excel_read::read_workbook(&output_root.join("3-C.xlsx")).expect("third copy parses");
}

#[test]
fn malformed_template_fails_each_record_without_aborting() {
    let temp_dir = tempdir().expect("temporary directory");
    let template = temp_dir.path().join("input.xlsx");
    let output_root = temp_dir.path().join("out");
    fs::write(&template, b"plain text").expect("corrupt template written");

    let result = BatchOrchestrator::default()
        .run(&sample_records(), &template, &output_root)
        .expect("batch completed");

    assert_eq!(result.summary().failed, 2);
    assert!(result.entries.iter().all(|entry| matches!(
        entry.status,
        OutcomeStatus::Failed {
            kind: FailureKind::MalformedTemplate,
            ..
        }
    )));
    assert!(file_names(&output_root).is_empty());
}

struct FailingOn {
    id: RecordId,
    inner: XlsxDuplicator,
}

impl TemplateDuplicator for FailingOn {
    fn duplicate(&self, source: &Path, destination: &Path) -> Result<(), DuplicationError> {
        self.inner.duplicate(source, destination)
    }

    fn duplicate_record(
        &self,
        source: &Path,
        destination: &Path,
        record: &Record,
    ) -> Result<(), DuplicationError> {
        if record.id == self.id {
            return Err(DuplicationError::IoFailure {
                path: destination.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "locked"),
            });
        }
        self.inner.duplicate_record(source, destination, record)
    }
}

#[test]
fn custom_duplicator_failure_is_isolated_and_reported() {
    let temp_dir = tempdir().expect("temporary directory");
    let template = temp_dir.path().join("input.xlsx");
    let output_root = temp_dir.path().join("out");
    write_template(&template);
    let seen = RefCell::new(Vec::new());

    let orchestrator = BatchOrchestrator::new(FailingOn {
        id: 1,
        inner: XlsxDuplicator::new(),
    })
    .with_progress(|position: usize, total: usize, outcome: &RecordOutcome| {
        seen.borrow_mut()
            .push((position, total, outcome.record_id, outcome.is_success()));
    });
    let result = orchestrator
        .run(&sample_records(), &template, &output_root)
        .expect("batch completed");
    drop(orchestrator);

    assert_eq!(
        seen.into_inner(),
        [(1, 2, 1, false), (2, 2, 2, true)]
    );
    assert_eq!(file_names(&output_root), BTreeSet::from(["2-B.xlsx".to_string()]));

    let summary = result.summary().to_string();
    assert!(summary.starts_with("2 record(s): 1 succeeded, 1 failed"));
    assert!(summary.contains("[1] A: I/O failure"));
    assert!(summary.contains("locked"));
}

#[test]
fn cancellation_skips_remaining_records() {
    let temp_dir = tempdir().expect("temporary directory");
    let template = temp_dir.path().join("input.xlsx");
    let output_root = temp_dir.path().join("out");
    write_template(&template);
    let cancel = Arc::new(AtomicBool::new(false));
    let trigger = Arc::clone(&cancel);
    let records = vec![
        Record::new(1, "A"),
        Record::new(2, "B"),
        Record::new(3, "C"),
    ];

    let result = BatchOrchestrator::default()
        .with_cancel_flag(cancel)
        .with_progress(move |position: usize, _total: usize, _outcome: &RecordOutcome| {
            if position == 1 {
                trigger.store(true, Ordering::SeqCst);
            }
        })
        .run(&records, &template, &output_root)
        .expect("batch completed");

    assert_eq!(result.len(), 3);
    assert!(result.entries[0].is_success());
    assert_eq!(result.entries[1].status, OutcomeStatus::Skipped);
    assert_eq!(result.entries[2].status, OutcomeStatus::Skipped);
    assert_eq!(file_names(&output_root), BTreeSet::from(["1-A.xlsx".to_string()]));
    assert!(result.summary().to_string().contains("2 skipped"));
}

#[test]
fn repeated_runs_produce_identical_outputs() {
    let temp_dir = tempdir().expect("temporary directory");
    let template = temp_dir.path().join("input.xlsx");
    write_template(&template);
    let first_root = temp_dir.path().join("first");
    let second_root = temp_dir.path().join("second");
    let orchestrator = BatchOrchestrator::new(XlsxDuplicator::new().with_record_stamp(true));

    orchestrator
        .run(&sample_records(), &template, &first_root)
        .expect("first batch completed");
    orchestrator
        .run(&sample_records(), &template, &second_root)
        .expect("second batch completed");

    let names = file_names(&first_root);
    assert_eq!(names, file_names(&second_root));
    for name in &names {
        let first = fs::read(first_root.join(name)).expect("first copy");
        let second = fs::read(second_root.join(name)).expect("second copy");
        assert_eq!(first, second, "{name}");
    }
}

#[test]
fn run_source_reads_records_from_the_source() {
    let temp_dir = tempdir().expect("temporary directory");
    let template = temp_dir.path().join("input.xlsx");
    let output_root = temp_dir.path().join("out");
    write_template(&template);

    let result = BatchOrchestrator::default()
        .run_source(&sample_records(), &template, &output_root)
        .expect("batch completed");

    assert_eq!(result.summary().succeeded, 2);
}

#[test]
fn batch_result_serializes_status_and_kind() {
    let temp_dir = tempdir().expect("temporary directory");
    let template = temp_dir.path().join("input.xlsx");
    let output_root = temp_dir.path().join("out");
    write_template(&template);
    fs::create_dir_all(output_root.join("2-B.xlsx")).expect("blocking directory");

    let result = BatchOrchestrator::default()
        .run(&sample_records(), &template, &output_root)
        .expect("batch completed");
    let json = serde_json::to_value(&result).expect("result serialized");

    let entries = json["entries"].as_array().expect("entries array");
    assert_eq!(entries[0]["record_id"], 1);
    assert_eq!(entries[0]["status"], "succeeded");
    assert!(entries[0]["path"].as_str().expect("path").ends_with("1-A.xlsx"));
    assert_eq!(entries[1]["status"], "failed");
    assert_eq!(entries[1]["kind"], "io_failure");
}
