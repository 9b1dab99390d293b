use std::path::Path;

use tracing::{debug, instrument};

use crate::exporter::error::DuplicationError;
use crate::exporter::io::package::{Package, PackageError};
use crate::exporter::io::{excel_read, package, sheet_xml};
use crate::exporter::model::{CellValue, Record};

/// Produces a copy of a template workbook at a destination path.
pub trait TemplateDuplicator {
    /// Copies `source` to `destination`, creating or overwriting it.
    fn duplicate(&self, source: &Path, destination: &Path) -> Result<(), DuplicationError>;

    /// Copies `source` to `destination` on behalf of `record`.
    ///
    /// Implementations may use the record to personalise the copy; the
    /// default ignores it.
    fn duplicate_record(
        &self,
        source: &Path,
        destination: &Path,
        record: &Record,
    ) -> Result<(), DuplicationError> {
        let _ = record;
        self.duplicate(source, destination)
    }
}

/// Duplicates `.xlsx` templates part by part.
///
/// The template is first parsed as a workbook so that files which are not
/// well-formed workbooks are rejected. Every part of the package is then
/// written to the destination unchanged, which keeps formulas, styles,
/// merges and column widths intact. With stamping enabled every per-record
/// copy gains one row on its first sheet holding the record id and name.
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxDuplicator {
    stamp_records: bool,
}

impl XlsxDuplicator {
    /// Creates a duplicator with record stamping off. The command line turns
    /// stamping on unless `--no-stamp` is given.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables appending the record row to per-record copies.
    pub fn with_record_stamp(mut self, enabled: bool) -> Self {
        self.stamp_records = enabled;
        self
    }

    fn copy(
        &self,
        source: &Path,
        destination: &Path,
        record: Option<&Record>,
    ) -> Result<(), DuplicationError> {
        if !source.is_file() {
            return Err(DuplicationError::SourceNotFound(source.to_path_buf()));
        }

        let workbook = excel_read::read_workbook(source)?;
        debug!(sheet_count = workbook.sheets.len(), "template validated");

        let mut contents = package::read_package(source)
            .map_err(|error| DuplicationError::from_package(source, error))?;

        if let Some(record) = record {
            let row = stamp_record(&mut contents, record)
                .map_err(|error| DuplicationError::from_package(source, error))?;
            debug!(row, "record row appended");
        }

        package::write_package(destination, &contents)
            .map_err(|error| DuplicationError::from_package(destination, error))
    }
}

/// Appends `[id, name]` below the last row of the first sheet and returns
/// the one-based row number.
fn stamp_record(contents: &mut Package, record: &Record) -> Result<u32, PackageError> {
    let part = contents.first_sheet_part()?;
    let xml = contents
        .part(&part)
        .ok_or_else(|| PackageError::MissingPart(part.clone()))?;
    let (patched, row) = sheet_xml::append_row(
        xml,
        &[
            CellValue::Number(f64::from(record.id)),
            CellValue::String(record.name.clone()),
        ],
    )?;
    contents.replace_part(&part, patched)?;
    Ok(row)
}

impl TemplateDuplicator for XlsxDuplicator {
    #[instrument(
        level = "debug",
        skip_all,
        fields(source = %source.display(), destination = %destination.display())
    )]
    fn duplicate(&self, source: &Path, destination: &Path) -> Result<(), DuplicationError> {
        self.copy(source, destination, None)
    }

    #[instrument(
        level = "debug",
        skip_all,
        fields(record_id = record.id, destination = %destination.display())
    )]
    fn duplicate_record(
        &self,
        source: &Path,
        destination: &Path,
        record: &Record,
    ) -> Result<(), DuplicationError> {
        let stamp = self.stamp_records.then_some(record);
        self.copy(source, destination, stamp)
    }
}
