use std::path::Path;

use calamine::{DataType, Reader, Xlsx, open_workbook};

use crate::exporter::error::DuplicationError;
use crate::exporter::model::{CellValue, Sheet, Workbook};

/// Parses an `.xlsx` file into the in-memory workbook model of cell values.
///
/// Every sheet is read in document order. The file handle is released before
/// this function returns, on success and on error alike.
pub fn read_workbook(path: &Path) -> Result<Workbook, DuplicationError> {
    let mut reader: Xlsx<_> =
        open_workbook(path).map_err(|error| DuplicationError::from_read(path, error))?;

    let sheet_names = reader.sheet_names().to_vec();
    if sheet_names.is_empty() {
        return Err(DuplicationError::malformed(
            path,
            "workbook contains no sheets",
        ));
    }

    let mut sheets = Vec::with_capacity(sheet_names.len());
    for name in sheet_names {
        let range = read_sheet(&mut reader, &name, path)?;
        sheets.push(ingest_range(&name, &range, path)?);
    }

    Ok(Workbook { sheets })
}

fn read_sheet<R: std::io::Read + std::io::Seek>(
    reader: &mut Xlsx<R>,
    name: &str,
    path: &Path,
) -> Result<calamine::Range<DataType>, DuplicationError> {
    reader
        .worksheet_range(name)
        .ok_or_else(|| DuplicationError::malformed(path, format!("missing sheet '{name}'")))?
        .map_err(|error| DuplicationError::from_read(path, error))
}

fn ingest_range(
    name: &str,
    range: &calamine::Range<DataType>,
    path: &Path,
) -> Result<Sheet, DuplicationError> {
    let mut sheet = Sheet::new(name);
    let Some((row_offset, col_offset)) = range.start() else {
        return Ok(sheet);
    };

    for (row, col, cell) in range.used_cells() {
        let Some(value) = cell_to_value(cell) else {
            continue;
        };
        let row = row_offset + row as u32;
        let col = u16::try_from(col_offset as usize + col).map_err(|_| {
            DuplicationError::malformed(
                path,
                format!("sheet '{name}' uses a column beyond the xlsx limit"),
            )
        })?;
        sheet.set(row, col, value);
    }

    Ok(sheet)
}

fn cell_to_value(cell: &DataType) -> Option<CellValue> {
    match cell {
        DataType::Empty => None,
        DataType::String(value) => Some(CellValue::String(value.clone())),
        DataType::Float(value) => Some(CellValue::Number(*value)),
        DataType::Int(value) => Some(CellValue::Number(*value as f64)),
        DataType::Bool(value) => Some(CellValue::Bool(*value)),
        DataType::DateTime(value) => Some(CellValue::DateTime(*value)),
        DataType::Error(error) => Some(CellValue::Error(error.to_string())),
        other => Some(CellValue::String(other.to_string())),
    }
}
