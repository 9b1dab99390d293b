use std::collections::BTreeMap;

/// Zero-based `(row, column)` coordinate of a cell.
pub type CellRef = (u32, u16);

/// A typed cell value. Empty cells are not stored.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    String(String),
    Number(f64),
    Bool(bool),
    /// Excel serial date-time.
    DateTime(f64),
    /// Error value such as `#DIV/0!`.
    Error(String),
}

/// A single worksheet with sparse cell storage.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub cells: BTreeMap<CellRef, CellValue>,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cells: BTreeMap::new(),
        }
    }

    /// Index of the last row holding a value, if any.
    pub fn last_row(&self) -> Option<u32> {
        self.cells.keys().map(|(row, _)| *row).max()
    }

    pub fn set(&mut self, row: u32, col: u16, value: CellValue) {
        self.cells.insert((row, col), value);
    }

    pub fn get(&self, row: u32, col: u16) -> Option<&CellValue> {
        self.cells.get(&(row, col))
    }
}

/// In-memory representation of a spreadsheet document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|sheet| sheet.name == name)
    }
}
