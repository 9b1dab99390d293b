#![allow(dead_code)]

use std::path::Path;

use excel_exporter::model::Record;
use rust_xlsxwriter::Workbook;

/// Name of the first sheet of the sample template.
pub const ORDERS_SHEET: &str = "Orders";
/// Name of the second sheet of the sample template.
pub const NOTES_SHEET: &str = "Notes";

/// Writes a two-sheet template: a header and one data row on `Orders`, a
/// single note on `Notes`.
pub fn write_template(path: &Path) {
    let mut workbook = Workbook::new();

    let orders = workbook.add_worksheet();
    orders.set_name(ORDERS_SHEET).expect("sheet named");
    orders.write_string(0, 0, "Item").expect("header written");
    orders.write_string(0, 1, "Qty").expect("header written");
    orders.write_string(1, 0, "Widget").expect("cell written");
    orders.write_number(1, 1, 3).expect("cell written");

    let notes = workbook.add_worksheet();
    notes.set_name(NOTES_SHEET).expect("sheet named");
    notes.write_string(0, 0, "keep").expect("cell written");
    notes.write_boolean(0, 1, true).expect("cell written");

    workbook.save(path).expect("template saved");
}

pub fn sample_records() -> Vec<Record> {
    vec![Record::new(1, "A"), Record::new(2, "B")]
}
