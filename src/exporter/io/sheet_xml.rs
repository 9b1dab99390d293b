use std::fmt::Write as _;

use quick_xml::Reader as XmlReader;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};

use crate::exporter::io::package::{PackageError, attribute};
use crate::exporter::model::CellValue;

/// Appends one row of `values` below the last row of a worksheet part.
///
/// Every byte of the sheet outside `<sheetData>` and `<dimension>` is kept
/// as is. Returns the patched XML and the one-based number of the new row.
pub fn append_row(xml: &[u8], values: &[CellValue]) -> Result<(Vec<u8>, u32), PackageError> {
    let mut reader = XmlReader::from_reader(xml);
    let mut last_row = 0u32;
    let mut dimension: Option<(usize, usize, String, String)> = None;
    let mut insertion: Option<Insertion> = None;

    loop {
        let start = reader.buffer_position() as usize;
        let event = reader.read_event()?;
        let end = reader.buffer_position() as usize;
        match event {
            Event::Start(element) | Event::Empty(element)
                if element.local_name().as_ref() == b"row" =>
            {
                last_row = match attribute(&element, b"r")? {
                    Some(value) => last_row.max(value.trim().parse::<u32>().map_err(|_| {
                        PackageError::Invalid(format!("invalid row number '{value}'"))
                    })?),
                    None => last_row.saturating_add(1),
                };
            }
            Event::Empty(element) if element.local_name().as_ref() == b"dimension" => {
                if let Some(reference) = attribute(&element, b"ref")? {
                    dimension = Some((start, end, qualified_name(&element), reference));
                }
            }
            Event::End(element) if element.local_name().as_ref() == b"sheetData" => {
                insertion = Some(Insertion {
                    start,
                    end: start,
                    prefix: prefix_of(element.name().as_ref()),
                    wrap: None,
                });
                break;
            }
            Event::Empty(element) if element.local_name().as_ref() == b"sheetData" => {
                let name = qualified_name(&element);
                insertion = Some(Insertion {
                    start,
                    end,
                    prefix: prefix_of(name.as_bytes()),
                    wrap: Some(name),
                });
                break;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let insertion =
        insertion.ok_or_else(|| PackageError::Invalid("worksheet has no sheetData".into()))?;
    let row = last_row
        .checked_add(1)
        .ok_or_else(|| PackageError::Invalid("worksheet row limit reached".into()))?;
    let last_col = values.len().saturating_sub(1);
    let row_xml = render_row(&insertion.prefix, row, values);

    let mut out = Vec::with_capacity(xml.len() + row_xml.len() + 32);
    let mut cursor = 0;
    if let Some((dim_start, dim_end, name, reference)) = dimension {
        out.extend_from_slice(&xml[cursor..dim_start]);
        let widened = widen_reference(&reference, row, last_col);
        out.extend_from_slice(format!("<{name} ref=\"{widened}\"/>").as_bytes());
        cursor = dim_end;
    }
    out.extend_from_slice(&xml[cursor..insertion.start]);
    match &insertion.wrap {
        Some(name) => {
            out.extend_from_slice(format!("<{name}>{row_xml}</{name}>").as_bytes());
        }
        None => out.extend_from_slice(row_xml.as_bytes()),
    }
    out.extend_from_slice(&xml[insertion.end..]);

    Ok((out, row))
}

struct Insertion {
    start: usize,
    end: usize,
    prefix: String,
    /// Element name when `<sheetData/>` was empty and must be opened.
    wrap: Option<String>,
}

fn qualified_name(element: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(element.name().as_ref()).into_owned()
}

fn prefix_of(name: &[u8]) -> String {
    let name = String::from_utf8_lossy(name);
    match name.split_once(':') {
        Some((prefix, _)) => format!("{prefix}:"),
        None => String::new(),
    }
}

fn render_row(p: &str, row: u32, values: &[CellValue]) -> String {
    let mut xml = format!("<{p}row r=\"{row}\">");
    for (index, value) in values.iter().enumerate() {
        let cell = format!("{}{row}", column_name(index));
        // Writing to a String cannot fail.
        let _ = match value {
            CellValue::Number(number) | CellValue::DateTime(number) => {
                write!(xml, "<{p}c r=\"{cell}\"><{p}v>{number}</{p}v></{p}c>")
            }
            CellValue::Bool(flag) => write!(
                xml,
                "<{p}c r=\"{cell}\" t=\"b\"><{p}v>{}</{p}v></{p}c>",
                u8::from(*flag)
            ),
            CellValue::String(text) | CellValue::Error(text) => write!(
                xml,
                "<{p}c r=\"{cell}\" t=\"inlineStr\"><{p}is><{p}t xml:space=\"preserve\">{}</{p}t></{p}is></{p}c>",
                escape(text.as_str())
            ),
        };
    }
    xml.push_str(&format!("</{p}row>"));
    xml
}

/// Spreadsheet column letters for a zero-based index: 0 → A, 26 → AA.
pub fn column_name(index: usize) -> String {
    let mut index = index + 1;
    let mut letters = Vec::new();
    while index > 0 {
        let remainder = (index - 1) % 26;
        letters.push(b'A' + remainder as u8);
        index = (index - 1) / 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

fn column_index(letters: &str) -> usize {
    letters
        .bytes()
        .filter(u8::is_ascii_alphabetic)
        .fold(0, |acc, byte| acc * 26 + usize::from(byte.to_ascii_uppercase() - b'A' + 1))
        .saturating_sub(1)
}

fn split_cell(reference: &str) -> (&str, u32) {
    let digits = reference
        .find(|ch: char| ch.is_ascii_digit())
        .unwrap_or(reference.len());
    let (letters, number) = reference.split_at(digits);
    (letters, number.parse().unwrap_or(1))
}

/// Extends a dimension reference such as `A1:C4` to cover `row` and
/// columns up to `last_col`.
fn widen_reference(reference: &str, row: u32, last_col: usize) -> String {
    let (first, last) = reference.split_once(':').unwrap_or((reference, reference));
    let (last_letters, last_row) = split_cell(last);
    let col = column_index(last_letters).max(last_col);
    format!("{first}:{}{}", column_name(col), last_row.max(row))
}
