use std::path::{Path, PathBuf};

use crate::exporter::model::Record;

/// Extension given to every derived file.
pub const OUTPUT_EXTENSION: &str = "xlsx";
/// Maximum number of characters kept from the record name.
pub const MAX_NAME_CHARS: usize = 64;

/// Computes the output path for `record` below `output_root`.
///
/// The file name is `{id}-{name}.xlsx` with the name sanitised for use as a
/// single path segment, or `{id}.xlsx` when nothing of the name survives.
/// The id prefix keeps names unique per record and never lets the result
/// resolve to `.`, `..` or a reserved device name.
pub fn name_for(record: &Record, output_root: &Path) -> PathBuf {
    output_root.join(file_name_for(record))
}

/// File name component of [`name_for`].
pub fn file_name_for(record: &Record) -> String {
    let name = sanitize_file_component(&record.name);
    if name.is_empty() {
        format!("{}.{OUTPUT_EXTENSION}", record.id)
    } else {
        format!("{}-{name}.{OUTPUT_EXTENSION}", record.id)
    }
}

fn sanitize_file_component(raw: &str) -> String {
    let invalid = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];
    let mut sanitized = String::with_capacity(raw.len());
    for ch in raw.chars() {
        let replaced = if invalid.contains(&ch) || ch.is_control() {
            '_'
        } else {
            ch
        };
        if replaced == '_' && sanitized.ends_with('_') {
            continue;
        }
        sanitized.push(replaced);
    }

    let trimmed = sanitized.trim_matches(|ch: char| ch == '.' || ch == '_' || ch.is_whitespace());
    let mut result: String = trimmed.chars().take(MAX_NAME_CHARS).collect();
    // Truncation can expose a trailing dot or space again.
    while result.ends_with(|ch: char| ch == '.' || ch == '_' || ch.is_whitespace()) {
        result.pop();
    }
    result
}
