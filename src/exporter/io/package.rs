use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use quick_xml::Reader as XmlReader;
use quick_xml::events::{BytesStart, Event};
use thiserror::Error;
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

const PACKAGE_RELS: &str = "_rels/.rels";
const OFFICE_DOCUMENT_REL: &str = "/officeDocument";

/// Failure while reading, patching or writing an OPC package.
#[derive(Debug, Error)]
pub enum PackageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("missing package part '{0}'")]
    MissingPart(String),

    #[error("invalid package structure: {0}")]
    Invalid(String),
}

/// One entry of the zip container, kept as uncompressed bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct Part {
    pub name: String,
    /// `None` for directory entries.
    pub data: Option<Vec<u8>>,
}

/// Every part of an `.xlsx` file in archive order.
///
/// Parts are carried through untouched unless explicitly replaced, so
/// styles, formulas, merges and anything else the workbook holds survive a
/// read/write cycle.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Package {
    pub parts: Vec<Part>,
}

impl Package {
    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts
            .iter()
            .find(|part| part.name == name)
            .and_then(|part| part.data.as_deref())
    }

    fn required_part(&self, name: &str) -> Result<&[u8], PackageError> {
        self.part(name)
            .ok_or_else(|| PackageError::MissingPart(name.to_string()))
    }

    /// Replaces the bytes of an existing part.
    pub fn replace_part(&mut self, name: &str, data: Vec<u8>) -> Result<(), PackageError> {
        let part = self
            .parts
            .iter_mut()
            .find(|part| part.name == name && part.data.is_some())
            .ok_or_else(|| PackageError::MissingPart(name.to_string()))?;
        part.data = Some(data);
        Ok(())
    }

    /// Resolves the part name of the first worksheet in workbook order.
    pub fn first_sheet_part(&self) -> Result<String, PackageError> {
        let root_rels = parse_relationships(self.required_part(PACKAGE_RELS)?)?;
        let workbook_part = root_rels
            .iter()
            .find(|rel| rel.kind.ends_with(OFFICE_DOCUMENT_REL))
            .map(|rel| resolve_target("", &rel.target))
            .ok_or_else(|| PackageError::Invalid("no officeDocument relationship".into()))?;

        let rel_id = first_sheet_rel_id(self.required_part(&workbook_part)?)?;
        let (dir, file) = split_part_name(&workbook_part);
        let rels_part = if dir.is_empty() {
            format!("_rels/{file}.rels")
        } else {
            format!("{dir}/_rels/{file}.rels")
        };
        let workbook_rels = parse_relationships(self.required_part(&rels_part)?)?;
        workbook_rels
            .iter()
            .find(|rel| rel.id == rel_id)
            .map(|rel| resolve_target(dir, &rel.target))
            .ok_or_else(|| {
                PackageError::Invalid(format!("relationship '{rel_id}' not found in {rels_part}"))
            })
    }
}

/// Loads every part of the zip container at `path`. The file is closed
/// before returning.
pub fn read_package(path: &Path) -> Result<Package, PackageError> {
    let file = File::open(path)?;
    let mut archive = ZipArchive::new(file)?;
    let mut parts = Vec::with_capacity(archive.len());

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let name = entry.name().to_string();
        if entry.is_dir() {
            parts.push(Part { name, data: None });
            continue;
        }
        let mut data = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut data)?;
        parts.push(Part {
            name,
            data: Some(data),
        });
    }

    Ok(Package { parts })
}

/// Writes `package` as a zip container, replacing any existing file.
///
/// Entries carry a fixed timestamp so equal packages produce equal bytes.
pub fn write_package(path: &Path, package: &Package) -> Result<(), PackageError> {
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());

    let mut writer = ZipWriter::new(File::create(path)?);
    for part in &package.parts {
        match &part.data {
            None => writer.add_directory(part.name.as_str(), options)?,
            Some(data) => {
                writer.start_file(part.name.as_str(), options)?;
                writer.write_all(data)?;
            }
        }
    }
    writer.finish()?;
    Ok(())
}

#[derive(Debug)]
struct Relationship {
    id: String,
    kind: String,
    target: String,
}

fn parse_relationships(xml: &[u8]) -> Result<Vec<Relationship>, PackageError> {
    let mut reader = XmlReader::from_reader(xml);
    let mut relationships = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(element) | Event::Empty(element)
                if element.local_name().as_ref() == b"Relationship" =>
            {
                relationships.push(Relationship {
                    id: attribute(&element, b"Id")?.unwrap_or_default(),
                    kind: attribute(&element, b"Type")?.unwrap_or_default(),
                    target: attribute(&element, b"Target")?.unwrap_or_default(),
                });
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(relationships)
}

fn first_sheet_rel_id(workbook_xml: &[u8]) -> Result<String, PackageError> {
    let mut reader = XmlReader::from_reader(workbook_xml);

    loop {
        match reader.read_event()? {
            Event::Start(element) | Event::Empty(element)
                if element.local_name().as_ref() == b"sheet" =>
            {
                // The relationship id is the namespaced `r:id`, not `sheetId`.
                for attr in element.attributes() {
                    let attr = attr.map_err(quick_xml::Error::from)?;
                    if attr.key.prefix().is_some() && attr.key.local_name().as_ref() == b"id" {
                        return Ok(attr.unescape_value()?.into_owned());
                    }
                }
                return Err(PackageError::Invalid("first sheet has no relationship id".into()));
            }
            Event::Eof => {
                return Err(PackageError::Invalid("workbook lists no sheets".into()));
            }
            _ => {}
        }
    }
}

pub(crate) fn attribute(
    element: &BytesStart<'_>,
    local_name: &[u8],
) -> Result<Option<String>, PackageError> {
    for attr in element.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.local_name().as_ref() == local_name {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn split_part_name(name: &str) -> (&str, &str) {
    name.rsplit_once('/').unwrap_or(("", name))
}

/// Resolves a relationship target against the directory of its source part.
fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}
