//! Core library for the excel-exporter command line application.
//!
//! The library duplicates a template workbook once per record of a small
//! record set. Workbook IO lives under [`exporter::io`], records and batch
//! outcomes inside [`exporter::model`], output file naming in
//! [`exporter::naming`], the per-record copy in [`exporter::duplicate`], and
//! the batch loop with its failure isolation in [`exporter::batch`]. Records
//! come from any [`exporter::source::RecordSource`], such as the persisted
//! [`exporter::store::RecordStore`].

pub mod exporter;

pub use exporter::{
    DuplicationError, ExportError, FailureKind, Result, batch, duplicate, error, io, model,
    naming, source, store,
};
