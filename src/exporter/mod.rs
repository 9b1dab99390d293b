pub mod batch;
pub mod duplicate;
pub mod error;
pub mod io;
pub mod model;
pub mod naming;
pub mod source;
pub mod store;

pub use error::{DuplicationError, ExportError, FailureKind, Result};
