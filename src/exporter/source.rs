use crate::exporter::error::Result;
use crate::exporter::model::Record;

/// Supplies the ordered records of a batch run.
pub trait RecordSource {
    fn load_records(&self) -> Result<Vec<Record>>;
}

impl RecordSource for Vec<Record> {
    fn load_records(&self) -> Result<Vec<Record>> {
        Ok(self.clone())
    }
}
