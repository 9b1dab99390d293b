pub mod excel_read;
pub mod package;
pub mod sheet_xml;
