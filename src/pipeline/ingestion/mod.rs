// Source adapters: every dataset reader turns its rows into RawRecords

pub mod bibtex;
pub mod delimited;
pub mod lineage;
pub mod relational;

pub use bibtex::read_first_entry;
pub use delimited::{AnnotationsCsv, ConnectomeSheet, EdgelistCsv};
pub use lineage::LineageTsv;
pub use relational::{CelegansDb, RelationalQuery};
