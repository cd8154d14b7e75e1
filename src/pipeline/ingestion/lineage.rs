use std::path::{Path, PathBuf};
use tracing::debug;

use super::delimited::read_rows;
use crate::constants::CELL_LIST_SOURCE;
use crate::error::{IngestError, Result};
use crate::types::{AttributeKind, RawAttribute, RawRecord, SourceAdapter, SourceTag};

fn clean(field: &str) -> &str {
    field.trim().trim_matches('"')
}

/// Tab-separated cell list: `name, lineage name, description`.
///
/// Every row yields a `LineageName` record followed by a `Description` record
/// for the same raw name; consumers rely on that pairing.
pub struct LineageTsv {
    path: PathBuf,
}

impl LineageTsv {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl SourceAdapter for LineageTsv {
    fn source_name(&self) -> &str {
        CELL_LIST_SOURCE
    }

    fn read_records(&mut self) -> Result<Vec<RawRecord>> {
        let tag = SourceTag::new(CELL_LIST_SOURCE);
        let mut records = Vec::new();
        for (line, row) in read_rows(&self.path, b'\t', false)? {
            if row.len() < 3 {
                return Err(IngestError::source_format(
                    CELL_LIST_SOURCE,
                    line,
                    format!("expected 3 tab-separated columns, found {}", row.len()),
                ));
            }
            let name = clean(&row[0]);
            let lineage = clean(&row[1]);
            if name.is_empty() {
                return Err(IngestError::source_format(CELL_LIST_SOURCE, line, "empty cell name"));
            }
            for (attribute, value) in [
                (AttributeKind::LineageName, lineage),
                (AttributeKind::Description, clean(&row[2])),
            ] {
                records.push(RawRecord::Attribute(RawAttribute {
                    entity_name: name.to_string(),
                    attribute,
                    value: value.to_string(),
                    source_tag: tag.clone(),
                }));
            }
        }
        debug!("Read {} cell list rows from {}", records.len() / 2, self.path.display());
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn attributes(records: Vec<RawRecord>) -> Vec<RawAttribute> {
        records
            .into_iter()
            .map(|r| match r {
                RawRecord::Attribute(a) => a,
                other => panic!("unexpected {:?}", other),
            })
            .collect()
    }

    #[test]
    fn test_rows_emit_lineage_then_description() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "Cell\tLineage Name\tDescription\n\
             \"AVFL/R\"\t\"W.aaa\"\t\"Interneuron, ventral cord\" \n\
             ADAL\tAB alapppaaa\tRing interneuron\n"
        )
        .unwrap();

        let records = attributes(LineageTsv::new(file.path()).read_records().unwrap());
        assert_eq!(records.len(), 4);
        assert_eq!(records[0].entity_name, "AVFL/R");
        assert_eq!(records[0].attribute, AttributeKind::LineageName);
        assert_eq!(records[0].value, "W.aaa");
        assert_eq!(records[1].attribute, AttributeKind::Description);
        assert_eq!(records[1].value, "Interneuron, ventral cord");
        assert_eq!(records[3].value, "Ring interneuron");
    }

    #[test]
    fn test_missing_column_is_malformed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "Cell\tLineage Name\tDescription\nADAL\tAB alapppaaa\n").unwrap();
        let err = LineageTsv::new(file.path()).read_records().unwrap_err();
        assert!(matches!(err, IngestError::SourceFormat { line: 2, .. }));
    }
}
