use csv::{ReaderBuilder, StringRecord, Trim};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::constants::{EDGELIST_SOURCE, NEURON_CONNECT_SOURCE};
use crate::error::{IngestError, Result};
use crate::types::{
    AttributeKind, EdgeKind, RawAttribute, RawEdge, RawRecord, SourceAdapter, SourceTag,
};

/// Read every data row of a delimited file (header skipped), paired with its
/// 1-based line number.
pub(crate) fn read_rows(
    path: &Path,
    delimiter: u8,
    quoting: bool,
) -> Result<Vec<(usize, StringRecord)>> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .quoting(quoting)
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_path(path)?;

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let line = record.position().map(|p| p.line() as usize).unwrap_or(0);
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }
        rows.push((line, record));
    }
    Ok(rows)
}

fn require_columns(
    source: &str,
    line: usize,
    record: &StringRecord,
    expected: usize,
) -> Result<()> {
    if record.len() < expected {
        return Err(IngestError::source_format(
            source,
            line,
            format!("expected {} columns, found {}", expected, record.len()),
        ));
    }
    Ok(())
}

fn parse_weight(source: &str, line: usize, raw: &str) -> Result<u32> {
    if let Ok(weight) = raw.parse::<u32>() {
        return Ok(weight);
    }
    // Spreadsheet exports write integral cells as floats ("3.0")
    match raw.parse::<f64>() {
        Ok(value) if value >= 0.0 && value.fract() == 0.0 && value <= f64::from(u32::MAX) => {
            Ok(value as u32)
        }
        _ => Err(IngestError::source_format(
            source,
            line,
            format!("weight '{}' is not a non-negative integer", raw),
        )),
    }
}

/// Connectivity edgelist: `source,target,weight,type` with a header row.
pub struct EdgelistCsv {
    path: PathBuf,
    skipped: usize,
}

impl EdgelistCsv {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            skipped: 0,
        }
    }
}

impl SourceAdapter for EdgelistCsv {
    fn source_name(&self) -> &str {
        EDGELIST_SOURCE
    }

    fn read_records(&mut self) -> Result<Vec<RawRecord>> {
        let tag = SourceTag::new(EDGELIST_SOURCE);
        let mut records = Vec::new();
        for (line, row) in read_rows(&self.path, b',', true)? {
            require_columns(EDGELIST_SOURCE, line, &row, 4)?;
            let kind = match &row[3] {
                "chemical" => EdgeKind::Chemical,
                "electrical" => EdgeKind::Electrical,
                other => {
                    warn!("{}:{}: skipping unknown edge type '{}'", EDGELIST_SOURCE, line, other);
                    self.skipped += 1;
                    continue;
                }
            };
            records.push(RawRecord::Edge(RawEdge {
                pre_name: row[0].to_string(),
                post_name: row[1].to_string(),
                weight: parse_weight(EDGELIST_SOURCE, line, &row[2])?,
                kind,
                source_tag: tag.clone(),
            }));
        }
        debug!("Read {} edges from {}", records.len(), self.path.display());
        Ok(records)
    }

    fn skipped(&self) -> usize {
        self.skipped
    }
}

/// Connectivity spreadsheet exported as CSV: `pre,post,code,weight`.
pub struct ConnectomeSheet {
    path: PathBuf,
    skipped: usize,
}

impl ConnectomeSheet {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            skipped: 0,
        }
    }
}

impl SourceAdapter for ConnectomeSheet {
    fn source_name(&self) -> &str {
        NEURON_CONNECT_SOURCE
    }

    fn read_records(&mut self) -> Result<Vec<RawRecord>> {
        let tag = SourceTag::new(NEURON_CONNECT_SOURCE);
        let mut records = Vec::new();
        for (line, row) in read_rows(&self.path, b',', true)? {
            require_columns(NEURON_CONNECT_SOURCE, line, &row, 4)?;
            let Some(kind) = EdgeKind::from_code(&row[2]) else {
                warn!(
                    "{}:{}: skipping unknown relation code '{}'",
                    NEURON_CONNECT_SOURCE, line, &row[2]
                );
                self.skipped += 1;
                continue;
            };
            records.push(RawRecord::Edge(RawEdge {
                pre_name: row[0].to_string(),
                post_name: row[1].to_string(),
                weight: parse_weight(NEURON_CONNECT_SOURCE, line, &row[3])?,
                kind,
                source_tag: tag.clone(),
            }));
        }
        debug!("Read {} sheet rows from {}", records.len(), self.path.display());
        Ok(records)
    }

    fn skipped(&self) -> usize {
        self.skipped
    }
}

/// Neuron annotation table:
/// `entity,relation,value,evidence label,evidence url`.
pub struct AnnotationsCsv {
    path: PathBuf,
    source_name: String,
    skipped: usize,
}

impl AnnotationsCsv {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let source_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "annotations".to_string());
        Self {
            path,
            source_name,
            skipped: 0,
        }
    }
}

impl SourceAdapter for AnnotationsCsv {
    fn source_name(&self) -> &str {
        &self.source_name
    }

    fn read_records(&mut self) -> Result<Vec<RawRecord>> {
        let mut records = Vec::new();
        for (line, row) in read_rows(&self.path, b',', true)? {
            require_columns(&self.source_name, line, &row, 3)?;
            let Some(attribute) = AttributeKind::from_relation(&row[1]) else {
                debug!("{}:{}: ignoring relation '{}'", self.source_name, line, &row[1]);
                self.skipped += 1;
                continue;
            };
            let label = row.get(3).unwrap_or_default();
            let url = row.get(4).unwrap_or_default();
            records.push(RawRecord::Attribute(RawAttribute {
                entity_name: row[0].to_string(),
                attribute,
                value: row[2].to_string(),
                source_tag: SourceTag::new(label).with_uri(url),
            }));
        }
        debug!("Read {} annotations from {}", records.len(), self.path.display());
        Ok(records)
    }

    fn skipped(&self) -> usize {
        self.skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn edges(records: Vec<RawRecord>) -> Vec<RawEdge> {
        records
            .into_iter()
            .map(|r| match r {
                RawRecord::Edge(e) => e,
                other => panic!("unexpected {:?}", other),
            })
            .collect()
    }

    #[test]
    fn test_edgelist_rows_become_edges() {
        let file = write_temp(
            "Source,Target,Weight,Type\nAVAL,AVBL,5,chemical\n ADAL , ADAR , 2 , electrical\n",
        );
        let mut adapter = EdgelistCsv::new(file.path());
        let edges = edges(adapter.read_records().unwrap());
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].kind, EdgeKind::Chemical);
        assert_eq!(edges[0].weight, 5);
        assert_eq!(edges[1].pre_name, "ADAL");
        assert_eq!(edges[1].kind, EdgeKind::Electrical);
        assert_eq!(edges[1].source_tag.label, EDGELIST_SOURCE);
    }

    #[test]
    fn test_edgelist_unknown_type_is_skipped_and_counted() {
        let file = write_temp("Source,Target,Weight,Type\nAVAL,AVBL,5,neuromodulatory\n");
        let mut adapter = EdgelistCsv::new(file.path());
        assert!(adapter.read_records().unwrap().is_empty());
        assert_eq!(adapter.skipped(), 1);
    }

    #[test]
    fn test_bad_weight_reports_line() {
        let file = write_temp("Source,Target,Weight,Type\nAVAL,AVBL,5,chemical\nAVAL,AVBL,x,chemical\n");
        let err = EdgelistCsv::new(file.path()).read_records().unwrap_err();
        match err {
            IngestError::SourceFormat { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_short_row_is_malformed() {
        let file = write_temp("Source,Target,Weight,Type\nAVAL,AVBL\n");
        let err = EdgelistCsv::new(file.path()).read_records().unwrap_err();
        assert!(matches!(err, IngestError::SourceFormat { .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_sheet_accepts_codes_and_float_weights() {
        let file = write_temp(
            "Neuron 1,Neuron 2,Type,Nbr\nADAL,ADAR,EJ,1.0\nADAL,AIBL,Sp,2\nADAL,AVDR,R,3\nADAL,PVPL,??,1\n",
        );
        let mut adapter = ConnectomeSheet::new(file.path());
        let edges = edges(adapter.read_records().unwrap());
        assert_eq!(edges.len(), 3);
        assert_eq!(edges[0].kind, EdgeKind::Electrical);
        assert_eq!(edges[0].weight, 1);
        assert_eq!(edges[1].kind, EdgeKind::ChemicalPoly);
        assert_eq!(edges[2].kind, EdgeKind::Receives);
        assert_eq!(adapter.skipped(), 1);
    }

    #[test]
    fn test_sheet_rejects_fractional_weight() {
        let file = write_temp("Neuron 1,Neuron 2,Type,Nbr\nADAL,ADAR,EJ,1.5\n");
        assert!(ConnectomeSheet::new(file.path()).read_records().is_err());
    }

    #[test]
    fn test_annotations_carry_evidence_label_and_url() {
        let file = write_temp(
            "Entity,Relation,Value,Evidence,EvidenceURL\n\
             AVAL,Neurotransmitter,Glutamate,Altun 2009,http://wormatlas.org/a\n\
             AVAL,Colour,blue,Altun 2009,\n\
             ADAL,type,sensory,WormAtlas,\n",
        );
        let mut adapter = AnnotationsCsv::new(file.path());
        let records = adapter.read_records().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(adapter.skipped(), 1);

        let RawRecord::Attribute(first) = &records[0] else {
            panic!("expected attribute");
        };
        assert_eq!(first.attribute, AttributeKind::Neurotransmitter);
        assert_eq!(first.value, "Glutamate");
        assert_eq!(first.source_tag.label, "Altun 2009");
        assert_eq!(first.source_tag.uri.as_deref(), Some("http://wormatlas.org/a"));

        let RawRecord::Attribute(second) = &records[1] else {
            panic!("expected attribute");
        };
        assert_eq!(second.source_tag.uri, None);
    }
}
