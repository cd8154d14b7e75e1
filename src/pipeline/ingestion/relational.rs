use rusqlite::{params, Connection, OpenFlags};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::constants::{
    CELEGANS_DB_SOURCE, ENTITY_MUSCLE, ENTITY_NEURON, REL_INNERVATED_BY, REL_IS_A,
};
use crate::error::{IngestError, Result};
use crate::types::{AttributeKind, RawAttribute, RawRecord, SourceAdapter, SourceTag};

/// Which relation set to pull out of the entity/relationship dump
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationalQuery {
    /// Every entity declared to be a neuron
    Neurons,
    /// (neuron, muscle) pairs where the muscle is innervated by the neuron
    MuscleInnervation,
}

const NEURONS_SQL: &str = "
    SELECT DISTINCT a.Entity
    FROM tblrelationship r, tblentity a
    WHERE r.EnID1 = a.id AND r.Relation = ?1 AND r.EnID2 = ?2
    ORDER BY a.Entity";

const INNERVATION_SQL: &str = "
    SELECT DISTINCT a.Entity, b.Entity
    FROM tblrelationship innervated_by, tblentity b, tblentity a, tblrelationship type_b
    WHERE innervated_by.EnID1 = a.id AND innervated_by.Relation = ?1
      AND innervated_by.EnID2 = b.id
      AND type_b.EnID1 = b.id AND type_b.Relation = ?2 AND type_b.EnID2 = ?3
    ORDER BY a.Entity, b.Entity";

/// Reader for the C. elegans entity/relationship SQLite dump
pub struct CelegansDb {
    path: PathBuf,
    query: RelationalQuery,
    tag: SourceTag,
}

impl CelegansDb {
    pub fn new<P: AsRef<Path>>(path: P, query: RelationalQuery) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            query,
            tag: SourceTag::new(CELEGANS_DB_SOURCE),
        }
    }

    fn source_error(&self, e: rusqlite::Error) -> IngestError {
        IngestError::source_format(&self.path.display().to_string(), 0, e.to_string())
    }

    fn open(&self) -> Result<Connection> {
        if !self.path.exists() {
            return Err(IngestError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("relational dump not found: {}", self.path.display()),
            )));
        }
        Connection::open_with_flags(&self.path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|e| self.source_error(e))
    }

    fn attribute(&self, entity: String, attribute: AttributeKind, value: String) -> RawRecord {
        RawRecord::Attribute(RawAttribute {
            entity_name: entity,
            attribute,
            value,
            source_tag: self.tag.clone(),
        })
    }

    fn read(&self, conn: &Connection) -> rusqlite::Result<Vec<RawRecord>> {
        match self.query {
            RelationalQuery::Neurons => {
                let mut stmt = conn.prepare(NEURONS_SQL)?;
                let rows = stmt.query_map(params![REL_IS_A, ENTITY_NEURON], |row| {
                    row.get::<_, String>(0)
                })?;
                let records = rows
                    .map(|name| {
                        name.map(|n| self.attribute(n, AttributeKind::Neuron, String::new()))
                    })
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(records)
            }
            RelationalQuery::MuscleInnervation => {
                let mut stmt = conn.prepare(INNERVATION_SQL)?;
                let rows = stmt.query_map(
                    params![REL_INNERVATED_BY, REL_IS_A, ENTITY_MUSCLE],
                    |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
                )?;
                let records = rows
                    .map(|pair| {
                        pair.map(|(neuron, muscle)| {
                            self.attribute(muscle, AttributeKind::InnervatedBy, neuron)
                        })
                    })
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(records)
            }
        }
    }
}

impl SourceAdapter for CelegansDb {
    fn source_name(&self) -> &str {
        CELEGANS_DB_SOURCE
    }

    fn read_records(&mut self) -> Result<Vec<RawRecord>> {
        let conn = self.open()?;
        let records = self.read(&conn).map_err(|e| self.source_error(e))?;
        debug!(
            "Read {} {:?} rows from {}",
            records.len(),
            self.query,
            self.path.display()
        );
        Ok(records)
    }
}
