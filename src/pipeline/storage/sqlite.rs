use super::traits::FactStore;
use crate::domain::{Term, Triple};
use crate::error::{IngestError, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

/// SQLite-backed fact store. One table of triples, no uniqueness constraint.
pub struct SqliteFactStore {
    conn: Mutex<Connection>,
}

fn encode(term: &Term) -> (&'static str, String) {
    match term {
        Term::Iri(iri) => ("iri", iri.clone()),
        Term::Literal(value) => ("literal", value.clone()),
        Term::Integer(value) => ("integer", value.to_string()),
    }
}

fn decode(kind: &str, value: String) -> Result<Term> {
    match kind {
        "iri" => Ok(Term::Iri(value)),
        "literal" => Ok(Term::Literal(value)),
        "integer" => value
            .parse()
            .map(Term::Integer)
            .map_err(|_| IngestError::store(format!("stored integer '{}' is corrupt", value))),
        other => Err(IngestError::store(format!("unknown term kind '{}'", other))),
    }
}

impl SqliteFactStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)
            .map_err(|e| IngestError::store(format!("cannot open {}: {}", path.display(), e)))?;
        info!("Opened fact store at {}", path.display());
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            CREATE TABLE IF NOT EXISTS triples (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                subject_kind TEXT NOT NULL,
                subject      TEXT NOT NULL,
                predicate    TEXT NOT NULL,
                object_kind  TEXT NOT NULL,
                object       TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS triples_subject ON triples (subject);
            "#,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| IngestError::store("sqlite store lock poisoned"))
    }
}

#[async_trait]
impl FactStore for SqliteFactStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn insert(&self, triples: &[Triple]) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO triples (subject_kind, subject, predicate, object_kind, object)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for triple in triples {
                let Some(predicate) = triple.predicate.as_iri() else {
                    return Err(IngestError::store(format!(
                        "predicate must be an IRI: {}",
                        triple
                    )));
                };
                let (s_kind, subject) = encode(&triple.subject);
                let (o_kind, object) = encode(&triple.object);
                stmt.execute(params![s_kind, subject, predicate, o_kind, object])?;
            }
        }
        tx.commit()?;
        debug!("Committed {} triples to sqlite", triples.len());
        Ok(triples.len())
    }

    async fn triples(&self) -> Result<Vec<Triple>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT subject_kind, subject, predicate, object_kind, object FROM triples ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (s_kind, subject, predicate, o_kind, object) = row?;
            out.push(Triple::new(
                decode(&s_kind, subject)?,
                Term::Iri(predicate),
                decode(&o_kind, object)?,
            ));
        }
        Ok(out)
    }

    async fn len(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM triples", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    async fn close(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Triple> {
        vec![
            Triple::new(
                Term::iri("http://openworm.org/entities/Neuron/AVAL"),
                Term::iri("http://openworm.org/entities/name"),
                Term::literal("AVAL"),
            ),
            Triple::new(
                Term::iri("http://openworm.org/entities/Connection/AVAL/AVBL/send"),
                Term::iri("http://openworm.org/entities/number"),
                Term::Integer(8),
            ),
        ]
    }

    #[tokio::test]
    async fn test_round_trips_every_term_kind() {
        let store = SqliteFactStore::open_in_memory().unwrap();
        store.insert(&sample()).await.unwrap();
        assert_eq!(store.triples().await.unwrap(), sample());
    }

    #[tokio::test]
    async fn test_persists_across_reopen_and_duplicates_on_reinsert() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("facts.db");
        {
            let store = SqliteFactStore::open(&path).unwrap();
            store.insert(&sample()).await.unwrap();
            store.close().await.unwrap();
        }
        let store = SqliteFactStore::open(&path).unwrap();
        assert_eq!(store.len().await.unwrap(), 2);
        store.insert(&sample()).await.unwrap();
        assert_eq!(store.len().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_rejects_literal_predicate() {
        let store = SqliteFactStore::open_in_memory().unwrap();
        let bad = Triple::new(Term::iri("urn:a"), Term::literal("p"), Term::literal("o"));
        let err = store.insert(&[bad]).await.unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(store.len().await.unwrap(), 0);
    }
}
