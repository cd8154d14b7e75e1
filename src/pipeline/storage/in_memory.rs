use super::traits::FactStore;
use crate::domain::Triple;
use crate::error::{IngestError, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// In-memory fact store for development/testing
#[derive(Clone)]
pub struct InMemoryFactStore {
    triples: Arc<Mutex<Vec<Triple>>>,
}

impl Default for InMemoryFactStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryFactStore {
    pub fn new() -> Self {
        Self {
            triples: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<Triple>>> {
        self.triples
            .lock()
            .map_err(|_| IngestError::store("in-memory store lock poisoned"))
    }
}

#[async_trait]
impl FactStore for InMemoryFactStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn insert(&self, triples: &[Triple]) -> Result<usize> {
        let mut stored = self.lock()?;
        stored.extend_from_slice(triples);
        debug!("Inserted {} triples ({} total)", triples.len(), stored.len());
        Ok(triples.len())
    }

    async fn triples(&self) -> Result<Vec<Triple>> {
        Ok(self.lock()?.clone())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Term;

    fn triple(s: &str, o: &str) -> Triple {
        Triple::new(Term::iri(s), Term::iri("urn:p"), Term::literal(o))
    }

    #[tokio::test]
    async fn test_insert_and_read_back_in_order() {
        let store = InMemoryFactStore::new();
        store.insert(&[triple("urn:a", "1"), triple("urn:b", "2")]).await.unwrap();
        let all = store.triples().await.unwrap();
        assert_eq!(all, vec![triple("urn:a", "1"), triple("urn:b", "2")]);
    }

    #[tokio::test]
    async fn test_duplicates_are_kept() {
        let store = InMemoryFactStore::new();
        store.insert(&[triple("urn:a", "1")]).await.unwrap();
        store.insert(&[triple("urn:a", "1")]).await.unwrap();
        assert_eq!(store.len().await.unwrap(), 2);
    }
}
