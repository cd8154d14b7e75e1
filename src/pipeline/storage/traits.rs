use async_trait::async_trait;

use crate::domain::Triple;
use crate::error::Result;

/// Persistent graph store holding asserted statements.
///
/// The store is a multiset: inserting a triple that is already present adds a
/// second copy. Repeat runs therefore duplicate earlier facts.
#[async_trait]
pub trait FactStore: Send + Sync {
    /// Short backend name for logs
    fn backend(&self) -> &'static str;

    /// Append triples, returning how many were written
    async fn insert(&self, triples: &[Triple]) -> Result<usize>;

    /// Every stored triple, in insertion order
    async fn triples(&self) -> Result<Vec<Triple>>;

    async fn len(&self) -> Result<usize>;

    /// Flush pending writes. The handle itself is released on drop.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
