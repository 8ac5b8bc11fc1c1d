//! Adaptive batch loader.
//!
//! Inserts serialized statements in batches, and isolates statements the
//! endpoint rejects by halving the failing batch until the poison is down
//! to a singleton. Everything loadable is loaded before the rejection is
//! reported, so one bad statement never takes 99 good ones with it.

use std::sync::Arc;

use tracing::{debug, error};

use gleaner_store::escape::escape_uri;
use gleaner_store::SparqlStore;

pub const DEFAULT_BATCH_SIZE: usize = 100;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Statements the endpoint rejected even as singletons. Everything
    /// else in the load was inserted.
    #[error("Store rejected {} statement(s)", .0.len())]
    Rejected(Vec<String>),

    #[error(transparent)]
    Store(#[from] gleaner_store::StoreError),
}

pub struct BatchLoader {
    store: Arc<dyn SparqlStore>,
    batch_size: usize,
}

impl BatchLoader {
    pub fn new(store: Arc<dyn SparqlStore>) -> Self {
        Self {
            store,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(store: Arc<dyn SparqlStore>, batch_size: usize) -> Self {
        Self { store, batch_size }
    }

    /// Insert `statements` (one serialized line each) into `graph`.
    ///
    /// An explicit worklist instead of recursive halving: a failing batch
    /// of n > 1 is split into chunks of ceil(n/2) and pushed back; a
    /// failing singleton is logged and recorded. Retries per poisoned
    /// statement are bounded by log2 of the initial batch size.
    pub async fn load(&self, graph: &str, statements: &[String]) -> Result<usize, LoadError> {
        let mut rejected: Vec<String> = Vec::new();
        let mut inserted = 0usize;

        let mut worklist: Vec<Vec<String>> = statements
            .chunks(self.batch_size.max(1))
            .map(|c| c.to_vec())
            .collect();
        // Chunks were pushed in order; process them front-first.
        worklist.reverse();

        while let Some(batch) = worklist.pop() {
            match self.insert_batch(graph, &batch).await {
                Ok(()) => inserted += batch.len(),
                Err(e) if batch.len() > 1 => {
                    debug!(
                        size = batch.len(),
                        error = %e,
                        "Batch insert failed, splitting in half"
                    );
                    let half = batch.len().div_ceil(2);
                    for chunk in batch.chunks(half).rev() {
                        worklist.push(chunk.to_vec());
                    }
                }
                Err(e) => {
                    error!(statement = batch[0].as_str(), error = %e, "Statement rejected by store");
                    rejected.push(batch[0].clone());
                }
            }
        }

        if rejected.is_empty() {
            Ok(inserted)
        } else {
            Err(LoadError::Rejected(rejected))
        }
    }

    async fn insert_batch(&self, graph: &str, batch: &[String]) -> Result<(), LoadError> {
        let q = format!(
            "INSERT DATA {{\n  GRAPH {} {{\n    {}\n  }}\n}}",
            escape_uri(graph),
            batch.join("\n    "),
        );
        self.store.update(&q).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockStore;

    const GRAPH: &str = "http://example.org/graph";

    fn statements(n: usize) -> Vec<String> {
        (0..n)
            .map(|i| format!("<http://example.org/s{i}> <http://example.org/p> \"{i}\" ."))
            .collect()
    }

    #[tokio::test]
    async fn clean_load_uses_one_insert_per_batch() {
        let store = Arc::new(MockStore::new());
        let loader = BatchLoader::new(store.clone());
        let inserted = loader.load(GRAPH, &statements(250)).await.unwrap();
        assert_eq!(inserted, 250);
        assert_eq!(store.update_count(), 3); // 100 + 100 + 50
    }

    #[tokio::test]
    async fn empty_load_issues_no_inserts() {
        let store = Arc::new(MockStore::new());
        let loader = BatchLoader::new(store.clone());
        assert_eq!(loader.load(GRAPH, &[]).await.unwrap(), 0);
        assert_eq!(store.update_count(), 0);
    }

    #[tokio::test]
    async fn one_poisoned_statement_is_isolated_from_the_other_99() {
        let mut stmts = statements(100);
        stmts[42] = "<http://example.org/s42> <http://example.org/p> \"POISON .".to_string();

        let store = Arc::new(MockStore::rejecting_updates_containing("POISON"));
        let loader = BatchLoader::new(store.clone());

        let err = loader.load(GRAPH, &stmts).await.unwrap_err();
        match err {
            LoadError::Rejected(rejected) => {
                assert_eq!(rejected.len(), 1);
                assert!(rejected[0].contains("s42"));
            }
            other => panic!("unexpected error: {other}"),
        }

        // The 99 good statements all landed in accepted inserts.
        let good: usize = store
            .recorded_updates()
            .iter()
            .filter(|q| !q.contains("POISON"))
            .map(|q| q.matches(" .\n").count())
            .sum();
        assert_eq!(good, 99);

        // Halving bounds the attempts: one failing path of log2(100)
        // splits plus the sibling batches, 15 inserts at most.
        assert!(store.update_count() <= 15, "took {}", store.update_count());
    }

    #[tokio::test]
    async fn every_statement_poisoned_rejects_them_all() {
        let stmts: Vec<String> = (0..4)
            .map(|i| format!("<http://example.org/s{i}> <http://example.org/p> \"POISON\" ."))
            .collect();
        let store = Arc::new(MockStore::rejecting_updates_containing("POISON"));
        let loader = BatchLoader::with_batch_size(store, 4);
        match loader.load(GRAPH, &stmts).await.unwrap_err() {
            LoadError::Rejected(rejected) => assert_eq!(rejected.len(), 4),
            other => panic!("unexpected error: {other}"),
        }
    }
}
