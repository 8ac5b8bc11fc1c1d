//! Unparsed-predicate registry.
//!
//! Statements that fail validation and cannot be repaired are still worth
//! keeping: the original object value is preserved as an untyped string
//! under a synthetic predicate that declares `unparsedFormOf` the original
//! one. Lookup-before-mint makes resolution idempotent across runs and
//! restarts — the same original predicate always maps to the same
//! synthetic one.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use uuid::Uuid;

use gleaner_common::term::{Statement, Term};
use gleaner_common::vocab::{PREDICATE_LABEL, UNPARSED_FORM_OF, UNPARSED_PREDICATE_PREFIX};
use gleaner_store::escape::{escape_string, escape_uri};
use gleaner_store::SparqlStore;

pub struct UnparsedRegistry {
    store: Arc<dyn SparqlStore>,
}

impl UnparsedRegistry {
    pub fn new(store: Arc<dyn SparqlStore>) -> Self {
        Self { store }
    }

    /// The synthetic predicate for `original`, minting one if none exists.
    pub async fn resolve_predicate(&self, graph: &str, original: &str) -> Result<String> {
        let q = format!(
            "SELECT ?predicate WHERE {{ ?predicate {rel} {original} . }} LIMIT 1",
            rel = escape_uri(UNPARSED_FORM_OF),
            original = escape_uri(original),
        );
        if let Some(existing) = self.store.select(&q).await?.first("predicate") {
            return Ok(existing.to_string());
        }

        let minted = format!("{UNPARSED_PREDICATE_PREFIX}{}", Uuid::new_v4());
        let label = self.original_label(original).await?;
        let label_clause = match &label {
            Some(label) => format!(
                " ;\n    {} {}",
                escape_uri(PREDICATE_LABEL),
                escape_string(&format!("Unparsed of: {label}")),
            ),
            None => String::new(),
        };
        let insert = format!(
            "INSERT DATA {{
              GRAPH {graph} {{
                {minted} {rel} {original}{label_clause} .
              }}
            }}",
            graph = escape_uri(graph),
            minted = escape_uri(&minted),
            rel = escape_uri(UNPARSED_FORM_OF),
            original = escape_uri(original),
        );
        self.store.update(&insert).await?;
        info!(original, synthetic = minted.as_str(), "Minted unparsed-form predicate");
        Ok(minted)
    }

    /// Rewrite an irreparable statement so it is guaranteed loadable:
    /// original subject, synthetic predicate, object coerced to an untyped
    /// string literal.
    pub async fn rewrite(&self, graph: &str, statement: &Statement) -> Result<Statement> {
        let original = statement.predicate.lexical_value();
        let synthetic = self.resolve_predicate(graph, original).await?;
        Ok(Statement::new(
            statement.subject.clone(),
            Term::named(synthetic),
            Term::literal(statement.object.lexical_value()),
        ))
    }

    async fn original_label(&self, original: &str) -> Result<Option<String>> {
        let q = format!(
            "SELECT ?label WHERE {{ {original} {label} ?label . }} LIMIT 1",
            original = escape_uri(original),
            label = escape_uri(PREDICATE_LABEL),
        );
        Ok(self
            .store
            .select(&q)
            .await?
            .first("label")
            .map(str::to_string))
    }
}
