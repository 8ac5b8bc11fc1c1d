//! Per-file extraction pipeline.
//!
//! Producer/consumer over a bounded channel: the producer parses the DOM
//! on a blocking thread and streams raw statements out; the consumer
//! annotates provenance, externalizes oversized HTML content literals,
//! and accumulates the result. The bounded capacity is the backpressure:
//! a slow consumer (file-store writes) blocks the parser instead of
//! letting statements pile up in memory.

pub mod rdfa;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use gleaner_common::term::{Statement, Term};
use gleaner_common::vocab::{
    CONTENT_VALUE_PREDICATE, EXTERNALIZED_SUFFIX, PROV_WAS_DERIVED_FROM, RDF_HTML,
};
use gleaner_store::{FileMetadata, FileStore};

const CHANNEL_CAPACITY: usize = 256;

/// Statements gathered for one page, in production order, no dedup.
#[derive(Debug, Default)]
pub struct StatementAccumulator {
    statements: Vec<Statement>,
}

impl StatementAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, statement: Statement) {
        self.statements.push(statement);
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// One trimmed line per statement; empty lines dropped.
    pub fn lines(&self) -> Vec<String> {
        self.statements
            .iter()
            .map(|s| s.to_string().trim().to_string())
            .filter(|line| !line.is_empty())
            .collect()
    }
}

pub struct PageExtractor<'a> {
    files: &'a FileStore,
}

impl<'a> PageExtractor<'a> {
    pub fn new(files: &'a FileStore) -> Self {
        Self { files }
    }

    /// Extract one page's RDFa into `accumulator`.
    ///
    /// Emits a `prov:wasDerivedFrom <source-url>` statement for every
    /// subject on its first appearance in this file. HTML-typed content
    /// literals are written out as file artifacts and replaced by a
    /// reference, with the predicate tagged to mark the substitution.
    pub async fn extract_page(
        &self,
        graph: &str,
        html: String,
        metadata: &FileMetadata,
        accumulator: &mut StatementAccumulator,
    ) -> Result<()> {
        let (tx, mut rx) = mpsc::channel::<Statement>(CHANNEL_CAPACITY);
        let source_url = metadata.url.clone();

        let producer = tokio::task::spawn_blocking(move || {
            rdfa::extract_into(&html, &source_url, &mut |statement| {
                // A closed channel means the consumer bailed; parsing on
                // would be wasted work but not an error here.
                let _ = tx.blocking_send(statement);
            })
        });

        let source = Term::named(metadata.url.clone());
        let mut seen_subjects = std::collections::HashSet::new();
        let mut produced = 0usize;
        while let Some(statement) = rx.recv().await {
            if seen_subjects.insert(statement.subject.clone()) {
                accumulator.add(Statement::new(
                    statement.subject.clone(),
                    Term::named(PROV_WAS_DERIVED_FROM),
                    source.clone(),
                ));
            }
            let statement = self.externalize_content(graph, statement).await?;
            accumulator.add(statement);
            produced += 1;
        }

        producer
            .await
            .context("Extraction producer panicked")?
            .with_context(|| format!("Failed to extract RDFa from {}", metadata.url))?;
        debug!(url = metadata.url.as_str(), statements = produced, "Extracted page");
        Ok(())
    }

    /// Replace an HTML-typed content literal by a file reference.
    async fn externalize_content(&self, graph: &str, statement: Statement) -> Result<Statement> {
        let is_content_value = matches!(
            &statement.predicate,
            Term::Named { iri } if iri == CONTENT_VALUE_PREDICATE
        );
        if !is_content_value {
            return Ok(statement);
        }
        let Term::Literal {
            value,
            datatype: Some(datatype),
            ..
        } = &statement.object
        else {
            return Ok(statement);
        };
        if datatype != RDF_HTML {
            return Ok(statement);
        }

        let filename = format!("content-{}.html", Uuid::new_v4());
        let file_uri = self.files.write_content(graph, value, &filename).await?;
        Ok(Statement::new(
            statement.subject,
            Term::named(format!("{CONTENT_VALUE_PREDICATE}{EXTERNALIZED_SUFFIX}")),
            Term::named(file_uri),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockStore;
    use std::sync::Arc;

    fn metadata(url: &str) -> FileMetadata {
        FileMetadata {
            url: url.to_string(),
            size: None,
        }
    }

    #[tokio::test]
    async fn provenance_is_emitted_once_per_subject() {
        let dir = tempfile::tempdir().unwrap();
        let files = FileStore::new(Arc::new(MockStore::new()), dir.path());
        let extractor = PageExtractor::new(&files);

        let html = r#"
            <div about="https://example.org/s" property="dct:title">One</div>
            <div about="https://example.org/s" property="dct:description">Two</div>
            <div about="https://example.org/other" property="dct:title">Three</div>
        "#;
        let mut acc = StatementAccumulator::new();
        extractor
            .extract_page(
                "http://example.org/graph",
                html.to_string(),
                &metadata("https://example.org/page"),
                &mut acc,
            )
            .await
            .unwrap();

        let provenance: Vec<_> = acc
            .statements()
            .iter()
            .filter(|s| s.predicate == Term::named(PROV_WAS_DERIVED_FROM))
            .collect();
        assert_eq!(provenance.len(), 2);
        for statement in provenance {
            assert_eq!(
                statement.object,
                Term::named("https://example.org/page")
            );
        }
        // 3 parsed statements + 2 provenance.
        assert_eq!(acc.len(), 5);
    }

    #[tokio::test]
    async fn html_content_literal_is_externalized() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MockStore::new());
        let files = FileStore::new(store.clone(), dir.path());
        let extractor = PageExtractor::new(&files);

        let html = r#"<div about="https://example.org/decision" property="prov:value"
                           datatype="rdf:HTML"><p>Volledige tekst</p></div>"#;
        let mut acc = StatementAccumulator::new();
        extractor
            .extract_page(
                "http://example.org/graph",
                html.to_string(),
                &metadata("https://example.org/page"),
                &mut acc,
            )
            .await
            .unwrap();

        let rewritten = acc
            .statements()
            .iter()
            .find(|s| {
                s.predicate
                    == Term::named(format!("{CONTENT_VALUE_PREDICATE}{EXTERNALIZED_SUFFIX}"))
            })
            .expect("content statement should be rewritten");
        assert!(matches!(
            &rewritten.object,
            Term::Named { iri } if iri.starts_with("http://data.lblod.info/id/files/")
        ));
        // No inline HTML literal survives.
        assert!(acc.lines().iter().all(|l| !l.contains("Volledige tekst")));

        // The literal's text landed in the share folder.
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
        let written = std::fs::read_to_string(entries[0].as_ref().unwrap().path()).unwrap();
        assert_eq!(written, "<p>Volledige tekst</p>");
    }

    #[tokio::test]
    async fn lines_are_trimmed_and_terminated() {
        let dir = tempfile::tempdir().unwrap();
        let files = FileStore::new(Arc::new(MockStore::new()), dir.path());
        let extractor = PageExtractor::new(&files);

        let html = r#"<div about="https://example.org/s" property="dct:title">Hello</div>"#;
        let mut acc = StatementAccumulator::new();
        extractor
            .extract_page(
                "http://example.org/graph",
                html.to_string(),
                &metadata("https://example.org/page"),
                &mut acc,
            )
            .await
            .unwrap();

        assert!(!acc.is_empty());
        for line in acc.lines() {
            assert_eq!(line, line.trim());
            assert!(line.ends_with(" ."));
        }
    }

    #[tokio::test]
    async fn unparseable_base_url_fails_the_page() {
        let dir = tempfile::tempdir().unwrap();
        let files = FileStore::new(Arc::new(MockStore::new()), dir.path());
        let extractor = PageExtractor::new(&files);

        let mut acc = StatementAccumulator::new();
        let result = extractor
            .extract_page(
                "http://example.org/graph",
                "<div></div>".to_string(),
                &metadata("no scheme at all"),
                &mut acc,
            )
            .await;
        assert!(result.is_err());
    }
}
