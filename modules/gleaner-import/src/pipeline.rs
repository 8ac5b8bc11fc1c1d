//! Pipeline orchestrator: drives one task from busy to success or failed.

use std::io::Write as _;
use std::sync::Arc;

use anyhow::{Context, Result};
use tempfile::NamedTempFile;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use gleaner_common::vocab::{
    DATA_CONTAINER_URI_PREFIX, IMPORT_GRAPH_URI_PREFIX, PREFIXES, STATUS_BUSY, STATUS_FAILED,
    STATUS_SUCCESS,
};
use gleaner_common::Config;
use gleaner_store::escape::{escape_string, escape_uri};
use gleaner_store::{FileStore, SparqlStore};

use crate::extract::{PageExtractor, StatementAccumulator};
use crate::loader::BatchLoader;
use crate::memory::MemoryValve;
use crate::pages::PageFetcher;
use crate::task::{Task, TaskStore};
use crate::unparsed::UnparsedRegistry;
use crate::validate::{fix_statement, validate_statement};

pub struct ImportPipeline {
    /// Task lifecycle mutations.
    store: Arc<dyn SparqlStore>,
    /// Heavy reads and bulk statement loads.
    high_load: Arc<dyn SparqlStore>,
    files: FileStore,
    config: Config,
}

impl ImportPipeline {
    pub fn new(
        store: Arc<dyn SparqlStore>,
        high_load: Arc<dyn SparqlStore>,
        files: FileStore,
        config: Config,
    ) -> Self {
        Self {
            store,
            high_load,
            files,
            config,
        }
    }

    /// Run one task to completion.
    ///
    /// A reference that is not a known extraction-class task is a no-op.
    /// Any failure after the task went busy is caught exactly once here:
    /// an error record is appended and the task marked failed. No retry.
    pub async fn run(&self, task_uri: &str) -> Result<()> {
        let tasks = TaskStore::new(self.store.clone());
        let Some(task) = tasks.load_task(task_uri).await? else {
            debug!(task = task_uri, "Not an extraction task, ignoring");
            return Ok(());
        };

        info!(task = task_uri, operation = task.operation.as_str(), "Starting import");
        let outcome = async {
            tasks.set_status(&task, STATUS_BUSY).await?;
            self.import(&task).await
        }
        .await;

        match outcome {
            Ok(()) => {
                tasks.set_status(&task, STATUS_SUCCESS).await?;
                info!(task = task_uri, "Import finished");
            }
            Err(e) => {
                error!(task = task_uri, error = %e, "Import failed");
                if let Err(append_err) = tasks.append_error(&task, &format!("{e:#}")).await {
                    warn!(task = task_uri, error = %append_err, "Could not append error record");
                }
                tasks
                    .set_status(&task, STATUS_FAILED)
                    .await
                    .context("Could not mark task as failed; is the store down?")?;
            }
        }
        Ok(())
    }

    async fn import(&self, task: &Task) -> Result<()> {
        let pages = PageFetcher::new(self.high_load.clone())
            .resolve_pages(task)
            .await?;
        let valve = MemoryValve::new(self.config.max_rss_mb);
        let registry = UnparsedRegistry::new(self.high_load.clone());
        let loader = BatchLoader::new(self.high_load.clone());
        let extractor = PageExtractor::new(&self.files);

        let import_graph = format!("{IMPORT_GRAPH_URI_PREFIX}{}", task.id);
        let mut spool = ArtifactSpool::new()?;

        for page in &pages {
            valve.pause_if_bloated().await;

            // Per-file boundary: one broken page must not sink the task.
            let extracted = self.extract_one(task, &extractor, page).await;
            let accumulator = match extracted {
                Ok(acc) => acc,
                Err(e) => {
                    warn!(page = page.as_str(), error = %e, "Skipping page, extraction failed");
                    continue;
                }
            };

            let partition = partition_statements(&registry, &task.graph, &accumulator).await?;
            spool.append(&partition)?;

            // The import graph grows page by page; nothing is buffered
            // across pages.
            loader.load(&import_graph, &partition.valid).await?;
            loader.load(&import_graph, &partition.rewritten).await?;
        }

        self.register_results(task, &import_graph, &spool).await?;
        Ok(())
    }

    async fn extract_one(
        &self,
        task: &Task,
        extractor: &PageExtractor<'_>,
        page: &str,
    ) -> Result<StatementAccumulator> {
        let path = self.files.physical_path(page).await?;
        let metadata = self.files.metadata(page).await?;
        let html = self.files.read_content(&path).await?;
        let mut accumulator = StatementAccumulator::new();
        extractor
            .extract_page(&task.graph, html, &metadata, &mut accumulator)
            .await?;
        Ok(accumulator)
    }

    /// Persist the artifact spools as logical files and register them,
    /// together with the import graph, in fresh result containers.
    async fn register_results(
        &self,
        task: &Task,
        import_graph: &str,
        spool: &ArtifactSpool,
    ) -> Result<()> {
        let file_container = DataContainer::mint();
        let graph_container = DataContainer::mint();

        let valid_file = self
            .files
            .write_path(
                &task.graph,
                spool.valid.path(),
                &format!("{}-valid.ttl", task.id),
            )
            .await?;
        self.append_result_file(task, &file_container, &valid_file)
            .await?;

        if self.config.write_debug_ttls {
            for (artifact, suffix) in [
                (&spool.original, "original"),
                (&spool.invalid, "invalid"),
                (&spool.corrected, "corrected"),
            ] {
                let file = self
                    .files
                    .write_path(
                        &task.graph,
                        artifact.path(),
                        &format!("{}-{suffix}.ttl", task.id),
                    )
                    .await?;
                self.append_result_file(task, &file_container, &file).await?;
            }
        }

        self.append_result_graph(task, &graph_container, import_graph)
            .await?;
        Ok(())
    }

    async fn append_result_file(
        &self,
        task: &Task,
        container: &DataContainer,
        file_uri: &str,
    ) -> Result<()> {
        let q = format!(
            "{PREFIXES}INSERT DATA {{
              GRAPH {graph} {{
                {container} a nfo:DataContainer .
                {container} mu:uuid {id} .
                {container} task:hasFile {file} .
                {task} task:resultsContainer {container} .
              }}
            }}",
            graph = escape_uri(&task.graph),
            container = escape_uri(&container.uri),
            id = escape_string(&container.id),
            file = escape_uri(file_uri),
            task = escape_uri(&task.uri),
        );
        self.high_load.update(&q).await?;
        Ok(())
    }

    async fn append_result_graph(
        &self,
        task: &Task,
        container: &DataContainer,
        graph_uri: &str,
    ) -> Result<()> {
        let q = format!(
            "{PREFIXES}INSERT DATA {{
              GRAPH {graph} {{
                {container} a nfo:DataContainer .
                {container} mu:uuid {id} .
                {container} task:hasGraph {target} .
                {task} task:resultsContainer {container} .
              }}
            }}",
            graph = escape_uri(&task.graph),
            container = escape_uri(&container.uri),
            id = escape_string(&container.id),
            target = escape_uri(graph_uri),
            task = escape_uri(&task.uri),
        );
        self.high_load.update(&q).await?;
        Ok(())
    }
}

/// A fresh result container. New identity every orchestration run; a
/// rerun of the same task never touches the containers of an earlier run.
struct DataContainer {
    uri: String,
    id: String,
}

impl DataContainer {
    fn mint() -> Self {
        let id = Uuid::new_v4().to_string();
        Self {
            uri: format!("{DATA_CONTAINER_URI_PREFIX}{id}"),
            id,
        }
    }
}

/// One page's statements routed to their destinations.
struct Partition {
    /// Everything the page produced, as extracted.
    original: Vec<String>,
    /// Statements that validated, plus repaired ones.
    valid: Vec<String>,
    /// Statements that failed validation, in their raw form.
    invalid: Vec<String>,
    /// The repaired renderings of the fixable ones.
    corrected: Vec<String>,
    /// Irreparable statements rewritten through the unparsed registry.
    rewritten: Vec<String>,
}

async fn partition_statements(
    registry: &UnparsedRegistry,
    graph: &str,
    accumulator: &StatementAccumulator,
) -> Result<Partition> {
    let mut partition = Partition {
        original: accumulator.lines(),
        valid: Vec::new(),
        invalid: Vec::new(),
        corrected: Vec::new(),
        rewritten: Vec::new(),
    };
    for statement in accumulator.statements() {
        if validate_statement(statement) {
            partition.valid.push(statement.to_string());
        } else if let Some(fixed) = fix_statement(statement) {
            partition.invalid.push(statement.to_string());
            partition.corrected.push(fixed.to_string());
            partition.valid.push(fixed.to_string());
        } else {
            partition.invalid.push(statement.to_string());
            let rewritten = registry.rewrite(graph, statement).await?;
            partition.rewritten.push(rewritten.to_string());
        }
    }
    Ok(partition)
}

/// Disk spools for the four task-level artifacts, appended page by page
/// so a large task never holds its full output in memory.
struct ArtifactSpool {
    original: NamedTempFile,
    valid: NamedTempFile,
    invalid: NamedTempFile,
    corrected: NamedTempFile,
}

impl ArtifactSpool {
    fn new() -> Result<Self> {
        Ok(Self {
            original: NamedTempFile::new()?,
            valid: NamedTempFile::new()?,
            invalid: NamedTempFile::new()?,
            corrected: NamedTempFile::new()?,
        })
    }

    fn append(&mut self, partition: &Partition) -> Result<()> {
        append_lines(&mut self.original, &partition.original)?;
        append_lines(&mut self.valid, &partition.valid)?;
        append_lines(&mut self.invalid, &partition.invalid)?;
        append_lines(&mut self.corrected, &partition.corrected)?;
        Ok(())
    }
}

fn append_lines(file: &mut NamedTempFile, lines: &[String]) -> Result<()> {
    for line in lines {
        writeln!(file, "{line}")?;
    }
    file.flush()?;
    Ok(())
}
