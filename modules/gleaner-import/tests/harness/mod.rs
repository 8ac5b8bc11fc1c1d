//! Shared fixture for pipeline tests: a scripted store and a share folder
//! that together look like one scheduled harvesting task with real RDFa
//! pages behind it.

use std::path::Path;
use std::sync::Arc;

use gleaner_common::vocab::{OP_EXTRACTING, STATUS_SCHEDULED};
use gleaner_common::Config;
use gleaner_import::pipeline::ImportPipeline;
use gleaner_import::testing::MockStore;
use gleaner_store::{FileStore, SelectResults, SparqlStore};

pub const TASK: &str = "http://redpencil.data.gift/id/task/import-1";
pub const TASK_ID: &str = "import-1";
pub const GRAPH: &str = "http://mu.semte.ch/graphs/harvesting";
pub const JOB: &str = "http://redpencil.data.gift/id/job/job-1";
pub const INPUT_CONTAINER: &str = "http://redpencil.data.gift/id/dataContainers/input-1";

/// One harvested page: its logical file resource in the store, its
/// physical name under the share folder, and the URL it was downloaded
/// from.
#[derive(Clone)]
pub struct HarvestedPage {
    pub logical_uri: String,
    pub share_name: String,
    pub source_url: String,
}

impl HarvestedPage {
    pub fn new(slug: &str) -> Self {
        Self {
            logical_uri: format!("http://data.lblod.info/id/files/{slug}"),
            share_name: format!("{slug}.html"),
            source_url: format!("https://gemeente.example.org/zittingen/{slug}.html"),
        }
    }

    pub fn seed(&self, share: &Path, html: &str) {
        std::fs::write(share.join(&self.share_name), html).unwrap();
    }
}

/// The scalar row `load_task` expects for the fixture task.
pub fn task_row() -> SelectResults {
    SelectResults::rows_from([vec![
        ("graph", "uri", GRAPH),
        ("id", "literal", TASK_ID),
        ("job", "uri", JOB),
        ("created", "typed-literal", "2026-08-20T08:00:00Z"),
        ("modified", "typed-literal", "2026-08-20T08:00:00Z"),
        ("status", "uri", STATUS_SCHEDULED),
        ("index", "literal", "0"),
        ("operation", "uri", OP_EXTRACTING),
    ]])
}

/// A store that answers every read the pipeline issues for the fixture
/// task and the given pages. Updates are accepted and recorded.
pub fn scripted_store(pages: Vec<HarvestedPage>) -> MockStore {
    MockStore::new().on_select(move |q| {
        if q.contains("COUNT(DISTINCT ?page)") {
            let count = pages.len().to_string();
            return Ok(SelectResults::rows_from([vec![(
                "count",
                "typed-literal",
                count.as_str(),
            )]]));
        }
        if q.contains("ORDER BY ?page") {
            let offset: usize = q
                .split("OFFSET ")
                .nth(1)
                .and_then(|rest| rest.split_whitespace().next())
                .and_then(|n| n.parse().ok())
                .unwrap_or(0);
            let slice: Vec<&str> = pages
                .iter()
                .skip(offset)
                .map(|p| p.logical_uri.as_str())
                .collect();
            return Ok(SelectResults::uris("page", &slice));
        }
        // The metadata query also mentions nie:dataSource in its OPTIONAL
        // size clause; match it before the physical-path lookup.
        if q.contains("nie:url ?url") {
            if let Some(page) = pages.iter().find(|p| q.contains(&p.logical_uri)) {
                return Ok(SelectResults::uris("url", &[page.source_url.as_str()]));
            }
            return Ok(SelectResults::empty());
        }
        if q.contains("SELECT ?physicalFile") {
            if let Some(page) = pages.iter().find(|p| q.contains(&p.logical_uri)) {
                let share_uri = format!("share://{}", page.share_name);
                return Ok(SelectResults::uris("physicalFile", &[share_uri.as_str()]));
            }
            return Ok(SelectResults::empty());
        }
        if q.contains("VALUES ?operation") && q.contains(TASK) {
            return Ok(task_row());
        }
        if q.contains("task:inputContainer ?inputContainer") {
            return Ok(SelectResults::uris("inputContainer", &[INPUT_CONTAINER]));
        }
        // dependsOn / resultsContainer lists, unparsed-predicate lookups,
        // label lookups: all empty for the fixture.
        Ok(SelectResults::empty())
    })
}

pub fn test_config(share: &Path, write_debug_ttls: bool) -> Config {
    Config {
        sparql_endpoint: "http://localhost:8890/sparql".to_string(),
        high_load_sparql_endpoint: "http://localhost:8890/sparql".to_string(),
        share_folder: share.display().to_string(),
        write_debug_ttls,
        max_rss_mb: u64::MAX / (1024 * 1024),
    }
}

pub fn pipeline(store: Arc<MockStore>, share: &Path, write_debug_ttls: bool) -> ImportPipeline {
    let store: Arc<dyn SparqlStore> = store;
    let files = FileStore::new(store.clone(), share);
    ImportPipeline::new(
        store.clone(),
        store,
        files,
        test_config(share, write_debug_ttls),
    )
}

/// Contents of every artifact (`.ttl`) file under the share folder.
pub fn share_artifacts(share: &Path) -> Vec<String> {
    let mut artifacts = Vec::new();
    for entry in std::fs::read_dir(share).unwrap() {
        let path = entry.unwrap().path();
        if path.extension().is_some_and(|ext| ext == "ttl") {
            artifacts.push(std::fs::read_to_string(path).unwrap());
        }
    }
    artifacts
}
