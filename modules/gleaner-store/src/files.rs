//! Logical file store.
//!
//! Files live under a shared folder and are addressed through `share://`
//! URIs in the triplestore. A logical file resource links to its physical
//! counterpart via `nie:dataSource`; the physical URI's `share://` prefix
//! maps onto the configured share folder on disk.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use flate2::read::GzDecoder;
use tracing::debug;
use uuid::Uuid;

use gleaner_common::vocab::PREFIXES;

use crate::client::SparqlStore;
use crate::escape::{escape_datetime, escape_string, escape_uri};

const LOGICAL_FILE_URI_PREFIX: &str = "http://data.lblod.info/id/files/";

/// Metadata of a stored resource, as recorded at download time.
#[derive(Debug, Clone)]
pub struct FileMetadata {
    /// Canonical source URL the resource was downloaded from. Used as the
    /// RDFa parse base and as the provenance value.
    pub url: String,
    pub size: Option<u64>,
}

pub struct FileStore {
    store: Arc<dyn SparqlStore>,
    share_folder: PathBuf,
}

impl FileStore {
    pub fn new(store: Arc<dyn SparqlStore>, share_folder: impl Into<PathBuf>) -> Self {
        Self {
            store,
            share_folder: share_folder.into(),
        }
    }

    /// Resolve a logical file reference to its physical path on disk.
    pub async fn physical_path(&self, file_uri: &str) -> Result<PathBuf> {
        let q = format!(
            "{PREFIXES}SELECT ?physicalFile WHERE {{ ?physicalFile nie:dataSource {} . }} LIMIT 1",
            escape_uri(file_uri)
        );
        let results = self.store.select(&q).await?;
        match results.first("physicalFile") {
            Some(physical) => Ok(self.share_uri_to_path(physical)?),
            None => bail!("No physical file found for <{file_uri}>"),
        }
    }

    /// Source metadata recorded for a logical file.
    pub async fn metadata(&self, file_uri: &str) -> Result<FileMetadata> {
        let q = format!(
            "{PREFIXES}SELECT ?url ?size WHERE {{
               {uri} nie:url ?url .
               OPTIONAL {{ ?physicalFile nie:dataSource {uri} ; nfo:fileSize ?size . }}
             }} LIMIT 1",
            uri = escape_uri(file_uri)
        );
        let results = self.store.select(&q).await?;
        let url = results
            .first("url")
            .with_context(|| format!("No source url recorded for <{file_uri}>"))?
            .to_string();
        let size = results.first("size").and_then(|s| s.parse().ok());
        Ok(FileMetadata { url, size })
    }

    /// Read a file's content as text, transparently gunzipping `.gz` files.
    pub async fn read_content(&self, path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if path.extension().is_some_and(|ext| ext == "gz") {
            let mut decoder = GzDecoder::new(bytes.as_slice());
            let mut out = String::new();
            decoder
                .read_to_string(&mut out)
                .with_context(|| format!("Failed to gunzip {}", path.display()))?;
            Ok(out)
        } else {
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
    }

    /// Persist `content` as a new logical file named `filename`, registered
    /// in `graph`. Returns the logical file URI.
    pub async fn write_content(
        &self,
        graph: &str,
        content: &str,
        filename: &str,
    ) -> Result<String> {
        let physical = self.new_physical_path(filename);
        tokio::fs::write(&physical.1, content)
            .await
            .with_context(|| format!("Failed to write {}", physical.1.display()))?;
        self.register_file(graph, filename, &physical.0, content.len() as u64)
            .await
    }

    /// Persist an existing file (e.g. a spooled artifact) as a new logical
    /// file named `filename`. Returns the logical file URI.
    pub async fn write_path(&self, graph: &str, source: &Path, filename: &str) -> Result<String> {
        let physical = self.new_physical_path(filename);
        tokio::fs::copy(source, &physical.1)
            .await
            .with_context(|| format!("Failed to copy {} into the share folder", source.display()))?;
        let size = tokio::fs::metadata(&physical.1).await?.len();
        self.register_file(graph, filename, &physical.0, size).await
    }

    /// (share:// URI, on-disk path) for a fresh physical file.
    fn new_physical_path(&self, filename: &str) -> (String, PathBuf) {
        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("ttl");
        let basename = format!("{}.{extension}", Uuid::new_v4());
        (
            format!("share://{basename}"),
            self.share_folder.join(basename),
        )
    }

    fn share_uri_to_path(&self, share_uri: &str) -> Result<PathBuf> {
        let Some(rest) = share_uri.strip_prefix("share://") else {
            bail!("Not a share:// URI: {share_uri}");
        };
        Ok(self.share_folder.join(rest))
    }

    async fn register_file(
        &self,
        graph: &str,
        filename: &str,
        physical_uri: &str,
        size: u64,
    ) -> Result<String> {
        let logical_uri = format!("{LOGICAL_FILE_URI_PREFIX}{}", Uuid::new_v4());
        let now = escape_datetime(&Utc::now());
        let q = format!(
            "{PREFIXES}INSERT DATA {{
              GRAPH {graph} {{
                {logical} a nfo:FileDataObject ;
                  nfo:fileName {name} ;
                  dct:format \"text/turtle\" ;
                  nfo:fileSize {size} ;
                  dct:created {now} ;
                  dct:modified {now} .
                {physical} a nfo:FileDataObject ;
                  nie:dataSource {logical} ;
                  nfo:fileName {name} ;
                  dct:format \"text/turtle\" ;
                  nfo:fileSize {size} ;
                  dct:created {now} ;
                  dct:modified {now} .
              }}
            }}",
            graph = escape_uri(graph),
            logical = escape_uri(&logical_uri),
            physical = escape_uri(physical_uri),
            name = escape_string(filename),
        );
        self.store.update(&q).await?;
        debug!(file = filename, uri = %logical_uri, "Registered logical file");
        Ok(logical_uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::SelectResults;
    use crate::client::{Result as StoreResult, StoreError};
    use async_trait::async_trait;
    use std::io::Write;
    use std::sync::Mutex;

    /// Select responses are served from a queue; updates are recorded.
    struct ScriptedStore {
        selects: Mutex<Vec<SelectResults>>,
        updates: Mutex<Vec<String>>,
    }

    impl ScriptedStore {
        fn new(selects: Vec<SelectResults>) -> Self {
            Self {
                selects: Mutex::new(selects),
                updates: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl SparqlStore for ScriptedStore {
        async fn select(&self, _query: &str) -> StoreResult<SelectResults> {
            let mut queue = self.selects.lock().unwrap();
            if queue.is_empty() {
                return Err(StoreError::Malformed("unexpected select".into()));
            }
            Ok(queue.remove(0))
        }

        async fn update(&self, query: &str) -> StoreResult<()> {
            self.updates.lock().unwrap().push(query.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn physical_path_maps_share_uri_onto_share_folder() {
        let store = Arc::new(ScriptedStore::new(vec![SelectResults::uris(
            "physicalFile",
            &["share://abc.html"],
        )]));
        let files = FileStore::new(store, "/tmp/share");
        let path = files
            .physical_path("http://data.lblod.info/id/files/x")
            .await
            .unwrap();
        assert_eq!(path, PathBuf::from("/tmp/share/abc.html"));
    }

    #[tokio::test]
    async fn read_content_gunzips_gz_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.html.gz");
        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(b"<html>hello</html>").unwrap();
        std::fs::write(&path, encoder.finish().unwrap()).unwrap();

        let store = Arc::new(ScriptedStore::new(vec![]));
        let files = FileStore::new(store, dir.path());
        let content = files.read_content(&path).await.unwrap();
        assert_eq!(content, "<html>hello</html>");
    }

    #[tokio::test]
    async fn read_content_passes_plain_files_through() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.html");
        std::fs::write(&path, "<html>plain</html>").unwrap();

        let store = Arc::new(ScriptedStore::new(vec![]));
        let files = FileStore::new(store, dir.path());
        let content = files.read_content(&path).await.unwrap();
        assert_eq!(content, "<html>plain</html>");
    }

    #[tokio::test]
    async fn write_content_persists_and_registers() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(ScriptedStore::new(vec![]));
        let files = FileStore::new(store.clone(), dir.path());

        let uri = files
            .write_content("http://example.org/graph", "data", "out-valid.ttl")
            .await
            .unwrap();
        assert!(uri.starts_with(LOGICAL_FILE_URI_PREFIX));

        // One physical file landed in the share folder with our content.
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
        let written = std::fs::read_to_string(entries[0].as_ref().unwrap().path()).unwrap();
        assert_eq!(written, "data");

        // And its metadata was inserted.
        let updates = store.updates.lock().unwrap();
        assert_eq!(updates.len(), 1);
        assert!(updates[0].contains("nfo:FileDataObject"));
        assert!(updates[0].contains("out-valid.ttl"));
    }
}
