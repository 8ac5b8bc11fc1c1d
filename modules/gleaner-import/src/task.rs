//! Task state machine.
//!
//! Tasks are created by the job controller in the scheduled state; this
//! service only ever moves them busy → success | failed. Terminal states
//! are never revisited for the same task instance.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use gleaner_common::vocab::{
    self, ERROR_TYPE, ERROR_URI_PREFIX, OP_EXTRACTING, OP_IMPORTING_LEGACY, PREFIXES, STATUS_BUSY,
    STATUS_FAILED, TASK_TYPE,
};
use gleaner_store::escape::{escape_datetime, escape_string, escape_uri};
use gleaner_store::SparqlStore;

/// A harvesting task, fully resolved: scalar attributes plus its
/// dependency and container lists.
#[derive(Debug, Clone)]
pub struct Task {
    pub uri: String,
    pub id: String,
    /// Graph the task (and everything this run produces) lives in.
    pub graph: String,
    pub job: String,
    pub status: String,
    pub operation: String,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    pub index: String,
    pub error: Option<String>,
    pub parent_tasks: Vec<String>,
    pub input_containers: Vec<String>,
    pub result_containers: Vec<String>,
}

pub struct TaskStore {
    store: Arc<dyn SparqlStore>,
}

impl TaskStore {
    pub fn new(store: Arc<dyn SparqlStore>) -> Self {
        Self { store }
    }

    /// Load a task by URI. Returns `None` when the URI does not denote a
    /// known task or its operation is not extraction-class — callers treat
    /// both as "not for us".
    pub async fn load_task(&self, uri: &str) -> Result<Option<Task>> {
        let q = format!(
            "{PREFIXES}SELECT DISTINCT ?graph ?id ?job ?created ?modified ?status ?index ?operation ?error WHERE {{
              GRAPH ?graph {{
                {task} a {task_type} ;
                  dct:isPartOf ?job ;
                  mu:uuid ?id ;
                  dct:created ?created ;
                  dct:modified ?modified ;
                  adms:status ?status ;
                  task:index ?index ;
                  task:operation ?operation .
                VALUES ?operation {{ {extracting} {importing} }}
                OPTIONAL {{ {task} task:error ?error . }}
              }}
            }}",
            task = escape_uri(uri),
            task_type = escape_uri(TASK_TYPE),
            extracting = escape_uri(OP_EXTRACTING),
            importing = escape_uri(OP_IMPORTING_LEGACY),
        );
        let results = self.store.select(&q).await?;
        let Some(row) = results.rows().first() else {
            return Ok(None);
        };

        let get = |var: &str| row.get(var).map(|v| v.value.clone());
        let operation = get("operation").context("task has no operation")?;
        if operation == OP_IMPORTING_LEGACY {
            warn!(
                task = uri,
                "Operation {OP_IMPORTING_LEGACY} is deprecated, use {OP_EXTRACTING} instead"
            );
        }

        let mut task = Task {
            uri: uri.to_string(),
            id: get("id").context("task has no uuid")?,
            graph: get("graph").context("task has no graph")?,
            job: get("job").context("task has no job")?,
            status: get("status").context("task has no status")?,
            operation,
            created: get("created").and_then(|v| v.parse().ok()),
            modified: get("modified").and_then(|v| v.parse().ok()),
            index: get("index").unwrap_or_default(),
            error: get("error"),
            parent_tasks: Vec::new(),
            input_containers: Vec::new(),
            result_containers: Vec::new(),
        };

        // The to-many attributes come from separate lookups; one query per
        // list keeps the rows trivially parseable.
        task.parent_tasks = self.list_of(uri, "cogs:dependsOn", "parentTask").await?;
        task.input_containers = self
            .list_of(uri, "task:inputContainer", "inputContainer")
            .await?;
        task.result_containers = self
            .list_of(uri, "task:resultsContainer", "resultsContainer")
            .await?;
        Ok(Some(task))
    }

    async fn list_of(&self, task_uri: &str, predicate: &str, var: &str) -> Result<Vec<String>> {
        let q = format!(
            "{PREFIXES}SELECT DISTINCT ?{var} WHERE {{
              GRAPH ?g {{ {task} {predicate} ?{var} . }}
            }}",
            task = escape_uri(task_uri),
        );
        Ok(self.store.select(&q).await?.column(var))
    }

    /// Replace the task's status and modification timestamp. Single
    /// attempt; a failure here is fatal to the caller.
    pub async fn set_status(&self, task: &Task, status: &str) -> Result<()> {
        info!(task = task.uri.as_str(), status, "Updating task status");
        let q = format!(
            "{PREFIXES}DELETE {{
              GRAPH ?g {{
                ?subject adms:status ?status .
                ?subject dct:modified ?modified .
              }}
            }}
            INSERT {{
              GRAPH ?g {{
                ?subject adms:status {new_status} .
                ?subject dct:modified {now} .
              }}
            }}
            WHERE {{
              GRAPH ?g {{
                BIND({task} as ?subject)
                ?subject adms:status ?status .
                OPTIONAL {{ ?subject dct:modified ?modified . }}
              }}
            }}",
            task = escape_uri(&task.uri),
            new_status = escape_uri(status),
            now = escape_datetime(&Utc::now()),
        );
        self.store.update(&q).await?;
        Ok(())
    }

    /// Mint an error record and link it to the task. Independent of the
    /// status update; never blocks it.
    pub async fn append_error(&self, task: &Task, message: &str) -> Result<()> {
        let id = Uuid::new_v4().to_string();
        let uri = format!("{ERROR_URI_PREFIX}{id}");
        let q = format!(
            "{PREFIXES}INSERT DATA {{
              GRAPH {graph} {{
                {error} a {error_type} ;
                  mu:uuid {id} ;
                  oslc:message {message} .
                {task} task:error {error} .
              }}
            }}",
            graph = escape_uri(&task.graph),
            error = escape_uri(&uri),
            error_type = escape_uri(ERROR_TYPE),
            id = escape_string(&id),
            message = escape_string(message),
            task = escape_uri(&task.uri),
        );
        self.store.update(&q).await?;
        Ok(())
    }

    /// Startup sweep: any extraction-class task still busy is evidence of
    /// a crash mid-run; force it to failed so the dispatcher can retry.
    /// A failure of the sweep itself is logged and does not block startup.
    pub async fn reconcile_stale_tasks(&self) {
        let q = format!(
            "{PREFIXES}DELETE {{
              GRAPH ?g {{
                ?task adms:status {busy} .
                ?task dct:modified ?modified .
              }}
            }}
            INSERT {{
              GRAPH ?g {{
                ?task adms:status {failed} .
                ?task dct:modified {now} .
              }}
            }}
            WHERE {{
              GRAPH ?g {{
                ?task a {task_type} ;
                  adms:status {busy} ;
                  task:operation ?operation .
                VALUES ?operation {{ {extracting} {importing} }}
                OPTIONAL {{ ?task dct:modified ?modified . }}
              }}
            }}",
            busy = escape_uri(STATUS_BUSY),
            failed = escape_uri(STATUS_FAILED),
            now = escape_datetime(&Utc::now()),
            task_type = escape_uri(TASK_TYPE),
            extracting = escape_uri(OP_EXTRACTING),
            importing = escape_uri(OP_IMPORTING_LEGACY),
        );
        if let Err(e) = self.store.update(&q).await {
            warn!(error = %e, "Failed to move stale busy tasks to failed on startup");
        }
    }

    /// Existence probe, used by callers that only need to know whether a
    /// subject is a task at all.
    pub async fn is_task(&self, uri: &str) -> Result<bool> {
        // Not an ASK: ASK result shapes differ per endpoint, a one-row
        // SELECT parses the same everywhere.
        let q = format!(
            "{PREFIXES}SELECT ?subject WHERE {{
              GRAPH ?g {{ BIND({subject} as ?subject) ?subject a {task_type} . }}
            }} LIMIT 1",
            subject = escape_uri(uri),
            task_type = escape_uri(TASK_TYPE),
        );
        Ok(!self.store.select(&q).await?.is_empty())
    }
}
