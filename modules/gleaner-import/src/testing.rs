//! In-memory `SparqlStore` mock for deterministic tests: no endpoint, no
//! network. Select behavior is programmed with a closure; updates are
//! recorded and can be failed selectively to simulate rejections.

use std::sync::Mutex;

use async_trait::async_trait;

use gleaner_store::client::Result as StoreResult;
use gleaner_store::{SelectResults, SparqlStore, StoreError};

type SelectFn = Box<dyn Fn(&str) -> StoreResult<SelectResults> + Send + Sync>;
type UpdateFn = Box<dyn Fn(&str) -> StoreResult<()> + Send + Sync>;

pub struct MockStore {
    select_fn: SelectFn,
    update_fn: UpdateFn,
    pub selects: Mutex<Vec<String>>,
    pub updates: Mutex<Vec<String>>,
}

impl Default for MockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockStore {
    pub fn new() -> Self {
        Self {
            select_fn: Box::new(|_| Ok(SelectResults::empty())),
            update_fn: Box::new(|_| Ok(())),
            selects: Mutex::new(Vec::new()),
            updates: Mutex::new(Vec::new()),
        }
    }

    /// Program the select responder. The closure sees the full query text
    /// and typically dispatches on distinctive substrings.
    pub fn on_select(
        mut self,
        f: impl Fn(&str) -> StoreResult<SelectResults> + Send + Sync + 'static,
    ) -> Self {
        self.select_fn = Box::new(f);
        self
    }

    /// Program the update responder. Updates are recorded regardless.
    pub fn on_update(
        mut self,
        f: impl Fn(&str) -> StoreResult<()> + Send + Sync + 'static,
    ) -> Self {
        self.update_fn = Box::new(f);
        self
    }

    /// Fail any update whose text contains `marker`, accept the rest.
    pub fn rejecting_updates_containing(marker: &'static str) -> Self {
        Self::new().on_update(move |q| {
            if q.contains(marker) {
                Err(StoreError::Endpoint {
                    status: 500,
                    body: format!("cannot parse statement near {marker}"),
                })
            } else {
                Ok(())
            }
        })
    }

    pub fn update_count(&self) -> usize {
        self.updates.lock().unwrap().len()
    }

    pub fn recorded_updates(&self) -> Vec<String> {
        self.updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl SparqlStore for MockStore {
    async fn select(&self, query: &str) -> StoreResult<SelectResults> {
        self.selects.lock().unwrap().push(query.to_string());
        (self.select_fn)(query)
    }

    async fn update(&self, query: &str) -> StoreResult<()> {
        self.updates.lock().unwrap().push(query.to_string());
        (self.update_fn)(query)
    }
}
