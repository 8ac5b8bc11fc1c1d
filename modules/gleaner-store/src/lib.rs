pub mod bindings;
pub mod client;
pub mod escape;
pub mod files;

pub use bindings::SelectResults;
pub use client::{HttpSparqlClient, SparqlStore, StoreError};
pub use files::{FileMetadata, FileStore};
