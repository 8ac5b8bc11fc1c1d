pub mod config;
pub mod term;
pub mod vocab;

pub use config::Config;
pub use term::{Statement, Term};
