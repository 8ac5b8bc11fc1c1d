use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use gleaner_common::Config;
use gleaner_import::pipeline::ImportPipeline;
use gleaner_import::task::TaskStore;
use gleaner_store::{FileStore, HttpSparqlClient, SparqlStore};

#[derive(Parser)]
#[command(name = "gleaner-import")]
#[command(about = "Extract RDFa from harvested pages and load it into the triplestore")]
#[command(version)]
struct Cli {
    /// Task URIs to run, in order.
    #[arg(required = true)]
    tasks: Vec<String>,

    /// Skip the startup sweep that moves stale busy tasks to failed.
    #[arg(long)]
    skip_reconcile: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("gleaner=info".parse()?))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    info!(
        endpoint = config.sparql_endpoint.as_str(),
        share_folder = config.share_folder.as_str(),
        "Gleaner import starting"
    );

    let store: Arc<dyn SparqlStore> = Arc::new(HttpSparqlClient::new(&config.sparql_endpoint));
    let high_load: Arc<dyn SparqlStore> =
        Arc::new(HttpSparqlClient::new(&config.high_load_sparql_endpoint));
    let files = FileStore::new(high_load.clone(), &config.share_folder);

    if !cli.skip_reconcile {
        TaskStore::new(store.clone()).reconcile_stale_tasks().await;
    }

    let pipeline = ImportPipeline::new(store, high_load, files, config);
    for task in &cli.tasks {
        pipeline.run(task).await?;
    }
    Ok(())
}
