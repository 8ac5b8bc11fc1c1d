use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// SPARQL endpoint for regular queries and updates.
    pub sparql_endpoint: String,
    /// Endpoint for heavy paginated reads. Defaults to `sparql_endpoint`;
    /// deployments point it at a replica tuned for large scans.
    pub high_load_sparql_endpoint: String,
    /// Root of the shared file storage that `share://` URIs map onto.
    pub share_folder: String,
    /// Also persist the original/invalid/corrected debug artifacts, not
    /// just the valid one.
    pub write_debug_ttls: bool,
    /// Soft heap ceiling in MB for the between-pages backpressure valve.
    pub max_rss_mb: u64,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        let sparql_endpoint = required_env("SPARQL_ENDPOINT");
        Self {
            high_load_sparql_endpoint: env::var("HIGH_LOAD_SPARQL_ENDPOINT")
                .unwrap_or_else(|_| sparql_endpoint.clone()),
            sparql_endpoint,
            share_folder: env::var("SHARE_FOLDER").unwrap_or_else(|_| "/share".to_string()),
            write_debug_ttls: env::var("WRITE_DEBUG_TTLS")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
            max_rss_mb: env::var("MAX_RSS_MB")
                .unwrap_or_else(|_| "2048".to_string())
                .parse()
                .expect("MAX_RSS_MB must be a number"),
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}
