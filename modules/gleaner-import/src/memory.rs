//! Soft backpressure valve on resident memory.
//!
//! Each page extraction briefly materializes a full DOM; on large runs
//! the allocator can hold on to that headroom. Between pages the
//! orchestrator asks this valve to pause briefly when resident memory
//! crosses a fraction of the configured ceiling. It only ever delays a
//! task, never aborts it.

use std::time::Duration;

use tracing::{debug, info};

const RSS_THRESHOLD_PCT: u64 = 70;
const PAUSE: Duration = Duration::from_secs(5);

pub struct MemoryValve {
    limit_bytes: u64,
}

impl MemoryValve {
    pub fn new(max_rss_mb: u64) -> Self {
        Self {
            limit_bytes: max_rss_mb * 1024 * 1024,
        }
    }

    /// Pause briefly if resident memory exceeds the threshold.
    pub async fn pause_if_bloated(&self) {
        let Some(rss) = current_rss_bytes() else {
            return;
        };
        let pct = rss * 100 / self.limit_bytes.max(1);
        debug!(rss_mb = rss / (1024 * 1024), pct, "Resident memory between pages");
        if pct > RSS_THRESHOLD_PCT {
            info!(
                pct,
                pause_secs = PAUSE.as_secs(),
                "Memory above threshold, pausing before the next page"
            );
            tokio::time::sleep(PAUSE).await;
        }
    }
}

/// Resident set size from /proc; `None` on platforms without procfs.
fn current_rss_bytes() -> Option<u64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    let line = status.lines().find(|l| l.starts_with("VmRSS:"))?;
    let kb: u64 = line.split_whitespace().nth(1)?.parse().ok()?;
    Some(kb * 1024)
}
