//! Partition detector (spec.md §4.I): the sole writer of the process-wide
//! split-brain flag, the only channel by which garbage collection is
//! paused (spec.md §5, §9).

use tracing::{error, info};

use crate::splitbrain::SplitBrainFlag;
use crate::store::StoreClient;

/// A server counts as active if its heartbeat is within this many
/// milliseconds of `now_ms` (spec.md §4.I).
const ACTIVE_WINDOW_MS: i64 = 300_000;

/// Runs one partition-detection pass against `now_ms`.
pub async fn detect_partition(store: &StoreClient, split_brain: &SplitBrainFlag, now_ms: i64) {
    let Some(total) = query_scalar_i64(store, "SELECT count(*) FROM servers").await else {
        return;
    };
    if total == 0 {
        return;
    }

    let threshold = now_ms - ACTIVE_WINDOW_MS;
    let active_sql = format!("SELECT count(*) FROM servers WHERE last_seen >= {threshold}");
    let Some(active) = query_scalar_i64(store, &active_sql).await else {
        return;
    };

    let pct = (100 * active) / total;

    if total > 1 && pct < 50 {
        let stale_hostnames = query_stale_hostnames(store, threshold).await;
        error!(
            active,
            total,
            pct,
            stale_hostnames = ?stale_hostnames,
            "partition detected: fewer than half of known servers are reachable"
        );
        split_brain.set();
    } else if split_brain.is_set() {
        info!(active, total, pct, "partition resolved");
        split_brain.clear();
    }
}

async fn query_scalar_i64(store: &StoreClient, sql: &str) -> Option<i64> {
    store
        .reader
        .query_scalar(sql)
        .await
        .and_then(|raw| raw.parse().ok())
}

async fn query_stale_hostnames(store: &StoreClient, threshold_ms: i64) -> Vec<String> {
    let sql = format!(
        "SELECT hostname FROM servers WHERE last_seen < {threshold_ms} AND hostname IS NOT NULL"
    );
    store
        .reader
        .query(&sql)
        .await
        .into_iter()
        .filter_map(|row| row.into_iter().next())
        .collect()
}
