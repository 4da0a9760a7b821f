//! Container health sync (spec.md §4.F): classifies each locally-owned
//! container with hysteresis and writes back changed rows.
//!
//! Probes run concurrently across containers (the only intra-tick
//! parallelism allowed, per §5); the daemon awaits all of them and
//! tolerates individual task failures by treating that row as unchanged
//! rather than letting one bad probe abort the whole sync.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jiji_core::{is_valid_container_id, quote_sql_literal, HealthStatus, HealthTransition};
use tokio::net::TcpStream;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::warn;

use crate::engine::ContainerEngine;
use crate::store::StoreClient;

/// Connect deadline for the optional TCP health-port probe (spec.md §4.F).
const TCP_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

struct ContainerRow {
    id: String,
    private_ip: String,
    health_port: Option<u16>,
    prev_status: Option<HealthStatus>,
    prev_failures: u32,
}

struct WriteBack {
    id: String,
    status: HealthStatus,
    failures: u32,
}

/// Runs one container-health pass for every row owned by `server_id`.
pub async fn sync_container_health(
    store: &StoreClient,
    engine: &ContainerEngine,
    server_id: &str,
) {
    let rows = query_own_containers(store, server_id).await;
    if rows.is_empty() {
        return;
    }

    let mut tasks = JoinSet::new();
    for row in rows {
        let engine = engine.clone();
        tasks.spawn(async move {
            let running = engine.is_running(&row.id).await;
            let port_probe = match (running, row.health_port) {
                (false, _) => None,
                (true, None) => None,
                (true, Some(port)) => Some(tcp_probe(&row.private_ip, port).await),
            };
            let transition = HealthTransition::compute(row.prev_failures, running, port_probe);
            if transition.changed(row.prev_status, row.prev_failures) {
                Some(WriteBack {
                    id: row.id,
                    status: transition.new_status,
                    failures: transition.new_failures,
                })
            } else {
                None
            }
        });
    }

    let mut writes = Vec::new();
    while let Some(result) = tasks.join_next().await {
        match result {
            Ok(Some(write)) => writes.push(write),
            Ok(None) => {}
            Err(err) => warn!(error = %err, "container health probe task failed, row left unchanged"),
        }
    }

    let now_ms = now_millis();
    for write in writes {
        write_back(store, &write, now_ms).await;
    }
}

async fn tcp_probe(ip: &str, port: u16) -> bool {
    let addr = format!("{ip}:{port}");
    matches!(timeout(TCP_PROBE_TIMEOUT, TcpStream::connect(&addr)).await, Ok(Ok(_)))
}

async fn query_own_containers(store: &StoreClient, server_id: &str) -> Vec<ContainerRow> {
    let sql = format!(
        "SELECT id, private_ip, health_port, health_status, consecutive_failures FROM containers \
         WHERE server_id = '{}'",
        quote_sql_literal(server_id)
    );
    store
        .reader
        .query(&sql)
        .await
        .into_iter()
        .filter_map(|row| {
            if row.len() < 5 {
                return None;
            }
            let id = row[0].clone();
            if !is_valid_container_id(&id) {
                warn!(container_id = %id, "skipping container health check: invalid id");
                return None;
            }
            Some(ContainerRow {
                id,
                private_ip: row[1].clone(),
                health_port: parse_health_port(&row[2]),
                prev_status: HealthStatus::parse(&row[3]),
                prev_failures: row[4].parse().unwrap_or(0),
            })
        })
        .collect()
}

/// The store tolerates the literal strings `"null"` and `"0"` where a
/// missing numeric would be expected; both mean "no health port
/// configured" (spec.md §9, Open Questions).
fn parse_health_port(raw: &str) -> Option<u16> {
    match raw {
        "" | "null" | "0" => None,
        other => other.parse().ok().filter(|&p| p != 0),
    }
}

async fn write_back(store: &StoreClient, write: &WriteBack, now_ms: i64) {
    let sql = format!(
        "UPDATE containers SET health_status = '{}', last_health_check = {now_ms}, \
         consecutive_failures = {} WHERE id = '{}'",
        write.status.as_str(),
        write.failures,
        quote_sql_literal(&write.id)
    );
    if let Err(err) = store.writer.execute_one(sql).await {
        warn!(error = %err, container_id = %write.id, "failed to write back container health");
    }
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as i64)
}
