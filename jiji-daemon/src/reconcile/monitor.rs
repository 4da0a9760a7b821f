//! Peer monitor (spec.md §4.E): rotates a peer's endpoint once its
//! handshake has gone silent past the kernel's own rekey-attempt ceiling.
//!
//! This is the only path that modifies an already-present peer; it never
//! adds or removes one (that's §4.D's job), and peer reconciliation always
//! runs first within a tick so a freshly-added peer isn't immediately
//! rotated (spec.md §5).

use std::time::{SystemTime, UNIX_EPOCH};

use jiji_core::{is_valid_endpoint, parse_endpoints, quote_sql_literal};
use tracing::warn;

use crate::mesh::MeshControl;
use crate::store::StoreClient;

/// Seconds of handshake silence after which a peer's endpoint is rotated.
/// Matches `wg`'s own rekey-attempt ceiling (spec.md §4.E).
const REKEY_CEILING_SECS: u64 = 275;

/// Runs one peer-monitoring pass over the current mesh peer set.
pub async fn monitor_peers(store: &StoreClient, mesh: &MeshControl) {
    let peers = match mesh.dump_peers().await {
        Ok(peers) => peers,
        Err(err) => {
            warn!(error = %err, "mesh dump failed, skipping peer monitoring this tick");
            return;
        }
    };

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs());

    for peer in &peers {
        if peer.never_connected() {
            continue;
        }
        let age = now.saturating_sub(peer.latest_handshake);
        if age > REKEY_CEILING_SECS {
            rotate_endpoint(store, mesh, &peer.public_key, peer.endpoint.as_deref()).await;
        }
    }
}

async fn rotate_endpoint(
    store: &StoreClient,
    mesh: &MeshControl,
    public_key: &str,
    current_endpoint: Option<&str>,
) {
    let endpoints = query_server_endpoints(store, public_key).await;
    if endpoints.len() < 2 {
        return;
    }

    let current = current_endpoint.unwrap_or("");
    let current_idx = endpoints
        .iter()
        .position(|e| e == current)
        .map_or(-1i64, |i| i as i64);
    let n = endpoints.len() as i64;
    let next_idx = (current_idx + 1).rem_euclid(n) as usize;
    let next = &endpoints[next_idx];

    if next == current {
        return;
    }
    if !is_valid_endpoint(next) {
        warn!(endpoint = %next, public_key = %public_key, "skipping endpoint rotation: invalid next endpoint");
        return;
    }

    if let Err(err) = mesh.update_endpoint(public_key, next).await {
        warn!(error = %err, public_key = %public_key, "failed to rotate peer endpoint");
    }
}

async fn query_server_endpoints(store: &StoreClient, public_key: &str) -> Vec<String> {
    let sql = format!(
        "SELECT endpoints FROM servers WHERE public_key = '{}'",
        quote_sql_literal(public_key)
    );
    store
        .reader
        .query(&sql)
        .await
        .into_iter()
        .next()
        .and_then(|row| row.into_iter().next())
        .map_or_else(Vec::new, |raw| parse_endpoints(&raw))
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
    async fn rotates_stale_peer_to_next_endpoint() {
        let fake = Arc::new(FakeCommandRunner::new());
        let pubkey = "B".repeat(43) + "=";
        let stale_handshake = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
            - 400;
        fake.expect(
            "wg",
            &["show", "jiji0", "dump"],
            &format!(
                "iface-header\n{pubkey}\t(none)\t1.2.3.4:31820\t10.0.0.0/24\t{stale_handshake}\t1\t1\toff\n"
            ),
        );
        fake.expect(
            "corrosion",
            &[
                "query",
                "--config",
                "/opt/jiji/corrosion/config.toml",
                &format!("SELECT endpoints FROM servers WHERE public_key = '{pubkey}'"),
            ],
            r#"["1.2.3.4:31820","5.6.7.8:31820"]"#,
        );
        fake.expect(
            "wg",
            &["set", "jiji0", "peer", &pubkey, "endpoint", "5.6.7.8:31820"],
            "",
        );

        let store = store_with_runner(Arc::clone(&fake));
        let mesh = MeshControl::new(fake, "jiji0");
        monitor_peers(&store, &mesh).await;
    }

    #[tokio::test]
    async fn never_connected_peer_is_skipped() {
        let fake = Arc::new(FakeCommandRunner::new());
        let pubkey = "C".repeat(43) + "=";
        fake.expect(
            "wg",
            &["show", "jiji0", "dump"],
            &format!("iface-header\n{pubkey}\t(none)\t\t10.0.0.0/24\t0\t0\t0\toff\n"),
        );
        // No query canned: if monitor_peers queried the store for this
        // peer, the fake would error and the test would still pass
        // silently, so the assertion that matters is the call count below.
        let calls_before = fake.calls().len();
        let store = store_with_runner(Arc::clone(&fake));
        let mesh = MeshControl::new(Arc::clone(&fake), "jiji0");
        monitor_peers(&store, &mesh).await;
        assert_eq!(fake.calls().len(), calls_before + 1);
    }

    #[tokio::test]
    async fn fresh_handshake_is_not_rotated() {
        let fake = Arc::new(FakeCommandRunner::new());
        let pubkey = "D".repeat(43) + "=";
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();
        fake.expect(
            "wg",
            &["show", "jiji0", "dump"],
            &format!(
                "iface-header\n{pubkey}\t(none)\t1.2.3.4:31820\t10.0.0.0/24\t{now}\t1\t1\toff\n"
            ),
        );
        let calls_before = fake.calls().len();
        let store = store_with_runner(Arc::clone(&fake));
        let mesh = MeshControl::new(Arc::clone(&fake), "jiji0");
        monitor_peers(&store, &mesh).await;
        assert_eq!(fake.calls().len(), calls_before + 1);
    }

    #[tokio::test]
    async fn abort_rotation_with_fewer_than_two_endpoints() {
        let fake = Arc::new(FakeCommandRunner::new());
        let pubkey = "E".repeat(43) + "=";
        let stale_handshake = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
            - 400;
        fake.expect(
            "wg",
            &["show", "jiji0", "dump"],
            &format!(
                "iface-header\n{pubkey}\t(none)\t1.2.3.4:31820\t10.0.0.0/24\t{stale_handshake}\t1\t1\toff\n"
            ),
        );
        fake.expect(
            "corrosion",
            &[
                "query",
                "--config",
                "/opt/jiji/corrosion/config.toml",
                &format!("SELECT endpoints FROM servers WHERE public_key = '{pubkey}'"),
            ],
            r#"["1.2.3.4:31820"]"#,
        );
        let store = store_with_runner(Arc::clone(&fake));
        let mesh = MeshControl::new(fake, "jiji0");
        monitor_peers(&store, &mesh).await;
    }
}
