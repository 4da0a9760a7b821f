//! Peer reconciler (spec.md §4.D): converges this node's mesh peer set
//! with the set of currently-active servers in the store.

use jiji_core::{
    is_valid_cidr, is_valid_endpoint, is_valid_ipv6, is_valid_public_key, parse_endpoints,
    quote_sql_literal,
};
use tracing::warn;

use crate::mesh::MeshControl;
use crate::store::StoreClient;

const ACTIVE_WINDOW_MS: i64 = 5 * 60 * 1000;
const DEFAULT_KEEPALIVE: u32 = 25;

struct ActiveServer {
    public_key: String,
    subnet: String,
    management_ip: String,
    endpoints: Vec<String>,
}

/// Runs one peer-reconciliation pass.
pub async fn reconcile_peers(store: &StoreClient, mesh: &MeshControl, server_id: &str) {
    let active = query_active_servers(store, server_id).await;
    let current_peers = match mesh.dump_peers().await {
        Ok(peers) => peers,
        Err(err) => {
            warn!(error = %err, "mesh dump failed, skipping peer reconciliation this tick");
            return;
        }
    };
    let current_keys: std::collections::HashSet<&str> =
        current_peers.iter().map(|p| p.public_key.as_str()).collect();

    for server in &active {
        if current_keys.contains(server.public_key.as_str()) {
            continue;
        }
        add_peer(mesh, server).await;
    }

    let active_keys: std::collections::HashSet<&str> =
        active.iter().map(|s| s.public_key.as_str()).collect();
    for peer in &current_peers {
        if !active_keys.contains(peer.public_key.as_str()) {
            if let Err(err) = mesh.remove_peer(&peer.public_key).await {
                warn!(error = %err, public_key = %peer.public_key, "failed to remove orphan peer");
            }
        }
    }
}

async fn add_peer(mesh: &MeshControl, server: &ActiveServer) {
    if !is_valid_public_key(&server.public_key) {
        warn!(public_key = %server.public_key, "skipping peer add: invalid public key");
        return;
    }
    if !is_valid_cidr(&server.subnet) {
        warn!(subnet = %server.subnet, "skipping peer add: invalid subnet");
        return;
    }
    if !is_valid_ipv6(&server.management_ip) {
        warn!(management_ip = %server.management_ip, "skipping peer add: invalid management ip");
        return;
    }
    let Some(first_endpoint) = server.endpoints.first() else {
        warn!(public_key = %server.public_key, "skipping peer add: no known endpoints");
        return;
    };
    if !is_valid_endpoint(first_endpoint) {
        warn!(endpoint = %first_endpoint, "skipping peer add: invalid endpoint");
        return;
    }

    let allowed_ips = format!("{},{}/128", server.subnet, server.management_ip);
    if let Err(err) = mesh
        .set_peer(&server.public_key, &allowed_ips, first_endpoint, Some(DEFAULT_KEEPALIVE))
        .await
    {
        warn!(error = %err, public_key = %server.public_key, "failed to add peer");
    }
}

async fn query_active_servers(store: &StoreClient, server_id: &str) -> Vec<ActiveServer> {
    let sql = format!(
        "SELECT public_key, subnet, management_ip, endpoints FROM servers \
         WHERE last_seen > (unixepoch() * 1000 - {ACTIVE_WINDOW_MS}) AND id != '{}'",
        quote_sql_literal(server_id)
    );
    store
        .reader
        .query(&sql)
        .await
        .into_iter()
        .filter_map(|row| {
            if row.len() < 4 {
                return None;
            }
            Some(ActiveServer {
                public_key: row[0].clone(),
                subnet: row[1].clone(),
                management_ip: row[2].clone(),
                endpoints: parse_endpoints(&row[3]),
            })
        })
        .collect()
}
