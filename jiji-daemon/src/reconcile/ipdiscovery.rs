//! Public-endpoint discoverer (spec.md §4.G): resolves this server's
//! external IP from a small ordered list of HTTP services and, if it
//! changed, writes a new single-element endpoint list through the
//! transactional writer so subscribers learn the change.

use std::sync::OnceLock;
use std::time::Duration;

use jiji_core::{encode_endpoints, is_valid_ipv4, quote_sql_literal};
use regex::Regex;
use tracing::warn;

use crate::store::StoreClient;

/// Per-request deadline for each discovery service (spec.md §4.G).
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Ordered list of plain-text external-IP services, tried in order until
/// one responds with a body matching [`ipv4_regex`].
const IP_SERVICES: &[&str] = &[
    "https://api.ipify.org",
    "https://ifconfig.me/ip",
    "https://icanhazip.com",
];

fn ipv4_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}$").expect("static regex"))
}

/// Runs one discovery pass. `wg_port` is the daemon's well-known tunnel
/// port, appended to the discovered IP when a change is written.
pub async fn discover_public_endpoint(
    store: &StoreClient,
    client: &reqwest::Client,
    server_id: &str,
    wg_port: u16,
) {
    let Some(ip) = resolve_external_ip(client).await else {
        warn!("public IP discovery failed: no service responded with a valid address");
        return;
    };

    let current = query_endpoints_raw(store, server_id).await;
    if current.contains(&ip) {
        return;
    }

    let new_endpoint = format!("{ip}:{wg_port}");
    let encoded = encode_endpoints(&[new_endpoint]);
    let sql = format!(
        "UPDATE servers SET endpoints = '{}' WHERE id = '{}'",
        quote_sql_literal(&encoded),
        quote_sql_literal(server_id)
    );
    if let Err(err) = store.writer.execute_one(sql).await {
        warn!(error = %err, "failed to write discovered public endpoint");
    }
}

async fn resolve_external_ip(client: &reqwest::Client) -> Option<String> {
    for &service in IP_SERVICES {
        let Ok(response) = client
            .get(service)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
        else {
            continue;
        };
        let Ok(body) = response.text().await else {
            continue;
        };
        let candidate = body.trim();
        if ipv4_regex().is_match(candidate) && is_valid_ipv4(candidate) {
            return Some(candidate.to_string());
        }
    }
    None
}

async fn query_endpoints_raw(store: &StoreClient, server_id: &str) -> String {
    let sql = format!(
        "SELECT endpoints FROM servers WHERE id = '{}'",
        quote_sql_literal(server_id)
    );
    store
        .reader
        .query_scalar(&sql)
        .await
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ipv4_regex_matches_only_strict_dotted_quad() {
        assert!(ipv4_regex().is_match("1.2.3.4"));
        assert!(!ipv4_regex().is_match("1.2.3.4\n"));
        assert!(!ipv4_regex().is_match("not-an-ip"));
        assert!(!ipv4_regex().is_match("1.2.3.4:31820"));
    }

    #[test]
    fn existing_substring_presence_skips_write() {
        let current = r#"["1.1.1.1:31820"]"#.to_string();
        assert!(current.contains("1.1.1.1"));
    }
}
