//! Thin wrapper over the encrypted-tunnel userspace tool, `wg` (spec.md
//! §4.C). Every failure surfaces a [`MeshError`] carrying the tool's
//! stderr; the reconciler decides whether to abandon just the one peer
//! operation or the whole step.

use std::sync::Arc;

use jiji_core::PeerState;

use crate::command::CommandRunner;
use crate::error::MeshError;

#[derive(Clone)]
pub struct MeshControl {
    runner: Arc<dyn CommandRunner>,
    interface: String,
}

impl MeshControl {
    #[must_use]
    pub fn new(runner: Arc<dyn CommandRunner>, interface: impl Into<String>) -> Self {
        Self {
            runner,
            interface: interface.into(),
        }
    }

    /// Lists current peers via `wg show <if> dump`.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError`] if the `wg` invocation itself fails (the
    /// process could not be spawned or exited non-zero).
    pub async fn dump_peers(&self) -> Result<Vec<PeerState>, MeshError> {
        let output = self
            .run(&["show", &self.interface, "dump"])
            .await?;
        Ok(parse_dump(&String::from_utf8_lossy(&output)))
    }

    /// Creates or updates a peer.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError`] if the `wg` invocation fails.
    pub async fn set_peer(
        &self,
        public_key: &str,
        allowed_ips: &str,
        endpoint: &str,
        keepalive: Option<u32>,
    ) -> Result<(), MeshError> {
        let keepalive_str;
        let mut args = vec![
            "set",
            self.interface.as_str(),
            "peer",
            public_key,
            "allowed-ips",
            allowed_ips,
            "endpoint",
            endpoint,
        ];
        if let Some(secs) = keepalive {
            keepalive_str = secs.to_string();
            args.push("persistent-keepalive");
            args.push(&keepalive_str);
        }
        self.run(&args).await.map(|_| ())
    }

    /// Removes a peer by public key. Idempotent: removing an unknown key
    /// is a no-op, so callers need not pre-check.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError`] if the `wg` invocation itself fails.
    pub async fn remove_peer(&self, public_key: &str) -> Result<(), MeshError> {
        self.run(&["set", &self.interface, "peer", public_key, "remove"])
            .await
            .map(|_| ())
    }

    /// Updates only a peer's endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError`] if the `wg` invocation fails.
    pub async fn update_endpoint(&self, public_key: &str, endpoint: &str) -> Result<(), MeshError> {
        self.run(&[
            "set",
            &self.interface,
            "peer",
            public_key,
            "endpoint",
            endpoint,
        ])
        .await
        .map(|_| ())
    }

    async fn run(&self, args: &[&str]) -> Result<Vec<u8>, MeshError> {
        let output = self
            .runner
            .run("wg", args)
            .await
            .map_err(|e| MeshError { stderr: e.to_string() })?;

        if !output.status.success() {
            return Err(MeshError {
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(output.stdout)
    }
}

/// Parses `wg show <if> dump` output: tab-separated, first line is the
/// interface header and is skipped.
fn parse_dump(stdout: &str) -> Vec<PeerState> {
    stdout
        .lines()
        .skip(1)
        .filter_map(parse_dump_line)
        .collect()
}

fn parse_dump_line(line: &str) -> Option<PeerState> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 8 {
        return None;
    }

    let public_key = fields[0].to_string();
    let preshared_key = (fields[1] != "(none)" && !fields[1].is_empty())
        .then(|| fields[1].to_string());
    let endpoint = (!fields[2].is_empty() && fields[2] != "(none)").then(|| fields[2].to_string());
    let allowed_ips = if fields[3].is_empty() || fields[3] == "(none)" {
        Vec::new()
    } else {
        fields[3].split(',').map(str::to_string).collect()
    };
    let latest_handshake = fields[4].parse().unwrap_or(0);
    let rx_bytes = fields[5].parse().unwrap_or(0);
    let tx_bytes = fields[6].parse().unwrap_or(0);
    let keepalive = if fields[7] == "off" {
        None
    } else {
        fields[7].parse().ok()
    };

    Some(PeerState {
        public_key,
        preshared_key,
        endpoint,
        allowed_ips,
        latest_handshake,
        rx_bytes,
        tx_bytes,
        keepalive,
    })
}
