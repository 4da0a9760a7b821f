//! The replicated store's entity model (spec.md §3).
//!
//! These are plain value types joined by public key / ID at query time --
//! never by pointer, matching the "cyclic references between peers and
//! servers" design note. All persistence lives in the store; these
//! structs are just typed views over its rows.

use serde::{Deserialize, Serialize};

/// A server row, keyed by a cluster-unique ID.
///
/// Created by external provisioning, destroyed by operators. Mutated only
/// by the owning daemon, and only for `last_seen` and `endpoints`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerRecord {
    pub id: String,
    /// Base64, 44 characters including `=` padding.
    pub public_key: String,
    /// CIDR block assigned to this server's containers.
    pub subnet: String,
    /// Management address, an IPv6 address in the private range.
    pub management_ip: String,
    /// Ordered list of public UDP endpoints, most-preferred first.
    pub endpoints: Vec<String>,
    /// Milliseconds since epoch.
    pub last_seen: i64,
    pub hostname: Option<String>,
}

impl ServerRecord {
    /// The `allowed-ips` value mandated by invariant 1: the server's
    /// subnet plus its management address as a /128 (IPv4) or /32 host
    /// route, joined the way `wg`'s `allowed-ips` argument expects.
    #[must_use]
    pub fn allowed_ips(&self) -> String {
        let mgmt_suffix = if self.management_ip.contains(':') {
            "/128"
        } else {
            "/32"
        };
        format!("{},{}{}", self.subnet, self.management_ip, mgmt_suffix)
    }

    /// The endpoint to dial first, if any are known.
    #[must_use]
    pub fn first_endpoint(&self) -> Option<&str> {
        self.endpoints.first().map(String::as_str)
    }
}

/// Health classification for a container, per the hysteresis state
/// machine in spec.md §4.F.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    /// Parses the store's `health_status` column, which may be empty
    /// (a container that has never been probed).
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "healthy" => Some(Self::Healthy),
            "degraded" => Some(Self::Degraded),
            "unhealthy" => Some(Self::Unhealthy),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Unhealthy => "unhealthy",
        }
    }
}

/// A container row, keyed by an opaque container ID (12 or 64 hex chars).
///
/// Created by the deployment CLI, mutated by the owning server's daemon
/// for health fields, destroyed either by the owner after stop or by any
/// daemon during garbage collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerRecord {
    pub id: String,
    /// Private IP on the mesh.
    pub private_ip: String,
    pub server_id: String,
    pub service: String,
    /// 0 or null means "no health port configured".
    pub health_port: Option<u16>,
    pub health_status: Option<HealthStatus>,
    pub consecutive_failures: u32,
    /// Milliseconds since epoch; `None` if never checked.
    pub last_health_check: Option<i64>,
    /// Milliseconds since epoch.
    pub started_at: i64,
}

/// The outcome of one probe cycle for a single container (spec.md §4.F).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthTransition {
    pub new_status: HealthStatus,
    pub new_failures: u32,
}

impl HealthTransition {
    /// Applies the hysteresis rules to a prior (status, failures) pair and
    /// a single probe outcome.
    ///
    /// `running` is the process-liveness probe result; `port_probe` is
    /// `None` when no health port is configured, otherwise `Some(true)`
    /// for a successful TCP connect and `Some(false)` for a failed one.
    #[must_use]
    pub fn compute(
        prev_failures: u32,
        running: bool,
        port_probe: Option<bool>,
    ) -> Self {
        if !running {
            return Self {
                new_status: HealthStatus::Unhealthy,
                new_failures: prev_failures + 1,
            };
        }

        match port_probe {
            None => Self {
                new_status: HealthStatus::Healthy,
                new_failures: 0,
            },
            Some(true) => Self {
                new_status: HealthStatus::Healthy,
                new_failures: 0,
            },
            Some(false) => {
                let failures = prev_failures + 1;
                let status = if failures >= 3 {
                    HealthStatus::Unhealthy
                } else {
                    HealthStatus::Degraded
                };
                Self {
                    new_status: status,
                    new_failures: failures,
                }
            }
        }
    }

    /// Whether this transition differs from the prior recorded state and
    /// therefore needs to be written back.
    #[must_use]
    pub fn changed(self, prev_status: Option<HealthStatus>, prev_failures: u32) -> bool {
        Some(self.new_status) != prev_status || self.new_failures != prev_failures
    }
}

/// In-memory, derived view of one WireGuard peer (spec.md §3). Rebuilt
/// every tick from the mesh control plane; owned by the reconciliation
/// loop for the lifetime of one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct PeerState {
    pub public_key: String,
    pub preshared_key: Option<String>,
    pub endpoint: Option<String>,
    pub allowed_ips: Vec<String>,
    /// Seconds since epoch; 0 means "never handshaked".
    pub latest_handshake: u64,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub keepalive: Option<u32>,
}

impl PeerState {
    /// `true` if this peer has never completed a handshake -- the only
    /// state the peer monitor (§4.E) treats as "not down".
    #[must_use]
    pub fn never_connected(&self) -> bool {
        self.latest_handshake == 0
    }
}
