//! `jiji` reconciliation daemon -- the per-node CORE described in
//! `spec.md`: converges the local WireGuard peer set, container health
//! state, this server's heartbeat and public endpoints, and cluster-wide
//! hygiene against a replicated, eventually-consistent CRDT store.
//!
//! This crate is a library plus a thin `bin/jijid.rs` entry point: [`Daemon`]
//! and its reconciler submodules are fully unit-testable without a live
//! mesh, store, or container engine, using the [`command::CommandRunner`]
//! seam.

pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod mesh;
pub mod reconcile;
pub mod servicemgr;
pub mod shutdown;
pub mod splitbrain;
pub mod store;

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use jiji_core::quote_sql_literal;
use tracing::{info, warn};

use command::{CommandRunner, TokioCommandRunner};
use config::Config;
use engine::ContainerEngine;
use mesh::MeshControl;
use servicemgr::ServiceManager;
use splitbrain::SplitBrainFlag;
use store::{StoreClient, StoreReader, TransactionalWriter};

/// Every subsystem a reconciliation tick touches, wired from [`Config`].
///
/// Owns no mutable state beyond the split-brain flag (spec.md §5: it is
/// the only process-wide shared resource, and the loop being
/// single-threaded means it needs no lock).
pub struct Daemon {
    config: Config,
    store: StoreClient,
    mesh: MeshControl,
    engine: ContainerEngine,
    servicemgr: ServiceManager,
    http: reqwest::Client,
    split_brain: SplitBrainFlag,
}

impl Daemon {
    /// Builds a daemon wired to real subprocesses and the real store.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let runner: Arc<dyn CommandRunner> = Arc::new(TokioCommandRunner);
        Self::with_runner(config, runner)
    }

    /// Builds a daemon over an injected [`CommandRunner`], the seam every
    /// component test in this crate uses to avoid shelling out to a real
    /// `wg`/`corrosion`/`systemctl`/container-engine binary.
    #[must_use]
    pub fn with_runner(config: Config, runner: Arc<dyn CommandRunner>) -> Self {
        let store = StoreClient::new(
            TransactionalWriter::new(config.corrosion_api.clone()),
            StoreReader::new(
                Arc::clone(&runner),
                config.corrosion_bin(),
                config.corrosion_config(),
            ),
        );
        let mesh = MeshControl::new(Arc::clone(&runner), config.interface.clone());
        let engine = ContainerEngine::new(Arc::clone(&runner), config.engine.clone());
        let servicemgr = ServiceManager::new(runner, config.systemd_unit.clone());

        Self {
            config,
            store,
            mesh,
            engine,
            servicemgr,
            http: reqwest::Client::new(),
            split_brain: SplitBrainFlag::new(),
        }
    }

    #[must_use]
    pub fn server_id(&self) -> &str {
        &self.config.server_id
    }

    #[must_use]
    pub fn loop_interval(&self) -> std::time::Duration {
        self.config.loop_interval_duration()
    }

    /// Writes this server's heartbeat (invariant 6: at the start of every
    /// tick and on clean shutdown).
    pub async fn write_heartbeat(&self) {
        let sql = format!(
            "UPDATE servers SET last_seen = {} WHERE id = '{}'",
            now_millis(),
            quote_sql_literal(&self.config.server_id)
        );
        if let Err(err) = self.store.writer.execute_one(sql).await {
            warn!(error = %err, "failed to write heartbeat");
        }
    }

    /// Runs one full reconciliation tick (spec.md §4.K step 3b): the
    /// per-tick steps that run every iteration, plus the coarser-cadence
    /// steps gated on `iteration`. Every step catches and logs its own
    /// errors internally, matching §7's "one tick's failure cannot
    /// terminate the daemon" propagation policy -- there is nothing left
    /// here that can itself fail and abort the tick.
    pub async fn run_tick(&self, iteration: u64) {
        self.write_heartbeat().await;
        reconcile::peers::reconcile_peers(&self.store, &self.mesh, &self.config.server_id).await;
        reconcile::monitor::monitor_peers(&self.store, &self.mesh).await;
        reconcile::health::sync_container_health(&self.store, &self.engine, &self.config.server_id)
            .await;

        if iteration % 10 == 0 {
            reconcile::gc::collect_garbage(
                &self.store,
                &self.split_brain,
                &self.config.server_id,
                now_millis(),
            )
            .await;
        }

        if iteration % 20 == 0 {
            reconcile::ipdiscovery::discover_public_endpoint(
                &self.store,
                &self.http,
                &self.config.server_id,
                self.config.wg_port,
            )
            .await;
            reconcile::selfcheck::self_check(
                &self.store,
                &self.servicemgr,
                &self.config.server_id,
                now_millis(),
            )
            .await;
            reconcile::partition::detect_partition(&self.store, &self.split_brain, now_millis())
                .await;
        }

        if iteration % 100 == 0 {
            info!(iteration, "reconciliation milestone");
        }
    }
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as i64)
}
