//! Entry point: parses configuration, installs signal handlers, and drives
//! the reconciliation loop (spec.md §4.K).

use std::time::{Duration, Instant};

use tracing::{info, warn, Instrument};

use jiji_daemon::command::TokioCommandRunner;
use jiji_daemon::config::Config;
use jiji_daemon::shutdown::ShutdownController;
use jiji_daemon::Daemon;

/// Above this tick duration, the loop logs a slow-tick warning (spec.md
/// §4.K step c).
const SLOW_TICK_THRESHOLD: Duration = Duration::from_secs(15);

/// Configuration is invalid or missing at startup (spec.md §7,
/// `sysexits.h`'s `EX_CONFIG`).
const EXIT_CONFIG_ERROR: i32 = 78;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {err}");
            std::process::exit(EXIT_CONFIG_ERROR);
        }
    };

    jiji_daemon::logging::init(&config.log_level);

    let server_id = config.server_id.clone();
    let loop_interval = config.loop_interval_duration();

    // Entering this span here, around everything from startup log through
    // final heartbeat, is what gets `server_id` onto every JSON line the
    // daemon emits (spec.md §6), not just the ones that set it explicitly.
    let span = tracing::info_span!("jijid", server_id = %server_id);
    async move {
        let daemon = Daemon::with_runner(config, std::sync::Arc::new(TokioCommandRunner));
        let shutdown = ShutdownController::new();
        shutdown.spawn_signal_listener()?;

        info!("jijid starting");

        run_loop(&daemon, &shutdown, loop_interval).await;

        daemon.write_heartbeat().await;
        info!("jijid shut down cleanly");
        Ok(())
    }
    .instrument(span)
    .await
}

/// Drives ticks until a termination signal sets the shutdown flag. Every
/// per-tick failure is already caught and logged inside [`Daemon::run_tick`]
/// (spec.md §7's "one tick's failure cannot terminate the daemon"), so this
/// loop itself has nothing left to propagate.
async fn run_loop(daemon: &Daemon, shutdown: &ShutdownController, loop_interval: Duration) {
    let mut iteration: u64 = 0;

    loop {
        if shutdown.is_shutting_down() {
            return;
        }

        iteration += 1;
        let tick_start = Instant::now();

        daemon.run_tick(iteration).await;

        let elapsed = tick_start.elapsed();
        if elapsed > SLOW_TICK_THRESHOLD {
            warn!(
                elapsed_secs = elapsed.as_secs_f64(),
                iteration, "slow reconciliation tick"
            );
        }

        if shutdown.is_shutting_down() {
            return;
        }

        tokio::select! {
            () = tokio::time::sleep(loop_interval) => {}
            () = shutdown.wait_until_triggered() => {}
        }
    }
}
