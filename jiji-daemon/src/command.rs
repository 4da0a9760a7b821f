//! A single injectable seam for every subprocess the daemon shells out to:
//! the store CLI (§4.B.2), `wg` (§4.C), `systemctl` (§4.J), and the
//! container engine (§4.F). A trait-based seam at each I/O boundary --
//! this is the one abstraction this crate adds beyond what §4.B through
//! §4.J literally describe, purely so the reconciler components can be
//! tested without a live system.

use async_trait::async_trait;
use std::process::Output;

/// Runs an external program and collects its output. Implementations must
/// not retry; callers are responsible for any retry policy (none is
/// defined -- see §4.B, §7).
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[&str]) -> std::io::Result<Output>;
}

/// Production implementation backed by `tokio::process::Command`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioCommandRunner;

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run(&self, program: &str, args: &[&str]) -> std::io::Result<Output> {
        tokio::process::Command::new(program)
            .args(args)
            .output()
            .await
    }
}
