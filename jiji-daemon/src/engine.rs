//! Container engine liveness probe (spec.md §4.F), backed by either
//! `docker` or `podman` -- both accept the same `ps -q --filter id=...`
//! invocation, so a single wrapper serves both.

use std::sync::Arc;

use crate::command::CommandRunner;

#[derive(Clone)]
pub struct ContainerEngine {
    runner: Arc<dyn CommandRunner>,
    binary: String,
}

impl ContainerEngine {
    #[must_use]
    pub fn new(runner: Arc<dyn CommandRunner>, binary: impl Into<String>) -> Self {
        Self {
            runner,
            binary: binary.into(),
        }
    }

    /// Whether a container with the given ID is currently running.
    ///
    /// A probe failure (the engine binary itself could not be spawned) is
    /// treated as "not running" -- the hysteresis machine then folds it
    /// into the normal failure count rather than aborting the tick.
    pub async fn is_running(&self, container_id: &str) -> bool {
        let filter = format!("id={container_id}");
        match self
            .runner
            .run(&self.binary, &["ps", "-q", "--filter", &filter])
            .await
        {
            Ok(output) => output.status.success() && !output.stdout.is_empty(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::fake::FakeCommandRunner;

    #[tokio::test]
    async fn running_container_yields_nonempty_stdout() {
        let fake = Arc::new(FakeCommandRunner::new());
        fake.expect(
            "docker",
            &["ps", "-q", "--filter", "id=abc123"],
            "abc123\n",
        );
        let engine = ContainerEngine::new(fake, "docker");
        assert!(engine.is_running("abc123").await);
    }

    #[tokio::test]
    async fn stopped_container_yields_empty_stdout() {
        let fake = Arc::new(FakeCommandRunner::new());
        fake.expect("docker", &["ps", "-q", "--filter", "id=abc123"], "");
        let engine = ContainerEngine::new(fake, "docker");
        assert!(!engine.is_running("abc123").await);
    }

    #[tokio::test]
    async fn spawn_failure_is_treated_as_not_running() {
        let fake = Arc::new(FakeCommandRunner::new());
        let engine = ContainerEngine::new(fake, "docker");
        assert!(!engine.is_running("missing-canned-response").await);
    }
}
