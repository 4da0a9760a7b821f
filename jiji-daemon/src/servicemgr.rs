//! `systemctl` wrapper for the store's self-check (spec.md §4.J).

use std::sync::Arc;

use crate::command::CommandRunner;

#[derive(Clone)]
pub struct ServiceManager {
    runner: Arc<dyn CommandRunner>,
    unit: String,
}

impl ServiceManager {
    #[must_use]
    pub fn new(runner: Arc<dyn CommandRunner>, unit: impl Into<String>) -> Self {
        Self {
            runner,
            unit: unit.into(),
        }
    }

    /// `systemctl is-active --quiet <unit>`; exit code 0 means active.
    pub async fn is_active(&self) -> bool {
        matches!(
            self.runner.run("systemctl", &["is-active", "--quiet", &self.unit]).await,
            Ok(output) if output.status.success()
        )
    }

    /// `systemctl restart <unit>`. Returns whether the command itself
    /// exited successfully; the caller is responsible for waiting out any
    /// settle deadline before re-checking [`Self::is_active`].
    pub async fn restart(&self) -> bool {
        matches!(
            self.runner.run("systemctl", &["restart", &self.unit]).await,
            Ok(output) if output.status.success()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::fake::FakeCommandRunner;

    #[tokio::test]
    async fn is_active_true_on_success_exit() {
        let fake = Arc::new(FakeCommandRunner::new());
        fake.expect("systemctl", &["is-active", "--quiet", "corrosion"], "");
        let mgr = ServiceManager::new(fake, "corrosion");
        assert!(mgr.is_active().await);
    }

    #[tokio::test]
    async fn is_active_false_on_failure_exit() {
        let fake = Arc::new(FakeCommandRunner::new());
        fake.expect_failure("systemctl", &["is-active", "--quiet", "corrosion"], "", 3);
        let mgr = ServiceManager::new(fake, "corrosion");
        assert!(!mgr.is_active().await);
    }

    #[tokio::test]
    async fn restart_true_on_success_exit() {
        let fake = Arc::new(FakeCommandRunner::new());
        fake.expect("systemctl", &["restart", "corrosion"], "");
        let mgr = ServiceManager::new(fake, "corrosion");
        assert!(mgr.restart().await);
    }
}
