//! The store's query surface (spec.md §4.B.2): the store's own CLI
//! binary, invoked once per query with no retry.

use std::sync::Arc;

use tracing::error;

use crate::command::CommandRunner;

/// Invokes `{bin} query --config {config} <SQL>` and parses its
/// pipe-delimited, one-row-per-line stdout.
#[derive(Clone)]
pub struct StoreReader {
    runner: Arc<dyn CommandRunner>,
    bin: String,
    config: String,
}

impl StoreReader {
    #[must_use]
    pub fn new(runner: Arc<dyn CommandRunner>, bin: impl Into<String>, config: impl Into<String>) -> Self {
        Self {
            runner,
            bin: bin.into(),
            config: config.into(),
        }
    }

    /// Runs `sql` and returns one `Vec<String>` per output row. On any
    /// failure (spawn error or non-zero exit), logs at error level and
    /// returns an empty sequence -- reads never abort the tick.
    pub async fn query(&self, sql: &str) -> Vec<Vec<String>> {
        let output = match self
            .runner
            .run(&self.bin, &["query", "--config", &self.config, sql])
            .await
        {
            Ok(output) => output,
            Err(err) => {
                error!(error = %err, "store query process failed to spawn");
                return Vec::new();
            }
        };

        if !output.status.success() {
            error!(
                status = output.status.code().unwrap_or(-1),
                stderr = %String::from_utf8_lossy(&output.stderr),
                "store query exited non-zero"
            );
            return Vec::new();
        }

        parse_rows(&output.stdout)
    }

    /// Runs `sql` and returns the first cell of the first row, if any.
    pub async fn query_scalar(&self, sql: &str) -> Option<String> {
        self.query(sql)
            .await
            .into_iter()
            .next()
            .and_then(|row| row.into_iter().next())
    }
}

fn parse_rows(stdout: &[u8]) -> Vec<Vec<String>> {
    let text = String::from_utf8_lossy(stdout);
    text.lines()
        .filter(|line| !line.is_empty())
        .map(|line| line.split('|').map(str::to_string).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::fake::FakeCommandRunner;

    #[test]
    fn parse_rows_empty_stdout_yields_empty_sequence() {
        assert_eq!(parse_rows(b""), Vec::<Vec<String>>::new());
    }

    #[test]
    fn parse_rows_splits_pipe_delimited_columns() {
        let stdout = b"a|b|c\nd|e|f\n";
        assert_eq!(
            parse_rows(stdout),
            vec![
                vec!["a".to_string(), "b".to_string(), "c".to_string()],
                vec!["d".to_string(), "e".to_string(), "f".to_string()],
            ]
        );
    }

    #[tokio::test]
    async fn query_returns_empty_on_spawn_failure() {
        let fake = Arc::new(FakeCommandRunner::new());
        let reader = StoreReader::new(fake, "corrosion", "/opt/x/config.toml");
        let rows = reader.query("SELECT 1").await;
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn query_returns_empty_on_non_zero_exit() {
        let fake = Arc::new(FakeCommandRunner::new());
        fake.expect_failure(
            "corrosion",
            &["query", "--config", "/opt/x/config.toml", "SELECT 1"],
            "boom",
            1,
        );
        let reader = StoreReader::new(fake, "corrosion", "/opt/x/config.toml");
        assert!(reader.query("SELECT 1").await.is_empty());
    }

    #[tokio::test]
    async fn query_parses_rows_on_success() {
        let fake = Arc::new(FakeCommandRunner::new());
        fake.expect(
            "corrosion",
            &["query", "--config", "/opt/x/config.toml", "SELECT id FROM servers"],
            "srv-a\nsrv-b\n",
        );
        let reader = StoreReader::new(fake, "corrosion", "/opt/x/config.toml");
        let rows = reader.query("SELECT id FROM servers").await;
        assert_eq!(rows, vec![vec!["srv-a".to_string()], vec!["srv-b".to_string()]]);
    }

    #[tokio::test]
    async fn query_scalar_returns_first_cell() {
        let fake = Arc::new(FakeCommandRunner::new());
        fake.expect(
            "corrosion",
            &["query", "--config", "/opt/x/config.toml", "SELECT 1"],
            "1\n",
        );
        let reader = StoreReader::new(fake, "corrosion", "/opt/x/config.toml");
        assert_eq!(reader.query_scalar("SELECT 1").await, Some("1".to_string()));
    }

    #[tokio::test]
    async fn query_scalar_none_when_no_rows() {
        let fake = Arc::new(FakeCommandRunner::new());
        fake.expect(
            "corrosion",
            &["query", "--config", "/opt/x/config.toml", "SELECT 1"],
            "",
        );
        let reader = StoreReader::new(fake, "corrosion", "/opt/x/config.toml");
        assert_eq!(reader.query_scalar("SELECT 1").await, None);
    }
}
