//! Server configuration.

use crate::error::{ServerError, ServerResult};
use std::path::PathBuf;
use std::time::Duration;

/// Default listening port.
pub const DEFAULT_PORT: u16 = 5000;

/// Default number of concurrently executing requests.
pub const DEFAULT_WORKERS: usize = 8;

/// Default segment file count that requests a compaction.
pub const DEFAULT_COMPACTION_THRESHOLD: usize = 10;

/// Default interval between segment file counts.
pub const DEFAULT_COMPACTION_INTERVAL: Duration = Duration::from_secs(5);

/// Configuration for the request server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port the transport listens on.
    pub port: u16,
    /// Directory of data segments.
    pub log_dir: PathBuf,
    /// Directory of hint files.
    pub hint_dir: PathBuf,
    /// Maximum requests executing at once.
    pub workers: usize,
    /// Segment file count at which a compaction is requested.
    pub compaction_threshold: usize,
    /// How often the segment directory is counted.
    pub compaction_interval: Duration,
}

impl ServerConfig {
    /// Creates a configuration for the given directories.
    pub fn new(log_dir: impl Into<PathBuf>, hint_dir: impl Into<PathBuf>) -> Self {
        Self {
            port: DEFAULT_PORT,
            log_dir: log_dir.into(),
            hint_dir: hint_dir.into(),
            workers: DEFAULT_WORKERS,
            compaction_threshold: DEFAULT_COMPACTION_THRESHOLD,
            compaction_interval: DEFAULT_COMPACTION_INTERVAL,
        }
    }

    /// Reads the configuration from `CASKDB_*` environment variables.
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] if a variable is set to a value that
    /// does not parse or is out of range.
    pub fn from_env() -> ServerResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Same as [`ServerConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> ServerResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(port) = lookup("CASKDB_PORT") {
            config.port = parse_var("CASKDB_PORT", &port)?;
        }
        if let Some(dir) = lookup("CASKDB_LOG_DIR") {
            config.log_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("CASKDB_HINT_DIR") {
            config.hint_dir = PathBuf::from(dir);
        }
        if let Some(workers) = lookup("CASKDB_WORKERS") {
            config.workers = parse_var("CASKDB_WORKERS", &workers)?;
        }
        if let Some(threshold) = lookup("CASKDB_COMPACTION_THRESHOLD") {
            config.compaction_threshold = parse_var("CASKDB_COMPACTION_THRESHOLD", &threshold)?;
        }
        if let Some(ms) = lookup("CASKDB_COMPACTION_INTERVAL_MS") {
            let ms: u64 = parse_var("CASKDB_COMPACTION_INTERVAL_MS", &ms)?;
            config.compaction_interval = Duration::from_millis(ms);
        }

        config.validate()?;
        Ok(config)
    }

    /// Sets the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the number of workers.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Sets the compaction threshold.
    pub fn with_compaction_threshold(mut self, threshold: usize) -> Self {
        self.compaction_threshold = threshold;
        self
    }

    /// Sets the compaction poll interval.
    pub fn with_compaction_interval(mut self, interval: Duration) -> Self {
        self.compaction_interval = interval;
        self
    }

    /// Checks the values are usable.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] for zero workers, a zero threshold or
    /// a zero interval.
    pub fn validate(&self) -> ServerResult<()> {
        if self.workers == 0 {
            return Err(ServerError::Config("workers must be at least 1".into()));
        }
        if self.compaction_threshold == 0 {
            return Err(ServerError::Config(
                "compaction threshold must be at least 1".into(),
            ));
        }
        if self.compaction_interval.is_zero() {
            return Err(ServerError::Config(
                "compaction interval must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new("logs", "hints")
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> ServerResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ServerError::Config(format!("{name}: cannot parse {value:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 5000);
        assert_eq!(config.workers, 8);
        assert_eq!(config.compaction_threshold, 10);
        assert_eq!(config.compaction_interval, Duration::from_secs(5));
        assert_eq!(config.log_dir, PathBuf::from("logs"));
    }

    #[test]
    fn config_builder() {
        let config = ServerConfig::new("/data/logs", "/data/hints")
            .with_port(6000)
            .with_workers(2)
            .with_compaction_threshold(4)
            .with_compaction_interval(Duration::from_millis(250));

        assert_eq!(config.port, 6000);
        assert_eq!(config.workers, 2);
        assert_eq!(config.compaction_threshold, 4);
        assert_eq!(config.hint_dir, PathBuf::from("/data/hints"));
    }

    #[test]
    fn lookup_overrides_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("CASKDB_PORT", "7001"),
            ("CASKDB_LOG_DIR", "/var/cask/logs"),
            ("CASKDB_COMPACTION_INTERVAL_MS", "1500"),
        ]))
        .unwrap();

        assert_eq!(config.port, 7001);
        assert_eq!(config.log_dir, PathBuf::from("/var/cask/logs"));
        assert_eq!(config.hint_dir, PathBuf::from("hints"));
        assert_eq!(config.compaction_interval, Duration::from_millis(1500));
    }

    #[test]
    fn bad_values_rejected() {
        let err = ServerConfig::from_lookup(lookup(&[("CASKDB_PORT", "http")])).unwrap_err();
        assert!(matches!(err, ServerError::Config(msg) if msg.contains("CASKDB_PORT")));

        let err = ServerConfig::from_lookup(lookup(&[("CASKDB_WORKERS", "0")])).unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
    }
}
