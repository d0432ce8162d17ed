//! Configuration for the benchmark

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{BenchError, BenchResult};

/// Main benchmark configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    /// Number of attempts
    pub runs: usize,

    /// Percentage of samples trimmed from the series (split between both ends)
    pub trim_percent: f64,

    /// Sampling cadence (milliseconds)
    pub tick_interval_ms: u64,

    /// Stop at the first attempt that cannot be sampled
    pub fail_fast: bool,

    /// Stop when the post-run command exits non-zero
    pub post_fail_fast: bool,

    /// Capture the environment of the watched process
    pub capture_environ: bool,

    /// Keep per-run statistics in the report
    pub details: bool,

    /// Write the JSON report
    pub json: bool,

    /// Write the spreadsheet
    pub sheet: bool,

    /// Append to the spreadsheet of the day instead of starting a new one
    pub append: bool,

    /// Root of the output tree
    pub output_dir: PathBuf,

    /// Consecutive failed observations tolerated before a run is abandoned (0 = unlimited)
    pub max_consecutive_errors: u32,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            runs: 1,
            trim_percent: 10.0,
            tick_interval_ms: 200,
            fail_fast: false,
            post_fail_fast: false,
            capture_environ: false,
            details: false,
            json: false,
            sheet: false,
            append: false,
            output_dir: PathBuf::from("."),
            max_consecutive_errors: 0,
        }
    }
}

impl BenchConfig {
    /// Load config from TOML file
    pub fn load(path: &Path) -> BenchResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| BenchError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load `path` if given, else the default location when it exists
    pub fn load_or_default(path: Option<&Path>) -> BenchResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => match Self::default_path() {
                Some(path) if path.is_file() => Self::load(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Save config to TOML file
    pub fn save(&self, path: &Path) -> BenchResult<()> {
        let content = self.to_toml()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn to_toml(&self) -> BenchResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// `<config dir>/benchmarkish/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("benchmarkish").join("config.toml"))
    }

    pub fn validate(&self) -> BenchResult<()> {
        if self.runs == 0 {
            return Err(BenchError::InvalidConfig("runs must be at least 1".into()));
        }
        if self.tick_interval_ms == 0 {
            return Err(BenchError::InvalidConfig("tick_interval_ms must be at least 1".into()));
        }
        if !(-100.0..=100.0).contains(&self.trim_percent) {
            return Err(BenchError::InvalidConfig(format!(
                "trim_percent must be within -100..=100, got {}",
                self.trim_percent
            )));
        }
        Ok(())
    }

    /// Trim as a fraction of the series
    pub fn trim_fraction(&self) -> f64 {
        self.trim_percent / 100.0
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = BenchConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.trim_fraction() - 0.1).abs() < 1e-12);
        assert_eq!(config.tick(), Duration::from_millis(200));
    }

    #[test]
    fn test_validation() {
        let mut config = BenchConfig::default();
        config.runs = 0;
        assert!(matches!(config.validate(), Err(BenchError::InvalidConfig(_))));

        let mut config = BenchConfig::default();
        config.tick_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = BenchConfig::default();
        config.trim_percent = 150.0;
        assert!(config.validate().is_err());
        config.trim_percent = -20.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = BenchConfig {
            runs: 5,
            trim_percent: 20.0,
            details: true,
            output_dir: PathBuf::from("/tmp/bench"),
            ..BenchConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(BenchConfig::load(&path).unwrap(), config);
        assert_eq!(BenchConfig::load_or_default(Some(&path)).unwrap(), config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "runs = 3\njson = true\n").unwrap();

        let config = BenchConfig::load(&path).unwrap();
        assert_eq!(config.runs, 3);
        assert!(config.json);
        assert_eq!(config.tick_interval_ms, 200);
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(matches!(BenchConfig::load(&missing), Err(BenchError::ConfigRead { .. })));

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "runs = \"many\"").unwrap();
        assert!(matches!(BenchConfig::load(&bad), Err(BenchError::ConfigParse(_))));
    }
}
