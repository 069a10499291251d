//! Configuration loading for the experiment runner.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::simulation::mac::MacConfig;
use crate::simulation::node::DEFAULT_MESSAGE_LENGTH;
use crate::simulation::types::Tick;

/// Parameters of a period sweep, read from `config.toml` next to the scene.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ExperimentConfig {
    /// Seed of the first run; every following run uses the next value.
    pub seed: u64,
    /// Simulated ticks per run.
    pub simulation_length: Tick,
    pub period_min: f64,
    pub period_max: f64,
    pub period_step: f64,
    pub runs_per_period: u32,
    /// Write one status trace file per run.
    pub trace: bool,
    pub output_dir: PathBuf,
    pub message_length: u32,
    /// Per-source maximum for sources that do not set their own.
    pub max_messages: u64,
    pub mac: MacConfig,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            seed: 1,
            simulation_length: 100_000,
            period_min: 1000.0,
            period_max: 5000.0,
            period_step: 1000.0,
            runs_per_period: 1,
            trace: false,
            output_dir: PathBuf::from("output"),
            message_length: DEFAULT_MESSAGE_LENGTH,
            max_messages: 100,
            mac: MacConfig::default(),
        }
    }
}

impl ExperimentConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Arguments
    /// * `config_path` - Path to the config.toml file
    ///
    /// # Returns
    /// * `Ok(ExperimentConfig)` if the file was successfully loaded, parsed and validated
    /// * `Err(String)` with a descriptive error message otherwise
    pub fn load(config_path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(config_path).map_err(|e| format!("Failed to read config file: {}", e))?;

        Self::parse(&content)
    }

    /// Like [`load`](Self::load), but a missing file yields the defaults.
    pub fn load_or_default(config_path: &Path) -> Result<Self, String> {
        if !config_path.exists() {
            log::info!("No config file at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }
        Self::load(config_path)
    }

    pub fn parse(content: &str) -> Result<Self, String> {
        let config: Self = toml::from_str(content).map_err(|e| format!("Failed to parse config file: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Derive the config path from a scene file path.
    ///
    /// Replaces the scene filename with "config.toml" in the same directory.
    pub fn config_path_from_scene(scene_path: &str) -> PathBuf {
        let scene = Path::new(scene_path);
        scene.parent().unwrap_or(Path::new(".")).join("config.toml")
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(self.period_min.is_finite() && self.period_min >= 0.0) {
            return Err(format!("period-min must be non-negative, got {}", self.period_min));
        }
        if !(self.period_step.is_finite() && self.period_step > 0.0) {
            return Err(format!("period-step must be positive, got {}", self.period_step));
        }
        if !self.period_max.is_finite() || self.period_max < self.period_min {
            return Err(format!("period-max ({}) must not be below period-min ({})", self.period_max, self.period_min));
        }
        if self.runs_per_period == 0 {
            return Err("runs-per-period must be at least 1".to_string());
        }
        self.mac.validate()
    }

    /// Traffic periods visited by the sweep, from `period-min` up to and
    /// including `period-max`.
    pub fn periods(&self) -> Vec<f64> {
        let mut periods = Vec::new();
        let mut index = 0u32;
        loop {
            let period = self.period_min + self.period_step * index as f64;
            if period > self.period_max + f64::EPSILON * self.period_max.abs().max(1.0) {
                break;
            }
            periods.push(period);
            index += 1;
        }
        periods
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = ExperimentConfig::parse("").unwrap();
        assert_eq!(config.seed, 1);
        assert_eq!(config.mac, MacConfig::default());
        assert_eq!(config.periods(), vec![1000.0, 2000.0, 3000.0, 4000.0, 5000.0]);
    }

    #[test]
    fn kebab_case_keys_and_mac_table() {
        let config = ExperimentConfig::parse(
            r#"
            seed = 42
            simulation-length = 5000
            period-min = 100
            period-max = 300
            period-step = 100
            runs-per-period = 3
            trace = true
            output-dir = "results"

            [mac]
            slot = 20
            cw-max = 256
            "#,
        )
        .unwrap();
        assert_eq!(config.seed, 42);
        assert_eq!(config.simulation_length, 5000);
        assert_eq!(config.runs_per_period, 3);
        assert_eq!(config.output_dir, PathBuf::from("results"));
        assert_eq!(config.mac.slot, 20);
        assert_eq!(config.mac.sifs, 10);
        assert_eq!(config.mac.cw_max, 256);
        assert_eq!(config.periods(), vec![100.0, 200.0, 300.0]);
    }

    #[test]
    fn rejects_inverted_period_range() {
        assert!(ExperimentConfig::parse("period-min = 10\nperiod-max = 5").is_err());
        assert!(ExperimentConfig::parse("period-step = 0").is_err());
    }

    #[test]
    fn config_sits_next_to_the_scene() {
        assert_eq!(ExperimentConfig::config_path_from_scene("scenes/grid.json"), PathBuf::from("scenes/config.toml"));
        assert_eq!(ExperimentConfig::config_path_from_scene("grid.json"), PathBuf::from("config.toml"));
    }
}
