//! Configuration (C8, ADDED): layered load of engine paths, pool sizing,
//! timeouts, and the stall probability table from a TOML file, with
//! environment-variable overrides for the values operators most often
//! need to tweak per-host (engine binary paths). Shaped after the
//! teacher's own reliance on a single typed config struct per concern
//! (`EngineConfig`, `RecommendedSettings` in `engine/config.rs`) rather
//! than scattered ad-hoc lookups.

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::stall::StallProbabilityTable;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    pub bot1_engine_path: PathBuf,
    pub partner_engine_path: PathBuf,
    pub bot2_engine_path: PathBuf,

    #[serde(default = "default_pool_capacity")]
    pub pool_capacity: usize,
    #[serde(default = "default_warm_floor")]
    pub warm_floor: usize,
    #[serde(default = "default_reaper_interval_secs")]
    pub reaper_interval_secs: u64,
    #[serde(default = "default_idle_threshold_secs")]
    pub idle_threshold_secs: u64,

    #[serde(default = "default_init_timeout_ms")]
    pub uci_init_timeout_ms: u64,
    #[serde(default = "default_stop_timeout_ms")]
    pub uci_stop_timeout_ms: u64,

    #[serde(default)]
    pub variant_dir: Option<PathBuf>,

    #[serde(default)]
    pub stall_probability_overrides: StallProbabilityTable,

    #[serde(default = "default_stall_bias")]
    pub stall_bias_strategy: StallBiasStrategy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StallBiasStrategy {
    RoyalPiece,
    HighValue,
    Proximity,
}

fn default_pool_capacity() -> usize {
    6
}
fn default_warm_floor() -> usize {
    3
}
fn default_reaper_interval_secs() -> u64 {
    30
}
fn default_idle_threshold_secs() -> u64 {
    120
}
fn default_init_timeout_ms() -> u64 {
    10_000
}
fn default_stop_timeout_ms() -> u64 {
    8_000
}
fn default_stall_bias() -> StallBiasStrategy {
    StallBiasStrategy::Proximity
}

impl OrchestratorConfig {
    /// Load from a TOML file, then apply `BUGHOUSE_<FIELD>` environment
    /// overrides for the three engine paths — the values most likely to
    /// differ between a developer's machine and CI.
    pub fn load(path: &Path) -> OrchestratorResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| OrchestratorError::InvalidConfig(format!(
            "reading {}: {e}",
            path.display()
        )))?;
        let mut config: OrchestratorConfig = toml::from_str(&text)
            .map_err(|e| OrchestratorError::InvalidConfig(format!("parsing {}: {e}", path.display())))?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(p) = std::env::var("BUGHOUSE_BOT1_ENGINE_PATH") {
            self.bot1_engine_path = PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("BUGHOUSE_PARTNER_ENGINE_PATH") {
            self.partner_engine_path = PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("BUGHOUSE_BOT2_ENGINE_PATH") {
            self.bot2_engine_path = PathBuf::from(p);
        }
    }

    pub fn init_timeout(&self) -> Duration {
        Duration::from_millis(self.uci_init_timeout_ms)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.uci_stop_timeout_ms)
    }

    pub fn reaper_interval(&self) -> Duration {
        Duration::from_secs(self.reaper_interval_secs)
    }

    pub fn idle_threshold(&self) -> Duration {
        Duration::from_secs(self.idle_threshold_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_toml() {
        let toml_text = r#"
            bot1_engine_path = "/usr/bin/stockfish"
            partner_engine_path = "/usr/bin/stockfish"
            bot2_engine_path = "/usr/bin/stockfish"
        "#;
        let config: OrchestratorConfig = toml::from_str(toml_text).unwrap();
        assert_eq!(config.pool_capacity, 6);
        assert_eq!(config.warm_floor, 3);
        assert_eq!(config.stall_bias_strategy, StallBiasStrategy::Proximity);
    }

    #[test]
    fn overrides_take_precedence() {
        std::env::set_var("BUGHOUSE_BOT1_ENGINE_PATH", "/opt/engines/bot1");
        let toml_text = r#"
            bot1_engine_path = "/usr/bin/stockfish"
            partner_engine_path = "/usr/bin/stockfish"
            bot2_engine_path = "/usr/bin/stockfish"
        "#;
        let mut config: OrchestratorConfig = toml::from_str(toml_text).unwrap();
        config.apply_env_overrides();
        assert_eq!(config.bot1_engine_path, PathBuf::from("/opt/engines/bot1"));
        std::env::remove_var("BUGHOUSE_BOT1_ENGINE_PATH");
    }
}
