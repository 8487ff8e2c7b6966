use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::MindError;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct SynapticConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub hebbian: HebbianConfig,
    pub decay: DecayConfig,
    pub augment: AugmentConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
    pub fast_enabled: bool,
    pub fast_dir: Option<String>,
    pub catalog_path: Option<String>,
    pub node_list_limit: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HebbianConfig {
    pub activation_threshold: f64,
    pub learning_rate: f64,
    pub min_weight: f64,
    pub max_weight: f64,
    pub initial_edge_weight: f64,
    pub category_edge_weight: f64,
    pub target_total_weight: f64,
    pub scaling_rate: f64,
    pub idle_threshold_secs: u64,
    pub idle_decay_rate: f64,
    pub homeostatic_interval: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DecayConfig {
    pub enabled: bool,
    pub base_rate: f64,
    pub threshold: f64,
    pub immortal_threshold: f64,
    pub sweep_interval_minutes: u64,
    pub edge_decay_enabled: bool,
    pub edge_decay_rate: f64,
    pub edge_decay_min_weight: f64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AugmentConfig {
    /// `"none"` disables concept extraction.
    pub concept_extractor: String,
    pub similarity_enabled: bool,
    pub similarity_host: String,
    pub similarity_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_synaptic_dir()
            .join("disk")
            .join("synaptic.db")
            .to_string_lossy()
            .into_owned();
        Self {
            db_path,
            fast_enabled: false,
            fast_dir: default_fast_dir(),
            catalog_path: None,
            node_list_limit: 10_000,
        }
    }
}

impl Default for HebbianConfig {
    fn default() -> Self {
        Self {
            activation_threshold: 0.3,
            learning_rate: 0.1,
            min_weight: 0.1,
            max_weight: 10.0,
            initial_edge_weight: 0.15,
            category_edge_weight: 0.1,
            target_total_weight: 50.0,
            scaling_rate: 0.3,
            idle_threshold_secs: 3600,
            idle_decay_rate: 0.02,
            homeostatic_interval: 5,
        }
    }
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_rate: 0.01,
            threshold: 0.1,
            immortal_threshold: 0.9,
            sweep_interval_minutes: 60,
            edge_decay_enabled: true,
            edge_decay_rate: 0.005,
            edge_decay_min_weight: 0.1,
        }
    }
}

impl Default for AugmentConfig {
    fn default() -> Self {
        Self {
            concept_extractor: "none".into(),
            similarity_enabled: false,
            similarity_host: "localhost".into(),
            similarity_port: 9998,
        }
    }
}

/// Returns `~/.synaptic/`
pub fn default_synaptic_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".synaptic")
}

/// Returns the default config file path: `~/.synaptic/config.toml`
pub fn default_config_path() -> PathBuf {
    default_synaptic_dir().join("config.toml")
}

/// `/dev/shm/synaptic` where a RAM-backed tmpfs is available.
fn default_fast_dir() -> Option<String> {
    if cfg!(target_os = "linux") && Path::new("/dev/shm").is_dir() {
        Some("/dev/shm/synaptic".into())
    } else {
        None
    }
}

impl SynapticConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides and validate.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            SynapticConfig::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply `SYNAPTIC_*` environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("SYNAPTIC_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("SYNAPTIC_FAST_DIR") {
            self.storage.fast_dir = Some(val);
        }
        if let Ok(val) = std::env::var("SYNAPTIC_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("SYNAPTIC_SIMILARITY_HOST") {
            self.augment.similarity_host = val;
        }
        override_bool("SYNAPTIC_FAST_ENABLED", &mut self.storage.fast_enabled);
        override_parsed("SYNAPTIC_THRESHOLD", &mut self.hebbian.activation_threshold);
        override_parsed("SYNAPTIC_MAX_WEIGHT", &mut self.hebbian.max_weight);
        override_bool("SYNAPTIC_DECAY_ENABLED", &mut self.decay.enabled);
        override_parsed("SYNAPTIC_DECAY_BASE_RATE", &mut self.decay.base_rate);
        override_parsed("SYNAPTIC_EDGE_DECAY_RATE", &mut self.decay.edge_decay_rate);
        override_bool("SYNAPTIC_SIMILARITY_ENABLED", &mut self.augment.similarity_enabled);
        override_parsed("SYNAPTIC_SIMILARITY_PORT", &mut self.augment.similarity_port);
    }

    /// Reject parameter combinations the engines cannot honor.
    pub fn validate(&self) -> Result<(), MindError> {
        let h = &self.hebbian;
        let d = &self.decay;
        let bad = |msg: String| Err(MindError::Config(msg));

        if !(h.min_weight > 0.0 && h.min_weight < h.max_weight) {
            return bad(format!(
                "hebbian.min_weight ({}) must be positive and below max_weight ({})",
                h.min_weight, h.max_weight
            ));
        }
        for (name, value) in [
            ("hebbian.learning_rate", h.learning_rate),
            ("hebbian.scaling_rate", h.scaling_rate),
            ("hebbian.idle_decay_rate", h.idle_decay_rate),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return bad(format!("{name} must be in (0, 1], got {value}"));
            }
        }
        for (name, value) in [
            ("hebbian.activation_threshold", h.activation_threshold),
            ("decay.threshold", d.threshold),
            ("decay.immortal_threshold", d.immortal_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return bad(format!("{name} must be in [0, 1], got {value}"));
            }
        }
        for (name, value) in [
            ("decay.base_rate", d.base_rate),
            ("decay.edge_decay_rate", d.edge_decay_rate),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return bad(format!("{name} must be in (0, 1], got {value}"));
            }
        }
        if !(h.min_weight..=h.max_weight).contains(&h.initial_edge_weight)
            || !(h.min_weight..=h.max_weight).contains(&h.category_edge_weight)
        {
            return bad("initial and category edge weights must lie within [min_weight, max_weight]".into());
        }
        if h.homeostatic_interval == 0 {
            return bad("hebbian.homeostatic_interval must be at least 1".into());
        }
        if d.sweep_interval_minutes == 0 {
            return bad("decay.sweep_interval_minutes must be at least 1".into());
        }
        if self.storage.node_list_limit == 0 {
            return bad("storage.node_list_limit must be at least 1".into());
        }
        Ok(())
    }

    /// Resolve the durable database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }

    /// Path of the fast mirror database, when the mirror is enabled.
    pub fn resolved_fast_path(&self) -> Option<PathBuf> {
        if !self.storage.fast_enabled {
            return None;
        }
        let dir = self.storage.fast_dir.as_deref()?;
        let file_name = self
            .resolved_db_path()
            .file_name()
            .map(|n| n.to_owned())
            .unwrap_or_else(|| "synaptic.db".into());
        Some(expand_tilde(dir).join(file_name))
    }

    /// User catalog location: configured path, else `nodes.json` beside the database.
    pub fn resolved_catalog_path(&self) -> PathBuf {
        match &self.storage.catalog_path {
            Some(p) => expand_tilde(p),
            None => self
                .resolved_db_path()
                .parent()
                .map(|dir| dir.join("nodes.json"))
                .unwrap_or_else(|| PathBuf::from("nodes.json")),
        }
    }
}

fn override_parsed<T: std::str::FromStr>(key: &str, slot: &mut T) {
    if let Ok(raw) = std::env::var(key) {
        match raw.trim().parse() {
            Ok(v) => *slot = v,
            Err(_) => warn!(key, value = %raw, "ignoring unparseable environment override"),
        }
    }
}

/// Accepts `1`/`0`/`yes`/`no`/`on`/`off` in addition to `true`/`false`.
fn override_bool(key: &str, slot: &mut bool) {
    if let Ok(raw) = std::env::var(key) {
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => *slot = true,
            "0" | "false" | "no" | "off" => *slot = false,
            _ => warn!(key, value = %raw, "ignoring unparseable environment override"),
        }
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => PathBuf::from(path),
        }
    } else {
        PathBuf::from(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SynapticConfig::default();
        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.hebbian.learning_rate, 0.1);
        assert_eq!(config.hebbian.initial_edge_weight, 0.15);
        assert_eq!(config.decay.immortal_threshold, 0.9);
        assert_eq!(config.augment.similarity_port, 9998);
        assert!(config.storage.db_path.ends_with("synaptic.db"));
        assert!(!config.storage.fast_enabled);
        config.validate().unwrap();
    }

    #[test]
    fn parse_toml_config() {
        let toml_str = r#"
[server]
log_level = "debug"

[storage]
db_path = "/tmp/test.db"
fast_enabled = true
fast_dir = "/tmp/fast"

[hebbian]
max_weight = 20.0

[decay]
sweep_interval_minutes = 5
"#;
        let config: SynapticConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.log_level, "debug");
        assert_eq!(config.storage.db_path, "/tmp/test.db");
        assert_eq!(config.hebbian.max_weight, 20.0);
        assert_eq!(config.decay.sweep_interval_minutes, 5);
        // defaults still apply for unset fields
        assert_eq!(config.hebbian.learning_rate, 0.1);
        assert_eq!(config.decay.base_rate, 0.01);
        assert_eq!(
            config.resolved_fast_path(),
            Some(PathBuf::from("/tmp/fast/test.db"))
        );
    }

    #[test]
    fn fast_path_absent_when_disabled() {
        let mut config = SynapticConfig::default();
        config.storage.fast_dir = Some("/tmp/fast".into());
        assert!(config.resolved_fast_path().is_none());
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = SynapticConfig::default();
        std::env::set_var("SYNAPTIC_DB", "/tmp/override.db");
        std::env::set_var("SYNAPTIC_THRESHOLD", "0.45");
        std::env::set_var("SYNAPTIC_DECAY_ENABLED", "0");
        std::env::set_var("SYNAPTIC_SIMILARITY_PORT", "not-a-port");

        config.apply_env_overrides();

        assert_eq!(config.storage.db_path, "/tmp/override.db");
        assert_eq!(config.hebbian.activation_threshold, 0.45);
        assert!(!config.decay.enabled);
        // unparseable value leaves the default in place
        assert_eq!(config.augment.similarity_port, 9998);

        // Clean up
        std::env::remove_var("SYNAPTIC_DB");
        std::env::remove_var("SYNAPTIC_THRESHOLD");
        std::env::remove_var("SYNAPTIC_DECAY_ENABLED");
        std::env::remove_var("SYNAPTIC_SIMILARITY_PORT");
    }

    #[test]
    fn validate_rejects_inverted_weights() {
        let mut config = SynapticConfig::default();
        config.hebbian.min_weight = 12.0;
        assert!(matches!(config.validate(), Err(MindError::Config(_))));
    }

    #[test]
    fn validate_rejects_out_of_range_rates() {
        let mut config = SynapticConfig::default();
        config.hebbian.learning_rate = 0.0;
        assert!(config.validate().is_err());

        let mut config = SynapticConfig::default();
        config.decay.immortal_threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = SynapticConfig::default();
        config.hebbian.homeostatic_interval = 0;
        assert!(config.validate().is_err());
    }
}
