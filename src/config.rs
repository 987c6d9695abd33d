// Configuration module for reading Capture.toml
// Every behavioural threshold of both policies is tunable from here

use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Main configuration structure containing all tunable parameters
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub attacker: AttackerConfig,
    pub defender: DefenderConfig,
    pub match_rules: MatchRulesConfig,
    pub debug: DebugConfig,
}

/// Attacker thresholds
#[derive(Debug, Deserialize, Clone)]
pub struct AttackerConfig {
    /// Enemies closer than this trigger fleeing and route penalties
    pub flee_distance: u32,
    pub enemy_close_cost: u32,
    /// Return home once more than this many pellets were eaten
    pub food_eaten_to_return: u32,
    /// Kept below the real power-up duration to avoid being careless
    pub capsule_effect_duration: u32,
    /// Maximum gap in turns between flee episodes counted as a cluster
    pub flee_cluster_turns: u32,
    /// Number of consecutive short gaps that make a cluster
    pub flee_cluster_gaps: u32,
    pub forced_flee_turns: u32,
    pub opening_candidates: usize,
}

/// Defender thresholds
#[derive(Debug, Deserialize, Clone)]
pub struct DefenderConfig {
    pub enemy_field_cost: u32,
    pub capsule_effect_duration: u32,
}

/// Match-level settings
#[derive(Debug, Deserialize, Clone, Default)]
pub struct MatchRulesConfig {
    /// Fixed seed for tie-breaking; OS entropy when absent
    #[serde(default)]
    pub rng_seed: Option<u64>,
}

/// Debug configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DebugConfig {
    pub enabled: bool,
    pub log_file_path: String,
}

impl Config {
    /// Loads configuration from a TOML file
    ///
    /// # Arguments
    /// * `path` - Path to the Capture.toml configuration file
    ///
    /// # Returns
    /// * `Result<Config, String>` - Parsed configuration or error message
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let contents = fs::read_to_string(path.as_ref())
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, String> {
        toml::from_str(contents).map_err(|e| format!("Failed to parse config file: {}", e))
    }

    /// Loads default configuration from Capture.toml in the project root
    pub fn load_default() -> Result<Self, String> {
        Self::from_file("Capture.toml")
    }

    /// Creates a configuration with hardcoded default values as fallback
    /// This should match the constants defined in Capture.toml
    pub fn default_hardcoded() -> Self {
        Config {
            attacker: AttackerConfig {
                flee_distance: 6,
                enemy_close_cost: 5,
                food_eaten_to_return: 5,
                capsule_effect_duration: 35,
                flee_cluster_turns: 4,
                flee_cluster_gaps: 3,
                forced_flee_turns: 6,
                opening_candidates: 3,
            },
            defender: DefenderConfig {
                enemy_field_cost: 5,
                capsule_effect_duration: 40,
            },
            match_rules: MatchRulesConfig { rng_seed: None },
            debug: DebugConfig {
                enabled: false,
                log_file_path: "capture_decisions.jsonl".to_string(),
            },
        }
    }

    /// Attempts to load from file, falls back to hardcoded defaults on error
    pub fn load_or_default() -> Self {
        Self::load_default().unwrap_or_else(|e| {
            log::warn!("Could not load Capture.toml ({}), using hardcoded defaults", e);
            Self::default_hardcoded()
        })
    }
}
