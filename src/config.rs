//! Configuration loading.
//!
//! Resolution order for the config file:
//! 1. `--config` argument
//! 2. `TRANSMATCH_CONFIG` environment variable
//! 3. `./transmatch.toml`
//! 4. `<user config dir>/transmatch/config.toml`
//! 5. built-in defaults
//!
//! Every field has a default, so partial files are fine.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};
use crate::model::index::LanguageVariant;
use crate::services::language::ClassifierPolicy;
use crate::services::ranking::{
    self, RankingPolicy, RankingStrategy, TierSpec, DEFAULT_WEIGHT_LOG_SUBS,
};
use crate::services::reconcile::VerifyPolicy;

pub const CONFIG_ENV: &str = "TRANSMATCH_CONFIG";
const LOCAL_CONFIG_FILE: &str = "transmatch.toml";
const DEFAULT_INDEX_FILE: &str = "translation_map.json";
const DEFAULT_APP_ID: u32 = 294100;
const DEFAULT_BRIDGE_TIMEOUT_SECS: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LanguagePreference {
    #[default]
    Simplified,
    Traditional,
}

impl LanguagePreference {
    pub fn variant(self) -> LanguageVariant {
        match self {
            LanguagePreference::Simplified => LanguageVariant::Simplified,
            LanguagePreference::Traditional => LanguageVariant::Traditional,
        }
    }
}

impl fmt::Display for LanguagePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.variant().as_str())
    }
}

impl FromStr for LanguagePreference {
    type Err = String;

    /// Accepts the menu numbers `1`/`2` as well as names.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "simplified" | "chs" | "sc" => Ok(LanguagePreference::Simplified),
            "2" | "traditional" | "cht" | "tc" => Ok(LanguagePreference::Traditional),
            other => Err(format!(
                "unknown language '{other}' (expected 1/simplified or 2/traditional)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub input_dir: PathBuf,
    pub output: PathBuf,
    pub skip_duplicate_chunks: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        IndexConfig {
            input_dir: PathBuf::from("output"),
            output: PathBuf::from(DEFAULT_INDEX_FILE),
            skip_duplicate_chunks: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubscribeConfig {
    pub app_id: u32,
    pub index_file: PathBuf,
    pub language: LanguagePreference,
    pub dry_run: bool,
    pub ranking: RankingStrategy,
    pub weight_log_subs: f64,
    pub max_verify_cycles: u32,
    pub verify_interval_secs: f64,
    /// Helper process speaking the bridge protocol: program followed by its arguments.
    pub bridge: Vec<String>,
    /// Upper bound for one bridge request/response exchange.
    pub bridge_timeout_secs: f64,
}

impl Default for SubscribeConfig {
    fn default() -> Self {
        let verify = VerifyPolicy::default();
        SubscribeConfig {
            app_id: DEFAULT_APP_ID,
            index_file: PathBuf::from(DEFAULT_INDEX_FILE),
            language: LanguagePreference::default(),
            dry_run: false,
            ranking: RankingStrategy::default(),
            weight_log_subs: DEFAULT_WEIGHT_LOG_SUBS,
            max_verify_cycles: verify.max_cycles,
            verify_interval_secs: verify.interval.as_secs_f64(),
            bridge: Vec::new(),
            bridge_timeout_secs: DEFAULT_BRIDGE_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub classifier: ClassifierPolicy,
    pub index: IndexConfig,
    pub subscribe: SubscribeConfig,
    pub tiers: Vec<TierSpec>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            classifier: ClassifierPolicy::default(),
            index: IndexConfig::default(),
            subscribe: SubscribeConfig::default(),
            tiers: ranking::default_tiers(),
        }
    }
}

impl Config {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(s).map_err(|e| Error::Config(format!("invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            Error::Config(msg) => Error::Config(format!("{}: {msg}", path.display())),
            other => other,
        })
    }

    pub fn validate(&self) -> Result<()> {
        let s = &self.subscribe;
        if s.max_verify_cycles == 0 {
            return Err(Error::Config("subscribe.max_verify_cycles must be at least 1".into()));
        }
        seconds("subscribe.verify_interval_secs", s.verify_interval_secs)?;
        if seconds("subscribe.bridge_timeout_secs", s.bridge_timeout_secs)?.is_zero() {
            return Err(Error::Config("subscribe.bridge_timeout_secs must be positive".into()));
        }
        if !s.weight_log_subs.is_finite() {
            return Err(Error::Config("subscribe.weight_log_subs must be finite".into()));
        }
        Ok(())
    }

    pub fn verify_policy(&self) -> VerifyPolicy {
        let default = VerifyPolicy::default();
        VerifyPolicy {
            max_cycles: self.subscribe.max_verify_cycles,
            interval: Duration::try_from_secs_f64(self.subscribe.verify_interval_secs)
                .unwrap_or(default.interval),
        }
    }

    pub fn bridge_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.subscribe.bridge_timeout_secs)
            .unwrap_or(Duration::from_secs_f64(DEFAULT_BRIDGE_TIMEOUT_SECS))
    }

    pub fn ranking_policy(&self) -> Box<dyn RankingPolicy> {
        self.subscribe
            .ranking
            .build(&self.tiers, self.subscribe.weight_log_subs)
    }
}

pub fn resolve_config_path(cli_arg: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(path) = cli_arg {
        return require_exists(path.to_path_buf(), "--config");
    }

    if let Ok(path) = std::env::var(CONFIG_ENV) {
        if !path.trim().is_empty() {
            return require_exists(PathBuf::from(path), CONFIG_ENV);
        }
    }

    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.is_file() {
        return Ok(Some(local));
    }

    if let Some(user) = dirs::config_dir().map(|d| d.join("transmatch").join("config.toml")) {
        if user.is_file() {
            return Ok(Some(user));
        }
    }

    Ok(None)
}

pub fn load(cli_arg: Option<&Path>) -> Result<Config> {
    match resolve_config_path(cli_arg)? {
        Some(path) => {
            info!(file = %path.display(), "Loading configuration");
            Config::from_file(&path)
        }
        None => {
            info!("No configuration file found, using defaults");
            Ok(Config::default())
        }
    }
}

fn seconds(field: &str, value: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(value).map_err(|e| {
        Error::Config(format!("{field} must be a non-negative number of seconds ({value}): {e}"))
    })
}

fn require_exists(path: PathBuf, source: &str) -> Result<Option<PathBuf>> {
    if path.is_file() {
        Ok(Some(path))
    } else {
        Err(Error::Config(format!(
            "config file from {source} not found: {}",
            path.display()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.subscribe.max_verify_cycles, 15);
        assert_eq!(config.verify_policy().interval, Duration::from_secs(3));
        assert_eq!(config.bridge_timeout(), Duration::from_secs(10));
        assert_eq!(config.tiers.len(), 4);
        assert_eq!(config.ranking_policy().name(), "tiered");
    }

    #[test]
    fn partial_file_overrides_fields() {
        let config = Config::from_toml_str(
            r#"
            classifier = "strict"

            [subscribe]
            language = "traditional"
            ranking = "raw-metric"
            bridge = ["steam-bridge", "--app", "294100"]

            [[tiers]]
            name = "1.0"
            released = "2018-10-17"
            "#,
        )
        .unwrap();

        assert_eq!(config.classifier, ClassifierPolicy::Strict);
        assert_eq!(config.subscribe.language, LanguagePreference::Traditional);
        assert_eq!(config.subscribe.ranking, RankingStrategy::RawMetric);
        assert_eq!(config.subscribe.bridge.len(), 3);
        assert_eq!(config.subscribe.app_id, 294100);
        assert_eq!(config.tiers.len(), 1);
        assert!(config.index.skip_duplicate_chunks);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(Config::from_toml_str("[subscribe]\nmax_verify_cycles = 0").is_err());
        assert!(Config::from_toml_str("[subscribe]\nverify_interval_secs = -1.0").is_err());
        assert!(Config::from_toml_str("[subscribe]\nverify_interval_secs = 1e30").is_err());
        assert!(Config::from_toml_str("[subscribe]\nverify_interval_secs = nan").is_err());
        assert!(Config::from_toml_str("[subscribe]\nbridge_timeout_secs = 0.0").is_err());
        assert!(Config::from_toml_str("[subscribe]\nbridge_timeout_secs = 1e300").is_err());
        assert!(Config::from_toml_str("[subscribe]\nranking = \"best\"").is_err());
        assert!(Config::from_toml_str("[subscribe\n").is_err());

        // Built without validation: durations fall back instead of panicking.
        let mut config = Config::default();
        config.subscribe.verify_interval_secs = 1e30;
        config.subscribe.bridge_timeout_secs = -1.0;
        assert_eq!(config.verify_policy().interval, Duration::from_secs(3));
        assert_eq!(config.bridge_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn language_from_menu_choice() {
        assert_eq!("1".parse::<LanguagePreference>().unwrap(), LanguagePreference::Simplified);
        assert_eq!("2".parse::<LanguagePreference>().unwrap(), LanguagePreference::Traditional);
        assert!("3".parse::<LanguagePreference>().is_err());
    }
}
