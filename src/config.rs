use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::rl::config::EnvConfig;
use crate::runner::PolicyKind;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Trading environment settings
    #[serde(default)]
    pub env: EnvConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    /// JSON feature table to replay
    #[serde(default)]
    pub data_path: Option<PathBuf>,
    /// Number of episodes to run
    #[serde(default = "default_episodes")]
    pub episodes: usize,
    /// Reference policy driving the agent
    #[serde(default)]
    pub policy: PolicyKind,
    /// Seed for the random policy
    #[serde(default)]
    pub seed: u64,
}

fn default_episodes() -> usize {
    1
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            data_path: None,
            episodes: default_episodes(),
            policy: PolicyKind::default(),
            seed: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Filter directives used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
    /// Directory for daily-rolling log files; console only when unset
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info,folio_gym=debug".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            dir: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let mut builder = Config::builder()
            // Start with default values
            .set_default("logging.level", default_log_level())?
            .set_default("logging.json", false)?
            .set_default("simulation.episodes", 1)?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false));

        // Load profile-specific config (e.g., config/backtest.toml)
        if let Ok(profile) = std::env::var("FOLIO_PROFILE") {
            builder = builder
                .add_source(File::from(config_dir.join(format!("{}.toml", profile))).required(false));
        }

        // Override with environment variables (FOLIO__ENV__FEE, etc.)
        let builder = builder.add_source(
            Environment::with_prefix("FOLIO")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rl::config::{NormalizationMethod, RewardKind};
    use crate::rl::environment::{generate_sample_data, TradingEnvironment};
    use std::io::Write;
    use std::sync::Arc;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("folio-gym-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_missing_dir_yields_defaults() {
        let cfg = AppConfig::load_from(temp_dir("empty")).unwrap();
        assert_eq!(cfg.env, EnvConfig::default());
        assert_eq!(cfg.simulation.episodes, 1);
        assert_eq!(cfg.logging.level, "info,folio_gym=debug");
    }

    #[test]
    fn test_load_default_toml() {
        let dir = temp_dir("toml");
        let mut file = std::fs::File::create(dir.join("default.toml")).unwrap();
        writeln!(
            file,
            r#"
[env]
balance_init = 5000.0
fee = 0.0
normalization = "static"
reward = "shaped"

[env.norms.aaa]
shift = [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]
scale = [1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0]

[simulation]
episodes = 3
policy = "random"
seed = 42

[logging]
level = "debug"
json = true
"#
        )
        .unwrap();

        let cfg = AppConfig::load_from(&dir).unwrap();
        assert_eq!(cfg.env.balance_init, 5000.0);
        assert_eq!(cfg.env.fee, Some(0.0));
        assert_eq!(cfg.env.normalization, NormalizationMethod::Static);
        assert_eq!(cfg.env.reward, RewardKind::Shaped);
        assert_eq!(cfg.env.norms.as_ref().map(|n| n.len()), Some(1));
        assert_eq!(cfg.simulation.episodes, 3);
        assert_eq!(cfg.simulation.policy, PolicyKind::Random);
        assert_eq!(cfg.simulation.seed, 42);
        assert!(cfg.logging.json);
    }

    #[test]
    fn test_uppercase_norms_build_environment() {
        let dir = temp_dir("norms-case");
        let mut file = std::fs::File::create(dir.join("default.toml")).unwrap();
        writeln!(
            file,
            r#"
[env]
normalization = "static"

[env.norms.AAA]
shift = [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]
scale = [2.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0]

[env.norms.BBB]
shift = [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]
scale = [4.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0]
"#
        )
        .unwrap();

        let cfg = AppConfig::load_from(&dir).unwrap();
        let data = Arc::new(generate_sample_data(&["AAA", "BBB"], 10, 1).unwrap());
        let mut env = TradingEnvironment::new(data.clone(), cfg.env).unwrap();

        let obs = env.reset().unwrap();
        let close = data.asset("BBB").unwrap().rows[1].close;
        assert!((obs.row(1)[0] - close / 4.0).abs() < 1e-12);
    }
}
