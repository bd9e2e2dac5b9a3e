//! Executor configuration.
//!
//! Loads [`ExecutorConfig`] from a TOML file with environment variable
//! overrides via `OCLBENCH_*` prefixed variables.

use crate::device::DeviceKind;
use crate::timeout::Timeout;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Device selection and default measurement parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Zero-based platform index.
    /// Override: `OCLBENCH_PLATFORM`
    pub platform_index: usize,

    /// Zero-based device index within the platform.
    /// Override: `OCLBENCH_DEVICE`
    pub device_index: usize,

    /// When set, pick the first device of this type on any platform
    /// instead of using the indices.
    /// Override: `OCLBENCH_DEVICE_TYPE`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_type: Option<DeviceKind>,

    /// Default iteration count for `evaluate` and `benchmark`.
    /// Override: `OCLBENCH_ITERATIONS`
    pub iterations: usize,

    /// Default per-iteration timeout in milliseconds (0 = none).
    /// Override: `OCLBENCH_TIMEOUT_MS`
    pub timeout_ms: f64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            platform_index: 0,
            device_index: 0,
            device_type: None,
            iterations: 10,
            timeout_ms: 0.0,
        }
    }
}

/// Errors that can occur when loading or validating an [`ExecutorConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("invalid environment override {key}={value}: {reason}")]
    EnvOverride {
        key: String,
        value: String,
        reason: String,
    },
}

fn env_parse<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(val) => val
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::EnvOverride {
                key: key.into(),
                value: val.clone(),
                reason: e.to_string(),
            }),
        Err(_) => Ok(None),
    }
}

impl ExecutorConfig {
    /// Generate a default configuration TOML string.
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }

    /// Load from a TOML file, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Load from a TOML string, then apply environment overrides.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let mut cfg: ExecutorConfig = toml::from_str(toml_str)?;
        cfg.apply_env_overrides()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Defaults plus environment overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut cfg = Self::default();
        cfg.apply_env_overrides()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.iterations == 0 {
            return Err(ConfigError::Validation("iterations must be > 0".into()));
        }
        if !self.timeout_ms.is_finite() || self.timeout_ms < 0.0 {
            return Err(ConfigError::Validation(format!(
                "timeout_ms must be a non-negative number, got {}",
                self.timeout_ms
            )));
        }
        Ok(())
    }

    /// Apply `OCLBENCH_*` environment variable overrides.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(v) = env_parse::<usize>("OCLBENCH_PLATFORM")? {
            self.platform_index = v;
        }
        if let Some(v) = env_parse::<usize>("OCLBENCH_DEVICE")? {
            self.device_index = v;
        }
        if let Some(v) = env_parse::<DeviceKind>("OCLBENCH_DEVICE_TYPE")? {
            self.device_type = Some(v);
        }
        if let Some(v) = env_parse::<usize>("OCLBENCH_ITERATIONS")? {
            self.iterations = v;
        }
        if let Some(v) = env_parse::<f64>("OCLBENCH_TIMEOUT_MS")? {
            self.timeout_ms = v;
        }
        Ok(())
    }

    pub fn timeout(&self) -> Timeout {
        Timeout::from_ms(self.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const ALL_VARS: [&str; 5] = [
        "OCLBENCH_PLATFORM",
        "OCLBENCH_DEVICE",
        "OCLBENCH_DEVICE_TYPE",
        "OCLBENCH_ITERATIONS",
        "OCLBENCH_TIMEOUT_MS",
    ];

    fn cleared() -> Vec<(&'static str, Option<&'static str>)> {
        ALL_VARS.iter().map(|k| (*k, None)).collect()
    }

    #[test]
    fn default_config_is_valid() {
        assert!(ExecutorConfig::default().validate().is_ok());
    }

    #[test]
    #[serial(oclbench_env)]
    fn default_toml_round_trips() {
        temp_env::with_vars(cleared(), || {
            let cfg = ExecutorConfig::from_toml(&ExecutorConfig::default_toml()).unwrap();
            assert_eq!(cfg, ExecutorConfig::default());
        });
    }

    #[test]
    #[serial(oclbench_env)]
    fn from_toml_full() {
        temp_env::with_vars(cleared(), || {
            let cfg = ExecutorConfig::from_toml(
                r#"
platform_index = 1
device_index = 2
device_type = "gpu"
iterations = 25
timeout_ms = 150.0
"#,
            )
            .unwrap();
            assert_eq!(cfg.platform_index, 1);
            assert_eq!(cfg.device_index, 2);
            assert_eq!(cfg.device_type, Some(DeviceKind::Gpu));
            assert_eq!(cfg.iterations, 25);
            assert_eq!(cfg.timeout(), Timeout::from_ms(150.0));
        });
    }

    #[test]
    #[serial(oclbench_env)]
    fn missing_fields_fall_back_to_defaults() {
        temp_env::with_vars(cleared(), || {
            let cfg = ExecutorConfig::from_toml("iterations = 3\n").unwrap();
            assert_eq!(cfg.iterations, 3);
            assert_eq!(cfg.platform_index, 0);
            assert_eq!(cfg.device_type, None);
        });
    }

    #[test]
    fn validation_rejects_zero_iterations() {
        let cfg = ExecutorConfig {
            iterations: 0,
            ..Default::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("iterations must be > 0"));
    }

    #[test]
    fn validation_rejects_negative_timeout() {
        let cfg = ExecutorConfig {
            timeout_ms: -1.0,
            ..Default::default()
        };
        assert!(cfg.validate().unwrap_err().to_string().contains("non-negative"));
    }

    #[test]
    #[serial(oclbench_env)]
    fn env_overrides_apply() {
        temp_env::with_vars(
            [
                ("OCLBENCH_PLATFORM", Some("1")),
                ("OCLBENCH_DEVICE", Some("3")),
                ("OCLBENCH_DEVICE_TYPE", Some("CPU")),
                ("OCLBENCH_ITERATIONS", Some("7")),
                ("OCLBENCH_TIMEOUT_MS", Some("2.5")),
            ],
            || {
                let cfg = ExecutorConfig::from_env().unwrap();
                assert_eq!(cfg.platform_index, 1);
                assert_eq!(cfg.device_index, 3);
                assert_eq!(cfg.device_type, Some(DeviceKind::Cpu));
                assert_eq!(cfg.iterations, 7);
                assert_eq!(cfg.timeout_ms, 2.5);
            },
        );
    }

    #[test]
    #[serial(oclbench_env)]
    fn invalid_env_override_names_the_variable() {
        let mut vars = cleared();
        vars[0] = ("OCLBENCH_PLATFORM", Some("first"));
        temp_env::with_vars(vars, || {
            let err = ExecutorConfig::from_env().unwrap_err();
            match err {
                ConfigError::EnvOverride { key, value, .. } => {
                    assert_eq!(key, "OCLBENCH_PLATFORM");
                    assert_eq!(value, "first");
                }
                other => panic!("unexpected error: {other}"),
            }
        });
    }

    #[test]
    #[serial(oclbench_env)]
    fn env_overrides_take_precedence_over_file() {
        let mut vars = cleared();
        vars[3] = ("OCLBENCH_ITERATIONS", Some("99"));
        temp_env::with_vars(vars, || {
            let cfg = ExecutorConfig::from_toml("iterations = 5\n").unwrap();
            assert_eq!(cfg.iterations, 99);
        });
    }
}
