//! Provisioning configuration
//!
//! Read from `IDM_PROVISIONING_*` environment variables. Every variable is
//! optional; a value that does not parse is an error rather than silently
//! falling back to the default.

use std::time::Duration;

use crate::executor::ExecutorConfig;
use crate::retry::RetryPolicy;
use crate::transform::ScriptLimits;

const CONCURRENCY: &str = "IDM_PROVISIONING_CONCURRENCY";
const MAX_ATTEMPTS: &str = "IDM_PROVISIONING_MAX_ATTEMPTS";
const RETRY_INITIAL_DELAY_SECS: &str = "IDM_PROVISIONING_RETRY_INITIAL_DELAY_SECS";
const RETRY_MAX_DELAY_SECS: &str = "IDM_PROVISIONING_RETRY_MAX_DELAY_SECS";
const SCRIPT_MAX_OPERATIONS: &str = "IDM_PROVISIONING_SCRIPT_MAX_OPERATIONS";

/// Runtime settings for the provisioning engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ProvisioningConfig {
    /// Maximum concurrent dispatches.
    pub concurrency: usize,

    /// Attempts per operation, the first one included.
    pub max_attempts: u32,

    pub retry_initial_delay_secs: u64,

    /// Upper bound on the delay between attempts.
    pub retry_max_delay_secs: u64,

    /// Operation budget for one transform script evaluation.
    pub script_max_operations: u64,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        Self {
            concurrency: ExecutorConfig::default().concurrency,
            max_attempts: retry.max_attempts,
            retry_initial_delay_secs: retry.initial_delay.as_secs(),
            retry_max_delay_secs: retry.max_delay.as_secs(),
            script_max_operations: ScriptLimits::default().max_operations,
        }
    }
}

impl ProvisioningConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_reader(|key| std::env::var(key))
    }

    /// Load configuration from a custom variable reader.
    ///
    /// Tests pass a map-backed reader instead of touching the process
    /// environment.
    pub fn from_reader<F>(reader: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<String, std::env::VarError>,
    {
        let defaults = Self::default();

        let concurrency = parse_or(&reader, CONCURRENCY, defaults.concurrency)?;
        if concurrency == 0 {
            return Err(ConfigError::InvalidValue(
                CONCURRENCY.into(),
                "must be at least 1".into(),
            ));
        }

        let max_attempts = parse_or(&reader, MAX_ATTEMPTS, defaults.max_attempts)?;
        let retry_initial_delay_secs = parse_or(
            &reader,
            RETRY_INITIAL_DELAY_SECS,
            defaults.retry_initial_delay_secs,
        )?;
        let retry_max_delay_secs =
            parse_or(&reader, RETRY_MAX_DELAY_SECS, defaults.retry_max_delay_secs)?;
        if retry_max_delay_secs < retry_initial_delay_secs {
            return Err(ConfigError::InvalidValue(
                RETRY_MAX_DELAY_SECS.into(),
                format!("must not be below {RETRY_INITIAL_DELAY_SECS}"),
            ));
        }

        let script_max_operations =
            parse_or(&reader, SCRIPT_MAX_OPERATIONS, defaults.script_max_operations)?;

        Ok(Self {
            concurrency,
            max_attempts,
            retry_initial_delay_secs,
            retry_max_delay_secs,
            script_max_operations,
        })
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_delay: Duration::from_secs(self.retry_initial_delay_secs),
            max_delay: Duration::from_secs(self.retry_max_delay_secs),
            ..RetryPolicy::default()
        }
    }

    #[must_use]
    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            concurrency: self.concurrency,
            retry: self.retry_policy(),
        }
    }

    #[must_use]
    pub fn script_limits(&self) -> ScriptLimits {
        ScriptLimits {
            max_operations: self.script_max_operations,
            ..ScriptLimits::default()
        }
    }
}

fn parse_or<F, T>(reader: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match reader(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(key.into(), e.to_string())),
        Err(_) => Ok(default),
    }
}

/// Configuration errors. Every variable has a default, so only malformed
/// values are reported.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::env::VarError;

    fn make_reader(vars: HashMap<&str, &str>) -> impl Fn(&str) -> Result<String, VarError> {
        let owned: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| owned.get(key).cloned().ok_or(VarError::NotPresent)
    }

    #[test]
    fn test_defaults() {
        let config = ProvisioningConfig::from_reader(make_reader(HashMap::new())).unwrap();
        assert_eq!(config, ProvisioningConfig::default());
        assert_eq!(config.concurrency, 10);
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.retry_initial_delay_secs, 30);
        assert_eq!(config.retry_max_delay_secs, 3600);
        assert_eq!(config.script_max_operations, 100_000);
    }

    #[test]
    fn test_custom_values() {
        let reader = make_reader(HashMap::from([
            (CONCURRENCY, "4"),
            (MAX_ATTEMPTS, "3"),
            (RETRY_INITIAL_DELAY_SECS, "5"),
            (RETRY_MAX_DELAY_SECS, " 60 "),
            (SCRIPT_MAX_OPERATIONS, "500"),
        ]));
        let config = ProvisioningConfig::from_reader(reader).unwrap();

        let executor = config.executor_config();
        assert_eq!(executor.concurrency, 4);
        assert_eq!(executor.retry.max_attempts, 3);
        assert_eq!(executor.retry.initial_delay, Duration::from_secs(5));
        assert_eq!(executor.retry.max_delay, Duration::from_secs(60));
        assert_eq!(config.script_limits().max_operations, 500);
    }

    #[test]
    fn test_invalid_number() {
        let reader = make_reader(HashMap::from([(MAX_ATTEMPTS, "lots")]));
        let err = ProvisioningConfig::from_reader(reader).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(..)));
        assert!(err.to_string().contains(MAX_ATTEMPTS));
    }

    #[test]
    fn test_blank_value_is_invalid_not_defaulted() {
        let reader = make_reader(HashMap::from([(CONCURRENCY, "  ")]));
        let err = ProvisioningConfig::from_reader(reader).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref key, _) if key == CONCURRENCY));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let reader = make_reader(HashMap::from([(CONCURRENCY, "0")]));
        let err = ProvisioningConfig::from_reader(reader).unwrap_err();
        assert!(err.to_string().contains(CONCURRENCY));
    }

    #[test]
    fn test_max_delay_below_initial_rejected() {
        let reader = make_reader(HashMap::from([
            (RETRY_INITIAL_DELAY_SECS, "120"),
            (RETRY_MAX_DELAY_SECS, "60"),
        ]));
        assert!(ProvisioningConfig::from_reader(reader).is_err());
    }
}
