use nodefault_core::{CoreError, FaultKind, Result};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_INSTANCE_KILL_COUNT: u32 = 1;
pub const DEFAULT_TIMEOUT_SECS: u64 = 180;
pub const DEFAULT_STATUS_POLL_SECS: u64 = 5;
pub const DEFAULT_ABSENCE_POLL_SECS: u64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeFormat {
    Text,
    Json,
}

impl FromStr for OutcomeFormat {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(OutcomeFormat::Text),
            "json" => Ok(OutcomeFormat::Json),
            other => Err(CoreError::Configuration(format!(
                "NODEFAULT_OUTCOME_FORMAT must be 'text' or 'json', got '{other}'"
            ))),
        }
    }
}

/// One scenario run, as configured through `NODEFAULT_*` environment variables.
#[derive(Debug, Clone)]
pub struct ScenarioConfig {
    pub fault_kind: FaultKind,
    pub node: String,
    pub instance_kill_count: u32,
    pub timeout_secs: u64,
    pub status_poll_interval: Duration,
    pub absence_poll_interval: Duration,
    pub outcome_format: OutcomeFormat,
}

impl ScenarioConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or_else(|| CoreError::Configuration(format!("{key} is not set")))
        };

        let fault_kind = required("NODEFAULT_ACTION")?
            .parse::<FaultKind>()
            .map_err(|e| CoreError::Configuration(format!("NODEFAULT_ACTION: {e}")))?;
        let node = required("NODEFAULT_NODE")?;

        let instance_kill_count =
            parse_or(&lookup, "NODEFAULT_INSTANCE_KILL_COUNT", DEFAULT_INSTANCE_KILL_COUNT)?;
        if instance_kill_count == 0 {
            return Err(CoreError::Configuration(
                "NODEFAULT_INSTANCE_KILL_COUNT must be at least 1".to_string(),
            ));
        }

        let timeout_secs = parse_or(&lookup, "NODEFAULT_TIMEOUT", DEFAULT_TIMEOUT_SECS)?;
        let status_poll_secs =
            parse_or(&lookup, "NODEFAULT_STATUS_POLL_SECS", DEFAULT_STATUS_POLL_SECS)?;
        let absence_poll_secs =
            parse_or(&lookup, "NODEFAULT_ABSENCE_POLL_SECS", DEFAULT_ABSENCE_POLL_SECS)?;
        if status_poll_secs == 0 || absence_poll_secs == 0 {
            return Err(CoreError::Configuration(
                "poll intervals must be at least one second".to_string(),
            ));
        }

        let outcome_format = match lookup("NODEFAULT_OUTCOME_FORMAT") {
            Some(raw) => raw.parse()?,
            None => OutcomeFormat::Text,
        };

        Ok(Self {
            fault_kind,
            node,
            instance_kill_count,
            timeout_secs,
            status_poll_interval: Duration::from_secs(status_poll_secs),
            absence_poll_interval: Duration::from_secs(absence_poll_secs),
            outcome_format,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|e| CoreError::Configuration(format!("{key}: {e}"))),
        _ => Ok(default),
    }
}
