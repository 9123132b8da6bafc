use serde::Deserialize;

use crate::{Error, Result};

const DEFAULT_TRACE_LOG_LIMIT: usize = 10_000;

/// Settings for a [`crate::StorageManager`].
///
/// Deserializes from a JSON object in which every member is optional:
///
/// ```
/// use storage_event::StorageConfig;
///
/// let config = StorageConfig::from_json_str(r#"{ "trace": true, "trace_log_limit": 64 }"#)?;
/// assert!(config.trace);
/// assert_eq!(config.trace_log_limit, 64);
/// assert_eq!(config.start_time_ms, 0);
/// # Ok::<(), storage_event::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Initial value of the virtual clock that stamps fired events.
    pub start_time_ms: i64,
    pub trace: bool,
    pub trace_events: bool,
    pub trace_mutations: bool,
    pub trace_log_limit: usize,
    /// Forward trace lines to `tracing` in addition to buffering them.
    pub forward_trace: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            start_time_ms: 0,
            trace: false,
            trace_events: true,
            trace_mutations: true,
            trace_log_limit: DEFAULT_TRACE_LOG_LIMIT,
            forward_trace: true,
        }
    }
}

impl StorageConfig {
    pub fn from_json_str(src: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(src).map_err(|err| Error::InvalidConfig(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.trace_log_limit == 0 {
            return Err(Error::InvalidConfig(
                "trace_log_limit requires at least 1 entry".into(),
            ));
        }
        if self.start_time_ms < 0 {
            return Err(Error::InvalidConfig(format!(
                "start_time_ms must be non-negative (got {})",
                self.start_time_ms
            )));
        }
        Ok(())
    }
}
