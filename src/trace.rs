use std::collections::VecDeque;

use crate::config::StorageConfig;
use crate::{Error, Result};

/// Bounded buffer of human-readable trace lines, split into categories.
#[derive(Debug)]
pub(crate) struct TraceLog {
    enabled: bool,
    events: bool,
    mutations: bool,
    forward: bool,
    limit: usize,
    lines: VecDeque<String>,
}

impl TraceLog {
    pub(crate) fn from_config(config: &StorageConfig) -> Self {
        Self {
            enabled: config.trace,
            events: config.trace_events,
            mutations: config.trace_mutations,
            forward: config.forward_trace,
            limit: config.trace_log_limit,
            lines: VecDeque::new(),
        }
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub(crate) fn set_events(&mut self, enabled: bool) {
        self.events = enabled;
    }

    pub(crate) fn set_mutations(&mut self, enabled: bool) {
        self.mutations = enabled;
    }

    pub(crate) fn set_forward(&mut self, enabled: bool) {
        self.forward = enabled;
    }

    pub(crate) fn set_limit(&mut self, max_entries: usize) -> Result<()> {
        if max_entries == 0 {
            return Err(Error::InvalidConfig(
                "set_trace_log_limit requires at least 1 entry".into(),
            ));
        }
        self.limit = max_entries;
        while self.lines.len() > self.limit {
            self.lines.pop_front();
        }
        Ok(())
    }

    pub(crate) fn take(&mut self) -> Vec<String> {
        std::mem::take(&mut self.lines).into()
    }

    pub(crate) fn event_line(&mut self, line: impl FnOnce() -> String) {
        if self.enabled && self.events {
            self.push(line());
        }
    }

    pub(crate) fn mutation_line(&mut self, line: impl FnOnce() -> String) {
        if self.enabled && self.mutations {
            self.push(line());
        }
    }

    fn push(&mut self, line: String) {
        if self.forward {
            tracing::debug!(target: "storage_event", "{line}");
        }
        if self.lines.len() >= self.limit {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }
}
