use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::config::StorageConfig;
use crate::location::LocationParts;
use crate::storage::{StorageArea, StorageKind};
use crate::trace::TraceLog;
use crate::{Error, Result};

type Partitions = HashMap<StorageKind, HashMap<String, BTreeMap<String, String>>>;

pub(crate) struct Shared {
    pub(crate) partitions: RwLock<Partitions>,
    pub(crate) trace: Mutex<TraceLog>,
    now_ms: Mutex<i64>,
}

impl Shared {
    pub(crate) fn now_ms(&self) -> i64 {
        *self.now_ms.lock()
    }
}

/// Owns the per-origin storage partitions and hands out [`StorageArea`]s.
///
/// Cloning a manager yields another handle to the same partitions, clock and
/// trace log. Partition data outlives the areas opened on it.
#[derive(Clone)]
pub struct StorageManager {
    shared: Arc<Shared>,
}

impl Default for StorageManager {
    fn default() -> Self {
        Self::from_valid_config(&StorageConfig::default())
    }
}

impl StorageManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: StorageConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_valid_config(&config))
    }

    fn from_valid_config(config: &StorageConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                partitions: RwLock::new(HashMap::new()),
                trace: Mutex::new(TraceLog::from_config(config)),
                now_ms: Mutex::new(config.start_time_ms),
            }),
        }
    }

    /// Opens a view of the partition belonging to `document_url`'s origin.
    ///
    /// Documents with an opaque origin cannot use storage and get
    /// [`Error::Security`].
    pub fn open(&self, kind: StorageKind, document_url: &str) -> Result<Arc<StorageArea>> {
        let location = LocationParts::parse(document_url)?;
        if location.is_opaque() {
            tracing::warn!(
                kind = kind.name(),
                url = document_url,
                "storage denied for opaque origin"
            );
            return Err(Error::Security(format!(
                "{} is not available for opaque origin of {document_url}",
                kind.name()
            )));
        }
        let origin = location.origin();
        tracing::debug!(kind = kind.name(), origin = %origin, "opened storage area");
        Ok(StorageArea::new(
            kind,
            origin,
            location.href(),
            Arc::clone(&self.shared),
        ))
    }

    pub fn local_storage(&self, document_url: &str) -> Result<Arc<StorageArea>> {
        self.open(StorageKind::Local, document_url)
    }

    pub fn session_storage(&self, document_url: &str) -> Result<Arc<StorageArea>> {
        self.open(StorageKind::Session, document_url)
    }

    /// Origins holding at least one entry, sorted.
    pub fn origins(&self, kind: StorageKind) -> Vec<String> {
        let partitions = self.shared.partitions.read();
        let mut origins: Vec<String> = partitions
            .get(&kind)
            .map(|origins| {
                origins
                    .iter()
                    .filter(|(_, entries)| !entries.is_empty())
                    .map(|(origin, _)| origin.clone())
                    .collect()
            })
            .unwrap_or_default();
        origins.sort();
        origins
    }

    pub fn length(&self, kind: StorageKind, origin: &str) -> usize {
        self.shared
            .partitions
            .read()
            .get(&kind)
            .and_then(|origins| origins.get(origin))
            .map_or(0, BTreeMap::len)
    }

    pub fn now_ms(&self) -> i64 {
        self.shared.now_ms()
    }

    pub fn advance_time(&self, delta_ms: i64) -> Result<()> {
        if delta_ms < 0 {
            return Err(Error::InvalidConfig(
                "advance_time requires non-negative milliseconds".into(),
            ));
        }
        let mut now_ms = self.shared.now_ms.lock();
        *now_ms = now_ms.saturating_add(delta_ms);
        Ok(())
    }

    pub fn advance_time_to(&self, target_ms: i64) -> Result<()> {
        let mut now_ms = self.shared.now_ms.lock();
        if target_ms < *now_ms {
            return Err(Error::InvalidConfig(format!(
                "advance_time_to requires target >= now_ms (target={target_ms}, now_ms={})",
                *now_ms
            )));
        }
        *now_ms = target_ms;
        Ok(())
    }

    pub fn enable_trace(&self, enabled: bool) {
        self.shared.trace.lock().set_enabled(enabled);
    }

    pub fn take_trace_logs(&self) -> Vec<String> {
        self.shared.trace.lock().take()
    }

    pub fn set_trace_events(&self, enabled: bool) {
        self.shared.trace.lock().set_events(enabled);
    }

    pub fn set_trace_mutations(&self, enabled: bool) {
        self.shared.trace.lock().set_mutations(enabled);
    }

    pub fn set_trace_forwarding(&self, enabled: bool) {
        self.shared.trace.lock().set_forward(enabled);
    }

    pub fn set_trace_log_limit(&self, max_entries: usize) -> Result<()> {
        self.shared.trace.lock().set_limit(max_entries)
    }
}

impl fmt::Debug for StorageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageManager")
            .field("now_ms", &self.now_ms())
            .field("local_origins", &self.origins(StorageKind::Local))
            .field("session_origins", &self.origins(StorageKind::Session))
            .finish()
    }
}
