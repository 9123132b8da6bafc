use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::event::EventInit;
use crate::manager::Shared;
use crate::storage_event::{StorageEvent, StorageEventInit};

/// A string key/value store that storage events can point back to.
pub trait Storage: Send + Sync {
    fn length(&self) -> usize;

    /// Name of the key at `index` in key order.
    fn key(&self, index: usize) -> Option<String>;

    fn get_item(&self, key: &str) -> Option<String>;

    fn set_item(&self, key: &str, value: &str);

    fn remove_item(&self, key: &str);

    fn clear(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StorageKind {
    Local,
    Session,
}

impl StorageKind {
    /// Name of the window attribute exposing this kind of area.
    pub fn name(self) -> &'static str {
        match self {
            Self::Local => "localStorage",
            Self::Session => "sessionStorage",
        }
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Session => "session",
        }
    }
}

/// Receives the events fired by a [`StorageArea`].
///
/// Observers run synchronously on the mutating thread, after the area's data
/// lock has been released, so they may read or mutate the area again.
///
/// Events from concurrent writers are not ordered relative to each other: two
/// racing `set_item` calls on one key may be observed as `1 -> 2` before
/// `None -> 1`. Events from a single thread arrive in mutation order.
pub trait StorageObserver: Send + Sync {
    fn storage_changed(&self, event: &Arc<StorageEvent>);
}

impl<F> StorageObserver for F
where
    F: Fn(&Arc<StorageEvent>) + Send + Sync,
{
    fn storage_changed(&self, event: &Arc<StorageEvent>) {
        self(event)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// One document's view of an origin's storage partition.
///
/// Areas opened for the same kind and origin share their data. Mutations
/// that change the partition fire a trusted `storage` event at this area's
/// observers; no-op mutations fire nothing.
pub struct StorageArea {
    kind: StorageKind,
    origin: String,
    url: String,
    shared: Arc<Shared>,
    observers: RwLock<Vec<(ObserverId, Arc<dyn StorageObserver>)>>,
    next_observer_id: AtomicU64,
    this: Weak<StorageArea>,
}

impl StorageArea {
    pub(crate) fn new(
        kind: StorageKind,
        origin: String,
        url: String,
        shared: Arc<Shared>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            kind,
            origin,
            url,
            shared,
            observers: RwLock::new(Vec::new()),
            next_observer_id: AtomicU64::new(1),
            this: this.clone(),
        })
    }

    pub fn kind(&self) -> StorageKind {
        self.kind
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// URL of the document this area was opened for; copied into every
    /// event the area fires.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn add_observer<O>(&self, observer: O) -> ObserverId
    where
        O: StorageObserver + 'static,
    {
        self.add_shared_observer(Arc::new(observer))
    }

    pub fn add_shared_observer(&self, observer: Arc<dyn StorageObserver>) -> ObserverId {
        let id = ObserverId(self.next_observer_id.fetch_add(1, Ordering::Relaxed));
        self.observers.write().push((id, observer));
        id
    }

    pub fn remove_observer(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|(observer_id, _)| *observer_id != id);
        observers.len() != before
    }

    pub fn observer_count(&self) -> usize {
        self.observers.read().len()
    }

    /// Key/value pairs in key order.
    pub fn entries(&self) -> Vec<(String, String)> {
        self.read_partition(|entries| {
            entries
                .map(|entries| {
                    entries
                        .iter()
                        .map(|(key, value)| (key.clone(), value.clone()))
                        .collect()
                })
                .unwrap_or_default()
        })
    }

    fn read_partition<R>(&self, read: impl FnOnce(Option<&BTreeMap<String, String>>) -> R) -> R {
        let partitions = self.shared.partitions.read();
        read(
            partitions
                .get(&self.kind)
                .and_then(|origins| origins.get(&self.origin)),
        )
    }

    fn notify(&self, key: Option<&str>, old_value: Option<String>, new_value: Option<String>) {
        let observers: Vec<Arc<dyn StorageObserver>> = self
            .observers
            .read()
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();
        let init = StorageEventInit {
            event: EventInit::default(),
            key: key.map(str::to_string),
            old_value,
            new_value,
            url: self.url.clone(),
            storage_area: Some(self.this.clone() as Weak<dyn Storage>),
        };
        let event = Arc::new(StorageEvent::fired(init, self.shared.now_ms()));
        self.shared.trace.lock().event_line(|| {
            format!(
                "[event] storage {} origin={} key={} observers={}",
                self.kind.label(),
                self.origin,
                key.unwrap_or("null"),
                observers.len()
            )
        });
        for observer in &observers {
            observer.storage_changed(&event);
        }
    }

    fn trace_mutation(&self, action: &str, key: Option<&str>) {
        self.shared.trace.lock().mutation_line(|| match key {
            Some(key) => format!(
                "[storage] {action} {} {} key={key}",
                self.kind.label(),
                self.origin
            ),
            None => format!("[storage] {action} {} {}", self.kind.label(), self.origin),
        });
    }
}

impl Storage for StorageArea {
    fn length(&self) -> usize {
        self.read_partition(|entries| entries.map_or(0, BTreeMap::len))
    }

    fn key(&self, index: usize) -> Option<String> {
        self.read_partition(|entries| entries?.keys().nth(index).cloned())
    }

    fn get_item(&self, key: &str) -> Option<String> {
        self.read_partition(|entries| entries?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) {
        let old_value = {
            let mut partitions = self.shared.partitions.write();
            let entries = partitions
                .entry(self.kind)
                .or_default()
                .entry(self.origin.clone())
                .or_default();
            if entries.get(key).is_some_and(|current| current == value) {
                return;
            }
            entries.insert(key.to_string(), value.to_string())
        };
        self.trace_mutation("set", Some(key));
        self.notify(Some(key), old_value, Some(value.to_string()));
    }

    fn remove_item(&self, key: &str) {
        let old_value = {
            let mut partitions = self.shared.partitions.write();
            let removed = partitions
                .get_mut(&self.kind)
                .and_then(|origins| origins.get_mut(&self.origin))
                .and_then(|entries| entries.remove(key));
            match removed {
                Some(old_value) => old_value,
                None => return,
            }
        };
        self.trace_mutation("remove", Some(key));
        self.notify(Some(key), Some(old_value), None);
    }

    fn clear(&self) {
        {
            let mut partitions = self.shared.partitions.write();
            let Some(entries) = partitions
                .get_mut(&self.kind)
                .and_then(|origins| origins.get_mut(&self.origin))
            else {
                return;
            };
            if entries.is_empty() {
                return;
            }
            entries.clear();
        }
        self.trace_mutation("clear", None);
        self.notify(None, None, None);
    }
}

impl fmt::Debug for StorageArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageArea")
            .field("kind", &self.kind)
            .field("origin", &self.origin)
            .field("url", &self.url)
            .field("observers", &self.observer_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;
    use crate::Result;
    use crate::event::EventLike;
    use crate::manager::StorageManager;

    fn recorder(area: &StorageArea) -> Arc<Mutex<Vec<Arc<StorageEvent>>>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        area.add_observer(move |event: &Arc<StorageEvent>| sink.lock().push(Arc::clone(event)));
        events
    }

    #[test]
    fn set_item_fires_event_with_previous_value() -> Result<()> {
        let manager = StorageManager::new();
        let area = manager.local_storage("https://example.com/app")?;
        let events = recorder(&area);

        area.set_item("theme", "dark");
        area.set_item("theme", "light");

        let events = events.lock();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].key(), Some("theme"));
        assert_eq!(events[0].old_value(), None);
        assert_eq!(events[0].new_value(), Some("dark"));
        assert_eq!(events[1].old_value(), Some("dark"));
        assert_eq!(events[1].new_value(), Some("light"));
        assert_eq!(events[1].url(), "https://example.com/app");
        assert!(events[1].is_trusted());
        assert!(!events[1].bubbles());
        assert!(!events[1].cancelable());
        assert!(events[1].refers_to(&area));
        Ok(())
    }

    #[test]
    fn unchanged_value_fires_nothing() -> Result<()> {
        let manager = StorageManager::new();
        let area = manager.local_storage("https://example.com/")?;
        area.set_item("k", "v");
        let events = recorder(&area);
        area.set_item("k", "v");
        area.remove_item("missing");
        assert!(events.lock().is_empty());
        Ok(())
    }

    #[test]
    fn remove_and_clear_report_null_fields() -> Result<()> {
        let manager = StorageManager::new();
        let area = manager.session_storage("https://example.com/")?;
        area.set_item("a", "1");
        area.set_item("b", "2");
        let events = recorder(&area);

        area.remove_item("a");
        area.clear();
        area.clear();

        let events = events.lock();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].key(), Some("a"));
        assert_eq!(events[0].old_value(), Some("1"));
        assert_eq!(events[0].new_value(), None);
        assert!(events[1].is_storage_cleared());
        assert_eq!(area.length(), 0);
        Ok(())
    }

    #[test]
    fn keys_are_indexed_in_order() -> Result<()> {
        let manager = StorageManager::new();
        let area = manager.local_storage("https://example.com/")?;
        area.set_item("b", "2");
        area.set_item("a", "1");
        assert_eq!(area.length(), 2);
        assert_eq!(area.key(0).as_deref(), Some("a"));
        assert_eq!(area.key(1).as_deref(), Some("b"));
        assert_eq!(area.key(2), None);
        assert_eq!(area.get_item("a").as_deref(), Some("1"));
        assert_eq!(
            area.entries(),
            vec![("a".to_string(), "1".to_string()), ("b".to_string(), "2".to_string())]
        );
        Ok(())
    }

    #[test]
    fn removed_observer_stops_receiving_events() -> Result<()> {
        let manager = StorageManager::new();
        let area = manager.local_storage("https://example.com/")?;
        let events = Arc::new(Mutex::new(0usize));
        let sink = Arc::clone(&events);
        let id = area.add_observer(move |_: &Arc<StorageEvent>| *sink.lock() += 1);

        area.set_item("k", "1");
        assert!(area.remove_observer(id));
        assert!(!area.remove_observer(id));
        area.set_item("k", "2");

        assert_eq!(*events.lock(), 1);
        assert_eq!(area.observer_count(), 0);
        Ok(())
    }

    #[test]
    fn observer_may_read_area_reentrantly() -> Result<()> {
        let manager = StorageManager::new();
        let area = manager.local_storage("https://example.com/")?;
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        area.add_observer(move |event: &Arc<StorageEvent>| {
            let current = event
                .storage_area()
                .and_then(|storage| storage.get_item("k"));
            *sink.lock() = current;
        });

        area.set_item("k", "v");
        assert_eq!(seen.lock().as_deref(), Some("v"));
        Ok(())
    }
}
