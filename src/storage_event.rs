use std::sync::{Arc, Weak};

use crate::Result;
use crate::event::{Event, EventInit, EventLike};
use crate::storage::Storage;

/// Type of the events fired by storage areas.
pub const STORAGE_EVENT_TYPE: &str = "storage";

/// Initialization record for [`StorageEvent::new`].
///
/// Every member is optional. Absent members resolve to `None`, except `url`
/// which resolves to the empty string. The storage area is held weakly so an
/// init record never keeps a storage object alive either.
#[derive(Debug, Clone, Default)]
pub struct StorageEventInit {
    pub event: EventInit,
    pub key: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub url: String,
    pub storage_area: Option<Weak<dyn Storage>>,
}

impl StorageEventInit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn event(mut self, event: EventInit) -> Self {
        self.event = event;
        self
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn old_value(mut self, old_value: impl Into<String>) -> Self {
        self.old_value = Some(old_value.into());
        self
    }

    pub fn new_value(mut self, new_value: impl Into<String>) -> Self {
        self.new_value = Some(new_value.into());
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn storage_area<S>(mut self, area: &Arc<S>) -> Self
    where
        S: Storage + 'static,
    {
        self.storage_area = Some(Arc::downgrade(area) as Weak<dyn Storage>);
        self
    }

    pub fn storage_area_dyn(mut self, area: &Arc<dyn Storage>) -> Self {
        self.storage_area = Some(Arc::downgrade(area));
        self
    }
}

/// A change notification for a storage area.
///
/// All fields are fixed at construction; the type has no setters. Cloning
/// produces an independent, equal value.
#[derive(Debug, Clone)]
pub struct StorageEvent {
    event: Event,
    key: Option<String>,
    old_value: Option<String>,
    new_value: Option<String>,
    url: String,
    storage_area: Option<Weak<dyn Storage>>,
}

impl StorageEvent {
    /// Builds an event from a type and an optional init record.
    ///
    /// Fails with [`crate::Error::MissingRequiredField`] when `event_type` is
    /// `None`. No other input is rejected, and no cross-field constraint is
    /// applied: a null key with non-null values is accepted as given.
    pub fn new(event_type: Option<&str>, init: Option<StorageEventInit>) -> Result<Self> {
        let init = init.unwrap_or_default();
        let event = Event::new(event_type, init.event)?;
        tracing::trace!(
            event_type = event.event_type(),
            key = ?init.key,
            "constructed storage event"
        );
        Ok(Self::from_parts(event, init))
    }

    /// Trusted `storage` event fired by a storage area at `time_stamp_ms`.
    pub(crate) fn fired(init: StorageEventInit, time_stamp_ms: i64) -> Self {
        let event = Event::trusted(STORAGE_EVENT_TYPE, init.event, time_stamp_ms);
        Self::from_parts(event, init)
    }

    fn from_parts(event: Event, init: StorageEventInit) -> Self {
        Self {
            event,
            key: init.key,
            old_value: init.old_value,
            new_value: init.new_value,
            url: init.url,
            storage_area: init.storage_area,
        }
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn old_value(&self) -> Option<&str> {
        self.old_value.as_deref()
    }

    pub fn new_value(&self) -> Option<&str> {
        self.new_value.as_deref()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// The storage object the change happened in, if it is still alive.
    ///
    /// Once the referent has been dropped this returns `None` on every
    /// subsequent call.
    pub fn storage_area(&self) -> Option<Arc<dyn Storage>> {
        self.storage_area.as_ref().and_then(Weak::upgrade)
    }

    /// Whether this event was created with a reference to `area`.
    pub fn refers_to<S>(&self, area: &Arc<S>) -> bool
    where
        S: Storage + 'static,
    {
        let candidate = Arc::downgrade(area) as Weak<dyn Storage>;
        self.storage_area
            .as_ref()
            .is_some_and(|weak| Weak::ptr_eq(weak, &candidate))
    }

    /// Key, old and new value are all null, which storage areas use to
    /// report `clear()`.
    pub fn is_storage_cleared(&self) -> bool {
        self.key.is_none() && self.old_value.is_none() && self.new_value.is_none()
    }
}

impl EventLike for StorageEvent {
    fn event(&self) -> &Event {
        &self.event
    }
}

impl PartialEq for StorageEvent {
    fn eq(&self, other: &Self) -> bool {
        let same_area = match (&self.storage_area, &other.storage_area) {
            (None, None) => true,
            (Some(left), Some(right)) => Weak::ptr_eq(left, right),
            _ => false,
        };
        same_area
            && self.event == other.event
            && self.key == other.key
            && self.old_value == other.old_value
            && self.new_value == other.new_value
            && self.url == other.url
    }
}

impl Eq for StorageEvent {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[derive(Default)]
    struct NullStorage;

    impl Storage for NullStorage {
        fn length(&self) -> usize {
            0
        }

        fn key(&self, _index: usize) -> Option<String> {
            None
        }

        fn get_item(&self, _key: &str) -> Option<String> {
            None
        }

        fn set_item(&self, _key: &str, _value: &str) {}

        fn remove_item(&self, _key: &str) {}

        fn clear(&self) {}
    }

    #[test]
    fn absent_init_resolves_every_default() -> Result<()> {
        let event = StorageEvent::new(Some("storage"), None)?;
        assert_eq!(event.event_type(), "storage");
        assert_eq!(event.key(), None);
        assert_eq!(event.old_value(), None);
        assert_eq!(event.new_value(), None);
        assert_eq!(event.url(), "");
        assert!(event.storage_area().is_none());
        assert!(!event.bubbles());
        assert!(!event.cancelable());
        assert!(!event.is_trusted());
        Ok(())
    }

    #[test]
    fn empty_init_matches_absent_init() -> Result<()> {
        let from_empty = StorageEvent::new(Some("storage"), Some(StorageEventInit::new()))?;
        let from_absent = StorageEvent::new(Some("storage"), None)?;
        assert_eq!(from_empty, from_absent);
        Ok(())
    }

    #[test]
    fn missing_type_fails_regardless_of_init() {
        let init = StorageEventInit::new().key("k").url("https://example.com/");
        assert_eq!(
            StorageEvent::new(None, Some(init)),
            Err(Error::MissingRequiredField("type"))
        );
        assert_eq!(
            StorageEvent::new(None, None),
            Err(Error::MissingRequiredField("type"))
        );
    }

    #[test]
    fn empty_string_value_is_distinct_from_null() -> Result<()> {
        let init = StorageEventInit::new().new_value("");
        let event = StorageEvent::new(Some("storage"), Some(init))?;
        assert_eq!(event.new_value(), Some(""));
        assert_eq!(event.old_value(), None);
        Ok(())
    }

    #[test]
    fn null_key_with_values_is_accepted() -> Result<()> {
        let init = StorageEventInit::new().old_value("a").new_value("b");
        let event = StorageEvent::new(Some("storage"), Some(init))?;
        assert_eq!(event.key(), None);
        assert_eq!(event.new_value(), Some("b"));
        assert!(!event.is_storage_cleared());
        Ok(())
    }

    #[test]
    fn base_event_options_pass_through() -> Result<()> {
        let init = StorageEventInit::new().event(EventInit::new().bubbles(true).cancelable(true));
        let event = StorageEvent::new(Some("custom-storage"), Some(init))?;
        assert_eq!(event.event_type(), "custom-storage");
        assert!(event.bubbles());
        assert!(event.cancelable());
        assert!(!event.composed());
        Ok(())
    }

    #[test]
    fn storage_area_reference_does_not_keep_referent_alive() -> Result<()> {
        let area = Arc::new(NullStorage);
        let event = StorageEvent::new(
            Some("storage"),
            Some(StorageEventInit::new().storage_area(&area)),
        )?;
        assert!(event.storage_area().is_some());
        assert!(event.refers_to(&area));
        assert_eq!(Arc::strong_count(&area), 1);

        drop(area);
        assert!(event.storage_area().is_none());
        assert!(event.storage_area().is_none());
        Ok(())
    }

    #[test]
    fn equality_compares_storage_area_identity() -> Result<()> {
        let first = Arc::new(NullStorage);
        let second = Arc::new(NullStorage);
        let build = |area: &Arc<NullStorage>| {
            StorageEvent::new(
                Some("storage"),
                Some(StorageEventInit::new().key("k").storage_area(area)),
            )
        };
        assert_eq!(build(&first)?, build(&first)?);
        assert_ne!(build(&first)?, build(&second)?);
        assert_ne!(
            build(&first)?,
            StorageEvent::new(Some("storage"), Some(StorageEventInit::new().key("k")))?
        );
        Ok(())
    }

    #[test]
    fn fired_event_is_trusted_storage_type() {
        let event = StorageEvent::fired(StorageEventInit::new().key("k"), 42);
        assert_eq!(event.event_type(), STORAGE_EVENT_TYPE);
        assert!(event.is_trusted());
        assert_eq!(event.time_stamp_ms(), 42);
    }
}
