use serde::Deserialize;

use crate::{Error, Result};

/// Options shared by every event constructor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EventInit {
    pub bubbles: bool,
    pub cancelable: bool,
    pub composed: bool,
}

impl EventInit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bubbles(mut self, bubbles: bool) -> Self {
        self.bubbles = bubbles;
        self
    }

    pub fn cancelable(mut self, cancelable: bool) -> Self {
        self.cancelable = cancelable;
        self
    }

    pub fn composed(mut self, composed: bool) -> Self {
        self.composed = composed;
        self
    }
}

/// The generic part of every event: its type, propagation flags, trust and
/// creation time. Fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    event_type: String,
    bubbles: bool,
    cancelable: bool,
    composed: bool,
    is_trusted: bool,
    time_stamp_ms: i64,
}

impl Event {
    /// Constructs an untrusted event the way a script constructor would.
    ///
    /// Any type string is accepted, including the empty string. Only an
    /// absent type is rejected.
    pub fn new(event_type: Option<&str>, init: EventInit) -> Result<Self> {
        let Some(event_type) = event_type else {
            return Err(Error::MissingRequiredField("type"));
        };
        Ok(Self::with_trust(event_type, init, false, 0))
    }

    pub(crate) fn trusted(event_type: &str, init: EventInit, time_stamp_ms: i64) -> Self {
        Self::with_trust(event_type, init, true, time_stamp_ms)
    }

    fn with_trust(event_type: &str, init: EventInit, is_trusted: bool, time_stamp_ms: i64) -> Self {
        Self {
            event_type: event_type.to_string(),
            bubbles: init.bubbles,
            cancelable: init.cancelable,
            composed: init.composed,
            is_trusted,
            time_stamp_ms,
        }
    }
}

/// Read access to the generic event fields.
///
/// Concrete event types compose an [`Event`] and expose it through
/// [`EventLike::event`]; the remaining accessors come for free.
pub trait EventLike {
    fn event(&self) -> &Event;

    fn event_type(&self) -> &str {
        &self.event().event_type
    }

    fn bubbles(&self) -> bool {
        self.event().bubbles
    }

    fn cancelable(&self) -> bool {
        self.event().cancelable
    }

    fn composed(&self) -> bool {
        self.event().composed
    }

    fn is_trusted(&self) -> bool {
        self.event().is_trusted
    }

    fn time_stamp_ms(&self) -> i64 {
        self.event().time_stamp_ms
    }
}

impl EventLike for Event {
    fn event(&self) -> &Event {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_constructed_event_is_untrusted_with_zero_time_stamp() -> Result<()> {
        let event = Event::new(Some("custom"), EventInit::new().bubbles(true))?;
        assert_eq!(event.event_type(), "custom");
        assert!(event.bubbles());
        assert!(!event.cancelable());
        assert!(!event.composed());
        assert!(!event.is_trusted());
        assert_eq!(event.time_stamp_ms(), 0);
        Ok(())
    }

    #[test]
    fn missing_type_is_rejected() {
        assert_eq!(
            Event::new(None, EventInit::default()),
            Err(Error::MissingRequiredField("type"))
        );
    }

    #[test]
    fn empty_type_is_accepted() -> Result<()> {
        let event = Event::new(Some(""), EventInit::default())?;
        assert_eq!(event.event_type(), "");
        Ok(())
    }

    #[test]
    fn trusted_event_keeps_clock_time() {
        let event = Event::trusted("storage", EventInit::default(), 1_250);
        assert!(event.is_trusted());
        assert_eq!(event.time_stamp_ms(), 1_250);
    }

    #[test]
    fn event_init_reads_dictionary_members() {
        let init: EventInit = serde_json::from_str(r#"{"bubbles":true,"composed":true}"#)
            .expect("dictionary should parse");
        assert_eq!(init, EventInit::new().bubbles(true).composed(true));
    }
}
