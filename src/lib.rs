//! Web Storage change-notification events.
//!
//! A [`StorageEvent`] reports a mutation of a storage area: which key
//! changed, its value before and after, the URL of the document that made
//! the change and a non-owning reference back to the [`Storage`] object.
//! Events are immutable once constructed and are shared as
//! `Arc<StorageEvent>` between every observer that receives them.
//!
//! ```
//! use storage_event::{EventLike, StorageEvent, StorageEventInit};
//!
//! let init = StorageEventInit::new()
//!     .key("theme")
//!     .old_value("dark")
//!     .new_value("light")
//!     .url("https://example.com/app");
//! let event = StorageEvent::new(Some("storage"), Some(init))?;
//! assert_eq!(event.event_type(), "storage");
//! assert_eq!(event.old_value(), Some("dark"));
//! assert!(event.storage_area().is_none());
//! # Ok::<(), storage_event::Error>(())
//! ```
//!
//! Storage areas come from a [`StorageManager`], which partitions data by
//! origin and fires trusted events at the observers of the area that was
//! mutated.

mod bindings;
mod config;
mod event;
mod location;
mod manager;
mod storage;
mod storage_event;
mod trace;

pub use bindings::{AttributeValue, STORAGE_EVENT_ATTRIBUTES};
pub use config::StorageConfig;
pub use event::{Event, EventInit, EventLike};
pub use location::{LocationParts, OPAQUE_ORIGIN};
pub use manager::StorageManager;
pub use storage::{ObserverId, Storage, StorageArea, StorageKind, StorageObserver};
pub use storage_event::{STORAGE_EVENT_TYPE, StorageEvent, StorageEventInit};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("missing required field: {0}")]
    MissingRequiredField(&'static str),
    #[error("invalid init dictionary: {0}")]
    InvalidInit(String),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("security error: {0}")]
    Security(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
