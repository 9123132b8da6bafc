//! Reflection surface for a bindings layer.
//!
//! Attribute and dictionary member names here are the interoperable
//! spellings and are matched case-sensitively.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::event::{EventInit, EventLike};
use crate::storage::Storage;
use crate::storage_event::{StorageEvent, StorageEventInit};
use crate::{Error, Result};

/// Attributes a storage event adds to the generic event attributes.
pub const STORAGE_EVENT_ATTRIBUTES: [&str; 5] =
    ["key", "oldValue", "newValue", "url", "storageArea"];

/// Value of a reflected attribute.
#[derive(Clone)]
pub enum AttributeValue {
    Null,
    Boolean(bool),
    Number(i64),
    String(String),
    Storage(Arc<dyn Storage>),
}

impl AttributeValue {
    fn from_nullable(value: Option<&str>) -> Self {
        value.map_or(Self::Null, |value| Self::String(value.to_string()))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Debug for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Boolean(value) => f.debug_tuple("Boolean").field(value).finish(),
            Self::Number(value) => f.debug_tuple("Number").field(value).finish(),
            Self::String(value) => f.debug_tuple("String").field(value).finish(),
            Self::Storage(_) => f.write_str("Storage(..)"),
        }
    }
}

impl PartialEq for AttributeValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Boolean(left), Self::Boolean(right)) => left == right,
            (Self::Number(left), Self::Number(right)) => left == right,
            (Self::String(left), Self::String(right)) => left == right,
            (Self::Storage(left), Self::Storage(right)) => Arc::ptr_eq(left, right),
            _ => false,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StorageEventDictionary {
    #[serde(flatten)]
    event: EventInit,
    #[serde(default)]
    key: Option<String>,
    #[serde(default)]
    old_value: Option<String>,
    #[serde(default)]
    new_value: Option<String>,
    #[serde(default)]
    url: String,
    #[serde(default)]
    storage_area: Option<Value>,
}

impl StorageEventInit {
    /// Reads an init record from a bindings dictionary.
    ///
    /// Absent and `null` members are equivalent. Unknown members are
    /// ignored. `storageArea` is a reference and cannot be carried as data:
    /// any non-null value for it is rejected. Attach the area with the
    /// `storage_area` builder method instead.
    pub fn from_dictionary(dict: &Value) -> Result<Self> {
        if !dict.is_object() {
            return Err(Error::InvalidInit(format!(
                "StorageEventInit must be an object, got {dict}"
            )));
        }
        let dictionary = StorageEventDictionary::deserialize(dict)
            .map_err(|err| Error::InvalidInit(err.to_string()))?;
        if dictionary.storage_area.is_some_and(|area| !area.is_null()) {
            return Err(Error::InvalidInit(
                "storageArea must be supplied as a reference".into(),
            ));
        }
        Ok(Self {
            event: dictionary.event,
            key: dictionary.key,
            old_value: dictionary.old_value,
            new_value: dictionary.new_value,
            url: dictionary.url,
            storage_area: None,
        })
    }
}

impl StorageEvent {
    pub fn from_dictionary(event_type: Option<&str>, dict: &Value) -> Result<Self> {
        let init = StorageEventInit::from_dictionary(dict)?;
        Self::new(event_type, Some(init))
    }

    /// Reads an attribute by its reflected name; unknown names give `None`.
    pub fn get_attribute(&self, name: &str) -> Option<AttributeValue> {
        let value = match name {
            "type" => AttributeValue::String(self.event_type().to_string()),
            "bubbles" => AttributeValue::Boolean(self.bubbles()),
            "cancelable" => AttributeValue::Boolean(self.cancelable()),
            "composed" => AttributeValue::Boolean(self.composed()),
            "isTrusted" => AttributeValue::Boolean(self.is_trusted()),
            "timeStamp" => AttributeValue::Number(self.time_stamp_ms()),
            "key" => AttributeValue::from_nullable(self.key()),
            "oldValue" => AttributeValue::from_nullable(self.old_value()),
            "newValue" => AttributeValue::from_nullable(self.new_value()),
            "url" => AttributeValue::String(self.url().to_string()),
            "storageArea" => self
                .storage_area()
                .map_or(AttributeValue::Null, AttributeValue::Storage),
            _ => return None,
        };
        Some(value)
    }
}
