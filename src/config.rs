//! Desired-state model.
//!
//! A [`DesiredConfig`] is an insertion-ordered set of sections, each holding
//! insertion-ordered key/value entries. Order is load-bearing: the engine
//! processes keys exactly in declaration order, which is what lets a block of
//! GNSS parameters share a single power-off/power-on bracket.
//!
//! Loading the document from a file is the caller's job; the hand-written
//! serde impls below keep the document order intact, so a YAML or JSON
//! deserializer on the host side produces the processing order the file
//! spells out.

use core::fmt;

use heapless::{String, Vec};
use serde::de::{self, Deserialize, Deserializer, MapAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, Serializer};

pub const MAX_SECTIONS: usize = 8;
pub const MAX_ENTRIES: usize = 16;
pub const SECTION_NAME_LEN: usize = 16;
pub const KEY_NAME_LEN: usize = 32;
pub const VALUE_LEN: usize = 64;

pub type SectionName = String<SECTION_NAME_LEN>;
pub type KeyName = String<KEY_NAME_LEN>;
pub type ValueString = String<VALUE_LEN>;

/// A bounded collection or string ran out of room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CapacityError;

impl fmt::Display for CapacityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("configuration capacity exceeded")
    }
}

/// A declared configuration value.
///
/// Closed sum over the three scalar shapes a configuration document can
/// declare, so the codec can match exhaustively instead of inspecting types
/// at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Value {
    Bool(bool),
    Int(i32),
    Text(ValueString),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n)
    }
}

impl TryFrom<&str> for Value {
    type Error = CapacityError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        ValueString::try_from(s)
            .map(Value::Text)
            .map_err(|_| CapacityError)
    }
}

/// One `key: value` line of a section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub(crate) key: KeyName,
    pub(crate) value: Value,
}

impl Entry {
    pub fn key(&self) -> &str {
        self.key.as_str()
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

/// A named, ordered run of entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub(crate) name: SectionName,
    pub(crate) entries: Vec<Entry, MAX_ENTRIES>,
}

impl Section {
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }
}

/// The declared desired state for one reconciliation run.
///
/// Immutable during a run; the engine takes it by reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesiredConfig {
    sections: Vec<Section, MAX_SECTIONS>,
}

impl DesiredConfig {
    pub const fn new() -> Self {
        Self {
            sections: Vec::new(),
        }
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Declares `section.key = value`, appending in declaration order.
    ///
    /// Re-declaring an existing key overwrites its value in place and keeps
    /// its original position.
    pub fn set(&mut self, section: &str, key: &str, value: Value) -> Result<(), CapacityError> {
        if !self.sections.iter().any(|s| s.name.as_str() == section) {
            let name = SectionName::try_from(section).map_err(|_| CapacityError)?;
            self.sections
                .push(Section {
                    name,
                    entries: Vec::new(),
                })
                .map_err(|_| CapacityError)?;
        }
        // Just pushed if it was absent.
        let slot = match self.sections.iter_mut().find(|s| s.name.as_str() == section) {
            Some(slot) => slot,
            None => return Err(CapacityError),
        };
        if let Some(entry) = slot.entries.iter_mut().find(|e| e.key.as_str() == key) {
            entry.value = value;
            return Ok(());
        }
        let key = KeyName::try_from(key).map_err(|_| CapacityError)?;
        slot.entries
            .push(Entry { key, value })
            .map_err(|_| CapacityError)
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&Value> {
        self.sections
            .iter()
            .find(|s| s.name.as_str() == section)?
            .entries
            .iter()
            .find(|e| e.key.as_str() == key)
            .map(|e| &e.value)
    }

    /// Total number of declared keys across all sections.
    pub fn len(&self) -> usize {
        self.sections.iter().map(|s| s.entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.iter().all(|s| s.entries.is_empty())
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(n) => serializer.serialize_i32(*n),
            Value::Text(s) => serializer.serialize_str(s.as_str()),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ValueVisitor;

        impl<'de> Visitor<'de> for ValueVisitor {
            type Value = Value;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a boolean, an integer or a string")
            }

            fn visit_bool<E: de::Error>(self, b: bool) -> Result<Self::Value, E> {
                Ok(Value::Bool(b))
            }

            fn visit_i64<E: de::Error>(self, n: i64) -> Result<Self::Value, E> {
                i32::try_from(n)
                    .map(Value::Int)
                    .map_err(|_| E::custom("integer value out of range"))
            }

            fn visit_u64<E: de::Error>(self, n: u64) -> Result<Self::Value, E> {
                i32::try_from(n)
                    .map(Value::Int)
                    .map_err(|_| E::custom("integer value out of range"))
            }

            fn visit_str<E: de::Error>(self, s: &str) -> Result<Self::Value, E> {
                ValueString::try_from(s)
                    .map(Value::Text)
                    .map_err(|_| E::custom("string value too long"))
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}

struct EntriesRef<'a>(&'a [Entry]);

impl Serialize for EntriesRef<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for entry in self.0 {
            map.serialize_entry(entry.key.as_str(), &entry.value)?;
        }
        map.end()
    }
}

impl Serialize for DesiredConfig {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.sections.len()))?;
        for section in &self.sections {
            map.serialize_entry(section.name.as_str(), &EntriesRef(&section.entries))?;
        }
        map.end()
    }
}

struct SectionEntries(Vec<Entry, MAX_ENTRIES>);

impl<'de> Deserialize<'de> for SectionEntries {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = SectionEntries;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of parameter keys to scalar values")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::new();
                while let Some((key, value)) = map.next_entry::<KeyName, Value>()? {
                    entries
                        .push(Entry { key, value })
                        .map_err(|_| de::Error::custom("too many keys in section"))?;
                }
                Ok(SectionEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

impl<'de> Deserialize<'de> for DesiredConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ConfigVisitor;

        impl<'de> Visitor<'de> for ConfigVisitor {
            type Value = DesiredConfig;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of section names to key/value maps")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut config = DesiredConfig::new();
                while let Some((name, entries)) =
                    map.next_entry::<SectionName, SectionEntries>()?
                {
                    config
                        .sections
                        .push(Section {
                            name,
                            entries: entries.0,
                        })
                        .map_err(|_| de::Error::custom("too many sections"))?;
                }
                Ok(config)
            }
        }

        deserializer.deserialize_map(ConfigVisitor)
    }
}
