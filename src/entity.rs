//! Entity identifiers and the topic names derived from them.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier of a simulated subject (a pet).
///
/// Ids are supplied by the caller; zero is reserved as "missing" so that
/// a falsy id in a trigger payload is ignored rather than simulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(u64);

impl EntityId {
    /// Wrap a raw id.  Returns `None` for the reserved value 0.
    pub const fn new(raw: u64) -> Option<Self> {
        if raw == 0 { None } else { Some(Self(raw)) }
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    /// Parse an id from a loosely-typed trigger field.
    ///
    /// Accepts positive integers and strings holding one (`"12"`).
    /// Everything else (negative, fractional, zero, bool, null, object)
    /// yields `None`.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => n.as_u64().and_then(Self::new),
            serde_json::Value::String(s) => s.trim().parse::<u64>().ok().and_then(Self::new),
            _ => None,
        }
    }

    /// Broadcast topic carrying this entity's tick payloads.
    pub fn topic(self) -> Topic {
        Topic(self)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Topic name derived 1:1 from an [`EntityId`], rendered `entity_{id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Topic(EntityId);

impl Topic {
    pub fn entity(self) -> EntityId {
        self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity_{}", self.0)
    }
}
