//! Inbound commands to the stream service.
//!
//! Transports deliver named events with a JSON body.  Only topic
//! membership changes are understood here; everything else is ignored.

use serde_json::Value;

use crate::entity::EntityId;

/// Commands a transport can send into the stream core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamCommand {
    /// Join `entity`'s topic and make sure it is being simulated.
    Subscribe(EntityId),
    /// Leave `entity`'s topic.
    Unsubscribe(EntityId),
}

impl StreamCommand {
    /// Map a transport event onto a command.
    ///
    /// Accepts `subscribe`/`subscribe_pet` and `unsubscribe`/`unsubscribe_pet`
    /// with the id under `entity_id` or `pet_id`.  Unknown events and a
    /// missing, zero or malformed id yield `None`.
    pub fn parse(event: &str, data: &Value) -> Option<Self> {
        let ctor: fn(EntityId) -> Self = match event {
            "subscribe" | "subscribe_pet" => Self::Subscribe,
            "unsubscribe" | "unsubscribe_pet" => Self::Unsubscribe,
            _ => return None,
        };
        let raw = data.get("entity_id").or_else(|| data.get("pet_id"))?;
        EntityId::from_json(raw).map(ctor)
    }

    /// Like [`parse`](Self::parse) but from the raw body text.
    pub fn parse_str(event: &str, body: &str) -> Option<Self> {
        let data: Value = serde_json::from_str(body).ok()?;
        Self::parse(event, &data)
    }

    pub fn entity(self) -> EntityId {
        match self {
            Self::Subscribe(e) | Self::Unsubscribe(e) => e,
        }
    }
}
