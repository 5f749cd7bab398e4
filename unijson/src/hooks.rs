//! Customization points.
//!
//! Objects opt out of structural mapping with [`JsonSerialize`] and
//! [`JsonDeserialize`], or observe it with the listener traits. The
//! listeners fire for structural passes only, never for the opt-out path.
//! Each implementation must also be registered on the class descriptor
//! (see [`ClassBuilder`](crate::reflect::ClassBuilder)).
//!
//! Applications override the engine for any value with [`SerializeHook`],
//! [`DeserializeHook`] and [`Instantiater`](crate::Instantiater).
use std::collections::HashSet;

use crate::de::Deserializer;
use crate::error::Result;
use crate::node::Node;
use crate::options::NodeOptions;
use crate::reflect::Reflect;
use crate::ser::Serializer;

/// Full control over an object's JSON text.
pub trait JsonSerialize {
    /// Returns compact JSON text, or `None` for null.
    fn serialize_json(&self, ser: &Serializer) -> Result<Option<String>>;
}

/// Full control over reading an object from a node.
pub trait JsonDeserialize {
    fn deserialize_json(&mut self, node: &Node, de: &Deserializer) -> Result<()>;
}

/// Notified around the structural serialization of an object.
pub trait SerializationListener {
    fn on_serialization_will_begin(&self, _ser: &Serializer) {}
    fn on_serialization_succeeded(&self, _ser: &Serializer) {}
    fn on_serialization_failed(&self, _ser: &Serializer) {}
}

/// Notified around the structural deserialization of an object.
pub trait DeserializationListener {
    fn on_deserialization_will_begin(&mut self, _de: &Deserializer) {}
    fn on_deserialization_succeeded(&mut self, _de: &Deserializer) {}
    fn on_deserialization_failed(&mut self, _de: &Deserializer) {}
}

/// Application override consulted before any other serialization logic.
pub trait SerializeHook: Send + Sync {
    /// `Ok(None)` lets the engine proceed. `Ok(Some(text))` is used
    /// verbatim, where a `None` text means null.
    fn try_serialize(
        &self,
        ser: &Serializer,
        value: &dyn Reflect,
        options: NodeOptions
    ) -> Result<Option<Option<String>>>;
}

/// Application override consulted before deserializing onto an instance.
pub trait DeserializeHook: Send + Sync {
    /// Returns `true` when the hook has handled `obj`.
    fn try_deserialize_on(
        &self,
        de: &Deserializer,
        obj: &mut dyn Reflect,
        node: &Node,
        options: NodeOptions,
        ignored_keys: &HashSet<String>
    ) -> Result<bool>;
}
