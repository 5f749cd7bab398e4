//! The JSON value tree
use core::fmt;
use core::ops::Index;
use std::borrow::Cow;

use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use unijson_write::{JsonWrite, WriteResult};

use crate::ser::{format_escaped_str, format_f32, format_f64};

static ABSENT: Node = Node::Absent;

/// One node of a parsed JSON document.
///
/// `Absent` is what indexing a missing key or position yields. The engine
/// treats it exactly like `Null`, but the two remain distinguishable.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Node {
    #[default]
    Absent,
    Null,
    Bool(bool),
    /// Number kept in its source text form.
    Number(String),
    String(String),
    Array(Vec<Node>),
    /// Members in insertion order with unique keys.
    Object(Vec<(String, Node)>),
}

/// Node kinds, mainly for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Absent,
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
}

impl Node {
    /// Create an empty object node.
    pub fn object() -> Self {
        Node::Object(Vec::new())
    }

    /// Create an empty array node.
    pub fn array() -> Self {
        Node::Array(Vec::new())
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Absent => NodeKind::Absent,
            Node::Null => NodeKind::Null,
            Node::Bool(..) => NodeKind::Bool,
            Node::Number(..) => NodeKind::Number,
            Node::String(..) => NodeKind::String,
            Node::Array(..) => NodeKind::Array,
            Node::Object(..) => NodeKind::Object,
        }
    }

    #[inline]
    pub fn is_absent(&self) -> bool {
        matches!(self, Node::Absent)
    }

    /// Returns `true` for both `null` and absent nodes.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Node::Null|Node::Absent)
    }

    #[inline]
    pub fn is_bool(&self) -> bool {
        matches!(self, Node::Bool(..))
    }

    #[inline]
    pub fn is_number(&self) -> bool {
        matches!(self, Node::Number(..))
    }

    #[inline]
    pub fn is_string(&self) -> bool {
        matches!(self, Node::String(..))
    }

    #[inline]
    pub fn is_array(&self) -> bool {
        matches!(self, Node::Array(..))
    }

    #[inline]
    pub fn is_object(&self) -> bool {
        matches!(self, Node::Object(..))
    }

    /// Number of object members or array elements, `0` for scalars.
    pub fn count(&self) -> usize {
        match self {
            Node::Array(elements) => elements.len(),
            Node::Object(members) => members.len(),
            _ => 0
        }
    }

    /// Look up an object member.
    pub fn get(&self, key: &str) -> Option<&Node> {
        match self {
            Node::Object(members) => members.iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v),
            _ => None
        }
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Node> {
        match self {
            Node::Object(members) => members.iter_mut()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v),
            _ => None
        }
    }

    /// Look up an array element.
    pub fn get_index(&self, index: usize) -> Option<&Node> {
        match self {
            Node::Array(elements) => elements.get(index),
            _ => None
        }
    }

    /// Insert or replace an object member keeping its original position.
    ///
    /// Turns a non-object node into an empty object first.
    pub fn insert(&mut self, key: impl Into<String>, value: Node) -> Option<Node> {
        let key = key.into();
        if !self.is_object() {
            *self = Node::object();
        }
        let Node::Object(members) = self else { return None };
        match members.iter_mut().find(|(k, _)| *k == key) {
            Some((_, old)) => Some(core::mem::replace(old, value)),
            None => {
                members.push((key, value));
                None
            }
        }
    }

    /// Append an array element.
    ///
    /// Turns a non-array node into an empty array first.
    pub fn push(&mut self, value: Node) {
        if !self.is_array() {
            *self = Node::array();
        }
        if let Node::Array(elements) = self {
            elements.push(value);
        }
    }

    /// Iterate object members in insertion order.
    pub fn members(&self) -> impl Iterator<Item = (&str, &Node)> {
        let members = match self {
            Node::Object(members) => members.as_slice(),
            _ => &[]
        };
        members.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterate array elements.
    pub fn elements(&self) -> impl Iterator<Item = &Node> {
        let elements = match self {
            Node::Array(elements) => elements.as_slice(),
            _ => &[]
        };
        elements.iter()
    }

    /// Scalar text of the node: string contents, number text,
    /// `true`/`false` or `null`. Empty for absent nodes and containers.
    pub fn value(&self) -> Cow<'_, str> {
        match self {
            Node::String(s) | Node::Number(s) => Cow::Borrowed(s),
            Node::Bool(true) => Cow::Borrowed("true"),
            Node::Bool(false) => Cow::Borrowed("false"),
            Node::Null => Cow::Borrowed("null"),
            _ => Cow::Borrowed("")
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::String(s) => Some(s),
            _ => None
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Node::Bool(b) => Some(*b),
            _ => None
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Node::Number(n) => n.parse().ok(),
            _ => None
        }
    }

    /// Write the node as compact JSON text.
    pub fn write_to<W: JsonWrite + ?Sized>(&self, out: &mut W) -> WriteResult<()> {
        match self {
            Node::Absent|Node::Null => out.write(b"null"),
            Node::Bool(b) => out.write(if *b { b"true" } else { b"false" }),
            Node::Number(n) => out.write_str(n),
            Node::String(s) => format_escaped_str(out, s),
            Node::Array(elements) => {
                out.write_byte(b'[')?;
                for (i, element) in elements.iter().enumerate() {
                    if i != 0 {
                        out.write_byte(b',')?;
                    }
                    element.write_to(out)?;
                }
                out.write_byte(b']')
            }
            Node::Object(members) => {
                out.write_byte(b'{')?;
                for (i, (key, value)) in members.iter().enumerate() {
                    if i != 0 {
                        out.write_byte(b',')?;
                    }
                    format_escaped_str(out, key)?;
                    out.write_byte(b':')?;
                    value.write_to(out)?;
                }
                out.write_byte(b'}')
            }
        }
    }
}

impl Index<&str> for Node {
    type Output = Node;

    /// Never panics: missing members and non-objects yield an absent node.
    fn index(&self, key: &str) -> &Node {
        self.get(key).unwrap_or(&ABSENT)
    }
}

impl Index<usize> for Node {
    type Output = Node;

    /// Never panics: missing elements and non-arrays yield an absent node.
    fn index(&self, index: usize) -> &Node {
        self.get_index(index).unwrap_or(&ABSENT)
    }
}

struct FmtWriter<'a, 'b>(&'a mut fmt::Formatter<'b>);

impl JsonWrite for FmtWriter<'_, '_> {
    fn write(&mut self, buf: &[u8]) -> WriteResult<()> {
        let s = String::from_utf8_lossy(buf);
        self.0.write_str(&s).map_err(|_| unijson_write::WriteError::BufferFull)
    }

    fn write_str(&mut self, s: &str) -> WriteResult<()> {
        self.0.write_str(s).map_err(|_| unijson_write::WriteError::BufferFull)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_to(&mut FmtWriter(f)).map_err(|_| fmt::Error)
    }
}

impl From<bool> for Node {
    fn from(v: bool) -> Self {
        Node::Bool(v)
    }
}

impl From<&str> for Node {
    fn from(v: &str) -> Self {
        Node::String(v.to_owned())
    }
}

impl From<String> for Node {
    fn from(v: String) -> Self {
        Node::String(v)
    }
}

impl From<Vec<Node>> for Node {
    fn from(v: Vec<Node>) -> Self {
        Node::Array(v)
    }
}

macro_rules! impl_from_integer {
    ($($ty:ty),*) => {$(
        impl From<$ty> for Node {
            fn from(v: $ty) -> Self {
                Node::Number(itoa::Buffer::new().format(v).to_owned())
            }
        }
    )*};
}

impl_from_integer!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl From<f64> for Node {
    /// Non-finite numbers become `null`.
    fn from(v: f64) -> Self {
        let mut text = String::new();
        match format_f64(&mut text, v) {
            Ok(true) => Node::Number(text),
            _ => Node::Null
        }
    }
}

impl From<f32> for Node {
    fn from(v: f32) -> Self {
        let mut text = String::new();
        match format_f32(&mut text, v) {
            Ok(true) => Node::Number(text),
            _ => Node::Null
        }
    }
}

impl serde::Serialize for Node {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Node::Absent|Node::Null => serializer.serialize_unit(),
            Node::Bool(b) => serializer.serialize_bool(*b),
            Node::Number(n) => {
                if let Ok(v) = n.parse::<u64>() {
                    serializer.serialize_u64(v)
                }
                else if let Ok(v) = n.parse::<i64>() {
                    serializer.serialize_i64(v)
                }
                else {
                    let v = n.parse::<f64>().map_err(serde::ser::Error::custom)?;
                    serializer.serialize_f64(v)
                }
            }
            Node::String(s) => serializer.serialize_str(s),
            Node::Array(elements) => {
                let mut seq = serializer.serialize_seq(Some(elements.len()))?;
                for element in elements {
                    seq.serialize_element(element)?;
                }
                seq.end()
            }
            Node::Object(members) => {
                let mut map = serializer.serialize_map(Some(members.len()))?;
                for (key, value) in members {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

struct NodeVisitor;

impl<'de> Visitor<'de> for NodeVisitor {
    type Value = Node;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any JSON value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Node, E> {
        Ok(Node::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Node, E> {
        Ok(Node::from(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Node, E> {
        Ok(Node::from(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Node, E> {
        Ok(Node::from(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Node, E> {
        Ok(Node::from(v))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Node, E> {
        Ok(Node::String(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Node, E> {
        Ok(Node::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Node, E> {
        Ok(Node::Null)
    }

    fn visit_some<D: serde::Deserializer<'de>>(self, deserializer: D) -> Result<Node, D::Error> {
        serde::Deserialize::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Node, A::Error> {
        let mut elements = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(element) = seq.next_element()? {
            elements.push(element);
        }
        Ok(Node::Array(elements))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Node, A::Error> {
        let mut node = Node::object();
        while let Some((key, value)) = map.next_entry::<String, Node>()? {
            node.insert(key, value);
        }
        Ok(node)
    }
}

impl<'de> serde::Deserialize<'de> for Node {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(NodeVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Node {
        let mut node = Node::object();
        node.insert("name", Node::from("box"));
        node.insert("size", Node::from(3));
        let mut tags = Node::array();
        tags.push(Node::from(true));
        tags.push(Node::Null);
        node.insert("tags", tags);
        node
    }

    #[test]
    fn test_node_access() {
        let node = sample();
        assert!(node.is_object());
        assert_eq!(node.count(), 3);
        assert_eq!(node["name"].as_str(), Some("box"));
        assert_eq!(node["size"].as_f64(), Some(3.0));
        assert_eq!(node["tags"][0].as_bool(), Some(true));
        assert!(node["tags"][1].is_null());
        assert!(!node["tags"][1].is_absent());
        assert!(node["tags"][2].is_absent());
        assert!(node["missing"]["deeper"].is_absent());
        assert!(node["missing"].is_null());
        assert_eq!(node[0], Node::Absent);
        assert_eq!(node["size"].value(), "3");
        assert_eq!(node["tags"][0].value(), "true");
        assert_eq!(node["missing"].value(), "");
        let keys: Vec<_> = node.members().map(|(k, _)| k).collect();
        assert_eq!(keys, ["name", "size", "tags"]);
        assert_eq!(node["tags"].elements().count(), 2);
    }

    #[test]
    fn test_node_insert_keeps_position() {
        let mut node = sample();
        let old = node.insert("name", Node::from("crate"));
        assert_eq!(old, Some(Node::from("box")));
        assert_eq!(node.members().next(), Some(("name", &Node::from("crate"))));
        if let Some(size) = node.get_mut("size") {
            *size = Node::from(4u8);
        }
        assert_eq!(node["size"], Node::Number("4".into()));
    }

    #[test]
    fn test_node_display() {
        let mut node = sample();
        node.insert("quote", Node::from("a\"b\n"));
        node.insert("float", Node::from(1.5f32));
        node.insert("nan", Node::from(f64::NAN));
        assert_eq!(node.to_string(),
            r#"{"name":"box","size":3,"tags":[true,null],"quote":"a\"b\n","float":1.5,"nan":null}"#);
        assert_eq!(Node::Absent.to_string(), "null");
        assert_eq!(Node::from(-7i64).to_string(), "-7");
    }

    #[test]
    fn test_node_serde_interop() {
        let node = sample();
        let text = serde_json::to_string(&node).unwrap();
        assert_eq!(text, node.to_string());
        let back: Node = serde_json::from_str(&text).unwrap();
        assert_eq!(back, node);
        let value: Node = serde_json::from_str(r#"{"x":-1.25,"y":[18446744073709551615]}"#).unwrap();
        assert_eq!(value["x"], Node::Number("-1.25".into()));
        assert_eq!(value["y"][0], Node::Number("18446744073709551615".into()));
    }
}
