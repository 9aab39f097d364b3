//! In-memory entity model: hierarchical keys, typed scalar values and
//! property lists.
//!
//! An [`Entity`] is exactly one flat record: a [`Key`] plus an ordered list of
//! named [`Property`] values. There are no nested or repeated structures.

use crate::error::KeyError;
use crate::key::{decode_key, encode_key};
use crate::value::TypeTag;
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

/// Identity of one key segment: a numeric id or a string name.
///
/// `Id(0)` marks an incomplete key whose id is assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Identity {
    Id(u64),
    Name(String),
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Id(id) => write!(f, "{id}"),
            Identity::Name(name) => write!(f, "{name:?}"),
        }
    }
}

/// One `(kind, identity, namespace)` hop of a [`Key`].
///
/// The namespace is per segment; an empty string is the root namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Segment {
    pub kind: String,
    pub identity: Identity,
    pub namespace: String,
}

impl Segment {
    pub fn new(kind: impl Into<String>, identity: Identity) -> Self {
        Self {
            kind: kind.into(),
            identity,
            namespace: String::new(),
        }
    }

    #[must_use]
    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }
}

/// A hierarchical entity key.
///
/// Segments are stored outermost ancestor first; the last segment is the
/// entity's own `(kind, identity)`. A key always has at least one segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Key {
    segments: Vec<Segment>,
}

impl Key {
    /// Root key with a numeric id.
    pub fn id(kind: impl Into<String>, id: u64) -> Self {
        Self {
            segments: vec![Segment::new(kind, Identity::Id(id))],
        }
    }

    /// Root key with a string name.
    pub fn name(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            segments: vec![Segment::new(kind, Identity::Name(name.into()))],
        }
    }

    /// Build a key from an ancestor-first segment list; `None` when empty.
    pub fn from_segments(segments: Vec<Segment>) -> Option<Self> {
        if segments.is_empty() {
            None
        } else {
            Some(Self { segments })
        }
    }

    /// Child of `self` with a numeric id.
    #[must_use]
    pub fn child_id(mut self, kind: impl Into<String>, id: u64) -> Self {
        self.segments.push(Segment::new(kind, Identity::Id(id)));
        self
    }

    /// Child of `self` with a string name.
    #[must_use]
    pub fn child_name(mut self, kind: impl Into<String>, name: impl Into<String>) -> Self {
        self.segments
            .push(Segment::new(kind, Identity::Name(name.into())));
        self
    }

    /// Set the namespace of the innermost segment.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.innermost_mut().namespace = namespace.into();
        self
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn kind(&self) -> &str {
        &self.innermost().kind
    }

    pub fn identity(&self) -> &Identity {
        &self.innermost().identity
    }

    pub fn namespace(&self) -> &str {
        &self.innermost().namespace
    }

    /// The key of the direct ancestor, if any.
    pub fn parent(&self) -> Option<Key> {
        let n = self.segments.len();
        Key::from_segments(self.segments[..n - 1].to_vec())
    }

    /// True when the innermost id is still to be assigned by the store.
    pub fn is_incomplete(&self) -> bool {
        matches!(self.innermost().identity, Identity::Id(0))
    }

    fn innermost(&self) -> &Segment {
        &self.segments[self.segments.len() - 1]
    }

    fn innermost_mut(&mut self) -> &mut Segment {
        let n = self.segments.len();
        &mut self.segments[n - 1]
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode_key(self))
    }
}

impl FromStr for Key {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_key(s)
    }
}

/// A typed scalar property value.
///
/// Timestamps are UTC with millisecond precision on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Timestamp(DateTime<Utc>),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Value::Bool(_) => TypeTag::Bool,
            Value::Int(_) => TypeTag::Int64,
            Value::Float(_) => TypeTag::Float64,
            Value::String(_) => TypeTag::String,
            Value::Timestamp(_) => TypeTag::Timestamp,
            Value::Bytes(_) => TypeTag::Blob,
        }
    }

    /// Whether this is the zero value of its type (`false`, `0`, `0.0`, `""`).
    ///
    /// Timestamps and byte blobs are never considered zero.
    pub fn is_zero(&self) -> bool {
        match self {
            Value::Bool(b) => !*b,
            Value::Int(i) => *i == 0,
            Value::Float(f) => *f == 0.0,
            Value::String(s) => s.is_empty(),
            Value::Timestamp(_) | Value::Bytes(_) => false,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

/// A named, typed, optionally unindexed property.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub value: Value,
    pub indexed: bool,
}

impl Property {
    /// An indexed property.
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            indexed: true,
        }
    }

    /// A property excluded from the store's indexes.
    pub fn unindexed(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            indexed: false,
            ..Self::new(name, value)
        }
    }
}

/// A key plus its properties.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub key: Key,
    pub properties: Vec<Property>,
}

impl Entity {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            properties: Vec::new(),
        }
    }

    /// Append an indexed property.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.push(Property::new(name, value));
        self
    }

    /// Append a property.
    #[must_use]
    pub fn with_property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    /// Value of the first property called `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.properties
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_builders_keep_ancestor_order() {
        let k = Key::name("A", "a").child_id("B", 7).with_namespace("ns");
        assert_eq!(k.segments().len(), 2);
        assert_eq!(k.kind(), "B");
        assert_eq!(k.identity(), &Identity::Id(7));
        assert_eq!(k.namespace(), "ns");
        let parent = k.parent().unwrap();
        assert_eq!(parent, Key::name("A", "a"));
        assert!(parent.parent().is_none());
    }

    #[test]
    fn incomplete_keys() {
        assert!(Key::id("A", 0).is_incomplete());
        assert!(!Key::id("A", 1).is_incomplete());
        assert!(!Key::name("A", "0").is_incomplete());
    }

    #[test]
    fn zero_values() {
        assert!(Value::from("").is_zero());
        assert!(Value::from(0i64).is_zero());
        assert!(Value::from(0.0).is_zero());
        assert!(Value::from(false).is_zero());
        assert!(!Value::from("x").is_zero());
        assert!(!Value::Bytes(vec![]).is_zero());
    }
}
