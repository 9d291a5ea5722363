pub use enumset::EnumSet;
/// [crate::properties] contains the value, identifier, and capability types shared by the store
/// contract and the loader.
use enumset::*;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeSet,
    fmt::{Display, Formatter},
    str::FromStr,
};

pub use uuid::Uuid;

use crate::error::LoaderError;

/// Stable identifier handed out by a store to referenceable nodes.
///
/// Identifiers are v4 Uuids and are never reused once the owning node is removed.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct NodeId(Uuid);

impl NodeId {
    pub fn new() -> Self {
        NodeId(Uuid::new_v4())
    }

    pub fn nil() -> Self {
        NodeId(Uuid::nil())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        NodeId::new()
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for NodeId {
    type Err = LoaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(NodeId(Uuid::parse_str(s.trim())?))
    }
}

impl From<Uuid> for NodeId {
    fn from(id: Uuid) -> Self {
        NodeId(id)
    }
}

/// The capability kinds the loader has behavior for. Stores may carry further tags, which are
/// represented as [Capability::Other].
#[derive(Debug, Serialize, Deserialize, PartialOrd, Ord, Hash, EnumSetType)]
#[enumset(repr = "u32")]
pub enum CapabilityKind {
    /// The node receives a stable [NodeId] usable as a reference target
    Referenceable,
    /// The node takes part in post-import check-in. Implies [CapabilityKind::Referenceable].
    Versionable,
    Lockable,
}

pub const REFERENCEABLE_TAG: &str = "mix:referenceable";
pub const VERSIONABLE_TAG: &str = "mix:versionable";
pub const LOCKABLE_TAG: &str = "mix:lockable";

impl CapabilityKind {
    pub fn tag(&self) -> &'static str {
        match self {
            CapabilityKind::Referenceable => REFERENCEABLE_TAG,
            CapabilityKind::Versionable => VERSIONABLE_TAG,
            CapabilityKind::Lockable => LOCKABLE_TAG,
        }
    }

    /// Capabilities that come along when this one is applied to a node.
    pub fn implied(&self) -> EnumSet<CapabilityKind> {
        match self {
            CapabilityKind::Versionable => {
                CapabilityKind::Versionable | CapabilityKind::Referenceable
            }
            other => EnumSet::only(*other),
        }
    }
}

impl Display for CapabilityKind {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// A capability tag as named by an import source.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Capability {
    Known(CapabilityKind),
    Other(String),
}

impl Capability {
    pub fn kind(&self) -> Option<CapabilityKind> {
        match self {
            Capability::Known(kind) => Some(*kind),
            Capability::Other(_) => None,
        }
    }
}

impl From<&str> for Capability {
    fn from(tag: &str) -> Self {
        let tag = tag.trim();
        EnumSet::<CapabilityKind>::all()
            .iter()
            .find(|kind| kind.tag() == tag)
            .map(Capability::Known)
            .unwrap_or_else(|| Capability::Other(tag.to_string()))
    }
}

impl From<CapabilityKind> for Capability {
    fn from(kind: CapabilityKind) -> Self {
        Capability::Known(kind)
    }
}

impl Display for Capability {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            Capability::Known(kind) => write!(f, "{kind}"),
            Capability::Other(tag) => write!(f, "{tag}"),
        }
    }
}

/// The capability tags carried by a single node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapabilitySet {
    known: EnumSet<CapabilityKind>,
    other: BTreeSet<String>,
}

impl CapabilitySet {
    /// Adds the capability (and whatever it implies). Returns false if it was already present.
    pub fn insert(&mut self, capability: &Capability) -> bool {
        match capability {
            Capability::Known(kind) => {
                let added = !self.known.contains(*kind);
                self.known |= kind.implied();
                added
            }
            Capability::Other(tag) => self.other.insert(tag.clone()),
        }
    }

    pub fn contains(&self, capability: &Capability) -> bool {
        match capability {
            Capability::Known(kind) => self.known.contains(*kind),
            Capability::Other(tag) => self.other.contains(tag),
        }
    }

    pub fn is_referenceable(&self) -> bool {
        self.known.contains(CapabilityKind::Referenceable)
    }

    pub fn is_versionable(&self) -> bool {
        self.known.contains(CapabilityKind::Versionable)
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty() && self.other.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.known
            .iter()
            .map(Capability::Known)
            .chain(self.other.iter().cloned().map(Capability::Other))
    }
}

impl Display for CapabilitySet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let tags = self.iter().map(|c| c.to_string()).collect::<Vec<_>>();
        write!(f, "[{}]", tags.join(", "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PropertyType {
    String,
    Binary,
    Long,
    Double,
    Date,
    Boolean,
    Name,
    Path,
    Reference,
}

impl FromStr for PropertyType {
    type Err = LoaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "string" => Ok(PropertyType::String),
            "binary" => Ok(PropertyType::Binary),
            "long" => Ok(PropertyType::Long),
            "double" => Ok(PropertyType::Double),
            "date" => Ok(PropertyType::Date),
            "boolean" => Ok(PropertyType::Boolean),
            "name" => Ok(PropertyType::Name),
            "path" => Ok(PropertyType::Path),
            "reference" => Ok(PropertyType::Reference),
            other => Err(LoaderError::Value(format!("unknown property type '{other}'"))),
        }
    }
}

impl Display for PropertyType {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// A single typed property value. Dates are milliseconds since the unix epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    String(String),
    Binary(Vec<u8>),
    Long(i64),
    Double(f64),
    Date(i64),
    Boolean(bool),
    Name(String),
    Path(String),
    Reference(NodeId),
}

impl Value {
    pub fn property_type(&self) -> PropertyType {
        match self {
            Value::String(_) => PropertyType::String,
            Value::Binary(_) => PropertyType::Binary,
            Value::Long(_) => PropertyType::Long,
            Value::Double(_) => PropertyType::Double,
            Value::Date(_) => PropertyType::Date,
            Value::Boolean(_) => PropertyType::Boolean,
            Value::Name(_) => PropertyType::Name,
            Value::Path(_) => PropertyType::Path,
            Value::Reference(_) => PropertyType::Reference,
        }
    }

    /// Convert a source string into a value of the requested type.
    ///
    /// Dates are accepted either as RFC 3339 timestamps or as integer milliseconds. Booleans
    /// follow the lenient rule of import sources: only a case-insensitive `true` is true.
    pub fn parse(property_type: PropertyType, raw: &str) -> Result<Value, LoaderError> {
        Ok(match property_type {
            PropertyType::String => Value::String(raw.to_string()),
            PropertyType::Binary => Value::Binary(raw.as_bytes().to_vec()),
            PropertyType::Long => Value::Long(raw.trim().parse()?),
            PropertyType::Double => Value::Double(raw.trim().parse()?),
            PropertyType::Date => match raw.trim().parse::<i64>() {
                Ok(millis) => Value::Date(millis),
                Err(_) => {
                    Value::Date(chrono::DateTime::parse_from_rfc3339(raw.trim())?.timestamp_millis())
                }
            },
            PropertyType::Boolean => Value::Boolean(raw.trim().eq_ignore_ascii_case("true")),
            PropertyType::Name => Value::Name(raw.to_string()),
            PropertyType::Path => Value::Path(raw.to_string()),
            PropertyType::Reference => Value::Reference(raw.parse()?),
        })
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Name(s) | Value::Path(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<NodeId> {
        match self {
            Value::Reference(id) => Some(*id),
            _ => None,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            Value::String(s) | Value::Name(s) | Value::Path(s) => write!(f, "{s}"),
            Value::Binary(data) => write!(f, "<{} bytes>", data.len()),
            Value::Long(long) => write!(f, "{long}"),
            Value::Double(double) => write!(f, "{double}"),
            Value::Date(millis) => match chrono::DateTime::from_timestamp_millis(*millis) {
                Some(date) => write!(f, "{}", date.to_rfc3339()),
                None => write!(f, "{millis}"),
            },
            Value::Boolean(flag) => write!(f, "{flag}"),
            Value::Reference(id) => write!(f, "{id}"),
        }
    }
}

/// What a store holds under a property name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    Single(Value),
    /// The declared type is kept so that an empty sequence still has one
    Multi(PropertyType, Vec<Value>),
}

impl PropertyValue {
    pub fn property_type(&self) -> PropertyType {
        match self {
            PropertyValue::Single(value) => value.property_type(),
            PropertyValue::Multi(ty, _) => *ty,
        }
    }

    pub fn is_multiple(&self) -> bool {
        matches!(self, PropertyValue::Multi(..))
    }

    pub fn single(&self) -> Option<&Value> {
        match self {
            PropertyValue::Single(value) => Some(value),
            PropertyValue::Multi(..) => None,
        }
    }

    pub fn values(&self) -> &[Value] {
        match self {
            PropertyValue::Single(value) => std::slice::from_ref(value),
            PropertyValue::Multi(_, values) => values,
        }
    }
}

impl Display for PropertyValue {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            PropertyValue::Single(value) => write!(f, "{value}"),
            PropertyValue::Multi(_, values) => {
                let values = values.iter().map(Value::to_string).collect::<Vec<_>>();
                write!(f, "[{}]", values.join(", "))
            }
        }
    }
}

impl From<Value> for PropertyValue {
    fn from(value: Value) -> Self {
        PropertyValue::Single(value)
    }
}
