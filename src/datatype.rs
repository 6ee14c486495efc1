// used for date and datetime values
use chrono::{NaiveDate, NaiveDateTime};
// used for decimal numbers
use bigdecimal::BigDecimal;
// used for JSON
use jsondata::Json;

// used when parsing a string into a value
use std::str::FromStr;
// used to print out readable forms of a data type
use std::fmt;
// used to indicate that data types need to be hashable
use std::hash::{Hash, Hasher};
// used to reach into the newtypes below
use std::ops;

use crate::construct::EntityId;

/// The logical clock of a database. Incremented once per committed write,
/// so the layer at position `t` in the layer sequence carries time `t`.
/// Not wall-clock time.
pub type LogicalTime = u64;

// ------------- ValueKind -------------
/// The type tag of an attribute. `Ref` is designated: it marks the value as
/// another entity's id, which makes the datom an edge in the reference graph
/// and the attribute eligible for the VAET index. Every other tag is an
/// opaque label whose semantics belong to the caller.
#[derive(PartialEq, Eq, Hash, Clone, Debug)]
pub enum ValueKind {
    Ref,
    Scalar(String),
}

impl ValueKind {
    pub fn scalar(tag: &str) -> Self {
        ValueKind::Scalar(tag.to_owned())
    }
    pub fn is_ref(&self) -> bool {
        matches!(self, ValueKind::Ref)
    }
    pub fn tag(&self) -> &str {
        match self {
            ValueKind::Ref => "ref",
            ValueKind::Scalar(tag) => tag,
        }
    }
}
impl From<&str> for ValueKind {
    fn from(tag: &str) -> Self {
        match tag {
            "ref" => ValueKind::Ref,
            other => ValueKind::Scalar(other.to_owned()),
        }
    }
}
impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

// ------------- Value -------------
/// One typed attribute value. The set is open in the sense that `Json` and
/// `Text` carry arbitrary caller payloads; `Ref` holds an entity id.
#[derive(PartialEq, Eq, Hash, Clone, Debug)]
pub enum Value {
    Int(i64),
    Decimal(Decimal),
    Text(String),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Json(JSON),
    Ref(EntityId),
}

impl Value {
    pub fn data_type(&self) -> &'static str {
        match self {
            Value::Int(_) => "i64",
            Value::Decimal(_) => "Decimal",
            Value::Text(_) => "String",
            Value::Bool(_) => "bool",
            Value::Date(_) => "NaiveDate",
            Value::DateTime(_) => "NaiveDateTime",
            Value::Json(_) => "JSON",
            Value::Ref(_) => "Ref",
        }
    }
    pub fn is_ref(&self) -> bool {
        matches!(self, Value::Ref(_))
    }
}
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Decimal(v) => write!(f, "{}", v),
            Value::Text(v) => write!(f, "{}", v),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Date(v) => write!(f, "{}", v),
            Value::DateTime(v) => write!(f, "{}", v),
            Value::Json(v) => write!(f, "{}", v),
            Value::Ref(id) => write!(f, "#{}", id),
        }
    }
}

// Special types below
#[derive(Eq, PartialEq, Clone)]
pub struct JSON(Json);

impl JSON {
    pub fn from_str(s: &str) -> Option<JSON> {
        match Json::from_str(s) {
            Ok(json) => Some(JSON(json)),
            _ => None,
        }
    }
}
impl Hash for JSON {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_string().hash(state);
    }
}
impl fmt::Display for JSON {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl fmt::Debug for JSON {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "JSON({})", self.0)
    }
}
impl ops::Deref for JSON {
    type Target = Json;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Eq, PartialEq, Hash, PartialOrd, Ord, Clone, Debug)]
pub struct Decimal(BigDecimal);

impl Decimal {
    pub fn from_str(s: &str) -> Option<Decimal> {
        match BigDecimal::from_str(s) {
            Ok(decimal) => Some(Decimal(decimal)),
            _ => None,
        }
    }
}
impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl ops::Deref for Decimal {
    type Target = BigDecimal;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
