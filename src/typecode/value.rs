//! Native value representation
//!
//! [`Value`] is the marshaling currency: every typecode serializes one
//! of its variants and deserialization produces one. Complex content
//! lives in a [`GeneratedValue`], an ordered-field record whose field
//! set mirrors its typecode's `ofwhat` list.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use indexmap::IndexMap;
use rust_decimal::Decimal;

use crate::namespaces::TypeDescriptor;

/// One marshalable native value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Explicit nil (`xsi:nil`), distinct from an absent field
    Nil,
    /// Character data
    String(String),
    /// Any of the XSD integer kinds
    Integer(i64),
    /// `xsd:boolean`
    Boolean(bool),
    /// `xsd:float` / `xsd:double`
    Float(f64),
    /// `xsd:decimal`, exact
    Decimal(Decimal),
    /// `xsd:dateTime` with offset
    DateTime(DateTime<FixedOffset>),
    /// `xsd:date`
    Date(NaiveDate),
    /// `xsd:time`
    Time(NaiveTime),
    /// `xsd:base64Binary`
    Bytes(Vec<u8>),
    /// Repeated occurrence of one particle
    List(Vec<Value>),
    /// Complex content bound to a typecode
    Struct(GeneratedValue),
}

impl Value {
    /// The contained list, treating a scalar as a one-item sequence
    pub fn as_slice(&self) -> std::slice::Iter<'_, Value> {
        match self {
            Value::List(items) => items.iter(),
            other => std::slice::from_ref(other).iter(),
        }
    }

    /// Number of occurrences this value represents
    pub fn occurrence_count(&self) -> usize {
        match self {
            Value::List(items) => items.len(),
            _ => 1,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

/// Ordered-field record bound 1:1 to a complex typecode
///
/// Fields are keyed by accessor name in wire order; an unset field is
/// `None` and serializes as absent. Attribute values are keyed by the
/// attribute's [`TypeDescriptor`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GeneratedValue {
    /// Name of the bound native type
    type_name: String,
    fields: IndexMap<String, Option<Value>>,
    attributes: IndexMap<TypeDescriptor, Value>,
    text: Option<String>,
}

impl GeneratedValue {
    /// An empty record with the given field set, all fields unset
    pub fn new(type_name: impl Into<String>, field_names: impl IntoIterator<Item = String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: field_names.into_iter().map(|n| (n, None)).collect(),
            attributes: IndexMap::new(),
            text: None,
        }
    }

    /// Name of the bound native type
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Field value by accessor name
    pub fn field(&self, aname: &str) -> Option<&Value> {
        self.fields.get(aname).and_then(|v| v.as_ref())
    }

    /// True if the record declares the field at all
    pub fn has_field(&self, aname: &str) -> bool {
        self.fields.contains_key(aname)
    }

    /// Set a field; an undeclared accessor name is ignored by returning false
    pub fn set_field(&mut self, aname: &str, value: Value) -> bool {
        match self.fields.get_mut(aname) {
            Some(slot) => {
                *slot = Some(value);
                true
            }
            None => false,
        }
    }

    /// Clear a field back to absent
    pub fn clear_field(&mut self, aname: &str) {
        if let Some(slot) = self.fields.get_mut(aname) {
            *slot = None;
        }
    }

    /// Field names in wire order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(|k| k.as_str())
    }

    /// Attribute value by descriptor
    pub fn attribute(&self, descriptor: &TypeDescriptor) -> Option<&Value> {
        self.attributes.get(descriptor)
    }

    /// Set an attribute value
    pub fn set_attribute(&mut self, descriptor: TypeDescriptor, value: Value) {
        self.attributes.insert(descriptor, value);
    }

    /// All attribute values in insertion order
    pub fn attributes(&self) -> impl Iterator<Item = (&TypeDescriptor, &Value)> {
        self.attributes.iter()
    }

    /// Mixed text payload
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Set the mixed text payload
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = Some(text.into());
    }
}
