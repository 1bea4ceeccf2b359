//! TypeCode marshaling contract
//!
//! A [`TypeCode`] binds one resolved schema construct to its wire
//! behavior: `serialize` renders a [`Value`] into XML events,
//! `deserialize` rebuilds the value from a DOM node. Typecodes are
//! immutable once built; all mutable state lives in the value or in
//! the output stream.

pub mod build;
pub mod primitives;
pub mod value;

use std::io;
use std::sync::Arc;

use indexmap::IndexMap;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::dom::DomAdapter;
use crate::error::{DecodeError, Error, Result};
use crate::namespaces::{split_qname, TypeDescriptor, XSI_NAMESPACE};
use crate::schema::Occurs;

pub use build::TypeCodeBuilder;
pub use value::{GeneratedValue, Value};

/// Primitive or structural kind of a typecode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCodeKind {
    /// `xsd:string` and its derivations
    String,
    /// `xsd:boolean`
    Boolean,
    /// The XSD integer family
    Integer,
    /// `xsd:float` / `xsd:double`
    Float,
    /// `xsd:decimal`
    Decimal,
    /// `xsd:dateTime`
    DateTime,
    /// `xsd:date`
    Date,
    /// `xsd:time`
    Time,
    /// `xsd:base64Binary`
    Base64,
    /// Complex content with an `ofwhat` particle list
    Struct,
    /// `xsd:any` wildcard, carried as raw text
    Any,
}

/// Marshaling descriptor for one schema construct
#[derive(Debug, Clone)]
pub struct TypeCode {
    /// Accessor name on the bound record
    pub aname: String,
    /// Wire particle name; empty for a bare built-in
    pub pname: String,
    /// Namespace of the particle, if qualified
    pub namespace: Option<String>,
    /// Prefix to emit the particle under, when the caller declared one
    pub prefix: Option<String>,
    /// Occurrence bounds
    pub occurs: Occurs,
    /// `xsi:nil` permitted
    pub nillable: bool,
    /// Mixed text content permitted
    pub mixed: bool,
    /// Primitive or structural kind
    pub kind: TypeCodeKind,
    /// Child typecodes in wire order
    pub ofwhat: Vec<Arc<TypeCode>>,
    /// Attribute typecodes keyed by descriptor
    pub attributes: IndexMap<TypeDescriptor, Arc<TypeCode>>,
    /// Bound native type name, for complex constructs
    pub type_name: Option<String>,
}

impl TypeCode {
    /// A bare built-in with no particle name; serializes text only
    pub fn builtin(kind: TypeCodeKind) -> Self {
        Self {
            aname: String::new(),
            pname: String::new(),
            namespace: None,
            prefix: None,
            occurs: Occurs::once(),
            nillable: false,
            mixed: false,
            kind,
            ofwhat: Vec::new(),
            attributes: IndexMap::new(),
            type_name: None,
        }
    }

    /// A named simple-typed particle
    pub fn primitive(kind: TypeCodeKind, pname: impl Into<String>) -> Self {
        let pname = pname.into();
        Self {
            aname: accessor_name(&pname),
            pname,
            ..Self::builtin(kind)
        }
    }

    /// A complex particle with ordered children
    pub fn structure(
        pname: impl Into<String>,
        type_name: impl Into<String>,
        ofwhat: Vec<Arc<TypeCode>>,
    ) -> Self {
        let pname = pname.into();
        Self {
            aname: accessor_name(&pname),
            pname,
            kind: TypeCodeKind::Struct,
            ofwhat,
            type_name: Some(type_name.into()),
            ..Self::builtin(TypeCodeKind::Struct)
        }
    }

    /// Set occurrence bounds
    pub fn with_occurs(mut self, occurs: Occurs) -> Self {
        self.occurs = occurs;
        self
    }

    /// Allow `xsi:nil`
    pub fn with_nillable(mut self, nillable: bool) -> Self {
        self.nillable = nillable;
        self
    }

    /// Set the particle namespace
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Set the emission prefix
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Allow mixed text content
    pub fn with_mixed(mut self, mixed: bool) -> Self {
        self.mixed = mixed;
        self
    }

    /// Add an attribute typecode
    pub fn with_attribute(mut self, descriptor: TypeDescriptor, typecode: Arc<TypeCode>) -> Self {
        self.attributes.insert(descriptor, typecode);
        self
    }

    /// Fresh record with this typecode's field set in wire order
    pub fn instantiate(&self) -> GeneratedValue {
        GeneratedValue::new(
            self.type_name.clone().unwrap_or_else(|| self.pname.clone()),
            self.ofwhat.iter().map(|tc| tc.aname.clone()),
        )
    }

    /// Tag name as emitted on the wire
    fn wire_tag(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, self.pname),
            None => self.pname.clone(),
        }
    }

    /// Render a value into the XML event stream
    ///
    /// A multi-occurrence particle paired with a [`Value::List`] emits
    /// one element per item; everything else emits a single element,
    /// or bare text when the typecode has no particle name.
    pub fn serialize<W: io::Write>(&self, value: &Value, xml: &mut Writer<W>) -> Result<()> {
        self.serialize_with(value, xml, &[])
    }

    /// Like [`serialize`](Self::serialize), with extra attributes on
    /// each emitted top-level element
    pub fn serialize_with<W: io::Write>(
        &self,
        value: &Value,
        xml: &mut Writer<W>,
        extra_attributes: &[(&str, &str)],
    ) -> Result<()> {
        if self.occurs.is_multiple() {
            if let Value::List(items) = value {
                for item in items {
                    self.serialize_one(item, xml, extra_attributes)?;
                }
                return Ok(());
            }
        }
        self.serialize_one(value, xml, extra_attributes)
    }

    fn serialize_one<W: io::Write>(
        &self,
        value: &Value,
        xml: &mut Writer<W>,
        extra_attributes: &[(&str, &str)],
    ) -> Result<()> {
        if let Value::Nil = value {
            if !self.nillable {
                return Err(Error::Writer(format!(
                    "nil value for non-nillable particle '{}'",
                    self.pname
                )));
            }
            let mut start = BytesStart::new(self.wire_tag());
            for &(name, attr_value) in extra_attributes {
                start.push_attribute((name, attr_value));
            }
            start.push_attribute(("xsi:nil", "1"));
            xml.write_event(Event::Empty(start))?;
            return Ok(());
        }

        // A bare built-in renders its lexical text with no wrapper.
        if self.pname.is_empty() {
            let text = self.format_simple(value)?;
            xml.write_event(Event::Text(BytesText::new(&text)))?;
            return Ok(());
        }

        let tag = self.wire_tag();
        let mut start = BytesStart::new(tag.clone());
        for &(name, attr_value) in extra_attributes {
            start.push_attribute((name, attr_value));
        }

        if let Value::Struct(record) = value {
            for (descriptor, attr_tc) in &self.attributes {
                if let Some(attr_value) = record.attribute(descriptor) {
                    let text = attr_tc.format_simple(attr_value)?;
                    start.push_attribute((descriptor.name.as_str(), text.as_str()));
                }
            }
        }

        match (self.kind, value) {
            (TypeCodeKind::Struct, Value::Struct(record)) => {
                xml.write_event(Event::Start(start))?;
                for child in &self.ofwhat {
                    match record.field(&child.aname) {
                        Some(field_value) => child.serialize(field_value, xml)?,
                        None => {
                            if !child.occurs.is_emptiable() {
                                return Err(Error::Writer(format!(
                                    "required field '{}' of '{}' is unset",
                                    child.aname, self.pname
                                )));
                            }
                        }
                    }
                }
                if self.mixed {
                    if let Some(text) = record.text() {
                        xml.write_event(Event::Text(BytesText::new(text)))?;
                    }
                }
                xml.write_event(Event::End(BytesEnd::new(tag)))?;
            }
            (TypeCodeKind::Struct, other) => {
                return Err(Error::configuration(format!(
                    "complex particle '{}' cannot serialize {:?}",
                    self.pname, other
                )));
            }
            (_, value) => {
                let text = self.format_simple(value)?;
                xml.write_event(Event::Start(start))?;
                xml.write_event(Event::Text(BytesText::new(&text)))?;
                xml.write_event(Event::End(BytesEnd::new(tag)))?;
            }
        }
        Ok(())
    }

    /// Lexical rendering of a simple value
    fn format_simple(&self, value: &Value) -> Result<String> {
        match (self.kind, value) {
            (TypeCodeKind::String, Value::String(s)) => Ok(s.clone()),
            (TypeCodeKind::Any, Value::String(s)) => Ok(s.clone()),
            (TypeCodeKind::Boolean, Value::Boolean(b)) => {
                Ok(primitives::format_boolean(*b).to_string())
            }
            (TypeCodeKind::Integer, Value::Integer(i)) => Ok(primitives::format_integer(*i)),
            (TypeCodeKind::Float, Value::Float(f)) => Ok(primitives::format_float(*f)),
            (TypeCodeKind::Decimal, Value::Decimal(d)) => Ok(primitives::format_decimal(d)),
            (TypeCodeKind::DateTime, Value::DateTime(dt)) => Ok(primitives::format_datetime(dt)),
            (TypeCodeKind::Date, Value::Date(d)) => Ok(primitives::format_date(d)),
            (TypeCodeKind::Time, Value::Time(t)) => Ok(primitives::format_time(t)),
            (TypeCodeKind::Base64, Value::Bytes(b)) => Ok(primitives::format_base64(b)),
            (kind, other) => Err(Error::configuration(format!(
                "value {:?} does not match {:?} typecode '{}'",
                other, kind, self.pname
            ))),
        }
    }

    /// Parse lexical text into this typecode's value kind
    pub fn parse_simple(&self, text: &str) -> Result<Value> {
        match self.kind {
            TypeCodeKind::String | TypeCodeKind::Any => Ok(Value::String(text.to_string())),
            TypeCodeKind::Boolean => Ok(Value::Boolean(primitives::parse_boolean(text)?)),
            TypeCodeKind::Integer => Ok(Value::Integer(primitives::parse_integer(text)?)),
            TypeCodeKind::Float => Ok(Value::Float(primitives::parse_float(text)?)),
            TypeCodeKind::Decimal => Ok(Value::Decimal(primitives::parse_decimal(text)?)),
            TypeCodeKind::DateTime => Ok(Value::DateTime(primitives::parse_datetime(text)?)),
            TypeCodeKind::Date => Ok(Value::Date(primitives::parse_date(text)?)),
            TypeCodeKind::Time => Ok(Value::Time(primitives::parse_time(text)?)),
            TypeCodeKind::Base64 => Ok(Value::Bytes(primitives::parse_base64(text)?)),
            TypeCodeKind::Struct => Err(Error::configuration(format!(
                "complex typecode '{}' has no lexical form",
                self.pname
            ))),
        }
    }

    /// Rebuild a value from a DOM node
    ///
    /// A nil-marked node yields [`Value::Nil`] without inspecting
    /// content. Complex content populates a fresh record field by
    /// field, matching child runs to `ofwhat` in wire order; a count
    /// outside the declared bounds or a leftover child is a
    /// [`DecodeError`].
    pub fn deserialize<A: DomAdapter>(&self, node: &A) -> Result<Value> {
        if is_nil(node) {
            if !self.nillable {
                return Err(DecodeError::new("nil on a non-nillable particle")
                    .with_particle(&self.pname)
                    .into());
            }
            return Ok(Value::Nil);
        }

        if self.kind != TypeCodeKind::Struct {
            return self.parse_simple(node.text().unwrap_or(""));
        }

        let mut record = self.instantiate();
        let children = node.child_elements(&[]);
        let mut pos = 0usize;

        for child_tc in &self.ofwhat {
            let mut items = Vec::new();
            while pos < children.len() && matches_particle(child_tc, &children[pos]) {
                items.push(child_tc.deserialize(&children[pos])?);
                pos += 1;
            }

            let count = items.len() as u32;
            if !child_tc.occurs.contains(count) {
                return Err(DecodeError::new(format!(
                    "{} occurrence(s), expected between {} and {}",
                    count,
                    child_tc.occurs.min,
                    child_tc
                        .occurs
                        .max
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "unbounded".to_string())
                ))
                .with_particle(&child_tc.pname)
                .into());
            }

            if items.is_empty() {
                continue;
            }
            let field_value = if child_tc.occurs.is_multiple() {
                Value::List(items)
            } else {
                // Single occurrence, the vec holds exactly one item.
                items.remove(0)
            };
            record.set_field(&child_tc.aname, field_value);
        }

        if pos < children.len() {
            return Err(DecodeError::new(format!(
                "unexpected child <{}>",
                children[pos].local_name()
            ))
            .with_particle(&self.pname)
            .into());
        }

        for (descriptor, attr_tc) in &self.attributes {
            if let Some(text) = attribute_value(node, descriptor) {
                let parsed = attr_tc.parse_simple(&text)?;
                record.set_attribute(descriptor.clone(), parsed);
            }
        }

        if self.mixed {
            if let Some(text) = node.text() {
                record.set_text(text);
            }
        }

        Ok(Value::Struct(record))
    }
}

/// Accessor name derived from a wire name
///
/// Characters invalid in an identifier become underscores.
pub fn accessor_name(pname: &str) -> String {
    pname
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// True when the node carries `xsi:nil="1"` or `xsi:nil="true"`
fn is_nil<A: DomAdapter>(node: &A) -> bool {
    matches!(
        attribute_in_namespace(node, XSI_NAMESPACE, "nil").as_deref(),
        Some("1") | Some("true")
    )
}

/// A wildcard matches any element; a named particle matches by local name
fn matches_particle<A: DomAdapter>(typecode: &TypeCode, node: &A) -> bool {
    typecode.kind == TypeCodeKind::Any || node.local_name() == typecode.pname
}

/// Attribute value by (namespace, local) against the node's scope
fn attribute_in_namespace<A: DomAdapter>(node: &A, namespace: &str, local: &str) -> Option<String> {
    for (raw, value) in node.attribute_map() {
        let (prefix, attr_local) = split_qname(raw);
        if attr_local != local {
            continue;
        }
        if let Some(prefix) = prefix {
            if prefix == "xmlns" {
                continue;
            }
            if node.resolve_namespace(Some(prefix)) == Some(namespace) {
                return Some(value.clone());
            }
        }
    }
    None
}

/// Attribute lookup for a descriptor: unprefixed match for a local
/// descriptor, or a prefixed one resolving to the descriptor's
/// namespace
fn attribute_value<A: DomAdapter>(node: &A, descriptor: &TypeDescriptor) -> Option<String> {
    for (raw, value) in node.attribute_map() {
        let (prefix, local) = split_qname(raw);
        if local != descriptor.name {
            continue;
        }
        match (prefix, &descriptor.namespace) {
            (None, None) => return Some(value.clone()),
            // An unprefixed attribute is in no namespace.
            (None, Some(_)) => continue,
            (Some("xmlns"), _) => continue,
            (Some(p), Some(ns)) => {
                if node.resolve_namespace(Some(p)) == Some(ns.as_str()) {
                    return Some(value.clone());
                }
            }
            (Some(_), None) => continue,
        }
    }
    None
}
