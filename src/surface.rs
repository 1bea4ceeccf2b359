//! Accessor surface generation
//!
//! Given a complex typecode, [`ClassSurface`] derives the accessor API
//! for its bound record: one named property per `ofwhat` particle, a
//! factory per child, attribute get/set pairs keyed by descriptor, and
//! text accessors when the construct allows mixed content. Generation
//! happens once, ahead of use; every name conflict is caught here as a
//! [`Error::Configuration`] rather than surfacing later at call sites.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::namespaces::TypeDescriptor;
use crate::typecode::{GeneratedValue, TypeCode, TypeCodeKind, Value};

/// Synthetic property name for particles with no resolvable name
const WILDCARD_PROPERTY: &str = "Any";

/// Identifiers a generated property may not shadow
const RESERVED_IDENTIFIERS: &[&str] = &[
    "As", "Break", "Const", "Continue", "Crate", "Dyn", "Else", "Enum", "Extern", "False", "Fn",
    "For", "If", "Impl", "In", "Let", "Loop", "Match", "Mod", "Move", "Mut", "Pub", "Ref",
    "Return", "Self", "Static", "Struct", "Super", "Trait", "True", "Type", "Unsafe", "Use",
    "Where", "While", "Async", "Await",
];

/// One generated property
#[derive(Debug, Clone)]
pub struct PropertySpec {
    /// Capitalized property name
    pub name: String,
    /// Accessor name on the backing record
    pub aname: String,
    /// True when the particle repeats
    pub multiple: bool,
    /// The child typecode behind this property
    pub typecode: Arc<TypeCode>,
}

/// Generated accessor surface for one complex typecode
#[derive(Debug, Clone)]
pub struct ClassSurface {
    typecode: Arc<TypeCode>,
    properties: IndexMap<String, PropertySpec>,
}

impl ClassSurface {
    /// Derive the surface; every collision is a [`Error::Configuration`]
    pub fn generate(typecode: Arc<TypeCode>) -> Result<Self> {
        if typecode.kind != TypeCodeKind::Struct {
            return Err(Error::configuration(format!(
                "'{}' is not a complex typecode",
                typecode.pname
            )));
        }

        let mut properties = IndexMap::new();
        for child in &typecode.ofwhat {
            let name = property_name(child);

            if RESERVED_IDENTIFIERS.contains(&name.as_str()) {
                return Err(Error::configuration(format!(
                    "particle '{}' generates reserved property name '{}'",
                    child.pname, name
                )));
            }
            if let Some(previous) = properties.insert(
                name.clone(),
                PropertySpec {
                    name: name.clone(),
                    aname: child.aname.clone(),
                    multiple: child.occurs.is_multiple(),
                    typecode: Arc::clone(child),
                },
            ) {
                return Err(Error::configuration(format!(
                    "particles '{}' and '{}' both generate property '{}'",
                    previous.typecode.pname, child.pname, name
                )));
            }
        }

        Ok(Self {
            typecode,
            properties,
        })
    }

    /// The typecode this surface was generated from
    pub fn typecode(&self) -> &Arc<TypeCode> {
        &self.typecode
    }

    /// Generated properties in wire order
    pub fn properties(&self) -> impl Iterator<Item = &PropertySpec> {
        self.properties.values()
    }

    /// A fresh record with every field unset
    pub fn instantiate(&self) -> GeneratedValue {
        self.typecode.instantiate()
    }

    /// Factory: an empty default value of the property's bound type
    pub fn new_child(&self, property: &str) -> Result<Value> {
        let spec = self.property(property)?;
        Ok(default_value(&spec.typecode))
    }

    /// Property value from a record
    pub fn get<'v>(&self, record: &'v GeneratedValue, property: &str) -> Result<Option<&'v Value>> {
        let spec = self.property(property)?;
        Ok(record.field(&spec.aname))
    }

    /// Set a property; a repeating particle wraps a scalar into a
    /// single-item sequence
    pub fn set(&self, record: &mut GeneratedValue, property: &str, value: Value) -> Result<()> {
        let spec = self.property(property)?;
        let value = if spec.multiple && !matches!(value, Value::List(_)) {
            Value::List(vec![value])
        } else {
            value
        };
        record.set_field(&spec.aname, value);
        Ok(())
    }

    /// Attribute value from a record; the descriptor must be declared
    /// on the typecode
    pub fn get_attribute<'v>(
        &self,
        record: &'v GeneratedValue,
        descriptor: &TypeDescriptor,
    ) -> Result<Option<&'v Value>> {
        self.check_attribute(descriptor)?;
        Ok(record.attribute(descriptor))
    }

    /// Set an attribute value
    pub fn set_attribute(
        &self,
        record: &mut GeneratedValue,
        descriptor: &TypeDescriptor,
        value: Value,
    ) -> Result<()> {
        self.check_attribute(descriptor)?;
        record.set_attribute(descriptor.clone(), value);
        Ok(())
    }

    /// Mixed text payload; only available when the construct is mixed
    pub fn get_text<'v>(&self, record: &'v GeneratedValue) -> Result<Option<&'v str>> {
        self.check_mixed()?;
        Ok(record.text())
    }

    /// Set the mixed text payload
    pub fn set_text(&self, record: &mut GeneratedValue, text: impl Into<String>) -> Result<()> {
        self.check_mixed()?;
        record.set_text(text);
        Ok(())
    }

    fn property(&self, name: &str) -> Result<&PropertySpec> {
        self.properties.get(name).ok_or_else(|| {
            Error::configuration(format!(
                "'{}' has no property '{}'",
                self.typecode.pname, name
            ))
        })
    }

    fn check_attribute(&self, descriptor: &TypeDescriptor) -> Result<()> {
        if self.typecode.attributes.contains_key(descriptor) {
            Ok(())
        } else {
            Err(Error::configuration(format!(
                "'{}' declares no attribute '{}'",
                self.typecode.pname,
                descriptor.clark()
            )))
        }
    }

    fn check_mixed(&self) -> Result<()> {
        if self.typecode.mixed {
            Ok(())
        } else {
            Err(Error::configuration(format!(
                "'{}' does not allow mixed content",
                self.typecode.pname
            )))
        }
    }
}

/// Capitalized property name for a particle; wildcards and unnamed
/// particles fall back to the synthetic name
fn property_name(typecode: &TypeCode) -> String {
    if typecode.pname.is_empty() || typecode.kind == TypeCodeKind::Any {
        return WILDCARD_PROPERTY.to_string();
    }
    let mut chars = typecode.pname.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => WILDCARD_PROPERTY.to_string(),
    }
}

/// Empty default value of a typecode's kind
fn default_value(typecode: &TypeCode) -> Value {
    match typecode.kind {
        TypeCodeKind::Struct => Value::Struct(typecode.instantiate()),
        TypeCodeKind::String | TypeCodeKind::Any => Value::String(String::new()),
        TypeCodeKind::Boolean => Value::Boolean(false),
        TypeCodeKind::Integer => Value::Integer(0),
        TypeCodeKind::Float => Value::Float(0.0),
        TypeCodeKind::Decimal => Value::Decimal(Default::default()),
        TypeCodeKind::DateTime => Value::Nil,
        TypeCodeKind::Date => Value::Nil,
        TypeCodeKind::Time => Value::Nil,
        TypeCodeKind::Base64 => Value::Bytes(Vec::new()),
    }
}
