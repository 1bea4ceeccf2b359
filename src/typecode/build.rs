//! Typecode derivation from a finalized schema graph
//!
//! [`TypeCodeBuilder`] walks a [`Schema`] and produces immutable
//! [`TypeCode`] trees: element declarations become particles, complex
//! types become structs with their derivation chain flattened into
//! wire order, and simple types are chased to an XSD primitive kind.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::{Result, SchemaError};
use crate::namespaces::TypeDescriptor;
use crate::schema::{Collection, ComponentId, ComponentKind, Schema};

use super::{accessor_name, TypeCode, TypeCodeKind};

/// Nesting bound for type chasing; anything deeper is a cycle
const MAX_DEPTH: usize = 64;

/// Builds typecodes from a loaded schema
#[derive(Debug, Clone)]
pub struct TypeCodeBuilder {
    schema: Arc<Schema>,
}

impl TypeCodeBuilder {
    /// A builder over a loaded schema
    pub fn new(schema: Arc<Schema>) -> Self {
        Self { schema }
    }

    /// Typecode for a global element declaration
    pub fn element(&self, name: &str) -> Result<Arc<TypeCode>> {
        let id = self
            .schema
            .elements
            .get(name)
            .copied()
            .ok_or_else(|| SchemaError::new(format!("no '{}' in elements collection", name)))?;
        self.particle_typecode(&self.schema, id, 0)
    }

    /// Typecode for a named global type, bound to the given wire name
    pub fn named_type(&self, type_name: &str, pname: &str) -> Result<Arc<TypeCode>> {
        let id = self
            .schema
            .types
            .get(type_name)
            .copied()
            .ok_or_else(|| SchemaError::new(format!("no '{}' in types collection", type_name)))?;
        let tc = match self.schema.component(id).kind {
            ComponentKind::ComplexType => self.complex_typecode(&self.schema, id, pname, 0)?,
            ComponentKind::SimpleType => {
                let kind = self.simple_kind(&self.schema, id, 0)?;
                TypeCode::primitive(kind, pname)
            }
            other => {
                return Err(SchemaError::new(format!(
                    "'{}' names a <{}>, not a type",
                    type_name,
                    other.tag()
                ))
                .into())
            }
        };
        Ok(Arc::new(tc))
    }

    /// Typecode for one particle component
    fn particle_typecode(
        &self,
        schema: &Arc<Schema>,
        id: ComponentId,
        depth: usize,
    ) -> Result<Arc<TypeCode>> {
        if depth > MAX_DEPTH {
            return Err(SchemaError::new("type nesting too deep (cycle?)").into());
        }

        let component = schema.component(id);
        match component.kind {
            ComponentKind::ElementDecl => self.element_typecode(schema, id, depth),
            ComponentKind::ElementRef => {
                let reference = component
                    .ref_descriptor()
                    .ok_or_else(|| SchemaError::new("element reference without ref attribute"))?;
                let resolved = schema.resolve_qname(Collection::Elements, reference)?;
                let owner = resolved.schema.clone().unwrap_or_else(|| Arc::clone(schema));
                let target = self.element_typecode(&owner, resolved.id, depth + 1)?;
                // Occurrence bounds come from the referencing particle.
                let mut tc = (*target).clone();
                tc.occurs = component.occurs()?;
                Ok(Arc::new(tc))
            }
            ComponentKind::AnyElement => {
                let tc = TypeCode::primitive(TypeCodeKind::Any, "any")
                    .with_occurs(component.occurs()?);
                Ok(Arc::new(tc))
            }
            other => Err(SchemaError::new(format!(
                "component <{}> is not a particle",
                other.tag()
            ))
            .into()),
        }
    }

    fn element_typecode(
        &self,
        schema: &Arc<Schema>,
        id: ComponentId,
        depth: usize,
    ) -> Result<Arc<TypeCode>> {
        let component = schema.component(id);
        let pname = component
            .name()
            .ok_or_else(|| SchemaError::new("element without a name").with_component("element"))?
            .to_string();
        let occurs = component.occurs()?;
        let nillable = component.nillable();

        let mut tc = match component.type_descriptor() {
            Some(descriptor) => self.typecode_for_descriptor(schema, descriptor, &pname, depth)?,
            None => match component
                .content
                .first()
                .map(|&cid| (cid, schema.component(cid).kind))
            {
                Some((cid, ComponentKind::ComplexType)) => {
                    self.complex_typecode(schema, cid, &pname, depth)?
                }
                Some((cid, ComponentKind::SimpleType)) => {
                    let kind = self.simple_kind(schema, cid, depth)?;
                    TypeCode::primitive(kind, pname.clone())
                }
                // No declared type at all is xsd:anyType content.
                _ => TypeCode::primitive(TypeCodeKind::Any, pname.clone()),
            },
        };

        tc.occurs = occurs;
        tc.nillable = nillable;
        if schema.defaults.element_form.is_qualified() {
            tc.namespace = schema.target_namespace.clone();
        }
        Ok(Arc::new(tc))
    }

    /// Typecode for a type reference: XSD built-in or a named type
    fn typecode_for_descriptor(
        &self,
        schema: &Arc<Schema>,
        descriptor: &TypeDescriptor,
        pname: &str,
        depth: usize,
    ) -> Result<TypeCode> {
        if descriptor.is_xsd() {
            let kind = builtin_kind(&descriptor.name).ok_or_else(|| {
                SchemaError::new(format!("unsupported built-in type '{}'", descriptor.name))
            })?;
            return Ok(TypeCode::primitive(kind, pname));
        }

        let resolved = schema.resolve_qname(Collection::Types, descriptor)?;
        let owner = resolved.schema.clone().unwrap_or_else(|| Arc::clone(schema));
        let target = owner.component(resolved.id);
        match target.kind {
            ComponentKind::ComplexType => self.complex_typecode(&owner, resolved.id, pname, depth),
            ComponentKind::SimpleType => {
                let kind = self.simple_kind(&owner, resolved.id, depth)?;
                Ok(TypeCode::primitive(kind, pname))
            }
            other => Err(SchemaError::new(format!(
                "'{}' resolves to <{}>, not a type",
                descriptor.clark(),
                other.tag()
            ))
            .into()),
        }
    }

    /// Struct typecode for a complex type, derivation flattened
    fn complex_typecode(
        &self,
        schema: &Arc<Schema>,
        id: ComponentId,
        pname: &str,
        depth: usize,
    ) -> Result<TypeCode> {
        if depth > MAX_DEPTH {
            return Err(SchemaError::new("type nesting too deep (cycle?)").into());
        }

        let component = schema.component(id);
        let type_name = component
            .name()
            .map(|n| capitalize(n))
            .unwrap_or_else(|| capitalize(pname));

        let mut ofwhat = Vec::new();
        for (owner, particle_id, in_choice) in schema.effective_particles(id, depth)? {
            let owner = owner.unwrap_or_else(|| Arc::clone(schema));
            let mut particle = self.particle_typecode(&owner, particle_id, depth + 1)?;
            // A choice alternative may legitimately be absent.
            if in_choice && particle.occurs.min > 0 {
                let mut relaxed = (*particle).clone();
                relaxed.occurs.min = 0;
                particle = Arc::new(relaxed);
            }
            ofwhat.push(particle);
        }

        let mut attributes = IndexMap::new();
        for (owner, attr_id) in schema.effective_attributes(id, depth)? {
            let owner = owner.unwrap_or_else(|| Arc::clone(schema));
            let (descriptor, attr_tc) = self.attribute_typecode(&owner, attr_id, depth + 1)?;
            attributes.insert(descriptor, attr_tc);
        }

        let mut tc = TypeCode::structure(pname, type_name, ofwhat);
        tc.attributes = attributes;
        tc.mixed = component.mixed();
        Ok(tc)
    }

    /// Typecode and descriptor for one attribute use
    fn attribute_typecode(
        &self,
        schema: &Arc<Schema>,
        id: ComponentId,
        depth: usize,
    ) -> Result<(TypeDescriptor, Arc<TypeCode>)> {
        if depth > MAX_DEPTH {
            return Err(SchemaError::new("type nesting too deep (cycle?)").into());
        }

        let component = schema.component(id);
        match component.kind {
            ComponentKind::AttributeDecl => {
                let name = component.name().ok_or_else(|| {
                    SchemaError::new("attribute without a name").with_component("attribute")
                })?;

                let kind = match component.type_descriptor() {
                    Some(descriptor) if descriptor.is_xsd() => builtin_kind(&descriptor.name)
                        .ok_or_else(|| {
                            SchemaError::new(format!(
                                "unsupported built-in type '{}'",
                                descriptor.name
                            ))
                        })?,
                    Some(descriptor) => {
                        let resolved = schema.resolve_qname(Collection::Types, descriptor)?;
                        let owner =
                            resolved.schema.clone().unwrap_or_else(|| Arc::clone(schema));
                        self.simple_kind(&owner, resolved.id, depth)?
                    }
                    None => match component.content.first() {
                        Some(&cid) => self.simple_kind(schema, cid, depth)?,
                        None => TypeCodeKind::String,
                    },
                };

                let qualified = matches!(component.get("form"), Some("qualified"));
                let descriptor = if qualified {
                    match &schema.target_namespace {
                        Some(ns) => TypeDescriptor::namespaced(ns, name),
                        None => TypeDescriptor::local(name),
                    }
                } else {
                    TypeDescriptor::local(name)
                };
                Ok((descriptor, Arc::new(TypeCode::builtin(kind))))
            }
            ComponentKind::AttributeRef => {
                let reference = component.ref_descriptor().ok_or_else(|| {
                    SchemaError::new("attribute reference without ref attribute")
                })?;
                let resolved = schema.resolve_qname(Collection::AttrDecl, reference)?;
                let owner = resolved.schema.clone().unwrap_or_else(|| Arc::clone(schema));
                self.attribute_typecode(&owner, resolved.id, depth + 1)
            }
            // anyAttribute carries no declared kind
            ComponentKind::AnyAttribute => Ok((
                TypeDescriptor::local("any"),
                Arc::new(TypeCode::builtin(TypeCodeKind::String)),
            )),
            other => Err(SchemaError::new(format!(
                "component <{}> is not an attribute use",
                other.tag()
            ))
            .into()),
        }
    }

    /// Chase a simple type to its primitive kind
    fn simple_kind(
        &self,
        schema: &Arc<Schema>,
        id: ComponentId,
        depth: usize,
    ) -> Result<TypeCodeKind> {
        if depth > MAX_DEPTH {
            return Err(SchemaError::new("type nesting too deep (cycle?)").into());
        }

        let component = schema.component(id);
        let variety = match component.content.first() {
            Some(&cid) => schema.component(cid),
            None => return Ok(TypeCodeKind::String),
        };

        match variety.kind {
            ComponentKind::Restriction => match variety.base_descriptor() {
                Some(base) if base.is_xsd() => builtin_kind(&base.name).ok_or_else(|| {
                    SchemaError::new(format!("unsupported built-in type '{}'", base.name)).into()
                }),
                Some(base) => {
                    let resolved = schema.resolve_qname(Collection::Types, base)?;
                    let owner = resolved.schema.clone().unwrap_or_else(|| Arc::clone(schema));
                    self.simple_kind(&owner, resolved.id, depth + 1)
                }
                None => match variety.content.first() {
                    Some(&cid) => self.simple_kind_of_child(schema, cid, depth),
                    None => Ok(TypeCodeKind::String),
                },
            },
            // Lists keep their space-separated lexical form as text.
            ComponentKind::List => Ok(TypeCodeKind::String),
            ComponentKind::Union => match variety.member_types.first() {
                Some(member) if member.is_xsd() => {
                    Ok(builtin_kind(&member.name).unwrap_or(TypeCodeKind::String))
                }
                _ => Ok(TypeCodeKind::String),
            },
            _ => Ok(TypeCodeKind::String),
        }
    }

    fn simple_kind_of_child(
        &self,
        schema: &Arc<Schema>,
        id: ComponentId,
        depth: usize,
    ) -> Result<TypeCodeKind> {
        let child = schema.component(id);
        if child.kind == ComponentKind::SimpleType {
            self.simple_kind(schema, id, depth + 1)
        } else {
            Ok(TypeCodeKind::String)
        }
    }
}

/// Primitive kind of an XSD built-in type name
pub fn builtin_kind(name: &str) -> Option<TypeCodeKind> {
    Some(match name {
        "string" | "normalizedString" | "token" | "anyURI" | "QName" | "NMTOKEN" | "NMTOKENS"
        | "Name" | "NCName" | "ID" | "IDREF" | "IDREFS" | "language" | "duration"
        | "hexBinary" | "gYear" | "gYearMonth" | "gMonth" | "gMonthDay" | "gDay" => {
            TypeCodeKind::String
        }
        "boolean" => TypeCodeKind::Boolean,
        "integer" | "int" | "long" | "short" | "byte" | "nonNegativeInteger"
        | "nonPositiveInteger" | "negativeInteger" | "positiveInteger" | "unsignedLong"
        | "unsignedInt" | "unsignedShort" | "unsignedByte" => TypeCodeKind::Integer,
        "float" | "double" => TypeCodeKind::Float,
        "decimal" => TypeCodeKind::Decimal,
        "dateTime" => TypeCodeKind::DateTime,
        "date" => TypeCodeKind::Date,
        "time" => TypeCodeKind::Time,
        "base64Binary" => TypeCodeKind::Base64,
        "anyType" | "anySimpleType" => TypeCodeKind::Any,
        _ => return None,
    })
}

fn capitalize(name: &str) -> String {
    let name = accessor_name(name);
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::XmlDocument;
    use crate::schema::SchemaReader;
    use crate::typecode::value::Value;
    use quick_xml::Writer;

    const XSD: &str = "http://www.w3.org/2001/XMLSchema";

    fn builder(xml: &str) -> TypeCodeBuilder {
        let reader = SchemaReader::new();
        TypeCodeBuilder::new(reader.load_from_string(xml).unwrap())
    }

    #[test]
    fn test_element_with_builtin_type() {
        let b = builder(&format!(
            r#"<xsd:schema xmlns:xsd="{XSD}" targetNamespace="http://example.com"
                 xmlns:tns="http://example.com">
                 <xsd:element name="count" type="xsd:int" nillable="true"/>
               </xsd:schema>"#
        ));
        let tc = b.element("count").unwrap();
        assert_eq!(tc.kind, TypeCodeKind::Integer);
        assert_eq!(tc.pname, "count");
        assert!(tc.nillable);
    }

    #[test]
    fn test_complex_type_wire_order_and_names() {
        let b = builder(&format!(
            r#"<xsd:schema xmlns:xsd="{XSD}" targetNamespace="http://example.com"
                 xmlns:tns="http://example.com">
                 <xsd:complexType name="order">
                   <xsd:sequence>
                     <xsd:element name="id" type="xsd:int"/>
                     <xsd:element name="note" type="xsd:string" minOccurs="0"/>
                     <xsd:element name="line" type="xsd:string" maxOccurs="unbounded"/>
                   </xsd:sequence>
                   <xsd:attribute name="version" type="xsd:int"/>
                 </xsd:complexType>
                 <xsd:element name="order" type="tns:order"/>
               </xsd:schema>"#
        ));
        let tc = b.element("order").unwrap();
        assert_eq!(tc.kind, TypeCodeKind::Struct);
        assert_eq!(tc.type_name.as_deref(), Some("Order"));

        let pnames: Vec<_> = tc.ofwhat.iter().map(|c| c.pname.as_str()).collect();
        assert_eq!(pnames, vec!["id", "note", "line"]);
        assert!(tc.ofwhat[1].occurs.is_emptiable());
        assert!(tc.ofwhat[2].occurs.is_multiple());

        let version = TypeDescriptor::local("version");
        assert_eq!(tc.attributes[&version].kind, TypeCodeKind::Integer);
    }

    #[test]
    fn test_extension_flattens_base_first() {
        let b = builder(&format!(
            r#"<xsd:schema xmlns:xsd="{XSD}" targetNamespace="http://example.com"
                 xmlns:tns="http://example.com">
                 <xsd:complexType name="base">
                   <xsd:sequence><xsd:element name="id" type="xsd:int"/></xsd:sequence>
                   <xsd:attribute name="kind" type="xsd:string"/>
                 </xsd:complexType>
                 <xsd:complexType name="derived">
                   <xsd:complexContent>
                     <xsd:extension base="tns:base">
                       <xsd:sequence><xsd:element name="label" type="xsd:string"/></xsd:sequence>
                       <xsd:attribute name="extra" type="xsd:string"/>
                     </xsd:extension>
                   </xsd:complexContent>
                 </xsd:complexType>
                 <xsd:element name="it" type="tns:derived"/>
               </xsd:schema>"#
        ));
        let tc = b.element("it").unwrap();
        let pnames: Vec<_> = tc.ofwhat.iter().map(|c| c.pname.as_str()).collect();
        assert_eq!(pnames, vec!["id", "label"]);

        let attr_names: Vec<_> = tc.attributes.keys().map(|d| d.name.as_str()).collect();
        assert_eq!(attr_names, vec!["kind", "extra"]);
    }

    #[test]
    fn test_named_simple_type_chased_to_primitive() {
        let b = builder(&format!(
            r#"<xsd:schema xmlns:xsd="{XSD}" targetNamespace="http://example.com"
                 xmlns:tns="http://example.com">
                 <xsd:simpleType name="quantity">
                   <xsd:restriction base="xsd:int">
                     <xsd:minInclusive value="0"/>
                   </xsd:restriction>
                 </xsd:simpleType>
                 <xsd:simpleType name="narrow">
                   <xsd:restriction base="tns:quantity"/>
                 </xsd:simpleType>
                 <xsd:element name="amount" type="tns:narrow"/>
               </xsd:schema>"#
        ));
        let tc = b.element("amount").unwrap();
        assert_eq!(tc.kind, TypeCodeKind::Integer);
    }

    #[test]
    fn test_named_type_bound_to_wire_name() {
        let b = builder(&format!(
            r#"<xsd:schema xmlns:xsd="{XSD}" targetNamespace="http://example.com"
                 xmlns:tns="http://example.com">
                 <xsd:complexType name="order">
                   <xsd:sequence><xsd:element name="id" type="xsd:int"/></xsd:sequence>
                 </xsd:complexType>
                 <xsd:simpleType name="quantity">
                   <xsd:restriction base="xsd:int"/>
                 </xsd:simpleType>
               </xsd:schema>"#
        ));

        let tc = b.named_type("order", "purchase").unwrap();
        assert_eq!(tc.kind, TypeCodeKind::Struct);
        assert_eq!(tc.pname, "purchase");
        assert_eq!(tc.type_name.as_deref(), Some("Order"));

        let mut record = tc.instantiate();
        record.set_field("id", Value::Integer(9));
        let mut xml = Writer::new(Vec::new());
        tc.serialize(&Value::Struct(record), &mut xml).unwrap();
        let out = String::from_utf8(xml.into_inner()).unwrap();
        assert_eq!(out, "<purchase><id>9</id></purchase>");

        let qty = b.named_type("quantity", "count").unwrap();
        assert_eq!(qty.kind, TypeCodeKind::Integer);
        assert_eq!(qty.pname, "count");

        assert!(b.named_type("ghost", "x").is_err());
    }

    #[test]
    fn test_choice_alternative_decodes_alone() {
        let b = builder(&format!(
            r#"<xsd:schema xmlns:xsd="{XSD}" targetNamespace="http://example.com"
                 xmlns:tns="http://example.com">
                 <xsd:complexType name="eitherType">
                   <xsd:choice>
                     <xsd:element name="a" type="xsd:string"/>
                     <xsd:element name="b" type="xsd:string"/>
                   </xsd:choice>
                 </xsd:complexType>
                 <xsd:element name="either" type="tns:eitherType"/>
               </xsd:schema>"#
        ));
        let tc = b.element("either").unwrap();
        // Each alternative becomes an individually optional particle.
        assert!(tc.ofwhat.iter().all(|c| c.occurs.is_emptiable()));

        let doc = XmlDocument::from_str("<either><a>x</a></either>").unwrap();
        match tc.deserialize(&doc.root()).unwrap() {
            Value::Struct(record) => {
                assert_eq!(record.field("a"), Some(&Value::from("x")));
                assert_eq!(record.field("b"), None);
            }
            other => panic!("expected struct, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_element_is_schema_error() {
        let b = builder(&format!(r#"<xsd:schema xmlns:xsd="{XSD}"/>"#));
        let err = b.element("ghost").unwrap_err();
        assert!(matches!(err, crate::error::Error::Schema(_)));
    }

    #[test]
    fn test_element_ref_keeps_referencing_occurs() {
        let b = builder(&format!(
            r#"<xsd:schema xmlns:xsd="{XSD}" targetNamespace="http://example.com"
                 xmlns:tns="http://example.com">
                 <xsd:element name="item" type="xsd:string"/>
                 <xsd:complexType name="list">
                   <xsd:sequence>
                     <xsd:element ref="tns:item" minOccurs="0" maxOccurs="unbounded"/>
                   </xsd:sequence>
                 </xsd:complexType>
                 <xsd:element name="items" type="tns:list"/>
               </xsd:schema>"#
        ));
        let tc = b.element("items").unwrap();
        assert_eq!(tc.ofwhat.len(), 1);
        let item = &tc.ofwhat[0];
        assert_eq!(item.pname, "item");
        assert!(item.occurs.is_emptiable());
        assert!(item.occurs.is_multiple());
    }

    #[test]
    fn test_anonymous_inline_type() {
        let b = builder(&format!(
            r#"<xsd:schema xmlns:xsd="{XSD}" targetNamespace="http://example.com"
                 xmlns:tns="http://example.com">
                 <xsd:element name="point">
                   <xsd:complexType>
                     <xsd:sequence>
                       <xsd:element name="x" type="xsd:float"/>
                       <xsd:element name="y" type="xsd:float"/>
                     </xsd:sequence>
                   </xsd:complexType>
                 </xsd:element>
               </xsd:schema>"#
        ));
        let tc = b.element("point").unwrap();
        assert_eq!(tc.kind, TypeCodeKind::Struct);
        // Anonymous type takes its name from the element.
        assert_eq!(tc.type_name.as_deref(), Some("Point"));
        assert_eq!(tc.ofwhat.len(), 2);
    }
}
