//! End-to-end tests across the schema, typecode, surface and writer
//! subsystems.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use proptest::prelude::*;

use soapwire::dom::{DomAdapter, XmlDocument};
use soapwire::schema::{Occurs, SchemaReader};
use soapwire::typecode::{TypeCode, TypeCodeBuilder, TypeCodeKind, Value};
use soapwire::{ClassSurface, Error, SoapWriter};

const XSD: &str = "http://www.w3.org/2001/XMLSchema";

fn order_schema() -> String {
    format!(
        r#"<xsd:schema xmlns:xsd="{XSD}" targetNamespace="http://example.com/orders"
             xmlns:tns="http://example.com/orders">
             <xsd:complexType name="order">
               <xsd:sequence>
                 <xsd:element name="id" type="xsd:int"/>
                 <xsd:element name="note" type="xsd:string" minOccurs="0" nillable="true"/>
                 <xsd:element name="line" type="xsd:string" minOccurs="0" maxOccurs="unbounded"/>
               </xsd:sequence>
               <xsd:attribute name="version" type="xsd:int"/>
             </xsd:complexType>
             <xsd:element name="order" type="tns:order"/>
           </xsd:schema>"#
    )
}

#[test]
fn schema_to_envelope_and_back() {
    let reader = SchemaReader::new();
    let schema = reader.load_from_string(&order_schema()).unwrap();
    let typecode = TypeCodeBuilder::new(schema).element("order").unwrap();
    let surface = ClassSurface::generate(Arc::clone(&typecode)).unwrap();

    let mut record = surface.instantiate();
    surface.set(&mut record, "Id", Value::Integer(7)).unwrap();
    surface.set(&mut record, "Line", Value::from("widget")).unwrap();
    let version = soapwire::TypeDescriptor::local("version");
    surface
        .set_attribute(&mut record, &version, Value::Integer(2))
        .unwrap();

    let mut writer = SoapWriter::new(Vec::new());
    writer.open(&[], &[]).unwrap();
    writer
        .serialize(&Value::Struct(record.clone()), Some(&typecode), None)
        .unwrap();
    writer.close(&[]).unwrap();
    let envelope = String::from_utf8(writer.into_inner().unwrap()).unwrap();

    assert!(envelope
        .contains(r#"<order version="2"><id>7</id><line>widget</line></order>"#));

    // Parse the envelope back and deserialize the body content.
    let doc = XmlDocument::from_str(&envelope).unwrap();
    let body = doc.root().child_elements(&["Body"]).into_iter().next().unwrap();
    let element = body.child_elements(&[]).into_iter().next().unwrap();
    match typecode.deserialize(&element).unwrap() {
        Value::Struct(back) => {
            assert_eq!(back.field("id"), Some(&Value::Integer(7)));
            assert_eq!(
                back.field("line"),
                Some(&Value::List(vec![Value::from("widget")]))
            );
            assert_eq!(back.attribute(&version), Some(&Value::Integer(2)));
        }
        other => panic!("expected struct, got {:?}", other),
    }
}

#[test]
fn colliding_particles_fail_at_generation_not_use() {
    let reader = SchemaReader::new();
    let schema = reader
        .load_from_string(&format!(
            r#"<xsd:schema xmlns:xsd="{XSD}" targetNamespace="http://example.com"
                 xmlns:tns="http://example.com">
                 <xsd:complexType name="clash">
                   <xsd:sequence>
                     <xsd:element name="foo" type="xsd:string"/>
                     <xsd:element name="Foo" type="xsd:string"/>
                   </xsd:sequence>
                 </xsd:complexType>
                 <xsd:element name="clash" type="tns:clash"/>
               </xsd:schema>"#
        ))
        .unwrap();

    // The typecode itself builds fine; the surface refuses.
    let typecode = TypeCodeBuilder::new(schema).element("clash").unwrap();
    let err = ClassSurface::generate(typecode).unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
}

#[test]
fn nillable_field_survives_the_wire() {
    let reader = SchemaReader::new();
    let schema = reader.load_from_string(&order_schema()).unwrap();
    let typecode = TypeCodeBuilder::new(schema).element("order").unwrap();

    let mut record = typecode.instantiate();
    record.set_field("id", Value::Integer(1));
    record.set_field("note", Value::Nil);

    let mut writer = SoapWriter::new(Vec::new());
    writer.open(&[], &[]).unwrap();
    writer
        .serialize(&Value::Struct(record), Some(&typecode), None)
        .unwrap();
    writer.close(&[]).unwrap();
    let envelope = String::from_utf8(writer.into_inner().unwrap()).unwrap();
    assert!(envelope.contains(r#"<note xsi:nil="1"/>"#));

    let doc = XmlDocument::from_str(&envelope).unwrap();
    let body = doc.root().child_elements(&["Body"]).into_iter().next().unwrap();
    let element = body.child_elements(&[]).into_iter().next().unwrap();
    match typecode.deserialize(&element).unwrap() {
        Value::Struct(back) => assert_eq!(back.field("note"), Some(&Value::Nil)),
        other => panic!("expected struct, got {:?}", other),
    }
}

#[test]
fn occurrence_bounds_enforced_on_decode() {
    let reader = SchemaReader::new();
    let schema = reader.load_from_string(&order_schema()).unwrap();
    let typecode = TypeCodeBuilder::new(schema).element("order").unwrap();

    // Two <id> children where exactly one is allowed.
    let doc = XmlDocument::from_str(
        "<order><id>1</id><id>2</id></order>",
    )
    .unwrap();
    let err = typecode.deserialize(&doc.root()).unwrap_err();
    assert!(matches!(err, Error::Decode(_)));
}

fn round_trip(typecode: &TypeCode, value: &Value) -> Value {
    let mut xml = quick_xml::Writer::new(Vec::new());
    typecode.serialize(value, &mut xml).unwrap();
    let out = String::from_utf8(xml.into_inner()).unwrap();
    let doc = XmlDocument::from_str(&out).unwrap();
    typecode.deserialize(&doc.root()).unwrap()
}

proptest! {
    #[test]
    fn integers_round_trip(v in any::<i64>()) {
        let tc = TypeCode::primitive(TypeCodeKind::Integer, "n");
        prop_assert_eq!(round_trip(&tc, &Value::Integer(v)), Value::Integer(v));
    }

    #[test]
    fn booleans_round_trip(v in any::<bool>()) {
        let tc = TypeCode::primitive(TypeCodeKind::Boolean, "b");
        prop_assert_eq!(round_trip(&tc, &Value::Boolean(v)), Value::Boolean(v));
    }

    #[test]
    fn floats_round_trip(v in prop::num::f64::NORMAL) {
        let tc = TypeCode::primitive(TypeCodeKind::Float, "f");
        prop_assert_eq!(round_trip(&tc, &Value::Float(v)), Value::Float(v));
    }

    #[test]
    fn strings_round_trip(
        v in "[a-zA-Z0-9&<>'\"_.,;]{1,40}"
    ) {
        let tc = TypeCode::primitive(TypeCodeKind::String, "s");
        prop_assert_eq!(
            round_trip(&tc, &Value::String(v.clone())),
            Value::String(v)
        );
    }

    #[test]
    fn unbounded_integer_arrays_round_trip(items in prop::collection::vec(any::<i64>(), 1..20)) {
        let tc = TypeCode::structure(
            "batch",
            "Batch",
            vec![Arc::new(
                TypeCode::primitive(TypeCodeKind::Integer, "n")
                    .with_occurs(Occurs::zero_or_more()),
            )],
        );
        let list = Value::List(items.iter().copied().map(Value::Integer).collect());
        let mut record = tc.instantiate();
        record.set_field("n", list.clone());

        match round_trip(&tc, &Value::Struct(record)) {
            Value::Struct(back) => prop_assert_eq!(back.field("n"), Some(&list)),
            other => prop_assert!(false, "expected struct, got {:?}", other),
        }
    }
}
