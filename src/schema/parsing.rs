//! Content parsers for schema constructs
//!
//! Each construct consumes its ordered children with the same phase
//! discipline the schema root uses: a leading `annotation`, the
//! kind-specific content, and trailing `annotation`s. A child tag
//! invalid for every remaining phase is a [`SchemaError`].

use crate::dom::DomAdapter;
use crate::error::{Error, Result, SchemaError};

use super::base::{ComponentKind, Facet, FACET_NAMES};
use super::components::{Component, ComponentId};
use super::schemas::Schema;

/// Ordered walk over a node's child elements
pub(crate) struct Cursor<A: DomAdapter> {
    children: Vec<A>,
    pos: usize,
}

impl<A: DomAdapter> Cursor<A> {
    pub fn new(node: &A) -> Self {
        Self {
            children: node.child_elements(&[]),
            pos: 0,
        }
    }

    /// Local name of the next unconsumed child
    pub fn peek_tag(&self) -> Option<&str> {
        self.children.get(self.pos).map(|c| c.local_name())
    }

    /// Consume and return the next child
    pub fn next(&mut self) -> A {
        let child = self.children[self.pos].clone();
        self.pos += 1;
        child
    }

    /// Consume the next child if its local name matches
    pub fn take_if(&mut self, tags: &[&str]) -> Option<A> {
        match self.peek_tag() {
            Some(tag) if tags.contains(&tag) => Some(self.next()),
            _ => None,
        }
    }

    /// Consume a run of same-named children
    pub fn skip_run(&mut self, tag: &str) {
        while self.peek_tag() == Some(tag) {
            self.pos += 1;
        }
    }

    /// True once every child has been consumed
    pub fn done(&self) -> bool {
        self.pos >= self.children.len()
    }

    /// Error for a child no remaining phase accepts
    pub fn unknown_component(&self, parent: ComponentKind) -> Error {
        let tag = self
            .children
            .get(self.pos)
            .map(|c| c.local_name().to_string())
            .unwrap_or_default();
        SchemaError::new(format!("unknown component <{}>", tag))
            .with_component(parent.tag())
            .into()
    }
}

/// Build a component from a node and recursively parse its content
pub(crate) fn parse_construct<A: DomAdapter>(
    schema: &mut Schema,
    node: &A,
    kind: ComponentKind,
    parent: Option<ComponentId>,
) -> Result<ComponentId> {
    let component = Component::from_node(kind, node, parent, &schema.defaults)?;
    let id = schema.push(component);
    parse_content(schema, node, id, kind)?;
    Ok(id)
}

fn parse_content<A: DomAdapter>(
    schema: &mut Schema,
    node: &A,
    id: ComponentId,
    kind: ComponentKind,
) -> Result<()> {
    let mut cursor = Cursor::new(node);
    cursor.skip_run("annotation");

    match kind {
        ComponentKind::Import
        | ComponentKind::Include
        | ComponentKind::Notation
        | ComponentKind::AttributeRef
        | ComponentKind::AttributeGroupRef
        | ComponentKind::ModelGroupRef
        | ComponentKind::AnyAttribute
        | ComponentKind::AnyElement
        | ComponentKind::ElementRef => {}

        ComponentKind::AttributeDecl => {
            if let Some(child) = cursor.take_if(&["simpleType"]) {
                let cid = parse_construct(schema, &child, ComponentKind::SimpleType, Some(id))?;
                schema.component_mut(id).content.push(cid);
            }
        }

        ComponentKind::AttributeGroup => {
            parse_attribute_uses(schema, &mut cursor, id)?;
        }

        ComponentKind::ElementDecl => {
            if let Some(child) = cursor.take_if(&["simpleType", "complexType"]) {
                let child_kind = if child.local_name() == "simpleType" {
                    ComponentKind::SimpleType
                } else {
                    ComponentKind::ComplexType
                };
                let cid = parse_construct(schema, &child, child_kind, Some(id))?;
                schema.component_mut(id).content.push(cid);
            }
            // Identity constraints are accepted but not modeled.
            while cursor.take_if(&["key", "keyref", "unique"]).is_some() {}
        }

        ComponentKind::Sequence | ComponentKind::Choice => {
            while let Some(child) =
                cursor.take_if(&["element", "group", "choice", "sequence", "any"])
            {
                let cid = parse_particle(schema, &child, id)?;
                schema.component_mut(id).content.push(cid);
            }
        }

        ComponentKind::All => {
            while let Some(child) = cursor.take_if(&["element"]) {
                let cid = parse_particle(schema, &child, id)?;
                schema.component_mut(id).content.push(cid);
            }
        }

        ComponentKind::ModelGroupDef => {
            if let Some(child) = cursor.take_if(&["all", "choice", "sequence"]) {
                let cid = parse_model_group(schema, &child, id)?;
                schema.component_mut(id).content.push(cid);
            }
        }

        ComponentKind::ComplexType => {
            if let Some(child) = cursor.take_if(&["simpleContent", "complexContent"]) {
                let child_kind = if child.local_name() == "simpleContent" {
                    ComponentKind::SimpleContent
                } else {
                    ComponentKind::ComplexContent
                };
                let cid = parse_construct(schema, &child, child_kind, Some(id))?;
                schema.component_mut(id).content.push(cid);
            } else {
                if let Some(child) = cursor.take_if(&["group", "all", "choice", "sequence"]) {
                    let cid = parse_model_group(schema, &child, id)?;
                    schema.component_mut(id).content.push(cid);
                }
                parse_attribute_uses(schema, &mut cursor, id)?;
            }
        }

        ComponentKind::SimpleContent | ComponentKind::ComplexContent => {
            if let Some(child) = cursor.take_if(&["restriction", "extension"]) {
                let child_kind = if child.local_name() == "restriction" {
                    ComponentKind::Restriction
                } else {
                    ComponentKind::Extension
                };
                let cid = parse_construct(schema, &child, child_kind, Some(id))?;
                schema.component_mut(id).content.push(cid);
            } else {
                return Err(SchemaError::new("content model requires restriction or extension")
                    .with_component(kind.tag())
                    .into());
            }
        }

        ComponentKind::Extension => {
            if let Some(child) = cursor.take_if(&["group", "all", "choice", "sequence"]) {
                let cid = parse_model_group(schema, &child, id)?;
                schema.component_mut(id).content.push(cid);
            }
            parse_attribute_uses(schema, &mut cursor, id)?;
        }

        ComponentKind::Restriction => {
            // Grammar depends on the enclosing construct: simple-type
            // restrictions carry facets, complexContent ones carry a
            // model group, simpleContent ones may carry both facets and
            // attribute uses.
            let parent_kind = schema
                .component(id)
                .parent
                .map(|p| schema.component(p).kind);

            match parent_kind {
                Some(ComponentKind::ComplexContent) => {
                    if let Some(child) = cursor.take_if(&["group", "all", "choice", "sequence"]) {
                        let cid = parse_model_group(schema, &child, id)?;
                        schema.component_mut(id).content.push(cid);
                    }
                    parse_attribute_uses(schema, &mut cursor, id)?;
                }
                _ => {
                    if let Some(child) = cursor.take_if(&["simpleType"]) {
                        let cid =
                            parse_construct(schema, &child, ComponentKind::SimpleType, Some(id))?;
                        schema.component_mut(id).content.push(cid);
                    }
                    while let Some(child) = cursor.take_if(FACET_NAMES) {
                        let facet = Facet {
                            name: child.local_name().to_string(),
                            value: child.attribute_map().get("value").cloned(),
                        };
                        schema.component_mut(id).facets.push(facet);
                    }
                    if parent_kind == Some(ComponentKind::SimpleContent) {
                        parse_attribute_uses(schema, &mut cursor, id)?;
                    }
                }
            }
        }

        ComponentKind::SimpleType => {
            if let Some(child) = cursor.take_if(&["restriction", "list", "union"]) {
                let child_kind = match child.local_name() {
                    "restriction" => ComponentKind::Restriction,
                    "list" => ComponentKind::List,
                    _ => ComponentKind::Union,
                };
                let cid = parse_construct(schema, &child, child_kind, Some(id))?;
                schema.component_mut(id).content.push(cid);
            } else {
                return Err(SchemaError::new("simpleType requires restriction, list or union")
                    .with_component(kind.tag())
                    .into());
            }
        }

        ComponentKind::List => {
            if let Some(child) = cursor.take_if(&["simpleType"]) {
                let cid = parse_construct(schema, &child, ComponentKind::SimpleType, Some(id))?;
                schema.component_mut(id).content.push(cid);
            }
        }

        ComponentKind::Union => {
            while let Some(child) = cursor.take_if(&["simpleType"]) {
                let cid = parse_construct(schema, &child, ComponentKind::SimpleType, Some(id))?;
                schema.component_mut(id).content.push(cid);
            }
        }

        // The schema root is parsed by Schema::load.
        ComponentKind::Schema => {}
    }

    cursor.skip_run("annotation");
    if !cursor.done() {
        return Err(cursor.unknown_component(kind));
    }
    Ok(())
}

/// Parse one particle child of a model group
fn parse_particle<A: DomAdapter>(
    schema: &mut Schema,
    node: &A,
    parent: ComponentId,
) -> Result<ComponentId> {
    let kind = match node.local_name() {
        "element" => {
            if node.has_attribute("ref") {
                ComponentKind::ElementRef
            } else {
                ComponentKind::ElementDecl
            }
        }
        "group" => ComponentKind::ModelGroupRef,
        "choice" => ComponentKind::Choice,
        "sequence" => ComponentKind::Sequence,
        "any" => ComponentKind::AnyElement,
        other => {
            return Err(SchemaError::new(format!("unknown particle <{}>", other)).into());
        }
    };
    parse_construct(schema, node, kind, Some(parent))
}

/// Parse a `group | all | choice | sequence` child
fn parse_model_group<A: DomAdapter>(
    schema: &mut Schema,
    node: &A,
    parent: ComponentId,
) -> Result<ComponentId> {
    let kind = match node.local_name() {
        "group" => ComponentKind::ModelGroupRef,
        "all" => ComponentKind::All,
        "choice" => ComponentKind::Choice,
        "sequence" => ComponentKind::Sequence,
        other => {
            return Err(SchemaError::new(format!("unknown model group <{}>", other)).into());
        }
    };
    parse_construct(schema, node, kind, Some(parent))
}

/// Parse a run of `attribute | attributeGroup | anyAttribute` uses into
/// the owner's attribute content
fn parse_attribute_uses<A: DomAdapter>(
    schema: &mut Schema,
    cursor: &mut Cursor<A>,
    owner: ComponentId,
) -> Result<()> {
    while let Some(child) = cursor.take_if(&["attribute", "attributeGroup", "anyAttribute"]) {
        let kind = match child.local_name() {
            "attribute" => {
                if child.has_attribute("ref") {
                    ComponentKind::AttributeRef
                } else {
                    ComponentKind::AttributeDecl
                }
            }
            "attributeGroup" => ComponentKind::AttributeGroupRef,
            _ => ComponentKind::AnyAttribute,
        };
        let cid = parse_construct(schema, &child, kind, Some(owner))?;
        schema.component_mut(owner).attr_content.push(cid);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::XmlDocument;
    use crate::schema::reader::SchemaReader;

    const XSD: &str = "http://www.w3.org/2001/XMLSchema";

    fn load(xml: &str) -> Schema {
        let doc = XmlDocument::from_str(xml).unwrap();
        let reader = SchemaReader::new();
        let mut schema = Schema::new();
        schema.load(&doc.root(), &reader).unwrap();
        schema
    }

    #[test]
    fn test_complex_type_sequence_particles() {
        let schema = load(&format!(
            r#"<xsd:schema xmlns:xsd="{XSD}">
                 <xsd:complexType name="order">
                   <xsd:annotation><xsd:documentation>doc</xsd:documentation></xsd:annotation>
                   <xsd:sequence>
                     <xsd:element name="id" type="xsd:int"/>
                     <xsd:element name="note" type="xsd:string" minOccurs="0"/>
                   </xsd:sequence>
                   <xsd:attribute name="version" type="xsd:string"/>
                 </xsd:complexType>
               </xsd:schema>"#
        ));

        let ct = schema.component(schema.types["order"]);
        assert_eq!(ct.content.len(), 1);
        assert_eq!(ct.attr_content.len(), 1);

        let seq = schema.component(ct.content[0]);
        assert_eq!(seq.kind, ComponentKind::Sequence);
        assert_eq!(seq.content.len(), 2);

        let note = schema.component(seq.content[1]);
        assert_eq!(note.name(), Some("note"));
        assert!(note.occurs().unwrap().is_emptiable());

        let version = schema.component(ct.attr_content[0]);
        assert_eq!(version.kind, ComponentKind::AttributeDecl);
    }

    #[test]
    fn test_element_ref_vs_decl() {
        let schema = load(&format!(
            r#"<xsd:schema xmlns:xsd="{XSD}" targetNamespace="http://example.com"
                 xmlns:tns="http://example.com">
                 <xsd:element name="item" type="xsd:string"/>
                 <xsd:complexType name="list">
                   <xsd:sequence>
                     <xsd:element ref="tns:item" maxOccurs="unbounded"/>
                   </xsd:sequence>
                 </xsd:complexType>
               </xsd:schema>"#
        ));

        let ct = schema.component(schema.types["list"]);
        let seq = schema.component(ct.content[0]);
        let reference = schema.component(seq.content[0]);
        assert_eq!(reference.kind, ComponentKind::ElementRef);
        assert_eq!(reference.ref_descriptor().unwrap().name, "item");
        assert!(reference.occurs().unwrap().is_multiple());
    }

    #[test]
    fn test_simple_type_facets_are_metadata() {
        let schema = load(&format!(
            r#"<xsd:schema xmlns:xsd="{XSD}">
                 <xsd:simpleType name="code">
                   <xsd:restriction base="xsd:string">
                     <xsd:pattern value="[A-Z]{{3}}"/>
                     <xsd:maxLength value="3"/>
                   </xsd:restriction>
                 </xsd:simpleType>
               </xsd:schema>"#
        ));

        let st = schema.component(schema.types["code"]);
        let restriction = schema.component(st.content[0]);
        assert_eq!(restriction.kind, ComponentKind::Restriction);
        assert_eq!(restriction.base_descriptor().unwrap().name, "string");
        assert_eq!(restriction.facets.len(), 2);
        assert_eq!(restriction.facets[0].name, "pattern");
        assert_eq!(restriction.facets[1].value.as_deref(), Some("3"));
    }

    #[test]
    fn test_unknown_child_is_schema_error() {
        let doc = XmlDocument::from_str(&format!(
            r#"<xsd:schema xmlns:xsd="{XSD}">
                 <xsd:complexType name="bad">
                   <xsd:sequence/>
                   <xsd:sequence/>
                 </xsd:complexType>
               </xsd:schema>"#
        ))
        .unwrap();
        let reader = SchemaReader::new();
        let mut schema = Schema::new();
        let err = schema.load(&doc.root(), &reader).unwrap_err();
        assert!(format!("{}", err).contains("unknown component"));
    }

    #[test]
    fn test_identity_constraints_skipped() {
        let schema = load(&format!(
            r#"<xsd:schema xmlns:xsd="{XSD}">
                 <xsd:element name="root">
                   <xsd:complexType>
                     <xsd:sequence><xsd:element name="row" type="xsd:string"/></xsd:sequence>
                   </xsd:complexType>
                   <xsd:key name="pk"><xsd:selector xpath="row"/><xsd:field xpath="."/></xsd:key>
                 </xsd:element>
               </xsd:schema>"#
        ));
        let element = schema.component(schema.elements["root"]);
        // Only the anonymous complexType survives as content.
        assert_eq!(element.content.len(), 1);
        assert_eq!(
            schema.component(element.content[0]).kind,
            ComponentKind::ComplexType
        );
    }

    #[test]
    fn test_union_member_types() {
        let schema = load(&format!(
            r#"<xsd:schema xmlns:xsd="{XSD}">
                 <xsd:simpleType name="flexible">
                   <xsd:union memberTypes="xsd:int xsd:string"/>
                 </xsd:simpleType>
               </xsd:schema>"#
        ));
        let st = schema.component(schema.types["flexible"]);
        let union = schema.component(st.content[0]);
        assert_eq!(union.kind, ComponentKind::Union);
        assert_eq!(union.member_types.len(), 2);
        assert_eq!(union.member_types[0].name, "int");
    }
}
