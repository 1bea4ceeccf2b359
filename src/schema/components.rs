//! Schema component records
//!
//! One [`Component`] per parsed XSD construct, held in the owning
//! schema's arena and addressed by [`ComponentId`]. The parent link is
//! an arena index; walking it reaches the schema root, which is what
//! resolves `targetNamespace` and the `form`/`block`/`final` defaults.

use crate::dom::DomAdapter;
use crate::error::{Result, SchemaError};
use crate::namespaces::{split_qname, TypeDescriptor, XML_NAMESPACE, XSD_NAMESPACE};
use indexmap::IndexMap;

use super::base::{attr_spec, AttrDefault, ComponentKind, Facet, FormDefault, QNAME_ATTRIBUTES};
use super::particles::{parse_occurs, Occurs};

/// Index of a component in its schema's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentId(pub(crate) usize);

/// Defaults a component inherits from its nearest enclosing schema
///
/// Resolved in an explicit pass after structural parsing; the schema
/// root's own attributes are parsed before any child construct, so the
/// values are always available by the time a child needs them.
#[derive(Debug, Clone, Default)]
pub struct SchemaDefaults {
    /// Schema's `attributeFormDefault`
    pub attribute_form: FormDefault,
    /// Schema's `elementFormDefault`
    pub element_form: FormDefault,
    /// Schema's `blockDefault`, verbatim
    pub block: Option<String>,
    /// Schema's `finalDefault`, verbatim
    pub final_: Option<String>,
}

/// A node's attributes classified into namespace buckets
#[derive(Debug, Clone, Default)]
pub struct AttributeBuckets {
    /// Namespace declarations: prefix (empty string for the default
    /// namespace) to URI
    pub xmlns: IndexMap<String, String>,
    /// `xml:*` attributes, keyed by full name
    pub xml: IndexMap<String, String>,
    /// Namespace-qualified attributes, keyed by (namespace, local name)
    pub qualified: IndexMap<(String, String), String>,
    /// Unprefixed attributes, keyed by local name
    pub unprefixed: IndexMap<String, String>,
}

impl AttributeBuckets {
    /// Classify a node's raw attribute map into buckets
    ///
    /// Qualified attributes whose prefix does not resolve are a
    /// [`SchemaError`], as is a duplicate key within one bucket.
    /// Attributes in the XSD namespace itself are treated as
    /// unprefixed, matching how schema documents qualify them.
    pub fn classify<A: DomAdapter>(node: &A) -> Result<Self> {
        let mut buckets = AttributeBuckets::default();

        for (name, value) in node.attribute_map() {
            if name == "xmlns" {
                Self::insert_unique(&mut buckets.xmlns, String::new(), value.clone(), name)?;
                continue;
            }
            if let Some(prefix) = name.strip_prefix("xmlns:") {
                Self::insert_unique(&mut buckets.xmlns, prefix.to_string(), value.clone(), name)?;
                continue;
            }

            match split_qname(name) {
                (Some("xml"), _) => {
                    Self::insert_unique(&mut buckets.xml, name.clone(), value.clone(), name)?;
                }
                (Some(prefix), local) => {
                    let ns = node.resolve_namespace(Some(prefix)).ok_or_else(|| {
                        SchemaError::new(format!(
                            "attribute '{}', namespace unknown for prefix '{}'",
                            name, prefix
                        ))
                    })?;
                    if ns == XML_NAMESPACE {
                        Self::insert_unique(&mut buckets.xml, name.clone(), value.clone(), name)?;
                    } else if ns == XSD_NAMESPACE {
                        Self::insert_unique(
                            &mut buckets.unprefixed,
                            local.to_string(),
                            value.clone(),
                            name,
                        )?;
                    } else {
                        let key = (ns.to_string(), local.to_string());
                        if buckets.qualified.insert(key, value.clone()).is_some() {
                            return Err(SchemaError::new(format!(
                                "duplicate qualified attribute '{}'",
                                name
                            ))
                            .into());
                        }
                    }
                }
                (None, local) => {
                    Self::insert_unique(
                        &mut buckets.unprefixed,
                        local.to_string(),
                        value.clone(),
                        name,
                    )?;
                }
            }
        }

        Ok(buckets)
    }

    fn insert_unique(
        bucket: &mut IndexMap<String, String>,
        key: String,
        value: String,
        raw: &str,
    ) -> Result<()> {
        if bucket.insert(key, value).is_some() {
            return Err(
                SchemaError::new(format!("duplicate attribute '{}' in one bucket", raw)).into(),
            );
        }
        Ok(())
    }

    /// Unprefixed attribute value
    pub fn get(&self, name: &str) -> Option<&str> {
        self.unprefixed.get(name).map(|s| s.as_str())
    }
}

/// One parsed XSD construct
#[derive(Debug, Clone)]
pub struct Component {
    /// Construct kind tag
    pub kind: ComponentKind,
    /// Namespace-classified attributes
    pub attributes: AttributeBuckets,
    /// QName-valued attributes resolved to descriptors
    pub qname_refs: IndexMap<String, TypeDescriptor>,
    /// Resolved `memberTypes` list (union only)
    pub member_types: Vec<TypeDescriptor>,
    /// Facet metadata gathered from restriction content
    pub facets: Vec<Facet>,
    /// Parent component in the arena; None only for the schema root
    pub parent: Option<ComponentId>,
    /// Ordered child content (particles, derivations, nested groups)
    pub content: Vec<ComponentId>,
    /// Attribute uses (`attribute | attributeGroup | anyAttribute`)
    pub attr_content: Vec<ComponentId>,
}

impl Component {
    /// Build a component from a DOM node: classify attribute buckets,
    /// check required attributes, fill defaults, resolve QNames.
    ///
    /// Content is attached afterwards by the parser.
    pub fn from_node<A: DomAdapter>(
        kind: ComponentKind,
        node: &A,
        parent: Option<ComponentId>,
        defaults: &SchemaDefaults,
    ) -> Result<Self> {
        let mut attributes = AttributeBuckets::classify(node)?;
        let spec = attr_spec(kind);

        for required in spec.required {
            if attributes.get(required).is_none() {
                return Err(SchemaError::new(format!(
                    "missing required attribute '{}'",
                    required
                ))
                .with_component(kind.tag())
                .into());
            }
        }

        for key in attributes.unprefixed.keys() {
            if !spec.allowed.contains(&key.as_str()) {
                return Err(
                    SchemaError::new(format!("unknown attribute '{}'", key))
                        .with_component(kind.tag())
                        .into(),
                );
            }
        }

        // Default-resolution pass: static values and values inherited
        // from the nearest enclosing schema.
        for (name, default) in spec.defaults {
            if attributes.get(name).is_some() {
                continue;
            }
            let value = match default {
                AttrDefault::Static(v) => Some(v.to_string()),
                AttrDefault::AttributeFormDefault => Some(defaults.attribute_form.to_string()),
                AttrDefault::ElementFormDefault => Some(defaults.element_form.to_string()),
                AttrDefault::BlockDefault => defaults.block.clone(),
                AttrDefault::FinalDefault => defaults.final_.clone(),
            };
            if let Some(value) = value {
                attributes.unprefixed.insert(name.to_string(), value);
            }
        }

        let mut qname_refs = IndexMap::new();
        for key in QNAME_ATTRIBUTES {
            if let Some(value) = attributes.get(key) {
                qname_refs.insert(key.to_string(), resolve_qname_value(node, value)?);
            }
        }

        // memberTypes is a whitespace-separated QName list
        let mut member_types = Vec::new();
        if let Some(value) = attributes.get("memberTypes") {
            for qname in value.split_whitespace() {
                member_types.push(resolve_qname_value(node, qname)?);
            }
        }

        Ok(Component {
            kind,
            attributes,
            qname_refs,
            member_types,
            facets: Vec::new(),
            parent,
            content: Vec::new(),
            attr_content: Vec::new(),
        })
    }

    /// Unprefixed attribute value
    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes.get(name)
    }

    /// The construct's `name` attribute
    pub fn name(&self) -> Option<&str> {
        self.get("name")
    }

    /// Resolved `ref` descriptor
    pub fn ref_descriptor(&self) -> Option<&TypeDescriptor> {
        self.qname_refs.get("ref")
    }

    /// Resolved `type` descriptor
    pub fn type_descriptor(&self) -> Option<&TypeDescriptor> {
        self.qname_refs.get("type")
    }

    /// Resolved `base` descriptor
    pub fn base_descriptor(&self) -> Option<&TypeDescriptor> {
        self.qname_refs.get("base")
    }

    /// Occurrence bounds from minOccurs/maxOccurs
    pub fn occurs(&self) -> Result<Occurs> {
        parse_occurs(self.get("minOccurs"), self.get("maxOccurs"))
    }

    /// Boolean `nillable` attribute
    pub fn nillable(&self) -> bool {
        matches!(self.get("nillable"), Some("true") | Some("1"))
    }

    /// Boolean `mixed` attribute
    pub fn mixed(&self) -> bool {
        matches!(self.get("mixed"), Some("true") | Some("1"))
    }

    /// Boolean `abstract` attribute
    pub fn is_abstract(&self) -> bool {
        matches!(self.get("abstract"), Some("true") | Some("1"))
    }
}

/// Resolve one prefixed QName value against a node's visible scope
///
/// The prefix binding is searched on the node and its ancestors. An
/// unresolvable prefix is a [`SchemaError`]; an unprefixed value with
/// no default namespace in scope yields a descriptor with no namespace.
fn resolve_qname_value<A: DomAdapter>(node: &A, value: &str) -> Result<TypeDescriptor> {
    let (prefix, local) = split_qname(value);
    match prefix {
        Some(p) => {
            let ns = node.resolve_namespace(Some(p)).ok_or_else(|| {
                SchemaError::new(format!("unresolved namespace prefix '{}' in '{}'", p, value))
            })?;
            Ok(TypeDescriptor::namespaced(ns, local))
        }
        None => Ok(TypeDescriptor::new(
            node.resolve_namespace(None).map(|s| s.to_string()),
            local,
        )),
    }
}
