//! The schema graph
//!
//! [`Schema`] owns an arena of parsed components plus the named
//! collections (`types`, `elements`, `attr_decl`, `attr_groups`,
//! `model_groups`, `notations`) and the import/include records.
//! `load` runs the three-phase scan over a `<schema>` node; includes
//! are merged eagerly (deep copy, absent keys only) and imports are
//! resolved lazily at the first reference that crosses the namespace.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use url::Url;

use crate::dom::DomAdapter;
use crate::error::{Result, SchemaError};
use crate::namespaces::TypeDescriptor;

use super::base::{ComponentKind, FormDefault};
use super::components::{Component, ComponentId, SchemaDefaults};
use super::parsing::{parse_construct, Cursor};
use super::reader::SchemaReader;

/// Tags accepted in phase 1 of the schema scan
const PHASE_PRELUDE: &[&str] = &["include", "import", "redefine", "annotation"];

/// Tags accepted in phase 2 of the schema scan
const PHASE_DEFINITIONS: &[&str] = &[
    "attribute",
    "attributeGroup",
    "complexType",
    "element",
    "group",
    "notation",
    "simpleType",
];

/// A named collection on a schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    /// Global simpleType/complexType definitions
    Types,
    /// Global element declarations
    Elements,
    /// Global attribute declarations
    AttrDecl,
    /// Attribute group definitions
    AttrGroups,
    /// Model group definitions
    ModelGroups,
    /// Notation declarations
    Notations,
}

impl Collection {
    fn label(self) -> &'static str {
        match self {
            Collection::Types => "types",
            Collection::Elements => "elements",
            Collection::AttrDecl => "attr_decl",
            Collection::AttrGroups => "attr_groups",
            Collection::ModelGroups => "model_groups",
            Collection::Notations => "notations",
        }
    }
}

/// Record of one `<import>` statement
#[derive(Debug)]
pub struct ImportRecord {
    /// Imported namespace
    pub namespace: String,
    /// `schemaLocation` hint, if any
    pub location: Option<String>,
    /// The imported schema, set on first use
    schema: OnceCell<Arc<Schema>>,
}

/// A reference resolved through `resolve_qname`
///
/// `schema` is None when the target lives in the current schema.
#[derive(Debug, Clone)]
pub struct ResolvedRef {
    /// Owning schema, when different from the one queried
    pub schema: Option<Arc<Schema>>,
    /// Component in the owning schema's arena
    pub id: ComponentId,
}

/// Pre-registered schema instances handed to a loading schema so that
/// include/import statements resolve without fetching
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    /// Schemas keyed by schemaLocation
    pub by_location: HashMap<String, Arc<Schema>>,
    /// Schemas keyed by targetNamespace
    pub by_namespace: HashMap<String, Arc<Schema>>,
}

/// A parsed and validated schema document
#[derive(Debug, Default)]
pub struct Schema {
    /// Component arena; the schema root is always index 0
    components: Vec<Component>,
    /// Declared targetNamespace, if any
    pub target_namespace: Option<String>,
    /// Schema-level defaults consumed by child constructs
    pub defaults: SchemaDefaults,
    /// Global type definitions by local name
    pub types: IndexMap<String, ComponentId>,
    /// Global element declarations by local name
    pub elements: IndexMap<String, ComponentId>,
    /// Global attribute declarations by local name
    pub attr_decl: IndexMap<String, ComponentId>,
    /// Attribute group definitions by local name
    pub attr_groups: IndexMap<String, ComponentId>,
    /// Model group definitions by local name
    pub model_groups: IndexMap<String, ComponentId>,
    /// Notations by local name
    pub notations: IndexMap<String, ComponentId>,
    /// Import records by namespace
    pub imports: IndexMap<String, ImportRecord>,
    /// Include components by schemaLocation
    pub includes: IndexMap<String, ComponentId>,
    /// Base URL for resolving relative schemaLocation values
    pub base_url: Option<Url>,
    /// Registered schemas for lazy import/include resolution
    registry: SchemaRegistry,
    /// Collection keys that arrived via an include merge; the schema's
    /// own definition of such a name takes the slot
    merged: HashSet<(Collection, String)>,
}

impl Schema {
    /// Create an empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Component by id
    pub fn component(&self, id: ComponentId) -> &Component {
        &self.components[id.0]
    }

    /// Number of components in the arena
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// True if no components have been loaded
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// The schema root component
    pub fn root(&self) -> &Component {
        &self.components[0]
    }

    pub(crate) fn push(&mut self, component: Component) -> ComponentId {
        let id = ComponentId(self.components.len());
        self.components.push(component);
        id
    }

    pub(crate) fn component_mut(&mut self, id: ComponentId) -> &mut Component {
        &mut self.components[id.0]
    }

    /// One of the named collections
    pub fn collection(&self, collection: Collection) -> &IndexMap<String, ComponentId> {
        match collection {
            Collection::Types => &self.types,
            Collection::Elements => &self.elements,
            Collection::AttrDecl => &self.attr_decl,
            Collection::AttrGroups => &self.attr_groups,
            Collection::ModelGroups => &self.model_groups,
            Collection::Notations => &self.notations,
        }
    }

    fn collection_mut(&mut self, collection: Collection) -> &mut IndexMap<String, ComponentId> {
        match collection {
            Collection::Types => &mut self.types,
            Collection::Elements => &mut self.elements,
            Collection::AttrDecl => &mut self.attr_decl,
            Collection::AttrGroups => &mut self.attr_groups,
            Collection::ModelGroups => &mut self.model_groups,
            Collection::Notations => &mut self.notations,
        }
    }

    /// Load the schema graph from a `<schema>` DOM node
    ///
    /// A failed load leaves the instance unusable; no partial-success
    /// guarantee is made.
    pub fn load<A: DomAdapter>(&mut self, node: &A, reader: &SchemaReader) -> Result<()> {
        if node.local_name() != "schema" {
            return Err(SchemaError::new(format!(
                "expected <schema> document element, got <{}>",
                node.local_name()
            ))
            .into());
        }

        self.registry = reader.registry().clone();

        let root = Component::from_node(
            ComponentKind::Schema,
            node,
            None,
            &SchemaDefaults::default(),
        )?;
        let root_id = self.push(root);
        debug_assert_eq!(root_id, ComponentId(0));

        self.read_schema_attributes()?;

        let mut cursor = Cursor::new(node);

        // Phase 1: include | import | redefine | annotation
        while let Some(tag) = cursor.peek_tag() {
            if !PHASE_PRELUDE.contains(&tag) {
                break;
            }
            let child = cursor.next();
            match child.local_name() {
                "include" => self.load_include(&child, root_id, reader)?,
                "import" => self.load_import(&child, root_id)?,
                // redefine and annotation are consumed without building
                _ => {}
            }
        }

        // Phase 2: definition-bearing constructs
        while let Some(tag) = cursor.peek_tag() {
            if !PHASE_DEFINITIONS.contains(&tag) {
                break;
            }
            let child = cursor.next();
            let (collection, kind) = match child.local_name() {
                "complexType" => (Collection::Types, ComponentKind::ComplexType),
                "simpleType" => (Collection::Types, ComponentKind::SimpleType),
                "element" => (Collection::Elements, ComponentKind::ElementDecl),
                "attribute" => (Collection::AttrDecl, ComponentKind::AttributeDecl),
                "attributeGroup" => (Collection::AttrGroups, ComponentKind::AttributeGroup),
                "group" => (Collection::ModelGroups, ComponentKind::ModelGroupDef),
                "notation" => (Collection::Notations, ComponentKind::Notation),
                other => {
                    return Err(SchemaError::new(format!("unknown component <{}>", other)).into())
                }
            };

            let id = parse_construct(self, &child, kind, Some(root_id))?;
            let name = self
                .component(id)
                .name()
                .ok_or_else(|| {
                    SchemaError::new("global construct without a name").with_component(kind.tag())
                })?
                .to_string();

            // An own definition shadows a key an include merged in;
            // two own definitions of one name are a conflict.
            if self.collection(collection).contains_key(&name)
                && !self.merged.remove(&(collection, name.clone()))
            {
                return Err(SchemaError::new(format!(
                    "duplicate '{}' in {} collection",
                    name,
                    collection.label()
                ))
                .into());
            }
            self.collection_mut(collection).insert(name, id);
            self.component_mut(root_id).content.push(id);
        }

        // Phase 3: trailing annotations
        while let Some(tag) = cursor.peek_tag() {
            if tag != "annotation" {
                break;
            }
            cursor.next();
        }

        if !cursor.done() {
            return Err(cursor.unknown_component(ComponentKind::Schema));
        }

        Ok(())
    }

    /// Pull targetNamespace and the `*Default` attributes off the root
    fn read_schema_attributes(&mut self) -> Result<()> {
        let root = &self.components[0];

        let target_namespace = root
            .get("targetNamespace")
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string());

        let attribute_form = match root.get("attributeFormDefault") {
            Some(v) => FormDefault::parse(v).ok_or_else(|| {
                SchemaError::new(format!("invalid attributeFormDefault '{}'", v))
            })?,
            None => FormDefault::default(),
        };
        let element_form = match root.get("elementFormDefault") {
            Some(v) => FormDefault::parse(v)
                .ok_or_else(|| SchemaError::new(format!("invalid elementFormDefault '{}'", v)))?,
            None => FormDefault::default(),
        };

        self.target_namespace = target_namespace;
        self.defaults = SchemaDefaults {
            attribute_form,
            element_form,
            block: root.get("blockDefault").map(|s| s.to_string()),
            final_: root.get("finalDefault").map(|s| s.to_string()),
        };
        Ok(())
    }

    /// Handle one `<include>`: load the referenced schema and merge its
    /// collections for every key absent here
    fn load_include<A: DomAdapter>(
        &mut self,
        node: &A,
        root_id: ComponentId,
        reader: &SchemaReader,
    ) -> Result<()> {
        let id = parse_construct(self, node, ComponentKind::Include, Some(root_id))?;
        let location = self
            .component(id)
            .get("schemaLocation")
            .ok_or_else(|| SchemaError::new("include without schemaLocation"))?
            .to_string();

        let included = match self.registry.by_location.get(&location) {
            Some(schema) => Arc::clone(schema),
            None => reader.fetch(&location, self.base_url.as_ref())?,
        };

        // Same targetNamespace, or none at all (chameleon include).
        if included.target_namespace.is_some()
            && included.target_namespace != self.target_namespace
        {
            return Err(SchemaError::new(format!(
                "included schema '{}' has conflicting targetNamespace {:?}",
                location, included.target_namespace
            ))
            .into());
        }

        self.includes.insert(location, id);
        self.merge_from(&included)?;
        Ok(())
    }

    /// Record one `<import>`; resolution is deferred until a reference
    /// crosses the namespace
    fn load_import<A: DomAdapter>(&mut self, node: &A, root_id: ComponentId) -> Result<()> {
        let id = parse_construct(self, node, ComponentKind::Import, Some(root_id))?;
        let component = self.component(id);
        let namespace = component.get("namespace").unwrap_or("").to_string();
        let location = component.get("schemaLocation").map(|s| s.to_string());

        if !namespace.is_empty() && Some(namespace.as_str()) == self.target_namespace.as_deref() {
            return Err(
                SchemaError::new("import and schema have the same targetNamespace").into(),
            );
        }

        let record = ImportRecord {
            namespace: namespace.clone(),
            location,
            schema: OnceCell::new(),
        };
        // A pre-registered schema satisfies the import immediately.
        if let Some(schema) = self.registry.by_namespace.get(&namespace) {
            let _ = record.schema.set(Arc::clone(schema));
        }
        self.imports.insert(namespace, record);
        Ok(())
    }

    /// Merge another schema's collections into this one, deep-copying
    /// each component subtree whose key is absent here
    ///
    /// Merged entries are copies: later mutation of one schema is not
    /// visible in the other. Re-merging the same schema is idempotent.
    fn merge_from(&mut self, other: &Schema) -> Result<()> {
        for collection in [
            Collection::Elements,
            Collection::Types,
            Collection::AttrDecl,
            Collection::AttrGroups,
            Collection::ModelGroups,
            Collection::Notations,
        ] {
            let entries: Vec<(String, ComponentId)> = other
                .collection(collection)
                .iter()
                .map(|(k, v)| (k.clone(), *v))
                .collect();
            for (name, other_id) in entries {
                if self.collection(collection).contains_key(&name) {
                    continue;
                }
                let adopted = self.adopt(other, other_id, Some(ComponentId(0)));
                self.merged.insert((collection, name.clone()));
                self.collection_mut(collection).insert(name, adopted);
            }
        }

        // Import records merge as well, so references that crossed the
        // included schema's namespaces keep resolving.
        for (namespace, record) in &other.imports {
            if self.imports.contains_key(namespace) {
                continue;
            }
            let copied = ImportRecord {
                namespace: record.namespace.clone(),
                location: record.location.clone(),
                schema: match record.schema.get() {
                    Some(schema) => {
                        let cell = OnceCell::new();
                        let _ = cell.set(Arc::clone(schema));
                        cell
                    }
                    None => OnceCell::new(),
                },
            };
            self.imports.insert(namespace.clone(), copied);
        }
        Ok(())
    }

    /// Deep-copy a component subtree from another schema's arena
    fn adopt(&mut self, other: &Schema, id: ComponentId, parent: Option<ComponentId>) -> ComponentId {
        let source = other.component(id);
        let mut copied = source.clone();
        copied.parent = parent;
        copied.content = Vec::new();
        copied.attr_content = Vec::new();
        let new_id = self.push(copied);

        let content: Vec<ComponentId> = source.content.clone();
        for child in content {
            let new_child = self.adopt(other, child, Some(new_id));
            self.component_mut(new_id).content.push(new_child);
        }
        let attr_content: Vec<ComponentId> = source.attr_content.clone();
        for child in attr_content {
            let new_child = self.adopt(other, child, Some(new_id));
            self.component_mut(new_id).attr_content.push(new_child);
        }
        new_id
    }

    /// Resolve a descriptor against one of the named collections
    ///
    /// The owning schema is either this one (targetNamespace match) or
    /// an imported schema looked up by namespace; a reference into a
    /// namespace with no import record is a [`SchemaError`].
    pub fn resolve_qname(
        &self,
        collection: Collection,
        descriptor: &TypeDescriptor,
    ) -> Result<ResolvedRef> {
        if descriptor.namespace.as_deref() == self.target_namespace.as_deref() {
            let id = self
                .collection(collection)
                .get(&descriptor.name)
                .copied()
                .ok_or_else(|| {
                    SchemaError::new(format!(
                        "no '{}' in {} collection",
                        descriptor.name,
                        collection.label()
                    ))
                })?;
            return Ok(ResolvedRef { schema: None, id });
        }

        let namespace = descriptor.namespace.clone().unwrap_or_default();
        let record = self.imports.get(&namespace).ok_or_else(|| {
            SchemaError::new(format!("missing import for '{}'", descriptor.clark()))
        })?;

        let schema = record.resolve(self)?;
        let id = schema
            .collection(collection)
            .get(&descriptor.name)
            .copied()
            .ok_or_else(|| {
                SchemaError::new(format!(
                    "no '{}' in imported schema '{}'",
                    descriptor.name, namespace
                ))
            })?;
        Ok(ResolvedRef {
            schema: Some(schema),
            id,
        })
    }

    /// The effective particle list of a complex type, with `extension`
    /// derivation flattened: base particles first, local ones after.
    /// `restriction` keeps only the local declarations.
    ///
    /// Returns (owning schema, particle component, under-a-choice)
    /// triples in wire order; a particle reached through a `choice`
    /// is effectively optional on the wire.
    pub fn effective_particles(
        &self,
        id: ComponentId,
        depth: usize,
    ) -> Result<Vec<(Option<Arc<Schema>>, ComponentId, bool)>> {
        // Self-referential derivation chains must terminate.
        if depth > 64 {
            return Err(SchemaError::new("type derivation chain too deep (cycle?)").into());
        }

        let component = self.component(id);
        let mut particles = Vec::new();

        match component.kind {
            ComponentKind::ComplexType => {
                for &child_id in &component.content {
                    let child = self.component(child_id);
                    match child.kind {
                        ComponentKind::ComplexContent | ComponentKind::SimpleContent => {
                            particles.extend(self.derived_particles(child_id, depth + 1)?);
                        }
                        _ if child.kind.is_model_group() => {
                            particles.extend(self.group_particles(child_id)?);
                        }
                        _ => {}
                    }
                }
            }
            k if k.is_model_group() => {
                particles.extend(self.group_particles(id)?);
            }
            _ => {}
        }

        Ok(particles)
    }

    /// Particles contributed by a complexContent/simpleContent child
    fn derived_particles(
        &self,
        id: ComponentId,
        depth: usize,
    ) -> Result<Vec<(Option<Arc<Schema>>, ComponentId, bool)>> {
        let mut particles = Vec::new();
        let content = self.component(id);

        for &derivation_id in &content.content {
            let derivation = self.component(derivation_id);
            match derivation.kind {
                ComponentKind::Extension => {
                    // Base particles precede the locally declared ones.
                    if let Some(base) = derivation.base_descriptor() {
                        if !base.is_xsd() {
                            let resolved = self.resolve_qname(Collection::Types, base)?;
                            match resolved.schema {
                                Some(foreign) => {
                                    for (owner, pid, in_choice) in
                                        foreign.effective_particles(resolved.id, depth)?
                                    {
                                        particles.push((
                                            owner.or_else(|| Some(Arc::clone(&foreign))),
                                            pid,
                                            in_choice,
                                        ));
                                    }
                                }
                                None => {
                                    particles
                                        .extend(self.effective_particles(resolved.id, depth)?);
                                }
                            }
                        }
                    }
                    for &child in &derivation.content {
                        if self.component(child).kind.is_model_group() {
                            particles.extend(self.group_particles(child)?);
                        }
                    }
                }
                ComponentKind::Restriction => {
                    // Restriction keeps only what it declares locally.
                    for &child in &derivation.content {
                        if self.component(child).kind.is_model_group() {
                            particles.extend(self.group_particles(child)?);
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(particles)
    }

    /// The element-bearing particles under a model group construct
    ///
    /// Accepts `sequence`/`choice`/`all` as well as a group reference
    /// or definition, chasing references through their definitions.
    fn group_particles(
        &self,
        id: ComponentId,
    ) -> Result<Vec<(Option<Arc<Schema>>, ComponentId, bool)>> {
        let group = self.component(id);
        match group.kind {
            ComponentKind::ModelGroupRef => {
                let reference = group
                    .ref_descriptor()
                    .ok_or_else(|| SchemaError::new("group reference without ref attribute"))?;
                let resolved = self.resolve_qname(Collection::ModelGroups, reference)?;
                return match resolved.schema {
                    Some(foreign) => {
                        let mut particles = Vec::new();
                        for (owner, pid, in_choice) in
                            foreign.group_definition_particles(resolved.id)?
                        {
                            particles.push((
                                owner.or_else(|| Some(Arc::clone(&foreign))),
                                pid,
                                in_choice,
                            ));
                        }
                        Ok(particles)
                    }
                    None => self.group_definition_particles(resolved.id),
                };
            }
            ComponentKind::ModelGroupDef => {
                return self.group_definition_particles(id);
            }
            _ => {}
        }

        let mut particles = Vec::new();
        for &child_id in &group.content {
            let child = self.component(child_id);
            match child.kind {
                ComponentKind::ElementDecl
                | ComponentKind::ElementRef
                | ComponentKind::AnyElement => particles.push((None, child_id, false)),
                ComponentKind::Sequence
                | ComponentKind::Choice
                | ComponentKind::All
                | ComponentKind::ModelGroupRef => {
                    particles.extend(self.group_particles(child_id)?);
                }
                _ => {}
            }
        }
        // Alternatives of a choice are each optional on the wire.
        if group.kind == ComponentKind::Choice {
            for particle in &mut particles {
                particle.2 = true;
            }
        }
        Ok(particles)
    }

    fn group_definition_particles(
        &self,
        id: ComponentId,
    ) -> Result<Vec<(Option<Arc<Schema>>, ComponentId, bool)>> {
        let definition = self.component(id);
        let mut particles = Vec::new();
        for &child in &definition.content {
            if self.component(child).kind.is_model_group() {
                particles.extend(self.group_particles(child)?);
            }
        }
        Ok(particles)
    }

    /// The effective attribute uses of a complex type: base attributes
    /// plus local ones for `extension`, local only for `restriction`,
    /// attribute groups chased through their definitions.
    pub fn effective_attributes(
        &self,
        id: ComponentId,
        depth: usize,
    ) -> Result<Vec<(Option<Arc<Schema>>, ComponentId)>> {
        if depth > 64 {
            return Err(SchemaError::new("type derivation chain too deep (cycle?)").into());
        }

        let component = self.component(id);
        let mut uses = Vec::new();

        let mut direct: Vec<ComponentId> = component.attr_content.clone();
        for &child_id in &component.content {
            let child = self.component(child_id);
            if matches!(
                child.kind,
                ComponentKind::ComplexContent | ComponentKind::SimpleContent
            ) {
                for &derivation_id in &child.content {
                    let derivation = self.component(derivation_id);
                    if derivation.kind == ComponentKind::Extension {
                        if let Some(base) = derivation.base_descriptor() {
                            if !base.is_xsd() {
                                let resolved = self.resolve_qname(Collection::Types, base)?;
                                match resolved.schema {
                                    Some(foreign) => {
                                        for (owner, aid) in
                                            foreign.effective_attributes(resolved.id, depth + 1)?
                                        {
                                            uses.push((
                                                owner.or_else(|| Some(Arc::clone(&foreign))),
                                                aid,
                                            ));
                                        }
                                    }
                                    None => uses.extend(
                                        self.effective_attributes(resolved.id, depth + 1)?,
                                    ),
                                }
                            }
                        }
                    }
                    direct.extend(derivation.attr_content.iter().copied());
                }
            }
        }

        for attr_id in direct {
            let attr = self.component(attr_id);
            match attr.kind {
                ComponentKind::AttributeDecl | ComponentKind::AttributeRef => {
                    uses.push((None, attr_id));
                }
                ComponentKind::AttributeGroupRef => {
                    let reference = attr.ref_descriptor().ok_or_else(|| {
                        SchemaError::new("attributeGroup reference without ref attribute")
                    })?;
                    let resolved = self.resolve_qname(Collection::AttrGroups, reference)?;
                    match resolved.schema {
                        Some(foreign) => {
                            let group = foreign.component(resolved.id);
                            for &aid in &group.attr_content {
                                uses.push((Some(Arc::clone(&foreign)), aid));
                            }
                        }
                        None => {
                            let group = self.component(resolved.id);
                            for &aid in &group.attr_content {
                                uses.push((None, aid));
                            }
                        }
                    }
                }
                _ => {}
            }
        }

        Ok(uses)
    }
}

impl ImportRecord {
    /// The imported schema: pre-registered instance, or fetched from
    /// the schemaLocation hint on first use
    pub fn resolve(&self, owner: &Schema) -> Result<Arc<Schema>> {
        let schema = self.schema.get_or_try_init(|| -> Result<Arc<Schema>> {
            if let Some(registered) = owner.registry.by_namespace.get(&self.namespace) {
                return Ok(Arc::clone(registered));
            }
            let location = self.location.as_deref().ok_or_else(|| {
                SchemaError::new(format!(
                    "import of '{}' has no registered schema and no schemaLocation",
                    self.namespace
                ))
            })?;
            let reader = SchemaReader::with_registry(owner.registry.clone());
            let fetched = reader.fetch(location, owner.base_url.as_ref())?;
            // The fetched document must declare exactly the imported
            // namespace.
            if fetched.target_namespace.as_deref() != Some(self.namespace.as_str()) {
                return Err(SchemaError::new(format!(
                    "imported schema '{}' declares targetNamespace {:?}, expected '{}'",
                    location, fetched.target_namespace, self.namespace
                ))
                .into());
            }
            Ok(fetched)
        })?;
        Ok(Arc::clone(schema))
    }

    /// The imported schema if already resolved
    pub fn schema(&self) -> Option<&Arc<Schema>> {
        self.schema.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::XmlDocument;

    const XSD: &str = "http://www.w3.org/2001/XMLSchema";

    fn load(xml: &str) -> Schema {
        try_load(xml).unwrap()
    }

    fn try_load(xml: &str) -> Result<Schema> {
        let doc = XmlDocument::from_str(xml)?;
        let reader = SchemaReader::new();
        let mut schema = Schema::new();
        schema.load(&doc.root(), &reader)?;
        Ok(schema)
    }

    #[test]
    fn test_load_minimal_schema() {
        let schema = load(&format!(
            r#"<xsd:schema xmlns:xsd="{XSD}" targetNamespace="http://example.com"
                 xmlns:tns="http://example.com">
                 <xsd:element name="note" type="xsd:string"/>
               </xsd:schema>"#
        ));
        assert_eq!(schema.target_namespace.as_deref(), Some("http://example.com"));
        assert!(schema.elements.contains_key("note"));

        let id = schema.elements["note"];
        let element = schema.component(id);
        assert_eq!(element.kind, ComponentKind::ElementDecl);
        assert_eq!(element.type_descriptor().unwrap().name, "string");
    }

    #[test]
    fn test_element_without_name_is_schema_error() {
        let result = try_load(&format!(
            r#"<xsd:schema xmlns:xsd="{XSD}">
                 <xsd:element type="xsd:string"/>
               </xsd:schema>"#
        ));
        assert!(result.is_err());
    }

    #[test]
    fn test_failed_load_leaves_no_partial_entry() {
        let doc = XmlDocument::from_str(&format!(
            r#"<xsd:schema xmlns:xsd="{XSD}">
                 <xsd:element type="xsd:string"/>
               </xsd:schema>"#
        ))
        .unwrap();
        let reader = SchemaReader::new();
        let mut schema = Schema::new();
        assert!(schema.load(&doc.root(), &reader).is_err());
        assert!(schema.elements.is_empty());
    }

    #[test]
    fn test_out_of_phase_tag_rejected() {
        // include after a definition is invalid for every remaining phase
        let result = try_load(&format!(
            r#"<xsd:schema xmlns:xsd="{XSD}">
                 <xsd:element name="a" type="xsd:string"/>
                 <xsd:include schemaLocation="other.xsd"/>
               </xsd:schema>"#
        ));
        assert!(result.is_err());
    }

    #[test]
    fn test_deterministic_double_load() {
        let xml = format!(
            r#"<xsd:schema xmlns:xsd="{XSD}" targetNamespace="http://example.com"
                 xmlns:tns="http://example.com" elementFormDefault="qualified">
                 <xsd:element name="b" type="xsd:int"/>
                 <xsd:element name="a" type="xsd:string"/>
                 <xsd:complexType name="pair">
                   <xsd:sequence>
                     <xsd:element name="x" type="xsd:int"/>
                     <xsd:element name="y" type="xsd:int"/>
                   </xsd:sequence>
                 </xsd:complexType>
               </xsd:schema>"#
        );
        let first = load(&xml);
        let second = load(&xml);

        let first_keys: Vec<_> = first.elements.keys().collect();
        let second_keys: Vec<_> = second.elements.keys().collect();
        assert_eq!(first_keys, second_keys);
        assert_eq!(first.types.keys().collect::<Vec<_>>(), second.types.keys().collect::<Vec<_>>());
        assert_eq!(first.len(), second.len());

        for (a, b) in first.elements.values().zip(second.elements.values()) {
            let ca = first.component(*a);
            let cb = second.component(*b);
            assert_eq!(ca.attributes.unprefixed, cb.attributes.unprefixed);
            assert_eq!(ca.qname_refs, cb.qname_refs);
        }
    }

    #[test]
    fn test_resolve_qname_local() {
        let schema = load(&format!(
            r#"<xsd:schema xmlns:xsd="{XSD}" targetNamespace="http://example.com"
                 xmlns:tns="http://example.com">
                 <xsd:complexType name="order"><xsd:sequence/></xsd:complexType>
               </xsd:schema>"#
        ));
        let desc = TypeDescriptor::namespaced("http://example.com", "order");
        let resolved = schema.resolve_qname(Collection::Types, &desc).unwrap();
        assert!(resolved.schema.is_none());
        assert_eq!(schema.component(resolved.id).kind, ComponentKind::ComplexType);
    }

    #[test]
    fn test_resolve_qname_through_import() {
        let imported = Arc::new(load(&format!(
            r#"<xsd:schema xmlns:xsd="{XSD}" targetNamespace="http://example.com/other"
                 xmlns:tns="http://example.com/other">
                 <xsd:complexType name="payload"><xsd:sequence/></xsd:complexType>
               </xsd:schema>"#
        )));

        let mut reader = SchemaReader::new();
        reader.add_schema_by_namespace("http://example.com/other", imported);

        let doc = XmlDocument::from_str(&format!(
            r#"<xsd:schema xmlns:xsd="{XSD}" targetNamespace="http://example.com">
                 <xsd:import namespace="http://example.com/other"/>
               </xsd:schema>"#
        ))
        .unwrap();
        let mut schema = Schema::new();
        schema.load(&doc.root(), &reader).unwrap();

        let desc = TypeDescriptor::namespaced("http://example.com/other", "payload");
        let resolved = schema.resolve_qname(Collection::Types, &desc).unwrap();
        let owner = resolved.schema.expect("foreign owner");
        assert_eq!(owner.component(resolved.id).kind, ComponentKind::ComplexType);

        // Resolving twice hands back the same instance.
        let again = schema.resolve_qname(Collection::Types, &desc).unwrap();
        assert!(Arc::ptr_eq(&owner, &again.schema.expect("foreign owner")));
    }

    #[test]
    fn test_resolve_qname_missing_import() {
        let schema = load(&format!(r#"<xsd:schema xmlns:xsd="{XSD}"/>"#));
        let desc = TypeDescriptor::namespaced("http://elsewhere", "thing");
        let err = schema.resolve_qname(Collection::Types, &desc).unwrap_err();
        assert!(format!("{}", err).contains("missing import"));
    }

    #[test]
    fn test_import_same_namespace_rejected() {
        let result = try_load(&format!(
            r#"<xsd:schema xmlns:xsd="{XSD}" targetNamespace="http://example.com">
                 <xsd:import namespace="http://example.com"/>
               </xsd:schema>"#
        ));
        assert!(result.is_err());
    }

    #[test]
    fn test_include_merge_absent_keys_only() {
        let included_xml = format!(
            r#"<xsd:schema xmlns:xsd="{XSD}" targetNamespace="http://example.com"
                 xmlns:tns="http://example.com">
                 <xsd:complexType name="T"><xsd:sequence/></xsd:complexType>
                 <xsd:complexType name="Existing"><xsd:sequence/></xsd:complexType>
               </xsd:schema>"#
        );
        let included = Arc::new(load(&included_xml));

        let mut reader = SchemaReader::new();
        reader.add_schema_by_location("b.xsd", Arc::clone(&included));

        let doc = XmlDocument::from_str(&format!(
            r#"<xsd:schema xmlns:xsd="{XSD}" targetNamespace="http://example.com"
                 xmlns:tns="http://example.com">
                 <xsd:include schemaLocation="b.xsd"/>
                 <xsd:complexType name="Existing">
                   <xsd:sequence><xsd:element name="kept" type="xsd:string"/></xsd:sequence>
                 </xsd:complexType>
               </xsd:schema>"#
        ))
        .unwrap();
        let mut schema = Schema::new();
        schema.load(&doc.root(), &reader).unwrap();

        // B's T arrived; the include runs first, so A's later
        // definition of Existing takes the slot over the merged copy.
        assert!(schema.types.contains_key("T"));
        let merged = schema.component(schema.types["T"]);
        assert_eq!(merged.kind, ComponentKind::ComplexType);

        let existing = schema.component(schema.types["Existing"]);
        let sequence = schema.component(existing.content[0]);
        let particle = schema.component(sequence.content[0]);
        assert_eq!(particle.name(), Some("kept"));

        // The merged copy is equivalent to B's original.
        let original = included.component(included.types["T"]);
        assert_eq!(merged.attributes.unprefixed, original.attributes.unprefixed);

        // Merging again changes nothing.
        let count = schema.types.len();
        schema.merge_from(&included).unwrap();
        assert_eq!(schema.types.len(), count);
    }

    #[test]
    fn test_duplicate_own_definition_rejected() {
        let err = try_load(&format!(
            r#"<xsd:schema xmlns:xsd="{XSD}">
                 <xsd:complexType name="Twice"><xsd:sequence/></xsd:complexType>
                 <xsd:complexType name="Twice"><xsd:sequence/></xsd:complexType>
               </xsd:schema>"#
        ))
        .unwrap_err();
        assert!(format!("{}", err).contains("duplicate 'Twice'"));
    }

    #[test]
    fn test_include_conflicting_namespace_fatal() {
        let included = Arc::new(load(&format!(
            r#"<xsd:schema xmlns:xsd="{XSD}" targetNamespace="http://other.com"
                 xmlns:tns="http://other.com">
                 <xsd:complexType name="T"><xsd:sequence/></xsd:complexType>
               </xsd:schema>"#
        )));

        let mut reader = SchemaReader::new();
        reader.add_schema_by_location("b.xsd", included);

        let doc = XmlDocument::from_str(&format!(
            r#"<xsd:schema xmlns:xsd="{XSD}" targetNamespace="http://example.com">
                 <xsd:include schemaLocation="b.xsd"/>
               </xsd:schema>"#
        ))
        .unwrap();
        let mut schema = Schema::new();
        assert!(schema.load(&doc.root(), &reader).is_err());
    }

    #[test]
    fn test_effective_particles_extension() {
        let schema = load(&format!(
            r#"<xsd:schema xmlns:xsd="{XSD}" targetNamespace="http://example.com"
                 xmlns:tns="http://example.com">
                 <xsd:complexType name="base">
                   <xsd:sequence>
                     <xsd:element name="id" type="xsd:int"/>
                   </xsd:sequence>
                 </xsd:complexType>
                 <xsd:complexType name="derived">
                   <xsd:complexContent>
                     <xsd:extension base="tns:base">
                       <xsd:sequence>
                         <xsd:element name="label" type="xsd:string"/>
                       </xsd:sequence>
                     </xsd:extension>
                   </xsd:complexContent>
                 </xsd:complexType>
               </xsd:schema>"#
        ));

        let particles = schema
            .effective_particles(schema.types["derived"], 0)
            .unwrap();
        let names: Vec<_> = particles
            .iter()
            .map(|(_, id, _)| schema.component(*id).name().unwrap().to_string())
            .collect();
        // Base particles first, locals after: wire order survives derivation.
        assert_eq!(names, vec!["id", "label"]);
    }

    #[test]
    fn test_effective_particles_restriction_local_only() {
        let schema = load(&format!(
            r#"<xsd:schema xmlns:xsd="{XSD}" targetNamespace="http://example.com"
                 xmlns:tns="http://example.com">
                 <xsd:complexType name="base">
                   <xsd:sequence>
                     <xsd:element name="id" type="xsd:int"/>
                     <xsd:element name="note" type="xsd:string"/>
                   </xsd:sequence>
                 </xsd:complexType>
                 <xsd:complexType name="narrowed">
                   <xsd:complexContent>
                     <xsd:restriction base="tns:base">
                       <xsd:sequence>
                         <xsd:element name="id" type="xsd:int"/>
                       </xsd:sequence>
                     </xsd:restriction>
                   </xsd:complexContent>
                 </xsd:complexType>
               </xsd:schema>"#
        ));

        let particles = schema
            .effective_particles(schema.types["narrowed"], 0)
            .unwrap();
        let names: Vec<_> = particles
            .iter()
            .map(|(_, id, _)| schema.component(*id).name().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["id"]);
    }
}
