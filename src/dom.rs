//! XML document handling behind a small capability interface
//!
//! The schema component model and the typecode deserializer consume XML
//! through the [`DomAdapter`] trait only: attribute lookup, namespace
//! resolution, ordered child listing, tag name, parent. [`XmlDocument`]
//! is the stock implementation, an arena of element records built with
//! quick-xml; node handles are indices into the arena, so parent links
//! are plain index fields.

use crate::error::{Error, Result};
use crate::namespaces::{split_qname, XML_NAMESPACE};
use indexmap::IndexMap;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::BufRead;
use std::path::Path;

/// Capability interface the schema model depends on
///
/// Any XML tree exposing these operations can feed the schema loader;
/// the concrete parser behind it is irrelevant.
pub trait DomAdapter: Sized + Clone {
    /// Tag name as written in the document (possibly prefixed)
    fn tag_name(&self) -> &str;

    /// Unprefixed local name
    fn local_name(&self) -> &str;

    /// True if the node carries the attribute (raw name match)
    fn has_attribute(&self, name: &str) -> bool;

    /// The node's attributes in document order, raw name to value,
    /// namespace declarations included
    fn attribute_map(&self) -> &IndexMap<String, String>;

    /// Resolve a namespace prefix against this node's visible scope,
    /// walking ancestors until a binding is found. `None` resolves the
    /// default namespace.
    fn resolve_namespace(&self, prefix: Option<&str>) -> Option<&str>;

    /// Ordered child elements whose local name is in `names`;
    /// an empty list returns every child element
    fn child_elements(&self, names: &[&str]) -> Vec<Self>;

    /// Parent element, if any
    fn parent(&self) -> Option<Self>;

    /// Concatenated text content of this element
    fn text(&self) -> Option<&str>;
}

/// Handle to one element in an [`XmlDocument`]
#[derive(Debug, Clone, Copy)]
pub struct NodeHandle<'d> {
    doc: &'d XmlDocument,
    id: usize,
}

#[derive(Debug)]
struct ElementRecord {
    /// Raw tag name, prefix included
    tag: String,
    /// Local part of the tag name
    local: String,
    /// Attributes in document order, xmlns declarations included
    attributes: IndexMap<String, String>,
    /// Prefix to URI bindings declared on this element; empty-string
    /// key holds the default namespace
    namespaces: IndexMap<String, String>,
    /// Text content, if any
    text: Option<String>,
    parent: Option<usize>,
    children: Vec<usize>,
}

/// In-memory XML document backed by an element arena
#[derive(Debug)]
pub struct XmlDocument {
    nodes: Vec<ElementRecord>,
    root: Option<usize>,
}

impl XmlDocument {
    /// Parse an XML document from a string
    pub fn from_str(xml: &str) -> Result<Self> {
        Self::from_reader(xml.as_bytes())
    }

    /// Parse an XML document from a buffered reader
    ///
    /// The reader is consumed; whatever resource backs it is released
    /// when it drops, on the error path included.
    pub fn from_reader(input: impl BufRead) -> Result<Self> {
        let mut reader = Reader::from_reader(input);
        reader.trim_text(true);

        let mut doc = XmlDocument {
            nodes: Vec::new(),
            root: None,
        };
        let mut stack: Vec<usize> = Vec::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    let id = doc.push_element(&e, stack.last().copied())?;
                    stack.push(id);
                }
                Ok(Event::Empty(e)) => {
                    doc.push_element(&e, stack.last().copied())?;
                }
                Ok(Event::End(_)) => {
                    stack.pop();
                }
                Ok(Event::Text(e)) => {
                    if let Some(&current) = stack.last() {
                        let text = e
                            .unescape()
                            .map_err(|e| Error::Xml(format!("failed to unescape text: {}", e)))?;
                        if !text.is_empty() {
                            let record = &mut doc.nodes[current];
                            match record.text {
                                Some(ref mut existing) => existing.push_str(&text),
                                None => record.text = Some(text.into_owned()),
                            }
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::Xml(format!(
                        "error parsing XML at position {}: {}",
                        reader.buffer_position(),
                        e
                    )))
                }
                _ => {} // comments, processing instructions, declarations
            }
            buf.clear();
        }

        if doc.root.is_none() {
            return Err(Error::Xml("document has no root element".to_string()));
        }
        Ok(doc)
    }

    /// Parse an XML document from a file path
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref()).map_err(|e| {
            Error::Resource(format!(
                "failed to open '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    /// Handle to the document root element
    pub fn root(&self) -> NodeHandle<'_> {
        NodeHandle {
            doc: self,
            // from_reader guarantees a root
            id: self.root.unwrap_or(0),
        }
    }

    fn push_element(&mut self, start: &BytesStart, parent: Option<usize>) -> Result<usize> {
        let tag = std::str::from_utf8(start.name().as_ref())
            .map_err(|e| Error::Xml(format!("invalid element name: {}", e)))?
            .to_string();
        let (_, local) = split_qname(&tag);
        let local = local.to_string();

        let mut attributes = IndexMap::new();
        let mut namespaces = IndexMap::new();

        for attr_result in start.attributes() {
            let attr =
                attr_result.map_err(|e| Error::Xml(format!("failed to parse attribute: {}", e)))?;
            let name = std::str::from_utf8(attr.key.as_ref())
                .map_err(|e| Error::Xml(format!("invalid attribute name: {}", e)))?
                .to_string();
            let value = attr
                .unescape_value()
                .map_err(|e| Error::Xml(format!("failed to unescape attribute value: {}", e)))?
                .to_string();

            if name == "xmlns" {
                namespaces.insert(String::new(), value.clone());
            } else if let Some(prefix) = name.strip_prefix("xmlns:") {
                namespaces.insert(prefix.to_string(), value.clone());
            }
            attributes.insert(name, value);
        }

        let id = self.nodes.len();
        self.nodes.push(ElementRecord {
            tag,
            local,
            attributes,
            namespaces,
            text: None,
            parent,
            children: Vec::new(),
        });

        match parent {
            Some(p) => self.nodes[p].children.push(id),
            None if self.root.is_none() => self.root = Some(id),
            None => {
                return Err(Error::Xml(
                    "document has more than one root element".to_string(),
                ))
            }
        }
        Ok(id)
    }
}

impl<'d> NodeHandle<'d> {
    fn record(&self) -> &'d ElementRecord {
        &self.doc.nodes[self.id]
    }

    /// Attribute value by raw name
    pub fn attribute(&self, name: &str) -> Option<&'d str> {
        self.record().attributes.get(name).map(|s| s.as_str())
    }

    /// Attribute value by namespace and local name, resolving the
    /// prefix of each candidate against the visible scope
    pub fn attribute_ns(&self, namespace: &str, local: &str) -> Option<&'d str> {
        for (name, value) in &self.record().attributes {
            let (prefix, attr_local) = split_qname(name);
            if attr_local != local || name.starts_with("xmlns") {
                continue;
            }
            // unprefixed attributes are in no namespace
            let Some(prefix) = prefix else { continue };
            if self.resolve_namespace(Some(prefix)) == Some(namespace) {
                return Some(value);
            }
        }
        None
    }
}

impl<'d> DomAdapter for NodeHandle<'d> {
    fn tag_name(&self) -> &str {
        &self.record().tag
    }

    fn local_name(&self) -> &str {
        &self.record().local
    }

    fn has_attribute(&self, name: &str) -> bool {
        self.record().attributes.contains_key(name)
    }

    fn attribute_map(&self) -> &IndexMap<String, String> {
        &self.record().attributes
    }

    fn resolve_namespace(&self, prefix: Option<&str>) -> Option<&str> {
        if prefix == Some("xml") {
            return Some(XML_NAMESPACE);
        }
        let key = prefix.unwrap_or("");
        let mut current = Some(self.id);
        while let Some(id) = current {
            let record = &self.doc.nodes[id];
            if let Some(uri) = record.namespaces.get(key) {
                return Some(uri.as_str());
            }
            current = record.parent;
        }
        None
    }

    fn child_elements(&self, names: &[&str]) -> Vec<Self> {
        self.record()
            .children
            .iter()
            .filter(|&&child| {
                names.is_empty() || names.contains(&self.doc.nodes[child].local.as_str())
            })
            .map(|&child| NodeHandle {
                doc: self.doc,
                id: child,
            })
            .collect()
    }

    fn parent(&self) -> Option<Self> {
        self.record().parent.map(|id| NodeHandle { doc: self.doc, id })
    }

    fn text(&self) -> Option<&str> {
        self.record().text.as_deref()
    }
}
