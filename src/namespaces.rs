//! XML namespace handling
//!
//! This module provides utilities for working with XML namespaces,
//! prefixed-name splitting, and resolved type descriptors.

/// XSD namespace
pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// XML Schema Instance namespace
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// XML namespace
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// XMLNS namespace
pub const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";

/// SOAP 1.1 envelope namespace
pub const SOAP_ENV_NAMESPACE: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// SOAP 1.1 encoding namespace
pub const SOAP_ENC_NAMESPACE: &str = "http://schemas.xmlsoap.org/soap/encoding/";

/// Toolkit schema namespace, declared on every emitted envelope
pub const SOAPWIRE_NAMESPACE: &str = "http://soapwire.dev/schema";

/// Split a prefixed name into (prefix, local name)
pub fn split_qname(name: &str) -> (Option<&str>, &str) {
    match name.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, name),
    }
}

/// A resolved type/element/attribute reference: (namespace, local name)
///
/// Equality is structural, never by identity. Any prefix on the name
/// is stripped at construction; the prefix is irrelevant once the
/// namespace is known.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeDescriptor {
    /// Namespace URI (None for no namespace)
    pub namespace: Option<String>,
    /// Unprefixed local name
    pub name: String,
}

impl TypeDescriptor {
    /// Create a new descriptor, stripping any prefix from the name
    pub fn new(namespace: Option<impl Into<String>>, name: impl Into<String>) -> Self {
        let name = name.into();
        let (_, local) = split_qname(&name);
        Self {
            namespace: namespace.map(|s| s.into()),
            name: local.to_string(),
        }
    }

    /// Create a descriptor with a namespace
    pub fn namespaced(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(Some(namespace.into()), name)
    }

    /// Create a descriptor without a namespace
    pub fn local(name: impl Into<String>) -> Self {
        Self::new(None::<String>, name)
    }

    /// Get the target namespace
    pub fn target_namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Check if the descriptor names an XSD builtin
    pub fn is_xsd(&self) -> bool {
        self.namespace.as_deref() == Some(XSD_NAMESPACE)
    }

    /// Clark notation, `{namespace}name`
    pub fn clark(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{{{}}}{}", ns, self.name),
            None => self.name.clone(),
        }
    }
}

impl std::fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.clark())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_qname() {
        assert_eq!(split_qname("xsd:string"), (Some("xsd"), "string"));
        assert_eq!(split_qname("string"), (None, "string"));
    }

    #[test]
    fn test_descriptor_strips_prefix() {
        let desc = TypeDescriptor::namespaced(XSD_NAMESPACE, "tns:item");
        assert_eq!(desc.name, "item");
        assert_eq!(desc.namespace.as_deref(), Some(XSD_NAMESPACE));
    }

    #[test]
    fn test_descriptor_structural_equality() {
        let a = TypeDescriptor::namespaced("http://example.com", "item");
        let b = TypeDescriptor::namespaced("http://example.com", "item");
        assert_eq!(a, b);

        let c = TypeDescriptor::local("item");
        assert_ne!(a, c);
    }

    #[test]
    fn test_clark_notation() {
        let desc = TypeDescriptor::namespaced("http://example.com", "item");
        assert_eq!(desc.clark(), "{http://example.com}item");
        assert_eq!(TypeDescriptor::local("item").clark(), "item");
    }

    #[test]
    fn test_is_xsd() {
        assert!(TypeDescriptor::namespaced(XSD_NAMESPACE, "int").is_xsd());
        assert!(!TypeDescriptor::local("int").is_xsd());
    }
}
