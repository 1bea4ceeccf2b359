//! Error types for soapwire
//!
//! This module defines all error types used throughout the library:
//! schema parsing errors, marshaling errors, accessor-surface
//! configuration errors, and the writer's namespace-collision error.

use std::fmt;
use thiserror::Error;

/// Result type alias using soapwire Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for soapwire operations
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or non-conformant schema input
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// XML to value conversion error
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Accessor-surface or typecode binding mismatch
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Attempt to rebind a reserved writer prefix
    #[error("namespace collision: prefix '{prefix}' is reserved for '{reserved}', got '{given}'")]
    NamespaceCollision {
        /// The reserved prefix
        prefix: String,
        /// The URI the prefix is reserved for
        reserved: String,
        /// The URI the caller tried to bind
        given: String,
    },

    /// Resource loading error
    #[error("resource error: {0}")]
    Resource(String),

    /// Writer used after close
    #[error("writer error: {0}")]
    Writer(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// XML parsing error
    #[error("XML error: {0}")]
    Xml(String),

    /// URL parsing error
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration(message.into())
    }
}

impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Self {
        Error::Xml(e.to_string())
    }
}

/// Schema parsing/resolution error with context
#[derive(Debug, Clone)]
pub struct SchemaError {
    /// Error message
    pub message: String,
    /// Schema construct that caused the error (tag name)
    pub component: Option<String>,
    /// Source location (url or file path)
    pub location: Option<String>,
}

impl SchemaError {
    /// Create a new schema error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            component: None,
            location: None,
        }
    }

    /// Set the offending schema construct
    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    /// Set the source location
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(ref component) = self.component {
            write!(f, "\n\nComponent: <{}>", component)?;
        }

        if let Some(ref location) = self.location {
            write!(f, "\n\nLocation: {}", location)?;
        }

        Ok(())
    }
}

impl std::error::Error for SchemaError {}

/// Marshaling decode error with context
///
/// Scoped to the value being processed; callers typically turn this
/// into a SOAP fault rather than aborting the process.
#[derive(Debug, Clone)]
pub struct DecodeError {
    /// Error message
    pub message: String,
    /// Wire particle name being decoded
    pub particle: Option<String>,
    /// Offending lexical text
    pub text: Option<String>,
}

impl DecodeError {
    /// Create a new decode error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            particle: None,
            text: None,
        }
    }

    /// Set the particle name
    pub fn with_particle(mut self, particle: impl Into<String>) -> Self {
        self.particle = Some(particle.into());
        self
    }

    /// Set the lexical text that failed to parse
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(ref particle) = self.particle {
            write!(f, "\n\nParticle: {}", particle)?;
        }

        if let Some(ref text) = self.text {
            write!(f, "\n\nText: {:?}", text)?;
        }

        Ok(())
    }
}

impl std::error::Error for DecodeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_display() {
        let err = SchemaError::new("missing required attribute 'name'")
            .with_component("element")
            .with_location("order.xsd");

        let msg = format!("{}", err);
        assert!(msg.contains("missing required attribute 'name'"));
        assert!(msg.contains("Component: <element>"));
        assert!(msg.contains("Location: order.xsd"));
    }

    #[test]
    fn test_decode_error_display() {
        let err = DecodeError::new("not a valid integer")
            .with_particle("quantity")
            .with_text("twelve");

        let msg = format!("{}", err);
        assert!(msg.contains("not a valid integer"));
        assert!(msg.contains("Particle: quantity"));
        assert!(msg.contains("twelve"));
    }

    #[test]
    fn test_error_conversion() {
        let schema_err = SchemaError::new("test");
        let err: Error = schema_err.into();
        assert!(matches!(err, Error::Schema(_)));

        let decode_err = DecodeError::new("test");
        let err: Error = decode_err.into();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn test_namespace_collision_display() {
        let err = Error::NamespaceCollision {
            prefix: "xsd".to_string(),
            reserved: "http://www.w3.org/2001/XMLSchema".to_string(),
            given: "http://example.com/bogus".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("xsd"));
        assert!(msg.contains("bogus"));
    }
}
