//! Schema acquisition
//!
//! [`SchemaReader`] loads schema documents from strings, files and
//! `file://` URLs and carries the pre-registration maps that satisfy
//! include and import statements without fetching. Remote transports
//! are out of scope; an `http(s)` location is a [`Error::Resource`].
//!
//! [`Error::Resource`]: crate::error::Error::Resource

use std::path::{Path, PathBuf};
use std::sync::Arc;

use url::Url;

use crate::dom::XmlDocument;
use crate::error::{Error, Result};

use super::schemas::{Schema, SchemaRegistry};

/// Loads schemas and resolves their includes and imports
#[derive(Debug, Default)]
pub struct SchemaReader {
    registry: SchemaRegistry,
}

impl SchemaReader {
    /// A reader with no pre-registered schemas
    pub fn new() -> Self {
        Self::default()
    }

    /// A reader reusing another schema's registration maps
    pub(crate) fn with_registry(registry: SchemaRegistry) -> Self {
        Self { registry }
    }

    pub(crate) fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Pre-register a schema so that an `<include>` naming `location`
    /// uses it instead of fetching
    pub fn add_schema_by_location(&mut self, location: impl Into<String>, schema: Arc<Schema>) {
        self.registry.by_location.insert(location.into(), schema);
    }

    /// Pre-register a schema so that an `<import>` of `namespace` uses
    /// it instead of fetching
    pub fn add_schema_by_namespace(&mut self, namespace: impl Into<String>, schema: Arc<Schema>) {
        self.registry.by_namespace.insert(namespace.into(), schema);
    }

    /// Load a schema from in-memory XML
    ///
    /// Relative schemaLocation values in the document cannot be
    /// resolved later unless they are pre-registered.
    pub fn load_from_string(&self, xml: &str) -> Result<Arc<Schema>> {
        let document = XmlDocument::from_str(xml)?;
        self.finish_load(document, None)
    }

    /// Load a schema from a file path
    pub fn load_from_file(&self, path: impl AsRef<Path>) -> Result<Arc<Schema>> {
        let path = path.as_ref();
        let document = XmlDocument::from_file(path)?;
        let base_url = file_url(path);
        self.finish_load(document, base_url)
    }

    /// Load a schema from a URL; only `file://` is supported
    pub fn load_from_url(&self, url: &Url) -> Result<Arc<Schema>> {
        let path = local_path(url)?;
        let document = XmlDocument::from_file(&path)?;
        self.finish_load(document, Some(url.clone()))
    }

    /// Resolve a schemaLocation against a base URL and load it
    ///
    /// The registration map is consulted first, so repeated fetches of
    /// the same location share one instance.
    pub(crate) fn fetch(&self, location: &str, base: Option<&Url>) -> Result<Arc<Schema>> {
        if let Some(registered) = self.registry.by_location.get(location) {
            return Ok(Arc::clone(registered));
        }

        match base {
            Some(base) => self.load_from_url(&base.join(location)?),
            None => match Url::parse(location) {
                Ok(url) => self.load_from_url(&url),
                // A bare relative location with no base is taken as a
                // filesystem path.
                Err(url::ParseError::RelativeUrlWithoutBase) => self.load_from_file(location),
                Err(e) => Err(e.into()),
            },
        }
    }

    fn finish_load(&self, document: XmlDocument, base_url: Option<Url>) -> Result<Arc<Schema>> {
        let mut schema = Schema::new();
        schema.base_url = base_url;
        schema.load(&document.root(), self)?;
        Ok(Arc::new(schema))
    }
}

fn file_url(path: &Path) -> Option<Url> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().ok()?.join(path)
    };
    Url::from_file_path(absolute).ok()
}

fn local_path(url: &Url) -> Result<PathBuf> {
    match url.scheme() {
        "file" => url
            .to_file_path()
            .map_err(|_| Error::Resource(format!("unusable file URL '{}'", url))),
        scheme => Err(Error::Resource(format!(
            "unsupported transport '{}' for '{}'",
            scheme, url
        ))),
    }
}
