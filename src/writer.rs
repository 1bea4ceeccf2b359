//! SOAP 1.1 envelope writer
//!
//! [`SoapWriter`] streams an envelope through a caller-owned sink:
//! `open` emits the envelope start with the five reserved namespace
//! prefixes and the optional header, `serialize` renders body values
//! through their typecodes, and `close` drains the deferred callbacks,
//! closes the body, emits the optional trailer and closes the
//! envelope. A writer is single-use; once closed, further writes are
//! an error.
//!
//! The identity registry (`remember`/`forget`) lets callers doing
//! multi-reference output detect an already-written value and emit a
//! reference instead of re-embedding it. The writer never rewrites
//! cycles on its own; a caller that ignores the registry and feeds a
//! cyclic structure will recurse without bound.

use std::collections::HashSet;
use std::io;
use std::mem;
use std::sync::Arc;

use indexmap::IndexMap;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::error::{Error, Result};
use crate::namespaces::{
    SOAPWIRE_NAMESPACE, SOAP_ENC_NAMESPACE, SOAP_ENV_NAMESPACE, XSD_NAMESPACE, XSI_NAMESPACE,
};
use crate::typecode::{TypeCode, Value};

/// The reserved prefixes declared on every envelope, in emission order
pub const RESERVED_PREFIXES: &[(&str, &str)] = &[
    ("SOAP-ENV", SOAP_ENV_NAMESPACE),
    ("SOAP-ENC", SOAP_ENC_NAMESPACE),
    ("xsi", XSI_NAMESPACE),
    ("xsd", XSD_NAMESPACE),
    ("soapwire", SOAPWIRE_NAMESPACE),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Created,
    Open,
    Closed,
}

type Callback<W> = Box<dyn FnOnce(&mut SoapWriter<W>) -> Result<()>>;

/// Streams one SOAP envelope into a sink
pub struct SoapWriter<W: io::Write> {
    xml: Option<Writer<W>>,
    state: WriterState,
    callbacks: Vec<Callback<W>>,
    known: HashSet<usize>,
    bindings: IndexMap<String, Arc<TypeCode>>,
}

impl<W: io::Write> SoapWriter<W> {
    /// A writer over a caller-owned sink; nothing is emitted until
    /// [`open`](Self::open)
    pub fn new(sink: W) -> Self {
        Self {
            xml: Some(Writer::new(sink)),
            state: WriterState::Created,
            callbacks: Vec::new(),
            known: HashSet::new(),
            bindings: IndexMap::new(),
        }
    }

    /// Bind a native type name to its typecode, so records carrying it
    /// can be serialized without an explicit typecode argument
    pub fn bind(&mut self, type_name: impl Into<String>, typecode: Arc<TypeCode>) {
        self.bindings.insert(type_name.into(), typecode);
    }

    /// Emit the envelope start tag, the optional header fragments, and
    /// open the body
    ///
    /// `extra_namespaces` are additional prefix declarations for the
    /// envelope element. Rebinding a reserved prefix to a different URI
    /// is a fatal [`Error::NamespaceCollision`] raised before a single
    /// byte is written; redeclaring one with its own URI is ignored.
    pub fn open(&mut self, header: &[&str], extra_namespaces: &[(&str, &str)]) -> Result<()> {
        if self.state != WriterState::Created {
            return Err(Error::Writer("writer already opened".to_string()));
        }

        // Collision check runs fully before any output.
        for &(prefix, uri) in extra_namespaces {
            if let Some(&(_, reserved)) = RESERVED_PREFIXES.iter().find(|(p, _)| *p == prefix) {
                if uri != reserved {
                    return Err(Error::NamespaceCollision {
                        prefix: prefix.to_string(),
                        reserved: reserved.to_string(),
                        given: uri.to_string(),
                    });
                }
            }
        }

        let xml = self.sink()?;
        let mut envelope = BytesStart::new("SOAP-ENV:Envelope");
        for &(prefix, uri) in RESERVED_PREFIXES {
            envelope.push_attribute((format!("xmlns:{}", prefix).as_str(), uri));
        }
        for &(prefix, uri) in extra_namespaces {
            if RESERVED_PREFIXES.iter().any(|(p, _)| *p == prefix) {
                continue;
            }
            envelope.push_attribute((format!("xmlns:{}", prefix).as_str(), uri));
        }
        xml.write_event(Event::Start(envelope))?;

        if !header.is_empty() {
            xml.write_event(Event::Start(BytesStart::new("SOAP-ENV:Header")))?;
            for fragment in header {
                // Fragments are pre-built markup, written through as is.
                xml.write_event(Event::Text(BytesText::from_escaped(*fragment)))?;
            }
            xml.write_event(Event::End(BytesEnd::new("SOAP-ENV:Header")))?;
        }

        xml.write_event(Event::Start(BytesStart::new("SOAP-ENV:Body")))?;
        self.state = WriterState::Open;
        Ok(())
    }

    /// Serialize one body value
    ///
    /// The typecode is the explicit argument, or the one bound to the
    /// record's type name; a value with neither is a
    /// [`Error::Configuration`]. `root` emits a `SOAP-ENC:root`
    /// attribute on the element.
    pub fn serialize(
        &mut self,
        value: &Value,
        typecode: Option<&TypeCode>,
        root: Option<bool>,
    ) -> Result<()> {
        if self.state != WriterState::Open {
            return Err(Error::Writer("writer is not open".to_string()));
        }

        let resolved;
        let typecode = match typecode {
            Some(tc) => tc,
            None => {
                let bound = match value {
                    Value::Struct(record) => self.bindings.get(record.type_name()),
                    _ => None,
                };
                resolved = bound.cloned().ok_or_else(|| {
                    Error::configuration("value has no bound typecode")
                })?;
                &*resolved
            }
        };

        let root_pair;
        let extra: &[(&str, &str)] = match root {
            Some(r) => {
                root_pair = [("SOAP-ENC:root", if r { "1" } else { "0" })];
                &root_pair
            }
            None => &[],
        };

        let xml = self.sink()?;
        typecode.serialize_with(value, xml, extra)
    }

    /// Register a callback to run after the body content, before the
    /// body is closed; callbacks run in registration order
    pub fn add_callback(
        &mut self,
        callback: impl FnOnce(&mut SoapWriter<W>) -> Result<()> + 'static,
    ) {
        self.callbacks.push(Box::new(callback));
    }

    /// Record a value's identity; returns true when it was already
    /// remembered
    pub fn remember(&mut self, value: &Value) -> bool {
        !self.known.insert(identity(value))
    }

    /// True when the value's identity has been remembered
    pub fn is_remembered(&self, value: &Value) -> bool {
        self.known.contains(&identity(value))
    }

    /// Drop a value from the identity registry
    pub fn forget(&mut self, value: &Value) {
        self.known.remove(&identity(value));
    }

    /// Drain callbacks, close the body, emit the trailer fragments and
    /// close the envelope
    ///
    /// A failing callback does not stop the close sequence; the
    /// elements are still closed and the first error is returned at
    /// the end.
    pub fn close(&mut self, trailer: &[&str]) -> Result<()> {
        if self.state != WriterState::Open {
            return Err(Error::Writer("writer is not open".to_string()));
        }

        let mut first_error = None;
        for callback in mem::take(&mut self.callbacks) {
            if let Err(e) = callback(self) {
                first_error.get_or_insert(e);
            }
        }

        let result = self.close_elements(trailer);
        self.state = WriterState::Closed;

        match first_error {
            Some(e) => Err(e),
            None => result,
        }
    }

    fn close_elements(&mut self, trailer: &[&str]) -> Result<()> {
        let xml = self.sink()?;
        xml.write_event(Event::End(BytesEnd::new("SOAP-ENV:Body")))?;
        for fragment in trailer {
            xml.write_event(Event::Text(BytesText::from_escaped(*fragment)))?;
        }
        xml.write_event(Event::End(BytesEnd::new("SOAP-ENV:Envelope")))?;
        Ok(())
    }

    /// Recover the sink; the writer must not be mid-envelope
    pub fn into_inner(mut self) -> Result<W> {
        if self.state == WriterState::Open {
            return Err(Error::Writer("writer is still open".to_string()));
        }
        match self.xml.take() {
            Some(xml) => Ok(xml.into_inner()),
            None => Err(Error::Writer("sink already taken".to_string())),
        }
    }

    fn sink(&mut self) -> Result<&mut Writer<W>> {
        self.xml
            .as_mut()
            .ok_or_else(|| Error::Writer("sink already taken".to_string()))
    }
}

impl<W: io::Write> Drop for SoapWriter<W> {
    fn drop(&mut self) {
        // Best-effort close so the sink is not left mid-element.
        if self.state == WriterState::Open && self.xml.is_some() {
            let _ = self.close(&[]);
        }
    }
}

/// Identity key of a value: its address, never its contents
fn identity(value: &Value) -> usize {
    value as *const Value as usize
}
