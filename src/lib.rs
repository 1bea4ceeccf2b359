//! # soapwire
//!
//! XML Schema resolution and typecode-driven SOAP 1.1 marshaling.
//!
//! soapwire resolves XSD documents into an in-memory type graph and
//! uses that graph to marshal native values into and out of SOAP
//! messages. Three subsystems cooperate:
//!
//! - the **schema component model** parses schema documents into a
//!   validated graph of constructs, resolving namespaces, defaults,
//!   imports and includes;
//! - **typecodes** bind each resolved construct to serialize and
//!   deserialize behavior, with occurrence and nillability rules;
//! - the **SOAP writer** streams an envelope from typecode output,
//!   managing the reserved namespace prefixes and deferred
//!   multi-reference callbacks.
//!
//! ## Example
//!
//! ```rust,ignore
//! use soapwire::schema::SchemaReader;
//! use soapwire::typecode::{TypeCodeBuilder, Value};
//! use soapwire::writer::SoapWriter;
//!
//! let reader = SchemaReader::new();
//! let schema = reader.load_from_file("order.xsd")?;
//! let order = TypeCodeBuilder::new(schema).element("order")?;
//!
//! let mut writer = SoapWriter::new(Vec::new());
//! writer.open(&[], &[])?;
//! writer.serialize(&value, Some(&order), None)?;
//! writer.close(&[])?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dom;
pub mod error;
pub mod namespaces;
pub mod schema;
pub mod surface;
pub mod typecode;
pub mod writer;

// Re-exports for convenience
pub use error::{Error, Result};
pub use namespaces::TypeDescriptor;
pub use schema::{Schema, SchemaReader};
pub use surface::ClassSurface;
pub use typecode::{GeneratedValue, TypeCode, TypeCodeBuilder, Value};
pub use writer::SoapWriter;

/// Version of the soapwire library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
