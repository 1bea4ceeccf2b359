//! XSD schema component model
//!
//! A schema document is parsed into an arena of [`Component`] records
//! hanging off a [`Schema`], with the global definitions exposed
//! through named collections. [`SchemaReader`] handles acquisition and
//! the include/import registration maps.

pub mod base;
pub mod components;
pub mod parsing;
pub mod particles;
pub mod reader;
pub mod schemas;

pub use base::{ComponentKind, Facet, FormDefault};
pub use components::{AttributeBuckets, Component, ComponentId, SchemaDefaults};
pub use particles::Occurs;
pub use reader::SchemaReader;
pub use schemas::{Collection, ImportRecord, ResolvedRef, Schema};
