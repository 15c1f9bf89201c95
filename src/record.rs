//! The record capability: what a composite type exposes so its fields can be
//! resolved once and then read or written by index.
//!
//! These traits are normally implemented by `#[derive(Record)]`:
//!
//! ```
//! use mpack::prelude::*;
//!
//! #[derive(Record, Default)]
//! struct Point {
//!     pub x: i32,
//!     #[msgpack(tag = "why,omitempty")]
//!     pub y: i32,
//!     #[msgpack(tag = "-")]
//!     pub cached: Option<String>,
//!     hidden: u8,
//! }
//!
//! let info = Point::record_info();
//! assert_eq!(info.name, "Point");
//! assert_eq!(info.fields.len(), 4);
//! assert!(!info.fields[3].public);
//! ```

use crate::encoding::{Decode, Encode};
use std::any::{Any, TypeId};

/// One declared field, in declaration order.
#[derive(Clone, Debug)]
pub struct FieldDecl {
    /// The declared name; tuple fields are named by position.
    pub name: &'static str,
    /// Only public fields take part in encoding.
    pub public: bool,
    /// Raw tag text from `#[msgpack(tag = "...")]`.
    pub tag: Option<&'static str>,
    /// Present on fields marked `#[msgpack(embed)]`.
    pub embed: Option<fn() -> RecordInfo>,
}

impl FieldDecl {
    pub fn new(name: &'static str, public: bool) -> Self {
        FieldDecl {
            name,
            public,
            tag: None,
            embed: None,
        }
    }

    pub fn tag(mut self, tag: &'static str) -> Self {
        self.tag = Some(tag);
        self
    }

    pub fn embed(mut self, info: fn() -> RecordInfo) -> Self {
        self.embed = Some(info);
        self
    }
}

/// The static shape of a record type.
#[derive(Clone, Debug)]
pub struct RecordInfo {
    pub name: &'static str,
    pub type_id: TypeId,
    pub fields: Vec<FieldDecl>,
}

/// Index-addressed access to a record's fields.
///
/// Indices are positions in [`RecordInfo::fields`]. Accessors return `None` for
/// indices that are not encodable fields, such as private or ignored ones.
pub trait RecordFields {
    fn field(&self, index: usize) -> Option<&dyn Encode>;

    fn field_mut(&mut self, index: usize) -> Option<&mut dyn Decode>;

    /// The record held by an embedded field, if that field currently holds one.
    fn embedded(&self, _index: usize) -> Option<&dyn RecordFields> { None }

    /// The record held by an embedded field, allocating it when absent.
    fn embedded_mut(&mut self, _index: usize) -> Option<&mut dyn RecordFields> { None }
}

/// A composite type whose fields are encoded by name or position.
pub trait Record: RecordFields + Any {
    fn record_info() -> RecordInfo;
}

/// A field type that can be embedded anonymously, flattening its fields into the
/// outer record.
pub trait Embed {
    /// Shape of the record this field holds.
    fn embedded_info() -> RecordInfo;

    fn as_embedded(&self) -> Option<&dyn RecordFields>;

    /// Allocates the embedded record if it is absent.
    fn as_embedded_mut(&mut self) -> &mut dyn RecordFields;
}

impl<R: Embed> Embed for Box<R> {
    fn embedded_info() -> RecordInfo { R::embedded_info() }

    fn as_embedded(&self) -> Option<&dyn RecordFields> { (**self).as_embedded() }

    fn as_embedded_mut(&mut self) -> &mut dyn RecordFields { (**self).as_embedded_mut() }
}

impl<R: Embed + Default> Embed for Option<R> {
    fn embedded_info() -> RecordInfo { R::embedded_info() }

    fn as_embedded(&self) -> Option<&dyn RecordFields> { self.as_ref().and_then(R::as_embedded) }

    fn as_embedded_mut(&mut self) -> &mut dyn RecordFields { self.get_or_insert_with(R::default).as_embedded_mut() }
}
