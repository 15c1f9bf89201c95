//! # MessagePack binary encoder and decoder
//!
//! Encoding runs in two passes over the same traversal: the first pass only counts
//! bytes, the second writes them into a buffer allocated once at exactly that size.
//! Decoding is a single recursive descent driven by the destination's type and the
//! header bytes actually present.
//!
//! # Example
//!
//! ```
//! use mpack::prelude::*;
//!
//! #[derive(Record, Debug, Default, PartialEq)]
//! struct SomeData {
//!     pub x: u64,
//!     pub y: i32,
//! }
//!
//! let some_data = SomeData { x: 1, y: -2 };
//!
//! // records become maps keyed by field name by default
//! let as_map = encode(&some_data, Mode::Map).unwrap();
//! assert_eq!(as_map[0], 0x82);
//!
//! // or positional arrays
//! let as_array = encode(&some_data, Mode::Array).unwrap();
//! assert_eq!(as_array, vec![0x92, 0x01, 0xfe]);
//!
//! // decoding must use the same mode
//! let back: SomeData = decode(&as_array, Mode::Array).unwrap();
//! assert_eq!(back, some_data);
//! ```

use std::fmt;

pub mod constants;
pub mod de;
pub mod ser;

pub use de::{Decode, Decoder};
pub use ser::{Encode, Encoder};

use crate::{codec::Codec, errors::Result, value::Value};

/// How records are laid out on the wire.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Mode {
    /// Positional: a record is an array holding one slot per resolved field.
    Array,
    /// Named: a record is a map from wire name to value.
    Map,
}

impl Default for Mode {
    fn default() -> Self { Mode::Map }
}

/// The closed set of value kinds the codec dispatches over.
///
/// Used to describe destinations in errors and to enforce that mapping keys are
/// never arrays or maps.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Kind {
    Nil,
    Bool,
    Int,
    Uint,
    Float,
    Str,
    Bin,
    Array,
    Map,
    Record,
    Ext,
    Dynamic,
}

impl Kind {
    /// Kinds that encode as a wire array or map.
    pub fn is_container(self) -> bool { matches!(self, Kind::Array | Kind::Map | Kind::Record) }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Kind::Nil => "nil",
            Kind::Bool => "bool",
            Kind::Int => "signed integer",
            Kind::Uint => "unsigned integer",
            Kind::Float => "float",
            Kind::Str => "string",
            Kind::Bin => "binary",
            Kind::Array => "array",
            Kind::Map => "map",
            Kind::Record => "record",
            Kind::Ext => "extension",
            Kind::Dynamic => "dynamic value",
        };
        f.write_str(name)
    }
}

/// Encodes `value` with the process-wide [`Codec`].
///
/// # Arguments
///
/// * `value` - The value to be encoded.
/// * `mode` - How records are laid out.
///
/// # Example
///
/// ```
/// use mpack::prelude::*;
///
/// assert_eq!(encode(&256u32, Mode::Map).unwrap(), vec![0xcd, 0x01, 0x00]);
/// ```
pub fn encode<T: Encode + ?Sized>(value: &T, mode: Mode) -> Result<Vec<u8>> {
    Codec::global().encode(value, mode)
}

/// Decodes a fresh `T` with the process-wide [`Codec`].
///
/// # Example
///
/// ```
/// use mpack::prelude::*;
///
/// let s: String = decode(&[0xa2, b'h', b'i'], Mode::Map).unwrap();
/// assert_eq!(s, "hi");
/// ```
pub fn decode<T: Decode + Default>(bytes: &[u8], mode: Mode) -> Result<T> {
    Codec::global().decode(bytes, mode)
}

/// Decodes into an existing destination with the process-wide [`Codec`].
///
/// Fields of `dest` that the input does not mention are left untouched.
pub fn decode_into<T: Decode + ?Sized>(bytes: &[u8], dest: &mut T, mode: Mode) -> Result<()> {
    Codec::global().decode_into(bytes, dest, mode)
}

/// Decodes any input into a dynamically typed [`Value`] with the process-wide
/// [`Codec`].
pub fn decode_value(bytes: &[u8]) -> Result<Value> { Codec::global().decode_value(bytes) }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_mode_is_map() {
        assert_eq!(Mode::default(), Mode::Map);
    }

    #[test]
    fn container_kinds() {
        assert!(Kind::Array.is_container());
        assert!(Kind::Record.is_container());
        assert!(!Kind::Str.is_container());
        assert!(!Kind::Ext.is_container());
    }
}
