//! # mpack
//!
//! A [MessagePack](https://msgpack.org) codec for Rust types, with records laid out
//! from their declared fields and host types plugged in as extension types.
//!
//! # Usage
//!
//! Anything implementing [`Encode`] can be encoded, anything implementing [`Decode`]
//! can be decoded into. Structs get both from `#[derive(Record)]`:
//!
//! ```
//! use mpack::prelude::*;
//!
//! #[derive(Record, Debug, Default, PartialEq)]
//! struct Sample {
//!     pub id: u64,
//!     #[msgpack(tag = "label,omitempty")]
//!     pub name: String,
//!     pub readings: Vec<f64>,
//!     // private fields are never encoded
//!     scratch: u32,
//! }
//!
//! let sample = Sample {
//!     id: 7,
//!     name: String::new(),
//!     readings: vec![0.5, 1.5],
//!     scratch: 99,
//! };
//!
//! let bytes = encode(&sample, Mode::Map).unwrap();
//!
//! // `label` is empty, so only two entries were written
//! assert_eq!(bytes[0], 0x82);
//!
//! let back: Sample = decode(&bytes, Mode::Map).unwrap();
//! assert_eq!(back.readings, sample.readings);
//! assert_eq!(back.scratch, 0);
//! ```
//!
//! Input whose shape is not known decodes into a [`Value`]:
//!
//! ```
//! use mpack::prelude::*;
//!
//! let v = decode_value(&[0x81, 0xa1, b'k', 0xff]).unwrap();
//! assert_eq!(v.get("k"), Some(&Value::Int(-1)));
//! ```
//!
//! # Records
//!
//! A record is encoded as a map from wire name to value ([`Mode::Map`], the default)
//! or as an array with one slot per field ([`Mode::Array`]). Both sides of a
//! conversation must agree on the mode.
//!
//! Which fields appear, under what name and in what order is decided once per type
//! and cached:
//!
//! * only `pub` fields take part;
//! * `#[msgpack(tag = "name")]` renames a field, `#[msgpack(tag = "-")]` drops it, and
//!   the `omitempty` option (`"name,omitempty"` or `",omitempty"`) leaves a field out
//!   of maps while it holds its zero value;
//! * a field marked `#[msgpack(embed)]` with no tag name contributes its own fields
//!   instead of itself. Fields of the outer record come first, then each embedded
//!   record's, in declaration order;
//! * when names collide, the shallowest field wins. Colliding fields at the same
//!   depth are all dropped.
//!
//! On decode, map entries with unknown names are skipped, as are array slots past
//! the last field. Fields the input does not mention keep their previous value.
//!
//! # Extensions
//!
//! Types without a native wire form are carried as extension values: a signed type
//! tag and an opaque payload. See [`extension`] for registering a binding.
//! [`Timestamp`] (tag `-1`) is always bound.
//!
//! # Format overview
//!
//! Every value starts with a header byte.
//!
//! | header        | value                                     |
//! | ------------- | ----------------------------------------- |
//! | `0x00..=0x7f` | positive fixint                           |
//! | `0x80..=0x8f` | fixmap, up to 15 entries                  |
//! | `0x90..=0x9f` | fixarray, up to 15 elements               |
//! | `0xa0..=0xbf` | fixstr, up to 31 bytes                    |
//! | `0xc0`        | nil                                       |
//! | `0xc1`        | never used                                |
//! | `0xc2, 0xc3`  | false, true                               |
//! | `0xc4..=0xc6` | bin 8/16/32                               |
//! | `0xc7..=0xc9` | ext 8/16/32                               |
//! | `0xca, 0xcb`  | float 32/64                               |
//! | `0xcc..=0xcf` | uint 8/16/32/64                           |
//! | `0xd0..=0xd3` | int 8/16/32/64                            |
//! | `0xd4..=0xd8` | fixext 1/2/4/8/16                         |
//! | `0xd9..=0xdb` | str 8/16/32                               |
//! | `0xdc, 0xdd`  | array 16/32                               |
//! | `0xde, 0xdf`  | map 16/32                                 |
//! | `0xe0..=0xff` | negative fixint                           |
//!
//! Lengths and numbers following a header are big-endian. Encoding always picks the
//! smallest format that holds the value; decoding accepts every format a destination
//! can hold, so an `int 64` header decodes into a `u8` if the value fits.

#![warn(
    deprecated_in_future,
    unsafe_code,
    unused_labels,
    keyword_idents,
    macro_use_extern_crate,
    trivial_casts,
    unused_extern_crates,
    unused_import_braces
)]
#![allow(clippy::cast_lossless)]

// lets `#[derive(Record)]` output name `::mpack` inside this crate too
extern crate self as mpack;

pub mod cache;
pub mod codec;
pub mod encoding;
pub mod errors;
pub mod extension;
pub mod layout;
pub mod prelude;
pub mod record;
mod rep;
pub mod timestamp;
pub mod value;

pub use codec::Codec;
pub use encoding::{Decode, Decoder, Encode, Encoder, Kind, Mode};
pub use errors::{Error, Result};
pub use mpack_derive::Record;
pub use timestamp::Timestamp;
pub use value::Value;
