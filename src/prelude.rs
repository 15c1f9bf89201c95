pub use crate::{
    codec::Codec,
    encoding::{decode, decode_into, decode_value, encode, Decode, Decoder, Encode, Encoder, Kind, Mode},
    record::{Embed, Record, RecordFields},
    timestamp::Timestamp,
    value::Value,
};
pub use bytes::Bytes;
pub use mpack_derive::Record;
