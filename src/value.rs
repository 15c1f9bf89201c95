//! A dynamically typed MessagePack value.

use crate::{
    encoding::{constants::Tag, Decode, Decoder, Encode, Encoder, Kind},
    errors::{Error, Result},
};
use bytes::Bytes;
use std::fmt;

/// Any wire value, for decoding input whose shape is not known in advance.
///
/// Integers keep the signedness of their header: positive fixints and `uint`
/// formats decode to [`Value::Uint`], negative fixints and `int` formats to
/// [`Value::Int`]. Extensions whose type tag has a registered binding decode
/// through it; others stay raw.
///
/// # Example
///
/// ```
/// use mpack::prelude::*;
///
/// let v = decode_value(&[0x92, 0x01, 0xa1, b'x']).unwrap();
/// assert_eq!(v, Value::Array(vec![Value::Uint(1), Value::from("x")]));
/// assert_eq!(v.to_string(), "[1, \"x\"]");
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Uint(u64),
    F32(f32),
    F64(f64),
    Str(String),
    Bin(Bytes),
    Array(Vec<Value>),
    /// Entries in wire order; duplicate keys are kept.
    Map(Vec<(Value, Value)>),
    /// An extension no binding turned into something richer.
    Ext(i8, Bytes),
    Timestamp(crate::timestamp::Timestamp),
}

use Value::*;

impl Default for Value {
    fn default() -> Self { Nil }
}

impl Value {
    pub fn is_nil(&self) -> bool { matches!(self, Nil) }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Any integer that fits in an `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Int(i) => Some(*i),
            Uint(u) if *u <= i64::MAX as u64 => Some(*u as i64),
            _ => None,
        }
    }

    /// Any non-negative integer.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Uint(u) => Some(*u),
            Int(i) if *i >= 0 => Some(*i as u64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            F32(f) => Some(*f as f64),
            F64(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Bin(b) => Some(b),
            Str(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(Value, Value)]> {
        match self {
            Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// The value of the first entry whose key is the string `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map()?
            .iter()
            .find(|(k, _)| k.as_str() == Some(key))
            .map(|(_, v)| v)
    }

    fn decode_from(dec: &mut Decoder<'_, '_>) -> Result<Value> {
        let (byte, tag) = dec.peek_tag()?;
        Ok(match tag {
            Tag::Nil => {
                dec.next_tag()?;
                Nil
            }
            Tag::Bool(b) => {
                dec.next_tag()?;
                Bool(b)
            }
            Tag::PosFixInt(_) | Tag::Uint(_) => Uint(dec.read_number(Kind::Dynamic)?.cast(Kind::Uint)?),
            Tag::NegFixInt(_) | Tag::Int(_) => Int(dec.read_number(Kind::Dynamic)?.cast(Kind::Int)?),
            Tag::Float32 => F32(dec.read_number(Kind::Dynamic)?.cast(Kind::Float)?),
            Tag::Float64 => F64(dec.read_number(Kind::Dynamic)?.cast(Kind::Float)?),
            Tag::FixStr(_) | Tag::Str(_) => Str(dec.read_str()?.to_owned()),
            Tag::Bin(_) => Bin(dec.read_raw(Kind::Bin)?.map(Bytes::copy_from_slice).unwrap_or_default()),
            Tag::FixArray(_) | Tag::Array(_) => {
                let len = dec.read_array_len(Kind::Dynamic)?.unwrap_or(0);
                let mut items = Vec::with_capacity(len.min(dec.remaining()));
                dec.nested(|dec| {
                    for _ in 0..len {
                        items.push(Value::decode_from(dec)?);
                    }
                    Ok(())
                })?;
                Array(items)
            }
            Tag::FixMap(_) | Tag::Map(_) => {
                let len = dec.read_map_len(Kind::Dynamic)?.unwrap_or(0);
                let mut entries = Vec::with_capacity(len.min(dec.remaining()));
                dec.nested(|dec| {
                    for _ in 0..len {
                        dec.check_key()?;
                        let k = Value::decode_from(dec)?;
                        let v = Value::decode_from(dec)?;
                        entries.push((k, v));
                    }
                    Ok(())
                })?;
                Map(entries)
            }
            Tag::FixExt(_) | Tag::Ext(_) => {
                dec.next_tag()?;
                dec.decode_extension_value(byte, tag)?
            }
            Tag::Unused => {
                return Err(Error::Format {
                    byte,
                    kind: Kind::Dynamic,
                })
            }
        })
    }
}

impl Encode for Value {
    fn encode(&self, enc: &mut Encoder<'_>) -> Result<()> {
        match self {
            Nil => enc.put_nil(),
            Bool(b) => enc.put_bool(*b),
            Int(i) => enc.put_int(*i),
            Uint(u) => enc.put_uint(*u),
            F32(f) => enc.put_f32(*f),
            F64(f) => enc.put_f64(*f),
            Str(s) => enc.put_str(s),
            Bin(b) => enc.put_bin(b),
            Array(items) => {
                enc.put_array_len(items.len())?;
                for item in items {
                    item.encode(enc)?;
                }
                Ok(())
            }
            Map(entries) => {
                enc.put_map_len(entries.len())?;
                for (k, v) in entries {
                    enc.put_key(k)?;
                    v.encode(enc)?;
                }
                Ok(())
            }
            Ext(type_tag, payload) => enc.put_ext(*type_tag, payload),
            Timestamp(ts) => ts.encode(enc),
        }
    }

    fn kind(&self) -> Kind {
        match self {
            Nil => Kind::Nil,
            Bool(_) => Kind::Bool,
            Int(_) => Kind::Int,
            Uint(_) => Kind::Uint,
            F32(_) | F64(_) => Kind::Float,
            Str(_) => Kind::Str,
            Bin(_) => Kind::Bin,
            Array(_) => Kind::Array,
            Map(_) => Kind::Map,
            Ext(..) | Timestamp(_) => Kind::Ext,
        }
    }

    fn is_zero(&self) -> bool { self.is_nil() }
}

impl Decode for Value {
    fn decode_into(&mut self, dec: &mut Decoder<'_, '_>) -> Result<()> {
        *self = Value::decode_from(dec)?;
        Ok(())
    }

    fn kind(&self) -> Kind { Kind::Dynamic }
}

macro_rules! value_from {
    ($($t:ty => $variant:ident as $wide:ty),* $(,)?) => {
        $(
            impl From<$t> for Value {
                fn from(x: $t) -> Value { $variant(x as $wide) }
            }
        )*
    };
}

value_from!(
    u8 => Uint as u64,
    u16 => Uint as u64,
    u32 => Uint as u64,
    u64 => Uint as u64,
    i8 => Int as i64,
    i16 => Int as i64,
    i32 => Int as i64,
    i64 => Int as i64,
    f32 => F32 as f32,
    f64 => F64 as f64,
);

impl From<bool> for Value {
    fn from(b: bool) -> Value { Bool(b) }
}

impl From<&str> for Value {
    fn from(s: &str) -> Value { Str(s.to_owned()) }
}

impl From<String> for Value {
    fn from(s: String) -> Value { Str(s) }
}

impl From<Bytes> for Value {
    fn from(b: Bytes) -> Value { Bin(b) }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Value { Array(items) }
}

impl From<crate::timestamp::Timestamp> for Value {
    fn from(ts: crate::timestamp::Timestamp) -> Value { Timestamp(ts) }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(o: Option<T>) -> Value { o.map_or(Nil, Into::into) }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Nil => f.write_str("nil"),
            Bool(b) => write!(f, "{}", b),
            Int(i) => write!(f, "{}", i),
            Uint(u) => write!(f, "{}", u),
            F32(x) => write!(f, "{}", x),
            F64(x) => write!(f, "{}", x),
            Str(s) => write!(f, "{:?}", s),
            Bin(b) => {
                f.write_str("0x")?;
                b.iter().try_for_each(|byte| write!(f, "{:02x}", byte))
            }
            Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Map(entries) => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                f.write_str("}")
            }
            Ext(type_tag, payload) => write!(f, "ext({}, {} bytes)", type_tag, payload.len()),
            Timestamp(ts) => write!(f, "{}.{:09}", ts.seconds(), ts.nanoseconds()),
        }
    }
}
