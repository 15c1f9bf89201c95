//! [`Encode`] and [`Decode`] for standard library and host types.

use crate::{
    encoding::{constants::Tag, de::decode_seq, Decode, Decoder, Encode, Encoder, Kind},
    errors::{Error, Result},
};
use bytes::Bytes;
use std::{
    collections::{BTreeMap, HashMap},
    hash::{BuildHasher, Hash},
};

impl Encode for bool {
    fn encode(&self, enc: &mut Encoder<'_>) -> Result<()> { enc.put_bool(*self) }

    fn kind(&self) -> Kind { Kind::Bool }

    fn is_zero(&self) -> bool { !*self }

    fn encode_slice(items: &[bool], enc: &mut Encoder<'_>) -> Result<()> {
        enc.put_fixed_width(items, 1, |enc, b| enc.put_bool(*b))
    }
}

impl Decode for bool {
    fn decode_into(&mut self, dec: &mut Decoder<'_, '_>) -> Result<()> {
        *self = dec.read_bool()?;
        Ok(())
    }

    fn kind(&self) -> Kind { Kind::Bool }
}

macro_rules! int_rep {
    ($kind:ident, $put:ident, $wide:ty, $($t:ty),*) => {
        $(
            impl Encode for $t {
                fn encode(&self, enc: &mut Encoder<'_>) -> Result<()> { enc.$put(*self as $wide) }

                fn kind(&self) -> Kind { Kind::$kind }

                fn is_zero(&self) -> bool { *self == 0 }
            }

            impl Decode for $t {
                fn decode_into(&mut self, dec: &mut Decoder<'_, '_>) -> Result<()> {
                    *self = dec.read_number(Kind::$kind)?.cast(Kind::$kind)?;
                    Ok(())
                }

                fn kind(&self) -> Kind { Kind::$kind }
            }
        )*
    };
}

int_rep!(Uint, put_uint, u64, u16, u32, u64, usize);
int_rep!(Int, put_int, i64, i8, i16, i32, i64, isize);

// bytes are the one integer type whose sequences have their own wire family
impl Encode for u8 {
    fn encode(&self, enc: &mut Encoder<'_>) -> Result<()> { enc.put_uint(*self as u64) }

    fn kind(&self) -> Kind { Kind::Uint }

    fn is_zero(&self) -> bool { *self == 0 }

    fn slice_kind() -> Kind { Kind::Bin }

    fn encode_slice(items: &[u8], enc: &mut Encoder<'_>) -> Result<()> { enc.put_bin(items) }
}

impl Decode for u8 {
    fn decode_into(&mut self, dec: &mut Decoder<'_, '_>) -> Result<()> {
        *self = dec.read_number(Kind::Uint)?.cast(Kind::Uint)?;
        Ok(())
    }

    fn kind(&self) -> Kind { Kind::Uint }

    fn decode_vec(dest: &mut Vec<u8>, dec: &mut Decoder<'_, '_>) -> Result<()> {
        let (_, tag) = dec.peek_tag()?;
        if tag.is_str() || matches!(tag, Tag::Bin(_) | Tag::Nil) {
            dest.clear();
            if let Some(raw) = dec.read_raw(Kind::Bin)? {
                dest.extend_from_slice(raw);
            }
            Ok(())
        } else {
            decode_seq(dest, dec)
        }
    }
}

impl Encode for f32 {
    fn encode(&self, enc: &mut Encoder<'_>) -> Result<()> { enc.put_f32(*self) }

    fn kind(&self) -> Kind { Kind::Float }

    fn is_zero(&self) -> bool { *self == 0.0 }

    fn encode_slice(items: &[f32], enc: &mut Encoder<'_>) -> Result<()> {
        enc.put_fixed_width(items, 5, |enc, f| enc.put_f32(*f))
    }
}

impl Encode for f64 {
    fn encode(&self, enc: &mut Encoder<'_>) -> Result<()> { enc.put_f64(*self) }

    fn kind(&self) -> Kind { Kind::Float }

    fn is_zero(&self) -> bool { *self == 0.0 }

    fn encode_slice(items: &[f64], enc: &mut Encoder<'_>) -> Result<()> {
        enc.put_fixed_width(items, 9, |enc, f| enc.put_f64(*f))
    }
}

macro_rules! float_decode {
    ($($t:ty),*) => {
        $(
            impl Decode for $t {
                fn decode_into(&mut self, dec: &mut Decoder<'_, '_>) -> Result<()> {
                    *self = dec.read_number(Kind::Float)?.cast(Kind::Float)?;
                    Ok(())
                }

                fn kind(&self) -> Kind { Kind::Float }
            }
        )*
    };
}

float_decode!(f32, f64);

impl Encode for str {
    fn encode(&self, enc: &mut Encoder<'_>) -> Result<()> { enc.put_str(self) }

    fn kind(&self) -> Kind { Kind::Str }

    fn is_zero(&self) -> bool { self.is_empty() }
}

impl Encode for String {
    fn encode(&self, enc: &mut Encoder<'_>) -> Result<()> { enc.put_str(self) }

    fn kind(&self) -> Kind { Kind::Str }

    fn is_zero(&self) -> bool { self.is_empty() }
}

impl Decode for String {
    fn decode_into(&mut self, dec: &mut Decoder<'_, '_>) -> Result<()> {
        let s = dec.read_str()?;
        self.clear();
        self.push_str(s);
        Ok(())
    }

    fn kind(&self) -> Kind { Kind::Str }
}

impl Encode for Bytes {
    fn encode(&self, enc: &mut Encoder<'_>) -> Result<()> { enc.put_bin(self) }

    fn kind(&self) -> Kind { Kind::Bin }

    fn is_zero(&self) -> bool { self.is_empty() }
}

impl Decode for Bytes {
    fn decode_into(&mut self, dec: &mut Decoder<'_, '_>) -> Result<()> {
        *self = match dec.read_raw(Kind::Bin)? {
            Some(raw) => Bytes::copy_from_slice(raw),
            None => Bytes::new(),
        };
        Ok(())
    }

    fn kind(&self) -> Kind { Kind::Bin }
}

impl<T: Encode> Encode for [T] {
    fn encode(&self, enc: &mut Encoder<'_>) -> Result<()> { T::encode_slice(self, enc) }

    fn kind(&self) -> Kind { T::slice_kind() }

    fn is_zero(&self) -> bool { self.is_empty() }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode(&self, enc: &mut Encoder<'_>) -> Result<()> { T::encode_slice(self, enc) }

    fn kind(&self) -> Kind { T::slice_kind() }

    fn is_zero(&self) -> bool { self.is_empty() }
}

impl<T: Decode + Default> Decode for Vec<T> {
    fn decode_into(&mut self, dec: &mut Decoder<'_, '_>) -> Result<()> { T::decode_vec(self, dec) }

    fn kind(&self) -> Kind { Kind::Array }
}

impl<T: Encode, const N: usize> Encode for [T; N] {
    fn encode(&self, enc: &mut Encoder<'_>) -> Result<()> { T::encode_slice(self, enc) }

    fn kind(&self) -> Kind { T::slice_kind() }

    fn is_zero(&self) -> bool { N == 0 }
}

impl<T: Decode + Default, const N: usize> Decode for [T; N] {
    fn decode_into(&mut self, dec: &mut Decoder<'_, '_>) -> Result<()> {
        if dec.try_nil()? {
            self.iter_mut().for_each(|slot| *slot = T::default());
            return Ok(());
        }
        let mut items = Vec::with_capacity(N);
        T::decode_vec(&mut items, dec)?;
        if items.len() != N {
            return Err(Error::receiver(format!(
                "{} elements cannot fill an array of {}",
                items.len(),
                N
            )));
        }
        for (slot, item) in self.iter_mut().zip(items) {
            *slot = item;
        }
        Ok(())
    }

    fn kind(&self) -> Kind { Kind::Array }
}

macro_rules! tuple_rep {
    ($len:expr => $($name:ident : $idx:tt),+) => {
        impl<$($name: Encode),+> Encode for ($($name,)+) {
            fn encode(&self, enc: &mut Encoder<'_>) -> Result<()> {
                enc.put_array_len($len)?;
                $(self.$idx.encode(enc)?;)+
                Ok(())
            }

            fn kind(&self) -> Kind { Kind::Array }
        }

        impl<$($name: Decode),+> Decode for ($($name,)+) {
            fn decode_into(&mut self, dec: &mut Decoder<'_, '_>) -> Result<()> {
                match dec.read_array_len(Kind::Array)? {
                    None => return Ok(()),
                    Some(len) if len != $len => {
                        return Err(Error::receiver(format!(
                            "{} elements cannot fill a tuple of {}",
                            len, $len
                        )))
                    }
                    Some(_) => {}
                }
                dec.nested(|dec| {
                    $(self.$idx.decode_into(dec)?;)+
                    Ok(())
                })
            }

            fn kind(&self) -> Kind { Kind::Array }
        }
    };
}

tuple_rep!(1 => A: 0);
tuple_rep!(2 => A: 0, B: 1);
tuple_rep!(3 => A: 0, B: 1, C: 2);
tuple_rep!(4 => A: 0, B: 1, C: 2, D: 3);
tuple_rep!(5 => A: 0, B: 1, C: 2, D: 3, E: 4);
tuple_rep!(6 => A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);

impl<T: Encode> Encode for Option<T> {
    fn encode(&self, enc: &mut Encoder<'_>) -> Result<()> {
        match self {
            Some(t) => t.encode(enc),
            None => enc.put_nil(),
        }
    }

    fn kind(&self) -> Kind { self.as_ref().map_or(Kind::Nil, Encode::kind) }

    fn wire_kind(&self, enc: &Encoder<'_>) -> Kind { self.as_ref().map_or(Kind::Nil, |t| t.wire_kind(enc)) }

    fn is_zero(&self) -> bool { self.is_none() }
}

impl<T: Decode + Default> Decode for Option<T> {
    fn decode_into(&mut self, dec: &mut Decoder<'_, '_>) -> Result<()> {
        if dec.try_nil()? {
            *self = None;
            return Ok(());
        }
        self.get_or_insert_with(T::default).decode_into(dec)
    }

    fn kind(&self) -> Kind { self.as_ref().map_or(Kind::Nil, Decode::kind) }
}

impl<T: Encode + ?Sized> Encode for Box<T> {
    fn encode(&self, enc: &mut Encoder<'_>) -> Result<()> { (**self).encode(enc) }

    fn kind(&self) -> Kind { (**self).kind() }

    fn wire_kind(&self, enc: &Encoder<'_>) -> Kind { (**self).wire_kind(enc) }

    fn is_zero(&self) -> bool { (**self).is_zero() }
}

impl<T: Decode + ?Sized> Decode for Box<T> {
    fn decode_into(&mut self, dec: &mut Decoder<'_, '_>) -> Result<()> { (**self).decode_into(dec) }

    fn kind(&self) -> Kind { (**self).kind() }
}

impl<T: Encode + ?Sized> Encode for &T {
    fn encode(&self, enc: &mut Encoder<'_>) -> Result<()> { (**self).encode(enc) }

    fn kind(&self) -> Kind { (**self).kind() }

    fn wire_kind(&self, enc: &Encoder<'_>) -> Kind { (**self).wire_kind(enc) }

    fn is_zero(&self) -> bool { (**self).is_zero() }
}

impl<K: Encode, V: Encode, S> Encode for HashMap<K, V, S> {
    fn encode(&self, enc: &mut Encoder<'_>) -> Result<()> {
        enc.put_map_len(self.len())?;
        for (k, v) in self {
            enc.put_key(k)?;
            v.encode(enc)?;
        }
        Ok(())
    }

    fn kind(&self) -> Kind { Kind::Map }

    fn is_zero(&self) -> bool { self.is_empty() }
}

impl<K, V, S> Decode for HashMap<K, V, S>
where
    K: Decode + Default + Eq + Hash,
    V: Decode + Default,
    S: BuildHasher,
{
    fn decode_into(&mut self, dec: &mut Decoder<'_, '_>) -> Result<()> {
        self.clear();
        let len = match dec.read_map_len(Kind::Map)? {
            Some(len) => len,
            None => return Ok(()),
        };
        self.reserve(len.min(dec.remaining()));
        dec.nested(|dec| {
            for _ in 0..len {
                let (k, v) = decode_entry(dec)?;
                self.insert(k, v);
            }
            Ok(())
        })
    }

    fn kind(&self) -> Kind { Kind::Map }
}

impl<K: Encode, V: Encode> Encode for BTreeMap<K, V> {
    fn encode(&self, enc: &mut Encoder<'_>) -> Result<()> {
        enc.put_map_len(self.len())?;
        for (k, v) in self {
            enc.put_key(k)?;
            v.encode(enc)?;
        }
        Ok(())
    }

    fn kind(&self) -> Kind { Kind::Map }

    fn is_zero(&self) -> bool { self.is_empty() }
}

impl<K, V> Decode for BTreeMap<K, V>
where
    K: Decode + Default + Ord,
    V: Decode + Default,
{
    fn decode_into(&mut self, dec: &mut Decoder<'_, '_>) -> Result<()> {
        self.clear();
        let len = match dec.read_map_len(Kind::Map)? {
            Some(len) => len,
            None => return Ok(()),
        };
        dec.nested(|dec| {
            for _ in 0..len {
                let (k, v) = decode_entry(dec)?;
                self.insert(k, v);
            }
            Ok(())
        })
    }

    fn kind(&self) -> Kind { Kind::Map }
}

fn decode_entry<K, V>(dec: &mut Decoder<'_, '_>) -> Result<(K, V)>
where
    K: Decode + Default,
    V: Decode + Default,
{
    dec.check_key()?;
    let mut k = K::default();
    k.decode_into(dec)?;
    let mut v = V::default();
    v.decode_into(dec)?;
    Ok((k, v))
}
