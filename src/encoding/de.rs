use super::{constants::*, Kind, Mode};
use crate::{
    codec::Codec,
    errors::{Error, Result},
    extension::Bindings,
    layout::{FieldDescriptor, RecordLayout},
    record::{Record, RecordFields},
};
use num_traits::NumCast;
use std::{
    any::{Any, TypeId},
    fmt::Display,
    sync::Arc,
};

/// A number read from any integer, float or nil header.
///
/// The header decides the representation; the destination only decides whether the
/// number fits.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Number {
    Int(i64),
    Uint(u64),
    Float(f64),
}

impl Number {
    /// Converts into `T`, truncating floats toward zero and rejecting values that do
    /// not fit.
    pub fn cast<T: NumCast>(self, kind: Kind) -> Result<T> {
        let cast = match self {
            Number::Int(i) => T::from(i),
            Number::Uint(u) => T::from(u),
            Number::Float(f) => T::from(f),
        };
        cast.ok_or_else(|| out_of_range(self, kind))
    }
}

impl Display for Number {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{}", i),
            Number::Uint(u) => write!(f, "{}", u),
            Number::Float(x) => write!(f, "{}", x),
        }
    }
}

fn out_of_range(n: Number, kind: Kind) -> Error {
    Error::OutOfRange {
        value: n.to_string(),
        kind,
    }
}

/// Deepest nesting of arrays, maps and records a decode will follow.
pub const MAX_DEPTH: usize = 256;

/// Reads one wire value at a time from an in-memory buffer.
pub struct Decoder<'c, 'b> {
    codec: &'c Codec,
    extensions: Arc<Bindings>,
    mode: Mode,
    input: &'b [u8],
    pos: usize,
    depth: usize,
}

impl<'c, 'b> Decoder<'c, 'b> {
    pub(crate) fn new(codec: &'c Codec, input: &'b [u8], mode: Mode) -> Self {
        Decoder {
            codec,
            extensions: codec.extensions().snapshot(),
            mode,
            input,
            pos: 0,
            depth: 0,
        }
    }

    /// Record layout mode for this operation.
    pub fn mode(&self) -> Mode { self.mode }

    /// Offset of the next unread byte.
    pub fn position(&self) -> usize { self.pos }

    /// Unread byte count.
    pub fn remaining(&self) -> usize { self.input.len() - self.pos }

    /// Runs `f` one container level deeper.
    ///
    /// Every decode that descends into an array, map or record goes through here, so
    /// hostile nesting fails with [`Error::TooDeep`] instead of exhausting the stack.
    pub fn nested<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        if self.depth >= MAX_DEPTH {
            return Err(Error::TooDeep { limit: MAX_DEPTH });
        }
        self.depth += 1;
        let out = f(self);
        self.depth -= 1;
        out
    }

    /// Fails if any input is left unread.
    pub(crate) fn finish(&self) -> Result<()> {
        match self.remaining() {
            0 => Ok(()),
            remaining => Err(Error::TrailingBytes { remaining }),
        }
    }

    #[inline]
    fn peek_byte(&self) -> Result<u8> {
        match self.input.get(self.pos) {
            Some(b) => Ok(*b),
            None => Err(Error::Truncated {
                needed: 1,
                remaining: 0,
            }),
        }
    }

    #[inline]
    fn take_byte(&mut self) -> Result<u8> {
        let byte = self.peek_byte()?;
        self.pos += 1;
        Ok(byte)
    }

    /// Takes `len` raw bytes; never pads a short input.
    #[inline]
    pub fn read_many(&mut self, len: usize) -> Result<&'b [u8]> {
        let remaining = self.remaining();
        if len > remaining {
            return Err(Error::Truncated {
                needed: len,
                remaining,
            });
        }
        let out = &self.input[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    #[inline]
    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_many(N)?);
        Ok(out)
    }

    fn read_uint_body(&mut self, width: Width) -> Result<u64> {
        Ok(match width {
            Width::W8 => self.take_byte()? as u64,
            Width::W16 => u16::from_be_bytes(self.read_array()?) as u64,
            Width::W32 => u32::from_be_bytes(self.read_array()?) as u64,
            Width::W64 => u64::from_be_bytes(self.read_array()?),
        })
    }

    fn read_int_body(&mut self, width: Width) -> Result<i64> {
        Ok(match width {
            Width::W8 => self.take_byte()? as i8 as i64,
            Width::W16 => i16::from_be_bytes(self.read_array()?) as i64,
            Width::W32 => i32::from_be_bytes(self.read_array()?) as i64,
            Width::W64 => i64::from_be_bytes(self.read_array()?),
        })
    }

    /// Reads a big-endian length of the given width.
    fn read_len(&mut self, width: Width) -> Result<usize> { Ok(self.read_uint_body(width)? as usize) }

    /// Looks at the next header without consuming it.
    pub fn peek_tag(&self) -> Result<(u8, Tag)> {
        let byte = self.peek_byte()?;
        Ok((byte, Tag::classify(byte)))
    }

    /// Consumes the next header byte.
    pub fn next_tag(&mut self) -> Result<(u8, Tag)> {
        let byte = self.take_byte()?;
        Ok((byte, Tag::classify(byte)))
    }

    /// Consumes a nil if one is next.
    pub fn try_nil(&mut self) -> Result<bool> {
        if self.peek_byte()? == NIL {
            self.pos += 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Reads a bool. Nil reads as `false`.
    pub fn read_bool(&mut self) -> Result<bool> {
        match self.next_tag()? {
            (_, Tag::Bool(b)) => Ok(b),
            (_, Tag::Nil) => Ok(false),
            (byte, _) => Err(Error::Format {
                byte,
                kind: Kind::Bool,
            }),
        }
    }

    /// Reads any integer or float header. Nil reads as zero.
    pub fn read_number(&mut self, kind: Kind) -> Result<Number> {
        Ok(match self.next_tag()? {
            (_, Tag::PosFixInt(u)) => Number::Uint(u as u64),
            (_, Tag::NegFixInt(i)) => Number::Int(i as i64),
            (_, Tag::Uint(w)) => Number::Uint(self.read_uint_body(w)?),
            (_, Tag::Int(w)) => Number::Int(self.read_int_body(w)?),
            (_, Tag::Float32) => Number::Float(f32::from_bits(u32::from_be_bytes(self.read_array()?)) as f64),
            (_, Tag::Float64) => Number::Float(f64::from_bits(u64::from_be_bytes(self.read_array()?))),
            (_, Tag::Nil) => Number::Uint(0),
            (byte, _) => return Err(Error::Format { byte, kind }),
        })
    }

    /// Reads a string or bin payload without copying it.
    ///
    /// Returns `None` for nil.
    pub fn read_raw(&mut self, kind: Kind) -> Result<Option<&'b [u8]>> {
        let len = match self.next_tag()? {
            (_, Tag::Nil) => return Ok(None),
            (_, Tag::FixStr(len)) => len as usize,
            (_, Tag::Str(w)) | (_, Tag::Bin(w)) => self.read_len(w)?,
            (byte, _) => return Err(Error::Format { byte, kind }),
        };
        self.read_many(len).map(Some)
    }

    /// Reads a string payload, checking it is UTF-8. Nil reads as the empty string.
    pub fn read_str(&mut self) -> Result<&'b str> {
        let offset = self.pos;
        match self.read_raw(Kind::Str)? {
            None => Ok(""),
            Some(raw) => std::str::from_utf8(raw).map_err(|_| Error::InvalidUtf8 { offset }),
        }
    }

    /// Reads an array header. Returns `None` for nil.
    pub fn read_array_len(&mut self, kind: Kind) -> Result<Option<usize>> {
        match self.next_tag()? {
            (_, Tag::Nil) => Ok(None),
            (_, Tag::FixArray(len)) => Ok(Some(len as usize)),
            (_, Tag::Array(w)) => self.read_len(w).map(Some),
            (byte, _) => Err(Error::Format { byte, kind }),
        }
    }

    /// Reads a map header. Returns `None` for nil.
    pub fn read_map_len(&mut self, kind: Kind) -> Result<Option<usize>> {
        match self.next_tag()? {
            (_, Tag::Nil) => Ok(None),
            (_, Tag::FixMap(len)) => Ok(Some(len as usize)),
            (_, Tag::Map(w)) => self.read_len(w).map(Some),
            (byte, _) => Err(Error::Format { byte, kind }),
        }
    }

    /// Fails with [`Error::StructuralKey`] if the next value is an array or a map.
    ///
    /// Called before each mapping key, so the paired value is never read.
    pub fn check_key(&self) -> Result<()> {
        let (byte, tag) = self.peek_tag()?;
        if tag.is_container() {
            Err(Error::StructuralKey { byte })
        } else {
            Ok(())
        }
    }

    /// Reads an extension header and its payload, after the header byte was consumed.
    fn read_ext_body(&mut self, byte: u8, tag: Tag, kind: Kind) -> Result<(i8, &'b [u8])> {
        let len = match tag {
            Tag::FixExt(len) => len as usize,
            Tag::Ext(w) => self.read_len(w)?,
            _ => return Err(Error::Format { byte, kind }),
        };
        let type_tag = self.take_byte()? as i8;
        Ok((type_tag, self.read_many(len)?))
    }

    /// Reads an extension value. Returns `None` for nil.
    pub fn read_ext(&mut self, kind: Kind) -> Result<Option<(i8, &'b [u8])>> {
        match self.next_tag()? {
            (_, Tag::Nil) => Ok(None),
            (byte, tag) => self.read_ext_body(byte, tag, kind).map(Some),
        }
    }

    /// Decodes an extension value into `dest` through the binding that claims its
    /// type tag.
    ///
    /// Host types without a native wire form implement [`Decode`] by calling this.
    /// Nil leaves `dest` unchanged.
    pub fn decode_extension<T: Any>(&mut self, dest: &mut T) -> Result<()> {
        let (type_tag, payload) = match self.read_ext(Kind::Ext)? {
            Some(ext) => ext,
            None => return Ok(()),
        };
        match self.extensions.for_tag(type_tag) {
            Some(binding) => binding.decode_into(payload, dest),
            None => Err(Error::UnregisteredExtension { type_tag }),
        }
    }

    /// Decodes an extension payload into a dynamic value.
    ///
    /// Tags no binding claims are returned raw.
    pub(crate) fn decode_extension_value(&mut self, byte: u8, tag: Tag) -> Result<crate::value::Value> {
        let (type_tag, payload) = self.read_ext_body(byte, tag, Kind::Dynamic)?;
        match self.extensions.for_tag(type_tag) {
            Some(binding) => binding.decode_value(payload),
            None => Ok(crate::value::Value::Ext(type_tag, bytes::Bytes::copy_from_slice(payload))),
        }
    }

    /// Decodes a record laid out according to [`Decoder::mode`].
    ///
    /// A record type claimed by a registered extension is decoded by that extension
    /// instead. Nil leaves the record unchanged.
    pub fn decode_record<R: Record>(&mut self, record: &mut R) -> Result<()> {
        if self.extensions.for_type(TypeId::of::<R>()).is_some() {
            return self.decode_extension(record);
        }

        let layout = self.codec.layouts().layout::<R>(self.mode);
        self.nested(|dec| match dec.mode {
            Mode::Array => dec.decode_record_array(&layout, record),
            Mode::Map => dec.decode_record_map(&layout, record),
        })
    }

    /// Decodes one resolved field of `record`.
    ///
    /// A nil aimed at a field of an absent embedded record is consumed without
    /// allocating that record.
    fn decode_field(&mut self, field: &FieldDescriptor, record: &mut dyn RecordFields) -> Result<()> {
        if field.path().len() > 1 && field.lookup(&*record).is_none() && self.try_nil()? {
            return Ok(());
        }
        field.lookup_mut(record)?.decode_into(self)
    }

    fn decode_record_array(&mut self, layout: &RecordLayout, record: &mut dyn RecordFields) -> Result<()> {
        let len = match self.read_array_len(Kind::Record)? {
            Some(len) => len,
            None => return Ok(()),
        };
        for i in 0..len {
            match layout.fields().get(i) {
                Some(field) => self.decode_field(field, record)?,
                None => {
                    tracing::trace!(record = layout.type_name(), slot = i, "skipping excess array slot");
                    self.skip_value()?;
                }
            }
        }
        Ok(())
    }

    fn decode_record_map(&mut self, layout: &RecordLayout, record: &mut dyn RecordFields) -> Result<()> {
        let len = match self.read_map_len(Kind::Record)? {
            Some(len) => len,
            None => return Ok(()),
        };
        for _ in 0..len {
            self.check_key()?;
            let position = if self.peek_tag()?.1.is_str() {
                let key = self.read_str()?;
                layout.position(key)
            } else {
                self.skip_value()?;
                None
            };
            match position {
                Some(i) => self.decode_field(&layout.fields()[i], record)?,
                None => {
                    tracing::trace!(record = layout.type_name(), "skipping unknown field");
                    self.skip_value()?;
                }
            }
        }
        Ok(())
    }

    /// Consumes one complete wire value without materializing it.
    ///
    /// Walks each value's own length rules. Iterative, so nesting depth is bounded by
    /// memory rather than the stack.
    pub fn skip_value(&mut self) -> Result<()> {
        let mut pending: usize = 1;
        while pending > 0 {
            pending -= 1;
            let (byte, tag) = self.next_tag()?;
            let body = match tag {
                Tag::Nil | Tag::Bool(_) | Tag::PosFixInt(_) | Tag::NegFixInt(_) => 0,
                Tag::Uint(w) | Tag::Int(w) => w.bytes(),
                Tag::Float32 => 4,
                Tag::Float64 => 8,
                Tag::FixStr(len) => len as usize,
                Tag::Str(w) | Tag::Bin(w) => self.read_len(w)?,
                Tag::FixArray(len) => {
                    pending += len as usize;
                    0
                }
                Tag::Array(w) => {
                    pending = pending.saturating_add(self.read_len(w)?);
                    0
                }
                Tag::FixMap(len) => {
                    pending += 2 * len as usize;
                    0
                }
                Tag::Map(w) => {
                    pending = pending.saturating_add(self.read_len(w)?.saturating_mul(2));
                    0
                }
                // type tag byte plus payload
                Tag::FixExt(len) => 1 + len as usize,
                Tag::Ext(w) => 1 + self.read_len(w)?,
                Tag::Unused => {
                    return Err(Error::Format {
                        byte,
                        kind: Kind::Dynamic,
                    })
                }
            };
            self.read_many(body)?;
        }
        Ok(())
    }
}

/// A destination a wire value can be decoded into.
///
/// Decoding happens in place: `decode_into` overwrites `self` with the next value.
/// A record destination keeps any field the input does not mention.
pub trait Decode {
    /// Reads the next value into `self`.
    fn decode_into(&mut self, dec: &mut Decoder<'_, '_>) -> Result<()>;

    /// The kind of destination `self` is, for error messages.
    fn kind(&self) -> Kind;

    /// Decodes a sequence into `dest`, replacing its contents.
    ///
    /// Element types with a better representation override this, `u8` accepts bin and
    /// string payloads for example.
    fn decode_vec(dest: &mut Vec<Self>, dec: &mut Decoder<'_, '_>) -> Result<()>
    where
        Self: Sized + Default,
    {
        decode_seq(dest, dec)
    }
}

/// Decodes an array elementwise into `dest`, replacing its contents. Nil leaves it
/// empty.
pub(crate) fn decode_seq<T: Decode + Default>(dest: &mut Vec<T>, dec: &mut Decoder<'_, '_>) -> Result<()> {
    dest.clear();
    let len = match dec.read_array_len(Kind::Array)? {
        Some(len) => len,
        None => return Ok(()),
    };
    // never trust a length prefix for more than the input could hold
    dest.reserve(len.min(dec.remaining()));
    dec.nested(|dec| {
        for _ in 0..len {
            let mut item = T::default();
            item.decode_into(dec)?;
            dest.push(item);
        }
        Ok(())
    })
}
