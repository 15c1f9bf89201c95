use super::{constants::*, Kind, Mode};
use crate::{
    codec::Codec,
    errors::{Error, Result},
    extension::Bindings,
    layout::RecordLayout,
    record::{Record, RecordFields},
};
use std::{
    any::{Any, TypeId},
    sync::Arc,
};

/// Where encoded bytes go.
///
/// Both passes run the exact same traversal; only the sink differs. The size pass
/// counts, the write pass fills a buffer allocated with the counted capacity.
#[derive(Debug)]
enum Sink {
    Sizing(usize),
    Writing { buf: Vec<u8>, predicted: usize },
}

/// One pass of an encode operation.
///
/// [`Encode`] implementations call the `put_*` methods; the encoder decides whether
/// that means counting or writing.
pub struct Encoder<'c> {
    codec: &'c Codec,
    extensions: Arc<Bindings>,
    mode: Mode,
    sink: Sink,
}

impl<'c> Encoder<'c> {
    pub(crate) fn sizing(codec: &'c Codec, extensions: Arc<Bindings>, mode: Mode) -> Self {
        Encoder {
            codec,
            extensions,
            mode,
            sink: Sink::Sizing(0),
        }
    }

    pub(crate) fn writing(
        codec: &'c Codec,
        extensions: Arc<Bindings>,
        mode: Mode,
        predicted: usize,
    ) -> Self {
        Encoder {
            codec,
            extensions,
            mode,
            sink: Sink::Writing {
                buf: Vec::with_capacity(predicted),
                predicted,
            },
        }
    }

    /// Record layout mode for this operation.
    pub fn mode(&self) -> Mode { self.mode }

    /// Whether this is the counting pass.
    pub fn is_sizing(&self) -> bool { matches!(self.sink, Sink::Sizing(_)) }

    /// Bytes counted or written so far.
    pub fn position(&self) -> usize {
        match &self.sink {
            Sink::Sizing(len) => *len,
            Sink::Writing { buf, .. } => buf.len(),
        }
    }

    pub(crate) fn into_len(self) -> usize { self.position() }

    /// Finishes the write pass, checking it produced exactly the predicted length.
    pub(crate) fn into_bytes(self) -> Result<Vec<u8>> {
        match self.sink {
            Sink::Writing { buf, predicted } if buf.len() == predicted => Ok(buf),
            Sink::Writing { buf, predicted } => Err(Error::SizeMismatch {
                predicted,
                written: buf.len(),
            }),
            Sink::Sizing(len) => Err(Error::SizeMismatch {
                predicted: len,
                written: 0,
            }),
        }
    }

    /// Adds a byte to the output.
    #[inline]
    pub fn put_u8(&mut self, u: u8) -> Result<()> { self.put_slice(&[u]) }

    /// Adds a slice to the output.
    #[inline]
    pub fn put_slice(&mut self, slice: &[u8]) -> Result<()> {
        match &mut self.sink {
            Sink::Sizing(len) => {
                *len += slice.len();
                Ok(())
            }
            Sink::Writing { buf, predicted } => {
                if buf.len() + slice.len() > *predicted {
                    return Err(Error::SizeMismatch {
                        predicted: *predicted,
                        written: buf.len() + slice.len(),
                    });
                }
                buf.extend_from_slice(slice);
                Ok(())
            }
        }
    }

    /// Counts `n` bytes without producing them. Only valid in the size pass.
    #[inline]
    fn skip_counted(&mut self, n: usize) {
        if let Sink::Sizing(len) = &mut self.sink {
            *len += n;
        }
    }

    #[inline]
    fn put_tagged(&mut self, tag: u8, body: &[u8]) -> Result<()> {
        self.put_u8(tag)?;
        self.put_slice(body)
    }

    /// Adds nil.
    pub fn put_nil(&mut self) -> Result<()> { self.put_u8(NIL) }

    /// Adds a bool.
    pub fn put_bool(&mut self, b: bool) -> Result<()> { self.put_u8(if b { TRUE } else { FALSE }) }

    /// Adds an unsigned integer in the smallest format that holds it.
    pub fn put_uint(&mut self, u: u64) -> Result<()> {
        if u <= POSITIVE_FIXINT_MAX as u64 {
            self.put_u8(u as u8)
        } else if u <= u8::MAX as u64 {
            self.put_tagged(UINT8, &[u as u8])
        } else if u <= u16::MAX as u64 {
            self.put_tagged(UINT16, &(u as u16).to_be_bytes())
        } else if u <= u32::MAX as u64 {
            self.put_tagged(UINT32, &(u as u32).to_be_bytes())
        } else {
            self.put_tagged(UINT64, &u.to_be_bytes())
        }
    }

    /// Adds a signed integer in the smallest format that holds it.
    ///
    /// Non-negative values use the unsigned formats.
    pub fn put_int(&mut self, i: i64) -> Result<()> {
        if i >= 0 {
            self.put_uint(i as u64)
        } else if i >= -32 {
            // two's complement low bits are the negative fixint
            self.put_u8(i as u8)
        } else if i >= i8::MIN as i64 {
            self.put_tagged(INT8, &[i as i8 as u8])
        } else if i >= i16::MIN as i64 {
            self.put_tagged(INT16, &(i as i16).to_be_bytes())
        } else if i >= i32::MIN as i64 {
            self.put_tagged(INT32, &(i as i32).to_be_bytes())
        } else {
            self.put_tagged(INT64, &i.to_be_bytes())
        }
    }

    /// Adds an [`f32`].
    pub fn put_f32(&mut self, f: f32) -> Result<()> {
        self.put_tagged(FLOAT32, &f.to_bits().to_be_bytes())
    }

    /// Adds an [`f64`].
    pub fn put_f64(&mut self, f: f64) -> Result<()> {
        self.put_tagged(FLOAT64, &f.to_bits().to_be_bytes())
    }

    /// Adds a string header for `len` bytes of UTF-8.
    pub fn put_str_header(&mut self, len: usize) -> Result<()> {
        if len < FIXSTR_LIMIT {
            self.put_u8(FIXSTR | len as u8)
        } else if len <= u8::MAX as usize {
            self.put_tagged(STR8, &[len as u8])
        } else if len <= u16::MAX as usize {
            self.put_tagged(STR16, &(len as u16).to_be_bytes())
        } else if len <= MAX_LEN {
            self.put_tagged(STR32, &(len as u32).to_be_bytes())
        } else {
            Err(Error::unsupported(format!("string of {} bytes", len)))
        }
    }

    /// Adds a string.
    pub fn put_str(&mut self, s: &str) -> Result<()> {
        self.put_str_header(s.len())?;
        self.put_slice(s.as_bytes())
    }

    /// Adds a byte sequence. Always a bin format, there is no fix variant.
    pub fn put_bin(&mut self, b: &[u8]) -> Result<()> {
        let len = b.len();
        if len <= u8::MAX as usize {
            self.put_tagged(BIN8, &[len as u8])?;
        } else if len <= u16::MAX as usize {
            self.put_tagged(BIN16, &(len as u16).to_be_bytes())?;
        } else if len <= MAX_LEN {
            self.put_tagged(BIN32, &(len as u32).to_be_bytes())?;
        } else {
            return Err(Error::unsupported(format!("byte sequence of {} bytes", len)));
        }
        self.put_slice(b)
    }

    /// Adds an array header; the caller then encodes `len` elements.
    pub fn put_array_len(&mut self, len: usize) -> Result<()> {
        if len <= FIXCOL_MAX {
            self.put_u8(FIXARRAY | len as u8)
        } else if len <= u16::MAX as usize {
            self.put_tagged(ARRAY16, &(len as u16).to_be_bytes())
        } else if len <= MAX_LEN {
            self.put_tagged(ARRAY32, &(len as u32).to_be_bytes())
        } else {
            Err(Error::unsupported(format!("array of {} elements", len)))
        }
    }

    /// Adds a map header; the caller then encodes `len` key/value pairs.
    pub fn put_map_len(&mut self, len: usize) -> Result<()> {
        if len <= FIXCOL_MAX {
            self.put_u8(FIXMAP | len as u8)
        } else if len <= u16::MAX as usize {
            self.put_tagged(MAP16, &(len as u16).to_be_bytes())
        } else if len <= MAX_LEN {
            self.put_tagged(MAP32, &(len as u32).to_be_bytes())
        } else {
            Err(Error::unsupported(format!("map of {} entries", len)))
        }
    }

    /// Adds an extension header for a `len`-byte payload, including the type tag.
    pub fn put_ext_header(&mut self, type_tag: i8, len: usize) -> Result<()> {
        if let Some(fixext) = fixext_for(len) {
            self.put_u8(fixext)?;
        } else if len <= u8::MAX as usize {
            self.put_tagged(EXT8, &[len as u8])?;
        } else if len <= u16::MAX as usize {
            self.put_tagged(EXT16, &(len as u16).to_be_bytes())?;
        } else if len <= MAX_LEN {
            self.put_tagged(EXT32, &(len as u32).to_be_bytes())?;
        } else {
            return Err(Error::unsupported(format!(
                "extension payload of {} bytes",
                len
            )));
        }
        self.put_u8(type_tag as u8)
    }

    /// Adds a complete extension value.
    pub fn put_ext(&mut self, type_tag: i8, payload: &[u8]) -> Result<()> {
        self.put_ext_header(type_tag, payload.len())?;
        self.put_slice(payload)
    }

    /// Encodes a mapping key, rejecting keys that would be arrays or maps.
    pub fn put_key<K: Encode + ?Sized>(&mut self, key: &K) -> Result<()> {
        let kind = key.wire_kind(self);
        if kind.is_container() {
            return Err(Error::unsupported(format!("mapping key of kind {}", kind)));
        }
        key.encode(self)
    }

    /// Whether an extension binding claims `T` for this operation.
    pub fn has_extension<T: Any>(&self) -> bool { self.extensions.for_type(TypeId::of::<T>()).is_some() }

    /// Encodes `value` through the extension registered for its type.
    ///
    /// Host types that have no native wire form implement [`Encode`] by calling this.
    pub fn encode_extension<T: Any>(&mut self, value: &T) -> Result<()> {
        match self.extensions.for_type(TypeId::of::<T>()) {
            Some(binding) => binding.encode(value, self),
            None => Err(Error::unsupported(format!(
                "no extension is registered for {}",
                std::any::type_name::<T>()
            ))),
        }
    }

    /// Encodes a record as an array or a map according to [`Encoder::mode`].
    ///
    /// A record type claimed by a registered extension is encoded by that extension
    /// instead.
    pub fn encode_record<R: Record>(&mut self, record: &R) -> Result<()> {
        if let Some(binding) = self.extensions.for_type(TypeId::of::<R>()) {
            return binding.encode(record, self);
        }

        let layout = self.codec.layouts().layout::<R>(self.mode);
        match self.mode {
            Mode::Array => self.encode_record_array(&layout, record),
            Mode::Map => self.encode_record_map(&layout, record),
        }
    }

    fn encode_record_array(&mut self, layout: &RecordLayout, record: &dyn RecordFields) -> Result<()> {
        self.put_array_len(layout.len())?;
        for field in layout.fields() {
            match field.lookup(record) {
                Some(value) => value.encode(self)?,
                // an absent embedded record still holds its positions
                None => self.put_nil()?,
            }
        }
        Ok(())
    }

    fn encode_record_map(&mut self, layout: &RecordLayout, record: &dyn RecordFields) -> Result<()> {
        if layout.never_omits() {
            self.put_map_len(layout.len())?;
            for field in layout.fields() {
                let value = field
                    .lookup(record)
                    .ok_or_else(|| Error::receiver(format!("field `{}` is not accessible", field.name())))?;
                self.put_str(field.name())?;
                value.encode(self)?;
            }
            return Ok(());
        }

        let count = layout
            .fields()
            .iter()
            .filter(|f| f.present(record).is_some())
            .count();
        self.put_map_len(count)?;
        for field in layout.fields() {
            if let Some(value) = field.present(record) {
                self.put_str(field.name())?;
                value.encode(self)?;
            }
        }
        Ok(())
    }

    /// Fast path for slices of fixed-width elements: the size pass counts them all at
    /// once, the write pass still encodes each one.
    pub(crate) fn put_fixed_width<T, F>(&mut self, items: &[T], width: usize, mut put: F) -> Result<()>
    where
        F: FnMut(&mut Self, &T) -> Result<()>,
    {
        self.put_array_len(items.len())?;
        if self.is_sizing() {
            self.skip_counted(items.len() * width);
            return Ok(());
        }
        for item in items {
            put(self, item)?;
        }
        Ok(())
    }
}

/// A value that can be encoded.
///
/// The same `encode` call serves both encoder passes, so an implementation must make
/// the same `put_*` calls in the same order every time it is called on an unchanged
/// value.
pub trait Encode {
    /// Writes `self` to the encoder.
    fn encode(&self, enc: &mut Encoder<'_>) -> Result<()>;

    /// The kind of wire value `self` encodes as.
    ///
    /// Mapping keys are checked against it, so an implementation that writes an
    /// array or a map must say so.
    fn kind(&self) -> Kind;

    /// The kind `self` encodes as under `enc`, which may differ from [`Encode::kind`]
    /// when an extension binding takes over the type.
    fn wire_kind(&self, _enc: &Encoder<'_>) -> Kind { self.kind() }

    /// Whether `self` is its type's zero value, for fields tagged `omitempty`.
    fn is_zero(&self) -> bool { false }

    /// The kind a slice of `Self` encodes as.
    fn slice_kind() -> Kind
    where
        Self: Sized,
    {
        Kind::Array
    }

    /// Encodes a slice of `Self` as a sequence.
    ///
    /// Element types with a better representation override this, `u8` slices become
    /// bin values for example.
    fn encode_slice(items: &[Self], enc: &mut Encoder<'_>) -> Result<()>
    where
        Self: Sized,
    {
        enc.put_array_len(items.len())?;
        for item in items {
            item.encode(enc)?;
        }
        Ok(())
    }
}
