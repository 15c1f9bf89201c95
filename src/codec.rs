use crate::{
    cache::LayoutCache,
    encoding::{Decode, Decoder, Encode, Encoder, Mode},
    errors::Result,
    extension::{ExtensionCodec, ExtensionRegistry},
    value::Value,
};
use std::sync::OnceLock;

/// The codec service: a layout cache and an extension registry.
///
/// Every encode and decode goes through a `Codec`. Independent instances share
/// nothing, which keeps tests and embedders isolated; the free functions in
/// [`crate::encoding`] use [`Codec::global`].
#[derive(Default)]
pub struct Codec {
    layouts: LayoutCache,
    extensions: ExtensionRegistry,
}

impl Codec {
    pub fn new() -> Self { Self::default() }

    /// The process-wide instance.
    pub fn global() -> &'static Codec {
        static GLOBAL: OnceLock<Codec> = OnceLock::new();
        GLOBAL.get_or_init(Codec::new)
    }

    pub fn layouts(&self) -> &LayoutCache { &self.layouts }

    pub fn extensions(&self) -> &ExtensionRegistry { &self.extensions }

    /// Encodes `value` into a buffer allocated once, at exactly the encoded size.
    ///
    /// # Arguments
    ///
    /// * `value` - The value to be encoded.
    /// * `mode` - How records are laid out.
    pub fn encode<T: Encode + ?Sized>(&self, value: &T, mode: Mode) -> Result<Vec<u8>> {
        let extensions = self.extensions.snapshot();

        let mut sizing = Encoder::sizing(self, extensions.clone(), mode);
        value.encode(&mut sizing)?;
        let predicted = sizing.into_len();

        let mut writing = Encoder::writing(self, extensions, mode, predicted);
        value.encode(&mut writing)?;
        writing.into_bytes()
    }

    /// The number of bytes [`Codec::encode`] would produce, without producing them.
    pub fn encoded_len<T: Encode + ?Sized>(&self, value: &T, mode: Mode) -> Result<usize> {
        let mut sizing = Encoder::sizing(self, self.extensions.snapshot(), mode);
        value.encode(&mut sizing)?;
        Ok(sizing.into_len())
    }

    /// Decodes a fresh `T`. The whole input must be consumed.
    pub fn decode<T: Decode + Default>(&self, bytes: &[u8], mode: Mode) -> Result<T> {
        let mut out = T::default();
        self.decode_into(bytes, &mut out, mode)?;
        Ok(out)
    }

    /// Decodes into an existing destination. The whole input must be consumed.
    ///
    /// Record fields the input does not mention keep their current values.
    pub fn decode_into<T: Decode + ?Sized>(&self, bytes: &[u8], dest: &mut T, mode: Mode) -> Result<()> {
        let mut dec = Decoder::new(self, bytes, mode);
        dest.decode_into(&mut dec)?;
        dec.finish()
    }

    /// Decodes any input into a [`Value`].
    pub fn decode_value(&self, bytes: &[u8]) -> Result<Value> { self.decode(bytes, Mode::default()) }

    /// Adds an extension binding; see [`ExtensionRegistry::register`].
    pub fn register_extension<C: ExtensionCodec>(&self, codec: C) -> bool { self.extensions.register(codec) }

    /// Removes an extension binding; see [`ExtensionRegistry::unregister`].
    pub fn unregister_extension<C: ExtensionCodec>(&self, codec: &C) -> bool { self.extensions.unregister(codec) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::*;

    #[derive(Record, Default, Debug, PartialEq)]
    struct Reading {
        pub sensor: String,
        pub values: Vec<f64>,
    }

    #[test]
    fn encode_allocates_exact_size() {
        let codec = Codec::new();
        let r = Reading {
            sensor: "t1".into(),
            values: vec![1.0, 2.5],
        };
        let bytes = codec.encode(&r, Mode::Map).unwrap();
        assert_eq!(bytes.len(), codec.encoded_len(&r, Mode::Map).unwrap());
        assert_eq!(bytes.capacity(), bytes.len());
        assert_eq!(codec.decode::<Reading>(&bytes, Mode::Map).unwrap(), r);
    }

    #[test]
    fn instances_are_isolated() {
        let a = Codec::new();
        let b = Codec::new();
        a.encode(&Reading::default(), Mode::Array).unwrap();
        assert_eq!(a.layouts().len(), 1);
        assert!(b.layouts().is_empty());
    }

    #[test]
    fn global_is_shared() {
        assert!(std::ptr::eq(Codec::global(), Codec::global()));
    }
}
