//! Extension types: host types encoded as a one-byte type tag plus an opaque payload.
//!
//! A binding pairs a type tag with a host type. Registration is all or nothing: a
//! binding whose tag or host type is already claimed is refused. The timestamp
//! binding for tag `-1` is always present and cannot be replaced or removed.
//!
//! # Example
//!
//! ```
//! use mpack::prelude::*;
//! use mpack::extension::ExtensionCodec;
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Rgb(u8, u8, u8);
//!
//! impl Encode for Rgb {
//!     fn encode(&self, enc: &mut Encoder<'_>) -> mpack::errors::Result<()> { enc.encode_extension(self) }
//!
//!     fn kind(&self) -> Kind { Kind::Ext }
//! }
//!
//! impl Decode for Rgb {
//!     fn decode_into(&mut self, dec: &mut Decoder<'_, '_>) -> mpack::errors::Result<()> { dec.decode_extension(self) }
//!
//!     fn kind(&self) -> Kind { Kind::Ext }
//! }
//!
//! struct RgbExt;
//!
//! impl ExtensionCodec for RgbExt {
//!     type Value = Rgb;
//!
//!     fn type_tag(&self) -> i8 { 7 }
//!
//!     fn encode(&self, value: &Rgb, enc: &mut Encoder<'_>) -> mpack::errors::Result<()> {
//!         enc.put_ext(7, &[value.0, value.1, value.2])
//!     }
//!
//!     fn decode(&self, payload: &[u8]) -> mpack::errors::Result<Rgb> {
//!         match payload {
//!             [r, g, b] => Ok(Rgb(*r, *g, *b)),
//!             _ => Err(mpack::errors::Error::extension(7, "expected 3 bytes")),
//!         }
//!     }
//! }
//!
//! let codec = Codec::new();
//! assert!(codec.register_extension(RgbExt));
//!
//! let bytes = codec.encode(&Rgb(1, 2, 3), Mode::Map).unwrap();
//! assert_eq!(bytes, vec![0xc7, 3, 7, 1, 2, 3]);
//! let back: Rgb = codec.decode(&bytes, Mode::Map).unwrap();
//! assert_eq!(back, Rgb(1, 2, 3));
//! ```

use crate::{
    encoding::{constants::TIMESTAMP_TYPE, Encoder},
    errors::{Error, Result},
    timestamp::{Timestamp, TimestampExt},
    value::Value,
};
use arc_swap::ArcSwap;
use std::{
    any::{Any, TypeId},
    collections::HashMap,
    marker::PhantomData,
    sync::Arc,
};

/// Encodes and decodes one host type as an extension.
pub trait ExtensionCodec: Send + Sync + 'static {
    /// The host type this extension claims.
    type Value: Any;

    /// The wire type tag. Negative tags are reserved by the format; `-1` is the
    /// timestamp and is never available.
    fn type_tag(&self) -> i8;

    /// Writes the complete extension value, header included.
    ///
    /// Called once per encoder pass, so it must make the same calls both times.
    /// [`Encoder::put_ext`] is usually all that is needed.
    fn encode(&self, value: &Self::Value, enc: &mut Encoder<'_>) -> Result<()>;

    /// Rebuilds a value from the payload, with the header and type tag stripped.
    fn decode(&self, payload: &[u8]) -> Result<Self::Value>;

    /// The dynamic form of a decoded value, when decoding into [`Value`].
    ///
    /// `None` keeps the raw [`Value::Ext`].
    fn to_dynamic(&self, _value: &Self::Value) -> Option<Value> { None }
}

/// A type-erased [`ExtensionCodec`].
pub(crate) trait Binding: Send + Sync {
    fn type_tag(&self) -> i8;

    fn host_type(&self) -> TypeId;

    fn encode(&self, value: &dyn Any, enc: &mut Encoder<'_>) -> Result<()>;

    fn decode_into(&self, payload: &[u8], dest: &mut dyn Any) -> Result<()>;

    fn decode_value(&self, payload: &[u8]) -> Result<Value>;
}

struct Erased<C: ExtensionCodec> {
    codec: C,
    // tie the binding to its host type without requiring it to be Send
    _host: PhantomData<fn() -> C::Value>,
}

impl<C: ExtensionCodec> Binding for Erased<C> {
    fn type_tag(&self) -> i8 { self.codec.type_tag() }

    fn host_type(&self) -> TypeId { TypeId::of::<C::Value>() }

    fn encode(&self, value: &dyn Any, enc: &mut Encoder<'_>) -> Result<()> {
        match value.downcast_ref::<C::Value>() {
            Some(value) => self.codec.encode(value, enc),
            None => Err(Error::unsupported(format!(
                "value is not a {}",
                std::any::type_name::<C::Value>()
            ))),
        }
    }

    fn decode_into(&self, payload: &[u8], dest: &mut dyn Any) -> Result<()> {
        match dest.downcast_mut::<C::Value>() {
            Some(dest) => {
                *dest = self.codec.decode(payload)?;
                Ok(())
            }
            None => Err(Error::receiver(format!(
                "extension type {} decodes to {}",
                self.codec.type_tag(),
                std::any::type_name::<C::Value>()
            ))),
        }
    }

    fn decode_value(&self, payload: &[u8]) -> Result<Value> {
        let type_tag = self.codec.type_tag();
        let value = self.codec.decode(payload)?;
        Ok(self
            .codec
            .to_dynamic(&value)
            .unwrap_or_else(|| Value::Ext(type_tag, bytes::Bytes::copy_from_slice(payload))))
    }
}

/// One immutable set of bindings, indexed both ways.
#[derive(Clone, Default)]
pub(crate) struct Bindings {
    by_type: HashMap<TypeId, Arc<dyn Binding>>,
    by_tag: HashMap<i8, Arc<dyn Binding>>,
}

impl Bindings {
    fn with_builtins() -> Self {
        let mut bindings = Bindings::default();
        bindings.insert(Arc::new(Erased {
            codec: TimestampExt,
            _host: PhantomData,
        }));
        bindings
    }

    fn insert(&mut self, binding: Arc<dyn Binding>) {
        self.by_type.insert(binding.host_type(), Arc::clone(&binding));
        self.by_tag.insert(binding.type_tag(), binding);
    }

    pub(crate) fn for_type(&self, host: TypeId) -> Option<Arc<dyn Binding>> { self.by_type.get(&host).cloned() }

    pub(crate) fn for_tag(&self, type_tag: i8) -> Option<Arc<dyn Binding>> { self.by_tag.get(&type_tag).cloned() }

    fn is_builtin(type_tag: i8, host: TypeId) -> bool { type_tag == TIMESTAMP_TYPE || host == TypeId::of::<Timestamp>() }
}

/// The set of extension bindings a [`Codec`] consults.
///
/// Readers take a snapshot per operation and never block; writers replace the whole
/// set atomically.
///
/// [`Codec`]: crate::Codec
pub struct ExtensionRegistry {
    current: ArcSwap<Bindings>,
}

impl ExtensionRegistry {
    /// A registry holding only the built-in timestamp binding.
    pub fn new() -> Self {
        ExtensionRegistry {
            current: ArcSwap::from_pointee(Bindings::with_builtins()),
        }
    }

    /// Adds a binding.
    ///
    /// Returns `false`, changing nothing, if the type tag or the host type is
    /// already claimed.
    pub fn register<C: ExtensionCodec>(&self, codec: C) -> bool {
        let type_tag = codec.type_tag();
        let host = TypeId::of::<C::Value>();
        if Bindings::is_builtin(type_tag, host) {
            return false;
        }

        let binding: Arc<dyn Binding> = Arc::new(Erased {
            codec,
            _host: PhantomData,
        });
        let mut added = false;
        self.current.rcu(|current| {
            added = !current.by_tag.contains_key(&type_tag) && !current.by_type.contains_key(&host);
            let mut next = Bindings::clone(current);
            if added {
                next.insert(Arc::clone(&binding));
            }
            next
        });

        if added {
            tracing::debug!(type_tag, host = std::any::type_name::<C::Value>(), "registered extension");
        }
        added
    }

    /// Removes the binding `codec` registered.
    ///
    /// Returns `false` if it was not registered or is built in.
    pub fn unregister<C: ExtensionCodec>(&self, codec: &C) -> bool {
        let type_tag = codec.type_tag();
        let host = TypeId::of::<C::Value>();
        if Bindings::is_builtin(type_tag, host) {
            return false;
        }

        let mut removed = false;
        self.current.rcu(|current| {
            removed = current
                .by_tag
                .get(&type_tag)
                .map_or(false, |b| b.host_type() == host);
            let mut next = Bindings::clone(current);
            if removed {
                next.by_tag.remove(&type_tag);
                next.by_type.remove(&host);
            }
            next
        });

        if removed {
            tracing::debug!(type_tag, "unregistered extension");
        }
        removed
    }

    /// Whether a binding claims `type_tag`.
    pub fn is_registered(&self, type_tag: i8) -> bool { self.current.load().by_tag.contains_key(&type_tag) }

    /// The bindings as of now, for the duration of one operation.
    pub(crate) fn snapshot(&self) -> Arc<Bindings> { self.current.load_full() }
}

impl Default for ExtensionRegistry {
    fn default() -> Self { Self::new() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Celsius(i16);

    struct CelsiusExt(i8);

    impl ExtensionCodec for CelsiusExt {
        type Value = Celsius;

        fn type_tag(&self) -> i8 { self.0 }

        fn encode(&self, value: &Celsius, enc: &mut Encoder<'_>) -> Result<()> {
            enc.put_ext(self.0, &value.0.to_be_bytes())
        }

        fn decode(&self, payload: &[u8]) -> Result<Celsius> {
            match payload {
                [hi, lo] => Ok(Celsius(i16::from_be_bytes([*hi, *lo]))),
                _ => Err(Error::extension(self.0, "expected 2 bytes")),
            }
        }
    }

    struct OtherExt(i8);

    impl ExtensionCodec for OtherExt {
        type Value = u128;

        fn type_tag(&self) -> i8 { self.0 }

        fn encode(&self, value: &u128, enc: &mut Encoder<'_>) -> Result<()> {
            enc.put_ext(self.0, &value.to_be_bytes())
        }

        fn decode(&self, payload: &[u8]) -> Result<u128> {
            let mut buf = [0u8; 16];
            if payload.len() != 16 {
                return Err(Error::extension(self.0, "expected 16 bytes"));
            }
            buf.copy_from_slice(payload);
            Ok(u128::from_be_bytes(buf))
        }
    }

    #[test]
    fn timestamp_is_builtin() {
        let registry = ExtensionRegistry::new();
        assert!(registry.is_registered(TIMESTAMP_TYPE));
        assert!(registry.snapshot().for_type(TypeId::of::<Timestamp>()).is_some());
        assert!(!registry.unregister(&TimestampExt));
        assert!(registry.is_registered(TIMESTAMP_TYPE));
    }

    #[test]
    fn builtin_tag_cannot_be_claimed() {
        let registry = ExtensionRegistry::new();
        assert!(!registry.register(CelsiusExt(TIMESTAMP_TYPE)));
        assert!(registry.snapshot().for_type(TypeId::of::<Celsius>()).is_none());
    }

    #[test]
    fn registration_is_all_or_nothing() {
        let registry = ExtensionRegistry::new();
        assert!(registry.register(CelsiusExt(5)));
        // same tag, other host type
        assert!(!registry.register(OtherExt(5)));
        assert!(registry.snapshot().for_type(TypeId::of::<u128>()).is_none());
        // same host type, other tag
        assert!(!registry.register(CelsiusExt(6)));
        assert!(!registry.is_registered(6));

        assert!(registry.register(OtherExt(6)));
        assert!(registry.is_registered(6));
    }

    #[test]
    fn unregister_only_own_binding() {
        let registry = ExtensionRegistry::new();
        assert!(registry.register(CelsiusExt(5)));
        assert!(!registry.unregister(&OtherExt(5)));
        assert!(registry.unregister(&CelsiusExt(5)));
        assert!(!registry.is_registered(5));
        assert!(!registry.unregister(&CelsiusExt(5)));
    }

    #[test]
    fn snapshots_are_stable() {
        let registry = ExtensionRegistry::new();
        let before = registry.snapshot();
        assert!(registry.register(CelsiusExt(5)));
        assert!(before.for_tag(5).is_none());
        assert!(registry.snapshot().for_tag(5).is_some());
    }

    #[test]
    fn erased_binding_checks_host_type() {
        let registry = ExtensionRegistry::new();
        registry.register(CelsiusExt(5));
        let binding = registry.snapshot().for_tag(5).unwrap();

        let mut dest = Celsius::default();
        binding.decode_into(&[0xff, 0xf6], &mut dest).unwrap();
        assert_eq!(dest, Celsius(-10));

        let mut wrong = 0u32;
        assert!(binding
            .decode_into(&[0, 1], &mut wrong)
            .unwrap_err()
            .is_receiver_shape());
        assert!(binding.decode_into(&[0], &mut dest).unwrap_err().is_extension());
        assert_eq!(
            binding.decode_value(&[0, 1]).unwrap(),
            Value::Ext(5, bytes::Bytes::from_static(&[0, 1]))
        );
    }
}
