use crate::encoding::Kind;
use failure::Fail;

/// Everything that can go wrong while encoding or decoding.
///
/// Every error aborts the whole call. Variants carry enough context (the offending
/// format byte, the destination kind) to diagnose a failure without re-running it.
#[derive(Debug, Fail)]
pub enum Error {
    /// A header byte that is undefined, or not valid for the destination being decoded.
    #[fail(display = "unexpected format byte 0x{:02x} while decoding {}", byte, kind)]
    Format {
        /// The header byte found in the input.
        byte: u8,
        /// The kind of destination that was being decoded.
        kind: Kind,
    },

    /// Fewer bytes remain than a header promised.
    #[fail(
        display = "input truncated: needed {} more bytes, {} remaining",
        needed, remaining
    )]
    Truncated {
        /// Bytes the header required.
        needed: usize,
        /// Bytes actually left in the input.
        remaining: usize,
    },

    /// A host value has no wire representation.
    #[fail(display = "value cannot be encoded: {}", reason)]
    Unsupported {
        /// What was wrong with the value.
        reason: String,
    },

    /// A mapping key was itself an array or a map.
    #[fail(display = "mapping key with format byte 0x{:02x} is an array or map", byte)]
    StructuralKey {
        /// The key's header byte.
        byte: u8,
    },

    /// An extension binding rejected a value or a payload.
    #[fail(display = "extension type {} failed: {}", type_tag, reason)]
    Extension {
        /// The extension's type tag.
        type_tag: i8,
        /// The binding's own explanation.
        reason: String,
    },

    /// An extension header carried a type tag no binding claims.
    #[fail(display = "no extension is registered for type tag {}", type_tag)]
    UnregisteredExtension {
        /// The unclaimed type tag.
        type_tag: i8,
    },

    /// The destination does not have the shape the decoded data needs.
    #[fail(display = "destination cannot receive the value: {}", reason)]
    ReceiverShape {
        /// What was wrong with the destination.
        reason: String,
    },

    /// A numeric value does not fit in the destination type.
    #[fail(display = "value {} is out of range for {}", value, kind)]
    OutOfRange {
        /// The decoded value, formatted.
        value: String,
        /// The destination kind.
        kind: Kind,
    },

    /// A string payload was not valid UTF-8.
    #[fail(display = "string at offset {} is not valid utf-8", offset)]
    InvalidUtf8 {
        /// Offset of the string payload in the input.
        offset: usize,
    },

    /// Arrays, maps and records nested deeper than the decoder allows.
    #[fail(display = "input nests containers more than {} levels deep", limit)]
    TooDeep {
        /// The nesting limit.
        limit: usize,
    },

    /// A complete value was decoded but input remained.
    #[fail(display = "{} bytes left over after the decoded value", remaining)]
    TrailingBytes {
        /// Unread byte count.
        remaining: usize,
    },

    /// The write pass disagreed with the size pass.
    #[fail(
        display = "encoder wrote {} bytes but predicted {}",
        written, predicted
    )]
    SizeMismatch {
        /// Length computed by the size pass.
        predicted: usize,
        /// Length the write pass produced, or tried to.
        written: usize,
    },
}

impl Error {
    pub(crate) fn unsupported<S: Into<String>>(reason: S) -> Self {
        Error::Unsupported {
            reason: reason.into(),
        }
    }

    pub(crate) fn receiver<S: Into<String>>(reason: S) -> Self {
        Error::ReceiverShape {
            reason: reason.into(),
        }
    }

    /// Builds an [`Error::Extension`]; intended for [`ExtensionCodec`] implementations.
    ///
    /// [`ExtensionCodec`]: crate::extension::ExtensionCodec
    pub fn extension<S: Into<String>>(type_tag: i8, reason: S) -> Self {
        Error::Extension {
            type_tag,
            reason: reason.into(),
        }
    }

    /// Header bytes that were invalid for the attempted decode.
    pub fn is_format(&self) -> bool {
        match self {
            Error::Format { .. }
            | Error::TrailingBytes { .. }
            | Error::InvalidUtf8 { .. }
            | Error::OutOfRange { .. }
            | Error::UnregisteredExtension { .. }
            | Error::TooDeep { .. } => true,
            _ => false,
        }
    }

    /// The input ended early.
    pub fn is_truncated(&self) -> bool { matches!(self, Error::Truncated { .. }) }

    /// A host value had no wire mapping.
    pub fn is_unsupported(&self) -> bool { matches!(self, Error::Unsupported { .. }) }

    /// A mapping key was an array or a map.
    pub fn is_structural_key(&self) -> bool { matches!(self, Error::StructuralKey { .. }) }

    /// An extension binding failed.
    pub fn is_extension(&self) -> bool { matches!(self, Error::Extension { .. }) }

    /// The destination had the wrong shape.
    pub fn is_receiver_shape(&self) -> bool { matches!(self, Error::ReceiverShape { .. }) }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_byte_and_kind() {
        let e = Error::Format {
            byte: 0xc1,
            kind: Kind::Uint,
        };
        assert_eq!(
            e.to_string(),
            "unexpected format byte 0xc1 while decoding unsigned integer"
        );
        assert!(e.is_format());
        assert!(!e.is_truncated());
    }

    #[test]
    fn families() {
        assert!(Error::TrailingBytes { remaining: 1 }.is_format());
        assert!(Error::TooDeep { limit: 256 }.is_format());
        assert!(Error::Truncated {
            needed: 4,
            remaining: 1
        }
        .is_truncated());
        assert!(Error::unsupported("too long").is_unsupported());
        assert!(Error::StructuralKey { byte: 0x90 }.is_structural_key());
        assert!(Error::extension(-1, "bad nanoseconds").is_extension());
        assert!(Error::receiver("not a slot").is_receiver_shape());
    }
}
