//! MessagePack format bytes and header classification.

/// Largest value stored directly in a positive fixint, 0x7f
pub const POSITIVE_FIXINT_MAX: u8 = 0x7f;
/// Fixmap tag bits, 0x80
pub const FIXMAP: u8 = 0x80;
/// Fixarray tag bits, 0x90
pub const FIXARRAY: u8 = 0x90;
/// Fixstr tag bits, 0xa0
pub const FIXSTR: u8 = 0xa0;
/// Negative fixint tag bits, 0xe0
pub const NEGATIVE_FIXINT: u8 = 0xe0;

/// Length bits of a fixmap or fixarray.
pub const MASK_FIXCOL_LEN: u8 = 0b0000_1111;
/// Length bits of a fixstr.
pub const MASK_FIXSTR_LEN: u8 = 0b0001_1111;

pub const NIL: u8 = 0xc0;
/// Never assigned by the format.
pub const NEVER_USED: u8 = 0xc1;
pub const FALSE: u8 = 0xc2;
pub const TRUE: u8 = 0xc3;

pub const BIN8: u8 = 0xc4;
pub const BIN16: u8 = 0xc5;
pub const BIN32: u8 = 0xc6;

pub const EXT8: u8 = 0xc7;
pub const EXT16: u8 = 0xc8;
pub const EXT32: u8 = 0xc9;

pub const FLOAT32: u8 = 0xca;
pub const FLOAT64: u8 = 0xcb;

pub const UINT8: u8 = 0xcc;
pub const UINT16: u8 = 0xcd;
pub const UINT32: u8 = 0xce;
pub const UINT64: u8 = 0xcf;

pub const INT8: u8 = 0xd0;
pub const INT16: u8 = 0xd1;
pub const INT32: u8 = 0xd2;
pub const INT64: u8 = 0xd3;

pub const FIXEXT1: u8 = 0xd4;
pub const FIXEXT2: u8 = 0xd5;
pub const FIXEXT4: u8 = 0xd6;
pub const FIXEXT8: u8 = 0xd7;
pub const FIXEXT16: u8 = 0xd8;

pub const STR8: u8 = 0xd9;
pub const STR16: u8 = 0xda;
pub const STR32: u8 = 0xdb;

pub const ARRAY16: u8 = 0xdc;
pub const ARRAY32: u8 = 0xdd;

pub const MAP16: u8 = 0xde;
pub const MAP32: u8 = 0xdf;

/// Type tag of the timestamp extension.
pub const TIMESTAMP_TYPE: i8 = -1;

/// Strings shorter than this are fixstrs.
pub const FIXSTR_LIMIT: usize = 32;
/// Arrays and maps up to this length are fixarrays/fixmaps.
pub const FIXCOL_MAX: usize = 15;
/// Longest array, map, string, bin or extension payload the format can describe.
pub const MAX_LEN: usize = u32::MAX as usize;

/// Width of a big-endian length or number following a header byte.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Width {
    W8,
    W16,
    W32,
    W64,
}

impl Width {
    /// Number of bytes following the header.
    pub const fn bytes(self) -> usize {
        match self {
            Width::W8 => 1,
            Width::W16 => 2,
            Width::W32 => 4,
            Width::W64 => 8,
        }
    }
}

/// A classified header byte.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Tag {
    Nil,
    Bool(bool),
    /// Positive fixint, value embedded in the byte.
    PosFixInt(u8),
    /// Negative fixint, value embedded in the byte.
    NegFixInt(i8),
    Uint(Width),
    Int(Width),
    Float32,
    Float64,
    /// Fixstr with its embedded length.
    FixStr(u8),
    Str(Width),
    Bin(Width),
    /// Fixarray with its embedded length.
    FixArray(u8),
    Array(Width),
    /// Fixmap with its embedded length.
    FixMap(u8),
    Map(Width),
    /// Fixext with its fixed payload length.
    FixExt(u8),
    Ext(Width),
    /// 0xc1, which the format never assigns.
    Unused,
}

impl Tag {
    /// Classifies a header byte. Every byte maps to exactly one tag.
    pub fn classify(byte: u8) -> Tag {
        use Tag::*;
        match byte {
            0x00..=POSITIVE_FIXINT_MAX => PosFixInt(byte),
            0x80..=0x8f => FixMap(byte & MASK_FIXCOL_LEN),
            0x90..=0x9f => FixArray(byte & MASK_FIXCOL_LEN),
            0xa0..=0xbf => FixStr(byte & MASK_FIXSTR_LEN),
            NIL => Nil,
            NEVER_USED => Unused,
            FALSE => Bool(false),
            TRUE => Bool(true),
            BIN8 => Bin(Width::W8),
            BIN16 => Bin(Width::W16),
            BIN32 => Bin(Width::W32),
            EXT8 => Ext(Width::W8),
            EXT16 => Ext(Width::W16),
            EXT32 => Ext(Width::W32),
            FLOAT32 => Float32,
            FLOAT64 => Float64,
            UINT8 => Uint(Width::W8),
            UINT16 => Uint(Width::W16),
            UINT32 => Uint(Width::W32),
            UINT64 => Uint(Width::W64),
            INT8 => Int(Width::W8),
            INT16 => Int(Width::W16),
            INT32 => Int(Width::W32),
            INT64 => Int(Width::W64),
            FIXEXT1 => FixExt(1),
            FIXEXT2 => FixExt(2),
            FIXEXT4 => FixExt(4),
            FIXEXT8 => FixExt(8),
            FIXEXT16 => FixExt(16),
            STR8 => Str(Width::W8),
            STR16 => Str(Width::W16),
            STR32 => Str(Width::W32),
            ARRAY16 => Array(Width::W16),
            ARRAY32 => Array(Width::W32),
            MAP16 => Map(Width::W16),
            MAP32 => Map(Width::W32),
            NEGATIVE_FIXINT..=0xff => NegFixInt(byte as i8),
        }
    }

    /// Arrays and maps, which may not be used as mapping keys.
    pub fn is_container(self) -> bool {
        matches!(
            self,
            Tag::FixArray(_) | Tag::Array(_) | Tag::FixMap(_) | Tag::Map(_)
        )
    }

    /// Any integer header.
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            Tag::PosFixInt(_) | Tag::NegFixInt(_) | Tag::Uint(_) | Tag::Int(_)
        )
    }

    /// Any string header.
    pub fn is_str(self) -> bool { matches!(self, Tag::FixStr(_) | Tag::Str(_)) }

    /// Any extension header.
    pub fn is_ext(self) -> bool { matches!(self, Tag::FixExt(_) | Tag::Ext(_)) }
}

/// Header byte of the fixext variant for a payload length, if there is one.
pub fn fixext_for(len: usize) -> Option<u8> {
    match len {
        1 => Some(FIXEXT1),
        2 => Some(FIXEXT2),
        4 => Some(FIXEXT4),
        8 => Some(FIXEXT8),
        16 => Some(FIXEXT16),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fix_ranges() {
        assert_eq!(Tag::classify(0x00), Tag::PosFixInt(0));
        assert_eq!(Tag::classify(0x7f), Tag::PosFixInt(127));
        assert_eq!(Tag::classify(0x8f), Tag::FixMap(15));
        assert_eq!(Tag::classify(0x93), Tag::FixArray(3));
        assert_eq!(Tag::classify(0xbf), Tag::FixStr(31));
        assert_eq!(Tag::classify(0xe0), Tag::NegFixInt(-32));
        assert_eq!(Tag::classify(0xff), Tag::NegFixInt(-1));
    }

    #[test]
    fn fixed_bytes() {
        assert_eq!(Tag::classify(NIL), Tag::Nil);
        assert_eq!(Tag::classify(NEVER_USED), Tag::Unused);
        assert_eq!(Tag::classify(TRUE), Tag::Bool(true));
        assert_eq!(Tag::classify(UINT16), Tag::Uint(Width::W16));
        assert_eq!(Tag::classify(INT64), Tag::Int(Width::W64));
        assert_eq!(Tag::classify(FIXEXT16), Tag::FixExt(16));
        assert_eq!(Tag::classify(EXT32), Tag::Ext(Width::W32));
    }

    #[test]
    fn predicates() {
        assert!(Tag::classify(0x90).is_container());
        assert!(Tag::classify(MAP32).is_container());
        assert!(!Tag::classify(STR8).is_container());
        assert!(Tag::classify(0xa5).is_str());
        assert!(Tag::classify(0xf0).is_integer());
        assert!(Tag::classify(FIXEXT4).is_ext());
        assert!(!Tag::classify(BIN8).is_ext());
    }

    #[test]
    fn fixext_sizes() {
        assert_eq!(fixext_for(4), Some(FIXEXT4));
        assert_eq!(fixext_for(3), None);
        assert_eq!(fixext_for(0), None);
    }
}
