use mpack::{
    encoding::constants::*,
    errors::{Error, Result},
    extension::ExtensionCodec,
    prelude::*,
    timestamp::TimestampExt,
};
use mpack_strategy::arb_timestamp;
use proptest::prelude::*;
use std::time::{Duration, UNIX_EPOCH};

#[derive(Clone, Debug, Default, PartialEq)]
struct Version {
    major: u16,
    minor: u16,
}

impl Encode for Version {
    fn encode(&self, enc: &mut Encoder<'_>) -> Result<()> { enc.encode_extension(self) }

    fn kind(&self) -> Kind { Kind::Ext }
}

impl Decode for Version {
    fn decode_into(&mut self, dec: &mut Decoder<'_, '_>) -> Result<()> { dec.decode_extension(self) }

    fn kind(&self) -> Kind { Kind::Ext }
}

struct VersionExt {
    dynamic: bool,
}

impl ExtensionCodec for VersionExt {
    type Value = Version;

    fn type_tag(&self) -> i8 { 42 }

    fn encode(&self, v: &Version, enc: &mut Encoder<'_>) -> Result<()> {
        let mut payload = [0u8; 4];
        payload[..2].copy_from_slice(&v.major.to_be_bytes());
        payload[2..].copy_from_slice(&v.minor.to_be_bytes());
        enc.put_ext(42, &payload)
    }

    fn decode(&self, payload: &[u8]) -> Result<Version> {
        match payload {
            [a, b, c, d] => Ok(Version {
                major: u16::from_be_bytes([*a, *b]),
                minor: u16::from_be_bytes([*c, *d]),
            }),
            _ => Err(Error::extension(42, "expected 4 bytes")),
        }
    }

    fn to_dynamic(&self, v: &Version) -> Option<Value> {
        if self.dynamic {
            Some(Value::from(format!("{}.{}", v.major, v.minor)))
        } else {
            None
        }
    }
}

const V1_2: [u8; 6] = [FIXEXT4, 42, 0, 1, 0, 2];

#[test]
fn custom_extension_round_trip() {
    let codec = Codec::new();
    assert!(codec.register_extension(VersionExt { dynamic: false }));
    assert!(codec.extensions().is_registered(42));

    let v = Version { major: 1, minor: 2 };
    let bytes = codec.encode(&v, Mode::Map).unwrap();
    assert_eq!(bytes, V1_2);
    assert_eq!(codec.decode::<Version>(&bytes, Mode::Map).unwrap(), v);

    // inside containers too
    let many = vec![v.clone(), Version::default()];
    let bytes = codec.encode(&many, Mode::Array).unwrap();
    assert_eq!(bytes[0], FIXARRAY | 2);
    assert_eq!(codec.decode::<Vec<Version>>(&bytes, Mode::Array).unwrap(), many);
}

#[test]
fn unregistered_extension() {
    let codec = Codec::new();
    let err = codec.encode(&Version::default(), Mode::Map).unwrap_err();
    assert!(err.is_unsupported());

    let err = codec.decode::<Version>(&V1_2, Mode::Map).unwrap_err();
    assert!(matches!(err, Error::UnregisteredExtension { type_tag: 42 }));
    assert!(err.is_format());

    // dynamic decode keeps the payload
    assert_eq!(
        codec.decode_value(&V1_2).unwrap(),
        Value::Ext(42, vec![0, 1, 0, 2].into())
    );
}

#[test]
fn registration_is_exclusive() {
    struct Impostor;

    impl ExtensionCodec for Impostor {
        type Value = u128;

        fn type_tag(&self) -> i8 { 42 }

        fn encode(&self, _: &u128, enc: &mut Encoder<'_>) -> Result<()> { enc.put_ext(42, &[]) }

        fn decode(&self, _: &[u8]) -> Result<u128> { Ok(0) }
    }

    let codec = Codec::new();
    assert!(codec.register_extension(VersionExt { dynamic: false }));
    // same tag, other type
    assert!(!codec.register_extension(Impostor));
    // same type again
    assert!(!codec.register_extension(VersionExt { dynamic: true }));
    // an impostor cannot remove someone else's tag
    assert!(!codec.unregister_extension(&Impostor));
    assert!(codec.extensions().is_registered(42));
}

#[test]
fn unregister_then_decode_fails() {
    let codec = Codec::new();
    let ext = VersionExt { dynamic: false };
    assert!(codec.register_extension(VersionExt { dynamic: false }));
    assert!(codec.decode::<Version>(&V1_2, Mode::Map).is_ok());

    assert!(codec.unregister_extension(&ext));
    assert!(!codec.unregister_extension(&ext));
    assert!(!codec.extensions().is_registered(42));
    assert!(codec.decode::<Version>(&V1_2, Mode::Map).is_err());
}

#[test]
fn registries_are_per_codec() {
    let a = Codec::new();
    let b = Codec::new();
    assert!(a.register_extension(VersionExt { dynamic: false }));
    assert!(!b.extensions().is_registered(42));
    assert!(b.encode(&Version::default(), Mode::Map).is_err());
}

#[test]
fn dynamic_conversion() {
    let codec = Codec::new();
    assert!(codec.register_extension(VersionExt { dynamic: true }));
    assert_eq!(codec.decode_value(&V1_2).unwrap(), Value::from("1.2"));

    // a payload the binding rejects fails the whole decode
    let err = codec
        .decode_value(&[FIXEXT2, 42, 0, 1])
        .unwrap_err();
    assert!(err.is_extension());
}

#[test]
fn timestamp_is_built_in() {
    let codec = Codec::new();
    assert!(codec.extensions().is_registered(-1));
    assert!(!codec.register_extension(TimestampExt));
    assert!(!codec.unregister_extension(&TimestampExt));
    assert!(codec.extensions().is_registered(-1));
}

#[test]
fn timestamp_forms() {
    // 32-bit
    let ts = Timestamp::new(1, 0).unwrap();
    assert_eq!(encode(&ts, Mode::Map).unwrap(), [FIXEXT4, 0xff, 0, 0, 0, 1]);

    // 64-bit
    let ts = Timestamp::new(1, 1).unwrap();
    let bytes = encode(&ts, Mode::Map).unwrap();
    assert_eq!(bytes.len(), 10);
    assert_eq!(&bytes[..2], &[FIXEXT8, 0xff]);

    // 96-bit
    let ts = Timestamp::new(-1, 0).unwrap();
    let bytes = encode(&ts, Mode::Map).unwrap();
    assert_eq!(bytes.len(), 15);
    assert_eq!(&bytes[..3], &[EXT8, 12, 0xff]);
    assert_eq!(decode::<Timestamp>(&bytes, Mode::Map).unwrap(), ts);
}

#[test]
fn system_time_uses_timestamp() {
    let t = UNIX_EPOCH + Duration::new(1_600_000_000, 123);
    let bytes = encode(&t, Mode::Map).unwrap();
    assert_eq!(&bytes[..2], &[FIXEXT8, 0xff]);

    let mut back = UNIX_EPOCH;
    decode_into(&bytes, &mut back, Mode::Map).unwrap();
    assert_eq!(back, t);

    match decode_value(&bytes).unwrap() {
        Value::Timestamp(ts) => {
            assert_eq!(ts.seconds(), 1_600_000_000);
            assert_eq!(ts.nanoseconds(), 123);
        }
        other => panic!("expected a timestamp, got {}", other),
    }
}

#[derive(Record, Debug, Default, PartialEq)]
struct Release {
    pub name: String,
    pub version: Version,
    pub at: Option<Timestamp>,
}

#[test]
fn extensions_inside_records() {
    let codec = Codec::new();
    assert!(codec.register_extension(VersionExt { dynamic: false }));
    let r = Release {
        name: "lts".into(),
        version: Version { major: 3, minor: 0 },
        at: Timestamp::new(86_400, 0),
    };
    for mode in [Mode::Map, Mode::Array] {
        let bytes = codec.encode(&r, mode).unwrap();
        assert_eq!(codec.decode::<Release>(&bytes, mode).unwrap(), r);
    }
}

/// A record whose whole encoding is taken over by an extension.
#[derive(Record, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
struct Opaque {
    pub id: u32,
}

struct OpaqueExt;

impl ExtensionCodec for OpaqueExt {
    type Value = Opaque;

    fn type_tag(&self) -> i8 { 9 }

    fn encode(&self, o: &Opaque, enc: &mut Encoder<'_>) -> Result<()> { enc.put_ext(9, &o.id.to_be_bytes()) }

    fn decode(&self, payload: &[u8]) -> Result<Opaque> {
        let id: [u8; 4] = payload
            .try_into()
            .map_err(|_| Error::extension(9, "expected 4 bytes"))?;
        Ok(Opaque {
            id: u32::from_be_bytes(id),
        })
    }
}

#[test]
fn extension_overrides_record_layout() {
    let codec = Codec::new();
    let o = Opaque { id: 7 };
    assert_eq!(codec.encode(&o, Mode::Map).unwrap()[0], FIXMAP | 1);

    assert!(codec.register_extension(OpaqueExt));
    let bytes = codec.encode(&o, Mode::Map).unwrap();
    assert_eq!(bytes, [FIXEXT4, 9, 0, 0, 0, 7]);
    assert_eq!(codec.decode::<Opaque>(&bytes, Mode::Map).unwrap(), o);
}

#[test]
fn claimed_record_is_a_valid_key() {
    let codec = Codec::new();
    let mut m = std::collections::BTreeMap::new();
    m.insert(Opaque { id: 1 }, 10u8);
    m.insert(Opaque { id: 2 }, 20u8);

    // as a plain record it would be a map, never a key
    assert!(codec.encode(&m, Mode::Map).unwrap_err().is_unsupported());

    assert!(codec.register_extension(OpaqueExt));
    let bytes = codec.encode(&m, Mode::Map).unwrap();
    assert_eq!(&bytes[..3], &[FIXMAP | 2, FIXEXT4, 9]);
    assert_eq!(
        codec
            .decode::<std::collections::BTreeMap<Opaque, u8>>(&bytes, Mode::Map)
            .unwrap(),
        m
    );
}

proptest! {
    #[test]
    fn timestamps_round_trip(ts in arb_timestamp()) {
        let bytes = encode(&ts, Mode::Map).unwrap();
        prop_assert_eq!(decode::<Timestamp>(&bytes, Mode::Map).unwrap(), ts);
        prop_assert_eq!(decode_value(&bytes).unwrap(), Value::Timestamp(ts));
    }
}
