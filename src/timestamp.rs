//! The timestamp extension, type tag `-1`.
//!
//! Three payload layouts, chosen by the smallest that fits:
//!
//! | payload | layout                                              | range                               |
//! |---------|-----------------------------------------------------|-------------------------------------|
//! | 4 bytes | seconds as `u32`                                    | 1970 to 2106, no nanoseconds        |
//! | 8 bytes | nanoseconds in the top 30 bits, seconds in the low 34 | 1970 to 2514                        |
//! | 12 bytes| nanoseconds as `u32`, then seconds as `i64`         | everything else, including pre-1970 |
//!
//! All fields are big-endian.

use crate::{
    encoding::{constants::TIMESTAMP_TYPE, Decode, Decoder, Encode, Encoder, Kind},
    errors::{Error, Result},
    extension::ExtensionCodec,
    value::Value,
};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const NANOS_PER_SEC: u32 = 1_000_000_000;

/// An instant as seconds and nanoseconds relative to the Unix epoch.
///
/// `nanoseconds` is always below one billion and counts forward from `seconds`, so
/// half a second before the epoch is `{ seconds: -1, nanoseconds: 500_000_000 }`.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Timestamp {
    seconds: i64,
    nanoseconds: u32,
}

impl Timestamp {
    /// Returns `None` if `nanoseconds` is a billion or more.
    pub fn new(seconds: i64, nanoseconds: u32) -> Option<Self> {
        if nanoseconds < NANOS_PER_SEC {
            Some(Timestamp { seconds, nanoseconds })
        } else {
            None
        }
    }

    pub fn seconds(&self) -> i64 { self.seconds }

    pub fn nanoseconds(&self) -> u32 { self.nanoseconds }

    /// Converts to a [`SystemTime`], if the platform can represent it.
    pub fn to_system_time(&self) -> Option<SystemTime> {
        if self.seconds >= 0 {
            UNIX_EPOCH.checked_add(Duration::new(self.seconds as u64, self.nanoseconds))
        } else {
            let before = Duration::from_secs(self.seconds.unsigned_abs());
            UNIX_EPOCH
                .checked_sub(before)?
                .checked_add(Duration::from_nanos(self.nanoseconds as u64))
        }
    }
}

impl From<SystemTime> for Timestamp {
    fn from(t: SystemTime) -> Self {
        match t.duration_since(UNIX_EPOCH) {
            Ok(after) => Timestamp {
                seconds: after.as_secs() as i64,
                nanoseconds: after.subsec_nanos(),
            },
            Err(e) => {
                let before = e.duration();
                let mut seconds = -(before.as_secs() as i64);
                let mut nanoseconds = 0;
                if before.subsec_nanos() > 0 {
                    seconds -= 1;
                    nanoseconds = NANOS_PER_SEC - before.subsec_nanos();
                }
                Timestamp { seconds, nanoseconds }
            }
        }
    }
}

impl Encode for Timestamp {
    fn encode(&self, enc: &mut Encoder<'_>) -> Result<()> { enc.encode_extension(self) }

    fn kind(&self) -> Kind { Kind::Ext }

    fn is_zero(&self) -> bool { *self == Timestamp::default() }
}

impl Decode for Timestamp {
    fn decode_into(&mut self, dec: &mut Decoder<'_, '_>) -> Result<()> { dec.decode_extension(self) }

    fn kind(&self) -> Kind { Kind::Ext }
}

impl Encode for SystemTime {
    fn encode(&self, enc: &mut Encoder<'_>) -> Result<()> { enc.encode_extension(&Timestamp::from(*self)) }

    fn kind(&self) -> Kind { Kind::Ext }

    fn is_zero(&self) -> bool { *self == UNIX_EPOCH }
}

impl Decode for SystemTime {
    fn decode_into(&mut self, dec: &mut Decoder<'_, '_>) -> Result<()> {
        let mut ts = Timestamp::from(*self);
        dec.decode_extension(&mut ts)?;
        *self = ts.to_system_time().ok_or_else(|| Error::OutOfRange {
            value: format!("{}.{:09}", ts.seconds, ts.nanoseconds),
            kind: Kind::Ext,
        })?;
        Ok(())
    }

    fn kind(&self) -> Kind { Kind::Ext }
}

/// The built-in binding for [`Timestamp`].
pub struct TimestampExt;

impl ExtensionCodec for TimestampExt {
    type Value = Timestamp;

    fn type_tag(&self) -> i8 { TIMESTAMP_TYPE }

    fn encode(&self, ts: &Timestamp, enc: &mut Encoder<'_>) -> Result<()> {
        if ts.seconds >> 34 == 0 {
            let data64 = (ts.nanoseconds as u64) << 34 | ts.seconds as u64;
            if data64 >> 32 == 0 {
                enc.put_ext(TIMESTAMP_TYPE, &(data64 as u32).to_be_bytes())
            } else {
                enc.put_ext(TIMESTAMP_TYPE, &data64.to_be_bytes())
            }
        } else {
            let mut payload = [0u8; 12];
            payload[..4].copy_from_slice(&ts.nanoseconds.to_be_bytes());
            payload[4..].copy_from_slice(&ts.seconds.to_be_bytes());
            enc.put_ext(TIMESTAMP_TYPE, &payload)
        }
    }

    fn decode(&self, payload: &[u8]) -> Result<Timestamp> {
        let (seconds, nanoseconds) = match payload.len() {
            4 => {
                let mut buf = [0u8; 4];
                buf.copy_from_slice(payload);
                (u32::from_be_bytes(buf) as i64, 0)
            }
            8 => {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(payload);
                let data64 = u64::from_be_bytes(buf);
                ((data64 & 0x0000_0003_ffff_ffff) as i64, (data64 >> 34) as u32)
            }
            12 => {
                let mut nanos = [0u8; 4];
                let mut secs = [0u8; 8];
                nanos.copy_from_slice(&payload[..4]);
                secs.copy_from_slice(&payload[4..]);
                (i64::from_be_bytes(secs), u32::from_be_bytes(nanos))
            }
            len => {
                return Err(Error::extension(
                    TIMESTAMP_TYPE,
                    format!("payload of {} bytes, expected 4, 8 or 12", len),
                ))
            }
        };
        Timestamp::new(seconds, nanoseconds).ok_or_else(|| {
            Error::extension(
                TIMESTAMP_TYPE,
                format!("nanoseconds {} out of range", nanoseconds),
            )
        })
    }

    fn to_dynamic(&self, ts: &Timestamp) -> Option<Value> { Some(Value::Timestamp(*ts)) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{codec::Codec, encoding::Mode};

    fn enc(ts: Timestamp) -> Vec<u8> { Codec::new().encode(&ts, Mode::Map).unwrap() }

    fn dec(bytes: &[u8]) -> Result<Timestamp> { Codec::new().decode(bytes, Mode::Map) }

    #[test]
    fn epoch_is_32_bit() {
        let ts = Timestamp::new(0, 0).unwrap();
        assert_eq!(enc(ts), [0xd6, 0xff, 0, 0, 0, 0]);
        assert_eq!(dec(&enc(ts)).unwrap(), ts);
    }

    #[test]
    fn nanoseconds_need_64_bits() {
        let ts = Timestamp::new(1, 1).unwrap();
        let out = enc(ts);
        assert_eq!(out[..2], [0xd7, 0xff]);
        assert_eq!(out[2..], [0, 0, 0, 0x04, 0, 0, 0, 0x01]);
        assert_eq!(dec(&out).unwrap(), ts);
    }

    #[test]
    fn large_seconds_need_96_bits() {
        let ts = Timestamp::new(1 << 34, 0).unwrap();
        let out = enc(ts);
        // ext8, length 12, type -1
        assert_eq!(out[..3], [0xc7, 12, 0xff]);
        assert_eq!(out.len(), 15);
        assert_eq!(dec(&out).unwrap(), ts);

        let largest_64 = Timestamp::new((1 << 34) - 1, 999_999_999).unwrap();
        assert_eq!(enc(largest_64)[0], 0xd7);
    }

    #[test]
    fn before_epoch() {
        let ts = Timestamp::new(-1, 500_000_000).unwrap();
        let out = enc(ts);
        assert_eq!(out[..3], [0xc7, 12, 0xff]);
        assert_eq!(dec(&out).unwrap(), ts);

        let t = UNIX_EPOCH - Duration::from_millis(500);
        assert_eq!(Timestamp::from(t), ts);
        assert_eq!(ts.to_system_time(), Some(t));
    }

    #[test]
    fn bad_nanoseconds_rejected() {
        assert!(Timestamp::new(0, NANOS_PER_SEC).is_none());
        // 96-bit form with nanoseconds of one billion
        let mut bytes = vec![0xc7, 12, 0xff];
        bytes.extend_from_slice(&NANOS_PER_SEC.to_be_bytes());
        bytes.extend_from_slice(&0i64.to_be_bytes());
        assert!(dec(&bytes).unwrap_err().is_extension());
    }

    #[test]
    fn bad_payload_length() {
        // fixext2 with the timestamp tag
        assert!(dec(&[0xd5, 0xff, 0, 0]).unwrap_err().is_extension());
    }

    #[test]
    fn system_time_round_trip() {
        let now = SystemTime::now();
        let codec = Codec::new();
        let bytes = codec.encode(&now, Mode::Map).unwrap();
        let mut back = UNIX_EPOCH;
        codec.decode_into(&bytes, &mut back, Mode::Map).unwrap();
        assert_eq!(back, now);
    }

    #[test]
    fn dynamic_decode() {
        let ts = Timestamp::new(1_700_000_000, 42).unwrap();
        let value = Codec::new().decode_value(&enc(ts)).unwrap();
        assert_eq!(value, Value::Timestamp(ts));
    }
}
