use bytes::Bytes;
use mpack::{Timestamp, Value};
use proptest::prelude::*;

/// arbitrary Bytes for use with proptest
pub fn arb_bs() -> impl Strategy<Value = Bytes> { prop::collection::vec(any::<u8>(), 0..300).prop_map(Bytes::from) }

/// arbitrary f32, never NaN
pub fn arb_f32() -> impl Strategy<Value = f32> {
    use proptest::num::f32::*;
    POSITIVE | NEGATIVE | NORMAL | SUBNORMAL | ZERO | INFINITE
}

/// arbitrary f64, never NaN
pub fn arb_f64() -> impl Strategy<Value = f64> {
    use proptest::num::f64::*;
    POSITIVE | NEGATIVE | NORMAL | SUBNORMAL | ZERO | INFINITE
}

/// arbitrary Timestamp, covering all three payload sizes
pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
    let seconds = prop_oneof![
        // 32-bit
        0..=(u32::MAX as i64),
        // 64-bit
        0..(1i64 << 34),
        // 96-bit
        any::<i64>(),
    ];
    (seconds, 0..1_000_000_000u32).prop_map(|(s, n)| Timestamp::new(s, n).unwrap_or_default())
}

/// arbitrary scalar Value, in the form it decodes back to
///
/// Non-negative integers are always `Uint`, as the encoder picks the unsigned formats
/// for them. Extension tags stay clear of the reserved negative range.
pub fn arb_scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Nil),
        any::<bool>().prop_map(Value::Bool),
        // integers
        any::<u8>().prop_map(Value::from),
        any::<u16>().prop_map(Value::from),
        any::<u32>().prop_map(Value::from),
        any::<u64>().prop_map(Value::from),
        (i64::MIN..0).prop_map(Value::Int),
        (-32i64..0).prop_map(Value::Int),
        // floats
        arb_f32().prop_map(Value::F32),
        arb_f64().prop_map(Value::F64),
        // strings
        ".{0,40}".prop_map(Value::Str),
        arb_bs().prop_map(Value::Bin),
        // extensions
        (0i8..=127, arb_bs()).prop_map(|(t, b)| Value::Ext(t, b)),
        arb_timestamp().prop_map(Value::Timestamp),
    ]
}

/// arbitrary Value for use with proptest
pub fn arb_value() -> impl Strategy<Value = Value> {
    arb_scalar().prop_recursive(
        8,  // max depth
        64, // max nodes
        20, // max items per collection
        |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..20).prop_map(Value::Array),
                prop::collection::vec((arb_scalar(), inner), 0..20).prop_map(Value::Map),
            ]
        },
    )
}
