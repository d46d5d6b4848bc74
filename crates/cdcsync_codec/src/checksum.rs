//! Content checksums used for change detection.

use crate::encoder::to_canonical_cbor;
use crate::value::Value;
use std::fmt;

/// A short fingerprint of a [`Value`].
///
/// Computed as CRC-32 over the value's canonical CBOR encoding. This is
/// change detection, not integrity protection: distinct values almost
/// never collide, and equal values always agree, including a value that
/// was encoded, stored and decoded again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Checksum(u32);

impl Checksum {
    /// Computes the checksum of a value.
    pub fn of(value: &Value) -> Self {
        Self(crc32fast::hash(&to_canonical_cbor(value)))
    }

    /// Wraps a raw checksum.
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw checksum.
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Returns the representation persisted in a checksum record.
    pub fn to_value(self) -> Value {
        Value::Int(i64::from(self.0))
    }

    /// Loosely compares this checksum against a persisted one.
    ///
    /// Stores may hand numbers back as strings or floats, so an integral
    /// `Float` and a decimal `String` are accepted alongside `Int`.
    #[allow(clippy::cast_precision_loss)]
    pub fn matches(self, stored: &Value) -> bool {
        let expected = i64::from(self.0);
        match stored {
            Value::Int(n) => *n == expected,
            Value::String(s) => s.trim().parse::<i64>().is_ok_and(|n| n == expected),
            Value::Float(x) => x.fract() == 0.0 && *x == expected as f64,
            _ => false,
        }
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Computes the checksum of a value.
pub fn checksum(value: &Value) -> Checksum {
    Checksum::of(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::from_cbor;
    use proptest::prelude::*;

    fn arb_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::Int),
            any::<f64>().prop_map(Value::Float),
            "[a-zA-Z0-9_.]{0,12}".prop_map(Value::String),
        ];
        leaf.prop_recursive(3, 24, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..6).prop_map(Value::List),
                prop::collection::btree_map("[A-Z_]{1,8}", inner, 0..6)
                    .prop_map(|m| Value::Map(m.into_iter().collect())),
            ]
        })
    }

    #[test]
    fn known_values_are_stable() {
        // Fixed fingerprints guard against accidental encoding changes.
        assert_eq!(checksum(&Value::Null), Checksum(crc32fast::hash(&[0xf6])));
        assert_eq!(
            checksum(&Value::Bool(true)),
            Checksum(crc32fast::hash(&[0xf5]))
        );
    }

    #[test]
    fn distinct_values_differ() {
        assert_ne!(checksum(&Value::Bool(true)), checksum(&Value::Bool(false)));
        assert_ne!(checksum(&Value::from("8.1")), checksum(&Value::from("8.2")));
        assert_ne!(checksum(&Value::Int(1)), checksum(&Value::Float(1.0)));
        assert_ne!(checksum(&Value::Int(1)), checksum(&Value::from("1")));
    }

    #[test]
    fn map_order_does_not_matter() {
        let a = Value::Map(vec![
            ("x".into(), Value::Int(1)),
            ("y".into(), Value::Int(2)),
        ]);
        let b = Value::Map(vec![
            ("y".into(), Value::Int(2)),
            ("x".into(), Value::Int(1)),
        ]);
        assert_eq!(checksum(&a), checksum(&b));
    }

    #[test]
    fn matches_coerces_stored_types() {
        let sum = Checksum::from_raw(3_735_928_559);
        assert!(sum.matches(&Value::Int(3_735_928_559)));
        assert!(sum.matches(&Value::from("3735928559")));
        assert!(sum.matches(&Value::from(" 3735928559 ")));
        assert!(sum.matches(&Value::Float(3_735_928_559.0)));
        assert!(!sum.matches(&Value::Int(1)));
        assert!(!sum.matches(&Value::from("not a number")));
        assert!(!sum.matches(&Value::Null));
        assert!(!sum.matches(&Value::Bool(true)));
    }

    #[test]
    fn to_value_matches_itself() {
        let sum = checksum(&Value::from("8.1"));
        assert!(sum.matches(&sum.to_value()));
    }

    proptest! {
        #[test]
        fn equal_values_have_equal_checksums(value in arb_value()) {
            let copy = value.clone();
            prop_assert_eq!(checksum(&value), checksum(&copy));
        }

        #[test]
        fn reloaded_values_keep_their_checksum(value in arb_value()) {
            let reloaded = from_cbor(&to_canonical_cbor(&value)).unwrap();
            prop_assert_eq!(checksum(&value), checksum(&reloaded));
        }
    }
}
