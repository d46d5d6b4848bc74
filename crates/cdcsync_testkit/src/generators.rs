//! Property-based test generators using proptest.

use cdcsync_codec::Value;
use proptest::prelude::*;

/// Strategy for entity names shaped like runtime constants.
pub fn entity_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Z][A-Z0-9_]{0,15}").expect("Invalid regex")
}

/// Strategy for scalar values, null included.
pub fn scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        any::<f64>().prop_map(Value::Float),
        "[ -~]{0,16}".prop_map(Value::String),
    ]
}

/// Strategy for arbitrary values nested a few levels deep.
pub fn value_strategy() -> impl Strategy<Value = Value> {
    scalar_strategy().prop_recursive(3, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::List),
            prop::collection::btree_map("[a-z_]{1,8}", inner, 0..6).prop_map(|m| Value::map(m)),
        ]
    })
}

/// Strategy for non-null values.
pub fn defined_value_strategy() -> impl Strategy<Value = Value> {
    value_strategy().prop_filter("value must not be null", |v| !v.is_null())
}

/// Strategy for a set of distinct entity names with values.
pub fn entities_strategy(max: usize) -> impl Strategy<Value = Vec<(String, Value)>> {
    prop::collection::btree_map(entity_name_strategy(), value_strategy(), 0..max)
        .prop_map(|m| m.into_iter().collect())
}
