//! Integration tests for Value types
//!
//! Tests Value variants, equality, hashing, display, and conversions.

use concord_foundation::{Record, Value};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

// =============================================================================
// Value Construction
// =============================================================================

#[test]
fn value_nil() {
    let v = Value::Nil;
    assert!(v.is_nil());
    assert!(!v.is_truthy());
}

#[test]
fn value_bool() {
    assert!(Value::Bool(true).is_truthy());
    assert!(!Value::Bool(false).is_truthy());
    assert_eq!(Value::Bool(false).as_bool(), Some(false));
}

#[test]
fn value_int() {
    let v = Value::Int(42);
    assert!(v.is_truthy());
    assert_eq!(v.as_int(), Some(42));
    assert_eq!(v.as_float(), None);
    assert_eq!(v.as_number(), Some(42.0));
}

#[test]
fn value_float() {
    let v = Value::Float(1.5);
    assert_eq!(v.as_float(), Some(1.5));
    assert_eq!(v.as_int(), None);
}

#[test]
fn value_string() {
    let v = Value::String(Arc::from("hello"));
    assert_eq!(v.as_str(), Some("hello"));
    assert_eq!(v, Value::from("hello"));
    assert_eq!(v, Value::from("hello".to_string()));
}

#[test]
fn value_empty_string_is_truthy() {
    // Only nil and false are falsy
    assert!(Value::from("").is_truthy());
    assert!(Value::Int(0).is_truthy());
}

#[test]
fn value_list() {
    let v = Value::from(vec![1, 2, 3]);
    let items = v.as_list().unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items.get(1), Some(&Value::Int(2)));
}

#[test]
fn value_record() {
    let v = Value::from(Record::new().with("a", 1));
    assert_eq!(v.as_record().and_then(|r| r.get("a")), Some(&Value::Int(1)));
    assert_eq!(v.type_name(), "record");
}

// =============================================================================
// Equality and Hashing
// =============================================================================

#[test]
fn float_equality_is_bitwise() {
    assert_eq!(Value::Float(f64::NAN), Value::Float(f64::NAN));
    assert_ne!(Value::Float(0.0), Value::Float(-0.0));
}

#[test]
fn int_and_float_not_equal() {
    assert_ne!(Value::Int(1), Value::Float(1.0));
}

#[test]
fn values_usable_in_hash_set() {
    let mut set = HashSet::new();
    set.insert(Value::Int(1));
    set.insert(Value::Int(1));
    set.insert(Value::from("1"));
    set.insert(Value::Float(1.0));
    assert_eq!(set.len(), 3);
}

// =============================================================================
// Ordering and Display
// =============================================================================

#[test]
fn numeric_ordering_crosses_int_and_float() {
    assert!(Value::Int(2) < Value::Float(2.5));
    assert!(Value::Float(10.5) > Value::Int(10));
}

#[test]
fn ordering_agrees_with_equality_on_numeric_ties() {
    assert_eq!(Value::Int(3).partial_cmp(&Value::Float(3.0)), None);
    assert_eq!(Value::Float(-0.0).partial_cmp(&Value::Float(0.0)), None);
    assert_eq!(
        Value::Float(f64::NAN).partial_cmp(&Value::Float(f64::NAN)),
        Some(Ordering::Equal)
    );
}

#[test]
fn mixed_types_unordered() {
    assert_eq!(Value::Nil.partial_cmp(&Value::Int(0)), None);
}

#[test]
fn display() {
    assert_eq!(Value::Int(-3).to_string(), "-3");
    assert_eq!(Value::Bool(true).to_string(), "true");
    assert_eq!(Value::from("Reached 10").to_string(), "\"Reached 10\"");
    assert_eq!(Value::from(vec!["a", "b"]).to_string(), "[\"a\", \"b\"]");
}

#[test]
fn option_conversion() {
    assert_eq!(Value::from(None::<&str>), Value::Nil);
    assert_eq!(Value::from(Some("x")), Value::from("x"));
}
