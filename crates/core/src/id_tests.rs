// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::HashMap;

crate::define_id! {
    /// Test ID type for macro verification.
    pub struct TestId("tst-");
}

#[test]
fn new_ids_carry_prefix_and_fit_inline() {
    let id = TestId::new();
    assert!(id.starts_with("tst-"));
    assert_eq!(id.len(), 23);
    assert_eq!(id.suffix().len(), 19);
}

#[test]
fn new_ids_are_unique() {
    let a = SubscriberId::new();
    let b = SubscriberId::new();
    assert_ne!(a, b);
}

#[test]
fn from_string_keeps_foreign_ids_intact() {
    let id = TestId::from_string("not-prefixed");
    assert_eq!(id.as_str(), "not-prefixed");
    assert_eq!(id.suffix(), "not-prefixed");
}

#[test]
fn hash_map_lookup_by_str() {
    let mut map = HashMap::new();
    map.insert(TestId::from("tst-k"), 42);
    assert_eq!(map.get("tst-k"), Some(&42));
}

#[test]
fn serde_is_transparent() {
    let id = TestId::from("tst-abc");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"tst-abc\"");
    let parsed: TestId = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, id);
}
