// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lookup helpers shared by state modules.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

/// Find a value by exact key or unique key prefix.
///
/// Returns `None` when the prefix is ambiguous (matches more than one key).
pub(super) fn find_by_prefix<'a, K, V>(map: &'a HashMap<K, V>, id: &str) -> Option<&'a V>
where
    K: Borrow<str> + Eq + Hash,
{
    if let Some(value) = map.get(id) {
        return Some(value);
    }
    let mut matched = None;
    for (key, value) in map {
        if key.borrow().starts_with(id) {
            if matched.is_some() {
                return None;
            }
            matched = Some(value);
        }
    }
    matched
}
