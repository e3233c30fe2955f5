// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! The two lookup phases used on attestation objects.
//!
//! [`primary_lookup`] only ever looks at the standard text keys.
//! [`fallback_scan`] walks the whole tree and picks a byte string by size; it
//! exists because some Apple artifacts carry `authData` under a negative
//! integer key.

use crate::cbor::CborValue;
use std::fmt::Write as _;

/// Smallest possible authenticator data: rpIdHash, flags and signCount.
pub const MIN_AUTH_DATA_LEN: usize = 37;
/// Last resort threshold when nothing reaches [`MIN_AUTH_DATA_LEN`].
pub const FALLBACK_AUTH_DATA_LEN: usize = 30;

pub const FMT_KEYS: [&str; 2] = ["fmt", "format"];
pub const ATT_STMT_KEYS: [&str; 2] = ["attStmt", "attestationStatement"];
pub const AUTH_DATA_KEYS: [&str; 2] = ["authData", "authenticatorData"];

/// A value found under one of its standard keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Found<'a> {
    pub key: &'static str,
    pub value: &'a CborValue,
}

/// Outcome of the text-key phase.  Each entry is the first of its keys, in
/// the order listed, that the map holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrimaryFields<'a> {
    pub fmt: Option<Found<'a>>,
    pub att_stmt: Option<Found<'a>>,
    pub auth_data: Option<Found<'a>>,
}

fn first_of<'a>(map: &'a CborValue, keys: &[&'static str]) -> Option<Found<'a>> {
    keys.iter()
        .find_map(|k| map.get(k).map(|value| Found { key: *k, value }))
}

pub fn primary_lookup(map: &CborValue) -> PrimaryFields<'_> {
    PrimaryFields {
        fmt: first_of(map, &FMT_KEYS),
        att_stmt: first_of(map, &ATT_STMT_KEYS),
        auth_data: first_of(map, &AUTH_DATA_KEYS),
    }
}

/// A byte string somewhere in a CBOR tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteStringAt<'a> {
    /// `$` is the root; `.key` a text key, `{k}` any other key, `[i]` an
    /// array index, `(t)` the content of tag `t`.
    pub path: String,
    pub bytes: &'a [u8],
}

/// Every byte string in `root`, depth first in wire order.
pub fn byte_strings(root: &CborValue) -> Vec<ByteStringAt<'_>> {
    let mut out = Vec::new();
    walk(root, &mut String::from("$"), &mut out);
    out
}

fn walk<'a>(v: &'a CborValue, path: &mut String, out: &mut Vec<ByteStringAt<'a>>) {
    let len = path.len();
    match v {
        CborValue::ByteString(b) => out.push(ByteStringAt {
            path: path.clone(),
            bytes: b,
        }),
        CborValue::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                let _ = write!(path, "[{i}]");
                walk(item, path, out);
                path.truncate(len);
            }
        }
        CborValue::Map(entries) => {
            for (k, item) in entries {
                let _ = match k {
                    CborValue::TextString(s) => write!(path, ".{s}"),
                    other => write!(path, "{{{other}}}"),
                };
                walk(item, path, out);
                path.truncate(len);
            }
        }
        CborValue::Tagged(tag, inner) => {
            let _ = write!(path, "({tag})");
            walk(inner, path, out);
            path.truncate(len);
        }
        _ => {}
    }
}

/// Pick the authenticator data candidate: the largest byte string of at
/// least [`MIN_AUTH_DATA_LEN`] bytes, else the largest of at least
/// [`FALLBACK_AUTH_DATA_LEN`].  Ties go to the first in wire order.
pub fn fallback_scan(root: &CborValue) -> Option<ByteStringAt<'_>> {
    let candidates = byte_strings(root);

    let largest = |min: usize| {
        candidates
            .iter()
            .filter(|c| c.bytes.len() >= min)
            .fold(None::<&ByteStringAt<'_>>, |best, c| match best {
                Some(b) if b.bytes.len() >= c.bytes.len() => Some(b),
                _ => Some(c),
            })
            .cloned()
    };

    largest(MIN_AUTH_DATA_LEN).or_else(|| largest(FALLBACK_AUTH_DATA_LEN))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes(n: usize) -> CborValue {
        CborValue::ByteString(vec![0; n])
    }

    fn text(s: &str) -> CborValue {
        CborValue::TextString(s.to_string())
    }

    #[test]
    fn primary_prefers_first_listed_key() {
        let m = CborValue::Map(vec![
            (text("format"), text("b")),
            (text("fmt"), text("a")),
            (text("attestationStatement"), CborValue::Map(vec![])),
        ]);
        let p = primary_lookup(&m);

        assert_eq!(p.fmt.map(|f| f.key), Some("fmt"));
        assert_eq!(p.fmt.and_then(|f| f.value.as_text()), Some("a"));
        assert_eq!(p.att_stmt.map(|f| f.key), Some("attestationStatement"));
        assert_eq!(p.auth_data, None);
    }

    #[test]
    fn primary_on_non_map() {
        assert_eq!(primary_lookup(&bytes(40)), PrimaryFields::default());
    }

    #[test]
    fn paths() {
        let m = CborValue::Map(vec![
            (text("a"), CborValue::Array(vec![CborValue::Null, bytes(1)])),
            (CborValue::Negative(-1), bytes(2)),
            (text("t"), CborValue::Tagged(24, Box::new(bytes(3)))),
        ]);
        let paths: Vec<_> = byte_strings(&m).into_iter().map(|b| b.path).collect();

        assert_eq!(paths, vec!["$.a[1]", "${-1}", "$.t(24)"]);
    }

    #[test]
    fn largest_above_threshold() {
        let m = CborValue::Map(vec![
            (text("small"), bytes(36)),
            (CborValue::Negative(-2), bytes(37)),
            (text("x"), CborValue::Array(vec![bytes(120), bytes(120)])),
        ]);
        let hit = fallback_scan(&m).unwrap();

        assert_eq!(hit.path, "$.x[0]");
        assert_eq!(hit.bytes.len(), 120);
    }

    #[test]
    fn last_resort_threshold() {
        let m = CborValue::Map(vec![
            (text("a"), bytes(29)),
            (text("b"), bytes(31)),
            (text("c"), bytes(30)),
        ]);
        let hit = fallback_scan(&m).unwrap();
        assert_eq!(hit.path, "$.b");

        let m = CborValue::Map(vec![(text("a"), bytes(29))]);
        assert_eq!(fallback_scan(&m), None);
    }
}
