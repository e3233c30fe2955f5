// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use serde::Serialize;
use serde_with::{hex::Hex, serde_as};
use std::fmt;

/// A decoded CBOR data item.
///
/// Maps keep their entries in wire order and may hold duplicate keys: App
/// Attest objects are not always canonically encoded and the decoder must not
/// hide that.  Lookups through [`CborValue::get`] and [`CborValue::get_label`]
/// return the first matching entry.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CborValue {
    Unsigned(u64),
    Negative(i64),
    ByteString(#[serde_as(as = "Hex")] Vec<u8>),
    TextString(String),
    Array(Vec<CborValue>),
    Map(Vec<(CborValue, CborValue)>),
    Tagged(u64, Box<CborValue>),
    /// Simple value.  Floating point items are surfaced as `Simple(25)`,
    /// `Simple(26)` or `Simple(27)` (half, single, double precision) without
    /// their payload.
    Simple(u8),
    Boolean(bool),
    Null,
    Undefined,
}

impl CborValue {
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            CborValue::ByteString(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CborValue::TextString(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[CborValue]> {
        match self {
            CborValue::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(CborValue, CborValue)]> {
        match self {
            CborValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Integer view of major types 0 and 1.  Unsigned values above
    /// `i64::MAX` have no such view.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CborValue::Unsigned(u) => i64::try_from(*u).ok(),
            CborValue::Negative(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CborValue::Null)
    }

    /// Strip every tag wrapper.
    pub fn untagged(&self) -> &CborValue {
        let mut v = self;
        while let CborValue::Tagged(_, inner) = v {
            v = inner;
        }
        v
    }

    /// First value stored under the text key `key`, if this is a map.
    pub fn get(&self, key: &str) -> Option<&CborValue> {
        self.as_map()?
            .iter()
            .find(|(k, _)| k.as_text() == Some(key))
            .map(|(_, v)| v)
    }

    /// First value stored under the integer key `label`, if this is a map.
    pub fn get_label(&self, label: i64) -> Option<&CborValue> {
        self.as_map()?
            .iter()
            .find(|(k, _)| k.as_i64() == Some(label))
            .map(|(_, v)| v)
    }

    /// Human readable description of every key of a map, in wire order.
    /// Empty for non-map values.
    pub fn key_labels(&self) -> Vec<String> {
        self.as_map()
            .map(|m| m.iter().map(|(k, _)| k.key_label()).collect())
            .unwrap_or_default()
    }

    /// Short description of this value when used as a map key: text keys are
    /// reported verbatim, integers in decimal, anything else in diagnostic
    /// notation.
    pub fn key_label(&self) -> String {
        match self {
            CborValue::TextString(s) => s.clone(),
            other => other.to_string(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            CborValue::Unsigned(_) => "unsigned integer",
            CborValue::Negative(_) => "negative integer",
            CborValue::ByteString(_) => "byte string",
            CborValue::TextString(_) => "text string",
            CborValue::Array(_) => "array",
            CborValue::Map(_) => "map",
            CborValue::Tagged(..) => "tagged value",
            CborValue::Simple(_) => "simple value",
            CborValue::Boolean(_) => "boolean",
            CborValue::Null => "null",
            CborValue::Undefined => "undefined",
        }
    }
}

/// RFC 8949 diagnostic notation.
impl fmt::Display for CborValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CborValue::Unsigned(u) => write!(f, "{u}"),
            CborValue::Negative(n) => write!(f, "{n}"),
            CborValue::ByteString(b) => write!(f, "h'{}'", hex::encode(b)),
            CborValue::TextString(s) => write!(f, "{s:?}"),
            CborValue::Array(a) => {
                f.write_str("[")?;
                for (i, v) in a.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str("]")
            }
            CborValue::Map(m) => {
                f.write_str("{")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
            CborValue::Tagged(t, v) => write!(f, "{t}({v})"),
            CborValue::Simple(s) => write!(f, "simple({s})"),
            CborValue::Boolean(b) => write!(f, "{b}"),
            CborValue::Null => f.write_str("null"),
            CborValue::Undefined => f.write_str("undefined"),
        }
    }
}
