// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::reader::Tag;

/// DER decoding errors.  Offsets are absolute within the buffer the outermost
/// [`super::DerReader`] was created over.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Asn1Error {
    #[error("truncated TLV at offset {offset}")]
    TruncatedTlv { offset: usize },
    #[error("invalid length encoding at offset {offset}")]
    InvalidLength { offset: usize },
    #[error("TLV at offset {offset} claims {length} byte(s), only {available} available")]
    LengthExceedsBuffer {
        offset: usize,
        length: usize,
        available: usize,
    },
    #[error("expected {expected} at offset {offset}, found {found}")]
    UnexpectedTag {
        expected: Tag,
        found: Tag,
        offset: usize,
    },
    #[error("invalid {what} at offset {offset}")]
    InvalidValue { what: &'static str, offset: usize },
}

impl Asn1Error {
    pub fn offset(&self) -> usize {
        match self {
            Asn1Error::TruncatedTlv { offset }
            | Asn1Error::InvalidLength { offset }
            | Asn1Error::LengthExceedsBuffer { offset, .. }
            | Asn1Error::UnexpectedTag { offset, .. }
            | Asn1Error::InvalidValue { offset, .. } => *offset,
        }
    }

    /// True when the bytes are not a valid TLV sequence at all, as opposed
    /// to well-formed DER of an unexpected shape.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Asn1Error::TruncatedTlv { .. }
                | Asn1Error::InvalidLength { .. }
                | Asn1Error::LengthExceedsBuffer { .. }
        )
    }
}
