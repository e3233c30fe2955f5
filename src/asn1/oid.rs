// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::errors::Asn1Error;
use super::reader::{Tag, Tlv};
use serde::{Serialize, Serializer};
use std::fmt;

/// An OBJECT IDENTIFIER as its list of arcs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Oid(Vec<u64>);

impl Oid {
    pub fn from_arcs(arcs: &[u64]) -> Self {
        Oid(arcs.to_vec())
    }

    pub fn arcs(&self) -> &[u64] {
        &self.0
    }

    pub fn is(&self, arcs: &[u64]) -> bool {
        self.0 == arcs
    }

    pub fn starts_with(&self, prefix: &[u64]) -> bool {
        self.0.starts_with(prefix)
    }

    /// Decode the value octets of an OBJECT IDENTIFIER.
    pub fn from_der_value(value: &[u8], offset: usize) -> Result<Self, Asn1Error> {
        let invalid = Asn1Error::InvalidValue {
            what: "object identifier",
            offset,
        };

        if value.is_empty() || value[value.len() - 1] & 0x80 != 0 {
            return Err(invalid);
        }

        let mut subids = Vec::new();
        let mut acc: u64 = 0;
        for b in value {
            if acc > (u64::MAX >> 7) {
                return Err(invalid);
            }
            acc = (acc << 7) | u64::from(b & 0x7f);
            if b & 0x80 == 0 {
                subids.push(acc);
                acc = 0;
            }
        }

        // the first subidentifier packs the first two arcs
        let first = subids[0];
        let (a, b) = match first {
            0..=39 => (0, first),
            40..=79 => (1, first - 40),
            _ => (2, first - 80),
        };

        let mut arcs = Vec::with_capacity(subids.len() + 1);
        arcs.push(a);
        arcs.push(b);
        arcs.extend_from_slice(&subids[1..]);

        Ok(Oid(arcs))
    }

    pub fn from_tlv(tlv: &Tlv<'_>) -> Result<Self, Asn1Error> {
        let tlv = tlv.expect(Tag::OID)?;
        Self::from_der_value(tlv.value(), tlv.value_offset())
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, a) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{a}")?;
        }
        Ok(())
    }
}

impl Serialize for Oid {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}
