// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::oids;
use crate::asn1::{Asn1Error, Oid, Tag, Tlv};
use serde::Serialize;
use serde_with::{hex::Hex, serde_as};

/// `AlgorithmIdentifier ::= SEQUENCE { algorithm OID, parameters ANY OPTIONAL }`
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlgorithmIdentifier {
    pub oid: Oid,
    pub name: Option<&'static str>,
    /// DER of the parameters, if any (NULL included).
    #[serde_as(as = "Option<Hex>")]
    pub parameters: Option<Vec<u8>>,
}

impl AlgorithmIdentifier {
    pub fn from_tlv(tlv: &Tlv<'_>) -> Result<Self, Asn1Error> {
        let mut r = tlv.expect(Tag::SEQUENCE)?.reader();
        let oid = Oid::from_tlv(&r.read_tlv()?)?;
        let parameters = if r.is_empty() {
            None
        } else {
            Some(r.read_tlv()?.raw().to_vec())
        };

        Ok(Self {
            name: oids::name(&oid),
            oid,
            parameters,
        })
    }

    /// The parameters as an OID, which is how EC keys name their curve.
    pub fn parameters_oid(&self) -> Option<Oid> {
        let p = self.parameters.as_deref()?;
        let tlv = crate::asn1::DerReader::new(p).read_tlv().ok()?;
        Oid::from_tlv(&tlv).ok()
    }
}
