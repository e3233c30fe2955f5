// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::oids;
use crate::asn1::{primitives, Asn1Error, DerReader, Oid, Tag, Tlv};
use serde::Serialize;
use serde_with::{hex::Hex, serde_as};
use std::fmt;

/// One `AttributeTypeAndValue` of a distinguished name.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameAttribute {
    pub oid: Oid,
    /// Short name (`CN`, `O`, ...) when the OID is a common one.
    pub short_name: Option<&'static str>,
    /// Decoded value when it is one of the character string types.
    pub value: Option<String>,
    /// DER of the value, whatever its type.
    #[serde_as(as = "Hex")]
    pub raw_value: Vec<u8>,
}

/// An X.501 `Name`, flattened into its attributes in encoding order.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistinguishedName {
    pub attributes: Vec<NameAttribute>,
    #[serde_as(as = "Hex")]
    pub raw: Vec<u8>,
}

impl DistinguishedName {
    /// `Name ::= SEQUENCE OF SET OF SEQUENCE { type OID, value ANY }`
    pub fn from_tlv(tlv: &Tlv<'_>) -> Result<Self, Asn1Error> {
        let mut rdns = tlv.expect(Tag::SEQUENCE)?.reader();
        let mut attributes = Vec::new();

        while !rdns.is_empty() {
            let mut set = rdns.read_constructed(Tag::SET)?;
            while !set.is_empty() {
                attributes.push(Self::attribute(&mut set)?);
            }
        }

        Ok(Self {
            attributes,
            raw: tlv.raw().to_vec(),
        })
    }

    fn attribute(set: &mut DerReader<'_>) -> Result<NameAttribute, Asn1Error> {
        let mut atv = set.read_constructed(Tag::SEQUENCE)?;
        let oid = Oid::from_tlv(&atv.read_tlv()?)?;
        let value_tlv = atv.read_tlv()?;

        // content that does not match its string tag is left to raw_value
        let value = if primitives::is_string(value_tlv.tag) {
            primitives::string(&value_tlv).ok()
        } else {
            None
        };

        Ok(NameAttribute {
            short_name: oids::name(&oid),
            oid,
            value,
            raw_value: value_tlv.raw().to_vec(),
        })
    }

    /// First value for the attribute with the given arcs.
    pub fn get(&self, arcs: &[u64]) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.oid.is(arcs))
            .and_then(|a| a.value.as_deref())
    }

    pub fn common_name(&self) -> Option<&str> {
        self.get(oids::CN)
    }

    pub fn organization(&self) -> Option<&str> {
        self.get(oids::O)
    }
}

/// `CN=Apple App Attestation CA 1, O=Apple Inc., ST=California`
impl fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, a) in self.attributes.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match a.short_name {
                Some(n) => write!(f, "{n}=")?,
                None => write!(f, "{}=", a.oid)?,
            }
            match &a.value {
                Some(v) => f.write_str(v)?,
                None => write!(f, "#{}", hex::encode(&a.raw_value))?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    // SEQUENCE {
    //   SET { SEQUENCE { CN, UTF8String "Apple App Attestation CA 1" } }
    //   SET { SEQUENCE { O, UTF8String "Apple Inc." } }
    //   SET { SEQUENCE { C, PrintableString "US" },
    //         SEQUENCE { 1.2.3.4, INTEGER 7 } }
    // }
    const NAME: [u8; 83] = hex!(
        "3051"
        "3123 3021 0603550403 0c1a 4170706c652041707020417474657374617469 6f6e2043412031"
        "3113 3011 060355040a 0c0a 4170706c6520496e632e"
        "3115 3009 0603550406 1302 5553 3008 06032a0304 020107"
    );

    #[test]
    fn ordered_attributes() {
        let tlv = DerReader::new(&NAME).read_tlv().unwrap();
        let dn = DistinguishedName::from_tlv(&tlv).unwrap();

        assert_eq!(dn.attributes.len(), 4);
        assert_eq!(dn.common_name(), Some("Apple App Attestation CA 1"));
        assert_eq!(dn.organization(), Some("Apple Inc."));
        assert_eq!(dn.get(oids::C), Some("US"));
        assert_eq!(dn.attributes[3].short_name, None);
        assert_eq!(dn.attributes[3].value, None);
        assert_eq!(dn.attributes[3].raw_value, hex!("020107"));
        assert_eq!(
            dn.to_string(),
            "CN=Apple App Attestation CA 1, O=Apple Inc., C=US, 1.2.3.4=#020107"
        );
        assert_eq!(dn.raw, NAME);
    }

    #[test]
    fn mismatched_string_content() {
        // SEQUENCE { SET { SEQUENCE { O, PrintableString holding UTF-8 "Café" } } }
        let buf = hex!("3010 310e 300c 060355040a 1305 436166c3a9");
        let tlv = DerReader::new(&buf).read_tlv().unwrap();
        let dn = DistinguishedName::from_tlv(&tlv).unwrap();

        assert_eq!(dn.organization(), None);
        assert_eq!(dn.attributes[0].short_name, Some("O"));
        assert_eq!(dn.attributes[0].raw_value, hex!("1305 436166c3a9"));
        assert_eq!(dn.to_string(), "O=#1305436166c3a9");
    }

    #[test]
    fn rejects_non_set_rdn() {
        let buf = hex!("3004 3002 0500");
        let tlv = DerReader::new(&buf).read_tlv().unwrap();

        assert!(matches!(
            DistinguishedName::from_tlv(&tlv),
            Err(Asn1Error::UnexpectedTag { .. })
        ));
    }
}
