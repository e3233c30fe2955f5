// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! Apple's private certificate extensions under `1.2.840.113635.100.8`.
//!
//! Apple wraps these payloads inconsistently (bare OCTET STRING, a SEQUENCE
//! holding an explicit `[1]`, ...), so the value is found by descending through
//! single-child constructed nodes until something else is reached.

use super::errors::X509Error;
use super::oids;
use super::receipt::SignedData;
use crate::asn1::{primitives, Asn1Error, Oid, Tag, Tlv};
use serde::Serialize;
use serde_with::{hex::Hex, serde_as};
use tracing::debug;

pub const CHALLENGE: u64 = 2;
pub const RECEIPT: u64 = 3;
pub const OS_VERSION: u64 = 4;
pub const KEY_PURPOSE: u64 = 5;
pub const DEVICE_CLASS: u64 = 6;
pub const ENVIRONMENT: u64 = 7;

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum AppleAppAttestExtension {
    /// `.2`: SHA-256 of authenticator data and client data hash.
    Challenge(#[serde_as(as = "Hex")] Vec<u8>),
    /// `.3`: CMS receipt, see [`AppleAppAttestExtension::receipt`].
    Receipt(#[serde_as(as = "Hex")] Vec<u8>),
    OsVersion(String),
    KeyPurpose(String),
    DeviceClass(String),
    /// `.7`: `production` or `development`.
    Environment(String),
    Unknown {
        arc: u64,
        #[serde_as(as = "Hex")]
        raw: Vec<u8>,
    },
}

enum Leaf<'a> {
    Primitive(Tlv<'a>),
    Constructed(Tlv<'a>),
}

/// Walk down single-child constructed nodes.
fn leaf<'a>(value: &Tlv<'a>) -> Result<Leaf<'a>, Asn1Error> {
    let mut node = value.reader().read_tlv()?;
    loop {
        if !node.tag.constructed() {
            return Ok(Leaf::Primitive(node));
        }
        let children = node.reader().read_all()?;
        match children.as_slice() {
            [only] => node = *only,
            _ => return Ok(Leaf::Constructed(node)),
        }
    }
}

fn bytes(value: &Tlv<'_>) -> Result<Vec<u8>, Asn1Error> {
    match leaf(value)? {
        Leaf::Primitive(t) => Ok(t.value().to_vec()),
        Leaf::Constructed(t) => Ok(t.raw().to_vec()),
    }
}

fn text(value: &Tlv<'_>) -> Result<String, Asn1Error> {
    let t = match leaf(value)? {
        Leaf::Primitive(t) => t,
        Leaf::Constructed(t) => {
            return Err(Asn1Error::InvalidValue {
                what: "apple extension text",
                offset: t.offset,
            })
        }
    };

    if primitives::is_string(t.tag) {
        return primitives::string(&t);
    }
    match t.tag {
        Tag::INTEGER => primitives::uint(&t).map(|n| n.to_string()),
        Tag::OCTET_STRING => std::str::from_utf8(t.value())
            .map(str::to_string)
            .map_err(|_| Asn1Error::InvalidValue {
                what: "apple extension text",
                offset: t.value_offset(),
            }),
        _ => Err(Asn1Error::InvalidValue {
            what: "apple extension text",
            offset: t.offset,
        }),
    }
}

impl AppleAppAttestExtension {
    /// Decode the `extnValue` OCTET STRING of an extension whose OID lies
    /// under the App Attest arc.
    pub fn from_tlv(oid: &Oid, value: &Tlv<'_>) -> Result<Self, Asn1Error> {
        let value = value.expect(Tag::OCTET_STRING)?;
        let arcs = oid.arcs();
        let prefix = oids::APPLE_APP_ATTEST_ARC.len();

        let arc = match arcs.get(prefix) {
            Some(a) if arcs.len() == prefix + 1 => *a,
            // deeper or bare-arc OIDs have no known meaning
            other => {
                return Ok(AppleAppAttestExtension::Unknown {
                    arc: other.copied().unwrap_or(0),
                    raw: value.value().to_vec(),
                })
            }
        };

        let unknown = || AppleAppAttestExtension::Unknown {
            arc,
            raw: value.value().to_vec(),
        };

        let decoded = match arc {
            CHALLENGE => bytes(&value).map(AppleAppAttestExtension::Challenge),
            RECEIPT => bytes(&value).map(AppleAppAttestExtension::Receipt),
            OS_VERSION => text(&value).map(AppleAppAttestExtension::OsVersion),
            KEY_PURPOSE => text(&value).map(AppleAppAttestExtension::KeyPurpose),
            DEVICE_CLASS => text(&value).map(AppleAppAttestExtension::DeviceClass),
            ENVIRONMENT => text(&value).map(AppleAppAttestExtension::Environment),
            _ => Ok(unknown()),
        };

        match decoded {
            // well-formed but not the usual shape: keep the bytes
            Err(e) if !e.is_malformed() => {
                debug!(arc, error = %e, "apple extension has an unexpected shape");
                Ok(unknown())
            }
            r => r,
        }
    }

    /// Position under the App Attest arc.
    pub fn arc(&self) -> u64 {
        match self {
            AppleAppAttestExtension::Challenge(_) => CHALLENGE,
            AppleAppAttestExtension::Receipt(_) => RECEIPT,
            AppleAppAttestExtension::OsVersion(_) => OS_VERSION,
            AppleAppAttestExtension::KeyPurpose(_) => KEY_PURPOSE,
            AppleAppAttestExtension::DeviceClass(_) => DEVICE_CLASS,
            AppleAppAttestExtension::Environment(_) => ENVIRONMENT,
            AppleAppAttestExtension::Unknown { arc, .. } => *arc,
        }
    }

    /// Decode the CMS structure of a receipt extension.
    pub fn receipt(&self) -> Option<Result<SignedData, X509Error>> {
        match self {
            AppleAppAttestExtension::Receipt(der) => Some(SignedData::parse(der)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asn1::DerReader;
    use hex_literal::hex;

    fn decode(arc: u64, extn_value: &[u8]) -> Result<AppleAppAttestExtension, Asn1Error> {
        let mut arcs = oids::APPLE_APP_ATTEST_ARC.to_vec();
        arcs.push(arc);
        let tlv = DerReader::new(extn_value).read_tlv().unwrap();
        AppleAppAttestExtension::from_tlv(&Oid::from_arcs(&arcs), &tlv)
    }

    #[test]
    fn challenge_under_explicit_tag() {
        // OCTET STRING { SEQUENCE { [1] { OCTET STRING 0102..20 } } }
        let mut nonce = Vec::new();
        nonce.extend(1..=32u8);
        let mut buf = hex!("0426 3024 a122 0420").to_vec();
        buf.extend_from_slice(&nonce);

        let ext = decode(CHALLENGE, &buf).unwrap();
        assert_eq!(ext, AppleAppAttestExtension::Challenge(nonce));
        assert_eq!(ext.arc(), 2);
        assert!(ext.receipt().is_none());
    }

    #[test]
    fn environment_string() {
        let buf = hex!("040c 0c0a 70726f64756374696f6e");
        assert_eq!(
            decode(ENVIRONMENT, &buf).unwrap(),
            AppleAppAttestExtension::Environment("production".to_string())
        );

        // UTF-8 bytes in an OCTET STRING under an explicit tag
        let buf = hex!("0411 300f a50d 040b 646576656c6f706d656e74");
        assert_eq!(
            decode(ENVIRONMENT, &buf).unwrap(),
            AppleAppAttestExtension::Environment("development".to_string())
        );
    }

    #[test]
    fn os_version_integer() {
        let buf = hex!("0407 3005 a403 020111");
        assert_eq!(
            decode(OS_VERSION, &buf).unwrap(),
            AppleAppAttestExtension::OsVersion("17".to_string())
        );
    }

    #[test]
    fn unknown_arc_keeps_bytes() {
        let buf = hex!("0403 0101ff");
        assert_eq!(
            decode(9, &buf).unwrap(),
            AppleAppAttestExtension::Unknown {
                arc: 9,
                raw: hex!("0101ff").to_vec(),
            }
        );
    }

    #[test]
    fn receipt_keeps_content_info() {
        // ContentInfo has two children, so descent stops there
        let buf = hex!("040f 300d 06092a864886f70d010702 a000");
        let ext = decode(RECEIPT, &buf).unwrap();

        assert_eq!(
            ext,
            AppleAppAttestExtension::Receipt(hex!("300d 06092a864886f70d010702 a000").to_vec())
        );
        assert!(matches!(ext.receipt(), Some(Err(_))));
    }

    #[test]
    fn unexpected_shape_keeps_bytes() {
        // SEQUENCE { UTF8String "a", UTF8String "b" }
        let buf = hex!("0408 3006 0c0161 0c0162");
        assert_eq!(
            decode(KEY_PURPOSE, &buf).unwrap(),
            AppleAppAttestExtension::Unknown {
                arc: KEY_PURPOSE,
                raw: hex!("3006 0c0161 0c0162").to_vec(),
            }
        );

        let buf = hex!("0403 0101ff");
        assert_eq!(
            decode(ENVIRONMENT, &buf).unwrap(),
            AppleAppAttestExtension::Unknown {
                arc: ENVIRONMENT,
                raw: hex!("0101ff").to_vec(),
            }
        );

        // OCTET STRING holding bytes that are not UTF-8
        let buf = hex!("0404 0402 fffe");
        assert_eq!(decode(DEVICE_CLASS, &buf).unwrap().arc(), DEVICE_CLASS);
    }

    #[test]
    fn empty_value_is_an_error() {
        let buf = hex!("0400");
        assert_eq!(
            decode(KEY_PURPOSE, &buf),
            Err(Asn1Error::TruncatedTlv { offset: 2 })
        );
    }
}
