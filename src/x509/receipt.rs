// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! CMS (RFC 5652) `SignedData` as used by Apple for App Attest receipts.
//! Only the structure is decoded; nothing is verified.

use super::algorithm::AlgorithmIdentifier;
use super::certificate::X509Certificate;
use super::errors::{Field, X509Error};
use super::oids;
use crate::asn1::{primitives, Asn1Error, DerReader, Oid, Tag, Tlv};
use serde::Serialize;
use serde_with::{hex::Hex, serde_as};

/// Receipt attribute types documented by Apple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReceiptField {
    AppId,
    AttestedPublicKey,
    ClientHash,
    Token,
    ReceiptType,
    CreationTime,
    RiskMetric,
    NotBefore,
    ExpirationTime,
}

impl ReceiptField {
    pub fn from_type(t: u64) -> Option<Self> {
        let f = match t {
            2 => ReceiptField::AppId,
            3 => ReceiptField::AttestedPublicKey,
            4 => ReceiptField::ClientHash,
            5 => ReceiptField::Token,
            6 => ReceiptField::ReceiptType,
            12 => ReceiptField::CreationTime,
            17 => ReceiptField::RiskMetric,
            19 => ReceiptField::NotBefore,
            21 => ReceiptField::ExpirationTime,
            _ => return None,
        };
        Some(f)
    }
}

/// `SEQUENCE { type INTEGER, version INTEGER, value OCTET STRING }`
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReceiptAttribute {
    pub field_type: u64,
    pub field: Option<ReceiptField>,
    pub version: u64,
    #[serde_as(as = "Hex")]
    pub value: Vec<u8>,
}

impl ReceiptAttribute {
    /// The value as text, for the string-typed fields (app id, receipt type,
    /// risk metric, timestamps).
    pub fn as_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.value).ok()
    }
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignerInfo {
    pub version: u64,
    /// DER of the `SignerIdentifier` choice.
    #[serde_as(as = "Hex")]
    pub sid: Vec<u8>,
    pub digest_algorithm: AlgorithmIdentifier,
    /// DER of the `[0] IMPLICIT` signed attributes, if present.
    #[serde_as(as = "Option<Hex>")]
    pub signed_attributes: Option<Vec<u8>>,
    pub signature_algorithm: AlgorithmIdentifier,
    #[serde_as(as = "Hex")]
    pub signature: Vec<u8>,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedData {
    pub version: u64,
    pub digest_algorithms: Vec<AlgorithmIdentifier>,
    pub content_type: Oid,
    #[serde_as(as = "Option<Hex>")]
    pub content: Option<Vec<u8>>,
    /// DER of every entry of the `certificates` set, in order.
    #[serde_as(as = "Vec<Hex>")]
    pub certificates: Vec<Vec<u8>>,
    pub signer_infos: Vec<SignerInfo>,
    /// The encapsulated content split into receipt attributes, when it is a
    /// receipt attribute set.  Empty otherwise.
    pub attributes: Vec<ReceiptAttribute>,
    #[serde_as(as = "Hex")]
    pub raw: Vec<u8>,
}

impl SignedData {
    /// Decode a DER `ContentInfo` wrapping `SignedData`.
    ///
    /// Only definite lengths are read.  Receipts encoded as BER with
    /// indefinite lengths (`30 80 ...`), which is how Apple ships some of
    /// them, fail with `InvalidLength`; the bytes stay available in
    /// [`AppleAppAttestExtension::Receipt`](super::AppleAppAttestExtension::Receipt).
    pub fn parse(der: &[u8]) -> Result<Self, X509Error> {
        let mut outer = DerReader::new(der);
        let content_info = outer.read_expected(Tag::SEQUENCE).receipt_field("contentInfo")?;

        let mut ci = content_info.reader();
        let content_type = ci
            .read_tlv()
            .and_then(|t| Oid::from_tlv(&t))
            .receipt_field("contentType")?;
        if !content_type.is(oids::CMS_SIGNED_DATA) {
            return Err(X509Error::MalformedReceipt {
                field: "contentType",
                source: Asn1Error::InvalidValue {
                    what: "signedData content type",
                    offset: content_info.value_offset(),
                },
            });
        }

        let mut explicit = ci
            .read_constructed(Tag::context(0, true))
            .receipt_field("content")?;
        let mut sd = explicit
            .read_constructed(Tag::SEQUENCE)
            .receipt_field("signedData")?;

        let version = sd
            .read_tlv()
            .and_then(|t| primitives::uint(&t))
            .receipt_field("version")?;

        let digest_algorithms = sd
            .read_constructed(Tag::SET)
            .and_then(|mut set| {
                let mut v = Vec::new();
                while !set.is_empty() {
                    v.push(AlgorithmIdentifier::from_tlv(&set.read_tlv()?)?);
                }
                Ok(v)
            })
            .receipt_field("digestAlgorithms")?;

        let (content_type_inner, content) = Self::encapsulated_content(&mut sd)?;

        let certificates = sd
            .read_optional(Tag::context(0, true))
            .and_then(|o| match o {
                Some(t) => Ok(t
                    .reader()
                    .read_all()?
                    .iter()
                    .map(|c| c.raw().to_vec())
                    .collect::<Vec<_>>()),
                None => Ok(Vec::new()),
            })
            .receipt_field("certificates")?;

        // revocation info is not needed, skip it
        sd.read_optional(Tag::context(1, true)).receipt_field("crls")?;

        let signer_infos = sd
            .read_constructed(Tag::SET)
            .and_then(|mut set| {
                let mut v = Vec::new();
                while !set.is_empty() {
                    v.push(Self::signer_info(&set.read_tlv()?)?);
                }
                Ok(v)
            })
            .receipt_field("signerInfos")?;

        let attributes = match &content {
            Some(c) => receipt_attributes(c).receipt_field("receiptAttributes")?,
            None => Vec::new(),
        };

        Ok(Self {
            version,
            digest_algorithms,
            content_type: content_type_inner,
            content,
            certificates,
            signer_infos,
            attributes,
            raw: content_info.raw().to_vec(),
        })
    }

    fn encapsulated_content(
        sd: &mut DerReader<'_>,
    ) -> Result<(Oid, Option<Vec<u8>>), X509Error> {
        let mut eci = sd
            .read_constructed(Tag::SEQUENCE)
            .receipt_field("encapContentInfo")?;
        let content_type = eci
            .read_tlv()
            .and_then(|t| Oid::from_tlv(&t))
            .receipt_field("eContentType")?;
        let content = eci
            .read_optional(Tag::context(0, true))
            .and_then(|o| match o {
                Some(t) => {
                    let os = t.reader().read_tlv()?;
                    primitives::octet_string(&os).map(|v| Some(v.to_vec()))
                }
                None => Ok(None),
            })
            .receipt_field("eContent")?;

        Ok((content_type, content))
    }

    fn signer_info(tlv: &Tlv<'_>) -> Result<SignerInfo, Asn1Error> {
        let mut r = tlv.expect(Tag::SEQUENCE)?.reader();

        let version = primitives::uint(&r.read_tlv()?)?;
        let sid = r.read_tlv()?.raw().to_vec();
        let digest_algorithm = AlgorithmIdentifier::from_tlv(&r.read_tlv()?)?;
        let signed_attributes = r
            .read_optional(Tag::context(0, true))?
            .map(|t| t.raw().to_vec());
        let signature_algorithm = AlgorithmIdentifier::from_tlv(&r.read_tlv()?)?;
        let signature = primitives::octet_string(&r.read_tlv()?)?.to_vec();

        Ok(SignerInfo {
            version,
            sid,
            digest_algorithm,
            signed_attributes,
            signature_algorithm,
            signature,
        })
    }

    /// Parse every embedded certificate independently.
    pub fn parsed_certificates(&self) -> Vec<Result<X509Certificate, X509Error>> {
        self.certificates
            .iter()
            .map(|c| X509Certificate::parse(c))
            .collect()
    }

    /// First attribute of the given kind.
    pub fn attribute(&self, field: ReceiptField) -> Option<&ReceiptAttribute> {
        self.attributes.iter().find(|a| a.field == Some(field))
    }
}

/// Split Apple's receipt payload (a SET of typed attributes) into its parts.
/// Content that does not start with a SET is not a receipt payload and yields
/// no attributes.
fn receipt_attributes(content: &[u8]) -> Result<Vec<ReceiptAttribute>, Asn1Error> {
    let mut r = DerReader::new(content);
    if r.peek_tag()? != Some(Tag::SET) {
        return Ok(Vec::new());
    }

    let mut set = r.read_constructed(Tag::SET)?;
    let mut attributes = Vec::new();
    while !set.is_empty() {
        let mut a = set.read_constructed(Tag::SEQUENCE)?;
        let field_type = primitives::uint(&a.read_tlv()?)?;
        let version = primitives::uint(&a.read_tlv()?)?;
        let value = primitives::octet_string(&a.read_tlv()?)?.to_vec();

        attributes.push(ReceiptAttribute {
            field_type,
            field: ReceiptField::from_type(field_type),
            version,
            value,
        });
    }

    Ok(attributes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    fn der(tag: u8, content: &[u8]) -> Vec<u8> {
        let mut v = vec![tag];
        let n = content.len();
        if n < 0x80 {
            v.push(n as u8);
        } else {
            v.extend_from_slice(&[0x82, (n >> 8) as u8, n as u8]);
        }
        v.extend_from_slice(content);
        v
    }

    fn attribute(field_type: u8, value: &[u8]) -> Vec<u8> {
        let body = [
            der(0x02, &[field_type]),
            der(0x02, &[1]),
            der(0x04, value),
        ]
        .concat();
        der(0x30, &body)
    }

    // ContentInfo {
    //   signedData,
    //   [0] SignedData {
    //     version 1,
    //     digestAlgorithms { sha256 },
    //     encapContentInfo { data, [0] OCTET STRING <receipt> },
    //     signerInfos { SignerInfo { 1, sid, sha256, ecdsa-with-SHA256, sig } }
    //   }
    // }
    fn signed_data(econtent: &[u8]) -> Vec<u8> {
        let econtent = der(0xa0, &der(0x04, econtent));
        let eci = der(
            0x30,
            &[hex!("06092a864886f70d010701").as_slice(), &econtent].concat(),
        );

        let digest_algs = der(0x31, &hex!("300d 0609608648016503040201 0500"));
        let signer = der(
            0x30,
            &[
                hex!("020101").as_slice(),
                &hex!("3006 3000 020201f4"),
                &hex!("300d 0609608648016503040201 0500"),
                &hex!("300a 06082a8648ce3d040302"),
                &hex!("0404 deadbeef"),
            ]
            .concat(),
        );
        let signer_infos = der(0x31, &signer);

        let sd = der(
            0x30,
            &[hex!("020101").as_slice(), &digest_algs, &eci, &signer_infos].concat(),
        );

        der(
            0x30,
            &[hex!("06092a864886f70d010702").as_slice(), &der(0xa0, &sd)].concat(),
        )
    }

    // receipt SET { { 2, 1, "T.app" }, { 6, 1, "ATTEST" }, { 99, 1, 0x00 } }
    fn sample() -> Vec<u8> {
        let receipt = der(
            0x31,
            &[
                attribute(2, b"T.app"),
                attribute(6, b"ATTEST"),
                attribute(99, &[0]),
            ]
            .concat(),
        );
        signed_data(&receipt)
    }

    #[test]
    fn signed_data_structure() {
        let buf = sample();
        let sd = SignedData::parse(&buf).unwrap();

        assert_eq!(sd.version, 1);
        assert_eq!(sd.digest_algorithms.len(), 1);
        assert_eq!(sd.digest_algorithms[0].name, Some("sha256"));
        assert!(sd.content_type.is(oids::CMS_DATA));
        assert!(sd.certificates.is_empty());
        assert_eq!(sd.signer_infos.len(), 1);
        assert_eq!(sd.signer_infos[0].signature, hex!("deadbeef"));
        assert_eq!(sd.signer_infos[0].signature_algorithm.name, Some("ecdsa-with-SHA256"));
        assert_eq!(sd.raw, buf);
    }

    #[test]
    fn receipt_attributes_are_typed() {
        let sd = SignedData::parse(&sample()).unwrap();

        assert_eq!(sd.attributes.len(), 3);
        assert_eq!(
            sd.attribute(ReceiptField::AppId).and_then(|a| a.as_text()),
            Some("T.app")
        );
        assert_eq!(
            sd.attribute(ReceiptField::ReceiptType).and_then(|a| a.as_text()),
            Some("ATTEST")
        );
        assert_eq!(sd.attributes[2].field_type, 99);
        assert_eq!(sd.attributes[2].field, None);
        assert_eq!(sd.attributes[2].value, vec![0]);
    }

    #[test]
    fn wrong_content_type() {
        let mut buf = sample();
        let oid = hex!("2a864886f70d010702");
        let at = buf.windows(oid.len()).position(|w| w == oid).unwrap();
        // signedData -> data
        buf[at + oid.len() - 1] = 0x01;

        assert!(matches!(
            SignedData::parse(&buf),
            Err(X509Error::MalformedReceipt {
                field: "contentType",
                ..
            })
        ));
    }

    #[test]
    fn opaque_content_has_no_attributes() {
        let sd = SignedData::parse(&signed_data(b"not a set")).unwrap();

        assert_eq!(sd.content.as_deref(), Some(&b"not a set"[..]));
        assert!(sd.attributes.is_empty());
    }

    #[test]
    fn malformed_attribute_set() {
        // SET { SEQUENCE { INTEGER 2 } }
        let err = SignedData::parse(&signed_data(&hex!("3105 3003 020102"))).unwrap_err();

        assert_eq!(err.field(), "receiptAttributes");
    }

    #[test]
    fn truncated_content_info() {
        let buf = sample();
        let err = SignedData::parse(&buf[..buf.len() - 3]).unwrap_err();

        assert_eq!(err.field(), "contentInfo");
    }

    #[test]
    fn indefinite_length_receipt() {
        // BER ContentInfo { signedData, [0] { ... } } with indefinite lengths
        let buf = hex!("3080 06092a864886f70d010702 a080 3080 0000 0000 0000");

        assert!(matches!(
            SignedData::parse(&buf),
            Err(X509Error::MalformedReceipt {
                field: "contentInfo",
                source: Asn1Error::InvalidLength { .. },
            })
        ));
    }
}
