// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::apple::AppleAppAttestExtension;
use super::errors::{Field, X509Error};
use super::name::DistinguishedName;
use super::oids;
use crate::asn1::{primitives, Asn1Error, Oid, Tag, Tlv};
use serde::Serialize;
use serde_with::{hex::Hex, serde_as};

/// The keyUsage bits (RFC 5280, 4.2.1.3).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KeyUsage {
    pub digital_signature: bool,
    pub non_repudiation: bool,
    pub key_encipherment: bool,
    pub data_encipherment: bool,
    pub key_agreement: bool,
    pub key_cert_sign: bool,
    pub crl_sign: bool,
    pub encipher_only: bool,
    pub decipher_only: bool,
}

impl KeyUsage {
    fn from_value(tlv: &Tlv<'_>) -> Result<Self, Asn1Error> {
        let bits = primitives::bit_string(tlv)?;
        Ok(Self {
            digital_signature: bits.bit(0),
            non_repudiation: bits.bit(1),
            key_encipherment: bits.bit(2),
            data_encipherment: bits.bit(3),
            key_agreement: bits.bit(4),
            key_cert_sign: bits.bit(5),
            crl_sign: bits.bit(6),
            encipher_only: bits.bit(7),
            decipher_only: bits.bit(8),
        })
    }
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum GeneralName {
    Rfc822Name(String),
    DnsName(String),
    DirectoryName(DistinguishedName),
    Uri(String),
    IpAddress(#[serde_as(as = "Hex")] Vec<u8>),
    /// otherName, x400Address, ediPartyName, registeredID
    Other {
        tag: u32,
        #[serde_as(as = "Hex")]
        raw: Vec<u8>,
    },
}

impl GeneralName {
    fn from_tlv(tlv: &Tlv<'_>) -> Result<Self, Asn1Error> {
        let ia5 = |t: &Tlv<'_>| -> Result<String, Asn1Error> {
            let v = t.value();
            if !v.is_ascii() {
                return Err(Asn1Error::InvalidValue {
                    what: "IA5String",
                    offset: t.value_offset(),
                });
            }
            Ok(v.iter().map(|b| char::from(*b)).collect())
        };

        let name = match (tlv.tag.constructed(), tlv.tag.number()) {
            (false, 1) => GeneralName::Rfc822Name(ia5(tlv)?),
            (false, 2) => GeneralName::DnsName(ia5(tlv)?),
            (true, 4) => {
                let inner = tlv.reader().read_tlv()?;
                GeneralName::DirectoryName(DistinguishedName::from_tlv(&inner)?)
            }
            (false, 6) => GeneralName::Uri(ia5(tlv)?),
            (false, 7) => GeneralName::IpAddress(tlv.value().to_vec()),
            (_, tag) => GeneralName::Other {
                tag,
                raw: tlv.raw().to_vec(),
            },
        };

        Ok(name)
    }
}

/// Decoded view of an extension value.  Anything not listed is kept as
/// `Unknown` with its `extnValue` contents.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ExtensionValue {
    BasicConstraints {
        ca: bool,
        path_len: Option<u64>,
    },
    KeyUsage(KeyUsage),
    ExtendedKeyUsage(Vec<Oid>),
    SubjectKeyIdentifier(#[serde_as(as = "Hex")] Vec<u8>),
    AuthorityKeyIdentifier {
        #[serde_as(as = "Option<Hex>")]
        key_identifier: Option<Vec<u8>>,
        #[serde_as(as = "Hex")]
        raw: Vec<u8>,
    },
    SubjectAlternativeName(Vec<GeneralName>),
    AppleAppAttest(AppleAppAttestExtension),
    Unknown(#[serde_as(as = "Hex")] Vec<u8>),
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct X509Extension {
    pub oid: Oid,
    pub critical: bool,
    /// Contents of the `extnValue` OCTET STRING.
    #[serde_as(as = "Hex")]
    pub value: Vec<u8>,
    /// The whole `Extension` SEQUENCE.
    #[serde_as(as = "Hex")]
    pub raw: Vec<u8>,
    pub decoded: ExtensionValue,
}

fn basic_constraints(value: &Tlv<'_>) -> Result<ExtensionValue, Asn1Error> {
    let mut r = value.reader().read_constructed(Tag::SEQUENCE)?;
    let ca = match r.read_optional(Tag::BOOLEAN)? {
        Some(b) => primitives::boolean(&b)?,
        None => false,
    };
    let path_len = match r.read_optional(Tag::INTEGER)? {
        Some(i) => Some(primitives::uint(&i)?),
        None => None,
    };
    Ok(ExtensionValue::BasicConstraints { ca, path_len })
}

fn extended_key_usage(value: &Tlv<'_>) -> Result<ExtensionValue, Asn1Error> {
    let mut r = value.reader().read_constructed(Tag::SEQUENCE)?;
    let mut purposes = Vec::new();
    while !r.is_empty() {
        purposes.push(Oid::from_tlv(&r.read_tlv()?)?);
    }
    Ok(ExtensionValue::ExtendedKeyUsage(purposes))
}

fn authority_key_identifier(value: &Tlv<'_>) -> Result<ExtensionValue, Asn1Error> {
    let mut r = value.reader().read_constructed(Tag::SEQUENCE)?;
    let key_identifier = r
        .read_optional(Tag::context(0, false))?
        .map(|t| t.value().to_vec());
    Ok(ExtensionValue::AuthorityKeyIdentifier {
        key_identifier,
        raw: value.value().to_vec(),
    })
}

fn subject_alt_name(value: &Tlv<'_>) -> Result<ExtensionValue, Asn1Error> {
    let mut r = value.reader().read_constructed(Tag::SEQUENCE)?;
    let mut names = Vec::new();
    while !r.is_empty() {
        names.push(GeneralName::from_tlv(&r.read_tlv()?)?);
    }
    Ok(ExtensionValue::SubjectAlternativeName(names))
}

impl X509Extension {
    /// `Extension ::= SEQUENCE { extnID OID, critical BOOLEAN DEFAULT FALSE,
    /// extnValue OCTET STRING }`
    pub fn from_tlv(tlv: &Tlv<'_>) -> Result<Self, X509Error> {
        let mut r = tlv
            .expect(Tag::SEQUENCE)
            .map(|t| t.reader())
            .field("extensions")?;

        let oid = r
            .read_tlv()
            .and_then(|t| Oid::from_tlv(&t))
            .field("extensions.extnID")?;
        let critical = r
            .read_optional(Tag::BOOLEAN)
            .and_then(|b| b.map(|b| primitives::boolean(&b)).transpose())
            .field("extensions.critical")?
            .unwrap_or(false);
        let value = r
            .read_expected(Tag::OCTET_STRING)
            .field("extensions.extnValue")?;

        let decoded = Self::decode_value(&oid, &value)?;

        Ok(Self {
            oid,
            critical,
            value: value.value().to_vec(),
            raw: tlv.raw().to_vec(),
            decoded,
        })
    }

    fn decode_value(oid: &Oid, value: &Tlv<'_>) -> Result<ExtensionValue, X509Error> {
        let a = oid.arcs();
        if a == oids::BASIC_CONSTRAINTS {
            basic_constraints(value).field("extensions.basicConstraints")
        } else if a == oids::KEY_USAGE {
            value
                .reader()
                .read_tlv()
                .and_then(|t| KeyUsage::from_value(&t))
                .map(ExtensionValue::KeyUsage)
                .field("extensions.keyUsage")
        } else if a == oids::EXTENDED_KEY_USAGE {
            extended_key_usage(value).field("extensions.extendedKeyUsage")
        } else if a == oids::SUBJECT_KEY_IDENTIFIER {
            value
                .reader()
                .read_expected(Tag::OCTET_STRING)
                .map(|t| ExtensionValue::SubjectKeyIdentifier(t.value().to_vec()))
                .field("extensions.subjectKeyIdentifier")
        } else if a == oids::AUTHORITY_KEY_IDENTIFIER {
            authority_key_identifier(value).field("extensions.authorityKeyIdentifier")
        } else if a == oids::SUBJECT_ALT_NAME {
            subject_alt_name(value).field("extensions.subjectAltName")
        } else if oid.starts_with(oids::APPLE_APP_ATTEST_ARC) {
            AppleAppAttestExtension::from_tlv(oid, value)
                .map(ExtensionValue::AppleAppAttest)
                .field("extensions.appleAppAttest")
        } else {
            Ok(ExtensionValue::Unknown(value.value().to_vec()))
        }
    }
}

/// `Extensions ::= SEQUENCE SIZE (1..MAX) OF Extension`
pub(crate) fn parse_all(tlv: &Tlv<'_>) -> Result<Vec<X509Extension>, X509Error> {
    let mut r = tlv
        .reader()
        .read_constructed(Tag::SEQUENCE)
        .field("extensions")?;

    let mut extensions = Vec::new();
    while !r.is_empty() {
        let ext = r.read_tlv().field("extensions")?;
        extensions.push(X509Extension::from_tlv(&ext)?);
    }
    Ok(extensions)
}
