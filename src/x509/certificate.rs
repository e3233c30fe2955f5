// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::algorithm::AlgorithmIdentifier;
use super::apple::AppleAppAttestExtension;
use super::errors::{Field, X509Error};
use super::extensions::{self, ExtensionValue, X509Extension};
use super::name::DistinguishedName;
use crate::asn1::{primitives, DerReader, Oid, Tag};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_with::{hex::Hex, serde_as};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Validity {
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
}

impl Validity {
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.not_before <= t && t <= self.not_after
    }
}

/// A decoded X.509 v1-v3 certificate.  Nothing here has been verified.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct X509Certificate {
    /// Certificate version as people say it (1, 2 or 3), not as encoded.
    pub version: u64,
    #[serde_as(as = "Hex")]
    pub serial_number: Vec<u8>,
    pub signature_algorithm: AlgorithmIdentifier,
    pub issuer: DistinguishedName,
    pub validity: Validity,
    pub subject: DistinguishedName,
    pub subject_public_key_algorithm: AlgorithmIdentifier,
    #[serde_as(as = "Hex")]
    pub subject_public_key: Vec<u8>,
    pub extensions: Vec<X509Extension>,
    pub outer_signature_algorithm: AlgorithmIdentifier,
    #[serde_as(as = "Hex")]
    pub signature_value: Vec<u8>,
    #[serde_as(as = "Hex")]
    pub tbs_certificate: Vec<u8>,
    #[serde_as(as = "Hex")]
    pub raw: Vec<u8>,
}

impl X509Certificate {
    /// Decode a DER certificate.  Bytes following the certificate are ignored.
    pub fn parse(der: &[u8]) -> Result<Self, X509Error> {
        let mut outer = DerReader::new(der);
        let cert = outer.read_expected(Tag::SEQUENCE).field("certificate")?;
        let mut c = cert.reader();

        let tbs = c.read_expected(Tag::SEQUENCE).field("tbsCertificate")?;
        let mut t = tbs.reader();

        let version = t
            .read_optional(Tag::context(0, true))
            .and_then(|v| match v {
                Some(v) => primitives::uint(&v.reader().read_tlv()?),
                None => Ok(0),
            })
            .field("tbsCertificate.version")?
            .saturating_add(1);

        let serial_number = t
            .read_tlv()
            .and_then(|s| primitives::integer_bytes(&s).map(<[u8]>::to_vec))
            .field("tbsCertificate.serialNumber")?;

        let signature_algorithm = t
            .read_tlv()
            .and_then(|a| AlgorithmIdentifier::from_tlv(&a))
            .field("tbsCertificate.signature")?;

        let issuer = t
            .read_tlv()
            .and_then(|n| DistinguishedName::from_tlv(&n))
            .field("tbsCertificate.issuer")?;

        let validity = t
            .read_constructed(Tag::SEQUENCE)
            .and_then(|mut v| {
                Ok(Validity {
                    not_before: primitives::time(&v.read_tlv()?)?,
                    not_after: primitives::time(&v.read_tlv()?)?,
                })
            })
            .field("tbsCertificate.validity")?;

        let subject = t
            .read_tlv()
            .and_then(|n| DistinguishedName::from_tlv(&n))
            .field("tbsCertificate.subject")?;

        let (subject_public_key_algorithm, subject_public_key) = t
            .read_constructed(Tag::SEQUENCE)
            .and_then(|mut spki| {
                let alg = AlgorithmIdentifier::from_tlv(&spki.read_tlv()?)?;
                let key = primitives::bit_string(&spki.read_tlv()?)?;
                Ok((alg, key.data.to_vec()))
            })
            .field("tbsCertificate.subjectPublicKeyInfo")?;

        // unique identifiers are obsolete
        t.read_optional(Tag::context(1, false))
            .and_then(|_| t.read_optional(Tag::context(2, false)))
            .field("tbsCertificate.uniqueIdentifier")?;

        let extensions = match t
            .read_optional(Tag::context(3, true))
            .field("tbsCertificate.extensions")?
        {
            Some(e) => extensions::parse_all(&e)?,
            None => Vec::new(),
        };

        let outer_signature_algorithm = c
            .read_tlv()
            .and_then(|a| AlgorithmIdentifier::from_tlv(&a))
            .field("signatureAlgorithm")?;

        let signature_value = c
            .read_tlv()
            .and_then(|s| primitives::bit_string(&s).map(|b| b.data.to_vec()))
            .field("signatureValue")?;

        Ok(Self {
            version,
            serial_number,
            signature_algorithm,
            issuer,
            validity,
            subject,
            subject_public_key_algorithm,
            subject_public_key,
            extensions,
            outer_signature_algorithm,
            signature_value,
            tbs_certificate: tbs.raw().to_vec(),
            raw: cert.raw().to_vec(),
        })
    }

    pub fn signature_algorithm_oid(&self) -> &Oid {
        &self.signature_algorithm.oid
    }

    pub fn subject_public_key_algorithm_oid(&self) -> &Oid {
        &self.subject_public_key_algorithm.oid
    }

    /// Named curve (or other parameters OID) of the subject key.
    pub fn subject_public_key_parameters_oid(&self) -> Option<Oid> {
        self.subject_public_key_algorithm.parameters_oid()
    }

    pub fn extension(&self, arcs: &[u64]) -> Option<&X509Extension> {
        self.extensions.iter().find(|e| e.oid.is(arcs))
    }

    pub fn apple_extensions(&self) -> impl Iterator<Item = &AppleAppAttestExtension> {
        self.extensions.iter().filter_map(|e| match &e.decoded {
            ExtensionValue::AppleAppAttest(a) => Some(a),
            _ => None,
        })
    }

    pub fn is_ca(&self) -> bool {
        self.extensions.iter().any(|e| {
            matches!(
                e.decoded,
                ExtensionValue::BasicConstraints { ca: true, .. }
            )
        })
    }
}
