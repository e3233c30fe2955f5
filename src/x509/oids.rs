// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! Object identifiers the certificate and receipt decoders know by name.

use crate::asn1::Oid;

// name attributes
pub const CN: &[u64] = &[2, 5, 4, 3];
pub const SERIAL_NUMBER: &[u64] = &[2, 5, 4, 5];
pub const C: &[u64] = &[2, 5, 4, 6];
pub const L: &[u64] = &[2, 5, 4, 7];
pub const ST: &[u64] = &[2, 5, 4, 8];
pub const O: &[u64] = &[2, 5, 4, 10];
pub const OU: &[u64] = &[2, 5, 4, 11];
pub const EMAIL_ADDRESS: &[u64] = &[1, 2, 840, 113549, 1, 9, 1];
pub const DC: &[u64] = &[0, 9, 2342, 19200300, 100, 1, 25];

// extensions
pub const SUBJECT_KEY_IDENTIFIER: &[u64] = &[2, 5, 29, 14];
pub const KEY_USAGE: &[u64] = &[2, 5, 29, 15];
pub const SUBJECT_ALT_NAME: &[u64] = &[2, 5, 29, 17];
pub const BASIC_CONSTRAINTS: &[u64] = &[2, 5, 29, 19];
pub const AUTHORITY_KEY_IDENTIFIER: &[u64] = &[2, 5, 29, 35];
pub const EXTENDED_KEY_USAGE: &[u64] = &[2, 5, 29, 37];

/// Apple's private App Attest extension arc, 1.2.840.113635.100.8.
pub const APPLE_APP_ATTEST_ARC: &[u64] = &[1, 2, 840, 113635, 100, 8];

// algorithms
pub const EC_PUBLIC_KEY: &[u64] = &[1, 2, 840, 10045, 2, 1];
pub const PRIME256V1: &[u64] = &[1, 2, 840, 10045, 3, 1, 7];
pub const SECP384R1: &[u64] = &[1, 3, 132, 0, 34];
pub const ECDSA_WITH_SHA256: &[u64] = &[1, 2, 840, 10045, 4, 3, 2];
pub const ECDSA_WITH_SHA384: &[u64] = &[1, 2, 840, 10045, 4, 3, 3];
pub const RSA_ENCRYPTION: &[u64] = &[1, 2, 840, 113549, 1, 1, 1];
pub const SHA256_WITH_RSA: &[u64] = &[1, 2, 840, 113549, 1, 1, 11];
pub const SHA256: &[u64] = &[2, 16, 840, 1, 101, 3, 4, 2, 1];
pub const SHA384: &[u64] = &[2, 16, 840, 1, 101, 3, 4, 2, 2];

// CMS
pub const CMS_DATA: &[u64] = &[1, 2, 840, 113549, 1, 7, 1];
pub const CMS_SIGNED_DATA: &[u64] = &[1, 2, 840, 113549, 1, 7, 2];

const NAMES: &[(&[u64], &str)] = &[
    (CN, "CN"),
    (SERIAL_NUMBER, "serialNumber"),
    (C, "C"),
    (L, "L"),
    (ST, "ST"),
    (O, "O"),
    (OU, "OU"),
    (EMAIL_ADDRESS, "emailAddress"),
    (DC, "DC"),
    (SUBJECT_KEY_IDENTIFIER, "subjectKeyIdentifier"),
    (KEY_USAGE, "keyUsage"),
    (SUBJECT_ALT_NAME, "subjectAltName"),
    (BASIC_CONSTRAINTS, "basicConstraints"),
    (AUTHORITY_KEY_IDENTIFIER, "authorityKeyIdentifier"),
    (EXTENDED_KEY_USAGE, "extendedKeyUsage"),
    (EC_PUBLIC_KEY, "ecPublicKey"),
    (PRIME256V1, "prime256v1"),
    (SECP384R1, "secp384r1"),
    (ECDSA_WITH_SHA256, "ecdsa-with-SHA256"),
    (ECDSA_WITH_SHA384, "ecdsa-with-SHA384"),
    (RSA_ENCRYPTION, "rsaEncryption"),
    (SHA256_WITH_RSA, "sha256WithRSAEncryption"),
    (SHA256, "sha256"),
    (SHA384, "sha384"),
    (CMS_DATA, "data"),
    (CMS_SIGNED_DATA, "signedData"),
];

/// Conventional short name for a well-known OID.
pub fn name(oid: &Oid) -> Option<&'static str> {
    NAMES
        .iter()
        .find(|(arcs, _)| oid.is(arcs))
        .map(|(_, n)| *n)
}
