// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! Certificates produced by a real X.509 implementation.

use appattest_decoder::x509::{oids, AppleAppAttestExtension, ExtensionValue, X509Certificate};
use appattest_decoder::{asn1::Oid, decode_attestation};
use chrono::Utc;
use openssl::asn1::{Asn1Object, Asn1OctetString, Asn1Time};
use openssl::bn::{BigNum, BigNumContext};
use openssl::ec::{EcGroup, EcKey, PointConversionForm};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private};
use openssl::x509::extension::BasicConstraints;
use openssl::x509::{X509Builder, X509Extension, X509NameBuilder};

mod common;

const NONCE: [u8; 32] = [0x5a; 32];

fn key() -> EcKey<Private> {
    let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
    EcKey::generate(&group).unwrap()
}

fn apple_extension(arc: u32, contents: &[u8]) -> X509Extension {
    let oid = Asn1Object::from_str(&format!("1.2.840.113635.100.8.{arc}")).unwrap();
    let value = Asn1OctetString::new_from_bytes(contents).unwrap();
    X509Extension::new_from_der(&oid, false, &value).unwrap()
}

fn leaf(key: &EcKey<Private>) -> Vec<u8> {
    let pkey = PKey::from_ec_key(key.clone()).unwrap();

    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_text("CN", "9a2b7c4d5e6f").unwrap();
    name.append_entry_by_text("OU", "AAA Certification").unwrap();
    name.append_entry_by_text("O", "Apple Inc.").unwrap();
    let name = name.build();

    let mut b = X509Builder::new().unwrap();
    b.set_version(2).unwrap();
    let serial = BigNum::from_u32(0x0102_0304).unwrap().to_asn1_integer().unwrap();
    b.set_serial_number(&serial).unwrap();
    b.set_subject_name(&name).unwrap();
    b.set_issuer_name(&name).unwrap();
    b.set_not_before(&Asn1Time::days_from_now(0).unwrap()).unwrap();
    b.set_not_after(&Asn1Time::days_from_now(365).unwrap()).unwrap();
    b.set_pubkey(&pkey).unwrap();

    b.append_extension(BasicConstraints::new().critical().build().unwrap())
        .unwrap();
    b.append_extension(apple_extension(
        2,
        &common::der(0x30, &common::der(0xa1, &common::der(0x04, &NONCE))),
    ))
    .unwrap();
    b.append_extension(apple_extension(6, &common::der(0x0c, b"iphoneos")))
        .unwrap();

    b.sign(&pkey, MessageDigest::sha256()).unwrap();
    b.build().to_der().unwrap()
}

#[test]
fn parse_openssl_certificate() {
    let key = key();
    let der = leaf(&key);
    let cert = X509Certificate::parse(&der).unwrap();

    assert_eq!(cert.version, 3);
    assert_eq!(cert.serial_number, vec![0x01, 0x02, 0x03, 0x04]);
    assert_eq!(cert.subject.common_name(), Some("9a2b7c4d5e6f"));
    assert_eq!(cert.issuer, cert.subject);
    assert!(cert.validity.contains(Utc::now()));
    assert!(cert.signature_algorithm_oid().is(oids::ECDSA_WITH_SHA256));
    assert_eq!(
        cert.subject_public_key_parameters_oid(),
        Some(Oid::from_arcs(oids::PRIME256V1))
    );

    let mut ctx = BigNumContext::new().unwrap();
    let point = key
        .public_key()
        .to_bytes(key.group(), PointConversionForm::UNCOMPRESSED, &mut ctx)
        .unwrap();
    assert_eq!(cert.subject_public_key, point);

    let bc = cert.extension(oids::BASIC_CONSTRAINTS).unwrap();
    assert!(bc.critical);
    assert_eq!(
        bc.decoded,
        ExtensionValue::BasicConstraints {
            ca: false,
            path_len: None
        }
    );
    assert!(!cert.is_ca());

    let apple: Vec<_> = cert.apple_extensions().cloned().collect();
    assert_eq!(
        apple,
        vec![
            AppleAppAttestExtension::Challenge(NONCE.to_vec()),
            AppleAppAttestExtension::DeviceClass("iphoneos".to_string()),
        ]
    );
}

#[test]
fn openssl_certificate_in_attestation() {
    use common::*;

    let cert = leaf(&key());
    let buf = encode(&map(vec![
        (text("fmt"), text("apple-appattest")),
        (
            text("attStmt"),
            map(vec![(
                text("x5c"),
                ciborium::value::Value::Array(vec![bytes(&cert)]),
            )]),
        ),
        (
            text("authData"),
            bytes(&auth_data(FLAG_AT, 0, Some(&AAGUID_PRODUCTION))),
        ),
    ]));

    let att = decode_attestation(&buf).unwrap();
    let leaf = att.attestation_statement.leaf_certificate().unwrap().unwrap();

    assert_eq!(leaf.raw, cert);
    assert!(leaf
        .apple_extensions()
        .any(|e| *e == AppleAppAttestExtension::Challenge(NONCE.to_vec())));
}
