// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

#![allow(dead_code)]

use ciborium::value::{Integer, Value};

pub const APPLE_ENVIRONMENT_OID: [u8; 11] = [
    0x06, 0x09, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x63, 0x64, 0x08, 0x07,
];
pub const APPLE_CHALLENGE_OID: [u8; 11] = [
    0x06, 0x09, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x63, 0x64, 0x08, 0x02,
];

pub fn der(tag: u8, content: &[u8]) -> Vec<u8> {
    let mut v = vec![tag];
    let n = content.len();
    if n < 0x80 {
        v.push(n as u8);
    } else if n < 0x100 {
        v.extend_from_slice(&[0x81, n as u8]);
    } else {
        v.extend_from_slice(&[0x82, (n >> 8) as u8, n as u8]);
    }
    v.extend_from_slice(content);
    v
}

/// `Extension ::= SEQUENCE { extnID, extnValue OCTET STRING }`
pub fn extension(oid: &[u8], value: &[u8]) -> Vec<u8> {
    der(0x30, &[oid, &der(0x04, value)].concat())
}

fn name(cn: &str) -> Vec<u8> {
    let attr = der(
        0x30,
        &[&[0x06, 0x03, 0x55, 0x04, 0x03][..], &der(0x0c, cn.as_bytes())].concat(),
    );
    der(0x30, &der(0x31, &attr))
}

/// A v3 ECDSA P-256 certificate with the given extensions.  The signature
/// is junk; nothing in the decoder looks at it.
pub fn certificate(cn: &str, extensions: &[Vec<u8>]) -> Vec<u8> {
    let ecdsa_sha256 = der(0x30, &der(0x06, &[0x2a, 0x86, 0x48, 0xce, 0x3d, 0x04, 0x03, 0x02]));
    let spki = der(
        0x30,
        &[
            der(
                0x30,
                &[
                    der(0x06, &[0x2a, 0x86, 0x48, 0xce, 0x3d, 0x02, 0x01]),
                    der(0x06, &[0x2a, 0x86, 0x48, 0xce, 0x3d, 0x03, 0x01, 0x07]),
                ]
                .concat(),
            ),
            der(0x03, &[&[0u8][..], &[0x04; 65]].concat()),
        ]
        .concat(),
    );
    let validity = der(
        0x30,
        &[
            der(0x17, b"240101000000Z"),
            der(0x17, b"340101000000Z"),
        ]
        .concat(),
    );

    let mut tbs = [
        der(0xa0, &[0x02, 0x01, 0x02]),
        der(0x02, &[0x01]),
        ecdsa_sha256.clone(),
        name("Apple App Attestation CA 1"),
        validity,
        name(cn),
        spki,
    ]
    .concat();
    if !extensions.is_empty() {
        tbs.extend(der(0xa3, &der(0x30, &extensions.concat())));
    }

    der(
        0x30,
        &[
            der(0x30, &tbs),
            ecdsa_sha256,
            der(0x03, &[0x00, 0x30, 0x06, 0x02, 0x01, 0x01, 0x02, 0x01, 0x02]),
        ]
        .concat(),
    )
}

pub fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

pub fn bytes(b: &[u8]) -> Value {
    Value::Bytes(b.to_vec())
}

pub fn int(i: i64) -> Value {
    Value::Integer(Integer::from(i))
}

pub fn map(entries: Vec<(Value, Value)>) -> Value {
    Value::Map(entries)
}

pub fn encode(v: &Value) -> Vec<u8> {
    let mut buf = Vec::new();
    ciborium::ser::into_writer(v, &mut buf).unwrap();
    buf
}

pub const FLAG_UP: u8 = 0x01;
pub const FLAG_AT: u8 = 0x40;
pub const FLAG_ED: u8 = 0x80;

/// `rpIdHash | flags | signCount`, optionally followed by attested credential
/// data for `aaguid`.
pub fn auth_data(flags: u8, sign_count: u32, aaguid: Option<&[u8; 16]>) -> Vec<u8> {
    let mut b = vec![0xa5; 32];
    b.push(flags);
    b.extend_from_slice(&sign_count.to_be_bytes());

    if let Some(aaguid) = aaguid {
        let credential_id = [0xc1; 32];
        b.extend_from_slice(aaguid);
        b.extend_from_slice(&(credential_id.len() as u16).to_be_bytes());
        b.extend_from_slice(&credential_id);
        // {1: 2, 3: -7, -1: 1}
        b.extend(encode(&map(vec![
            (int(1), int(2)),
            (int(3), int(-7)),
            (int(-1), int(1)),
        ])));
    }

    b
}

pub const AAGUID_PRODUCTION: [u8; 16] = *b"appattest\0\0\0\0\0\0\0";
pub const AAGUID_DEVELOPMENT: [u8; 16] = *b"appattestdevelop";
