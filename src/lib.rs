// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! Apple App Attest artifact decoding.
//!
//! This crate turns the binary artifacts produced by Apple's App Attest
//! service (attestation objects and assertions) into structured, inspectable
//! data.  It decodes; it does not verify: no signature is checked, no
//! certificate chain is validated and no policy is applied.
//!
//! The API allows:
//! * Decoding a CBOR-encoded attestation object, including the non-standard
//!   shapes some producers emit
//! * Decoding a COSE_Sign1 assertion and its authenticator data
//! * Parsing the `x5c` certificates, Apple's private extensions and the CMS
//!   receipt
//!
//! ```no_run
//! # fn artifact() -> Vec<u8> { vec![] }
//! let att = appattest_decoder::decode_attestation(&artifact()).unwrap();
//!
//! println!("fmt: {}", att.format);
//! println!("signCount: {}", att.authenticator_data.sign_count);
//! if let Some(Ok(leaf)) = att.attestation_statement.leaf_certificate() {
//!     println!("leaf subject: {}", leaf.subject);
//! }
//! ```

pub mod asn1;
pub mod attest;
pub mod base64;
pub mod cbor;
pub mod cose;
pub mod x509;

mod options;

pub use self::attest::{
    AssertionError, AssertionObject, AttStmt, AttestationError, AttestationObject,
    AuthDataSource, AuthenticatorData, AuthenticatorDataError, AuthenticatorFlags, FieldSource,
};
pub use self::cbor::{CborError, CborValue};
pub use self::cose::{CoseError, CoseSign1};
pub use self::options::DecodeOptions;
pub use self::x509::{X509Certificate, X509Error};

/// Decode an attestation object with the default options.
pub fn decode_attestation(bytes: &[u8]) -> Result<AttestationObject, AttestationError> {
    AttestationObject::decode(bytes)
}

pub fn decode_attestation_with(
    bytes: &[u8],
    opts: &DecodeOptions,
) -> Result<AttestationObject, AttestationError> {
    AttestationObject::decode_with(bytes, opts)
}

/// Decode an assertion with the default options.
pub fn decode_assertion(bytes: &[u8]) -> Result<AssertionObject, AssertionError> {
    AssertionObject::decode(bytes)
}

pub fn decode_assertion_with(
    bytes: &[u8],
    opts: &DecodeOptions,
) -> Result<AssertionObject, AssertionError> {
    AssertionObject::decode_with(bytes, opts)
}
