// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use crate::cbor::CborError;
use crate::cose::CoseError;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthenticatorDataError {
    #[error(
        "authenticator data ends early: {field} needs {expected} byte(s) at offset {offset}, \
         {remaining} left"
    )]
    UnexpectedEndOfInput {
        field: &'static str,
        expected: usize,
        remaining: usize,
        offset: usize,
    },
    #[error("credential public key: {0}")]
    CredentialPublicKey(#[source] CborError),
    #[error("extensions: {0}")]
    Extensions(#[source] CborError),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AttestationError {
    #[error("CBOR: {0}")]
    Cbor(#[from] CborError),
    #[error("attestation object is a {0}, expecting a map")]
    InvalidTopLevelType(&'static str),
    #[error("missing {field} (keys present: {present_keys:?})")]
    MissingRequiredField {
        field: &'static str,
        present_keys: Vec<String>,
    },
    #[error("fmt must be a text string, found {0}")]
    InvalidFormatField(&'static str),
    #[error("invalid attestation statement: {reason} (keys present: {present_keys:?})")]
    InvalidAttestationStatement {
        reason: String,
        present_keys: Vec<String>,
    },
    #[error("authenticator data: {0}")]
    InvalidAuthenticatorData(#[from] AuthenticatorDataError),
    #[error("invalid input encoding: {0}")]
    InvalidEncoding(String),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AssertionError {
    #[error("CBOR: {0}")]
    Cbor(#[from] CborError),
    #[error("invalid assertion structure: {0}")]
    InvalidStructure(String),
    #[error("assertion carries no payload")]
    MissingPayload,
    #[error("authenticator data: {0}")]
    InvalidAuthenticatorData(#[from] AuthenticatorDataError),
    #[error("invalid input encoding: {0}")]
    InvalidEncoding(String),
}

impl From<CoseError> for AssertionError {
    fn from(e: CoseError) -> Self {
        match e {
            CoseError::InvalidStructure(s) => AssertionError::InvalidStructure(s),
            CoseError::MissingPayload => AssertionError::MissingPayload,
            CoseError::ProtectedHeader(c) => AssertionError::Cbor(c),
        }
    }
}
