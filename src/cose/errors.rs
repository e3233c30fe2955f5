// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use crate::cbor::CborError;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CoseError {
    #[error("invalid COSE_Sign1 structure: {0}")]
    InvalidStructure(String),
    #[error("COSE_Sign1 payload is detached (null)")]
    MissingPayload,
    #[error("protected header is not valid CBOR: {0}")]
    ProtectedHeader(#[source] CborError),
}
