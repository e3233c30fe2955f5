// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::authenticator::AuthenticatorData;
use super::errors::AssertionError;
use crate::base64;
use crate::cbor;
use crate::cose::CoseSign1;
use crate::options::DecodeOptions;
use serde::Serialize;
use serde_with::{hex::Hex, serde_as};
use tracing::debug;

/// A decoded App Attest assertion: a COSE_Sign1 envelope whose payload is
/// authenticator data.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssertionObject {
    pub authenticator_data: AuthenticatorData,
    pub cose: CoseSign1,
    #[serde_as(as = "Hex")]
    pub raw_data: Vec<u8>,
}

impl AssertionObject {
    pub fn decode(bytes: &[u8]) -> Result<Self, AssertionError> {
        Self::decode_with(bytes, &DecodeOptions::default())
    }

    pub fn decode_with(bytes: &[u8], opts: &DecodeOptions) -> Result<Self, AssertionError> {
        debug!(len = bytes.len(), "decoding assertion");
        let cbor_opts = opts.cbor();

        let v = cbor::decode_with(bytes, &cbor_opts)?;
        let cose = CoseSign1::from_cbor_with(&v, &cbor_opts)?;
        let authenticator_data =
            AuthenticatorData::parse_with_depth(cose.require_payload()?, opts.max_depth)?;

        Ok(Self {
            authenticator_data,
            cose,
            raw_data: bytes.to_vec(),
        })
    }

    pub fn from_base64(s: &str) -> Result<Self, AssertionError> {
        Self::from_base64_with(s, &DecodeOptions::default())
    }

    pub fn from_base64_with(s: &str, opts: &DecodeOptions) -> Result<Self, AssertionError> {
        let bytes =
            base64::decode_str(s).map_err(|e| AssertionError::InvalidEncoding(e.to_string()))?;
        Self::decode_with(&bytes, opts)
    }

    /// The signature over the COSE `Sig_structure`.
    pub fn signature(&self) -> &[u8] {
        &self.cose.signature
    }
}
