// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::errors::AuthenticatorDataError;
use crate::cbor::{CborValue, Decoder, DEFAULT_MAX_DEPTH};
use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde_with::{hex::Hex, serde_as};
use tracing::debug;

const RP_ID_HASH_LEN: usize = 32;
const AAGUID_LEN: usize = 16;

const APP_ATTEST: &[u8] = b"appattest";
const APP_ATTEST_DEVELOP: &[u8] = b"appattestdevelop";

/// The authenticator data flags byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuthenticatorFlags(u8);

impl AuthenticatorFlags {
    pub const USER_PRESENT: u8 = 0x01;
    pub const USER_VERIFIED: u8 = 0x04;
    pub const ATTESTED_CREDENTIAL_DATA: u8 = 0x40;
    pub const EXTENSIONS_INCLUDED: u8 = 0x80;

    pub fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub fn bits(&self) -> u8 {
        self.0
    }

    pub fn user_present(&self) -> bool {
        self.0 & Self::USER_PRESENT != 0
    }

    pub fn user_verified(&self) -> bool {
        self.0 & Self::USER_VERIFIED != 0
    }

    pub fn attested_credential_data(&self) -> bool {
        self.0 & Self::ATTESTED_CREDENTIAL_DATA != 0
    }

    pub fn extensions_included(&self) -> bool {
        self.0 & Self::EXTENSIONS_INCLUDED != 0
    }
}

impl Serialize for AuthenticatorFlags {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut s = serializer.serialize_struct("AuthenticatorFlags", 5)?;
        s.serialize_field("bits", &self.0)?;
        s.serialize_field("user_present", &self.user_present())?;
        s.serialize_field("user_verified", &self.user_verified())?;
        s.serialize_field("attested_credential_data", &self.attested_credential_data())?;
        s.serialize_field("extensions_included", &self.extensions_included())?;
        s.end()
    }
}

/// App Attest environment named by the AAGUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum AppAttestEnvironment {
    Production,
    Development,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct AttestedCredentialData {
    #[serde_as(as = "Hex")]
    pub aaguid: [u8; AAGUID_LEN],
    #[serde_as(as = "Hex")]
    pub credential_id: Vec<u8>,
    pub credential_public_key: CborValue,
    /// The COSE_Key exactly as encoded.
    #[serde_as(as = "Hex")]
    pub credential_public_key_raw: Vec<u8>,
}

impl AttestedCredentialData {
    /// `appattest` padded with zeros, or `appattestdevelop`.
    pub fn app_attest_environment(&self) -> Option<AppAttestEnvironment> {
        let end = self
            .aaguid
            .iter()
            .rposition(|b| *b != 0)
            .map_or(0, |p| p + 1);
        match &self.aaguid[..end] {
            APP_ATTEST => Some(AppAttestEnvironment::Production),
            APP_ATTEST_DEVELOP => Some(AppAttestEnvironment::Development),
            _ => None,
        }
    }
}

/// WebAuthn authenticator data:
///
/// ```text
/// rpIdHash (32) | flags (1) | signCount (4, BE)
///   [ aaguid (16) | credentialIdLength (2, BE) | credentialId | COSE_Key ]  if AT
///   [ extensions (CBOR map) ]                                             if ED
/// ```
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct AuthenticatorData {
    #[serde_as(as = "Hex")]
    pub rp_id_hash: [u8; RP_ID_HASH_LEN],
    pub flags: AuthenticatorFlags,
    pub sign_count: u32,
    pub attested_credential_data: Option<AttestedCredentialData>,
    pub extensions: Option<CborValue>,
    /// Bytes after the last part the flags announce.
    #[serde_as(as = "Hex")]
    pub trailing_bytes: Vec<u8>,
    #[serde_as(as = "Hex")]
    pub raw_data: Vec<u8>,
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, field: &'static str, n: usize) -> Result<&'a [u8], AuthenticatorDataError> {
        let remaining = self.buf.len() - self.pos;
        if n > remaining {
            return Err(AuthenticatorDataError::UnexpectedEndOfInput {
                field,
                expected: n,
                remaining,
                offset: self.pos,
            });
        }
        let s = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(s)
    }

    fn array<const N: usize>(&mut self, field: &'static str) -> Result<[u8; N], AuthenticatorDataError> {
        let mut a = [0u8; N];
        a.copy_from_slice(self.take(field, N)?);
        Ok(a)
    }

    /// One CBOR item, returned with its encoding.
    fn cbor(&mut self, max_depth: usize) -> Result<(CborValue, &'a [u8]), crate::cbor::CborError> {
        let rest = &self.buf[self.pos..];
        let mut d = Decoder::with_max_depth(rest, max_depth);
        let v = d.decode_value()?;
        let used = d.position();
        self.pos += used;
        Ok((v, &rest[..used]))
    }

    fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }
}

impl AuthenticatorData {
    pub fn parse(bytes: &[u8]) -> Result<Self, AuthenticatorDataError> {
        Self::parse_with_depth(bytes, DEFAULT_MAX_DEPTH)
    }

    /// As [`AuthenticatorData::parse`], bounding the nesting of the embedded
    /// CBOR items.
    pub fn parse_with_depth(bytes: &[u8], max_depth: usize) -> Result<Self, AuthenticatorDataError> {
        let mut c = Cursor { buf: bytes, pos: 0 };

        let rp_id_hash = c.array::<RP_ID_HASH_LEN>("rpIdHash")?;
        let flags = AuthenticatorFlags(c.array::<1>("flags")?[0]);
        let sign_count = u32::from_be_bytes(c.array::<4>("signCount")?);

        let attested_credential_data = if flags.attested_credential_data() {
            let aaguid = c.array::<AAGUID_LEN>("aaguid")?;
            let id_len = u16::from_be_bytes(c.array::<2>("credentialIdLength")?);
            let credential_id = c.take("credentialId", usize::from(id_len))?.to_vec();
            let (credential_public_key, raw) = c
                .cbor(max_depth)
                .map_err(AuthenticatorDataError::CredentialPublicKey)?;

            Some(AttestedCredentialData {
                aaguid,
                credential_id,
                credential_public_key,
                credential_public_key_raw: raw.to_vec(),
            })
        } else {
            None
        };

        let extensions = if flags.extensions_included() {
            let (ext, _) = c
                .cbor(max_depth)
                .map_err(AuthenticatorDataError::Extensions)?;
            Some(ext)
        } else {
            None
        };

        debug!(
            len = bytes.len(),
            flags = flags.bits(),
            sign_count,
            trailing = c.rest().len(),
            "parsed authenticator data"
        );

        Ok(Self {
            rp_id_hash,
            flags,
            sign_count,
            attested_credential_data,
            extensions,
            trailing_bytes: c.rest().to_vec(),
            raw_data: bytes.to_vec(),
        })
    }

    pub fn credential_id(&self) -> Option<&[u8]> {
        self.attested_credential_data
            .as_ref()
            .map(|a| a.credential_id.as_slice())
    }
}
