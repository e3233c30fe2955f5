// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::authenticator::AuthenticatorData;
use super::errors::AttestationError;
use super::lookup::{self, Found};
use super::statement::AttStmt;
use crate::base64;
use crate::cbor::{self, CborValue};
use crate::options::DecodeOptions;
use serde::Serialize;
use serde_with::{hex::Hex, serde_as};
use tracing::{debug, warn};

/// How the authenticator data byte string was located.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum AuthDataSource {
    StandardKey(&'static str),
    /// Picked by size from anywhere in the object.
    FallbackScan { path: String, len: usize },
}

/// A decoded App Attest attestation object.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttestationObject {
    pub format: String,
    pub authenticator_data: AuthenticatorData,
    pub attestation_statement: AttStmt,
    pub auth_data_source: AuthDataSource,
    #[serde_as(as = "Hex")]
    pub raw_data: Vec<u8>,
}

/// Peel `Tagged` and single-element `Array` wrappers off until a map shows up.
fn normalize(v: &CborValue) -> Result<&CborValue, AttestationError> {
    let mut v = v;
    loop {
        v = match v {
            CborValue::Map(_) => return Ok(v),
            CborValue::Tagged(_, inner) => inner.as_ref(),
            CborValue::Array(items) if items.len() == 1 => &items[0],
            other => return Err(AttestationError::InvalidTopLevelType(other.type_name())),
        };
    }
}

impl AttestationObject {
    pub fn decode(bytes: &[u8]) -> Result<Self, AttestationError> {
        Self::decode_with(bytes, &DecodeOptions::default())
    }

    pub fn decode_with(bytes: &[u8], opts: &DecodeOptions) -> Result<Self, AttestationError> {
        debug!(len = bytes.len(), "decoding attestation object");
        let cbor_opts = opts.cbor();

        let top = cbor::decode_with(bytes, &cbor_opts)?;
        let top = match top {
            CborValue::Tagged(_, inner) => *inner,
            v => v,
        };
        // some producers wrap the whole object in one more byte string
        let top = match top {
            CborValue::ByteString(b) => {
                debug!(len = b.len(), "attestation object is byte string wrapped");
                cbor::decode_with(&b, &cbor_opts)?
            }
            v => v,
        };

        let map = normalize(&top)?;
        let primary = lookup::primary_lookup(map);
        let missing = |field| AttestationError::MissingRequiredField {
            field,
            present_keys: map.key_labels(),
        };

        let fmt = primary.fmt.ok_or_else(|| missing("fmt"))?;
        let format = fmt
            .value
            .as_text()
            .ok_or(AttestationError::InvalidFormatField(fmt.value.type_name()))?
            .to_string();

        let att_stmt = primary.att_stmt.ok_or_else(|| missing("attStmt"))?;

        let (auth_data, auth_data_source) = match primary.auth_data {
            Some(Found { key, value }) => {
                let b = value.as_bytes().ok_or_else(|| missing("authData"))?;
                (b.to_vec(), AuthDataSource::StandardKey(key))
            }
            None if opts.allow_heuristics => {
                let hit = lookup::fallback_scan(map).ok_or_else(|| missing("authData"))?;
                warn!(
                    path = %hit.path,
                    len = hit.bytes.len(),
                    "authData not under a standard key, using largest byte string"
                );
                (
                    hit.bytes.to_vec(),
                    AuthDataSource::FallbackScan {
                        len: hit.bytes.len(),
                        path: hit.path,
                    },
                )
            }
            None => return Err(missing("authData")),
        };

        let authenticator_data = AuthenticatorData::parse_with_depth(&auth_data, opts.max_depth)?;
        let attestation_statement = AttStmt::from_cbor(att_stmt.value, opts.allow_heuristics)?;

        Ok(Self {
            format,
            authenticator_data,
            attestation_statement,
            auth_data_source,
            raw_data: bytes.to_vec(),
        })
    }

    /// Decode from base64, either alphabet, padded or not.
    pub fn from_base64(s: &str) -> Result<Self, AttestationError> {
        Self::from_base64_with(s, &DecodeOptions::default())
    }

    pub fn from_base64_with(s: &str, opts: &DecodeOptions) -> Result<Self, AttestationError> {
        let bytes =
            base64::decode_str(s).map_err(|e| AttestationError::InvalidEncoding(e.to_string()))?;
        Self::decode_with(&bytes, opts)
    }

    /// True when authenticator data had to be found by scanning.
    pub fn used_fallback(&self) -> bool {
        matches!(self.auth_data_source, AuthDataSource::FallbackScan { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    fn auth_data() -> Vec<u8> {
        let mut b = vec![0u8; 37];
        b[36] = 7;
        b
    }

    // {"fmt": "apple-appattest", "attStmt": {}, "authData": h'00..07'}
    fn object() -> Vec<u8> {
        let mut b = hex!("a3 63666d74 6f6170706c652d617070617474657374 6761747453746d74 a0 6861757468446174 61 5825").to_vec();
        b.extend_from_slice(&auth_data());
        b
    }

    #[test]
    fn normalizes_wrappers() {
        let m = CborValue::Map(vec![]);
        let wrapped = CborValue::Tagged(
            1,
            Box::new(CborValue::Array(vec![CborValue::Tagged(2, Box::new(m.clone()))])),
        );

        assert_eq!(normalize(&wrapped), Ok(&m));
        assert_eq!(
            normalize(&CborValue::Array(vec![m.clone(), m])),
            Err(AttestationError::InvalidTopLevelType("array"))
        );
        assert_eq!(
            normalize(&CborValue::Unsigned(1)),
            Err(AttestationError::InvalidTopLevelType("unsigned integer"))
        );
    }

    #[test]
    fn standard_keys() {
        let buf = object();
        let a = AttestationObject::decode(&buf).unwrap();

        assert_eq!(a.format, "apple-appattest");
        assert_eq!(a.authenticator_data.sign_count, 7);
        assert_eq!(a.auth_data_source, AuthDataSource::StandardKey("authData"));
        assert!(!a.used_fallback());
        assert_eq!(a.raw_data, buf);
    }

    #[test]
    fn byte_string_wrapped() {
        let inner = object();
        let mut buf = vec![0x58, inner.len() as u8];
        buf.extend_from_slice(&inner);

        let a = AttestationObject::decode(&buf).unwrap();
        assert_eq!(a.format, "apple-appattest");
        assert_eq!(a.raw_data, buf);
    }

    #[test]
    fn format_must_be_text() {
        // {"fmt": 1}
        let buf = hex!("a1 63666d74 01");
        assert_eq!(
            AttestationObject::decode(&buf),
            Err(AttestationError::InvalidFormatField("unsigned integer"))
        );
    }

    #[test]
    fn heuristics_can_be_disabled() {
        // {"fmt": "x", "attStmt": {}, -1: h'00 * 37'}
        let mut buf = hex!("a3 63666d74 6178 6761747453746d74 a0 20 5825").to_vec();
        buf.extend_from_slice(&[0u8; 37]);

        let a = AttestationObject::decode(&buf).unwrap();
        assert_eq!(
            a.auth_data_source,
            AuthDataSource::FallbackScan {
                path: "${-1}".to_string(),
                len: 37,
            }
        );
        assert!(a.used_fallback());

        let err = AttestationObject::decode_with(&buf, &DecodeOptions::strict()).unwrap_err();
        assert_eq!(
            err,
            AttestationError::MissingRequiredField {
                field: "authData",
                present_keys: vec!["fmt".to_string(), "attStmt".to_string(), "-1".to_string()],
            }
        );
    }

    #[test]
    fn base64_input() {
        use ::base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};

        let buf = object();
        let a = AttestationObject::from_base64(&URL_SAFE_NO_PAD.encode(&buf)).unwrap();
        assert_eq!(a.raw_data, buf);

        assert!(matches!(
            AttestationObject::from_base64("%%%"),
            Err(AttestationError::InvalidEncoding(_))
        ));
    }
}
