// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::errors::CoseError;
use crate::cbor::{self, CborValue, DecoderOptions};
use serde::Serialize;
use serde_with::{hex::Hex, serde_as};
use tracing::debug;

/// CBOR tag for COSE_Sign1.
pub const COSE_SIGN1_TAG: u64 = 18;

const LABEL_ALG: i64 = 1;
const LABEL_KID: i64 = 4;
const LABEL_X5CHAIN: i64 = 33;

/// The header parameters App Attest uses, plus everything else verbatim.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CoseHeader {
    pub alg: Option<i64>,
    #[serde_as(as = "Option<Hex>")]
    pub kid: Option<Vec<u8>>,
    #[serde_as(as = "Vec<Hex>")]
    pub x5chain: Vec<Vec<u8>>,
    /// Labels not consumed above, in wire order.  A known label whose value
    /// has an unexpected type also ends up here.
    pub other: Vec<(CborValue, CborValue)>,
}

impl CoseHeader {
    fn from_map(entries: &[(CborValue, CborValue)]) -> Self {
        let mut h = CoseHeader::default();
        let mut have_x5chain = false;

        for (k, v) in entries {
            let consumed = match (k.as_i64(), v) {
                (Some(LABEL_ALG), _) if h.alg.is_none() => {
                    h.alg = v.as_i64();
                    h.alg.is_some()
                }
                (Some(LABEL_KID), CborValue::ByteString(kid)) if h.kid.is_none() => {
                    h.kid = Some(kid.clone());
                    true
                }
                (Some(LABEL_X5CHAIN), _) if !have_x5chain => match x5chain(v) {
                    Some(chain) => {
                        h.x5chain = chain;
                        have_x5chain = true;
                        true
                    }
                    None => false,
                },
                _ => false,
            };

            if !consumed {
                h.other.push((k.clone(), v.clone()));
            }
        }

        h
    }

    /// First value under an integer label that was not consumed.
    pub fn get(&self, label: i64) -> Option<&CborValue> {
        self.other
            .iter()
            .find(|(k, _)| k.as_i64() == Some(label))
            .map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.alg.is_none() && self.kid.is_none() && self.x5chain.is_empty() && self.other.is_empty()
    }
}

/// `x5chain` is either one certificate or an array of them.
fn x5chain(v: &CborValue) -> Option<Vec<Vec<u8>>> {
    match v {
        CborValue::ByteString(c) => Some(vec![c.clone()]),
        CborValue::Array(a) => a.iter().map(|c| c.as_bytes().map(<[u8]>::to_vec)).collect(),
        _ => None,
    }
}

/// `COSE_Sign1 = [protected: bstr, unprotected: map, payload: bstr / nil,
/// signature: bstr]`
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoseSign1 {
    /// The protected header bucket as serialized, which is what a signature
    /// covers.
    #[serde_as(as = "Hex")]
    pub protected_raw: Vec<u8>,
    pub protected: CoseHeader,
    pub unprotected: CoseHeader,
    #[serde_as(as = "Option<Hex>")]
    pub payload: Option<Vec<u8>>,
    #[serde_as(as = "Hex")]
    pub signature: Vec<u8>,
}

impl CoseSign1 {
    pub fn from_cbor(v: &CborValue) -> Result<Self, CoseError> {
        Self::from_cbor_with(v, &DecoderOptions::default())
    }

    /// As [`CoseSign1::from_cbor`], decoding the protected bucket with `opts`.
    pub fn from_cbor_with(v: &CborValue, opts: &DecoderOptions) -> Result<Self, CoseError> {
        let v = match v {
            CborValue::Tagged(COSE_SIGN1_TAG, inner) => inner.as_ref(),
            CborValue::Tagged(tag, _) => {
                return Err(CoseError::InvalidStructure(format!(
                    "unexpected tag {tag}, expecting {COSE_SIGN1_TAG}"
                )))
            }
            v => v,
        };

        let items = match v {
            CborValue::Array(a) if a.len() == 4 => a,
            CborValue::Array(a) => {
                return Err(CoseError::InvalidStructure(format!(
                    "expecting 4 elements, found {}",
                    a.len()
                )))
            }
            other => {
                return Err(CoseError::InvalidStructure(format!(
                    "expecting array, found {}",
                    other.type_name()
                )))
            }
        };

        let protected_raw = items[0].as_bytes().ok_or_else(|| {
            CoseError::InvalidStructure(format!(
                "protected header must be a byte string, found {}",
                items[0].type_name()
            ))
        })?;
        let protected = Self::protected(protected_raw, opts)?;

        let unprotected = match &items[1] {
            CborValue::Map(m) => CoseHeader::from_map(m),
            other => {
                return Err(CoseError::InvalidStructure(format!(
                    "unprotected header must be a map, found {}",
                    other.type_name()
                )))
            }
        };

        let payload = match &items[2] {
            CborValue::ByteString(p) => Some(p.clone()),
            CborValue::Null => None,
            other => {
                return Err(CoseError::InvalidStructure(format!(
                    "payload must be a byte string or null, found {}",
                    other.type_name()
                )))
            }
        };

        let signature = items[3].as_bytes().ok_or_else(|| {
            CoseError::InvalidStructure(format!(
                "signature must be a byte string, found {}",
                items[3].type_name()
            ))
        })?;

        debug!(
            protected_len = protected_raw.len(),
            payload_len = payload.as_ref().map(Vec::len),
            signature_len = signature.len(),
            "decoded COSE_Sign1"
        );

        Ok(Self {
            protected_raw: protected_raw.to_vec(),
            protected,
            unprotected,
            payload,
            signature: signature.to_vec(),
        })
    }

    fn protected(raw: &[u8], opts: &DecoderOptions) -> Result<CoseHeader, CoseError> {
        // a zero-length bstr stands for an empty map
        if raw.is_empty() {
            return Ok(CoseHeader::default());
        }

        match cbor::decode_with(raw, opts).map_err(CoseError::ProtectedHeader)? {
            CborValue::Map(m) => Ok(CoseHeader::from_map(&m)),
            other => Err(CoseError::InvalidStructure(format!(
                "protected header must encode a map, found {}",
                other.type_name()
            ))),
        }
    }

    /// The payload, for callers that cannot work with a detached one.
    pub fn require_payload(&self) -> Result<&[u8], CoseError> {
        self.payload.as_deref().ok_or(CoseError::MissingPayload)
    }

    /// Algorithm from the protected bucket, else the unprotected one.
    pub fn alg(&self) -> Option<i64> {
        self.protected.alg.or(self.unprotected.alg)
    }

    /// Certificate chain from whichever bucket carries one.
    pub fn x5chain(&self) -> &[Vec<u8>] {
        if self.protected.x5chain.is_empty() {
            &self.unprotected.x5chain
        } else {
            &self.protected.x5chain
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    fn sign1(buf: &[u8]) -> Result<CoseSign1, CoseError> {
        CoseSign1::from_cbor(&cbor::decode(buf).unwrap())
    }

    #[test]
    fn tagged_with_headers() {
        // 18([h'a10126', {4: h'6b6964'}, h'0102', h'aabb'])
        let s = sign1(&hex!("d2 84 43a10126 a104436b6964 420102 42aabb")).unwrap();

        assert_eq!(s.protected_raw, hex!("a10126"));
        assert_eq!(s.protected.alg, Some(-7));
        assert_eq!(s.alg(), Some(-7));
        assert_eq!(s.unprotected.kid.as_deref(), Some(&b"kid"[..]));
        assert_eq!(s.require_payload(), Ok(&hex!("0102")[..]));
        assert_eq!(s.signature, hex!("aabb"));
    }

    #[test]
    fn untagged_empty_protected() {
        let s = sign1(&hex!("84 40 a0 41ff 40")).unwrap();

        assert!(s.protected.is_empty());
        assert!(s.protected_raw.is_empty());
        assert!(s.unprotected.is_empty());
        assert_eq!(s.payload, Some(vec![0xff]));
        assert!(s.signature.is_empty());
    }

    #[test]
    fn x5chain_forms() {
        // {33: [h'01', h'02'], 3: 0}
        let s = sign1(&hex!("84 40 a2 1821 82 4101 4102 0300 40 40")).unwrap();
        assert_eq!(s.x5chain(), &[vec![1u8], vec![2u8]]);
        assert_eq!(s.unprotected.get(3), Some(&CborValue::Unsigned(0)));

        // {33: h'010203'} in the protected bucket
        let s = sign1(&hex!("84 47a1182143010203 a0 40 40")).unwrap();
        assert_eq!(s.x5chain(), &[vec![1u8, 2, 3]]);

        // not a chain: kept as an ordinary label
        let s = sign1(&hex!("84 40 a1 1821 82 4101 01 40 40")).unwrap();
        assert!(s.x5chain().is_empty());
        assert_eq!(s.unprotected.other.len(), 1);
    }

    #[test]
    fn text_alg_is_preserved() {
        // {1: "ES256"}
        let s = sign1(&hex!("84 40 a1 01 654553323536 40 40")).unwrap();

        assert_eq!(s.alg(), None);
        assert_eq!(
            s.unprotected.get(1),
            Some(&CborValue::TextString("ES256".to_string()))
        );
    }

    #[test]
    fn detached_payload() {
        let s = sign1(&hex!("84 40 a0 f6 40")).unwrap();

        assert_eq!(s.payload, None);
        assert_eq!(s.require_payload(), Err(CoseError::MissingPayload));
    }

    #[test]
    fn structural_errors() {
        assert!(matches!(
            sign1(&hex!("83 40 a0 40")),
            Err(CoseError::InvalidStructure(_))
        ));
        assert!(matches!(
            sign1(&hex!("d1 84 40 a0 40 40")),
            Err(CoseError::InvalidStructure(_))
        ));
        assert!(matches!(
            sign1(&hex!("a0")),
            Err(CoseError::InvalidStructure(_))
        ));
        assert!(matches!(
            sign1(&hex!("84 a0 a0 40 40")),
            Err(CoseError::InvalidStructure(_))
        ));
        assert!(matches!(
            sign1(&hex!("84 40 80 40 40")),
            Err(CoseError::InvalidStructure(_))
        ));
        assert!(matches!(
            sign1(&hex!("84 40 a0 01 40")),
            Err(CoseError::InvalidStructure(_))
        ));
        assert!(matches!(
            sign1(&hex!("84 40 a0 40 f6")),
            Err(CoseError::InvalidStructure(_))
        ));
        // protected bucket holding an array
        assert!(matches!(
            sign1(&hex!("84 4180 a0 40 40")),
            Err(CoseError::InvalidStructure(_))
        ));
    }

    #[test]
    fn undecodable_protected_header() {
        assert!(matches!(
            sign1(&hex!("84 41ff a0 40 40")),
            Err(CoseError::ProtectedHeader(_))
        ));
        assert!(matches!(
            sign1(&hex!("84 41a1 a0 40 40")),
            Err(CoseError::ProtectedHeader(_))
        ));
    }
}
