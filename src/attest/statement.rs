// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::errors::AttestationError;
use super::lookup;
use crate::cbor::CborValue;
use crate::x509::{X509Certificate, X509Error};
use bitmask::*;
use serde::Serialize;
use serde_with::{hex::Hex, serde_as};
use tracing::{debug, warn};

const LABEL_ALG: i64 = 1;
const LABEL_X5CHAIN: i64 = 33;

/// Size window of a DER encoded P-256 ECDSA signature.
const SIGNATURE_GUESS_LEN: std::ops::RangeInclusive<usize> = 60..=80;

bitmask! {
    #[derive(Debug)]
    mask StmtFieldSet: u8 where flags StmtField {
        Alg          = 0x01,
        Signature    = 0x02,
        Certificates = 0x04,
        Receipt      = 0x08,
    }
}

/// Where a statement field was read from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub enum FieldSource {
    TextKey(&'static str),
    IntegerKey(i64),
    /// Best-effort guess by byte string size.  Not to be trusted blindly.
    LengthHeuristic { path: String },
    #[default]
    Absent,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StmtProvenance {
    pub alg: FieldSource,
    pub signature: FieldSource,
    pub certificates: FieldSource,
    pub receipt: FieldSource,
}

/// The `attStmt` map of an `apple-appattest` attestation object.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttStmt {
    pub alg: Option<i64>,
    /// Empty when the statement carries none.
    #[serde_as(as = "Hex")]
    pub signature: Vec<u8>,
    /// `x5c`: DER certificates, leaf first.
    #[serde_as(as = "Vec<Hex>")]
    pub certificates: Vec<Vec<u8>>,
    /// CMS receipt Apple attaches for fraud risk queries.
    #[serde_as(as = "Option<Hex>")]
    pub receipt: Option<Vec<u8>>,
    pub raw_cbor: CborValue,
    pub provenance: StmtProvenance,
}

struct StmtParser {
    stmt: AttStmt,
    fields_set: StmtFieldSet,
}

impl StmtParser {
    fn invalid(&self, reason: String) -> AttestationError {
        AttestationError::InvalidAttestationStatement {
            reason,
            present_keys: self.stmt.raw_cbor.key_labels(),
        }
    }

    fn alg_from(&self, key: &str, v: &CborValue) -> Result<i64, AttestationError> {
        v.as_i64().ok_or_else(|| {
            self.invalid(format!("{key} must be an integer, found {}", v.type_name()))
        })
    }

    fn bytes_from(&self, key: &str, v: &CborValue) -> Result<Vec<u8>, AttestationError> {
        v.as_bytes().map(<[u8]>::to_vec).ok_or_else(|| {
            self.invalid(format!("{key} must be a byte string, found {}", v.type_name()))
        })
    }

    fn chain_from(&self, key: &str, v: &CborValue) -> Result<Vec<Vec<u8>>, AttestationError> {
        let items = v.as_array().ok_or_else(|| {
            self.invalid(format!("{key} must be an array, found {}", v.type_name()))
        })?;

        items
            .iter()
            .enumerate()
            .map(|(i, c)| {
                c.as_bytes().map(<[u8]>::to_vec).ok_or_else(|| {
                    self.invalid(format!(
                        "{key}[{i}] must be a byte string, found {}",
                        c.type_name()
                    ))
                })
            })
            .collect()
    }

    fn set_from_text_key(&mut self, key: &str, v: &CborValue) -> Result<(), AttestationError> {
        // first occurrence wins, later duplicates stay visible in raw_cbor
        match key {
            "alg" if !self.fields_set.contains(StmtField::Alg) => {
                self.stmt.alg = Some(self.alg_from(key, v)?);
                self.stmt.provenance.alg = FieldSource::TextKey("alg");
                self.fields_set.set(StmtField::Alg);
            }
            "sig" | "signature" if !self.fields_set.contains(StmtField::Signature) => {
                self.stmt.signature = self.bytes_from(key, v)?;
                self.stmt.provenance.signature =
                    FieldSource::TextKey(if key == "sig" { "sig" } else { "signature" });
                self.fields_set.set(StmtField::Signature);
            }
            "x5c" | "x5chain" if !self.fields_set.contains(StmtField::Certificates) => {
                self.stmt.certificates = self.chain_from(key, v)?;
                self.stmt.provenance.certificates =
                    FieldSource::TextKey(if key == "x5c" { "x5c" } else { "x5chain" });
                self.fields_set.set(StmtField::Certificates);
            }
            "receipt" if !self.fields_set.contains(StmtField::Receipt) => {
                self.stmt.receipt = Some(self.bytes_from(key, v)?);
                self.stmt.provenance.receipt = FieldSource::TextKey("receipt");
                self.fields_set.set(StmtField::Receipt);
            }
            _ => {}
        }
        Ok(())
    }

    fn set_from_label(&mut self, label: i64, v: &CborValue) -> Result<(), AttestationError> {
        match label {
            LABEL_ALG if !self.fields_set.contains(StmtField::Alg) => {
                self.stmt.alg = Some(self.alg_from("1", v)?);
                self.stmt.provenance.alg = FieldSource::IntegerKey(label);
                self.fields_set.set(StmtField::Alg);
            }
            LABEL_X5CHAIN if !self.fields_set.contains(StmtField::Certificates) => {
                self.stmt.certificates = match v {
                    CborValue::ByteString(c) => vec![c.clone()],
                    v => self.chain_from("33", v)?,
                };
                self.stmt.provenance.certificates = FieldSource::IntegerKey(label);
                self.fields_set.set(StmtField::Certificates);
            }
            _ => {}
        }
        Ok(())
    }

    fn guess_signature(&mut self) {
        let hit = lookup::byte_strings(&self.stmt.raw_cbor)
            .into_iter()
            .find(|b| SIGNATURE_GUESS_LEN.contains(&b.bytes.len()))
            .map(|b| (b.path, b.bytes.to_vec()));

        if let Some((path, sig)) = hit {
            warn!(
                path = %path,
                len = sig.len(),
                "attestation statement signature guessed from byte string size"
            );
            self.stmt.signature = sig;
            self.stmt.provenance.signature = FieldSource::LengthHeuristic { path };
            self.fields_set.set(StmtField::Signature);
        }
    }
}

impl AttStmt {
    /// Read the statement fields: text keys first, then COSE integer labels,
    /// then (signature only, and only if `allow_heuristics`) a size guess.
    pub fn from_cbor(v: &CborValue, allow_heuristics: bool) -> Result<Self, AttestationError> {
        let entries = v.as_map().ok_or_else(|| AttestationError::InvalidAttestationStatement {
            reason: format!("expecting a map, found {}", v.type_name()),
            present_keys: Vec::new(),
        })?;

        let mut p = StmtParser {
            stmt: AttStmt {
                alg: None,
                signature: Vec::new(),
                certificates: Vec::new(),
                receipt: None,
                raw_cbor: v.clone(),
                provenance: StmtProvenance::default(),
            },
            fields_set: StmtFieldSet::none(),
        };

        for (k, value) in entries {
            if let Some(key) = k.as_text() {
                p.set_from_text_key(key, value)?;
            }
        }
        for (k, value) in entries {
            if let Some(label) = k.as_i64() {
                p.set_from_label(label, value)?;
            }
        }

        if allow_heuristics && !p.fields_set.contains(StmtField::Signature) {
            p.guess_signature();
        }

        let s = p.stmt;
        debug!(
            alg = s.alg,
            signature_len = s.signature.len(),
            certificates = s.certificates.len(),
            receipt = s.receipt.is_some(),
            "parsed attestation statement"
        );

        Ok(s)
    }

    /// Decode each `x5c` entry on its own.  One bad certificate does not
    /// hide the others.
    pub fn parsed_certificates(&self) -> Vec<Result<X509Certificate, X509Error>> {
        self.certificates
            .iter()
            .enumerate()
            .map(|(i, der)| {
                let r = X509Certificate::parse(der);
                if let Err(e) = &r {
                    debug!(index = i, error = %e, "certificate chain entry does not parse");
                }
                r
            })
            .collect()
    }

    /// The leaf (credential) certificate, if the chain has one.
    pub fn leaf_certificate(&self) -> Option<Result<X509Certificate, X509Error>> {
        self.certificates.first().map(|c| X509Certificate::parse(c))
    }
}
