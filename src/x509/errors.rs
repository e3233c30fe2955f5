// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use crate::asn1::Asn1Error;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum X509Error {
    #[error("malformed certificate field {field}: {source}")]
    MalformedCertificate {
        field: &'static str,
        #[source]
        source: Asn1Error,
    },
    #[error("malformed receipt field {field}: {source}")]
    MalformedReceipt {
        field: &'static str,
        #[source]
        source: Asn1Error,
    },
}

impl X509Error {
    /// Name of the structure member that failed to decode.
    pub fn field(&self) -> &'static str {
        match self {
            X509Error::MalformedCertificate { field, .. }
            | X509Error::MalformedReceipt { field, .. } => field,
        }
    }
}

/// Attach the name of the field being decoded to a DER error.
pub(crate) trait Field<T> {
    fn field(self, name: &'static str) -> Result<T, X509Error>;
    fn receipt_field(self, name: &'static str) -> Result<T, X509Error>;
}

impl<T> Field<T> for Result<T, Asn1Error> {
    fn field(self, name: &'static str) -> Result<T, X509Error> {
        self.map_err(|source| X509Error::MalformedCertificate {
            field: name,
            source,
        })
    }

    fn receipt_field(self, name: &'static str) -> Result<T, X509Error> {
        self.map_err(|source| X509Error::MalformedReceipt {
            field: name,
            source,
        })
    }
}
