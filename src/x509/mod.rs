// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! X.509 certificates as found in App Attest `x5c` chains, with Apple's
//! private extensions and the CMS receipt they may carry.
//!
//! ```no_run
//! # fn leaf() -> Vec<u8> { vec![] }
//! use appattest_decoder::x509::{AppleAppAttestExtension, X509Certificate};
//!
//! let cert = X509Certificate::parse(&leaf()).unwrap();
//! for ext in cert.apple_extensions() {
//!     if let AppleAppAttestExtension::Challenge(nonce) = ext {
//!         println!("nonce {}", hex::encode(nonce));
//!     }
//! }
//! ```

pub use self::algorithm::AlgorithmIdentifier;
pub use self::apple::AppleAppAttestExtension;
pub use self::certificate::{Validity, X509Certificate};
pub use self::errors::X509Error;
pub use self::extensions::{ExtensionValue, GeneralName, KeyUsage, X509Extension};
pub use self::name::{DistinguishedName, NameAttribute};
pub use self::receipt::{ReceiptAttribute, ReceiptField, SignedData, SignerInfo};

pub mod apple;
pub mod oids;

mod algorithm;
mod certificate;
mod errors;
mod extensions;
mod name;
mod receipt;
