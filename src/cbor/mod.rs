// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! A small, strict CBOR (RFC 8949) decoder.
//!
//! Only decoding is provided, and only what App Attest artifacts use:
//! definite-length items of every major type.  Floating point items are
//! accepted but surfaced as opaque [`CborValue::Simple`] values.
//!
//! ```
//! use appattest_decoder::cbor::{self, CborValue};
//!
//! let v = cbor::decode(&[0xa1, 0x61, 0x61, 0x01]).expect("decoding map");
//! assert_eq!(v.get("a"), Some(&CborValue::Unsigned(1)));
//! ```

pub use self::decoder::{decode, decode_with, Decoder, DecoderOptions, DEFAULT_MAX_DEPTH};
pub use self::errors::CborError;
pub use self::value::CborValue;

mod decoder;
mod errors;
mod value;
