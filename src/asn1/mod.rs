// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! A low-level DER (X.690) TLV cursor and the handful of primitive decoders
//! certificates and CMS receipts need.  Constructed values are not walked
//! automatically; callers open a nested [`DerReader`] over a node's value.

pub use self::errors::Asn1Error;
pub use self::oid::Oid;
pub use self::primitives::BitString;
pub use self::reader::{DerReader, Tag, TagClass, Tlv};

pub mod primitives;

mod errors;
mod oid;
mod reader;
