// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! COSE_Sign1 (RFC 9052) structure decoding.  Signatures are exposed, never
//! checked.

pub use self::errors::CoseError;
pub use self::sign1::{CoseHeader, CoseSign1, COSE_SIGN1_TAG};

mod errors;
mod sign1;
