// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! App Attest attestation objects and assertions.

pub use self::assertion::AssertionObject;
pub use self::attestation::{AttestationObject, AuthDataSource};
pub use self::authenticator::{
    AppAttestEnvironment, AttestedCredentialData, AuthenticatorData, AuthenticatorFlags,
};
pub use self::errors::{AssertionError, AttestationError, AuthenticatorDataError};
pub use self::statement::{AttStmt, FieldSource, StmtProvenance};

mod assertion;
mod attestation;
mod authenticator;
mod errors;
pub mod lookup;
mod statement;
