// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

/// Errors raised while decoding a CBOR item.  Every variant carries the byte
/// offset (relative to the start of the decoded buffer) at which the problem
/// was detected.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CborError {
    #[error("unexpected end of input at offset {offset}: expected {expected} byte(s), {remaining} remaining")]
    UnexpectedEndOfInput {
        expected: usize,
        remaining: usize,
        offset: usize,
    },
    #[error("invalid initial byte 0x{byte:02x} at offset {offset}")]
    InvalidInitialByte { byte: u8, offset: usize },
    #[error("unsupported indefinite-length encoding for major type {major} at offset {offset}")]
    UnsupportedMajorType { major: u8, offset: usize },
    #[error("nesting deeper than {limit} at offset {offset}")]
    RecursionLimitExceeded { limit: usize, offset: usize },
    #[error("text string at offset {offset} is not valid UTF-8")]
    InvalidUtf8 { offset: usize },
    #[error("integer at offset {offset} does not fit the target type")]
    IntegerOverflow { offset: usize },
    #[error("{remaining} trailing byte(s) after top-level item at offset {offset}")]
    TrailingBytes { offset: usize, remaining: usize },
}

impl CborError {
    /// Byte offset at which decoding failed.
    pub fn offset(&self) -> usize {
        match self {
            CborError::UnexpectedEndOfInput { offset, .. }
            | CborError::InvalidInitialByte { offset, .. }
            | CborError::UnsupportedMajorType { offset, .. }
            | CborError::RecursionLimitExceeded { offset, .. }
            | CborError::InvalidUtf8 { offset }
            | CborError::IntegerOverflow { offset }
            | CborError::TrailingBytes { offset, .. } => *offset,
        }
    }
}
