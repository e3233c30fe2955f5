// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use crate::cbor::{DecoderOptions, DEFAULT_MAX_DEPTH};

/// Settings for a top-level attestation or assertion decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Nesting bound handed to every CBOR decode.
    pub max_depth: usize,
    /// Accept bytes after the top-level CBOR item.
    pub allow_trailing_bytes: bool,
    /// Allow the fallback lookups used on non-standard attestation objects
    /// (byte string scan for authData, signature length guess).  When off,
    /// a field missing under its standard keys is reported as missing.
    pub allow_heuristics: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            allow_trailing_bytes: true,
            allow_heuristics: true,
        }
    }
}

impl DecodeOptions {
    /// Standard-conforming input only: no heuristics, no trailing bytes.
    pub fn strict() -> Self {
        Self {
            allow_trailing_bytes: false,
            allow_heuristics: false,
            ..Default::default()
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_trailing_bytes(mut self, allow: bool) -> Self {
        self.allow_trailing_bytes = allow;
        self
    }

    pub fn with_heuristics(mut self, allow: bool) -> Self {
        self.allow_heuristics = allow;
        self
    }

    pub fn cbor(&self) -> DecoderOptions {
        DecoderOptions {
            max_depth: self.max_depth,
            allow_trailing_bytes: self.allow_trailing_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders() {
        let o = DecodeOptions::default();
        assert_eq!(o.max_depth, 64);
        assert!(o.allow_trailing_bytes);
        assert!(o.allow_heuristics);
        assert_eq!(o.cbor(), DecoderOptions::default());

        let o = DecodeOptions::default()
            .with_max_depth(8)
            .with_trailing_bytes(false)
            .with_heuristics(false);
        assert_eq!(o, DecodeOptions::strict().with_max_depth(8));
        assert_eq!(
            o.cbor(),
            DecoderOptions {
                max_depth: 8,
                allow_trailing_bytes: false,
            }
        );
    }
}
