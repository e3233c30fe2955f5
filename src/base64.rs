// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    DecodeError, Engine as _,
};

const INDIFFERENT: GeneralPurposeConfig =
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);

const STANDARD: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, INDIFFERENT);
const URL_SAFE: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, INDIFFERENT);

/// decodes bytes from a base64-encoded string, in either alphabet, with or
/// without padding.  Embedded whitespace (line wrapping) is ignored.
pub fn decode_str(v: &str) -> Result<Vec<u8>, DecodeError> {
    let compact: String = v.chars().filter(|c| !c.is_ascii_whitespace()).collect();

    if compact.contains(|c| c == '-' || c == '_') {
        URL_SAFE.decode(compact)
    } else {
        STANDARD.decode(compact)
    }
}
