// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

//! Decoders for the universal primitive types that show up in certificates
//! and CMS structures.

use super::errors::Asn1Error;
use super::reader::{Tag, Tlv};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};

fn invalid(what: &'static str, tlv: &Tlv<'_>) -> Asn1Error {
    Asn1Error::InvalidValue {
        what,
        offset: tlv.value_offset(),
    }
}

/// Content octets of an INTEGER, as encoded (two's complement, big endian).
pub fn integer_bytes<'a>(tlv: &Tlv<'a>) -> Result<&'a [u8], Asn1Error> {
    let tlv = tlv.expect(Tag::INTEGER)?;
    if tlv.value().is_empty() {
        return Err(invalid("integer", &tlv));
    }
    Ok(tlv.value())
}

/// A non-negative INTEGER that fits in 64 bits.
pub fn uint(tlv: &Tlv<'_>) -> Result<u64, Asn1Error> {
    let v = integer_bytes(tlv)?;
    if v[0] & 0x80 != 0 {
        return Err(invalid("unsigned integer", tlv));
    }
    let start = v.iter().position(|b| *b != 0).unwrap_or(v.len());
    let digits = &v[start..];
    if digits.len() > 8 {
        return Err(invalid("unsigned integer", tlv));
    }
    Ok(digits.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
}

pub fn boolean(tlv: &Tlv<'_>) -> Result<bool, Asn1Error> {
    let tlv = tlv.expect(Tag::BOOLEAN)?;
    match tlv.value() {
        [b] => Ok(*b != 0),
        _ => Err(invalid("boolean", &tlv)),
    }
}

/// A BIT STRING split into its unused-bit count and data octets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitString<'a> {
    pub unused_bits: u8,
    pub data: &'a [u8],
}

impl BitString<'_> {
    /// Bit `n`, counting from the most significant bit of the first octet.
    pub fn bit(&self, n: usize) -> bool {
        let total = self.data.len() * 8 - usize::from(self.unused_bits);
        if n >= total {
            return false;
        }
        self.data[n / 8] & (0x80 >> (n % 8)) != 0
    }
}

pub fn bit_string<'a>(tlv: &Tlv<'a>) -> Result<BitString<'a>, Asn1Error> {
    let tlv = tlv.expect(Tag::BIT_STRING)?;
    let (unused_bits, data) = match tlv.value() {
        [unused, rest @ ..] => (*unused, rest),
        [] => return Err(invalid("bit string", &tlv)),
    };
    if unused_bits > 7 || (unused_bits > 0 && data.is_empty()) {
        return Err(invalid("bit string", &tlv));
    }
    Ok(BitString { unused_bits, data })
}

pub fn octet_string<'a>(tlv: &Tlv<'a>) -> Result<&'a [u8], Asn1Error> {
    Ok(tlv.expect(Tag::OCTET_STRING)?.value())
}

/// True for every universal string type [`string`] understands.
pub fn is_string(tag: Tag) -> bool {
    [
        Tag::UTF8_STRING,
        Tag::NUMERIC_STRING,
        Tag::PRINTABLE_STRING,
        Tag::TELETEX_STRING,
        Tag::IA5_STRING,
        Tag::VISIBLE_STRING,
        Tag::UNIVERSAL_STRING,
        Tag::BMP_STRING,
    ]
    .contains(&tag)
}

/// Decode any of the character string types into a Rust string.
pub fn string(tlv: &Tlv<'_>) -> Result<String, Asn1Error> {
    let v = tlv.value();
    match tlv.tag {
        Tag::UTF8_STRING => std::str::from_utf8(v)
            .map(str::to_string)
            .map_err(|_| invalid("UTF8String", tlv)),
        Tag::NUMERIC_STRING | Tag::PRINTABLE_STRING | Tag::IA5_STRING | Tag::VISIBLE_STRING => {
            if !v.is_ascii() {
                return Err(invalid("ASCII string", tlv));
            }
            Ok(v.iter().map(|b| char::from(*b)).collect())
        }
        // T.61 is approximated by Latin-1, which is what issuers actually put there
        Tag::TELETEX_STRING => Ok(v.iter().map(|b| char::from(*b)).collect()),
        Tag::BMP_STRING => {
            if v.len() % 2 != 0 {
                return Err(invalid("BMPString", tlv));
            }
            let units = v.chunks_exact(2).map(|c| u16::from_be_bytes([c[0], c[1]]));
            char::decode_utf16(units)
                .collect::<Result<String, _>>()
                .map_err(|_| invalid("BMPString", tlv))
        }
        Tag::UNIVERSAL_STRING => {
            if v.len() % 4 != 0 {
                return Err(invalid("UniversalString", tlv));
            }
            v.chunks_exact(4)
                .map(|c| char::from_u32(u32::from_be_bytes([c[0], c[1], c[2], c[3]])))
                .collect::<Option<String>>()
                .ok_or_else(|| invalid("UniversalString", tlv))
        }
        found => Err(Asn1Error::UnexpectedTag {
            expected: Tag::UTF8_STRING,
            found,
            offset: tlv.offset,
        }),
    }
}

fn digits(s: &[u8]) -> Option<u32> {
    if s.is_empty() || !s.iter().all(u8::is_ascii_digit) {
        return None;
    }
    s.iter().try_fold(0u32, |acc, d| {
        acc.checked_mul(10)?.checked_add(u32::from(d - b'0'))
    })
}

fn civil(y: i32, rest: &[u8]) -> Option<DateTime<Utc>> {
    // MMDDHHMMSS
    if rest.len() != 10 {
        return None;
    }
    let month = digits(&rest[0..2])?;
    let day = digits(&rest[2..4])?;
    let hour = digits(&rest[4..6])?;
    let minute = digits(&rest[6..8])?;
    let second = digits(&rest[8..10])?;

    let naive = NaiveDate::from_ymd_opt(y, month, day)?.and_hms_opt(hour, minute, second)?;
    Some(Utc.from_utc_datetime(&naive))
}

/// Decode a UTCTime or GeneralizedTime.  Only the `Z` (UTC) forms allowed by
/// DER are accepted; GeneralizedTime fractional seconds are dropped.
pub fn time(tlv: &Tlv<'_>) -> Result<DateTime<Utc>, Asn1Error> {
    let v = tlv.value();
    let parsed = match tlv.tag {
        Tag::UTC_TIME => match v {
            [body @ .., b'Z'] if body.len() == 12 => {
                let yy = digits(&body[0..2]).map(|y| y as i32);
                yy.and_then(|yy| {
                    let year = if yy >= 50 { 1900 + yy } else { 2000 + yy };
                    civil(year, &body[2..])
                })
            }
            _ => None,
        },
        Tag::GENERALIZED_TIME => match v {
            [body @ .., b'Z'] if body.len() >= 14 => {
                let (main, frac) = body.split_at(14);
                // the fraction is validated, not kept
                let frac_ok = frac.is_empty()
                    || (frac.len() > 1
                        && frac[0] == b'.'
                        && frac[1..].iter().all(u8::is_ascii_digit));
                if frac_ok {
                    digits(&main[0..4])
                        .map(|y| y as i32)
                        .and_then(|year| civil(year, &main[4..]))
                } else {
                    None
                }
            }
            _ => None,
        },
        found => {
            return Err(Asn1Error::UnexpectedTag {
                expected: Tag::UTC_TIME,
                found,
                offset: tlv.offset,
            })
        }
    };

    parsed.ok_or_else(|| invalid("time", tlv))
}
