// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::errors::CborError;
use super::value::CborValue;

/// Default bound on container/tag nesting.
pub const DEFAULT_MAX_DEPTH: usize = 64;

const MAJOR_UNSIGNED: u8 = 0;
const MAJOR_NEGATIVE: u8 = 1;
const MAJOR_BYTES: u8 = 2;
const MAJOR_TEXT: u8 = 3;
const MAJOR_ARRAY: u8 = 4;
const MAJOR_MAP: u8 = 5;
const MAJOR_TAG: u8 = 6;

const AI_INDEFINITE: u8 = 31;

/// Knobs for a single top-level decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderOptions {
    /// Maximum nesting of arrays, maps and tags below the top-level item.
    pub max_depth: usize,
    /// When false, bytes left over after the top-level item are an error.
    pub allow_trailing_bytes: bool,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            allow_trailing_bytes: true,
        }
    }
}

/// A cursor decoding CBOR items out of a borrowed buffer.
///
/// Only definite-length items are supported.  Every read is bounds checked
/// and reported through [`CborError`]; malformed input never panics.
#[derive(Debug)]
pub struct Decoder<'a> {
    buf: &'a [u8],
    pos: usize,
    max_depth: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self::with_max_depth(buf, DEFAULT_MAX_DEPTH)
    }

    pub fn with_max_depth(buf: &'a [u8], max_depth: usize) -> Self {
        Self {
            buf,
            pos: 0,
            max_depth,
        }
    }

    /// Number of bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Decode the next complete data item.
    pub fn decode_value(&mut self) -> Result<CborValue, CborError> {
        self.item(0)
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CborError> {
        let remaining = self.remaining();
        if n > remaining {
            return Err(CborError::UnexpectedEndOfInput {
                expected: n,
                remaining,
                offset: self.pos,
            });
        }
        let s = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(s)
    }

    fn byte(&mut self) -> Result<u8, CborError> {
        Ok(self.take(1)?[0])
    }

    /// Read the argument that follows an initial byte.  `None` means the
    /// indefinite-length marker.
    fn argument(&mut self, initial: u8, start: usize) -> Result<Option<u64>, CborError> {
        let ai = initial & 0x1f;
        let v = match ai {
            0..=23 => u64::from(ai),
            24 => u64::from(self.byte()?),
            25 => u64::from(u16::from_be_bytes(self.array::<2>()?)),
            26 => u64::from(u32::from_be_bytes(self.array::<4>()?)),
            27 => u64::from_be_bytes(self.array::<8>()?),
            AI_INDEFINITE => return Ok(None),
            _ => {
                return Err(CborError::InvalidInitialByte {
                    byte: initial,
                    offset: start,
                })
            }
        };
        Ok(Some(v))
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], CborError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Definite length of a string or container.  Lengths that cannot be
    /// represented as `usize` are reported as missing input, which is what
    /// they are on any real buffer.
    fn length(&mut self, initial: u8, start: usize) -> Result<usize, CborError> {
        match self.argument(initial, start)? {
            Some(n) => Ok(usize::try_from(n).unwrap_or(usize::MAX)),
            None => Err(CborError::UnsupportedMajorType {
                major: initial >> 5,
                offset: start,
            }),
        }
    }

    fn item(&mut self, depth: usize) -> Result<CborValue, CborError> {
        let start = self.pos;

        if depth > self.max_depth {
            return Err(CborError::RecursionLimitExceeded {
                limit: self.max_depth,
                offset: start,
            });
        }

        let initial = self.byte()?;
        let major = initial >> 5;

        match major {
            MAJOR_UNSIGNED => match self.argument(initial, start)? {
                Some(n) => Ok(CborValue::Unsigned(n)),
                None => Err(CborError::InvalidInitialByte {
                    byte: initial,
                    offset: start,
                }),
            },
            MAJOR_NEGATIVE => match self.argument(initial, start)? {
                Some(n) => {
                    let n = i64::try_from(n)
                        .map_err(|_| CborError::IntegerOverflow { offset: start })?;
                    Ok(CborValue::Negative(-1 - n))
                }
                None => Err(CborError::InvalidInitialByte {
                    byte: initial,
                    offset: start,
                }),
            },
            MAJOR_BYTES => {
                let len = self.length(initial, start)?;
                Ok(CborValue::ByteString(self.take(len)?.to_vec()))
            }
            MAJOR_TEXT => {
                let len = self.length(initial, start)?;
                let body_offset = self.pos;
                let raw = self.take(len)?;
                let s = std::str::from_utf8(raw)
                    .map_err(|_| CborError::InvalidUtf8 {
                        offset: body_offset,
                    })?;
                Ok(CborValue::TextString(s.to_string()))
            }
            MAJOR_ARRAY => {
                let len = self.length(initial, start)?;
                // each element takes at least one byte
                let mut items = Vec::with_capacity(len.min(self.remaining()));
                for _ in 0..len {
                    items.push(self.item(depth + 1)?);
                }
                Ok(CborValue::Array(items))
            }
            MAJOR_MAP => {
                let len = self.length(initial, start)?;
                let mut entries = Vec::with_capacity(len.min(self.remaining() / 2));
                for _ in 0..len {
                    let k = self.item(depth + 1)?;
                    let v = self.item(depth + 1)?;
                    entries.push((k, v));
                }
                Ok(CborValue::Map(entries))
            }
            MAJOR_TAG => match self.argument(initial, start)? {
                Some(tag) => {
                    let inner = self.item(depth + 1)?;
                    Ok(CborValue::Tagged(tag, Box::new(inner)))
                }
                None => Err(CborError::InvalidInitialByte {
                    byte: initial,
                    offset: start,
                }),
            },
            // major type 7, the only value left of the 3 bits
            _ => self.simple(initial, start),
        }
    }

    fn simple(&mut self, initial: u8, start: usize) -> Result<CborValue, CborError> {
        let ai = initial & 0x1f;
        match ai {
            20 => Ok(CborValue::Boolean(false)),
            21 => Ok(CborValue::Boolean(true)),
            22 => Ok(CborValue::Null),
            23 => Ok(CborValue::Undefined),
            0..=19 => Ok(CborValue::Simple(ai)),
            24 => Ok(CborValue::Simple(self.byte()?)),
            // half, single and double precision floats: skipped, not kept
            25 => self.take(2).map(|_| CborValue::Simple(ai)),
            26 => self.take(4).map(|_| CborValue::Simple(ai)),
            27 => self.take(8).map(|_| CborValue::Simple(ai)),
            _ => Err(CborError::InvalidInitialByte {
                byte: initial,
                offset: start,
            }),
        }
    }
}

/// Decode one top-level item, ignoring anything that follows it.
pub fn decode(bytes: &[u8]) -> Result<CborValue, CborError> {
    decode_with(bytes, &DecoderOptions::default())
}

/// Decode one top-level item using the given options.
pub fn decode_with(bytes: &[u8], opts: &DecoderOptions) -> Result<CborValue, CborError> {
    let mut d = Decoder::with_max_depth(bytes, opts.max_depth);
    let v = d.decode_value()?;

    if !opts.allow_trailing_bytes && d.remaining() > 0 {
        return Err(CborError::TrailingBytes {
            offset: d.position(),
            remaining: d.remaining(),
        });
    }

    Ok(v)
}
