// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::errors::Asn1Error;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TagClass {
    Universal,
    Application,
    ContextSpecific,
    Private,
}

/// An identifier octet (plus, for high tag numbers, its continuation bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag {
    raw: u8,
    number: u32,
}

impl Tag {
    pub const BOOLEAN: Tag = Tag::from_byte(0x01);
    pub const INTEGER: Tag = Tag::from_byte(0x02);
    pub const BIT_STRING: Tag = Tag::from_byte(0x03);
    pub const OCTET_STRING: Tag = Tag::from_byte(0x04);
    pub const NULL: Tag = Tag::from_byte(0x05);
    pub const OID: Tag = Tag::from_byte(0x06);
    pub const UTF8_STRING: Tag = Tag::from_byte(0x0c);
    pub const NUMERIC_STRING: Tag = Tag::from_byte(0x12);
    pub const PRINTABLE_STRING: Tag = Tag::from_byte(0x13);
    pub const TELETEX_STRING: Tag = Tag::from_byte(0x14);
    pub const IA5_STRING: Tag = Tag::from_byte(0x16);
    pub const UTC_TIME: Tag = Tag::from_byte(0x17);
    pub const GENERALIZED_TIME: Tag = Tag::from_byte(0x18);
    pub const VISIBLE_STRING: Tag = Tag::from_byte(0x1a);
    pub const UNIVERSAL_STRING: Tag = Tag::from_byte(0x1c);
    pub const BMP_STRING: Tag = Tag::from_byte(0x1e);
    pub const SEQUENCE: Tag = Tag::from_byte(0x30);
    pub const SET: Tag = Tag::from_byte(0x31);

    /// Tag for a single identifier octet (tag numbers below 31).
    pub const fn from_byte(raw: u8) -> Tag {
        Tag {
            raw,
            number: (raw & 0x1f) as u32,
        }
    }

    /// Context-specific tag `[number]`.
    pub const fn context(number: u32, constructed: bool) -> Tag {
        let c = if constructed { 0x20 } else { 0x00 };
        if number < 0x1f {
            Tag {
                raw: 0x80 | c | number as u8,
                number,
            }
        } else {
            Tag {
                raw: 0x80 | c | 0x1f,
                number,
            }
        }
    }

    /// The first identifier octet, as found on the wire.
    pub fn raw(&self) -> u8 {
        self.raw
    }

    pub fn class(&self) -> TagClass {
        match self.raw >> 6 {
            0 => TagClass::Universal,
            1 => TagClass::Application,
            2 => TagClass::ContextSpecific,
            _ => TagClass::Private,
        }
    }

    pub fn constructed(&self) -> bool {
        self.raw & 0x20 != 0
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    fn universal_name(&self) -> Option<&'static str> {
        if self.class() != TagClass::Universal {
            return None;
        }
        let name = match self.number {
            1 => "BOOLEAN",
            2 => "INTEGER",
            3 => "BIT STRING",
            4 => "OCTET STRING",
            5 => "NULL",
            6 => "OBJECT IDENTIFIER",
            12 => "UTF8String",
            16 => "SEQUENCE",
            17 => "SET",
            18 => "NumericString",
            19 => "PrintableString",
            20 => "TeletexString",
            22 => "IA5String",
            23 => "UTCTime",
            24 => "GeneralizedTime",
            26 => "VisibleString",
            28 => "UniversalString",
            30 => "BMPString",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = self.universal_name() {
            return f.write_str(name);
        }
        let class = match self.class() {
            TagClass::Universal => "UNIVERSAL ",
            TagClass::Application => "APPLICATION ",
            TagClass::ContextSpecific => "",
            TagClass::Private => "PRIVATE ",
        };
        write!(f, "[{class}{}]", self.number)
    }
}

/// A decoded tag-length-value node.  The value borrows from the buffer the
/// reader was built on; copy it out with `to_vec()` to keep it longer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tlv<'a> {
    pub tag: Tag,
    /// Absolute offset of the first identifier octet.
    pub offset: usize,
    header_len: usize,
    raw: &'a [u8],
}

impl<'a> Tlv<'a> {
    /// Value octets.
    pub fn value(&self) -> &'a [u8] {
        &self.raw[self.header_len..]
    }

    /// The complete encoding, identifier and length octets included.
    pub fn raw(&self) -> &'a [u8] {
        self.raw
    }

    pub fn header_len(&self) -> usize {
        self.header_len
    }

    /// Absolute offset of the first value octet.
    pub fn value_offset(&self) -> usize {
        self.offset + self.header_len
    }

    /// Byte range of the value within the original buffer.
    pub fn value_range(&self) -> std::ops::Range<usize> {
        self.value_offset()..self.value_offset() + self.value().len()
    }

    /// A reader over this node's value, keeping absolute offsets.
    pub fn reader(&self) -> DerReader<'a> {
        DerReader::nested(self.value(), self.value_offset())
    }

    pub fn expect(self, tag: Tag) -> Result<Tlv<'a>, Asn1Error> {
        if self.tag != tag {
            return Err(Asn1Error::UnexpectedTag {
                expected: tag,
                found: self.tag,
                offset: self.offset,
            });
        }
        Ok(self)
    }
}

/// A forward-only cursor over DER encoded TLVs.  The reader never recurses on
/// its own: callers open [`Tlv::reader`] on constructed nodes.
#[derive(Debug, Clone)]
pub struct DerReader<'a> {
    buf: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> DerReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self::nested(buf, 0)
    }

    fn nested(buf: &'a [u8], base: usize) -> Self {
        Self { buf, pos: 0, base }
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    /// Absolute offset of the next TLV.
    pub fn position(&self) -> usize {
        self.base + self.pos
    }

    /// The not yet consumed part of the buffer.
    pub fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    fn read_tag(&self, at: usize) -> Result<(Tag, usize), Asn1Error> {
        let start = self.base + self.pos;
        let truncated = Asn1Error::TruncatedTlv { offset: start };

        let raw = *self.buf.get(at).ok_or(truncated.clone())?;
        if raw & 0x1f != 0x1f {
            return Ok((Tag::from_byte(raw), at + 1));
        }

        let mut number: u32 = 0;
        let mut i = at + 1;
        loop {
            let b = *self.buf.get(i).ok_or(truncated.clone())?;
            if number > (u32::MAX >> 7) {
                return Err(Asn1Error::InvalidValue {
                    what: "tag number",
                    offset: start,
                });
            }
            number = (number << 7) | u32::from(b & 0x7f);
            i += 1;
            if b & 0x80 == 0 {
                break;
            }
        }

        Ok((Tag { raw, number }, i))
    }

    fn read_length(&self, at: usize) -> Result<(usize, usize), Asn1Error> {
        let start = self.base + self.pos;

        let first = *self
            .buf
            .get(at)
            .ok_or(Asn1Error::TruncatedTlv { offset: start })?;

        if first < 0x80 {
            return Ok((usize::from(first), at + 1));
        }

        // 0x80 is the indefinite form, which DER forbids; 0xff is reserved
        let n = usize::from(first & 0x7f);
        if n == 0 || first == 0xff || n > std::mem::size_of::<usize>() {
            return Err(Asn1Error::InvalidLength { offset: start });
        }

        let octets = self
            .buf
            .get(at + 1..at + 1 + n)
            .ok_or(Asn1Error::TruncatedTlv { offset: start })?;

        let len = octets
            .iter()
            .fold(0usize, |acc, b| (acc << 8) | usize::from(*b));

        Ok((len, at + 1 + n))
    }

    /// Tag of the next TLV without consuming it, `None` at end of input.
    pub fn peek_tag(&self) -> Result<Option<Tag>, Asn1Error> {
        if self.is_empty() {
            return Ok(None);
        }
        self.read_tag(self.pos).map(|(t, _)| Some(t))
    }

    /// Read the next TLV and advance past it.
    pub fn read_tlv(&mut self) -> Result<Tlv<'a>, Asn1Error> {
        let offset = self.base + self.pos;

        let (tag, after_tag) = self.read_tag(self.pos)?;
        let (length, value_start) = self.read_length(after_tag)?;

        let available = self.buf.len() - value_start;
        if length > available {
            return Err(Asn1Error::LengthExceedsBuffer {
                offset,
                length,
                available,
            });
        }

        let end = value_start + length;
        let tlv = Tlv {
            tag,
            offset,
            header_len: value_start - self.pos,
            raw: &self.buf[self.pos..end],
        };
        self.pos = end;

        Ok(tlv)
    }

    /// Read the next TLV, which must carry `tag`.
    pub fn read_expected(&mut self, tag: Tag) -> Result<Tlv<'a>, Asn1Error> {
        self.read_tlv()?.expect(tag)
    }

    /// Read the next TLV only when it carries `tag`.
    pub fn read_optional(&mut self, tag: Tag) -> Result<Option<Tlv<'a>>, Asn1Error> {
        match self.peek_tag()? {
            Some(t) if t == tag => self.read_tlv().map(Some),
            _ => Ok(None),
        }
    }

    /// Read a constructed node with `tag` and return a reader over its value.
    pub fn read_constructed(&mut self, tag: Tag) -> Result<DerReader<'a>, Asn1Error> {
        Ok(self.read_expected(tag)?.reader())
    }

    /// Read every remaining TLV.
    pub fn read_all(&mut self) -> Result<Vec<Tlv<'a>>, Asn1Error> {
        let mut v = Vec::new();
        while !self.is_empty() {
            v.push(self.read_tlv()?);
        }
        Ok(v)
    }
}
