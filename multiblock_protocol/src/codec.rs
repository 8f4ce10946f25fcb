// Binary primitives for per-cell sync deltas.
//
// A delta is a flat sequence of fields with no tags and no per-field length
// prefixes; the reader has to know the layout (see `multiblock_sim::sync`).
// Primitive layout:
// - bool:   one byte, 0 or 1. Any other byte is rejected.
// - i32:    four bytes, big-endian.
// - VarInt: unsigned, 7 bits per byte, low group first, high bit = "more".
//           At most 5 bytes.
// - string: VarInt byte length, then that many UTF-8 bytes. At most
//           `MAX_STRING_BYTES`.
//
// `WireReader` never panics on short or garbled input. Every read returns a
// `DecodeError` instead, so a caller can parse a whole delta before touching
// any of its own state and drop the delta if anything is wrong.

use thiserror::Error;

/// Longest string the wire format accepts, in bytes.
pub const MAX_STRING_BYTES: usize = 32767;

const MAX_VARINT_BYTES: usize = 5;

/// Reasons a delta fails to decode.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("truncated {field}: needed {needed} bytes, {remaining} left")]
    Truncated {
        field: &'static str,
        needed: usize,
        remaining: usize,
    },
    #[error("invalid bool byte {byte:#04x} in {field}")]
    InvalidBool { field: &'static str, byte: u8 },
    #[error("varint in {0} longer than 5 bytes")]
    VarIntTooLong(&'static str),
    #[error("string in {field} is {len} bytes (max 32767)")]
    StringTooLong { field: &'static str, len: usize },
    #[error("string in {0} is not valid UTF-8")]
    InvalidUtf8(&'static str),
    #[error("{0} trailing bytes after the last field")]
    TrailingBytes(usize),
}

/// Reasons a value cannot be written.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    #[error("string is {0} bytes (max 32767)")]
    StringTooLong(usize),
}

/// Append-only writer for delta fields.
#[derive(Clone, Debug, Default)]
pub struct WireWriter {
    buf: Vec<u8>,
}

impl WireWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_bool(&mut self, value: bool) {
        self.buf.push(u8::from(value));
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_varint(&mut self, value: u32) {
        let mut rest = value;
        loop {
            let group = (rest & 0x7F) as u8;
            rest >>= 7;
            if rest == 0 {
                self.buf.push(group);
                return;
            }
            self.buf.push(group | 0x80);
        }
    }

    pub fn write_string(&mut self, value: &str) -> Result<(), EncodeError> {
        let len = value.len();
        if len > MAX_STRING_BYTES {
            return Err(EncodeError::StringTooLong(len));
        }
        #[expect(clippy::cast_possible_truncation)]
        let prefix = len as u32;
        self.write_varint(prefix);
        self.buf.extend_from_slice(value.as_bytes());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Cursor over a received delta. Each read names the field it is reading so
/// errors say where the delta broke off.
#[derive(Clone, Debug)]
pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, needed: usize, field: &'static str) -> Result<&'a [u8], DecodeError> {
        let remaining = self.remaining();
        if needed > remaining {
            return Err(DecodeError::Truncated {
                field,
                needed,
                remaining,
            });
        }
        let bytes = &self.buf[self.pos..self.pos + needed];
        self.pos += needed;
        Ok(bytes)
    }

    pub fn read_bool(&mut self, field: &'static str) -> Result<bool, DecodeError> {
        match self.take(1, field)?[0] {
            0 => Ok(false),
            1 => Ok(true),
            byte => Err(DecodeError::InvalidBool { field, byte }),
        }
    }

    pub fn read_i32(&mut self, field: &'static str) -> Result<i32, DecodeError> {
        let bytes = self.take(4, field)?;
        Ok(i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_varint(&mut self, field: &'static str) -> Result<u32, DecodeError> {
        let mut value: u32 = 0;
        for i in 0..MAX_VARINT_BYTES {
            let byte = self.take(1, field)?[0];
            value |= u32::from(byte & 0x7F) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(DecodeError::VarIntTooLong(field))
    }

    pub fn read_string(&mut self, field: &'static str) -> Result<String, DecodeError> {
        let len = self.read_varint(field)? as usize;
        if len > MAX_STRING_BYTES {
            return Err(DecodeError::StringTooLong { field, len });
        }
        let bytes = self.take(len, field)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| DecodeError::InvalidUtf8(field))
    }

    /// Consume the reader, rejecting any bytes left over.
    pub fn finish(self) -> Result<(), DecodeError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(DecodeError::TrailingBytes(n)),
        }
    }
}
