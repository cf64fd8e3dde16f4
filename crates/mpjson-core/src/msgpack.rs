//! MessagePack wire layer: `OrderedValue` <-> bytes.
//!
//! Covers the core MessagePack types (nil, booleans, all integer widths, float 32/64,
//! str, bin, array, map). Extension types are rejected rather than passed through.
//!
//! # Ordering and byte strings
//!
//! - Map pairs are decoded in wire order into an [`OrderedMap`]; nothing is re-sorted.
//! - `bin` decodes to [`OrderedValue::Bytes`] and `Bytes` always encodes as `bin`, never
//!   as `str`. That distinction is what lets the JSON side tell a byte payload apart
//!   from text.
//! - A map holding only a `"$binary"` string is rejected on decode: its JSON text
//!   would come back as a byte string.
//!
//! # Example
//! ```
//! use mpjson_core::msgpack::{decode_value, encode_value};
//! use mpjson_core::{OrderedMap, OrderedValue};
//!
//! let mut map = OrderedMap::new();
//! map.insert("b", 1i64).unwrap();
//! map.insert("a", 2i64).unwrap();
//! let bytes = encode_value(&OrderedValue::Map(map), false).unwrap();
//! assert_eq!(bytes, [0x82, 0xa1, b'b', 0x01, 0xa1, b'a', 0x02]);
//! let back = decode_value(&bytes, 128).unwrap();
//! assert_eq!(back.as_map().unwrap().keys().collect::<Vec<_>>(), ["b", "a"]);
//! ```

use crate::error::{DecodeError, EncodeError, Position, Result};
use crate::value::{OrderedMap, OrderedValue, Precision};

/// Wire tags (first byte of every value).
pub mod tag {
    pub const POSITIVE_FIXINT_MAX: u8 = 0x7f;
    pub const FIXMAP: u8 = 0x80;
    pub const FIXARRAY: u8 = 0x90;
    pub const FIXSTR: u8 = 0xa0;
    pub const NIL: u8 = 0xc0;
    pub const NEVER_USED: u8 = 0xc1;
    pub const FALSE: u8 = 0xc2;
    pub const TRUE: u8 = 0xc3;
    pub const BIN8: u8 = 0xc4;
    pub const BIN16: u8 = 0xc5;
    pub const BIN32: u8 = 0xc6;
    pub const EXT8: u8 = 0xc7;
    pub const EXT16: u8 = 0xc8;
    pub const EXT32: u8 = 0xc9;
    pub const FLOAT32: u8 = 0xca;
    pub const FLOAT64: u8 = 0xcb;
    pub const UINT8: u8 = 0xcc;
    pub const UINT16: u8 = 0xcd;
    pub const UINT32: u8 = 0xce;
    pub const UINT64: u8 = 0xcf;
    pub const INT8: u8 = 0xd0;
    pub const INT16: u8 = 0xd1;
    pub const INT32: u8 = 0xd2;
    pub const INT64: u8 = 0xd3;
    pub const FIXEXT1: u8 = 0xd4;
    pub const FIXEXT16: u8 = 0xd8;
    pub const STR8: u8 = 0xd9;
    pub const STR16: u8 = 0xda;
    pub const STR32: u8 = 0xdb;
    pub const ARRAY16: u8 = 0xdc;
    pub const ARRAY32: u8 = 0xdd;
    pub const MAP16: u8 = 0xde;
    pub const MAP32: u8 = 0xdf;
    pub const NEGATIVE_FIXINT_MIN: u8 = 0xe0;
}

/// Encode a value as MessagePack.
///
/// When `single_precision` is set every float is written as `float 32` regardless of
/// its precision tag. Narrowing rounds to nearest, ties to even; only a finite value
/// that overflows `f32` is rejected.
pub fn encode_value(
    value: &OrderedValue,
    single_precision: bool,
) -> Result<Vec<u8>, EncodeError> {
    let mut writer = Writer {
        out: Vec::new(),
        single_precision,
    };
    writer.write_any(value)?;
    Ok(writer.out)
}

/// Decode exactly one MessagePack value spanning all of `data`.
pub fn decode_value(data: &[u8], max_depth: usize) -> Result<OrderedValue> {
    let mut reader = Reader {
        data,
        pos: 0,
        depth: 0,
        max_depth,
    };
    let value = reader.read_any()?;
    if reader.pos != data.len() {
        return Err(DecodeError::TrailingData { offset: reader.pos });
    }
    Ok(value)
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Tags for a length-prefixed family. `fix` is `(base tag, max inline length)`.
struct LengthTags {
    kind: &'static str,
    fix: Option<(u8, usize)>,
    len8: Option<u8>,
    len16: u8,
    len32: u8,
}

const STR_TAGS: LengthTags = LengthTags {
    kind: "string",
    fix: Some((tag::FIXSTR, 31)),
    len8: Some(tag::STR8),
    len16: tag::STR16,
    len32: tag::STR32,
};

const BIN_TAGS: LengthTags = LengthTags {
    kind: "byte string",
    fix: None,
    len8: Some(tag::BIN8),
    len16: tag::BIN16,
    len32: tag::BIN32,
};

const ARRAY_TAGS: LengthTags = LengthTags {
    kind: "array",
    fix: Some((tag::FIXARRAY, 15)),
    len8: None,
    len16: tag::ARRAY16,
    len32: tag::ARRAY32,
};

const MAP_TAGS: LengthTags = LengthTags {
    kind: "map",
    fix: Some((tag::FIXMAP, 15)),
    len8: None,
    len16: tag::MAP16,
    len32: tag::MAP32,
};

struct Writer {
    out: Vec<u8>,
    single_precision: bool,
}

impl Writer {
    fn write_any(&mut self, value: &OrderedValue) -> Result<(), EncodeError> {
        match value {
            OrderedValue::Null => self.out.push(tag::NIL),
            OrderedValue::Bool(b) => self.out.push(if *b { tag::TRUE } else { tag::FALSE }),
            OrderedValue::Integer(n) => self.write_integer(*n)?,
            OrderedValue::Float(f, precision) => self.write_float(*f, *precision)?,
            OrderedValue::String(s) => self.write_str(s)?,
            OrderedValue::Bytes(bytes) => {
                self.write_length(&BIN_TAGS, bytes.len())?;
                self.out.extend_from_slice(bytes);
            }
            OrderedValue::Array(items) => {
                self.write_length(&ARRAY_TAGS, items.len())?;
                for item in items {
                    self.write_any(item)?;
                }
            }
            OrderedValue::Map(map) => {
                self.write_length(&MAP_TAGS, map.len())?;
                for (key, value) in map.iter() {
                    self.write_str(key)?;
                    self.write_any(value)?;
                }
            }
        }
        Ok(())
    }

    /// Smallest lossless integer form: fixints first, then 8/16/32/64-bit.
    fn write_integer(&mut self, n: i128) -> Result<(), EncodeError> {
        if n >= 0 {
            let n = u64::try_from(n).map_err(|_| EncodeError::IntegerOutOfRange { value: n })?;
            if n <= u64::from(tag::POSITIVE_FIXINT_MAX) {
                self.out.push(n as u8);
            } else if let Ok(n) = u8::try_from(n) {
                self.out.push(tag::UINT8);
                self.out.push(n);
            } else if let Ok(n) = u16::try_from(n) {
                self.out.push(tag::UINT16);
                self.out.extend_from_slice(&n.to_be_bytes());
            } else if let Ok(n) = u32::try_from(n) {
                self.out.push(tag::UINT32);
                self.out.extend_from_slice(&n.to_be_bytes());
            } else {
                self.out.push(tag::UINT64);
                self.out.extend_from_slice(&n.to_be_bytes());
            }
        } else {
            let n = i64::try_from(n).map_err(|_| EncodeError::IntegerOutOfRange { value: n })?;
            if n >= -32 {
                self.out.push(n as i8 as u8);
            } else if let Ok(n) = i8::try_from(n) {
                self.out.push(tag::INT8);
                self.out.extend_from_slice(&n.to_be_bytes());
            } else if let Ok(n) = i16::try_from(n) {
                self.out.push(tag::INT16);
                self.out.extend_from_slice(&n.to_be_bytes());
            } else if let Ok(n) = i32::try_from(n) {
                self.out.push(tag::INT32);
                self.out.extend_from_slice(&n.to_be_bytes());
            } else {
                self.out.push(tag::INT64);
                self.out.extend_from_slice(&n.to_be_bytes());
            }
        }
        Ok(())
    }

    fn write_float(&mut self, f: f64, precision: Precision) -> Result<(), EncodeError> {
        if self.single_precision || precision == Precision::Single {
            let narrowed = f as f32;
            if f.is_finite() && narrowed.is_infinite() {
                return Err(EncodeError::FloatOutOfRange { value: f });
            }
            self.out.push(tag::FLOAT32);
            self.out.extend_from_slice(&narrowed.to_be_bytes());
        } else {
            self.out.push(tag::FLOAT64);
            self.out.extend_from_slice(&f.to_be_bytes());
        }
        Ok(())
    }

    fn write_str(&mut self, s: &str) -> Result<(), EncodeError> {
        self.write_length(&STR_TAGS, s.len())?;
        self.out.extend_from_slice(s.as_bytes());
        Ok(())
    }

    fn write_length(&mut self, tags: &LengthTags, len: usize) -> Result<(), EncodeError> {
        if let Some((base, max)) = tags.fix {
            if len <= max {
                self.out.push(base | len as u8);
                return Ok(());
            }
        }
        if let (Some(len8), Ok(n)) = (tags.len8, u8::try_from(len)) {
            self.out.push(len8);
            self.out.push(n);
        } else if let Ok(n) = u16::try_from(len) {
            self.out.push(tags.len16);
            self.out.extend_from_slice(&n.to_be_bytes());
        } else if let Ok(n) = u32::try_from(len) {
            self.out.push(tags.len32);
            self.out.extend_from_slice(&n.to_be_bytes());
        } else {
            return Err(EncodeError::LengthOverflow {
                kind: tags.kind,
                len,
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
    depth: usize,
    max_depth: usize,
}

impl<'a> Reader<'a> {
    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(DecodeError::UnexpectedEof {
                offset: self.pos,
                needed: n - self.remaining(),
            });
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.take(N)?);
        Ok(buf)
    }

    fn peek(&self) -> Result<u8> {
        self.data
            .get(self.pos)
            .copied()
            .ok_or(DecodeError::UnexpectedEof {
                offset: self.pos,
                needed: 1,
            })
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.array::<1>()?[0])
    }

    fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.array()?))
    }

    fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.array()?))
    }

    fn read_any(&mut self) -> Result<OrderedValue> {
        let offset = self.pos;
        let byte = self.read_u8()?;
        let value = match byte {
            0x00..=tag::POSITIVE_FIXINT_MAX => OrderedValue::Integer(byte.into()),
            0x80..=0x8f => self.read_map(usize::from(byte & 0x0f), offset)?,
            0x90..=0x9f => self.read_array(usize::from(byte & 0x0f), offset)?,
            0xa0..=0xbf => OrderedValue::String(self.read_str(usize::from(byte & 0x1f))?),
            tag::NIL => OrderedValue::Null,
            tag::NEVER_USED => return Err(DecodeError::UnknownTag { offset, tag: byte }),
            tag::FALSE => OrderedValue::Bool(false),
            tag::TRUE => OrderedValue::Bool(true),
            tag::BIN8 => {
                let len = usize::from(self.read_u8()?);
                OrderedValue::Bytes(self.take(len)?.to_vec())
            }
            tag::BIN16 => {
                let len = usize::from(self.read_u16()?);
                OrderedValue::Bytes(self.take(len)?.to_vec())
            }
            tag::BIN32 => {
                let len = self.read_u32()? as usize;
                OrderedValue::Bytes(self.take(len)?.to_vec())
            }
            tag::EXT8..=tag::EXT32 | tag::FIXEXT1..=tag::FIXEXT16 => {
                return Err(DecodeError::UnsupportedExtension { offset, tag: byte })
            }
            tag::FLOAT32 => {
                let f = f32::from_be_bytes(self.array()?);
                OrderedValue::Float(f64::from(f), Precision::Single)
            }
            tag::FLOAT64 => OrderedValue::Float(f64::from_be_bytes(self.array()?), Precision::Double),
            tag::UINT8 => OrderedValue::Integer(self.read_u8()?.into()),
            tag::UINT16 => OrderedValue::Integer(self.read_u16()?.into()),
            tag::UINT32 => OrderedValue::Integer(self.read_u32()?.into()),
            tag::UINT64 => OrderedValue::Integer(u64::from_be_bytes(self.array()?).into()),
            tag::INT8 => OrderedValue::Integer(i8::from_be_bytes(self.array()?).into()),
            tag::INT16 => OrderedValue::Integer(i16::from_be_bytes(self.array()?).into()),
            tag::INT32 => OrderedValue::Integer(i32::from_be_bytes(self.array()?).into()),
            tag::INT64 => OrderedValue::Integer(i64::from_be_bytes(self.array()?).into()),
            tag::STR8 => {
                let len = usize::from(self.read_u8()?);
                OrderedValue::String(self.read_str(len)?)
            }
            tag::STR16 => {
                let len = usize::from(self.read_u16()?);
                OrderedValue::String(self.read_str(len)?)
            }
            tag::STR32 => {
                let len = self.read_u32()? as usize;
                OrderedValue::String(self.read_str(len)?)
            }
            tag::ARRAY16 => {
                let len = usize::from(self.read_u16()?);
                self.read_array(len, offset)?
            }
            tag::ARRAY32 => {
                let len = self.read_u32()? as usize;
                self.read_array(len, offset)?
            }
            tag::MAP16 => {
                let len = usize::from(self.read_u16()?);
                self.read_map(len, offset)?
            }
            tag::MAP32 => {
                let len = self.read_u32()? as usize;
                self.read_map(len, offset)?
            }
            tag::NEGATIVE_FIXINT_MIN..=0xff => OrderedValue::Integer((byte as i8).into()),
        };
        Ok(value)
    }

    fn read_str(&mut self, len: usize) -> Result<String> {
        let offset = self.pos;
        let bytes = self.take(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|_| DecodeError::InvalidUtf8 { offset })
    }

    /// Map keys must use the str family; anything else is rejected before it is read.
    fn read_key(&mut self) -> Result<String> {
        let offset = self.pos;
        let len = match self.peek()? {
            t @ 0xa0..=0xbf => {
                self.pos += 1;
                usize::from(t & 0x1f)
            }
            tag::STR8 => {
                self.pos += 1;
                usize::from(self.read_u8()?)
            }
            tag::STR16 => {
                self.pos += 1;
                usize::from(self.read_u16()?)
            }
            tag::STR32 => {
                self.pos += 1;
                self.read_u32()? as usize
            }
            _ => return Err(DecodeError::NonStringKey { offset }),
        };
        self.read_str(len)
    }

    fn enter(&mut self, offset: usize) -> Result<()> {
        if self.depth >= self.max_depth {
            return Err(DecodeError::DepthLimitExceeded {
                limit: self.max_depth,
                position: Position::Byte(offset),
            });
        }
        self.depth += 1;
        Ok(())
    }

    fn read_array(&mut self, len: usize, offset: usize) -> Result<OrderedValue> {
        self.enter(offset)?;
        // Every element takes at least one byte.
        let mut items = Vec::with_capacity(len.min(self.remaining()));
        for _ in 0..len {
            items.push(self.read_any()?);
        }
        self.depth -= 1;
        Ok(OrderedValue::Array(items))
    }

    fn read_map(&mut self, len: usize, offset: usize) -> Result<OrderedValue> {
        self.enter(offset)?;
        let capacity = len.min(self.remaining() / 2);
        let mut pairs = Vec::with_capacity(capacity);
        let mut key_offsets = Vec::with_capacity(capacity);
        for _ in 0..len {
            key_offsets.push(self.pos);
            let key = self.read_key()?;
            let value = self.read_any()?;
            pairs.push((key, value));
        }
        self.depth -= 1;
        let map = OrderedMap::try_from_pairs(pairs).map_err(|dup| DecodeError::DuplicateKey {
            position: Position::Byte(key_offsets[dup.index]),
            key: dup.key,
        })?;
        if map.as_binary_sentinel().is_some() {
            return Err(DecodeError::AmbiguousSentinel { offset });
        }
        Ok(OrderedValue::Map(map))
    }
}
