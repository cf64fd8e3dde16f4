//! Error types for MessagePack and JSON transcoding.

use std::fmt;
use thiserror::Error;

/// Where in the input an error was detected.
///
/// Binary input is addressed by byte offset; text input by 1-based line and
/// column (columns count characters, not bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Byte(usize),
    Text { line: usize, column: usize },
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Byte(offset) => write!(f, "byte offset {offset}"),
            Position::Text { line, column } => write!(f, "line {line}, column {column}"),
        }
    }
}

/// Malformed input in either format.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The input ended before a complete value was read.
    #[error("unexpected end of input at byte offset {offset}: {needed} more byte(s) required")]
    UnexpectedEof { offset: usize, needed: usize },

    /// A MessagePack type tag that has no meaning (`0xc1`).
    #[error("unknown MessagePack type tag 0x{tag:02x} at byte offset {offset}")]
    UnknownTag { offset: usize, tag: u8 },

    /// A MessagePack extension type; extensions are not part of the data model.
    #[error("unsupported MessagePack extension tag 0x{tag:02x} at byte offset {offset}")]
    UnsupportedExtension { offset: usize, tag: u8 },

    /// A MessagePack str payload that is not valid UTF-8.
    #[error("invalid UTF-8 in string payload at byte offset {offset}")]
    InvalidUtf8 { offset: usize },

    /// A MessagePack map key that is not a string.
    #[error("map key at byte offset {offset} is not a string")]
    NonStringKey { offset: usize },

    /// The same key appears twice in one map or object.
    #[error("duplicate key {key:?} at {position}")]
    DuplicateKey { key: String, position: Position },

    /// A MessagePack map of exactly one `"$binary"` string pair. Its JSON form would
    /// read back as a byte string.
    #[error("map at byte offset {offset} has the reserved {{\"$binary\": <string>}} shape")]
    AmbiguousSentinel { offset: usize },

    /// Bytes remain after the top-level MessagePack value.
    #[error("trailing data after top-level value at byte offset {offset}")]
    TrailingData { offset: usize },

    /// Containers are nested deeper than the configured limit.
    #[error("nesting depth limit of {limit} exceeded at {position}")]
    DepthLimitExceeded { limit: usize, position: Position },

    /// The input was not valid JSON.
    #[error("JSON syntax error at line {line}, column {column} (byte offset {offset}): {message}")]
    Syntax {
        line: usize,
        column: usize,
        offset: usize,
        message: String,
    },

    /// A `$binary` sentinel whose payload is not an even-length hex string.
    #[error("invalid hex in $binary payload at {position}: {message}")]
    InvalidHex { position: Position, message: String },

    /// A JSON number too large to represent as a finite double.
    #[error("number out of range at {position}")]
    NumberOutOfRange { position: Position },

    /// The decoded value could not be written as JSON text (e.g. NaN or infinity).
    #[error("JSON write error: {0}")]
    Text(#[from] serde_json::Error),
}

/// A value that cannot be represented in MessagePack.
#[derive(Error, Debug)]
pub enum EncodeError {
    /// The JSON input failed to parse.
    #[error(transparent)]
    Parse(#[from] DecodeError),

    /// An integer outside `[-2^63, 2^64 - 1]`.
    #[error("integer {value} is outside the MessagePack integer range")]
    IntegerOutOfRange { value: i128 },

    /// A finite float that overflows single precision.
    #[error("float {value} cannot be narrowed to single precision")]
    FloatOutOfRange { value: f64 },

    /// A string, byte string or container longer than `u32::MAX`.
    #[error("{kind} length {len} exceeds the MessagePack 32-bit limit")]
    LengthOverflow { kind: &'static str, len: usize },
}

/// Convenience alias used throughout mpjson-core.
pub type Result<T, E = DecodeError> = std::result::Result<T, E>;
