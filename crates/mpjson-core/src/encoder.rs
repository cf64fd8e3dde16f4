//! JSON -> MessagePack.
//!
//! The JSON text is parsed into an [`OrderedValue`](crate::OrderedValue) (key order
//! kept, `$binary` sentinels turned into byte strings) and then written as MessagePack.
//!
//! # Example
//! ```
//! use mpjson_core::encode;
//! let bytes = encode(r#"{"a": 1, "b": 2, "c": 3}"#, false).unwrap();
//! assert_eq!(bytes, b"\x83\xa1a\x01\xa1b\x02\xa1c\x03");
//! ```

use tracing::debug;

use crate::decoder::DEFAULT_MAX_DEPTH;
use crate::error::{EncodeError, Result};
use crate::{json, msgpack};

/// Settings for [`encode_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Write every float as `float 32` (rounded to nearest, ties to even).
    pub single_precision: bool,
    /// Maximum container nesting accepted from the JSON input.
    pub max_depth: usize,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            single_precision: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Encode a JSON string as MessagePack.
///
/// `single_precision_output` selects 4-byte floats for every number with a fraction
/// or exponent; otherwise floats are written with 8 bytes.
pub fn encode(text: &str, single_precision_output: bool) -> Result<Vec<u8>, EncodeError> {
    encode_with(
        text,
        &EncodeOptions {
            single_precision: single_precision_output,
            ..EncodeOptions::default()
        },
    )
}

/// Encode a JSON string as MessagePack with explicit options.
pub fn encode_with(text: &str, options: &EncodeOptions) -> Result<Vec<u8>, EncodeError> {
    let value = json::parse_value(text, options.max_depth)?;
    let bytes = msgpack::encode_value(&value, options.single_precision)?;
    debug!(
        text_len = text.len(),
        binary_len = bytes.len(),
        root = value.kind(),
        single_precision = options.single_precision,
        "encoded JSON to MessagePack"
    );
    Ok(bytes)
}
