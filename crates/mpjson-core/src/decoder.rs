//! MessagePack -> JSON.
//!
//! The bytes are decoded into an [`OrderedValue`](crate::OrderedValue) with map pairs in
//! wire order, then written as JSON. Byte strings, including a bare top-level one,
//! come out as `{"$binary": "<hex>"}`.
//!
//! # Example
//! ```
//! use mpjson_core::decode;
//! let json = decode(b"\x83\xa1a\x01\xa1b\x02\xa1c\x03").unwrap();
//! assert_eq!(json, r#"{"a": 1, "b": 2, "c": 3}"#);
//!
//! let blob = decode(b"\xc4\x02\xca\xfe").unwrap();
//! assert_eq!(blob, r#"{"$binary": "cafe"}"#);
//! ```

use tracing::debug;

use crate::error::Result;
use crate::json::{self, TextStyle};
use crate::msgpack;

/// Nesting limit applied by both decoders unless configured otherwise.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Settings for [`decode_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Maximum container nesting accepted from the MessagePack input.
    pub max_depth: usize,
    /// Layout of the JSON output.
    pub style: TextStyle,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            style: TextStyle::default(),
        }
    }
}

/// Decode MessagePack bytes into JSON text (`", "` / `": "` separators).
pub fn decode(data: &[u8]) -> Result<String> {
    decode_with(data, &DecodeOptions::default())
}

/// Decode MessagePack bytes into JSON text with explicit options.
pub fn decode_with(data: &[u8], options: &DecodeOptions) -> Result<String> {
    let value = msgpack::decode_value(data, options.max_depth)?;
    let text = json::write_value(&value, options.style)?;
    debug!(
        binary_len = data.len(),
        text_len = text.len(),
        root = value.kind(),
        "decoded MessagePack to JSON"
    );
    Ok(text)
}
