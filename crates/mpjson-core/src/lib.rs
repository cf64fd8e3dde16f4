//! # mpjson-core
//!
//! Order-preserving transcoder between **JSON** and **MessagePack**.
//!
//! Object keys keep their order in both directions, and raw MessagePack byte strings
//! survive a trip through JSON as the sentinel object `{"$binary": "<hex>"}`.
//!
//! ## Quick start
//!
//! ```rust
//! use mpjson_core::{decode, encode};
//!
//! // JSON → MessagePack
//! let json = r#"{"b": 1, "a": {"$binary": "00ff"}}"#;
//! let bytes = encode(json, false).unwrap();
//! assert_eq!(bytes, b"\x82\xa1b\x01\xa1a\xc4\x02\x00\xff");
//!
//! // MessagePack → JSON (roundtrip)
//! let back = decode(&bytes).unwrap();
//! assert_eq!(back, json);
//! ```
//!
//! ## Modules
//!
//! - [`encoder`]: JSON string → MessagePack bytes
//! - [`decoder`]: MessagePack bytes → JSON string
//! - [`value`]: `OrderedValue` tree shared by both directions
//! - [`msgpack`]: MessagePack wire layer
//! - [`json`]: JSON parser and writer
//! - [`error`]: Error types for decode/encode failures

pub mod decoder;
pub mod encoder;
pub mod error;
pub mod json;
pub mod msgpack;
pub mod value;

pub use decoder::{decode, decode_with, DecodeOptions, DEFAULT_MAX_DEPTH};
pub use encoder::{encode, encode_with, EncodeOptions};
pub use error::{DecodeError, EncodeError, Position};
pub use json::TextStyle;
pub use value::{OrderedMap, OrderedValue, Precision, BINARY_SENTINEL_KEY};
