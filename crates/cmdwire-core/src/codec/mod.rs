//! Codec - wire format
//!
//! - **varint**: unsigned LEB128
//! - **envelope**: `[varint id][body]`
//!
//! body のエンコードは TypeResolver が返す TypeHandle の責務。

pub mod envelope;
pub mod varint;

pub use self::envelope::{Envelope, decode_header, encode_header};
pub use self::varint::{VarintError, read_varint, write_varint};

use thiserror::Error;

/// CodecError は request body の encode/decode エラー
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("field '{field}': expected {expected}")]
    InvalidField {
        field: String,
        expected: &'static str,
    },

    #[error("expected an object for type {0}")]
    NotAnObject(String),

    #[error("unexpected end of body")]
    UnexpectedEof,

    #[error("{0} trailing bytes after body")]
    TrailingBytes(usize),

    #[error("invalid utf-8 in string field '{0}'")]
    InvalidUtf8(String),

    #[error(transparent)]
    Varint(#[from] VarintError),
}
