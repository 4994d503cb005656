//! Envelope - `[varint id][body]` のヘッダ層
//!
//! body の中身には関知しない。body の長さも書かない
//! （request type の decoder が残り全部を読む）。

use serde_json::Value;

use super::varint::{read_varint, write_varint};
use crate::error::DispatchError;

/// decode 済みの 1 メッセージ
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub id: u64,
    pub name: String,
    pub value: Value,
}

/// `varint(id)` を `buf` に追記
pub fn encode_header(id: u64, buf: &mut Vec<u8>) {
    write_varint(id, buf);
}

/// 先頭の id を読み、`(id, body)` に分ける
pub fn decode_header(bytes: &[u8]) -> Result<(u64, &[u8]), DispatchError> {
    let (id, consumed) = read_varint(bytes)?;
    Ok((id, &bytes[consumed..]))
}
