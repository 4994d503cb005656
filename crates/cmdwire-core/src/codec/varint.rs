//! Varint - unsigned LEB128
//!
//! 7 bit ずつ下位から詰め、最上位 bit を continuation に使う。
//! u64 は最大 10 byte。
//!
//! ```text
//! 300 = 0b1_0010_1100
//!   byte 0: 0b1_0101100 = 0xAC  (下位 7 bit, continuation=1)
//!   byte 1: 0b0_0000010 = 0x02  (残り, continuation=0)
//! ```

use thiserror::Error;

/// u64 のエンコードに必要な最大バイト数
pub const MAX_VARINT_LEN: usize = 10;

const CONTINUATION_BIT: u8 = 0x80;
const DATA_MASK: u8 = 0x7F;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum VarintError {
    /// buffer が空、または varint の途中で切れている
    #[error("unexpected end of buffer while reading varint")]
    UnexpectedEof,

    /// u64 に収まらない
    #[error("varint overflow (too many bytes for u64)")]
    Overflow,
}

/// `value` を `buf` の末尾に追記し、書いたバイト数を返す
pub fn write_varint(mut value: u64, buf: &mut Vec<u8>) -> usize {
    let mut written = 0;
    loop {
        let byte = (value & u64::from(DATA_MASK)) as u8;
        value >>= 7;
        written += 1;
        if value == 0 {
            buf.push(byte);
            return written;
        }
        buf.push(byte | CONTINUATION_BIT);
    }
}

/// 先頭の varint を読み、`(value, consumed)` を返す
pub fn read_varint(buf: &[u8]) -> Result<(u64, usize), VarintError> {
    let mut value: u64 = 0;
    let mut shift = 0u32;

    for (i, &byte) in buf.iter().enumerate() {
        if i >= MAX_VARINT_LEN {
            return Err(VarintError::Overflow);
        }
        let data = u64::from(byte & DATA_MASK);
        // 10 byte 目は 1 bit しか使えない
        if shift == 63 && data > 1 {
            return Err(VarintError::Overflow);
        }
        value |= data << shift;
        if byte & CONTINUATION_BIT == 0 {
            return Ok((value, i + 1));
        }
        shift += 7;
    }

    Err(VarintError::UnexpectedEof)
}

/// `value` のエンコード後のバイト数
pub const fn varint_len(value: u64) -> usize {
    if value == 0 {
        return 1;
    }
    let bits = 64 - value.leading_zeros() as usize;
    bits.div_ceil(7)
}
