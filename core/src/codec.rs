//! Posting list codecs: gap (delta) encoding and variable-byte encoding.
//!
//! Var-byte layout: 7-bit groups, least-significant group first. Every byte
//! except the last carries the continuation flag `0x80`; the last byte has the
//! high bit clear. Values are `u32`, so a valid encoding is 1 to 5 bytes long.

use crate::error::{IndexError, Result};
use crate::DocId;

const CONTINUATION: u8 = 0x80;
const PAYLOAD: u8 = 0x7F;

/// Longest var-byte encoding of a `u32`.
pub const MAX_VAR_BYTE_LEN: usize = 5;

/// Encode ascending, duplicate-free ids as gaps. The first element is the
/// anchor (smallest id), every following element is the distance to its
/// predecessor and therefore strictly positive.
pub fn encode_gaps(ids: &[DocId]) -> Result<Vec<u32>> {
    let mut gaps = Vec::with_capacity(ids.len());
    let mut prev: Option<DocId> = None;
    for (i, &id) in ids.iter().enumerate() {
        match prev {
            None => gaps.push(id),
            Some(p) if id > p => gaps.push(id - p),
            Some(p) => {
                return Err(IndexError::invalid(format!(
                    "ids not strictly ascending at position {i}: {p} then {id}"
                )))
            }
        }
        prev = Some(id);
    }
    Ok(gaps)
}

/// Inverse of [`encode_gaps`]: running prefix sum from the anchor.
///
/// Rejects zero gaps after the anchor (they would reintroduce duplicates) and
/// sums that leave the `u32` id range.
pub fn decode_gaps(gaps: &[u32]) -> Result<Vec<DocId>> {
    let mut ids = Vec::with_capacity(gaps.len());
    let mut current: DocId = 0;
    for (i, &gap) in gaps.iter().enumerate() {
        if i == 0 {
            current = gap;
        } else {
            if gap == 0 {
                return Err(IndexError::invalid(format!("zero gap at position {i}")));
            }
            current = current
                .checked_add(gap)
                .ok_or_else(|| IndexError::invalid(format!("id overflow at position {i}")))?;
        }
        ids.push(current);
    }
    Ok(ids)
}

/// Append the var-byte encoding of `n` to `out`.
pub fn encode_var_byte_into(mut n: u32, out: &mut Vec<u8>) {
    while n >= 128 {
        out.push((n % 128) as u8 | CONTINUATION);
        n /= 128;
    }
    out.push((n % 128) as u8);
}

/// Var-byte encoding of a single integer; always at least one byte.
pub fn encode_var_byte(n: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(MAX_VAR_BYTE_LEN);
    encode_var_byte_into(n, &mut out);
    out
}

/// Decode one var-byte integer from the front of `bytes`.
///
/// Returns the value and the number of bytes consumed. Input that ends before
/// a terminating byte is `TruncatedData`; an encoding wider than `u32` is
/// `InvalidInput`.
pub fn decode_var_byte(bytes: &[u8]) -> Result<(u32, usize)> {
    let mut value: u64 = 0;
    for (i, &byte) in bytes.iter().enumerate() {
        if i == MAX_VAR_BYTE_LEN {
            return Err(IndexError::invalid("var-byte integer exceeds 32 bits"));
        }
        value += u64::from(byte & PAYLOAD) << (7 * i);
        if byte & CONTINUATION == 0 {
            let value = u32::try_from(value)
                .map_err(|_| IndexError::invalid("var-byte integer exceeds 32 bits"))?;
            return Ok((value, i + 1));
        }
    }
    Err(IndexError::TruncatedData { context: "var-byte integer" })
}

/// Compact byte form of a posting list: var-byte count, then var-byte gaps.
pub fn encode_posting_list(ids: &[DocId]) -> Result<Vec<u8>> {
    let gaps = encode_gaps(ids)?;
    let count = u32::try_from(gaps.len())
        .map_err(|_| IndexError::invalid("posting list longer than u32::MAX"))?;
    let mut out = Vec::with_capacity(gaps.len() + MAX_VAR_BYTE_LEN);
    encode_var_byte_into(count, &mut out);
    for gap in gaps {
        encode_var_byte_into(gap, &mut out);
    }
    Ok(out)
}

/// Inverse of [`encode_posting_list`]. The whole buffer must be consumed.
pub fn decode_posting_list(bytes: &[u8]) -> Result<Vec<DocId>> {
    let (count, mut pos) = decode_var_byte(bytes)?;
    // every gap needs at least one byte, so a corrupt count can't over-allocate
    let mut gaps = Vec::with_capacity((count as usize).min(bytes.len() - pos));
    for _ in 0..count {
        let (gap, read) = decode_var_byte(&bytes[pos..])?;
        gaps.push(gap);
        pos += read;
    }
    if pos != bytes.len() {
        return Err(IndexError::invalid(format!(
            "{} trailing bytes after posting list",
            bytes.len() - pos
        )));
    }
    decode_gaps(&gaps)
}
