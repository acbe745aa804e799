//! Canonical length-prefixed encoding for the journal's two tuple shapes:
//! log records `[key, value, prev_update_counter]` and KV-stored records
//! `[value, update_counter]`.
//!
//! Every field is framed as `varint(len) || bytes`; integers are first
//! reduced to their minimal big-endian representation (no leading zero
//! byte, zero encodes as the empty string) and then framed the same way as
//! any other byte string. The scheme is deterministic and its own inverse,
//! which is all `statejournal.py`'s use of `rlp.encode`/`rlp.decode` ever
//! relied on for these two shapes -- there is no need for a general
//! recursive list codec here.

use crate::error::{JournalError, Result};

fn write_varint(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            buf.push(byte);
            break;
        } else {
            buf.push(byte | 0x80);
        }
    }
}

fn read_varint(bytes: &[u8], pos: &mut usize) -> Result<u64> {
    let mut value: u64 = 0;
    let mut shift = 0u32;
    loop {
        let byte = *bytes
            .get(*pos)
            .ok_or_else(|| JournalError::Encoding("truncated varint".into()))?;
        *pos += 1;
        value |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
        if shift >= 64 {
            return Err(JournalError::Encoding("varint too long".into()));
        }
    }
}

fn write_bytes(buf: &mut Vec<u8>, b: &[u8]) {
    write_varint(buf, b.len() as u64);
    buf.extend_from_slice(b);
}

fn read_bytes<'a>(bytes: &'a [u8], pos: &mut usize) -> Result<&'a [u8]> {
    let len = read_varint(bytes, pos)? as usize;
    let end = pos
        .checked_add(len)
        .ok_or_else(|| JournalError::Encoding("length overflow".into()))?;
    let slice = bytes
        .get(*pos..end)
        .ok_or_else(|| JournalError::Encoding("truncated byte string".into()))?;
    *pos = end;
    Ok(slice)
}

/// Minimal big-endian representation of `v`: no leading zero byte, `0`
/// encodes as the empty byte string.
fn minimal_be(v: u64) -> Vec<u8> {
    if v == 0 {
        return Vec::new();
    }
    let full = v.to_be_bytes();
    let first_nonzero = full.iter().position(|&b| b != 0).unwrap();
    full[first_nonzero..].to_vec()
}

fn be_to_u64(bytes: &[u8]) -> Result<u64> {
    if bytes.len() > 8 {
        return Err(JournalError::Encoding("integer wider than 64 bits".into()));
    }
    if !bytes.is_empty() && bytes[0] == 0 {
        return Err(JournalError::Encoding("non-minimal integer encoding".into()));
    }
    let mut v: u64 = 0;
    for &b in bytes {
        v = (v << 8) | u64::from(b);
    }
    Ok(v)
}

fn write_uint(buf: &mut Vec<u8>, v: u64) {
    write_bytes(buf, &minimal_be(v));
}

fn read_uint(bytes: &[u8], pos: &mut usize) -> Result<u64> {
    let slice = read_bytes(bytes, pos)?;
    be_to_u64(slice)
}

/// Encode a log record: `[key, value, prev_update_counter]`.
pub fn encode_log_record(key: &[u8], value: &[u8], prev_update_counter: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(key.len() + value.len() + 16);
    write_bytes(&mut buf, key);
    write_bytes(&mut buf, value);
    write_uint(&mut buf, prev_update_counter);
    buf
}

/// Decode a log record back into `(key, value, prev_update_counter)`.
pub fn decode_log_record(bytes: &[u8]) -> Result<(Vec<u8>, Vec<u8>, u64)> {
    let mut pos = 0;
    let key = read_bytes(bytes, &mut pos)?.to_vec();
    let value = read_bytes(bytes, &mut pos)?.to_vec();
    let prev_update_counter = read_uint(bytes, &mut pos)?;
    Ok((key, value, prev_update_counter))
}

/// Encode a KV-stored record: `[value, update_counter]`.
pub fn encode_stored_record(value: &[u8], update_counter: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(value.len() + 8);
    write_bytes(&mut buf, value);
    write_uint(&mut buf, update_counter);
    buf
}

/// Decode a KV-stored record back into `(value, update_counter)`.
pub fn decode_stored_record(bytes: &[u8]) -> Result<(Vec<u8>, u64)> {
    let mut pos = 0;
    let value = read_bytes(bytes, &mut pos)?.to_vec();
    let update_counter = read_uint(bytes, &mut pos)?;
    Ok((value, update_counter))
}
