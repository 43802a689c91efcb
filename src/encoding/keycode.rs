//! Index-slot key codec.
//!
//! Keys are stored as a 16-bit big-endian byte length followed by the
//! encoded bytes in modified UTF-8: NUL is the two-byte sequence `C0 80`
//! and characters outside the basic multilingual plane become a UTF-16
//! surrogate pair of three-byte sequences. This is the wire format of
//! `DataOutput.writeUTF`, so store files round-trip with the original
//! JVM implementation. The encoded total, prefix included, must fit the
//! 64-byte key slot.

use std::io::Read;

use byteorder::{BigEndian, ReadBytesExt};

use crate::corrupt;
use crate::error::{Error, Result};
use crate::layout::MAX_KEY_LEN;

/// Encodes a key, length prefix included. Fails when the encoded form
/// would overflow an index slot.
pub fn encode(key: &str) -> Result<Vec<u8>> {
    let mut body = Vec::with_capacity(key.len());
    for ch in key.chars() {
        match ch as u32 {
            0 => body.extend_from_slice(&[0xC0, 0x80]),
            c @ 0x01..=0x7F => body.push(c as u8),
            c @ 0x80..=0x7FF => {
                body.push(0xC0 | (c >> 6) as u8);
                body.push(0x80 | (c & 0x3F) as u8);
            }
            c @ 0x800..=0xFFFF => push_three_byte(&mut body, c),
            c => {
                // Supplementary plane: each UTF-16 surrogate half is
                // written as its own three-byte sequence.
                let c = c - 0x1_0000;
                push_three_byte(&mut body, 0xD800 + (c >> 10));
                push_three_byte(&mut body, 0xDC00 + (c & 0x3FF));
            }
        }
    }

    let total = body.len() + 2;
    if total > MAX_KEY_LEN {
        return Err(Error::KeyTooLarge(total));
    }
    let mut encoded = Vec::with_capacity(total);
    encoded.extend_from_slice(&(body.len() as u16).to_be_bytes());
    encoded.extend_from_slice(&body);
    Ok(encoded)
}

fn push_three_byte(body: &mut Vec<u8>, unit: u32) {
    body.push(0xE0 | (unit >> 12) as u8);
    body.push(0x80 | ((unit >> 6) & 0x3F) as u8);
    body.push(0x80 | (unit & 0x3F) as u8);
}

/// Decodes a key from a reader positioned at its length prefix.
pub fn decode<R: Read>(reader: &mut R) -> Result<String> {
    let len = reader.read_u16::<BigEndian>()? as usize;
    let mut bytes = vec![0u8; len];
    reader.read_exact(&mut bytes)?;
    decode_body(&bytes)
}

fn decode_body(bytes: &[u8]) -> Result<String> {
    let mut decoded = String::with_capacity(bytes.len());
    let mut pos = 0;
    while pos < bytes.len() {
        let unit = read_unit(bytes, &mut pos)?;
        let ch = match unit {
            0xD800..=0xDBFF => {
                if pos >= bytes.len() {
                    return corrupt!("unpaired surrogate at end of key");
                }
                let low = read_unit(bytes, &mut pos)?;
                if !(0xDC00..=0xDFFF).contains(&low) {
                    return corrupt!("unpaired surrogate in key");
                }
                let c = 0x1_0000 + (((unit as u32 - 0xD800) << 10) | (low as u32 - 0xDC00));
                match char::from_u32(c) {
                    Some(ch) => ch,
                    None => return corrupt!("invalid key code point {c:#x}"),
                }
            }
            0xDC00..=0xDFFF => return corrupt!("unpaired surrogate in key"),
            unit => match char::from_u32(unit as u32) {
                Some(ch) => ch,
                None => return corrupt!("invalid key code unit {unit:#x}"),
            },
        };
        decoded.push(ch);
    }
    Ok(decoded)
}

/// Reads one 1-3 byte sequence as a UTF-16 code unit.
fn read_unit(bytes: &[u8], pos: &mut usize) -> Result<u16> {
    let b = bytes[*pos];
    if b & 0x80 == 0 {
        *pos += 1;
        Ok(b as u16)
    } else if b & 0xE0 == 0xC0 {
        let b2 = continuation(bytes, *pos + 1)?;
        *pos += 2;
        Ok(((b as u16 & 0x1F) << 6) | (b2 as u16 & 0x3F))
    } else if b & 0xF0 == 0xE0 {
        let b2 = continuation(bytes, *pos + 1)?;
        let b3 = continuation(bytes, *pos + 2)?;
        *pos += 3;
        Ok(((b as u16 & 0x0F) << 12) | ((b2 as u16 & 0x3F) << 6) | (b3 as u16 & 0x3F))
    } else {
        corrupt!("invalid key byte {b:#04x}")
    }
}

fn continuation(bytes: &[u8], pos: usize) -> Result<u8> {
    match bytes.get(pos) {
        Some(&b) if b & 0xC0 == 0x80 => Ok(b),
        _ => corrupt!("truncated key byte sequence"),
    }
}
