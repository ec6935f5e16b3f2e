//! Byte-level primitives shared by the index and object store: big-endian
//! integer packing, deflate/inflate framing, and hex <-> raw SHA-1 conversion.

use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;

use crate::error::{Error, Result};

/// Reject inflated payloads larger than this many bytes (default matches
/// Git's own ~2^31-1 guard against zip bombs).
pub const MAX_OBJECT_SIZE: u64 = (1u64 << 31) - 1;

pub fn read_u16(buf: &[u8]) -> u16 {
    u16::from_be_bytes([buf[0], buf[1]])
}

pub fn read_u32(buf: &[u8]) -> u32 {
    u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]])
}

pub fn write_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_be_bytes());
}

pub fn write_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_be_bytes());
}

/// Parse a decimal ASCII integer, rejecting a leading-zero "01"-style
/// representation (only bare "0" is allowed) and any sign.
pub fn parse_decimal(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if s.len() > 1 && s.starts_with('0') {
        return None;
    }
    s.parse().ok()
}

pub fn hex_to_sha(hex: &str) -> Result<[u8; 20]> {
    let bytes = hex::decode(hex)
        .map_err(|e| Error::InvalidArgument(format!("invalid hex object id: {e}")))?;
    bytes
        .try_into()
        .map_err(|_| Error::InvalidArgument("object id must be 20 bytes".into()))
}

pub fn sha_to_hex(sha: &[u8; 20]) -> String {
    hex::encode(sha)
}

/// Deflate `data` at the default compression level.
pub fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| Error::io("<deflate>", e))?;
    encoder.finish().map_err(|e| Error::io("<deflate>", e))
}

/// Inflate `data`, refusing to produce more than [`MAX_OBJECT_SIZE`] bytes.
pub fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    let decoder = ZlibDecoder::new(data);
    let mut limited = decoder.take(MAX_OBJECT_SIZE + 1);
    let mut out = Vec::new();
    limited
        .read_to_end(&mut out)
        .map_err(|e| Error::io("<inflate>", e))?;
    if out.len() as u64 > MAX_OBJECT_SIZE {
        return Err(Error::corrupt(None, "object exceeds maximum size"));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn be_roundtrip() {
        let mut buf = Vec::new();
        write_u32(&mut buf, 0xdead_beef);
        assert_eq!(read_u32(&buf), 0xdead_beef);
    }

    #[test]
    fn deflate_inflate_roundtrip() {
        let data = b"tree 37\0hello world";
        let packed = deflate(data).unwrap();
        assert_eq!(inflate(&packed).unwrap(), data);
    }

    #[test]
    fn decimal_rejects_leading_zero() {
        assert_eq!(parse_decimal("0"), Some(0));
        assert_eq!(parse_decimal("01"), None);
        assert_eq!(parse_decimal("-1"), None);
        assert_eq!(parse_decimal("123"), Some(123));
    }

    #[test]
    fn hex_roundtrip() {
        let sha = [1u8; 20];
        let hex = sha_to_hex(&sha);
        assert_eq!(hex_to_sha(&hex).unwrap(), sha);
    }
}
