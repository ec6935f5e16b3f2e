//! SHA-1 identity over `"<type> <size>\0<payload>"`, as a streaming `Write`
//! adapter so large blobs never need to be held twice in memory.

use std::io::Write;

use sha1::{Digest, Sha1};

/// Wraps an inner writer, feeding every byte written through it into a
/// running SHA-1 digest. Mirrors the teacher's `HashWriter`, generalised to
/// any object kind rather than just blobs.
pub struct HashWriter<W> {
    pub writer: W,
    hasher: Sha1,
}

impl<W> HashWriter<W> {
    pub fn new(writer: W) -> Self {
        HashWriter {
            writer,
            hasher: Sha1::new(),
        }
    }

    pub fn finalize(self) -> [u8; 20] {
        self.hasher.finalize().into()
    }
}

impl<W: Write> Write for HashWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let n = self.writer.write(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

/// One-shot hash of an in-memory `"<type> <size>\0<payload>"` stream.
pub fn hash(kind: &str, payload: &[u8]) -> [u8; 20] {
    let mut hasher = Sha1::new();
    hasher.update(kind.as_bytes());
    hasher.update(b" ");
    hasher.update(payload.len().to_string().as_bytes());
    hasher.update(b"\0");
    hasher.update(payload);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_blob_hash_is_well_known() {
        let sha = hash("blob", b"");
        assert_eq!(hex::encode(sha), "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391");
    }

    #[test]
    fn hash_writer_matches_one_shot() {
        let payload = b"1234\n";
        let header = format!("blob {}\0", payload.len());
        let mut writer = HashWriter::new(Vec::new());
        writer.write_all(header.as_bytes()).unwrap();
        writer.write_all(payload).unwrap();
        let streamed = writer.finalize();
        assert_eq!(hex::encode(streamed), hex::encode(hash("blob", payload)));
        assert_eq!(hex::encode(streamed), "81c545efebe5f57d4cab2ba9ec294c4b0cadf672");
    }
}
