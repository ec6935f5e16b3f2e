//! The binary `index` (DIRC v2) file: stat-cache entries plus the `TREE`
//! cache-tree extension. Parsing/serialising follows the on-disk layout of
//! §4.5; entry framing (the 62-byte fixed prefix, NUL-terminated name,
//! 8-byte padding) mirrors the reference DIRC readers in this corpus.

use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

use sha1::{Digest, Sha1};
use tempfile::NamedTempFile;

use crate::cache_tree::CacheTreeNode;
use crate::codec::{parse_decimal, read_u16, read_u32, write_u16, write_u32};
use crate::error::{Error, Result};

const SIGNATURE: &[u8; 4] = b"DIRC";
const VERSION: u32 = 2;
const ENTRY_FIXED_LEN: usize = 40 + 20 + 2; // stat + sha + flags
const TREE_EXT_TAG: &[u8; 4] = b"TREE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatData {
    pub ctime_secs: u32,
    pub ctime_nsecs: u32,
    pub mtime_secs: u32,
    pub mtime_nsecs: u32,
    pub dev: u32,
    pub ino: u32,
    pub uid: u32,
    pub gid: u32,
    pub size: u32,
}

impl StatData {
    pub fn from_metadata(meta: &std::fs::Metadata) -> Self {
        StatData {
            ctime_secs: meta.ctime() as u32,
            ctime_nsecs: meta.ctime_nsec() as u32,
            mtime_secs: meta.mtime() as u32,
            mtime_nsecs: meta.mtime_nsec() as u32,
            dev: meta.dev() as u32,
            ino: meta.ino() as u32,
            uid: meta.uid(),
            gid: meta.gid(),
            size: meta.size() as u32,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub path: String,
    pub sha: [u8; 20],
    /// Raw 32-bit on-disk mode, including the file-kind bits (`1000` for a
    /// regular file).
    pub mode: u32,
    pub stat: StatData,
    pub assume_valid: bool,
    pub stage: u8,
}

impl IndexEntry {
    pub fn parent_dir(&self) -> &str {
        match self.path.rfind('/') {
            Some(pos) => &self.path[..pos],
            None => "",
        }
    }

    pub fn file_name(&self) -> &str {
        match self.path.rfind('/') {
            Some(pos) => &self.path[pos + 1..],
            None => &self.path,
        }
    }

    pub fn mode_str(&self) -> &'static str {
        if self.mode & 0o111 != 0 {
            crate::object::MODE_EXEC
        } else {
            crate::object::MODE_BLOB
        }
    }
}

#[derive(Debug, Clone)]
pub struct Index {
    pub version: u32,
    pub entries: Vec<IndexEntry>,
    pub cache_tree: Option<CacheTreeNode>,
    unknown_extensions: Vec<([u8; 4], Vec<u8>)>,
}

impl Default for Index {
    fn default() -> Self {
        Index {
            version: VERSION,
            entries: Vec::new(),
            cache_tree: None,
            unknown_extensions: Vec::new(),
        }
    }
}

impl Index {
    pub fn read_from(path: &Path) -> Result<Index> {
        if !path.is_file() {
            return Ok(Index::default());
        }
        let data = fs::read(path).map_err(|e| Error::io(path, e))?;
        Index::parse(&data)
    }

    pub fn write_to(&mut self, path: &Path) -> Result<()> {
        self.entries
            .sort_by(|a, b| a.path.as_bytes().cmp(b.path.as_bytes()));
        let bytes = self.serialize();
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| Error::io(dir, e))?;
        use std::io::Write;
        tmp.write_all(&bytes).map_err(|e| Error::io(dir, e))?;
        tmp.persist(path).map_err(|e| Error::io(path, e.error))?;
        Ok(())
    }

    pub fn parse(data: &[u8]) -> Result<Index> {
        if data.len() < 12 + 20 {
            return Err(Error::corrupt(None, "index file too short"));
        }
        let checksum_at = data.len() - 20;
        let computed: [u8; 20] = Sha1::digest(&data[..checksum_at]).into();
        if computed != data[checksum_at..] {
            return Err(Error::corrupt(None, "index checksum mismatch"));
        }

        if &data[0..4] != SIGNATURE {
            return Err(Error::corrupt(None, "bad index signature"));
        }
        let version = read_u32(&data[4..8]);
        if version != 2 {
            return Err(Error::corrupt(None, format!("unsupported index version {version}")));
        }
        let entry_count = read_u32(&data[8..12]) as usize;

        let mut cursor = 12;
        let mut entries = Vec::with_capacity(entry_count);
        for _ in 0..entry_count {
            let (entry, next) = parse_entry(data, cursor, checksum_at)?;
            entries.push(entry);
            cursor = next;
        }

        let mut cache_tree = None;
        let mut unknown_extensions = Vec::new();
        while cursor + 8 <= checksum_at {
            let tag: [u8; 4] = data[cursor..cursor + 4].try_into().unwrap();
            let len = read_u32(&data[cursor + 4..cursor + 8]) as usize;
            cursor += 8;
            if cursor + len > checksum_at {
                return Err(Error::corrupt(None, "extension data exceeds index bounds"));
            }
            let ext_data = &data[cursor..cursor + len];
            if &tag == TREE_EXT_TAG {
                cache_tree = Some(CacheTreeNode::parse(ext_data)?);
            } else if tag[0].is_ascii_lowercase() {
                unknown_extensions.push((tag, ext_data.to_vec()));
            } else {
                return Err(Error::UnsupportedExtension(
                    String::from_utf8_lossy(&tag).to_string(),
                ));
            }
            cursor += len;
        }

        Ok(Index {
            version,
            entries,
            cache_tree,
            unknown_extensions,
        })
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(SIGNATURE);
        write_u32(&mut buf, VERSION);
        write_u32(&mut buf, self.entries.len() as u32);

        for entry in &self.entries {
            write_entry(&mut buf, entry);
        }

        if let Some(tree) = &self.cache_tree {
            let payload = tree.serialize();
            buf.extend_from_slice(TREE_EXT_TAG);
            write_u32(&mut buf, payload.len() as u32);
            buf.extend_from_slice(&payload);
        }

        for (tag, data) in &self.unknown_extensions {
            buf.extend_from_slice(tag);
            write_u32(&mut buf, data.len() as u32);
            buf.extend_from_slice(data);
        }

        let checksum: [u8; 20] = Sha1::digest(&buf).into();
        buf.extend_from_slice(&checksum);
        buf
    }

    /// Insert or replace the entry at `path`, invalidating the cache-tree
    /// ancestor chain of its containing directory.
    pub fn add_entry(&mut self, path: &str, sha: [u8; 20], mode: u32, stat: StatData) {
        let entry = IndexEntry {
            path: path.to_string(),
            sha,
            mode,
            stat,
            assume_valid: false,
            stage: 0,
        };
        match self.entries.iter_mut().find(|e| e.path == path) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
        self.entries
            .sort_by(|a, b| a.path.as_bytes().cmp(b.path.as_bytes()));
        self.invalidate_ancestors(path);
    }

    pub fn remove_entry(&mut self, path: &str) {
        self.entries.retain(|e| e.path != path);
        self.invalidate_ancestors(path);
    }

    fn invalidate_ancestors(&mut self, path: &str) {
        let dir = match path.rfind('/') {
            Some(pos) => &path[..pos],
            None => "",
        };
        let tree = self.cache_tree.get_or_insert_with(CacheTreeNode::root);
        tree.invalidate(dir);
    }

    /// Entries whose parent directory is exactly `dir` (stage 0 only).
    pub fn get_blobs(&self, dir: &str) -> Vec<&IndexEntry> {
        self.entries
            .iter()
            .filter(|e| e.stage == 0 && e.parent_dir() == dir)
            .collect()
    }

    /// All distinct directories (including nested ones and the root `""`)
    /// implied by the current entry paths.
    pub fn all_directories(&self) -> Vec<String> {
        let mut dirs = std::collections::BTreeSet::new();
        dirs.insert(String::new());
        for entry in &self.entries {
            let mut path = entry.path.as_str();
            while let Some(pos) = path.rfind('/') {
                path = &path[..pos];
                dirs.insert(path.to_string());
            }
        }
        dirs.into_iter().collect()
    }
}

fn ondisk_entry_size(name_len: usize) -> usize {
    (ENTRY_FIXED_LEN + name_len + 8) & !7
}

fn parse_entry(data: &[u8], start: usize, content_end: usize) -> Result<(IndexEntry, usize)> {
    if start + 62 > content_end {
        return Err(Error::corrupt(None, "index entry too short"));
    }
    let mut cursor = start;
    let stat = StatData {
        ctime_secs: read_u32(&data[cursor..]),
        ctime_nsecs: read_u32(&data[cursor + 4..]),
        mtime_secs: read_u32(&data[cursor + 8..]),
        mtime_nsecs: read_u32(&data[cursor + 12..]),
        dev: read_u32(&data[cursor + 16..]),
        ino: read_u32(&data[cursor + 20..]),
        uid: read_u32(&data[cursor + 28..]),
        gid: read_u32(&data[cursor + 32..]),
        size: read_u32(&data[cursor + 36..]),
    };
    let mode = read_u32(&data[cursor + 24..]);
    cursor += 40;

    let mut sha = [0u8; 20];
    sha.copy_from_slice(&data[cursor..cursor + 20]);
    cursor += 20;

    let flags = read_u16(&data[cursor..]);
    cursor += 2;
    let assume_valid = (flags & 0x8000) != 0;
    let extended = (flags & 0x4000) != 0;
    if extended {
        return Err(Error::corrupt(None, "extended flag unsupported in v2 index"));
    }
    let stage = ((flags >> 12) & 0x3) as u8;
    let name_len_field = (flags & 0x0FFF) as usize;

    let path_start = cursor;
    let name = if name_len_field < 0x0FFF {
        let end = path_start + name_len_field;
        if end >= content_end || data[end] != 0 {
            return Err(Error::corrupt(None, "index entry name is not NUL-terminated"));
        }
        String::from_utf8_lossy(&data[path_start..end]).to_string()
    } else {
        let nul = data[path_start..content_end]
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| Error::corrupt(None, "index entry name is not NUL-terminated"))?;
        String::from_utf8_lossy(&data[path_start..path_start + nul]).to_string()
    };

    let entry_size = ondisk_entry_size(name.len());
    let mut next = start + entry_size;
    if next > content_end {
        next = content_end;
    }

    Ok((
        IndexEntry {
            path: name,
            sha,
            mode,
            stat,
            assume_valid,
            stage,
        },
        next,
    ))
}

fn write_entry(buf: &mut Vec<u8>, entry: &IndexEntry) {
    let start = buf.len();
    write_u32(buf, entry.stat.ctime_secs);
    write_u32(buf, entry.stat.ctime_nsecs);
    write_u32(buf, entry.stat.mtime_secs);
    write_u32(buf, entry.stat.mtime_nsecs);
    write_u32(buf, entry.stat.dev);
    write_u32(buf, entry.stat.ino);
    write_u32(buf, entry.mode);
    write_u32(buf, entry.stat.uid);
    write_u32(buf, entry.stat.gid);
    write_u32(buf, entry.stat.size);
    buf.extend_from_slice(&entry.sha);

    let name_len = entry.path.len().min(0x0FFF);
    let mut flags = name_len as u16;
    flags |= (entry.stage as u16) << 12;
    if entry.assume_valid {
        flags |= 0x8000;
    }
    write_u16(buf, flags);

    buf.extend_from_slice(entry.path.as_bytes());
    buf.push(0);

    let written = buf.len() - start;
    let padded = ondisk_entry_size(entry.path.len());
    for _ in written..padded {
        buf.push(0);
    }
}

pub fn index_path(git_dir: &Path) -> PathBuf {
    git_dir.join("index")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entry(path: &str, byte: u8) -> IndexEntry {
        IndexEntry {
            path: path.to_string(),
            sha: [byte; 20],
            mode: 0o100644,
            stat: StatData::default(),
            assume_valid: false,
            stage: 0,
        }
    }

    #[test]
    fn roundtrips_through_parse_and_serialize() {
        let mut index = Index::default();
        index.entries.push(sample_entry("a.txt", 1));
        index.entries.push(sample_entry("dir/b.txt", 2));
        let bytes = index.serialize();
        let parsed = Index::parse(&bytes).unwrap();
        assert_eq!(parsed.entries.len(), 2);
        assert_eq!(parsed.entries[0].path, "a.txt");
        assert_eq!(parsed.entries[1].path, "dir/b.txt");
        assert_eq!(parsed.entries[1].sha, [2; 20]);
    }

    #[test]
    fn entry_stride_matches_gits_62_byte_prefix() {
        // 62-byte fixed prefix + name + NUL terminator, padded up to a
        // multiple of 8 -- not the fixed prefix plus an extra stat block.
        assert_eq!(ondisk_entry_size("a.txt".len()), 72);
        assert_eq!(ondisk_entry_size("".len()), 64);
    }

    #[test]
    fn add_entry_invalidates_ancestors() {
        let mut index = Index::default();
        index.cache_tree = Some(CacheTreeNode::root());
        index.add_entry("a/b/c.txt", [9; 20], 0o100644, StatData::default());
        let tree = index.cache_tree.as_ref().unwrap();
        assert_eq!(tree.entry_count, -1);
        let a = tree.find("a").unwrap();
        assert_eq!(a.entry_count, -1);
    }

    #[test]
    fn get_blobs_filters_by_exact_parent() {
        let mut index = Index::default();
        index.entries.push(sample_entry("top.txt", 1));
        index.entries.push(sample_entry("dir/nested.txt", 2));
        let root_blobs = index.get_blobs("");
        assert_eq!(root_blobs.len(), 1);
        assert_eq!(root_blobs[0].path, "top.txt");
    }
}
