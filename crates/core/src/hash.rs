//! BLAKE3 hashing primitives for content signatures

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

/// A BLAKE3 hash (32 bytes)
#[derive(Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct Blake3Hash([u8; 32]);

impl Blake3Hash {
    /// Create a new Blake3Hash from bytes
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the hash as a byte slice
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to lowercase hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string
    pub fn from_hex(hex: &str) -> Result<Self, hex::FromHexError> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(hex, &mut bytes)?;
        Ok(Self(bytes))
    }

    /// First 8 hex characters, for log lines and terminal output
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl std::fmt::Debug for Blake3Hash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Blake3Hash({})", self.to_hex())
    }
}

impl std::fmt::Display for Blake3Hash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

// Serialized as a hex string so reports stay readable.
impl Serialize for Blake3Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Blake3Hash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct HexVisitor;

        impl<'de> Visitor<'de> for HexVisitor {
            type Value = Blake3Hash;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a 64 character hex string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Blake3Hash, E> {
                Blake3Hash::from_hex(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_str(HexVisitor)
    }
}

/// Hash bytes using BLAKE3
pub fn hash_bytes(data: &[u8]) -> Blake3Hash {
    let hash = blake3::hash(data);
    Blake3Hash::from_bytes(*hash.as_bytes())
}

/// Hash a file using BLAKE3 (streaming for large files)
pub fn hash_file(path: &Path) -> io::Result<Blake3Hash> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut hasher = blake3::Hasher::new();

    let mut buffer = [0u8; 8192];
    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    let hash = hasher.finalize();
    Ok(Blake3Hash::from_bytes(*hash.as_bytes()))
}

/// Hash a file using memory-mapped I/O (optimized for large files > 4MB)
pub fn hash_file_mmap(path: &Path) -> io::Result<Blake3Hash> {
    use memmap2::Mmap;

    let file = File::open(path)?;
    // Zero-length files cannot be mapped on every platform.
    if file.metadata()?.len() == 0 {
        return Ok(hash_bytes(&[]));
    }
    // SAFETY: the map is read-only and dropped before returning. A concurrent
    // writer can only change the bytes we hash, which the caller observes as a
    // content change on the next pass.
    let mmap = unsafe { Mmap::map(&file)? };
    let hash = blake3::hash(&mmap);
    Ok(Blake3Hash::from_bytes(*hash.as_bytes()))
}

/// Hash a file, switching to mmap at `mmap_threshold` bytes
pub fn hash_file_sized(path: &Path, len: u64, mmap_threshold: u64) -> io::Result<Blake3Hash> {
    if len >= mmap_threshold {
        hash_file_mmap(path)
    } else {
        hash_file(path)
    }
}

/// Returns true when `data` looks like binary content.
///
/// A single NUL byte is enough; text encodings we care about never contain one.
pub fn is_binary(data: &[u8]) -> bool {
    data.contains(&0)
}

/// Hash bytes with `\r\n` and lone `\r` rewritten to `\n`.
///
/// Binary content hashes unchanged.
pub fn hash_bytes_normalized_line_endings(data: &[u8]) -> Blake3Hash {
    if is_binary(data) {
        return hash_bytes(data);
    }
    let mut hasher = LineEndingNormalizingHasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Hash a file with line endings normalized, see [`hash_bytes_normalized_line_endings`]
///
/// Streams the file; memory use does not depend on its size.
pub fn hash_file_normalized_line_endings(path: &Path) -> io::Result<Blake3Hash> {
    let (_, normalized) = ContentHasher::hash_reader(File::open(path)?)?;
    Ok(normalized)
}

/// Raw and line-ending normalized hash of one stream, computed in a single read
///
/// Content containing a NUL byte anywhere is binary; its normalized hash is
/// the raw hash.
pub struct ContentHasher {
    raw: blake3::Hasher,
    normalized: LineEndingNormalizingHasher,
    binary: bool,
}

impl ContentHasher {
    pub fn new() -> Self {
        Self {
            raw: blake3::Hasher::new(),
            normalized: LineEndingNormalizingHasher::new(),
            binary: false,
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        self.raw.update(data);
        if self.binary {
            return;
        }
        if is_binary(data) {
            self.binary = true;
        } else {
            self.normalized.update(data);
        }
    }

    /// `(raw, normalized)`
    pub fn finalize(self) -> (Blake3Hash, Blake3Hash) {
        let raw = Blake3Hash::from_bytes(*self.raw.finalize().as_bytes());
        if self.binary {
            (raw, raw)
        } else {
            (raw, self.normalized.finalize())
        }
    }

    /// Drain `reader` through a fresh hasher
    pub fn hash_reader<R: Read>(reader: R) -> io::Result<(Blake3Hash, Blake3Hash)> {
        let mut reader = BufReader::new(reader);
        let mut hasher = Self::new();
        let mut buffer = [0u8; 8192];
        loop {
            let bytes_read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            };
            hasher.update(&buffer[..bytes_read]);
        }
        Ok(hasher.finalize())
    }
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Incremental hasher for building hashes across multiple chunks
pub struct IncrementalHasher {
    inner: blake3::Hasher,
}

impl IncrementalHasher {
    /// Create a new incremental hasher
    pub fn new() -> Self {
        Self {
            inner: blake3::Hasher::new(),
        }
    }

    /// Update the hash with more data
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    /// Update with a length-prefixed string so adjacent fields cannot run together
    pub fn update_str(&mut self, s: &str) {
        self.inner.update(&(s.len() as u64).to_le_bytes());
        self.inner.update(s.as_bytes());
    }

    /// Update with another hash
    pub fn update_hash(&mut self, hash: &Blake3Hash) {
        self.inner.update(hash.as_bytes());
    }

    /// Finalize and return the hash
    pub fn finalize(self) -> Blake3Hash {
        let hash = self.inner.finalize();
        Blake3Hash::from_bytes(*hash.as_bytes())
    }
}

impl Default for IncrementalHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Streaming hasher that rewrites CR and CRLF to LF before hashing.
///
/// A `\r` at the end of one chunk is held back until the next chunk shows
/// whether it starts a `\r\n` pair.
struct LineEndingNormalizingHasher {
    inner: blake3::Hasher,
    pending_cr: bool,
    buf: Vec<u8>,
}

impl LineEndingNormalizingHasher {
    fn new() -> Self {
        Self {
            inner: blake3::Hasher::new(),
            pending_cr: false,
            buf: Vec::with_capacity(8192),
        }
    }

    fn update(&mut self, data: &[u8]) {
        self.buf.clear();
        for &byte in data {
            if self.pending_cr {
                self.pending_cr = false;
                self.buf.push(b'\n');
                if byte == b'\n' {
                    continue;
                }
            }
            if byte == b'\r' {
                self.pending_cr = true;
            } else {
                self.buf.push(byte);
            }
        }
        self.inner.update(&self.buf);
    }

    fn finalize(mut self) -> Blake3Hash {
        if self.pending_cr {
            self.inner.update(b"\n");
        }
        let hash = self.inner.finalize();
        Blake3Hash::from_bytes(*hash.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_hash_consistency() {
        let data = b"hello world";
        let hash1 = hash_bytes(data);
        let hash2 = hash_bytes(data);
        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_hex_encoding_roundtrip() {
        let original = Blake3Hash::from_bytes([42; 32]);
        let hex = original.to_hex();
        let decoded = Blake3Hash::from_hex(&hex).unwrap();
        assert_eq!(original, decoded);
        assert_eq!(hex.len(), 64);
        assert!(hex.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_hex_decoding_invalid() {
        assert!(Blake3Hash::from_hex("abc").is_err());
        assert!(Blake3Hash::from_hex("").is_err());
        assert!(Blake3Hash::from_hex(&"g".repeat(64)).is_err());
    }

    #[test]
    fn test_serde_as_hex_string() {
        let hash = hash_bytes(b"serde");
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{}\"", hash.to_hex()));
        let back: Blake3Hash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hash);
    }

    #[test]
    fn test_incremental_hasher() {
        let data = b"hello world";
        let hash_direct = hash_bytes(data);

        let mut incremental = IncrementalHasher::new();
        incremental.update(b"hello ");
        incremental.update(b"world");
        let hash_incremental = incremental.finalize();

        assert_eq!(hash_direct, hash_incremental);
    }

    #[test]
    fn test_length_prefixed_strings_do_not_collide() {
        let mut a = IncrementalHasher::new();
        a.update_str("ab");
        a.update_str("c");
        let mut b = IncrementalHasher::new();
        b.update_str("a");
        b.update_str("bc");
        assert_ne!(a.finalize(), b.finalize());
    }

    #[test]
    fn test_hash_file_variants_agree() -> io::Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let file_path = temp_dir.path().join("large.bin");

        let mut file = std::fs::File::create(&file_path)?;
        let chunk = vec![0xAB; 1024 * 1024];
        for _ in 0..5 {
            file.write_all(&chunk)?;
        }
        drop(file);

        let streaming = hash_file(&file_path)?;
        let mapped = hash_file_mmap(&file_path)?;
        let sized = hash_file_sized(&file_path, 5 * 1024 * 1024, 4 * 1024 * 1024)?;

        assert_eq!(streaming, mapped);
        assert_eq!(streaming, sized);
        Ok(())
    }

    #[test]
    fn test_hash_empty_file_mmap() -> io::Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let file_path = temp_dir.path().join("empty");
        std::fs::write(&file_path, b"")?;
        assert_eq!(hash_file_mmap(&file_path)?, hash_bytes(b""));
        Ok(())
    }

    #[test]
    fn test_different_data_different_hash() {
        assert_ne!(hash_bytes(b"hello"), hash_bytes(b"world"));
    }

    #[test]
    fn test_line_endings_normalized() {
        let unix = hash_bytes_normalized_line_endings(b"a\nb\nc\n");
        let windows = hash_bytes_normalized_line_endings(b"a\r\nb\r\nc\r\n");
        let classic_mac = hash_bytes_normalized_line_endings(b"a\rb\rc\r");
        assert_eq!(unix, windows);
        assert_eq!(unix, classic_mac);
        assert_eq!(unix, hash_bytes(b"a\nb\nc\n"));
    }

    #[test]
    fn test_line_endings_crlf_split_across_chunks() {
        let mut hasher = LineEndingNormalizingHasher::new();
        hasher.update(b"one\r");
        hasher.update(b"\ntwo");
        assert_eq!(hasher.finalize(), hash_bytes(b"one\ntwo"));
    }

    #[test]
    fn test_binary_content_not_normalized() {
        let data = b"\0\r\n";
        assert_eq!(hash_bytes_normalized_line_endings(data), hash_bytes(data));
    }

    #[test]
    fn test_content_hasher_matches_one_shot_hashes() -> io::Result<()> {
        let text = b"first\r\nsecond\rthird\n".repeat(2000);
        let (raw, normalized) = ContentHasher::hash_reader(&text[..])?;
        assert_eq!(raw, hash_bytes(&text));
        assert_eq!(normalized, hash_bytes_normalized_line_endings(&text));

        // NUL far past the first chunk still marks the whole stream binary
        let mut binary = text.clone();
        binary.push(0);
        let (raw, normalized) = ContentHasher::hash_reader(&binary[..])?;
        assert_eq!(raw, hash_bytes(&binary));
        assert_eq!(normalized, raw);
        Ok(())
    }

    #[test]
    fn test_hash_file_normalized() -> io::Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let crlf = temp_dir.path().join("crlf.txt");
        let lf = temp_dir.path().join("lf.txt");
        std::fs::write(&crlf, b"x\r\ny\r\n")?;
        std::fs::write(&lf, b"x\ny\n")?;
        assert_eq!(
            hash_file_normalized_line_endings(&crlf)?,
            hash_file_normalized_line_endings(&lf)?
        );
        assert_ne!(hash_file(&crlf)?, hash_file(&lf)?);
        Ok(())
    }
}
