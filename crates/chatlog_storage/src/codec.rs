//! Serialization, gzip compression and slicing of record sequences.

use crate::error::{StorageError, StorageResult};
use crate::Record;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// Serializes a record sequence to its canonical JSON text.
pub fn serialize(records: &[Record]) -> StorageResult<Vec<u8>> {
    serde_json::to_vec(records).map_err(|source| StorageError::Serialize { source })
}

/// Parses serialized text back into a record sequence.
pub fn parse(text: &[u8]) -> StorageResult<Vec<Record>> {
    serde_json::from_slice(text).map_err(|source| StorageError::Parse { source })
}

/// Gzip-compresses `text` at the given level.
pub fn compress(text: &[u8], level: u32) -> StorageResult<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(text.len() / 4), Compression::new(level));
    encoder.write_all(text)?;
    Ok(encoder.finish()?)
}

/// Decompresses a gzip stream.
pub fn decompress(data: &[u8]) -> StorageResult<Vec<u8>> {
    let mut decoder = GzDecoder::new(data);
    let mut text = Vec::with_capacity(data.len() * 4);
    decoder.read_to_end(&mut text)?;
    Ok(text)
}

/// Splits `text` into consecutive slices of at most `chunk_size` bytes.
///
/// Slices are byte-exact; a slice may end inside a multi-byte UTF-8
/// sequence. Only the concatenation is ever decoded.
pub fn split_chunks(text: &[u8], chunk_size: usize) -> Vec<&[u8]> {
    debug_assert!(chunk_size > 0);
    text.chunks(chunk_size).collect()
}

/// Number of slices `split_chunks` produces for `len` bytes.
#[must_use]
pub fn chunk_count(len: usize, chunk_size: usize) -> usize {
    len.div_ceil(chunk_size)
}
