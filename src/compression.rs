//! zlib compression of array payloads

use crate::error::{DataError, Result};
use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use log::trace;
use std::io::{Read, Write};
use std::sync::Arc;

/// Highest accepted compression level
pub const MAX_LEVEL: u32 = 9;

/// Deflate `bytes` into a zlib stream.
///
/// Always compresses, level 0 included; skipping compression is up to the
/// caller.
pub fn compress(bytes: &[u8], level: u32) -> Result<Vec<u8>> {
    if level > MAX_LEVEL {
        return Err(DataError::InvalidCompressionLevel(level));
    }
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(level));
    encoder
        .write_all(bytes)
        .map_err(|e| DataError::Compression(Arc::new(e)))?;
    let out = encoder
        .finish()
        .map_err(|e| DataError::Compression(Arc::new(e)))?;
    trace!("compressed {} -> {} bytes (level {})", bytes.len(), out.len(), level);
    Ok(out)
}

/// Inflate a zlib stream
pub fn decompress(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    ZlibDecoder::new(bytes)
        .read_to_end(&mut out)
        .map_err(|e| DataError::Decompression(Arc::new(e)))?;
    trace!("decompressed {} -> {} bytes", bytes.len(), out.len());
    Ok(out)
}
