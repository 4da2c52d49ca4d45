//! # Compression
//!
//! gzip over in-memory buffers. A buffer must hold exactly one gzip
//! member; trailing bytes are treated as corruption.

use std::io::{Read, Write};

use flate2::bufread::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use super::errors::{CodecError, CodecResult};

/// Compress a buffer with gzip at the default level
pub fn compress(data: &[u8]) -> CodecResult<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2 + 32), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| CodecError::CompressionFailed(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| CodecError::CompressionFailed(e.to_string()))
}

/// Decompress a gzip buffer produced by [`compress`]
pub fn decompress(encoded: &[u8]) -> CodecResult<Vec<u8>> {
    let mut decoder = GzDecoder::new(encoded);
    let mut data = Vec::new();
    decoder
        .read_to_end(&mut data)
        .map_err(|e| CodecError::Corrupted(format!("invalid gzip stream: {}", e)))?;

    let trailing = decoder.into_inner().len();
    if trailing > 0 {
        return Err(CodecError::Corrupted(format!(
            "{} trailing bytes after gzip stream",
            trailing
        )));
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_text() {
        let encoded = compress(b"hello").unwrap();
        assert_eq!(decompress(&encoded).unwrap(), b"hello");
    }

    #[test]
    fn test_round_trip_empty() {
        let encoded = compress(b"").unwrap();
        assert!(!encoded.is_empty());
        assert_eq!(decompress(&encoded).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_round_trip_binary() {
        let data: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
        let encoded = compress(&data).unwrap();
        assert!(encoded.len() < data.len());
        assert_eq!(decompress(&encoded).unwrap(), data);
    }

    #[test]
    fn test_rejects_non_gzip_input() {
        let result = decompress(b"definitely not gzip");
        assert!(matches!(result, Err(CodecError::Corrupted(_))));
    }

    #[test]
    fn test_rejects_truncated_stream() {
        let encoded = compress(b"some content that compresses").unwrap();
        let truncated = &encoded[..encoded.len() - 6];
        assert!(decompress(truncated).is_err());
    }

    #[test]
    fn test_rejects_trailing_bytes() {
        let mut encoded = compress(b"hello").unwrap();
        encoded.extend_from_slice(b"TRAILING JUNK");
        assert!(matches!(decompress(&encoded), Err(CodecError::Corrupted(_))));
    }

    #[test]
    fn test_rejects_concatenated_members() {
        let mut encoded = compress(b"first").unwrap();
        encoded.extend(compress(b"second").unwrap());
        assert!(matches!(decompress(&encoded), Err(CodecError::Corrupted(_))));
    }
}
