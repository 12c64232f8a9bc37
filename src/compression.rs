use flate2::{read::ZlibDecoder, write::ZlibEncoder, Compression};
use std::io::{self, Read, Write};
use thiserror::Error;
use tracing::trace;

#[derive(Error, Debug)]
pub enum CompressionError {
    #[error("corrupt zlib stream: {0}")]
    CorruptStream(String),
    #[error("failed to deflate buffer: {0}")]
    Deflate(#[from] io::Error),
}

/// Deflates `input` into a zlib stream at the default compression level.
pub fn compress<T: AsRef<[u8]>>(input: T) -> Result<Vec<u8>, CompressionError> {
    let input = input.as_ref();

    let mut encoder = ZlibEncoder::new(Vec::with_capacity(input.len() / 2), Compression::default());
    encoder.write_all(input)?;
    let compressed = encoder.finish()?;

    trace!("compressed {} bytes into {}", input.len(), compressed.len());
    Ok(compressed)
}

/// Inflates a complete zlib stream.
///
/// Fails on a bad header, a stream that ends before its end marker, or an Adler-32 mismatch.
pub fn decompress<T: AsRef<[u8]>>(input: T) -> Result<Vec<u8>, CompressionError> {
    let input = input.as_ref();
    if input.is_empty() {
        return Err(CompressionError::CorruptStream("empty input".to_owned()));
    }

    let mut output = Vec::with_capacity(input.len().saturating_mul(4));
    ZlibDecoder::new(input)
        .read_to_end(&mut output)
        .map_err(|err| CompressionError::CorruptStream(err.to_string()))?;

    trace!("decompressed {} bytes into {}", input.len(), output.len());
    Ok(output)
}
