//! Page decompression handling.

use std::io::Read;

use flate2::read::ZlibDecoder;
use tracing::{instrument, trace};

use crate::{
    block::{to_usize, Block},
    error::{DecompressionError, Error, Result},
};

/// Size of a decompression page
///
/// Compressed chunks are split into pages of this many decompressed bytes, each compressed on
/// its own. Only the last page of a chunk may be shorter.
pub const PAGE_SIZE: u64 = 0x10000;

/// Inflate the zlib stream in `compressed`, which must produce exactly `output.len()` bytes
pub fn decompress_into(compressed: &[u8], output: &mut [u8]) -> Result<()> {
    let corrupt = |e: std::io::Error| DecompressionError::Corrupt(e.to_string());

    let mut decoder = ZlibDecoder::new(compressed);
    let mut filled = 0;
    while filled < output.len() {
        let read = decoder.read(&mut output[filled..]).map_err(corrupt)?;
        if read == 0 {
            break;
        }
        filled += read;
    }

    let mut spare = [0u8; 1];
    let actual = match decoder.read(&mut spare).map_err(corrupt)? {
        0 => filled,
        _ => filled + 1,
    };

    if actual != output.len() {
        return Err(DecompressionError::SizeMismatch {
            expected: output.len() as u64,
            actual: actual as u64,
        }
        .into());
    }

    Ok(())
}

/// Inflate the zlib stream in `compressed`, which must produce exactly `expected` bytes
pub fn decompress(compressed: &[u8], expected: usize) -> Result<Vec<u8>> {
    let mut output = vec![0u8; expected];
    decompress_into(compressed, &mut output)?;
    Ok(output)
}

/// Rebuild the contents of a chunk stored in `package`
///
/// Without page sizes the chunk is stored as is and a view into the package is returned.
/// Otherwise every page is inflated into one new buffer. A page whose recorded size is zero or
/// equal to its decompressed size is stored raw and copied.
#[instrument(skip(package, page_sizes), fields(pages = page_sizes.len()), err)]
pub fn reconstruct(
    package: &Block,
    package_offset: u64,
    decompressed_size: u64,
    page_sizes: &[u64],
) -> Result<Block> {
    if page_sizes.is_empty() {
        return package.part(package_offset, decompressed_size);
    }

    let mut output = vec![0u8; to_usize(decompressed_size)?];
    let mut decompressed_offset = 0u64;
    let mut compressed_offset = 0u64;

    for &page_size in page_sizes {
        let expected = (decompressed_size - decompressed_offset).min(PAGE_SIZE);
        let target = &mut output
            [decompressed_offset as usize..(decompressed_offset + expected) as usize];
        let source = package_offset
            .checked_add(compressed_offset)
            .ok_or(Error::OutOfRange {
                offset: package_offset,
                length: compressed_offset,
                size: package.size(),
            })?;

        let consumed = if page_size == 0 || page_size == expected {
            trace!(source, expected, "copying raw page");
            package.read(target, source)?;
            expected
        } else {
            trace!(source, page_size, expected, "inflating page");
            let compressed = package.read_vec(source, page_size)?;
            decompress_into(&compressed, target)?;
            page_size
        };

        decompressed_offset += expected;
        compressed_offset += consumed;
    }

    if decompressed_offset != decompressed_size {
        return Err(DecompressionError::SizeMismatch {
            expected: decompressed_size,
            actual: decompressed_offset,
        }
        .into());
    }

    Ok(Block::from_vec(output))
}
