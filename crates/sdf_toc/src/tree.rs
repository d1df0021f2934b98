//! Decoding of the file tree stored inside a sdftoc index
//!
//! The tree is a byte encoded trie over the sorted file names. Every node starts with a control
//! byte:
//!
//! | Control byte    | Node         | Contents                                              |
//! |-----------------|--------------|-------------------------------------------------------|
//! | `0x00`          | invalid      |                                                       |
//! | `0x01`..`0x1F`  | name part    | that many bytes appended to the name, then a node     |
//! | `'A'`..`'Z'`    | file entry   | chunk records for the name built so far               |
//! | anything else   | branch       | 4 byte offset of the second child, then the first one |
//!
//! Both children of a branch continue from the same name.
//!
//! ### File entry
//!
//! For a control byte `c`, let `v = c - 'A'`. The low 3 bits of `v` hold the chunk count and
//! bit 3 marks a trailing table. When the chunk count is non-zero the entry continues with:
//!
//! - 4 bytes of unknown purpose
//! - 1 byte, the low 2 bits are the width of the header tag
//! - the header tag, in that many bytes
//!
//! followed by one record per chunk:
//!
//! - 1 byte of flags: bits 0-1 are the size width minus one, bits 2-4 the offset width and
//!   bit 5 marks compressed data
//! - decompressed size, then compressed size if compressed, in size width bytes
//! - package offset in offset width bytes, zero when the width is zero
//! - 2 byte package id
//! - for compressed chunks spanning more than one 64KiB page, a 2 byte compressed size per page
//! - 4 byte file id
//!
//! The trailing table is a count byte followed by two bytes per element.
//!
//! All integers are little endian.

use bon::Builder;
use tracing::{instrument, trace};

use crate::{
    block::Block,
    compression::PAGE_SIZE,
    cursor::{BlockCursor, SeekOrigin},
    error::{FormatError, Result},
};

/// Default limit on how deeply branches may nest
pub const DEFAULT_MAX_DEPTH: usize = 1024;

/// Options for how the file tree is walked
#[derive(Debug, Clone, Copy, Builder)]
pub struct DecodeOptions {
    /// The deepest branch nesting accepted before the tree is considered malformed
    #[builder(default = DEFAULT_MAX_DEPTH)]
    pub max_depth: usize,

    /// The most nodes a walk may visit, defaults to the size of the tree in bytes
    ///
    /// Every node of a well formed tree is read once, and each takes at least one byte.
    pub max_nodes: Option<usize>,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        DecodeOptions::builder().build()
    }
}

/// One physical chunk of a file, as described by the file tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkRecord {
    /// Name of the file the chunk belongs to, see [`decode_name`]
    pub name: Box<str>,

    /// Package holding the chunk data
    pub package_id: u64,

    /// Offset of the chunk data inside the package
    pub package_offset: u64,

    /// Size of the chunk once decompressed
    pub decompressed_size: u64,

    /// Compressed size of every page, empty when the chunk is stored uncompressed
    pub page_sizes: Vec<u64>,

    /// Index of the header record to prepend, see [`ChunkRecord::has_header`]
    pub header_tag: u64,

    /// Whether this chunk continues a file started by a previous chunk
    pub is_continuation: bool,

    /// Whether a header record must be placed in front of the chunk data
    pub has_header: bool,
}

impl ChunkRecord {
    /// Whether the chunk data is page compressed
    pub fn is_compressed(&self) -> bool {
        !self.page_sizes.is_empty()
    }
}

struct Pending {
    cursor: BlockCursor,
    name: Vec<u8>,
    depth: usize,
}

/// Walks a file tree and reports every chunk record it holds
///
/// ```
/// # fn doit() -> sdf_toc::error::Result<()> {
/// use sdf_toc::{tree::TreeDecoder, Block};
///
/// // "hi" followed by an entry without chunks
/// let tree = Block::from_slice(&[2, b'h', b'i', b'A']);
/// let chunks = TreeDecoder::default().collect(&tree)?;
/// assert!(chunks.is_empty());
/// # Ok(())
/// # }
/// # doit().unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct TreeDecoder {
    options: DecodeOptions,
}

impl TreeDecoder {
    pub fn new(options: DecodeOptions) -> Self {
        TreeDecoder { options }
    }

    /// Decode the tree starting at the cursor position, calling `emit` once per chunk
    ///
    /// Chunks are reported in stream order, the first child of a branch before the second.
    /// An error returned by `emit` stops the walk and is passed through.
    #[instrument(skip_all, fields(size = cursor.size()), err)]
    pub fn decode<F>(&self, cursor: BlockCursor, mut emit: F) -> Result<()>
    where
        F: FnMut(ChunkRecord) -> Result<()>,
    {
        let limit = match self.options.max_nodes {
            Some(limit) => limit,
            None => usize::try_from(cursor.size()).unwrap_or(usize::MAX),
        };
        let mut visited = 0usize;

        let mut pending = vec![Pending {
            cursor,
            name: Vec::new(),
            depth: 0,
        }];

        while let Some(Pending {
            mut cursor,
            mut name,
            mut depth,
        }) = pending.pop()
        {
            loop {
                let position = cursor.tell();
                let control = cursor.read_u8()?;

                visited += 1;
                if visited > limit {
                    return Err(FormatError::NodeLimitExceeded { limit }.into());
                }

                match control {
                    0 => return Err(FormatError::NullControlByte { position }.into()),
                    1..=0x1F => {
                        let part = cursor.read_vec(control as u64)?;
                        name.extend_from_slice(&part);
                    }
                    b'A'..=b'Z' => {
                        decode_entry(&mut cursor, &name, control - b'A', &mut emit)?;
                        break;
                    }
                    _ => {
                        if depth >= self.options.max_depth {
                            return Err(FormatError::DepthExceeded {
                                limit: self.options.max_depth,
                            }
                            .into());
                        }

                        let offset = cursor.read_u32()?;
                        let mut second = cursor.clone();
                        second.seek(offset as u64, SeekOrigin::Begin)?;

                        depth += 1;
                        pending.push(Pending {
                            cursor: second,
                            name: name.clone(),
                            depth,
                        });
                    }
                }
            }
        }

        Ok(())
    }

    /// Decode a whole tree block into a list of chunk records
    pub fn collect(&self, tree: &Block) -> Result<Vec<ChunkRecord>> {
        let mut chunks = Vec::new();
        self.decode(BlockCursor::new(tree.clone()), |chunk| {
            chunks.push(chunk);
            Ok(())
        })?;
        Ok(chunks)
    }
}

/// Turn the raw bytes of a name into text
///
/// Names are UTF-8 when valid. Anything else is read as Latin-1, one character per byte, so
/// distinct names never decode to the same text.
pub fn decode_name(raw: &[u8]) -> Box<str> {
    match std::str::from_utf8(raw) {
        Ok(name) => name.into(),
        Err(_) => raw.iter().map(|&b| b as char).collect::<String>().into(),
    }
}

fn decode_entry<F>(cursor: &mut BlockCursor, name: &[u8], value: u8, emit: &mut F) -> Result<()>
where
    F: FnMut(ChunkRecord) -> Result<()>,
{
    let count = value & 7;
    let has_trailer = (value >> 3) & 1 == 1;

    if count > 0 {
        let _unknown = cursor.read_u32()?;
        let tag = cursor.read_u8()?;
        let tag_width = (tag & 3) as usize;
        let header_tag = cursor.read_varint(tag_width)?;

        for index in 0..count {
            let flags = cursor.read_u8()?;
            let size_width = (flags & 3) as usize + 1;
            let offset_width = ((flags >> 2) & 7) as usize;
            let compressed = (flags >> 5) & 1 == 1;

            let decompressed_size = cursor.read_varint(size_width)?;
            let compressed_size = if compressed {
                cursor.read_varint(size_width)?
            } else {
                0
            };
            let package_offset = cursor.read_varint(offset_width)?;
            let package_id = cursor.read_varint(2)?;

            let mut page_sizes = Vec::new();
            if compressed {
                let pages = decompressed_size.div_ceil(PAGE_SIZE);
                if pages > 1 {
                    page_sizes = cursor
                        .read_array::<u16>(pages as usize)?
                        .into_iter()
                        .map(u64::from)
                        .collect();
                }
            }

            let _file_id = cursor.read_u32()?;

            if compressed && page_sizes.is_empty() {
                page_sizes.push(compressed_size);
            }

            let chunk = ChunkRecord {
                name: decode_name(name),
                package_id,
                package_offset,
                decompressed_size,
                page_sizes,
                header_tag,
                is_continuation: index != 0,
                has_header: tag_width != 0 && index == 0,
            };
            trace!(name = %chunk.name, package = chunk.package_id, "decoded chunk");

            emit(chunk)?;
        }
    }

    if has_trailer {
        let length = cursor.read_u8()?;
        cursor.seek(2 * length as u64, SeekOrigin::Current)?;
    }

    Ok(())
}
