//! Random access byte sources
//!
//! A [`Block`] is a finite range of bytes that can be read at any offset. Blocks are cheap to
//! clone; clones share the same backing storage. Sub-ranges are lazy views, only
//! [`Block::concat`] copies data eagerly.

use std::{
    fmt::{self, Debug},
    fs::File,
    io::{Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use tracing::instrument;

use crate::error::{Error, Result};

/// Size of the scratch buffer used when streaming a block that isn't held in memory
const COPY_BUFFER_SIZE: usize = 0x10000;

/// The kind of storage backing a [`Block`]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BlockKind {
    /// Bytes are read from a file on every request
    Disk,

    /// Bytes are owned in memory
    Memory,

    /// A view into a range of another block
    Part,
}

enum Source {
    Disk { path: PathBuf, size: u64 },
    Memory(Box<[u8]>),
    // `base` is never itself a `Part`
    Part { base: Block, offset: u64, size: u64 },
}

/// A shared, immutable, randomly readable range of bytes
///
/// ```no_run
/// # fn doit() -> sdf_toc::error::Result<()> {
/// use sdf_toc::Block;
///
/// let package = Block::from_path("game-A-0001.sdfdata")?;
/// let part = package.part(0x100, 0x20)?;
///
/// let mut buffer = [0u8; 0x20];
/// part.read(&mut buffer, 0)?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Block {
    source: Arc<Source>,
}

impl Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.source.as_ref() {
            Source::Disk { path, size } => write!(f, "Block::Disk({}, {size})", path.display()),
            Source::Memory(data) => write!(f, "Block::Memory({})", data.len()),
            Source::Part { base, offset, size } => {
                write!(f, "Block::Part({base:?}, {offset}, {size})")
            }
        }
    }
}

/// Checks that `length` bytes starting at `offset` fit in a source of `size` bytes
pub(crate) fn check_range(offset: u64, length: u64, size: u64) -> Result<()> {
    match offset.checked_add(length) {
        Some(end) if end <= size => Ok(()),
        _ => Err(Error::OutOfRange {
            offset,
            length,
            size,
        }),
    }
}

/// Converts a byte count to `usize`, failing on targets where it doesn't fit
pub(crate) fn to_usize(value: u64) -> Result<usize> {
    usize::try_from(value).map_err(|_| Error::OutOfRange {
        offset: 0,
        length: value,
        size: usize::MAX as u64,
    })
}

impl Block {
    fn new(source: Source) -> Self {
        Block {
            source: Arc::new(source),
        }
    }

    /// Create a block reading from the file at `path`
    ///
    /// The size is read once here. No file handle is kept; each read opens and closes the
    /// file again.
    #[instrument(skip_all, fields(path = %path.as_ref().display()), err)]
    pub fn from_path(path: impl AsRef<Path>) -> Result<Block> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::open(&path)?;
        let size = file.seek(SeekFrom::End(0))?;

        Ok(Block::new(Source::Disk { path, size }))
    }

    /// Create a block holding a copy of `data`
    pub fn from_slice(data: &[u8]) -> Block {
        Block::new(Source::Memory(data.into()))
    }

    /// Create a block that takes ownership of `data` without copying it
    pub fn from_vec(data: Vec<u8>) -> Block {
        Block::new(Source::Memory(data.into_boxed_slice()))
    }

    /// Create a new memory block holding the bytes of `first` followed by the bytes of `second`
    ///
    /// This is the only operation that copies eagerly, the result keeps no reference to either
    /// input.
    #[instrument(err)]
    pub fn concat(first: &Block, second: &Block) -> Result<Block> {
        let size = first
            .size()
            .checked_add(second.size())
            .ok_or(Error::OutOfRange {
                offset: first.size(),
                length: second.size(),
                size: u64::MAX,
            })?;

        let split = to_usize(first.size())?;
        let mut data = vec![0u8; to_usize(size)?];
        first.read(&mut data[..split], 0)?;
        second.read(&mut data[split..], 0)?;

        Ok(Block::from_vec(data))
    }

    /// Number of bytes in this block
    pub fn size(&self) -> u64 {
        match self.source.as_ref() {
            Source::Disk { size, .. } => *size,
            Source::Memory(data) => data.len() as u64,
            Source::Part { size, .. } => *size,
        }
    }

    /// Whether this block holds no bytes
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// The kind of storage backing this block
    pub fn kind(&self) -> BlockKind {
        match self.source.as_ref() {
            Source::Disk { .. } => BlockKind::Disk,
            Source::Memory(_) => BlockKind::Memory,
            Source::Part { .. } => BlockKind::Part,
        }
    }

    /// Number of views between this block and the storage holding its bytes
    ///
    /// Sub-ranges collapse onto their backing storage, so this is never more than one.
    pub fn depth(&self) -> usize {
        match self.source.as_ref() {
            Source::Disk { .. } | Source::Memory(_) => 0,
            Source::Part { base, .. } => 1 + base.depth(),
        }
    }

    /// Borrow the bytes of this block if they are held in memory
    pub fn as_slice(&self) -> Option<&[u8]> {
        match self.source.as_ref() {
            Source::Disk { .. } => None,
            Source::Memory(data) => Some(data),
            Source::Part { base, offset, size } => {
                let start = *offset as usize;
                base.as_slice()
                    .map(|data| &data[start..start + *size as usize])
            }
        }
    }

    /// Fill `buffer` with the bytes starting at `offset`
    ///
    /// The range is validated before any I/O happens.
    pub fn read(&self, buffer: &mut [u8], offset: u64) -> Result<()> {
        check_range(offset, buffer.len() as u64, self.size())?;

        match self.source.as_ref() {
            Source::Disk { path, .. } => {
                let mut file = File::open(path)?;
                file.seek(SeekFrom::Start(offset))?;
                file.read_exact(buffer)?;
            }
            Source::Memory(data) => {
                let start = offset as usize;
                buffer.copy_from_slice(&data[start..start + buffer.len()]);
            }
            Source::Part {
                base,
                offset: base_offset,
                ..
            } => base.read(buffer, base_offset + offset)?,
        }

        Ok(())
    }

    /// Read `length` bytes starting at `offset` into a new buffer
    pub fn read_vec(&self, offset: u64, length: u64) -> Result<Vec<u8>> {
        check_range(offset, length, self.size())?;

        let mut buffer = vec![0u8; to_usize(length)?];
        self.read(&mut buffer, offset)?;
        Ok(buffer)
    }

    /// Read the whole block into a new buffer
    pub fn to_vec(&self) -> Result<Vec<u8>> {
        self.read_vec(0, self.size())
    }

    /// Create a view of `size` bytes starting at `offset`
    ///
    /// Taking a part of a part produces a view directly over the base storage.
    pub fn part(&self, offset: u64, size: u64) -> Result<Block> {
        check_range(offset, size, self.size())?;

        let source = match self.source.as_ref() {
            Source::Part {
                base,
                offset: base_offset,
                ..
            } => Source::Part {
                base: base.clone(),
                offset: base_offset + offset,
                size,
            },
            _ => Source::Part {
                base: self.clone(),
                offset,
                size,
            },
        };

        Ok(Block::new(source))
    }

    /// Stream the whole block into `writer`, returning the number of bytes written
    ///
    /// Blocks that aren't held in memory are copied through a fixed size buffer.
    pub fn copy_to<W: Write>(&self, writer: &mut W) -> Result<u64> {
        if let Some(data) = self.as_slice() {
            writer.write_all(data)?;
            return Ok(data.len() as u64);
        }

        let size = self.size();
        let mut buffer = vec![0u8; COPY_BUFFER_SIZE.min(to_usize(size)?)];
        let mut offset = 0u64;
        while offset < size {
            let length = (size - offset).min(buffer.len() as u64) as usize;
            self.read(&mut buffer[..length], offset)?;
            writer.write_all(&buffer[..length])?;
            offset += length as u64;
        }

        Ok(size)
    }
}

impl From<Vec<u8>> for Block {
    fn from(value: Vec<u8>) -> Self {
        Block::from_vec(value)
    }
}

impl From<&[u8]> for Block {
    fn from(value: &[u8]) -> Self {
        Block::from_slice(value)
    }
}
