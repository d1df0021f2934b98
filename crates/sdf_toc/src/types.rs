//! Base types for the fixed structures of a sdftoc index.

use std::io::Cursor;

use binrw::{BinRead, BinWrite};

use crate::cursor::Record;
use crate::error::{FormatError, Result};

/// Size of the signature block that may follow the [`SdfTocId`]
pub const SIGNATURE_SIZE: u64 = 0x140;

/// Capacity of the byte buffer inside a [`SdfHeaderRecord`]
pub const HEADER_RECORD_CAPACITY: usize = 0x94;

/// sdftoc file header
///
/// Defines the header of the index which always starts with "WEST".
/// All data is stored in little endian format
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq)]
#[brw(magic = b"WEST", little)]
pub struct SdfTocHeader {
    /// Format version
    pub version: u32,

    /// Size of the file tree once inflated
    pub tree_decompressed: u32,

    /// Size of the zlib compressed file tree stored in the index
    pub tree_compressed: u32,

    /// Always zero in known files
    pub zero: u32,

    /// Number of entries in each of the two identifier tables
    pub id_count: u32,

    /// Number of [`SdfHeaderRecord`]s
    pub header_count: u32,
}

impl Record for SdfTocHeader {
    const SIZE: usize = 0x1C;

    fn parse(bytes: &[u8]) -> Result<Self> {
        Ok(Self::read(&mut Cursor::new(bytes))?)
    }
}

/// Identifier record
///
/// The meaning of the fields is unknown, they are kept so the layout is read exactly.
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq)]
#[brw(little)]
pub struct SdfTocId {
    pub head: u64,
    pub digest: [u8; 0x20],
    pub tail: u64,
}

impl Record for SdfTocId {
    const SIZE: usize = 0x30;

    fn parse(bytes: &[u8]) -> Result<Self> {
        Ok(Self::read(&mut Cursor::new(bytes))?)
    }
}

/// Type specific header record
///
/// Files flagged with a header have the first [`SdfHeaderRecord::used_bytes`] of one of these
/// records placed in front of their contents.
#[derive(BinRead, BinWrite, Debug, Copy, Clone, PartialEq)]
#[brw(little)]
pub struct SdfHeaderRecord {
    /// How many bytes of [`SdfHeaderRecord::bytes`] are meaningful
    pub used_bytes: u32,

    /// Header storage
    pub bytes: [u8; HEADER_RECORD_CAPACITY],
}

impl SdfHeaderRecord {
    /// Build a record from the bytes it should hold
    ///
    /// Input longer than the record capacity is truncated.
    pub fn new(data: &[u8]) -> Self {
        let used = data.len().min(HEADER_RECORD_CAPACITY);
        let mut bytes = [0u8; HEADER_RECORD_CAPACITY];
        bytes[..used].copy_from_slice(&data[..used]);

        SdfHeaderRecord {
            used_bytes: used as u32,
            bytes,
        }
    }

    /// The meaningful bytes of this record
    pub fn data(&self) -> Result<&[u8]> {
        let used = self.used_bytes as usize;
        self.bytes.get(..used).ok_or(
            FormatError::HeaderLength {
                used: self.used_bytes,
                capacity: HEADER_RECORD_CAPACITY,
            }
            .into(),
        )
    }
}

impl Record for SdfHeaderRecord {
    const SIZE: usize = 4 + HEADER_RECORD_CAPACITY;

    fn parse(bytes: &[u8]) -> Result<Self> {
        Ok(Self::read(&mut Cursor::new(bytes))?)
    }
}
