//! This library handles reading and extracting the **sdftoc**/**sdfdata** archives used by
//! recent *Ubisoft* titles.
//!
//! # sdftoc Archive Format Documentation
//!
//! An archive is split into a single index, the `.sdftoc` file, and a number of packages, the
//! `.sdfdata` files next to it. The index describes every file and where its data lives. The
//! packages hold the data, either stored raw or compressed in pages.
//!
//! ## Index Structure
//!
//! | Offset (bytes) | Field                  | Description                                                |
//! |----------------|------------------------|------------------------------------------------------------|
//! | 0x0000         | Magic number           | 4 bytes: 0x54534557 ("WEST")                               |
//! | 0x0004         | Version                | 4 bytes: Format version                                    |
//! | 0x0008         | Tree Uncomp. Size      | 4 bytes: Size of the file tree once inflated               |
//! | 0x000C         | Tree Comp. Size        | 4 bytes: Size of the zlib compressed file tree             |
//! | 0x0010         | Zero                   | 4 bytes: Always zero                                       |
//! | 0x0014         | Id Count               | 4 bytes: Number of entries in the id tables                |
//! | 0x0018         | Header Count           | 4 bytes: Number of header records                          |
//! | 0x001C         | Index Id               | 48 bytes: Opaque identifier of the index                   |
//! | 0x004C         | Signature Flag         | 1 byte: Non-zero when a signature follows                  |
//!
//! The fixed part is followed by:
//!
//! - **Signature**: 0x140 bytes, only present when the signature flag is set.
//! - **Hash Table**: *Id Count* 4 byte values.
//! - **Id Table**: *Id Count* 48 byte identifiers.
//! - **Header Records**: *Header Count* records of a 4 byte used length and 0x94 bytes of data.
//!   Some files start with one of these records instead of storing it in a package.
//! - **File Tree**: the zlib compressed file tree, see [`tree`] for its encoding.
//!
//! ## Packages
//!
//! Package `id` of the index `<stem>.sdftoc` is named `<stem>-<layer>-<id>.sdfdata`, with the id
//! padded to four digits. The layer is `A` for ids below 1000, `B` below 2000 and `C` otherwise.
//!
//! A file is made of one or more chunks, each stored at an offset inside a single package.
//! Compressed chunks are split into pages of 64KiB, each compressed with zlib on its own, see
//! [`compression`].
//!
//! ## Additional Information
//!
//! - **File Extensions**: `.sdftoc`, `.sdfdata`
//! - **Endianness**: Little-endian for all multi-byte integers
//!

pub mod block;
pub mod compression;
pub mod cursor;
pub mod error;
pub mod read;
pub mod tree;
pub mod types;
pub mod write;

pub use block::Block;
pub use read::{PackageSet, SdfToc};
pub use tree::{ChunkRecord, TreeDecoder};
pub use write::{DirectorySink, ExtractOptions, Extractor};

#[cfg(test)]
#[path = "../tests/common/mod.rs"]
pub(crate) mod fixture;
