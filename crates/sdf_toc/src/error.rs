//! Error types that can be emitted from this library

use miette::Diagnostic;
use thiserror::Error;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent warpper for [`std::io::Error`]
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Transparent warpper for [`binrw::Error`]
    #[error(transparent)]
    BinRWError(#[from] binrw::Error),

    /// A read, seek or sub-range request reached past the end of its source
    #[error("range of {length} bytes at offset {offset} exceeds source of {size} bytes")]
    OutOfRange {
        /// Requested start offset
        offset: u64,
        /// Requested length
        length: u64,
        /// Size of the source the request was made against
        size: u64,
    },

    /// An array element was requested past the end of the array
    #[error("index {index} is out of range for array of {count} elements")]
    IndexOutOfRange {
        /// Requested index
        index: usize,
        /// Number of elements in the array
        count: usize,
    },

    /// The encoded data is structurally invalid
    #[error(transparent)]
    #[diagnostic(transparent)]
    Format(#[from] FormatError),

    /// A compressed page could not be inflated
    #[error(transparent)]
    #[diagnostic(transparent)]
    Decompression(#[from] DecompressionError),

    /// file is an invalid sdftoc index
    #[error("file is an invalid sdftoc index")]
    InvalidArchive,

    /// A file name would be written outside of the output directory
    #[error("refusing to extract unsafe path {0}")]
    UnsafePath(String),
}

/// Error type describing malformed index contents
#[derive(Error, Diagnostic, Debug)]
pub enum FormatError {
    /// A control byte of zero was found in the file tree
    #[error("unexpected null control byte in file tree at offset {position}")]
    NullControlByte {
        /// Offset of the control byte inside the tree block
        position: u64,
    },

    /// The file tree nests deeper than allowed
    #[error("file tree exceeds maximum branch depth of {limit}")]
    DepthExceeded {
        /// The configured depth limit
        limit: usize,
    },

    /// The file tree walk visited more nodes than allowed
    #[error("file tree visits more than {limit} nodes")]
    NodeLimitExceeded {
        /// The node budget of the walk
        limit: usize,
    },

    /// A header record claims more bytes than it stores
    #[error("header record uses {used} bytes but only holds {capacity}")]
    HeaderLength {
        /// Byte count claimed by the record
        used: u32,
        /// Byte count the record can hold
        capacity: usize,
    },

    /// A variable length integer is wider than 64 bits
    #[error("variable length integer of {width} bytes is too wide")]
    VarintWidth {
        /// Encoded width in bytes
        width: usize,
    },

    /// Alignment must be a positive number of bytes
    #[error("alignment boundary must be non-zero")]
    InvalidAlignment,
}

/// Error type describing a failed page decompression
#[derive(Error, Diagnostic, Debug)]
pub enum DecompressionError {
    /// The compressed stream is corrupt
    #[error("corrupt compressed data: {0}")]
    Corrupt(String),

    /// The stream inflated to a different size than recorded
    #[error("expected {expected} decompressed bytes but got {actual}")]
    SizeMismatch {
        /// Size recorded in the index
        expected: u64,
        /// Size actually produced
        actual: u64,
    },
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
