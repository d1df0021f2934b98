//! Types for reading sdftoc indexes
//!

use indexmap::IndexMap;
use std::{
    collections::HashMap,
    ffi::OsString,
    fmt::{self, Debug},
    io,
    path::{Path, PathBuf},
};
use tracing::{debug, instrument};

use crate::{
    block::Block,
    compression::{decompress, reconstruct},
    cursor::{ArrayView, BlockCursor},
    error::{Error, Result},
    tree::{ChunkRecord, DecodeOptions, TreeDecoder},
    types::{SdfHeaderRecord, SdfTocHeader, SdfTocId, SIGNATURE_SIZE},
};

/// sdftoc index reader
///
/// ```no_run
/// fn list_toc_contents(path: &std::path::Path) -> sdf_toc::error::Result<()> {
///     let toc = sdf_toc::SdfToc::open(path)?;
///
///     for (name, chunks) in toc.files()? {
///         println!("{}: {} chunk(s)", name, chunks.len());
///     }
///
///     Ok(())
/// }
/// ```
pub struct SdfToc {
    path: Option<PathBuf>,
    header: SdfTocHeader,
    id: SdfTocId,
    signature: Option<Block>,
    hashes: ArrayView<u32>,
    ids: ArrayView<SdfTocId>,
    header_records: ArrayView<SdfHeaderRecord>,
    tree: Block,
    decoder: TreeDecoder,
}

impl Debug for SdfToc {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("SdfToc")
            .field("path", &self.path)
            .field("header", &self.header)
            .field("signed", &self.signature.is_some())
            .finish_non_exhaustive()
    }
}

impl SdfToc {
    /// Open the index at `path`
    ///
    /// Packages are looked up next to the index, see [`SdfToc::packages`].
    #[instrument(skip_all, fields(path = %path.as_ref().display()), err)]
    pub fn open(path: impl AsRef<Path>) -> Result<SdfToc> {
        let mut toc = Self::new(Block::from_path(&path)?)?;
        toc.path = Some(path.as_ref().to_path_buf());
        Ok(toc)
    }

    /// Read an index held in `block`
    pub fn new(block: Block) -> Result<SdfToc> {
        match Self::get_metadata(block) {
            Ok(toc) => Ok(toc),
            Err(Error::IOError(e)) => Err(Error::IOError(e)),
            Err(e) => {
                debug!(error = %e, "unable to parse index");
                Err(Error::InvalidArchive)
            }
        }
    }

    /// Use `options` when walking the file tree
    pub fn with_options(mut self, options: DecodeOptions) -> SdfToc {
        self.decoder = TreeDecoder::new(options);
        self
    }

    /// Path the index was opened from, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn header(&self) -> &SdfTocHeader {
        &self.header
    }

    pub fn id(&self) -> &SdfTocId {
        &self.id
    }

    /// The signature block, if the index is signed
    pub fn signature(&self) -> Option<&Block> {
        self.signature.as_ref()
    }

    /// The table of 32 bit values that precedes the identifier table
    pub fn hashes(&self) -> &ArrayView<u32> {
        &self.hashes
    }

    pub fn ids(&self) -> &ArrayView<SdfTocId> {
        &self.ids
    }

    pub fn header_records(&self) -> &ArrayView<SdfHeaderRecord> {
        &self.header_records
    }

    /// The inflated file tree
    pub fn tree(&self) -> &Block {
        &self.tree
    }

    /// Call `f` once for every chunk in the file tree, in tree order
    pub fn for_each_chunk<F>(&self, f: F) -> Result<()>
    where
        F: FnMut(ChunkRecord) -> Result<()>,
    {
        self.decoder.decode(BlockCursor::new(self.tree.clone()), f)
    }

    /// Every chunk in the file tree, in tree order
    pub fn chunks(&self) -> Result<Vec<ChunkRecord>> {
        self.decoder.collect(&self.tree)
    }

    /// Chunks grouped by the file they belong to, in tree order
    pub fn files(&self) -> Result<IndexMap<Box<str>, Vec<ChunkRecord>>> {
        let mut files: IndexMap<Box<str>, Vec<ChunkRecord>> = IndexMap::new();
        self.for_each_chunk(|chunk| {
            files.entry(chunk.name.clone()).or_default().push(chunk);
            Ok(())
        })?;
        Ok(files)
    }

    /// The bytes of the header record selected by `tag`
    pub fn header_bytes(&self, tag: u64) -> Result<&[u8]> {
        self.header_records.get_u64(tag)?.data()
    }

    /// The packages belonging to this index, if it was opened from a path
    pub fn packages(&self) -> Option<Result<PackageSet>> {
        self.path.as_ref().map(PackageSet::for_index)
    }

    /// Read the contents of `chunk`
    ///
    /// Returns `None` when the package holding the chunk doesn't exist. Chunks flagged with a
    /// header have their header record placed in front of the data.
    #[instrument(skip_all, fields(name = %chunk.name, package = chunk.package_id), err)]
    pub fn read_chunk(
        &self,
        packages: &mut PackageSet,
        chunk: &ChunkRecord,
    ) -> Result<Option<Block>> {
        let Some(package) = packages.open(chunk.package_id)? else {
            return Ok(None);
        };

        let data = reconstruct(
            &package,
            chunk.package_offset,
            chunk.decompressed_size,
            &chunk.page_sizes,
        )?;

        if chunk.has_header {
            let header = Block::from_slice(self.header_bytes(chunk.header_tag)?);
            return Block::concat(&header, &data).map(Some);
        }

        Ok(Some(data))
    }

    fn get_metadata(block: Block) -> Result<SdfToc> {
        let mut cursor = BlockCursor::new(block);

        let header: SdfTocHeader = cursor.read()?;
        let id: SdfTocId = cursor.read()?;
        let signature = match cursor.read_u8()? {
            0 => None,
            _ => Some(cursor.part(SIGNATURE_SIZE)?),
        };

        let hashes = cursor.read_array_view(header.id_count as usize)?;
        let ids = cursor.read_array_view(header.id_count as usize)?;
        let header_records = cursor.read_array_view(header.header_count as usize)?;

        let compressed = cursor.read_vec(header.tree_compressed as u64)?;
        let tree = Block::from_vec(decompress(
            &compressed,
            header.tree_decompressed as usize,
        )?);

        debug!(
            version = header.version,
            ids = header.id_count,
            headers = header.header_count,
            tree = header.tree_decompressed,
            "read index"
        );

        Ok(SdfToc {
            path: None,
            header,
            id,
            signature,
            hashes,
            ids,
            header_records,
            tree,
            decoder: TreeDecoder::default(),
        })
    }
}

/// Resolves package ids to the sdfdata files next to an index
///
/// Package `id` of index `<stem>.sdftoc` lives in `<stem>-<layer>-<id>.sdfdata`, where the id is
/// padded to four digits and the layer is `A` below 1000, `B` below 2000 and `C` otherwise.
#[derive(Debug, Clone)]
pub struct PackageSet {
    directory: PathBuf,
    stem: OsString,
    opened: HashMap<u64, Option<Block>>,
}

impl PackageSet {
    pub fn new(directory: impl Into<PathBuf>, stem: impl Into<OsString>) -> Self {
        PackageSet {
            directory: directory.into(),
            stem: stem.into(),
            opened: HashMap::new(),
        }
    }

    /// The packages stored next to the index at `path`
    pub fn for_index(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let stem = path.file_stem().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} has no file name", path.display()),
            )
        })?;
        let directory = path.parent().unwrap_or_else(|| Path::new(""));

        Ok(PackageSet::new(directory, stem))
    }

    /// The layer letter used in the name of package `id`
    pub fn layer(id: u64) -> char {
        match id {
            0..=999 => 'A',
            1000..=1999 => 'B',
            _ => 'C',
        }
    }

    /// The file name of package `id`
    pub fn file_name(&self, id: u64) -> OsString {
        let mut name = self.stem.clone();
        name.push(format!("-{}-{:04}.sdfdata", Self::layer(id), id));
        name
    }

    /// The path of package `id`
    pub fn path(&self, id: u64) -> PathBuf {
        self.directory.join(self.file_name(id))
    }

    /// Open package `id`, or `None` if it doesn't exist
    pub fn open(&mut self, id: u64) -> Result<Option<Block>> {
        if let Some(package) = self.opened.get(&id) {
            return Ok(package.clone());
        }

        let path = self.path(id);
        let package = if path.is_file() {
            Some(Block::from_path(&path)?)
        } else {
            debug!(path = %path.display(), "package not found");
            None
        };

        self.opened.insert(id, package.clone());
        Ok(package)
    }
}
