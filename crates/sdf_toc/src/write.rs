//! Types for writing extracted files
//!

use bon::Builder;
use std::{
    fs::{self, OpenOptions},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};
use tracing::{debug, error, info, instrument, warn};

use crate::{
    block::Block,
    error::{Error, Result},
    read::{PackageSet, SdfToc},
    tree::ChunkRecord,
};

/// How an output file is opened
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WriteMode {
    /// Create the file, failing if it already exists
    CreateNew,

    /// Create the file, replacing any previous contents
    Truncate,

    /// Add to the end of the file, creating it if needed
    Append,
}

/// Where extracted files are written to
pub trait OutputSink {
    /// Whether something already exists at `path`
    fn exists(&self, path: &Path) -> bool;

    /// Create `path` and all of its missing parents
    fn create_dirs(&mut self, path: &Path) -> Result<()>;

    /// Write the contents of `data` to `path`
    fn write(&mut self, path: &Path, data: &Block, mode: WriteMode) -> Result<u64>;
}

/// An [`OutputSink`] writing to the local filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectorySink;

impl OutputSink for DirectorySink {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dirs(&mut self, path: &Path) -> Result<()> {
        Ok(fs::create_dir_all(path)?)
    }

    fn write(&mut self, path: &Path, data: &Block, mode: WriteMode) -> Result<u64> {
        let mut options = OpenOptions::new();
        match mode {
            WriteMode::CreateNew => options.write(true).create_new(true),
            WriteMode::Truncate => options.write(true).create(true).truncate(true),
            WriteMode::Append => options.append(true).create(true),
        };

        let mut out = BufWriter::new(options.open(path)?);
        let written = data.copy_to(&mut out)?;
        out.flush()?;
        Ok(written)
    }
}

/// Turn a file name from the index into a relative path
///
/// Names use `/` or `\` as separators. Absolute names, drive prefixes and `..` components are
/// rejected.
pub fn entry_path(name: &str) -> Result<PathBuf> {
    let unsafe_path = || Error::UnsafePath(name.to_owned());

    if name.starts_with(['/', '\\']) || name.contains(':') {
        return Err(unsafe_path());
    }

    let mut path = PathBuf::new();
    for part in name.split(['/', '\\']) {
        match part {
            "" | "." => continue,
            ".." => return Err(unsafe_path()),
            _ => path.push(part),
        }
    }

    if path.as_os_str().is_empty() {
        return Err(unsafe_path());
    }

    Ok(path)
}

/// Options for how an index is extracted
#[derive(Debug, Clone, Copy, Builder)]
pub struct ExtractOptions {
    /// Replace files that already exist in the target directory, otherwise they are an error
    #[builder(default = true)]
    pub overwrite: bool,

    /// Log chunks that fail to extract and continue with the next one
    #[builder(default)]
    pub keep_going: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        ExtractOptions::builder().build()
    }
}

/// Counts of what happened during an extraction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    /// Files created from their first chunk
    pub written: usize,

    /// Continuation chunks added to a file
    pub appended: usize,

    /// Chunks whose package doesn't exist, or whose file couldn't be started
    pub skipped: usize,

    /// Chunks that failed while `keep_going` was set
    pub failed: usize,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Outcome {
    Written,
    Appended,
    Skipped,
}

/// Extracts every file of an index into a directory
///
/// ```no_run
/// # fn doit() -> sdf_toc::error::Result<()> {
/// use sdf_toc::{
///     write::{DirectorySink, ExtractOptions, Extractor},
///     SdfToc,
/// };
///
/// let toc = SdfToc::open("world.sdftoc")?;
/// let packages = sdf_toc::PackageSet::for_index("world.sdftoc")?;
///
/// let mut extractor = Extractor::new(
///     &toc,
///     packages,
///     DirectorySink,
///     "out",
///     ExtractOptions::builder().keep_going(true).build(),
/// );
/// let summary = extractor.run()?;
/// println!("{} files written", summary.written);
/// # Ok(())
/// # }
/// ```
pub struct Extractor<'a, S: OutputSink> {
    toc: &'a SdfToc,
    packages: PackageSet,
    sink: S,
    root: PathBuf,
    options: ExtractOptions,
    // Name of a file whose first chunk wasn't written
    abandoned: Option<Box<str>>,
}

impl<'a, S: OutputSink> Extractor<'a, S> {
    pub fn new(
        toc: &'a SdfToc,
        packages: PackageSet,
        sink: S,
        root: impl Into<PathBuf>,
        options: ExtractOptions,
    ) -> Self {
        Extractor {
            toc,
            packages,
            sink,
            root: root.into(),
            options,
            abandoned: None,
        }
    }

    /// Unwrap and return the inner sink
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Extract every chunk of the index
    #[instrument(skip(self), fields(root = %self.root.display()), err)]
    pub fn run(&mut self) -> Result<ExtractSummary> {
        let toc = self.toc;
        let mut summary = ExtractSummary::default();

        toc.for_each_chunk(|chunk| {
            match self.extract(&chunk) {
                Ok(Outcome::Written) => summary.written += 1,
                Ok(Outcome::Appended) => summary.appended += 1,
                Ok(Outcome::Skipped) => summary.skipped += 1,
                Err(e) if self.options.keep_going => {
                    error!(name = %chunk.name, "{e}");
                    self.abandon(&chunk);
                    summary.failed += 1;
                }
                Err(e) => return Err(e),
            }
            Ok(())
        })?;

        debug!(?summary, "extraction finished");
        Ok(summary)
    }

    /// Extract a single chunk
    fn extract(&mut self, chunk: &ChunkRecord) -> Result<Outcome> {
        if chunk.is_continuation {
            if self.abandoned.as_deref() == Some(chunk.name.as_ref()) {
                debug!(name = %chunk.name, "skipping continuation of abandoned file");
                return Ok(Outcome::Skipped);
            }
        } else {
            self.abandoned = None;
        }

        let path = self.root.join(entry_path(&chunk.name)?);
        let mode = if chunk.is_continuation {
            WriteMode::Append
        } else if self.options.overwrite {
            WriteMode::Truncate
        } else {
            WriteMode::CreateNew
        };

        if mode == WriteMode::CreateNew && self.sink.exists(&path) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} already exists", path.display()),
            )
            .into());
        }

        let Some(data) = self.toc.read_chunk(&mut self.packages, chunk)? else {
            warn!(
                name = %chunk.name,
                package = %self.packages.path(chunk.package_id).display(),
                "package not found, skipping"
            );
            self.abandon(chunk);
            return Ok(Outcome::Skipped);
        };

        if let Some(parent) = path.parent() {
            self.sink.create_dirs(parent)?;
        }

        self.sink.write(&path, &data, mode)?;

        if chunk.is_continuation {
            debug!("appended {}", path.display());
            Ok(Outcome::Appended)
        } else {
            info!("writing {}", path.display());
            Ok(Outcome::Written)
        }
    }

    fn abandon(&mut self, chunk: &ChunkRecord) {
        if !chunk.is_continuation {
            self.abandoned = Some(chunk.name.clone());
        }
    }
}
