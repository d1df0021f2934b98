//! Builds synthetic sdftoc indexes and their packages
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use flate2::{write::ZlibEncoder, Compression};

pub const PAGE_SIZE: usize = 0x10000;

pub fn compress(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Deterministic filler that compresses reasonably well
pub fn pattern(length: usize, seed: u8) -> Vec<u8> {
    (0..length)
        .map(|i| ((i / 13) as u8).wrapping_add(seed) ^ (i % 5) as u8)
        .collect()
}

/// Deterministic filler that doesn't compress
pub fn noise(length: usize, seed: u32) -> Vec<u8> {
    let mut state = seed.wrapping_mul(2654435761).wrapping_add(1);
    (0..length)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state >> 24) as u8
        })
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct FileEntry {
    pub name: String,
    pub package: u16,
    pub chunks: Vec<Vec<u8>>,
    pub compress: bool,
    pub header_tag: Option<u16>,
    pub trailer: bool,
}

impl FileEntry {
    pub fn new(name: &str, package: u16, data: &[u8]) -> Self {
        FileEntry {
            name: name.to_owned(),
            package,
            chunks: vec![data.to_vec()],
            ..Default::default()
        }
    }

    pub fn compressed(mut self) -> Self {
        self.compress = true;
        self
    }

    pub fn with_header(mut self, tag: u16) -> Self {
        self.header_tag = Some(tag);
        self
    }

    pub fn with_trailer(mut self) -> Self {
        self.trailer = true;
        self
    }

    pub fn with_chunk(mut self, data: &[u8]) -> Self {
        self.chunks.push(data.to_vec());
        self
    }
}

pub struct Archive {
    pub index: Vec<u8>,
    pub packages: BTreeMap<u16, Vec<u8>>,
}

impl Archive {
    pub fn package_name(stem: &str, id: u16) -> String {
        let layer = match id {
            0..=999 => 'A',
            1000..=1999 => 'B',
            _ => 'C',
        };
        format!("{stem}-{layer}-{id:04}.sdfdata")
    }

    /// Write the index and packages into `directory`, returning the index path
    pub fn write_to(&self, directory: &Path, stem: &str) -> io::Result<PathBuf> {
        let index = directory.join(format!("{stem}.sdftoc"));
        std::fs::write(&index, &self.index)?;
        for (id, data) in &self.packages {
            std::fs::write(directory.join(Self::package_name(stem, *id)), data)?;
        }
        Ok(index)
    }
}

#[derive(Default)]
pub struct ArchiveBuilder {
    files: Vec<FileEntry>,
    headers: Vec<Vec<u8>>,
    signed: bool,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(mut self, file: FileEntry) -> Self {
        self.files.push(file);
        self
    }

    pub fn header(mut self, bytes: &[u8]) -> Self {
        self.headers.push(bytes.to_vec());
        self
    }

    pub fn signed(mut self) -> Self {
        self.signed = true;
        self
    }

    /// Store `data` in `package`, returning the chunk fields up to the offset and the page table
    fn store(package: &mut Vec<u8>, data: &[u8], paged: bool) -> io::Result<(Vec<u8>, Vec<u8>)> {
        let offset = package.len() as u32;
        let mut fields = Vec::new();

        if !paged {
            package.extend(data);
            fields.push(0x03 | (4 << 2));
            fields.extend((data.len() as u32).to_le_bytes());
            fields.extend(offset.to_le_bytes());
            return Ok((fields, Vec::new()));
        }

        let mut pages = Vec::new();
        for page in data.chunks(PAGE_SIZE) {
            let compressed = compress(page)?;
            if compressed.len() < page.len() {
                package.extend(&compressed);
                pages.push(compressed.len());
            } else {
                // Stored raw, a full raw page is recorded as zero
                package.extend(page);
                pages.push(if page.len() == PAGE_SIZE { 0 } else { page.len() });
            }
        }

        let total = package.len() as u32 - offset;
        fields.push(0x03 | (4 << 2) | (1 << 5));
        fields.extend((data.len() as u32).to_le_bytes());
        fields.extend(total.to_le_bytes());
        fields.extend(offset.to_le_bytes());

        let mut table = Vec::new();
        if pages.len() > 1 {
            for size in pages {
                table.extend((size as u16).to_le_bytes());
            }
        }
        Ok((fields, table))
    }

    fn entry(file: &FileEntry, packages: &mut BTreeMap<u16, Vec<u8>>) -> io::Result<Vec<u8>> {
        let mut entry = Vec::new();

        let mut name = file.name.as_bytes();
        while !name.is_empty() {
            let (part, rest) = name.split_at(name.len().min(0x1F));
            entry.push(part.len() as u8);
            entry.extend(part);
            name = rest;
        }

        let count = file.chunks.len() as u8;
        entry.push(b'A' + count + if file.trailer { 8 } else { 0 });

        if count > 0 {
            entry.extend(0xDEADBEEFu32.to_le_bytes());
            match file.header_tag {
                Some(tag) => {
                    entry.push(0x02);
                    entry.extend(tag.to_le_bytes());
                }
                None => entry.push(0x00),
            }

            let package = packages.entry(file.package).or_default();
            for (index, data) in file.chunks.iter().enumerate() {
                let (fields, table) = Self::store(package, data, file.compress)?;
                entry.extend(fields);
                entry.extend(file.package.to_le_bytes());
                entry.extend(table);
                entry.extend((index as u32 + 1).to_le_bytes());
            }
        }

        if file.trailer {
            entry.extend([0x01, 0xAB, 0xCD]);
        }

        Ok(entry)
    }

    /// Encode the file tree, filling `packages` with the chunk data
    fn tree(&self, packages: &mut BTreeMap<u16, Vec<u8>>) -> io::Result<Vec<u8>> {
        let mut tree = Vec::new();

        for (index, file) in self.files.iter().enumerate() {
            let entry = Self::entry(file, packages)?;
            if index + 1 < self.files.len() {
                let next = tree.len() + 5 + entry.len();
                tree.push(0x7F);
                tree.extend((next as u32).to_le_bytes());
            }
            tree.extend(entry);
        }

        Ok(tree)
    }

    pub fn build(&self) -> io::Result<Archive> {
        let mut packages = BTreeMap::new();
        let tree = self.tree(&mut packages)?;
        let compressed = compress(&tree)?;

        let mut index = Vec::new();
        index.extend(b"WEST");
        for value in [
            1,
            tree.len() as u32,
            compressed.len() as u32,
            0,
            1,
            self.headers.len() as u32,
        ] {
            index.extend(value.to_le_bytes());
        }

        index.extend([0x11; 0x30]);
        index.push(self.signed as u8);
        if self.signed {
            index.extend([0x5A; 0x140]);
        }

        index.extend(0x12345678u32.to_le_bytes());
        index.extend([0x22; 0x30]);

        for header in &self.headers {
            let mut bytes = [0u8; 0x94];
            bytes[..header.len()].copy_from_slice(header);
            index.extend((header.len() as u32).to_le_bytes());
            index.extend(bytes);
        }

        index.extend(compressed);

        Ok(Archive { index, packages })
    }
}
