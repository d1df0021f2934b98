use clap::Args;
use itertools::Itertools;
use miette::{Context, Result};
use owo_colors::{OwoColorize, Stream::Stdout};
use sdf_toc::{ChunkRecord, PackageSet, SdfToc};
use std::path::PathBuf;

#[derive(Args)]
pub struct ListArgs {
    /// An input sdftoc file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// List every chunk instead of every file
    #[arg(long, default_value_t = false)]
    chunks: bool,
}

impl ListArgs {
    pub fn handle(&self) -> Result<()> {
        let toc = SdfToc::open(&self.file).context(format!("path: {}", &self.file.display()))?;
        let packages = PackageSet::for_index(&self.file)?;

        if self.chunks {
            toc.for_each_chunk(|chunk| {
                print_chunk(&toc, &packages, &chunk);
                Ok(())
            })?;
            return Ok(());
        }

        for (name, chunks) in toc.files()? {
            let size: u64 = chunks.iter().map(|c| output_size(&toc, c)).sum();
            let ids = chunks.iter().map(|c| c.package_id).unique().join(",");

            println!(
                "{:>12} {} {}",
                size,
                name.if_supports_color(Stdout, |t| t.bold()),
                format!("[{ids}]").if_supports_color(Stdout, |t| t.dimmed())
            );
        }

        Ok(())
    }
}

/// Size of the chunk once extracted, including its header record
fn output_size(toc: &SdfToc, chunk: &ChunkRecord) -> u64 {
    let header = match chunk.has_header {
        true => toc.header_bytes(chunk.header_tag).map_or(0, |h| h.len() as u64),
        false => 0,
    };
    header + chunk.decompressed_size
}

fn print_chunk(toc: &SdfToc, packages: &PackageSet, chunk: &ChunkRecord) {
    let package = packages.file_name(chunk.package_id);
    let package = package.to_string_lossy();
    let storage = match chunk.page_sizes.len() {
        0 => "raw".to_owned(),
        pages => format!("{pages} pages"),
    };

    let name = match chunk.is_continuation {
        true => format!("  + {}", chunk.name),
        false => chunk.name.to_string(),
    };

    if packages.path(chunk.package_id).is_file() {
        print!("{}", package.if_supports_color(Stdout, |t| t.green()));
    } else {
        print!("{}", package.if_supports_color(Stdout, |t| t.red()));
    }

    println!(
        " {:#010x} {:>12} {:>9} {}",
        chunk.package_offset,
        output_size(toc, chunk),
        storage,
        name
    );
}
