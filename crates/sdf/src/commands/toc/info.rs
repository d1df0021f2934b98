use clap::Args;
use itertools::Itertools;
use miette::{Context, Result};
use owo_colors::{OwoColorize, Stream::Stdout};
use sdf_toc::{PackageSet, SdfToc};
use std::path::PathBuf;
use tracing::warn;

#[derive(Args)]
pub struct InfoArgs {
    /// An input sdftoc file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,
}

impl InfoArgs {
    pub fn handle(&self) -> Result<()> {
        let toc = SdfToc::open(&self.file).context(format!("path: {}", &self.file.display()))?;
        let packages = PackageSet::for_index(&self.file)?;
        let header = toc.header();

        let files = toc.files()?;
        let chunks: usize = files.values().map(Vec::len).sum();
        let ids = files
            .values()
            .flatten()
            .map(|c| c.package_id)
            .unique()
            .sorted()
            .collect::<Vec<_>>();

        let field = |name: &str| format!("{name:>16}:");
        println!(
            "{} {}",
            field("index").if_supports_color(Stdout, |t| t.bold()),
            self.file.display()
        );
        println!("{} {}", field("version"), header.version);
        println!("{} {}", field("signed"), toc.signature().is_some());
        println!(
            "{} {} ({} compressed)",
            field("tree"),
            header.tree_decompressed,
            header.tree_compressed
        );
        println!("{} {}", field("ids"), header.id_count);
        println!("{} {}", field("header records"), header.header_count);
        println!("{} {}", field("files"), files.len());
        println!("{} {}", field("chunks"), chunks);
        println!("{} {}", field("packages"), ids.len());

        let missing = ids
            .iter()
            .filter(|id| !packages.path(**id).is_file())
            .map(|id| packages.file_name(*id).to_string_lossy().into_owned())
            .collect::<Vec<_>>();

        if !missing.is_empty() {
            warn!("{} packages are missing", missing.len());
            for name in missing {
                println!(
                    "{} {}",
                    field("missing"),
                    name.if_supports_color(Stdout, |t| t.red())
                );
            }
        }

        Ok(())
    }
}
