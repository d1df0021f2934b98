use clap::Args;
use miette::{miette, Context, Result};
use sdf_toc::{DirectorySink, ExtractOptions, Extractor, PackageSet, SdfToc};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Args)]
pub struct ExtractArgs {
    /// An input sdftoc file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// A target directory
    #[arg(short, long, value_name = "DIR")]
    directory: PathBuf,

    /// Fail instead of replacing files that already exist in the target
    #[arg(long, default_value_t = false)]
    keep_existing: bool,

    /// Report files that fail to extract and continue with the rest
    #[arg(long, default_value_t = false)]
    keep_going: bool,
}

impl ExtractArgs {
    pub fn handle(&self) -> Result<()> {
        let toc = SdfToc::open(&self.file).context(format!("path: {}", &self.file.display()))?;
        let packages = PackageSet::for_index(&self.file)?;

        let options = ExtractOptions::builder()
            .overwrite(!self.keep_existing)
            .keep_going(self.keep_going)
            .build();

        let mut extractor =
            Extractor::new(&toc, packages, DirectorySink, self.directory.clone(), options);
        let summary = extractor
            .run()
            .context(format!("extracting into {}", &self.directory.display()))?;

        info!(
            appended = summary.appended,
            skipped = summary.skipped,
            "extracted {} files into {}",
            summary.written,
            self.directory.display()
        );

        if summary.skipped > 0 {
            warn!("{} chunks were skipped", summary.skipped);
        }

        if summary.failed > 0 {
            return Err(miette!("{} chunks failed to extract", summary.failed));
        }

        Ok(())
    }
}
