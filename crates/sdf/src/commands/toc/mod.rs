pub mod extract;
pub mod info;
pub mod list;

#[derive(clap::Subcommand)]
pub enum TocCommands {
    /// Extract every file of an index into a directory
    Extract(extract::ExtractArgs),
    /// List the files of an index
    List(list::ListArgs),
    /// Show the header of an index
    Info(info::InfoArgs),
}

impl TocCommands {
    pub fn handle(&self) -> miette::Result<()> {
        match self {
            TocCommands::Extract(extract) => extract.handle(),
            TocCommands::List(list) => list.handle(),
            TocCommands::Info(info) => info.handle(),
        }
    }
}
