pub mod toc;

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Handle sdftoc indexes and their sdfdata packages
    Toc {
        #[command(subcommand)]
        command: toc::TocCommands,
    },
}

impl Commands {
    pub fn handle(&self) -> miette::Result<()> {
        match self {
            Commands::Toc { command } => command.handle(),
        }
    }
}
