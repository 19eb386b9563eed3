use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

#[derive(Parser)]
#[command(name = "mdwiki")]
#[command(about = "Keep a folder of HTML pages in sync with a Markdown wiki")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Settings file (defaults to the user configuration directory)
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List configured wikis
    List(ListArgs),

    /// Add a wiki configuration (replaces one with the same name)
    Add(AddArgs),

    /// Remove a wiki configuration
    Remove(RemoveArgs),

    /// Render every document of the selected wikis once
    Render(RenderArgs),

    /// Watch the selected wikis and keep their HTML output in sync
    Watch(WatchArgs),
}

#[derive(Args)]
pub struct ListArgs {}

#[derive(Args)]
pub struct AddArgs {
    /// Display name
    #[arg(short, long)]
    pub name: String,

    /// Directory containing the Markdown documents
    #[arg(short, long)]
    pub input: PathBuf,

    /// Directory receiving the generated HTML
    #[arg(short, long)]
    pub output: PathBuf,

    /// Create missing documents for wiki links
    #[arg(long)]
    pub auto_create: bool,

    /// Ask before opening automatically created documents
    #[arg(long)]
    pub ask_to_open: bool,
}

#[derive(Args)]
pub struct RemoveArgs {
    /// Name of the wiki to remove
    pub name: String,
}

#[derive(Args)]
pub struct RenderArgs {
    /// Wikis to render (all when omitted)
    pub names: Vec<String>,
}

#[derive(Args)]
pub struct WatchArgs {
    /// Wikis to watch (all when omitted)
    pub names: Vec<String>,
}
