mod catalog;
mod cli;
mod commands;
mod transfer;
mod utils;

use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;

use crate::cli::CancelCleanup;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Tool name from the catalog, or a direct http(s) URL to fetch
    #[arg(index = 1)]
    target: Option<String>,

    /// List available tools and exit
    #[arg(short = 'l', long)]
    list: bool,

    /// Restrict --list to one category
    #[arg(short = 'c', long)]
    category: Option<String>,

    /// Directory to save the file into (defaults to the Desktop)
    #[arg(short = 'o', long = "output-dir")]
    output_dir: Option<PathBuf>,

    /// Extra catalog file (TOML) merged over the built-in list
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// What to do with a partly written file on cancel
    #[arg(long = "on-cancel", value_enum, default_value = "keep")]
    on_cancel: CancelCleanup,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    // --list needs no runtime, handle it before starting one
    if args.list {
        return commands::list_tools(args.category.as_deref(), args.catalog.as_deref());
    }

    let Some(target) = args.target else {
        bail!("Nothing to download. Pass a tool name or URL, or use --list.");
    };

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        commands::fetch(target, args.output_dir, args.catalog, args.on_cancel).await
    })
}
