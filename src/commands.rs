use anyhow::{anyhow, bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::sync::mpsc::{self, UnboundedSender};

use crate::catalog::Catalog;
use crate::cli::CancelCleanup;
use crate::transfer::{CancelFlag, Downloader, TransferEvent, TransferRequest};
use crate::utils;

/// Resolve `target` and download it, driving a progress bar from the
/// worker's events. Ctrl+C flips the transfer's cancel flag rather than
/// killing the process; a second Ctrl+C stops waiting on the worker.
pub async fn fetch(
    target: String,
    output_dir: Option<PathBuf>,
    catalog_path: Option<PathBuf>,
    on_cancel: CancelCleanup,
) -> Result<()> {
    let mut catalog = Catalog::builtin();
    if let Some(path) = &catalog_path {
        catalog.merge(Catalog::load(path)?);
    }

    let (url, tool_name) = if target.starts_with("http://") || target.starts_with("https://") {
        (target.clone(), None)
    } else {
        match catalog.find(&target) {
            Some(tool) => (tool.url.clone(), Some(tool.name.clone())),
            None => bail!(
                "Unknown tool '{}'. Run with --list to see the catalog.",
                target
            ),
        }
    };

    let dir = match output_dir {
        Some(dir) => dir,
        None => utils::default_download_dir()
            .context("Could not determine a download directory, use --output-dir")?,
    };
    if !dir.exists() {
        fs::create_dir_all(&dir)
            .await
            .context("Failed to create output directory")?;
    }

    let filename = match utils::filename_from_url(&url)? {
        Some(name) => utils::sanitize_filename(&name),
        None => utils::fallback_filename(tool_name.as_deref()),
    };
    let destination = dir.join(filename);

    if let Some(name) = &tool_name {
        println!("Downloading {}", name);
    }
    println!("{} -> {:?}", url, destination);

    let downloader = Downloader::new(on_cancel);
    let mut handle = downloader.start(TransferRequest { url, destination });

    let (force_tx, mut force_quit) = mpsc::unbounded_channel();
    tokio::spawn(interrupt_watcher(handle.cancel_flag(), force_tx));

    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent:>3}% {msg}")
            .unwrap()
            .progress_chars("=>-"),
    );
    bar.enable_steady_tick(Duration::from_millis(100));

    let mut outcome = Ok(());
    loop {
        tokio::select! {
            event = handle.recv() => {
                let Some(event) = event else { break };
                match event {
                    TransferEvent::Progress { percent } => bar.set_position(percent as u64),
                    TransferEvent::Completed { path } => {
                        bar.finish_with_message("done");
                        println!("Saved to {:?}", path);
                    }
                    TransferEvent::Failed { message } => {
                        bar.abandon_with_message("failed");
                        outcome = Err(anyhow!(message));
                    }
                    TransferEvent::Cancelled => {
                        bar.abandon_with_message("cancelled");
                        match on_cancel {
                            CancelCleanup::Keep => println!("Cancelled, partial file kept"),
                            CancelCleanup::Delete => println!("Cancelled, partial file removed"),
                        }
                    }
                }
            }
            Some(()) = force_quit.recv() => {
                bar.abandon_with_message("interrupted");
                bail!("Interrupted twice, not waiting for the transfer");
            }
        }
    }
    handle.wait().await;
    outcome
}

/// First Ctrl+C asks the worker to stop; a second one tells the caller to
/// stop waiting, in case the worker never reaches a chunk boundary.
async fn interrupt_watcher(flag: CancelFlag, force_quit: UnboundedSender<()>) {
    if tokio::signal::ctrl_c().await.is_err() {
        return;
    }
    flag.cancel();
    if tokio::signal::ctrl_c().await.is_ok() {
        let _ = force_quit.send(());
    }
}

pub fn list_tools(category: Option<&str>, catalog_path: Option<&Path>) -> Result<()> {
    let mut catalog = Catalog::builtin();
    if let Some(path) = catalog_path {
        catalog.merge(Catalog::load(path)?);
    }

    println!("{:<26} {:<16} {}", "Name", "Category", "Description");
    println!("{:-<26} {:-<16} {:-<44}", "", "", "");

    let mut count = 0;
    for tool in catalog.in_category(category) {
        println!("{:<26} {:<16} {}", tool.name, tool.category, tool.description);
        count += 1;
    }

    if count == 0 {
        match category {
            Some(cat) => println!("No tools in category '{}'.", cat),
            None => println!("The catalog is empty."),
        }
    } else {
        println!();
        println!("{} tools available", count);
    }

    Ok(())
}
