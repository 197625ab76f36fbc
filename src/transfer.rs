use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::TryStreamExt;
use reqwest::Client;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_util::io::StreamReader;

use crate::cli::CancelCleanup;

/// Transfers copy the body in fixed chunks of this size.
const CHUNK_SIZE: usize = 8 * 1024;

/// A single download: one URL, one destination file.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub url: String,
    pub destination: PathBuf,
}

/// Shared cancellation flag for an in-flight transfer.
///
/// Setting the flag is sticky; there is no way to clear it. The worker
/// checks it between chunks, so after `cancel()` at most one more chunk
/// is written before the transfer stops.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What a transfer worker reports back over its event channel.
///
/// Exactly one of `Completed`, `Failed` or `Cancelled` is sent per
/// transfer, always as the last event, and only after the destination
/// file handle has been closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferEvent {
    /// Whole percent of the body written so far. Sent only when the value
    /// changes, and never when the server did not announce a length.
    Progress { percent: u32 },
    Completed { path: PathBuf },
    Failed { message: String },
    Cancelled,
}

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("server responded with {0}")]
    Status(reqwest::StatusCode),
    #[error("failed to create {path:?}: {source}")]
    Create { path: PathBuf, source: io::Error },
    #[error("failed to read from connection: {0}")]
    Read(io::Error),
    #[error("failed to write chunk: {0}")]
    Write(io::Error),
    #[error("failed to flush file: {0}")]
    Flush(io::Error),
}

/// Handle to a running transfer: the event stream plus its cancel flag.
pub struct TransferHandle {
    cancel: CancelFlag,
    events: UnboundedReceiver<TransferEvent>,
    task: JoinHandle<()>,
}

impl TransferHandle {
    /// Next event from the worker. Returns `None` once the worker is done
    /// and the terminal event has been consumed.
    pub async fn recv(&mut self) -> Option<TransferEvent> {
        self.events.recv().await
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A clone of the flag, for wiring up signal handlers.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Wait for the worker task itself to finish.
    pub async fn wait(self) {
        let _ = self.task.await;
    }
}

/// Downloads files over HTTP, one worker task per transfer.
///
/// Holds no per-transfer state; every call to [`Downloader::start`] is
/// independent of the previous one.
pub struct Downloader {
    client: Client,
    on_cancel: CancelCleanup,
}

impl Downloader {
    pub fn new(on_cancel: CancelCleanup) -> Self {
        let client = Client::builder()
            .user_agent("tooldl/0.1.0")
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());
        Downloader { client, on_cancel }
    }

    /// Spawn a worker for `request` and return its handle.
    pub fn start(&self, request: TransferRequest) -> TransferHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancelFlag::default();
        let task = tokio::spawn(run_transfer(
            self.client.clone(),
            request,
            cancel.clone(),
            self.on_cancel,
            tx,
        ));
        TransferHandle {
            cancel,
            events: rx,
            task,
        }
    }
}

enum Outcome {
    Completed,
    Cancelled,
}

async fn run_transfer(
    client: Client,
    request: TransferRequest,
    cancel: CancelFlag,
    on_cancel: CancelCleanup,
    events: UnboundedSender<TransferEvent>,
) {
    // transfer() flushes and closes the destination before it returns,
    // so receivers can inspect the file as soon as a terminal event
    // arrives.
    match transfer(&client, &request, &cancel, on_cancel, &events).await {
        Ok(Outcome::Completed) => {
            let _ = events.send(TransferEvent::Completed {
                path: request.destination.clone(),
            });
        }
        Ok(Outcome::Cancelled) => {
            let _ = events.send(TransferEvent::Cancelled);
        }
        Err(err) => {
            let _ = events.send(TransferEvent::Failed {
                message: err.to_string(),
            });
        }
    }
}

async fn transfer(
    client: &Client,
    request: &TransferRequest,
    cancel: &CancelFlag,
    on_cancel: CancelCleanup,
    events: &UnboundedSender<TransferEvent>,
) -> Result<Outcome, TransferError> {
    let response = client.get(&request.url).send().await?;
    if !response.status().is_success() {
        return Err(TransferError::Status(response.status()));
    }

    let total = response.content_length();
    log::debug!(
        "transfer started: {} -> {:?} ({:?} bytes)",
        request.url,
        request.destination,
        total
    );

    let mut file = File::create(&request.destination)
        .await
        .map_err(|source| TransferError::Create {
            path: request.destination.clone(),
            source,
        })?;

    let stream = response.bytes_stream().map_err(io::Error::other);
    let mut reader = StreamReader::new(stream);

    let mut tracker = ProgressTracker::new(total);
    let mut buf = [0u8; CHUNK_SIZE];

    let outcome = loop {
        if cancel.is_cancelled() {
            break Ok(Outcome::Cancelled);
        }

        let n = match reader.read(&mut buf).await {
            Ok(n) => n,
            Err(err) => break Err(TransferError::Read(err)),
        };
        if n == 0 {
            break Ok(Outcome::Completed);
        }
        if let Err(err) = file.write_all(&buf[..n]).await {
            break Err(TransferError::Write(err));
        }

        if let Some(percent) = tracker.record(n as u64) {
            let _ = events.send(TransferEvent::Progress { percent });
        }
    };

    // A dropped handle completes buffered writes in the background. Flush
    // on every path: the file must hold all received bytes by the time
    // the terminal event goes out.
    match &outcome {
        Ok(Outcome::Completed) => file.flush().await.map_err(TransferError::Flush)?,
        _ => {
            let _ = file.flush().await;
        }
    }
    drop(file);

    if matches!(outcome, Ok(Outcome::Cancelled)) && on_cancel == CancelCleanup::Delete {
        if let Err(err) = tokio::fs::remove_file(&request.destination).await {
            log::warn!(
                "failed to remove partial file {:?}: {}",
                request.destination,
                err
            );
        }
    }

    outcome
}

/// Tracks written bytes and decides when a new percent is worth emitting.
struct ProgressTracker {
    total: Option<u64>,
    written: u64,
    last: Option<u32>,
}

impl ProgressTracker {
    fn new(total: Option<u64>) -> Self {
        ProgressTracker {
            total,
            written: 0,
            last: None,
        }
    }

    /// Account for `n` more bytes. Returns the new whole percent when it
    /// changed, `None` otherwise or when the total is unknown or zero.
    fn record(&mut self, n: u64) -> Option<u32> {
        self.written += n;
        let total = self.total?;
        if total == 0 {
            return None;
        }
        // Integer math keeps exact-multiple boundaries exact, where a
        // float division can land just under the whole percent.
        let percent = (self.written.min(total).saturating_mul(100) / total) as u32;
        if self.last == Some(percent) {
            None
        } else {
            self.last = Some(percent);
            Some(percent)
        }
    }
}
