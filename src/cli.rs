use clap::ValueEnum;

/// What to do with the partially written file when a transfer is cancelled.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CancelCleanup {
    /// Leave the partial file on disk
    Keep,
    /// Remove the partial file
    Delete,
}
