use thiserror::Error;

/// Failure modes of snapshot rehydration. A corrupt snapshot is discarded
/// and evicted; the store then starts from its initial state.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("malformed persisted snapshot: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("session storage unavailable: {0}")]
    Storage(#[from] anyhow::Error),
}
