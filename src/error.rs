//! Error kinds a caller needs to match on.
//!
//! Boundary-level failures (bad CLI input, missing files) go through
//! `anyhow`; these variants are for the few cases orchestration inspects by
//! kind rather than just logging and propagating.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("worker panicked on thread {thread_idx}: {message}")]
    WorkerPanic { thread_idx: usize, message: String },

    #[error("malformed average-length cache record: {0}")]
    CacheFormat(String),

    #[error("chromosome {0:?} not present in reference genome")]
    UnknownChrom(String),
}
