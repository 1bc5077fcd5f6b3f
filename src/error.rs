//! # Error Types
//!
//! This module provides the error type used throughout the crate. It defines
//! a central `TsMuxError` that encapsulates all possible error conditions the
//! muxer can report: the three domain-specific conditions (duplicate PID,
//! missing PID, invalid PCR PID), plus I/O errors and section-serialization
//! failures propagated verbatim from the sink or the PSI/PES serializers.
//!
//! ## Example Usage
//!
//! ```rust
//! use tsmux::error::{Result, TsMuxError};
//!
//! fn require_pid(found: bool, pid: u16) -> Result<()> {
//!     if !found {
//!         return Err(TsMuxError::PidNotFound(pid));
//!     }
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Primary error type for the tsmux library.
#[derive(Error, Debug)]
pub enum TsMuxError {
    /// I/O errors surfaced by the sink, carrying the number of bytes this
    /// call had already delivered to the sink before `source` occurred.
    /// Per the muxer's error-propagation policy, callers can always recover
    /// how many bytes actually reached the sink from a failed call, even
    /// though the call as a whole returned `Err`.
    #[error("io error after writing {written} byte(s) to the sink: {source}")]
    Io {
        /// Bytes already delivered to the sink before `source` occurred.
        written: usize,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// `AddElementaryStream` was called with a PID that is already registered.
    #[error("PID {0:#06x} already exists")]
    PidAlreadyExists(u16),

    /// A lookup (e.g. `WritePayload`, `RemoveElementaryStream`) referenced a
    /// PID with no registered elementary stream.
    #[error("PID {0:#06x} not found")]
    PidNotFound(u16),

    /// The PMT's `pcr_pid` does not match the `elementary_pid` of any
    /// registered elementary stream.
    #[error("PCR PID {0:#06x} is not present in the PMT")]
    PcrPidInvalid(u16),

    /// A PSI section or PES header could not be serialized (e.g. a section
    /// that would not fit within a single TS packet).
    #[error("serialization error: {0}")]
    Serialize(String),
}

/// A specialized `Result` type for tsmux operations.
pub type Result<T> = std::result::Result<T, TsMuxError>;

impl TsMuxError {
    /// Builds an [`TsMuxError::Io`], recording `written` bytes as already
    /// delivered to the sink before `source` occurred.
    pub fn io(written: usize, source: std::io::Error) -> Self {
        Self::Io { written, source }
    }
}
