//! # Utility Functions and Types
//!
//! Common utilities shared across the muxer implementation.
//!
//! ## CRC Calculation
//!
//! The crc module provides MPEG-2 CRC32 calculation, used to compute the
//! trailing checksum of every PSI section (PAT/PMT):
//!
//! ```rust
//! use tsmux::utils::Crc32Mpeg2;
//!
//! let crc = Crc32Mpeg2::new();
//! let checksum = crc.calculate(b"Hello, world!");
//! println!("CRC32: {:08x}", checksum);
//! ```

/// CRC calculation implementations
pub mod crc;

// Re-export commonly used types
pub use crc::Crc32Mpeg2;
