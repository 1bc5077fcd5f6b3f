//! # Media Format Implementation
//!
//! This crate's only container format is the MPEG Transport Stream (TS)
//! multiplexer. `format` is kept as a parent module, rather than hoisting
//! `ts` to the crate root, to leave room for sibling container formats the
//! way the codebase this module grew from organized things.
//!
//! ## Muxing to TS Format
//!
//! ```rust,no_run
//! use tsmux::format::ts::Muxer;
//! use std::fs::File;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let output = File::create("output.ts")?;
//! let mut muxer = Muxer::new(output);
//! # Ok(())
//! # }
//! ```

/// MPEG Transport Stream (TS) format implementation (single-program muxing).
pub mod ts;

// Re-export commonly used types
pub use self::ts::Muxer;
