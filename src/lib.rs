#![doc(html_root_url = "https://docs.rs/tsmux/0.1.0")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

//! # tsmux
//!
//! `tsmux` is a single-program MPEG-TS (Transport Stream) multiplexer: it
//! packetizes PES units into fixed 188-byte TS packets with adaptation-field
//! stuffing and interleaves PAT/PMT (PSI) tables on a configurable schedule,
//! per ISO/IEC 13818-1.
//!
//! ## Quick Start
//!
//! ```rust
//! use tsmux::format::ts::{ElementaryStreamInfo, Muxer, PESHeader, StreamType};
//!
//! let mut muxer = Muxer::new(Vec::new());
//! let pid = muxer
//!     .add_elementary_stream(ElementaryStreamInfo::new(0, StreamType::H264), true)
//!     .unwrap();
//!
//! muxer
//!     .write_payload(pid, None, PESHeader::new(0xE0).with_pts(90_000), &[0u8; 10])
//!     .unwrap();
//! ```
//!
//! ## Module Overview
//!
//! - `format::ts`: the muxer facade, packetizer, PSI table builder, PES
//!   header construction, and the core wire types.
//! - `error`: `TsMuxError` and the crate's `Result` alias.
//! - `config`: `MuxerConfig`, the muxer's only tunable (retransmit period).
//! - `utils`: the MPEG-2 CRC32 used by PSI section serialization.

/// Configuration accepted by [`format::ts::Muxer`].
pub mod config;

/// Error types and utilities.
pub mod error;

/// Media format implementations (MPEG-TS multiplexing).
pub mod format;

/// Common utilities and helper functions.
pub mod utils;

pub use error::{Result, TsMuxError};
