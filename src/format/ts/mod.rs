//! # MPEG Transport Stream (TS) multiplexing
//!
//! A single-program MPEG-TS multiplexer: fixed 188-byte packets, PAT/PMT
//! (re)transmission on a configurable schedule, and PES packetization with
//! adaptation-field stuffing. See [`Muxer`] for the entry point.
//!
//! ## Example
//!
//! ```rust
//! use tsmux::format::ts::{ElementaryStreamInfo, Muxer, PESHeader, StreamType};
//!
//! let mut muxer = Muxer::new(Vec::new());
//! let pid = muxer
//!     .add_elementary_stream(ElementaryStreamInfo::new(0, StreamType::H264), true)
//!     .unwrap();
//!
//! let written = muxer
//!     .write_payload(pid, None, PESHeader::new(0xE0).with_pts(90_000), &[0u8; 10])
//!     .unwrap();
//! assert_eq!(written % 188, 0);
//! ```

/// Per-PID elementary stream runtime state.
pub mod context;

/// Bounded wrapping counter for continuity counters and PSI version numbers.
pub mod counter;

/// The muxer facade.
pub mod muxer;

/// Splits one PES unit across as many TS packets as needed.
pub mod packetizer;

/// PES header construction and the bounded PES data writer.
pub mod pes;

/// PAT/PMT data model, section assembly, and cached table bytes.
pub mod psi;

/// Forces PAT/PMT (re)transmission on a schedule or on request.
pub mod scheduler;

/// Core TS wire constants, the packet header, and the adaptation field.
pub mod types;

pub use muxer::Muxer;
pub use pes::PESHeader;
pub use psi::{PmtData, ProgramMap, TableCache};
pub use scheduler::RetransmitScheduler;
pub use types::{
    AdaptationField, Descriptor, ElementaryStreamInfo, StreamType, TSHeader, PID_AUTO_START,
    PID_PAT, PID_PMT, PROGRAM_NUMBER, TS_HEADER_SIZE, TS_PACKET_SIZE,
};
