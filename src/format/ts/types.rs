//! Core TS wire constants and the fixed-size packet header/adaptation field.

use crate::error::Result;
use bytes::{BufMut, BytesMut};

/// Size of a Transport Stream packet in bytes. Fixed for the lifetime of a
/// [`crate::format::ts::Muxer`] (192-byte M2TS packets are out of scope).
pub const TS_PACKET_SIZE: usize = 188;
/// Size of the fixed TS packet header, in bytes.
pub const TS_HEADER_SIZE: usize = 4;

/// PID carrying the Program Association Table.
pub const PID_PAT: u16 = 0x0000;
/// PID carrying the single program's Program Map Table.
pub const PID_PMT: u16 = 0x1000;
/// First PID handed out by the muxer's auto-assignment allocator.
pub const PID_AUTO_START: u16 = 0x0100;
/// The only program number this single-program muxer supports.
pub const PROGRAM_NUMBER: u16 = 1;

/// Table ID for the Program Association Table.
pub const TABLE_ID_PAT: u8 = 0x00;
/// Table ID for the Program Map Table.
pub const TABLE_ID_PMT: u8 = 0x02;

/// PSI stuffing byte used to pad PAT/PMT packets out to [`TS_PACKET_SIZE`].
pub const PSI_STUFFING_BYTE: u8 = 0xFF;

/// The closed set of elementary stream types this muxer can describe in a
/// PMT. Values follow ISO/IEC 13818-1 Table 2-34 where a standard stream_type
/// exists; the handful of non-standard (but widely deployed) assignments
/// follow common muxer practice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamType {
    /// MPEG-1 video
    Mpeg1Video,
    /// MPEG-2 video
    Mpeg2Video,
    /// MPEG-4 (part 2) video
    Mpeg4Video,
    /// H.264 / AVC video
    H264,
    /// H.265 / HEVC video
    H265,
    /// Chinese AVS (CAVS) video
    Cavs,
    /// SMPTE VC-1 video
    Vc1,
    /// Dirac video
    Dirac,
    /// MPEG-1/2 audio
    Mpeg2Audio,
    /// AAC audio, ADTS framing
    Aac,
    /// AAC audio, LATM/LOAS framing
    AacLatm,
    /// Dolby Digital (AC-3) audio
    Ac3,
    /// Dolby Digital Plus (E-AC-3) audio
    Eac3,
    /// Private (application-defined) PSI section stream
    PrivateSection,
    /// Private (application-defined) data stream
    PrivateData,
    /// Metadata stream (ISO/IEC 15938-1 PES metadata)
    Metadata,
}

impl StreamType {
    /// The `stream_type` byte written into the PMT's elementary stream loop.
    pub fn stream_type_value(self) -> u8 {
        match self {
            StreamType::Mpeg1Video => 0x01,
            StreamType::Mpeg2Video => 0x02,
            StreamType::Mpeg4Video => 0x10,
            StreamType::H264 => 0x1B,
            StreamType::H265 => 0x24,
            StreamType::Cavs => 0x42,
            StreamType::Vc1 => 0xEA,
            StreamType::Dirac => 0xD1,
            StreamType::Mpeg2Audio => 0x03,
            StreamType::Aac => 0x0F,
            StreamType::AacLatm => 0x11,
            StreamType::Ac3 => 0x81,
            StreamType::Eac3 => 0x87,
            StreamType::PrivateSection => 0x05,
            StreamType::PrivateData => 0x06,
            StreamType::Metadata => 0x15,
        }
    }

    /// The PES `stream_id` to use when the caller leaves
    /// [`crate::format::ts::pes::PESHeader::stream_id`] at `0`, per the
    /// stream-type-to-stream-ID mapping.
    pub fn default_pes_stream_id(self) -> u8 {
        match self {
            StreamType::Mpeg1Video
            | StreamType::Mpeg2Video
            | StreamType::Mpeg4Video
            | StreamType::H264
            | StreamType::H265
            | StreamType::Cavs
            | StreamType::Vc1 => 0xE0,
            StreamType::Dirac | StreamType::Ac3 | StreamType::Eac3 => 0xFD,
            StreamType::Mpeg2Audio | StreamType::Aac | StreamType::AacLatm => 0xC0,
            StreamType::PrivateSection | StreamType::PrivateData | StreamType::Metadata => 0xFC,
        }
    }
}

/// A descriptor attached to a program or an elementary stream in the PMT.
///
/// Descriptor *content* (the closed set of descriptor tags and their
/// payload layouts) is an external-collaborator concern this crate does not
/// attempt to enumerate; callers supply raw `tag`/`data` pairs and this
/// crate serializes them opaquely.
#[derive(Debug, Clone)]
pub struct Descriptor {
    /// Descriptor tag.
    pub tag: u8,
    /// Raw descriptor payload.
    pub data: Vec<u8>,
}

impl Descriptor {
    /// Total encoded length of this descriptor: 2-byte tag/length prefix
    /// plus the payload.
    pub fn encoded_len(&self) -> usize {
        2 + self.data.len()
    }

    /// Serializes `tag`, `length`, then the raw payload.
    pub fn write_to(&self, buf: &mut BytesMut) {
        buf.put_u8(self.tag);
        buf.put_u8(self.data.len() as u8);
        buf.put_slice(&self.data);
    }
}

/// An elementary stream entry as it appears in the PMT (the "ES descriptor"
/// of the data model).
#[derive(Debug, Clone)]
pub struct ElementaryStreamInfo {
    /// 13-bit PID carrying this elementary stream's TS packets.
    pub elementary_pid: u16,
    /// The stream's type, from the closed [`StreamType`] set.
    pub stream_type: StreamType,
    /// Descriptors attached to this stream's PMT entry.
    pub descriptors: Vec<Descriptor>,
}

impl ElementaryStreamInfo {
    /// Creates a new ES descriptor with no attached descriptors.
    pub fn new(elementary_pid: u16, stream_type: StreamType) -> Self {
        Self {
            elementary_pid,
            stream_type,
            descriptors: Vec::new(),
        }
    }
}

/// The adaptation field of a TS packet: PCR/OPCR, flags, and/or stuffing.
///
/// The muxer forwards PCR/OPCR values supplied by the caller; it does not
/// generate PCR values itself (PCR clock generation is out of scope).
#[derive(Debug, Clone, Default)]
pub struct AdaptationField {
    /// Discontinuity indicator.
    pub discontinuity: bool,
    /// Random access indicator — marks a point at which decoding may start.
    /// Also the trigger this muxer watches to force immediate PAT/PMT
    /// retransmission when set on the PCR PID.
    pub random_access_indicator: bool,
    /// Elementary stream priority indicator.
    pub es_priority: bool,
    /// Program Clock Reference, if present.
    pub pcr: Option<u64>,
    /// Original Program Clock Reference, if present.
    pub opcr: Option<u64>,
    /// Splice countdown, if a splicing point is present.
    pub splice_countdown: Option<i8>,
    /// Private data bytes, if any.
    pub private_data: Option<Vec<u8>>,
    /// Number of stuffing (`0xFF`) bytes to append after the flags/optional
    /// fields. The packetizer adjusts this to pad a packet out to exactly
    /// [`TS_PACKET_SIZE`].
    pub stuffing_length: usize,
}

impl AdaptationField {
    /// Length of the adaptation field's content, excluding the 1-byte
    /// length field itself (i.e. the value that gets written as
    /// `adaptation_field_length`).
    pub fn calc_length(&self) -> usize {
        let mut n = 1; // flags byte
        if self.pcr.is_some() {
            n += 6;
        }
        if self.opcr.is_some() {
            n += 6;
        }
        if self.splice_countdown.is_some() {
            n += 1;
        }
        if let Some(data) = &self.private_data {
            n += 1 + data.len();
        }
        n += self.stuffing_length;
        n
    }

    /// Serializes the adaptation field, including its leading
    /// `adaptation_field_length` byte.
    pub fn write_to(&self, buf: &mut BytesMut) -> Result<()> {
        let length = self.calc_length();
        buf.put_u8(length as u8);

        let mut flags = 0u8;
        if self.discontinuity {
            flags |= 0x80;
        }
        if self.random_access_indicator {
            flags |= 0x40;
        }
        if self.es_priority {
            flags |= 0x20;
        }
        if self.pcr.is_some() {
            flags |= 0x10;
        }
        if self.opcr.is_some() {
            flags |= 0x08;
        }
        if self.splice_countdown.is_some() {
            flags |= 0x04;
        }
        if self.private_data.is_some() {
            flags |= 0x02;
        }
        buf.put_u8(flags);

        if let Some(pcr) = self.pcr {
            write_pcr_field(buf, pcr);
        }
        if let Some(opcr) = self.opcr {
            write_pcr_field(buf, opcr);
        }
        if let Some(countdown) = self.splice_countdown {
            buf.put_i8(countdown);
        }
        if let Some(data) = &self.private_data {
            buf.put_u8(data.len() as u8);
            buf.put_slice(data);
        }
        for _ in 0..self.stuffing_length {
            buf.put_u8(PSI_STUFFING_BYTE);
        }

        Ok(())
    }
}

fn write_pcr_field(buf: &mut BytesMut, pcr: u64) {
    let base = (pcr >> 15) & 0x1_FFFF_FFFF;
    let ext = pcr & 0x1FF;
    buf.put_u32((base >> 1) as u32);
    let mut b = ((base & 1) << 7) as u8;
    b |= 0x7E; // reserved bits
    b |= ((ext >> 8) & 0x01) as u8;
    buf.put_u8(b);
    buf.put_u8((ext & 0xFF) as u8);
}

/// The fixed 4-byte Transport Stream packet header.
#[derive(Debug, Clone)]
pub struct TSHeader {
    /// Sync byte, always `0x47`.
    pub sync_byte: u8,
    /// Transport error indicator.
    pub transport_error: bool,
    /// Payload unit start indicator — set on the first TS packet of a PES
    /// unit or PSI section.
    pub payload_unit_start: bool,
    /// Transport priority.
    pub transport_priority: bool,
    /// 13-bit packet identifier.
    pub pid: u16,
    /// 2-bit transport scrambling control (this muxer never scrambles).
    pub scrambling_control: u8,
    /// Whether an adaptation field is present.
    pub has_adaptation_field: bool,
    /// Whether a payload is present.
    pub has_payload: bool,
    /// 4-bit continuity counter.
    pub continuity_counter: u8,
}

impl Default for TSHeader {
    fn default() -> Self {
        Self {
            sync_byte: 0x47,
            transport_error: false,
            payload_unit_start: false,
            transport_priority: false,
            pid: 0,
            scrambling_control: 0,
            has_adaptation_field: false,
            has_payload: true,
            continuity_counter: 0,
        }
    }
}

impl TSHeader {
    /// Serializes the 4-byte header.
    pub fn write_to(&self, buf: &mut BytesMut) -> Result<()> {
        buf.put_u8(self.sync_byte);

        let mut b1 = 0u8;
        if self.transport_error {
            b1 |= 0x80;
        }
        if self.payload_unit_start {
            b1 |= 0x40;
        }
        if self.transport_priority {
            b1 |= 0x20;
        }
        b1 |= ((self.pid >> 8) & 0x1F) as u8;
        buf.put_u8(b1);

        buf.put_u8((self.pid & 0xFF) as u8);

        let mut b3 = (self.scrambling_control & 0x03) << 6;
        if self.has_adaptation_field {
            b3 |= 0x20;
        }
        if self.has_payload {
            b3 |= 0x10;
        }
        b3 |= self.continuity_counter & 0x0F;
        buf.put_u8(b3);

        Ok(())
    }
}

/// Serializes one complete TS packet: header, optional adaptation field,
/// then payload, padded with adaptation-field stuffing (never trailing
/// `0xFF`) to exactly [`TS_PACKET_SIZE`] bytes.
///
/// `af` must already be sized (via [`AdaptationField::stuffing_length`]) so
/// that `TS_HEADER_SIZE + af.calc_length() + 1 + payload.len() ==
/// packet_size` when an adaptation field is present, or
/// `TS_HEADER_SIZE + payload.len() == packet_size` otherwise. This function
/// does not itself pad with stuffing bytes after the payload: PES payloads
/// have unspecified trailing content, so any slack must be accounted for in
/// the adaptation field before calling this.
pub fn write_packet(
    buf: &mut BytesMut,
    header: &TSHeader,
    af: Option<&AdaptationField>,
    payload: &[u8],
    packet_size: usize,
) -> Result<usize> {
    let start = buf.len();
    header.write_to(buf)?;
    if let Some(af) = af {
        af.write_to(buf)?;
    }
    buf.put_slice(payload);

    let written = buf.len() - start;
    if written != packet_size {
        return Err(crate::error::TsMuxError::Serialize(format!(
            "packet length {} != packet_size {}",
            written, packet_size
        )));
    }
    Ok(written)
}
