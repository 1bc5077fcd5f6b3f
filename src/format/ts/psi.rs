//! PAT/PMT data, section assembly, and the cached-table-bytes discipline.

use super::counter::WrappingCounter;
use super::types::{
    ElementaryStreamInfo, TSHeader, Descriptor, PID_PAT, PID_PMT, PROGRAM_NUMBER, PSI_STUFFING_BYTE,
    TABLE_ID_PAT, TABLE_ID_PMT, TS_PACKET_SIZE,
};
use crate::error::{Result, TsMuxError};
use crate::utils::crc::Crc32Mpeg2;
use bytes::{BufMut, BytesMut};

/// Fixed bytes of overhead a PSI section carries outside its payload:
/// the 2-byte table-ID-extension field, the 1-byte version/current-next
/// byte, the 2-byte section-number/last-section-number pair, and the
/// trailing 4-byte CRC.
const SECTION_FIXED_OVERHEAD: usize = 2 + 1 + 1 + 1 + 4;

/// A single `(program_number, pmt_pid)` mapping as projected from the
/// program map into a PAT.
#[derive(Debug, Clone, Copy)]
pub struct PatEntry {
    /// Program number.
    pub program_number: u16,
    /// PID carrying that program's PMT.
    pub pmt_pid: u16,
}

/// The Program Association Table's content: a transport stream ID plus the
/// list of program-number/PMT-PID mappings.
#[derive(Debug, Clone)]
pub struct PatData {
    /// Transport stream ID carried in the PAT's table-ID-extension field.
    pub transport_stream_id: u16,
    /// One entry per program (exactly one in this single-program muxer).
    pub entries: Vec<PatEntry>,
}

impl PatData {
    /// Number of content bytes this PAT contributes to the section, i.e.
    /// excluding [`SECTION_FIXED_OVERHEAD`].
    pub fn body_len(&self) -> usize {
        self.entries.len() * 4
    }

    /// Serializes each `(program_number, pmt_pid)` entry.
    pub fn write_to(&self, buf: &mut BytesMut) {
        for entry in &self.entries {
            buf.put_u16(entry.program_number);
            buf.put_u16(entry.pmt_pid & 0x1FFF | 0xE000);
        }
    }
}

/// The program map: which PID carries the PMT for which program number.
///
/// This muxer supports exactly one program, so in practice this always
/// contains the single entry `(PID_PMT, PROGRAM_NUMBER)`; the type still
/// models it as a mapping (rather than a constant) so the PAT-building code
/// reads the same way a multi-program implementation's would.
#[derive(Debug, Clone)]
pub struct ProgramMap {
    entries: Vec<(u16, u16)>, // (pmt_pid, program_number)
}

impl ProgramMap {
    /// Creates the single-program default mapping `0x1000 -> 1`.
    pub fn new() -> Self {
        Self {
            entries: vec![(PID_PMT, PROGRAM_NUMBER)],
        }
    }

    /// Projects this program map into [`PatData`].
    pub fn to_pat_data(&self, transport_stream_id: u16) -> PatData {
        PatData {
            transport_stream_id,
            entries: self
                .entries
                .iter()
                .map(|&(pmt_pid, program_number)| PatEntry {
                    program_number,
                    pmt_pid,
                })
                .collect(),
        }
    }
}

impl Default for ProgramMap {
    fn default() -> Self {
        Self::new()
    }
}

/// The Program Map Table's content: program number, PCR PID, program-level
/// descriptors, and the ordered list of elementary streams.
#[derive(Debug, Clone)]
pub struct PmtData {
    /// Program number (default 1).
    pub program_number: u16,
    /// PID carrying the PCR for this program. `0` means "unset" and is
    /// rejected at table-generation time.
    pub pcr_pid: u16,
    /// Descriptors describing the program as a whole.
    pub program_descriptors: Vec<Descriptor>,
    /// Elementary streams, in insertion order (order is observable on the
    /// wire).
    pub elementary_streams: Vec<ElementaryStreamInfo>,
}

impl PmtData {
    /// Creates an empty PMT for program 1 with no PCR PID designated.
    pub fn new() -> Self {
        Self {
            program_number: PROGRAM_NUMBER,
            pcr_pid: 0,
            program_descriptors: Vec::new(),
            elementary_streams: Vec::new(),
        }
    }

    /// Number of content bytes this PMT contributes to the section,
    /// excluding [`SECTION_FIXED_OVERHEAD`]: PCR PID + program info length
    /// (4 bytes), program descriptors, and each ES's stream_type/PID/ES-info
    /// length plus its descriptors.
    pub fn body_len(&self) -> usize {
        let mut n = 4; // PCR PID (2) + program_info_length (2)
        for desc in &self.program_descriptors {
            n += desc.encoded_len();
        }
        for es in &self.elementary_streams {
            n += 5; // stream_type (1) + elementary_PID (2) + ES_info_length (2)
            for desc in &es.descriptors {
                n += desc.encoded_len();
            }
        }
        n
    }

    /// Serializes the PMT body (everything [`Self::body_len`] accounts for).
    pub fn write_to(&self, buf: &mut BytesMut) {
        buf.put_u16(self.pcr_pid & 0x1FFF | 0xE000);

        let prog_desc_len: usize = self.program_descriptors.iter().map(Descriptor::encoded_len).sum();
        buf.put_u16((prog_desc_len as u16) & 0x0FFF | 0xF000);
        for desc in &self.program_descriptors {
            desc.write_to(buf);
        }

        for es in &self.elementary_streams {
            buf.put_u8(es.stream_type.stream_type_value());
            buf.put_u16(es.elementary_pid & 0x1FFF | 0xE000);

            let es_desc_len: usize = es.descriptors.iter().map(Descriptor::encoded_len).sum();
            buf.put_u16((es_desc_len as u16) & 0x0FFF | 0xF000);
            for desc in &es.descriptors {
                desc.write_to(buf);
            }
        }
    }

    /// Validates that `pcr_pid` names some registered elementary stream, per
    /// spec §4.4's `ErrPCRPIDInvalid` check. Runs on every regeneration.
    pub fn validate_pcr_pid(&self) -> Result<()> {
        if self.pcr_pid == 0
            || !self
                .elementary_streams
                .iter()
                .any(|es| es.elementary_pid == self.pcr_pid)
        {
            return Err(TsMuxError::PcrPidInvalid(self.pcr_pid));
        }
        Ok(())
    }
}

impl Default for PmtData {
    fn default() -> Self {
        Self::new()
    }
}

/// The two cached, fully-serialized PSI table packets. A buffer is valid for
/// reuse only when its length equals `packet_size`; any other length
/// (including empty) forces regeneration on next use.
#[derive(Debug, Clone, Default)]
pub struct TableCache {
    pat: Vec<u8>,
    pmt: Vec<u8>,
}

impl TableCache {
    /// Creates an empty cache (both buffers invalid, forcing regeneration on
    /// first use).
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the cached PAT bytes are valid for the given packet size.
    pub fn pat_valid(&self, packet_size: usize) -> bool {
        self.pat.len() == packet_size
    }

    /// Whether the cached PMT bytes are valid for the given packet size.
    pub fn pmt_valid(&self, packet_size: usize) -> bool {
        self.pmt.len() == packet_size
    }

    /// Invalidates the PMT cache (called on any PMT mutation: add/remove
    /// elementary stream, PCR PID change).
    pub fn invalidate_pmt(&mut self) {
        self.pmt.clear();
    }

    /// Invalidates the PAT cache (called on any program map mutation).
    pub fn invalidate_pat(&mut self) {
        self.pat.clear();
    }

    /// Replaces the cached PAT bytes with a freshly built packet.
    pub fn set_pat(&mut self, bytes: Vec<u8>) {
        self.pat = bytes;
    }

    /// Replaces the cached PMT bytes with a freshly built packet.
    pub fn set_pmt(&mut self, bytes: Vec<u8>) {
        self.pmt = bytes;
    }

    /// The cached PAT bytes.
    pub fn pat_bytes(&self) -> &[u8] {
        &self.pat
    }

    /// The cached PMT bytes.
    pub fn pmt_bytes(&self) -> &[u8] {
        &self.pmt
    }
}

/// Builds a section byte sequence: `table_id`, `section_length`, the
/// syntax-section fields (table-ID extension, version, current/next), the
/// caller-supplied body, and the trailing CRC32-MPEG2.
fn build_section(
    table_id: u8,
    table_id_extension: u16,
    version: u8,
    body: &[u8],
) -> BytesMut {
    let section_length = SECTION_FIXED_OVERHEAD + body.len();

    let mut section = BytesMut::with_capacity(3 + section_length);
    section.put_u8(table_id);
    // section_syntax_indicator=1, private_bit=0, reserved='11'
    section.put_u16((0xB000 | (section_length as u16 & 0x0FFF)) as u16);
    section.put_u16(table_id_extension);
    // reserved='11', version_number (5 bits), current_next_indicator=1
    section.put_u8(0xC0 | ((version & 0x1F) << 1) | 0x01);
    section.put_u8(0); // section_number
    section.put_u8(0); // last_section_number
    section.extend_from_slice(body);

    let crc = Crc32Mpeg2::new().calculate(&section[..]);
    section.put_u32(crc);

    section
}

/// Wraps an already-built PSI section (pointer field + section bytes) into
/// one TS packet, stuffed with `0xFF` to exactly `packet_size` bytes.
///
/// Strict demuxers expect the continuity counter to increment on every PSI
/// packet that carries a payload, same as an elementary stream's — see
/// `DESIGN.md`'s resolution of spec's PSI-continuity-counter open question.
/// `cc` is supplied by the caller (the muxer keeps one wrapping counter per
/// PSI PID) rather than always written as `0`.
fn wrap_as_packet(pid: u16, cc: u8, section: &[u8], packet_size: usize) -> Result<Vec<u8>> {
    let header = TSHeader {
        pid,
        payload_unit_start: true,
        has_payload: true,
        continuity_counter: cc,
        ..Default::default()
    };

    let mut buf = BytesMut::with_capacity(packet_size);
    header.write_to(&mut buf)?;
    buf.put_u8(0x00); // pointer field: section starts immediately
    buf.extend_from_slice(section);

    if buf.len() > packet_size {
        return Err(TsMuxError::Serialize(format!(
            "PSI section of {} bytes does not fit in one {}-byte TS packet",
            buf.len(),
            packet_size
        )));
    }
    while buf.len() < packet_size {
        buf.put_u8(PSI_STUFFING_BYTE);
    }

    Ok(buf.to_vec())
}

/// Builds one complete PAT TS packet from the program map.
pub fn build_pat(
    program_map: &ProgramMap,
    transport_stream_id: u16,
    version: &mut WrappingCounter,
    cc: &mut WrappingCounter,
    packet_size: usize,
) -> Result<Vec<u8>> {
    let pat = program_map.to_pat_data(transport_stream_id);
    let mut body = BytesMut::with_capacity(pat.body_len());
    pat.write_to(&mut body);

    let section = build_section(TABLE_ID_PAT, transport_stream_id, version.get(), &body);
    wrap_as_packet(PID_PAT, cc.get(), &section, packet_size)
}

/// Builds one complete PMT TS packet, validating the PCR PID first.
pub fn build_pmt(
    pmt: &PmtData,
    version: &mut WrappingCounter,
    cc: &mut WrappingCounter,
    packet_size: usize,
) -> Result<Vec<u8>> {
    pmt.validate_pcr_pid()?;

    let mut body = BytesMut::with_capacity(pmt.body_len());
    pmt.write_to(&mut body);

    let section = build_section(TABLE_ID_PMT, pmt.program_number, version.get(), &body);
    wrap_as_packet(PID_PMT, cc.get(), &section, packet_size)
}
