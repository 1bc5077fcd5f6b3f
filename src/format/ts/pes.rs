//! PES (Packetized Elementary Stream) header construction and the bounded
//! PES data writer the packetizer drives across TS packets.

use crate::error::Result;
use bytes::{BufMut, BytesMut};

/// Fixed PES header prefix: 3-byte start code, 1-byte stream ID, 2-byte
/// packet length, 2 flag bytes, 1-byte header_data_length. Does not include
/// the variable PTS/DTS fields — see [`calc_pes_optional_header_length`].
pub const PES_HEADER_LENGTH: usize = 9;

/// Length in bytes the optional PTS/DTS fields contribute to the PES
/// header: 5 bytes each, present independently.
pub fn calc_pes_optional_header_length(has_pts: bool, has_dts: bool) -> usize {
    (if has_pts { 5 } else { 0 }) + (if has_dts { 5 } else { 0 })
}

/// A PES packet header. `stream_id == 0` tells the packetizer to infer the
/// stream ID from the elementary stream's [`crate::format::ts::types::StreamType`].
#[derive(Debug, Clone, Default)]
pub struct PESHeader {
    /// PES stream ID (`0` = infer from stream type).
    pub stream_id: u8,
    /// Presentation timestamp, 33-bit (90kHz) ticks.
    pub pts: Option<u64>,
    /// Decode timestamp, 33-bit (90kHz) ticks. Only meaningful alongside a
    /// PTS.
    pub dts: Option<u64>,
    /// Data-alignment indicator.
    pub data_alignment: bool,
    /// Copyright flag.
    pub copyright: bool,
    /// Original-or-copy flag.
    pub original: bool,
}

impl PESHeader {
    /// Creates a header with the given stream ID and no timestamps.
    pub fn new(stream_id: u8) -> Self {
        Self {
            stream_id,
            ..Default::default()
        }
    }

    /// Attaches a PTS.
    pub fn with_pts(mut self, pts: u64) -> Self {
        self.pts = Some(pts & 0x1_FFFF_FFFF);
        self
    }

    /// Attaches a DTS (only meaningful together with a PTS).
    pub fn with_dts(mut self, dts: u64) -> Self {
        self.dts = Some(dts & 0x1_FFFF_FFFF);
        self
    }

    /// This header's optional-field length, per
    /// [`calc_pes_optional_header_length`].
    pub fn optional_header_length(&self) -> usize {
        calc_pes_optional_header_length(self.pts.is_some(), self.dts.is_some())
    }

    /// Total length this header occupies on the wire.
    pub fn total_length(&self) -> usize {
        PES_HEADER_LENGTH + self.optional_header_length()
    }

    fn write_to(&self, buf: &mut BytesMut, packet_length: u16) {
        buf.put_u8(0x00);
        buf.put_u8(0x00);
        buf.put_u8(0x01);
        buf.put_u8(self.stream_id);
        buf.put_u16(packet_length);

        let mut flags1 = 0x80u8; // '10' marker bits
        if self.data_alignment {
            flags1 |= 0x04;
        }
        if self.copyright {
            flags1 |= 0x02;
        }
        if self.original {
            flags1 |= 0x01;
        }
        buf.put_u8(flags1);

        let mut flags2 = 0u8;
        if self.pts.is_some() {
            flags2 |= 0x80;
        }
        if self.dts.is_some() {
            flags2 |= 0x40;
        }
        buf.put_u8(flags2);

        buf.put_u8(self.optional_header_length() as u8);

        if let Some(pts) = self.pts {
            let marker = if self.dts.is_some() { 0x30 } else { 0x20 };
            write_timestamp(buf, marker, pts);
        }
        if let Some(dts) = self.dts {
            write_timestamp(buf, 0x10, dts);
        }
    }
}

fn write_timestamp(buf: &mut BytesMut, marker: u8, ts: u64) {
    let ts = ts & 0x1_FFFF_FFFF;
    buf.put_u8(marker | (((ts >> 29) & 0x0E) as u8) | 0x01);
    buf.put_u16((((ts >> 14) & 0xFFFE) | 0x01) as u16);
    buf.put_u16((((ts << 1) & 0xFFFE) | 0x01) as u16);
}

/// Serializes up to `max_bytes` of PES data into `buf`.
///
/// On `is_start`, writes the PES header first (its `PES_packet_length`
/// field set to `total_payload_len + optional_header_length`, or `0` if
/// that sum overflows 16 bits — a common convention for streams whose
/// total length is not known up front), then as much of `payload` as fits
/// in the remaining budget. When `is_start` is false, only payload bytes
/// are written (no header).
///
/// Returns `(total_bytes_emitted, payload_bytes_consumed)`. Bounded by
/// `max_bytes`; never writes more than that in total.
pub fn write_pes_data(
    buf: &mut BytesMut,
    header: &PESHeader,
    payload: &[u8],
    is_start: bool,
    max_bytes: usize,
    total_payload_len: usize,
) -> Result<(usize, usize)> {
    if is_start {
        let header_len = header.total_length();
        if max_bytes < header_len {
            return Err(crate::error::TsMuxError::Serialize(format!(
                "max_bytes {} too small for PES header of {} bytes",
                max_bytes, header_len
            )));
        }
        let opt_len = header.optional_header_length();
        let full_len = opt_len + total_payload_len;
        let packet_length = if full_len <= 0xFFFF { full_len as u16 } else { 0 };
        header.write_to(buf, packet_length);

        let available = max_bytes - header_len;
        let consumed = payload.len().min(available);
        buf.extend_from_slice(&payload[..consumed]);
        Ok((header_len + consumed, consumed))
    } else {
        let consumed = payload.len().min(max_bytes);
        buf.extend_from_slice(&payload[..consumed]);
        Ok((consumed, consumed))
    }
}
