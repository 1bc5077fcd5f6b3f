//! Splits one PES unit across as many fixed-size TS packets as it takes.
//!
//! This is the only module that actually drives [`write_packet`] for
//! elementary stream payloads; PSI packets are built separately by
//! [`super::psi`]. Table (re)transmission and the PCR-linked force-tables
//! decision live in [`super::muxer`], which calls here once per
//! `write_payload` after that decision is made.

use super::context::EsContext;
use super::pes::{write_pes_data, PESHeader};
use super::types::{write_packet, AdaptationField, TSHeader, TS_HEADER_SIZE};
use crate::error::Result;
use bytes::BytesMut;
use std::io::Write;

/// Grows `af`'s stuffing so that the whole field (including its own length
/// byte) occupies exactly `target` bytes. Any stuffing already present is
/// discarded and recomputed from scratch.
fn size_adaptation_field_to(af: &mut AdaptationField, target: usize) {
    af.stuffing_length = 0;
    let base = 1 + af.calc_length();
    af.stuffing_length = target.saturating_sub(base);
}

/// Writes one PES unit (`payload`, described by `pes_header`) to `sink` as a
/// sequence of `packet_size`-byte TS packets on `pid`, advancing `context`'s
/// continuity counter once per packet.
///
/// `caller_af` is attached to the first packet only, per the usual
/// random-access / PCR convention. If the caller's adaptation field leaves
/// too little room for even the bare PES header, the first packet is
/// emitted with no payload at all — just the header and an adaptation
/// field stuffed out to fill the packet — and the PES header moves to the
/// next (unencumbered) packet. See `SPEC_FULL.md` §4.5.
///
/// Returns the total number of bytes written to `sink`.
#[allow(clippy::too_many_arguments)]
pub fn write_payload_packets<W: Write>(
    sink: &mut W,
    scratch: &mut BytesMut,
    pid: u16,
    caller_af: Option<AdaptationField>,
    pes_header: PESHeader,
    payload: &[u8],
    context: &mut EsContext,
    packet_size: usize,
) -> Result<usize> {
    let mut bytes_written = 0usize;
    let mut payload_bytes_written = 0usize;
    let mut payload_start = true;
    let mut write_af = caller_af.is_some();

    loop {
        let mut header = TSHeader {
            pid,
            has_payload: false,
            ..Default::default()
        };

        let mut packet_af = if write_af {
            caller_af.clone()
        } else {
            None
        };
        let af_overhead = packet_af.as_ref().map(|af| 1 + af.calc_length()).unwrap_or(0);
        let bytes_available = packet_size - TS_HEADER_SIZE - af_overhead;

        if payload_start {
            let pes_header_len = pes_header.total_length();
            if bytes_available < pes_header_len {
                // Not enough room left for even the bare PES header: turn
                // this packet into pure filler and defer the PES header to
                // the next one, which will carry no caller adaptation
                // field. No payload means the continuity counter must not
                // advance for this packet.
                header.continuity_counter = context.peek_continuity_counter();
                let mut af = packet_af.take().unwrap_or_default();
                size_adaptation_field_to(&mut af, packet_size - TS_HEADER_SIZE);
                header.has_adaptation_field = true;

                scratch.clear();
                write_packet(scratch, &header, Some(&af), &[], packet_size)?;
                sink.write_all(scratch)
                    .map_err(|err| crate::error::TsMuxError::io(bytes_written, err))?;
                bytes_written += packet_size;

                write_af = false;
                continue;
            }
            header.payload_unit_start = true;
        }
        header.has_payload = true;
        header.continuity_counter = context.next_continuity_counter();

        let mut pes_scratch = BytesMut::with_capacity(bytes_available);
        let (ntot, nconsumed) = write_pes_data(
            &mut pes_scratch,
            &pes_header,
            &payload[payload_bytes_written..],
            payload_start,
            bytes_available,
            payload.len(),
        )?;

        let leftover = bytes_available - ntot;
        let final_af = if leftover > 0 {
            let mut af = packet_af.take().unwrap_or_default();
            size_adaptation_field_to(&mut af, af_overhead + leftover);
            Some(af)
        } else {
            packet_af
        };
        header.has_adaptation_field = final_af.is_some();

        scratch.clear();
        write_packet(scratch, &header, final_af.as_ref(), &pes_scratch, packet_size)?;
        sink.write_all(scratch)
            .map_err(|err| crate::error::TsMuxError::io(bytes_written, err))?;
        bytes_written += packet_size;

        payload_bytes_written += nconsumed;
        payload_start = false;
        write_af = false;

        if payload_bytes_written >= payload.len() {
            break;
        }
    }

    Ok(bytes_written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::ts::context::EsContext;
    use crate::format::ts::types::TS_PACKET_SIZE;
    use pretty_assertions::assert_eq;

    fn packets_of(buf: &[u8]) -> Vec<&[u8]> {
        buf.chunks(TS_PACKET_SIZE).collect()
    }

    #[test]
    fn single_packet_payload_round_trips() {
        let mut ctx = EsContext::new();
        let mut scratch = BytesMut::new();
        let mut out = Vec::new();
        let header = PESHeader::new(0xE0).with_pts(90_000);
        let payload = vec![0xAB; 50];

        let written = write_payload_packets(
            &mut out,
            &mut scratch,
            0x0100,
            None,
            header,
            &payload,
            &mut ctx,
            TS_PACKET_SIZE,
        )
        .unwrap();

        assert_eq!(written, TS_PACKET_SIZE);
        assert_eq!(out.len(), TS_PACKET_SIZE);
        assert_eq!(out[0], 0x47);
        // has_payload | has_adaptation_field(0) bit cleared, PUSI set.
        assert_eq!(out[1] & 0x40, 0x40);
    }

    #[test]
    fn large_payload_splits_across_multiple_packets() {
        let mut ctx = EsContext::new();
        let mut scratch = BytesMut::new();
        let mut out = Vec::new();
        let header = PESHeader::new(0xE0);
        let payload = vec![0xCD; 500];

        let written = write_payload_packets(
            &mut out,
            &mut scratch,
            0x0100,
            None,
            header,
            &payload,
            &mut ctx,
            TS_PACKET_SIZE,
        )
        .unwrap();

        assert_eq!(written % TS_PACKET_SIZE, 0);
        let packets = packets_of(&out);
        assert!(packets.len() >= 3);
        // First packet carries PUSI, later ones don't.
        assert_eq!(packets[0][1] & 0x40, 0x40);
        assert_eq!(packets[1][1] & 0x40, 0x00);
    }

    #[test]
    fn final_packet_stuffs_with_adaptation_field_not_trailing_bytes() {
        let mut ctx = EsContext::new();
        let mut scratch = BytesMut::new();
        let mut out = Vec::new();
        let header = PESHeader::new(0xE0);
        // Small payload: header(9) + 5 bytes leaves slack in a 188-byte packet.
        let payload = vec![0xEE; 5];

        write_payload_packets(
            &mut out,
            &mut scratch,
            0x0100,
            None,
            header,
            &payload,
            &mut ctx,
            TS_PACKET_SIZE,
        )
        .unwrap();

        assert_eq!(out.len(), TS_PACKET_SIZE);
        // has_adaptation_field bit must be set to absorb the slack.
        assert_eq!(out[3] & 0x20, 0x20);
    }

    #[test]
    fn oversized_caller_adaptation_field_emits_stuffing_only_packet_first() {
        let mut ctx = EsContext::new();
        let mut scratch = BytesMut::new();
        let mut out = Vec::new();
        let header = PESHeader::new(0xE0).with_pts(90_000).with_dts(90_000);
        let payload = vec![0x11; 10];
        let af = AdaptationField {
            random_access_indicator: true,
            stuffing_length: TS_PACKET_SIZE - TS_HEADER_SIZE - 10,
            ..Default::default()
        };

        write_payload_packets(
            &mut out,
            &mut scratch,
            0x0100,
            Some(af),
            header,
            &payload,
            &mut ctx,
            TS_PACKET_SIZE,
        )
        .unwrap();

        let packets = packets_of(&out);
        assert_eq!(packets.len(), 2);
        // First packet: AF present, no payload, no PUSI.
        assert_eq!(packets[0][3] & 0x20, 0x20); // has_adaptation_field
        assert_eq!(packets[0][3] & 0x10, 0x00); // has_payload clear
        assert_eq!(packets[0][1] & 0x40, 0x00); // PUSI clear
        // Second packet: carries the deferred PES header, no caller AF.
        assert_eq!(packets[1][1] & 0x40, 0x40); // PUSI set
        // The stuffing-only packet must not consume a continuity counter
        // value: the first payload-carrying packet still gets CC 0.
        assert_eq!(packets[0][3] & 0x0F, 0);
        assert_eq!(packets[1][3] & 0x0F, 0);
    }
}
