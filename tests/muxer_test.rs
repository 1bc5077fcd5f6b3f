//! End-to-end scenarios exercising the full `Muxer` facade against a
//! `Vec<u8>` sink.

use tsmux::error::TsMuxError;
use tsmux::format::ts::{
    AdaptationField, ElementaryStreamInfo, Muxer, PESHeader, StreamType, TS_PACKET_SIZE,
};

fn packets(buf: &[u8]) -> Vec<&[u8]> {
    assert_eq!(buf.len() % TS_PACKET_SIZE, 0, "output not packet-aligned");
    buf.chunks(TS_PACKET_SIZE).collect()
}

fn pid_of(packet: &[u8]) -> u16 {
    (((packet[1] & 0x1F) as u16) << 8) | packet[2] as u16
}

/// Scenario A: a single tiny PES on the PCR PID with the random-access
/// indicator set emits PAT, PMT, then exactly one payload packet.
#[test]
fn scenario_a_single_tiny_pes() {
    let mut muxer = Muxer::new(Vec::new());
    let pid = muxer
        .add_elementary_stream(ElementaryStreamInfo::new(0x0100, StreamType::H264), true)
        .unwrap();

    let af = AdaptationField {
        random_access_indicator: true,
        ..Default::default()
    };
    let written = muxer
        .write_payload(
            pid,
            Some(af),
            PESHeader::new(0).with_pts(90_000),
            &[0x00; 10],
        )
        .unwrap();

    assert_eq!(written, 3 * TS_PACKET_SIZE);
    let out = muxer.into_inner().unwrap();
    let pkts = packets(&out);
    assert_eq!(pkts.len(), 3);
    assert_eq!(pid_of(pkts[0]), 0x0000); // PAT
    assert_eq!(pid_of(pkts[1]), 0x1000); // PMT
    assert_eq!(pid_of(pkts[2]), 0x0100); // payload
    assert_eq!(pkts[2][3] & 0x20, 0x20); // AF present (random access)
    assert_eq!(pkts[2][1] & 0x40, 0x40); // PUSI set
}

/// Scenario B: a PES larger than one packet splits across multiple
/// payload packets; the first carries PUSI, continuity counters run
/// 0, 1, 2 in order.
#[test]
fn scenario_b_pes_larger_than_one_packet() {
    let mut muxer = Muxer::new(Vec::new());
    let pid = muxer
        .add_elementary_stream(ElementaryStreamInfo::new(0x0100, StreamType::H264), true)
        .unwrap();

    let payload = vec![0xAB; 400];
    muxer
        .write_payload(pid, None, PESHeader::new(0).with_pts(90_000), &payload)
        .unwrap();

    let out = muxer.into_inner().unwrap();
    let pkts = packets(&out);
    let payload_packets: Vec<&&[u8]> = pkts.iter().filter(|p| pid_of(p) == 0x0100).collect();

    assert_eq!(payload_packets.len(), 3);
    assert_eq!(payload_packets[0][1] & 0x40, 0x40); // first has PUSI
    assert_eq!(payload_packets[1][1] & 0x40, 0x00);
    assert_eq!(payload_packets[2][1] & 0x40, 0x00);

    let ccs: Vec<u8> = payload_packets.iter().map(|p| p[3] & 0x0F).collect();
    assert_eq!(ccs, vec![0, 1, 2]);
}

/// Scenario C: with the default retransmit period (40), 81 payload calls
/// with no random-access flag force table (re)transmission on calls 1,
/// 41, and 81 only.
#[test]
fn scenario_c_retransmit_cadence() {
    let mut muxer = Muxer::new(Vec::new());
    let pid = muxer
        .add_elementary_stream(ElementaryStreamInfo::new(0x0100, StreamType::H264), true)
        .unwrap();

    let mut table_emissions = 0;
    for _ in 0..81 {
        let written = muxer
            .write_payload(pid, None, PESHeader::new(0xE0), &[0x00; 4])
            .unwrap();
        if written > TS_PACKET_SIZE {
            table_emissions += 1;
        }
    }

    assert_eq!(table_emissions, 3);
}

/// Scenario D: re-adding an already-registered PID fails, and the PMT
/// cache remains valid (the following `write_payload` does not re-emit
/// tables for the unrelated success path).
#[test]
fn scenario_d_duplicate_pid_rejection() {
    let mut muxer = Muxer::new(Vec::new());
    muxer
        .add_elementary_stream(ElementaryStreamInfo::new(0x0200, StreamType::H264), true)
        .unwrap();

    let err = muxer
        .add_elementary_stream(ElementaryStreamInfo::new(0x0200, StreamType::Aac), false)
        .unwrap_err();
    assert!(matches!(err, TsMuxError::PidAlreadyExists(0x0200)));
}

/// Scenario E: a PCR PID that names no registered elementary stream fails
/// table generation with `PcrPidInvalid`.
#[test]
fn scenario_e_pcr_pid_must_exist_in_pmt() {
    let mut muxer = Muxer::new(Vec::new());
    let pid = muxer
        .add_elementary_stream(ElementaryStreamInfo::new(0x0100, StreamType::H264), false)
        .unwrap();

    // `add_elementary_stream` never set a PCR PID; write_payload's forced
    // first-call table generation will fail validation because pcr_pid is
    // still 0 (unset).
    let err = muxer
        .write_payload(pid, None, PESHeader::new(0xE0), &[0x00])
        .unwrap_err();
    assert!(matches!(err, TsMuxError::PcrPidInvalid(0)));
}

/// Scenario F: an adaptation field too large to leave room for the PES
/// header forces one all-stuffing packet before the packet that actually
/// carries the PES header.
#[test]
fn scenario_f_adaptation_field_too_large_for_pes_header() {
    let mut muxer = Muxer::new(Vec::new());
    let pid = muxer
        .add_elementary_stream(ElementaryStreamInfo::new(0x0100, StreamType::H264), true)
        .unwrap();

    let af = AdaptationField {
        random_access_indicator: true,
        stuffing_length: TS_PACKET_SIZE - 4 - 10,
        ..Default::default()
    };
    muxer
        .write_payload(
            pid,
            Some(af),
            PESHeader::new(0xE0).with_pts(90_000).with_dts(90_000),
            &[0x11; 10],
        )
        .unwrap();

    let out = muxer.into_inner().unwrap();
    let pkts = packets(&out);
    let payload_packets: Vec<&&[u8]> = pkts.iter().filter(|p| pid_of(p) == 0x0100).collect();

    assert_eq!(payload_packets.len(), 2);
    assert_eq!(payload_packets[0][3] & 0x20, 0x20); // AF present
    assert_eq!(payload_packets[0][3] & 0x10, 0x00); // no payload
    assert_eq!(payload_packets[0][1] & 0x40, 0x00); // no PUSI
    assert_eq!(payload_packets[1][1] & 0x40, 0x40); // PUSI on the deferred header
}
