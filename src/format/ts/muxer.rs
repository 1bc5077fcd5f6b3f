//! The muxer facade: elementary stream registration and `write_payload`,
//! tying the packetizer, PSI table builder, and retransmit scheduler
//! together behind a synchronous `std::io::Write` sink.

use super::context::EsContextRegistry;
use super::counter::WrappingCounter;
use super::packetizer::write_payload_packets;
use super::pes::PESHeader;
use super::psi::{build_pat, build_pmt, PmtData, ProgramMap, TableCache};
use super::scheduler::RetransmitScheduler;
use super::types::{AdaptationField, ElementaryStreamInfo, PID_AUTO_START, TS_PACKET_SIZE};
use crate::config::MuxerConfig;
use crate::error::{Result, TsMuxError};
use bytes::BytesMut;
use std::io::{BufWriter, Write};

/// A single-program MPEG-TS multiplexer writing fixed-size packets to `W`.
///
/// `Muxer` owns all mutable muxing state (the PMT, per-PID continuity
/// counters, the cached PAT/PMT bytes, the retransmit schedule) and is not
/// safe to drive from more than one thread at a time; callers that need to
/// share one wrap it in their own synchronization.
pub struct Muxer<W: Write> {
    sink: BufWriter<W>,
    packet_size: usize,
    config: MuxerConfig,
    scheduler: RetransmitScheduler,
    next_auto_pid: u16,
    transport_stream_id: u16,
    program_map: ProgramMap,
    pmt: PmtData,
    contexts: EsContextRegistry,
    cache: TableCache,
    scratch: BytesMut,
    pat_version: WrappingCounter,
    pmt_version: WrappingCounter,
    pat_cc: WrappingCounter,
    pmt_cc: WrappingCounter,
}

impl<W: Write> Muxer<W> {
    /// Creates a muxer with default configuration (`tables_retransmit_period
    /// = 40`).
    pub fn new(sink: W) -> Self {
        Self::with_config(sink, MuxerConfig::default())
    }

    /// Creates a muxer with an explicit [`MuxerConfig`].
    pub fn with_config(sink: W, config: MuxerConfig) -> Self {
        Self {
            sink: BufWriter::new(sink),
            packet_size: TS_PACKET_SIZE,
            scheduler: RetransmitScheduler::new(config.tables_retransmit_period),
            config,
            next_auto_pid: PID_AUTO_START,
            transport_stream_id: 1,
            program_map: ProgramMap::new(),
            pmt: PmtData::new(),
            contexts: EsContextRegistry::new(),
            cache: TableCache::new(),
            scratch: BytesMut::new(),
            pat_version: WrappingCounter::new(0x1F),
            pmt_version: WrappingCounter::new(0x1F),
            pat_cc: WrappingCounter::new(0x0F),
            pmt_cc: WrappingCounter::new(0x0F),
        }
    }

    /// This muxer's configuration.
    pub fn config(&self) -> &MuxerConfig {
        &self.config
    }

    /// Registers an elementary stream. If `es.elementary_pid == 0`, a PID is
    /// assigned from the auto-allocator (starting at `0x0100`, incrementing
    /// by one per call); otherwise the caller's PID is used as-is and
    /// rejected with [`TsMuxError::PidAlreadyExists`] if already registered.
    /// `is_pcr` designates this stream's PID as the program's PCR PID.
    ///
    /// Returns the PID the stream was registered under.
    pub fn add_elementary_stream(
        &mut self,
        mut es: ElementaryStreamInfo,
        is_pcr: bool,
    ) -> Result<u16> {
        if es.elementary_pid == 0 {
            es.elementary_pid = self.next_auto_pid;
            self.next_auto_pid += 1;
        } else if self
            .pmt
            .elementary_streams
            .iter()
            .any(|existing| existing.elementary_pid == es.elementary_pid)
        {
            log::debug!(
                "add_elementary_stream: PID {:#06x} already exists",
                es.elementary_pid
            );
            return Err(TsMuxError::PidAlreadyExists(es.elementary_pid));
        }

        let pid = es.elementary_pid;
        self.pmt.elementary_streams.push(es);
        if is_pcr {
            self.pmt.pcr_pid = pid;
        }
        self.contexts.create(pid);
        self.cache.invalidate_pmt();
        log::debug!("added elementary stream PID {:#06x} (pcr={})", pid, is_pcr);
        Ok(pid)
    }

    /// Removes a previously registered elementary stream.
    pub fn remove_elementary_stream(&mut self, pid: u16) -> Result<()> {
        let index = self
            .pmt
            .elementary_streams
            .iter()
            .position(|es| es.elementary_pid == pid)
            .ok_or(TsMuxError::PidNotFound(pid))?;

        self.pmt.elementary_streams.remove(index);
        self.contexts.remove(pid);
        self.cache.invalidate_pmt();
        log::debug!("removed elementary stream PID {:#06x}", pid);
        Ok(())
    }

    /// Writes one PES unit's worth of `payload` on `pid`, preceded by a PAT
    /// and PMT packet if the retransmit scheduler (or `af`'s random-access
    /// indicator on the PCR PID) calls for it. Returns the total number of
    /// bytes delivered to the sink, including any interleaved tables.
    pub fn write_payload(
        &mut self,
        pid: u16,
        af: Option<AdaptationField>,
        mut pes_header: PESHeader,
        payload: &[u8],
    ) -> Result<usize> {
        if !self.contexts.contains(pid) {
            return Err(TsMuxError::PidNotFound(pid));
        }

        let force_tables = af
            .as_ref()
            .map(|af| af.random_access_indicator)
            .unwrap_or(false)
            && pid == self.pmt.pcr_pid;

        let mut bytes_written = self.write_tables_if_due(force_tables)?;

        if pes_header.stream_id == 0 {
            if let Some(es) = self
                .pmt
                .elementary_streams
                .iter()
                .find(|es| es.elementary_pid == pid)
            {
                pes_header.stream_id = es.stream_type.default_pes_stream_id();
            }
        }

        let context = self
            .contexts
            .get_mut(pid)
            .expect("presence checked above");

        match write_payload_packets(
            &mut self.sink,
            &mut self.scratch,
            pid,
            af,
            pes_header,
            payload,
            context,
            self.packet_size,
        ) {
            Ok(n) => bytes_written += n,
            // The packetizer's own `written` count is relative to this
            // packetizer call only; fold in the table bytes already
            // delivered earlier in this `write_payload` call so the caller
            // sees the true total.
            Err(TsMuxError::Io { written, source }) => {
                return Err(TsMuxError::io(bytes_written + written, source));
            }
            Err(other) => return Err(other),
        }
        self.sink
            .flush()
            .map_err(|err| TsMuxError::io(bytes_written, err))?;

        Ok(bytes_written)
    }

    /// Flushes any buffered bytes to the sink.
    pub fn flush(&mut self) -> Result<()> {
        self.sink.flush().map_err(|err| TsMuxError::io(0, err))?;
        Ok(())
    }

    /// Consumes the muxer, flushing and returning the underlying sink.
    pub fn into_inner(mut self) -> Result<W> {
        self.sink.flush().map_err(|err| TsMuxError::io(0, err))?;
        self.sink
            .into_inner()
            .map_err(|err| TsMuxError::io(0, err.into_error()))
    }

    fn write_tables_if_due(&mut self, force: bool) -> Result<usize> {
        if !self.scheduler.is_due(force) {
            return Ok(0);
        }
        let result = self.write_tables();
        if result.is_ok() {
            self.scheduler.reset();
        }
        result
    }

    fn write_tables(&mut self) -> Result<usize> {
        if !self.cache.pat_valid(self.packet_size) {
            let packet = build_pat(
                &self.program_map,
                self.transport_stream_id,
                &mut self.pat_version,
                &mut self.pat_cc,
                self.packet_size,
            )?;
            self.cache.set_pat(packet);
        }
        if !self.cache.pmt_valid(self.packet_size) {
            match build_pmt(&self.pmt, &mut self.pmt_version, &mut self.pmt_cc, self.packet_size) {
                Ok(packet) => self.cache.set_pmt(packet),
                Err(err) => {
                    log::warn!("PMT generation failed: {err}");
                    return Err(err);
                }
            }
        }

        let pat_len = self.cache.pat_bytes().len();
        self.sink
            .write_all(self.cache.pat_bytes())
            .map_err(|err| TsMuxError::io(0, err))?;
        self.sink
            .write_all(self.cache.pmt_bytes())
            .map_err(|err| TsMuxError::io(pat_len, err))?;
        Ok(pat_len + self.cache.pmt_bytes().len())
    }
}
