//! # Decode Pipeline
//!
//! Top-level orchestration of one conversion run.
//!
//! ## Loop
//!
//! ```text
//! refill → parse → (unit?) decode + emit → advance → refill if low
//!        ↺ until the window is empty and the source exhausted
//! finish (held-back unit?) → flush → query engine format → resolve report
//! ```
//!
//! Every fatal condition is returned as an error. Handles acquired by
//! [`decode_file`] are owned locally and released on every exit path.

use crate::config::{ChannelPolicy, DecodeConfig, DecodeStats};
use crate::driver::DecodeDriver;
use crate::emitter::FrameEmitter;
use crate::error::{DecodeError, Result};
use crate::sample_format::{self, OutputFormat};
use crate::traits::{BitstreamParser, CodecEngine, EngineFormat, SampleEncoding};
use crate::window::InputWindow;
use serde::Serialize;
use std::io::{Read, Write};
use std::path::Path;
use tracing::{debug, info, instrument, trace};

#[cfg(feature = "core-decoder")]
use crate::decoder::SymphoniaEngine;
#[cfg(feature = "core-decoder")]
use crate::parser::MpegAudioParser;
#[cfg(feature = "core-decoder")]
use std::{fs::File, io::BufWriter};

// ============================================================================
// Report Types
// ============================================================================

/// Format of the PCM actually written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OutputDescriptor {
    pub format: OutputFormat,
    /// Channels per sample index in the output file
    pub channels: u16,
    pub sample_rate: u32,
}

/// Outcome of resolving the decoder's final format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatReport {
    Resolved(OutputDescriptor),
    /// The (packed) encoding has no raw PCM name.
    Unsupported(SampleEncoding),
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub stats: DecodeStats,
    /// Format the engine reported after the flush
    pub native: EngineFormat,
    pub channel_policy: ChannelPolicy,
    pub emitted_channels: u16,
    pub format: FormatReport,
}

impl RunReport {
    /// Build the report from the engine's final format.
    ///
    /// Planar encodings are reported as their packed equivalent, with the
    /// channel count the policy actually emitted.
    pub fn new(stats: DecodeStats, native: EngineFormat, channel_policy: ChannelPolicy) -> Self {
        let emitted_channels = channel_policy.emitted_channels(native.channels as usize) as u16;
        let packed = native.encoding.packed();

        let format = match sample_format::resolve(packed) {
            Ok(format) => FormatReport::Resolved(OutputDescriptor {
                format,
                channels: emitted_channels,
                sample_rate: native.sample_rate,
            }),
            Err(e) => {
                debug!("{}", e);
                FormatReport::Unsupported(packed)
            }
        };

        Self {
            stats,
            native,
            channel_policy,
            emitted_channels,
            format,
        }
    }

    /// Returns `true` if the decoder produced planar frames.
    pub fn is_planar(&self) -> bool {
        self.native.encoding.is_planar()
    }

    /// Command line that plays `output` back, if the format resolved.
    pub fn playback_hint(&self, output: &Path) -> Option<String> {
        match &self.format {
            FormatReport::Resolved(descriptor) => Some(format!(
                "ffplay -f {} -ac {} -ar {} {}",
                descriptor.format.name,
                descriptor.channels,
                descriptor.sample_rate,
                output.display()
            )),
            FormatReport::Unsupported(_) => None,
        }
    }
}

// ============================================================================
// Orchestration
// ============================================================================

/// Convert everything `source` yields into PCM on `sink`.
///
/// The caller owns every handle; nothing is closed here. On success the
/// engine has been flushed and its final format resolved into the report.
///
/// # Errors
///
/// Returns the first fatal error: configuration, read, parse, submit,
/// decode, or write failure.
#[instrument(skip_all, fields(capacity = config.input_buffer_size, threshold = config.refill_threshold))]
pub fn run<E, P, R, W>(
    engine: &mut E,
    parser: &mut P,
    source: &mut R,
    sink: &mut W,
    config: &DecodeConfig,
) -> Result<RunReport>
where
    E: CodecEngine + ?Sized,
    P: BitstreamParser + ?Sized,
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    config.validate()?;

    let mut window = InputWindow::from_config(config)?;
    let mut driver = DecodeDriver::new(&mut *engine, FrameEmitter::new(config.channel_policy));
    let mut stats = DecodeStats::default();

    info!(policy = config.channel_policy.describe(), "Starting decode");
    window.refill(source)?;

    while !window.is_empty() {
        let parsed = window.parse_next(parser)?;
        let consumed = parsed.consumed;
        let produced = parsed.unit.is_some();

        if let Some(unit) = parsed.unit {
            stats.units_parsed += 1;
            trace!(consumed, len = unit.len(), "Parsed unit");
            if !unit.is_empty() {
                stats.units_submitted += 1;
                driver.decode(unit, sink)?;
            }
        }

        window.advance(consumed);

        if consumed == 0 && !produced {
            // The parser needs more bytes than the window holds.
            if window.is_exhausted() {
                let dropped = window.discard();
                stats.trailing_bytes_dropped += dropped as u64;
                debug!(dropped, "Dropping trailing bytes that form no unit");
                break;
            }

            if window.refill(source)? == 0 && !window.is_exhausted() {
                return Err(DecodeError::Parse(format!(
                    "parser made no progress on a full {} byte window",
                    window.capacity()
                )));
            }
            continue;
        }

        if window.needs_refill() && !window.is_exhausted() {
            window.refill(source)?;
        }
    }

    if let Some(unit) = parser.finish() {
        stats.units_parsed += 1;
        trace!(len = unit.len(), "Final unit");
        if !unit.is_empty() {
            stats.units_submitted += 1;
            driver.decode(unit, sink)?;
        }
    }

    stats.flushed_frames = driver.flush(sink)? as u64;
    stats.frames_emitted = driver.frames_emitted();
    stats.bytes_written = driver.bytes_written();
    stats.bytes_read = window.bytes_read();
    stats.refills = window.refills();

    let report = RunReport::new(stats, engine.format(), config.channel_policy);
    info!(
        units = report.stats.units_submitted,
        frames = report.stats.frames_emitted,
        bytes_written = report.stats.bytes_written,
        "Decode finished"
    );

    Ok(report)
}

/// Decode the MPEG audio file at `input` into raw PCM at `output`.
///
/// Opens the decoder, the parser, the input and the output in that order.
/// Both files are closed when this returns, on success or failure.
#[cfg(feature = "core-decoder")]
#[instrument(skip_all, fields(input = %input.display(), output = %output.display()))]
pub fn decode_file(input: &Path, output: &Path, config: &DecodeConfig) -> Result<RunReport> {
    config.validate()?;

    let mut engine = SymphoniaEngine::open()?;
    let mut parser = MpegAudioParser::new();

    let mut source = File::open(input).map_err(|e| {
        DecodeError::SourceError(format!("Could not open {}: {}", input.display(), e))
    })?;
    let file = File::create(output).map_err(|e| {
        DecodeError::SinkError(format!("Could not open {}: {}", output.display(), e))
    })?;
    let mut sink = BufWriter::new(file);

    let report = run(&mut engine, &mut parser, &mut source, &mut sink, config)?;
    sink.flush()?;

    if parser.staged() > 0 {
        debug!(bytes = parser.staged(), "Incomplete final frame dropped");
    }
    debug!(
        frames = parser.frames(),
        junk_bytes = parser.junk_bytes(),
        "Parser finished"
    );

    Ok(report)
}
