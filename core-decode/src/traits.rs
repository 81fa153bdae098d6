//! # Core Decode Traits
//!
//! This module defines the two collaborator seams of the converter and the data
//! that flows across them.
//!
//! ## Architecture
//!
//! The converter is a single pull loop:
//!
//! ```text
//! file bytes → InputWindow → BitstreamParser → compressed unit
//!            → DecodeDriver → CodecEngine → DecodedFrame → FrameEmitter → output
//! ```
//!
//! - **[`BitstreamParser`]**: cuts compressed units out of an opaque byte
//!   window. It reports how many bytes it consumed and optionally hands back one
//!   unit, which may borrow either the window or the parser's own staging
//!   buffer.
//! - **[`CodecEngine`]**: a send/receive decoder state machine. Units go in
//!   through [`CodecEngine::submit`]; frames come out of
//!   [`CodecEngine::receive`] until it reports [`Received::Starved`] or
//!   [`Received::Ended`].
//!
//! Any codec/parser pair implementing these traits can drive the pipeline
//! without touching the buffer manager or the orchestrator.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Sample Encodings
// ============================================================================

/// Sample representation reported by a decoder.
///
/// Packed variants store one sample per channel in turn in a single plane;
/// planar variants keep each channel in its own plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleEncoding {
    /// No format negotiated yet (unopened decoder).
    None,
    U8,
    S16,
    S32,
    F32,
    F64,
    S64,
    U8Planar,
    S16Planar,
    S32Planar,
    F32Planar,
    F64Planar,
    S64Planar,
}

impl SampleEncoding {
    /// Bytes occupied by one sample of one channel, or `None` if unknown.
    pub fn bytes_per_sample(&self) -> Option<usize> {
        match self {
            Self::None => None,
            Self::U8 | Self::U8Planar => Some(1),
            Self::S16 | Self::S16Planar => Some(2),
            Self::S32 | Self::S32Planar | Self::F32 | Self::F32Planar => Some(4),
            Self::F64 | Self::F64Planar | Self::S64 | Self::S64Planar => Some(8),
        }
    }

    /// Returns `true` if channels are stored in separate planes.
    pub fn is_planar(&self) -> bool {
        matches!(
            self,
            Self::U8Planar
                | Self::S16Planar
                | Self::S32Planar
                | Self::F32Planar
                | Self::F64Planar
                | Self::S64Planar
        )
    }

    /// The interleaved equivalent of this encoding.
    pub fn packed(&self) -> Self {
        match self {
            Self::U8Planar => Self::U8,
            Self::S16Planar => Self::S16,
            Self::S32Planar => Self::S32,
            Self::F32Planar => Self::F32,
            Self::F64Planar => Self::F64,
            Self::S64Planar => Self::S64,
            other => *other,
        }
    }

    /// Short name, as printed by common audio tools (`s16`, `fltp`, ...).
    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::U8 => "u8",
            Self::S16 => "s16",
            Self::S32 => "s32",
            Self::F32 => "flt",
            Self::F64 => "dbl",
            Self::S64 => "s64",
            Self::U8Planar => "u8p",
            Self::S16Planar => "s16p",
            Self::S32Planar => "s32p",
            Self::F32Planar => "fltp",
            Self::F64Planar => "dblp",
            Self::S64Planar => "s64p",
        }
    }
}

impl fmt::Display for SampleEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Decoder State
// ============================================================================

/// Output format a decoder reports after (or before) decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineFormat {
    /// Native sample encoding of the frames produced
    pub encoding: SampleEncoding,
    /// Number of channels
    pub channels: u16,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl EngineFormat {
    /// State of a decoder that has not produced anything yet.
    pub fn unopened() -> Self {
        Self {
            encoding: SampleEncoding::None,
            channels: 0,
            sample_rate: 0,
        }
    }
}

impl Default for EngineFormat {
    fn default() -> Self {
        Self::unopened()
    }
}

/// One decoder output granule, borrowed from the engine until the next
/// `receive` call.
#[derive(Debug, Clone, Copy)]
pub struct DecodedFrame<'a> {
    /// Samples per channel
    pub samples: usize,
    /// Number of channels
    pub channels: usize,
    /// Sample encoding of every plane
    pub encoding: SampleEncoding,
    /// One plane per channel when planar, a single interleaved plane otherwise
    pub planes: &'a [Vec<u8>],
}

impl DecodedFrame<'_> {
    pub fn is_planar(&self) -> bool {
        self.encoding.is_planar()
    }
}

/// Outcome of one [`CodecEngine::receive`] call.
#[derive(Debug)]
pub enum Received<'a> {
    /// A frame is ready.
    Frame(DecodedFrame<'a>),
    /// The decoder needs more input before it can produce output.
    Starved,
    /// End of stream has been signalled and every frame has been drained.
    Ended,
}

/// Send/receive audio decoder.
///
/// The engine is a state machine {accepting-input, frame-ready, starved,
/// ended, errored}. Callers must not submit after `Ended` or an error.
/// Dropping the engine releases it.
pub trait CodecEngine {
    /// Submit one compressed unit. A zero-length unit signals end of stream.
    fn submit(&mut self, unit: &[u8]) -> Result<()>;

    /// Try to take one decoded frame out of the engine.
    fn receive(&mut self) -> Result<Received<'_>>;

    /// Format the engine currently reports.
    fn format(&self) -> EngineFormat;
}

// ============================================================================
// Bitstream Parsing
// ============================================================================

/// Result of one [`BitstreamParser::parse`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parsed<'a> {
    /// Input bytes consumed by this call
    pub consumed: usize,
    /// Compressed unit completed by this call, if any
    pub unit: Option<&'a [u8]>,
}

impl<'a> Parsed<'a> {
    /// Bytes consumed without completing a unit.
    pub fn consumed(consumed: usize) -> Self {
        Self {
            consumed,
            unit: None,
        }
    }

    /// Bytes consumed and a unit completed.
    pub fn unit(consumed: usize, unit: &'a [u8]) -> Self {
        Self {
            consumed,
            unit: Some(unit),
        }
    }
}

/// Splits a compressed elementary stream into units the decoder consumes.
pub trait BitstreamParser {
    /// Parse from the front of `input`.
    ///
    /// Returns how many bytes of `input` were consumed and, optionally, a
    /// completed unit. The unit stays valid until the next call.
    fn parse<'a>(&'a mut self, input: &'a [u8]) -> Result<Parsed<'a>>;

    /// Hand out a complete unit still held back once the input has ended.
    ///
    /// Parsers that never hold a finished unit keep the default.
    fn finish(&mut self) -> Option<&[u8]> {
        None
    }
}
