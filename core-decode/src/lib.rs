//! # Streaming Decode Core
//!
//! Converts a compressed audio elementary stream into raw, headerless PCM.
//!
//! ## Overview
//!
//! This crate handles:
//! - A fixed-capacity input window with compacting refills ([`InputWindow`])
//! - Incremental bitstream parsing behind [`BitstreamParser`]
//! - Send/receive decoding behind [`CodecEngine`], drained by [`DecodeDriver`]
//! - Frame serialization under a [`ChannelPolicy`] ([`FrameEmitter`])
//! - Output format resolution and the end-of-run [`RunReport`]
//!
//! It also provides the MPEG audio parser and, with the `core-decoder`
//! feature (on by default), the Symphonia-backed engine, wired together by
//! [`decode_file`].

pub mod config;
pub mod driver;
pub mod emitter;
pub mod error;
pub mod pipeline;
pub mod sample_format;
pub mod traits;
pub mod window;

pub mod decoder;
pub mod parser;

pub use config::{ChannelPolicy, DecodeConfig, DecodeStats};
pub use driver::DecodeDriver;
pub use emitter::FrameEmitter;
pub use error::{DecodeError, Result};
pub use pipeline::{run, FormatReport, OutputDescriptor, RunReport};
pub use sample_format::{resolve, Endianness, OutputFormat};
pub use traits::{
    BitstreamParser, CodecEngine, DecodedFrame, EngineFormat, Parsed, Received, SampleEncoding,
};
pub use window::InputWindow;

#[cfg(feature = "core-decoder")]
pub use decoder::SymphoniaEngine;

pub use parser::MpegAudioParser;

#[cfg(feature = "core-decoder")]
pub use pipeline::decode_file;
