//! # Audio Decoder Module
//!
//! MPEG audio decoding using the Symphonia library.
//!
//! ## Supported Codecs
//!
//! | Codec | Symphonia type | Feature Flag |
//! |-------|----------------|--------------|
//! | MPEG-1/2/2.5 Layer I | `CODEC_TYPE_MP1` | `decoder-mpa` |
//! | MPEG-1/2/2.5 Layer II | `CODEC_TYPE_MP2` | `decoder-mpa` |
//! | MPEG-1/2/2.5 Layer III | `CODEC_TYPE_MP3` | `decoder-mpa` |
//!
//! ## Architecture
//!
//! Symphonia normally reads whole containers through its own demuxer. Here the
//! [`MpegAudioParser`](crate::parser::MpegAudioParser) does the framing, and
//! only Symphonia's codec layer is used:
//!
//! ```text
//! compressed unit → Packet → Decoder → AudioBufferRef → byte planes
//! ```
//!
//! Decoded samples keep the decoder's native encoding (32-bit float planar
//! for every MPEG layer).

#[cfg(feature = "core-decoder")]
mod format_detector;

#[cfg(feature = "core-decoder")]
mod sample_converter;

#[cfg(feature = "core-decoder")]
mod symphonia;

#[cfg(feature = "core-decoder")]
pub use self::symphonia::SymphoniaEngine;

#[cfg(feature = "core-decoder")]
pub use format_detector::FormatDetector;

#[cfg(feature = "core-decoder")]
pub use sample_converter::SampleConverter;

#[cfg(not(feature = "core-decoder"))]
compile_error!("Audio decoder feature is not enabled. Enable 'decoder-mpa'");
