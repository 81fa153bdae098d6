//! # Bitstream Parsers
//!
//! [`BitstreamParser`](crate::traits::BitstreamParser) implementations.

mod mpeg;

pub use mpeg::{FrameHeader, MpegAudioParser, MpegLayer, MpegVersion, HEADER_LEN, MAX_FRAME_LEN};
