//! # Codec Selection
//!
//! Picks and instantiates the Symphonia decoder for an MPEG audio stream from
//! the header of its first frame.

use crate::error::{DecodeError, Result};
use crate::parser::{FrameHeader, MpegLayer};
use symphonia::core::audio::Channels;
use symphonia::core::codecs::{
    CodecParameters, CodecType, Decoder, DecoderOptions, CODEC_TYPE_MP1, CODEC_TYPE_MP2,
    CODEC_TYPE_MP3,
};
use tracing::{debug, error};

/// Codec lookup against Symphonia's registry.
pub struct FormatDetector;

impl FormatDetector {
    /// Symphonia codec type for an MPEG audio layer.
    pub fn codec_for(layer: MpegLayer) -> CodecType {
        match layer {
            MpegLayer::Layer1 => CODEC_TYPE_MP1,
            MpegLayer::Layer2 => CODEC_TYPE_MP2,
            MpegLayer::Layer3 => CODEC_TYPE_MP3,
        }
    }

    pub fn codec_name(codec: CodecType) -> &'static str {
        if codec == CODEC_TYPE_MP1 {
            "mp1"
        } else if codec == CODEC_TYPE_MP2 {
            "mp2"
        } else if codec == CODEC_TYPE_MP3 {
            "mp3"
        } else {
            "unknown"
        }
    }

    /// Check that the registry holds a decoder for `codec`.
    ///
    /// # Returns
    ///
    /// - `Ok(())` - Codec is supported
    /// - `Err(DecodeError::DecoderUnavailable)` - Codec not compiled in
    pub fn validate_codec_support(codec: CodecType) -> Result<()> {
        match symphonia::default::get_codecs().get_codec(codec) {
            Some(descriptor) => {
                debug!("Found decoder {} for {}", descriptor.short_name, Self::codec_name(codec));
                Ok(())
            }
            None => {
                error!("Could not find the {} decoder", Self::codec_name(codec));
                Err(DecodeError::DecoderUnavailable(format!(
                    "no {} decoder registered",
                    Self::codec_name(codec)
                )))
            }
        }
    }

    /// Codec parameters describing the stream `header` belongs to.
    pub fn codec_params(header: &FrameHeader) -> CodecParameters {
        let channels = if header.channels() == 1 {
            Channels::FRONT_LEFT
        } else {
            Channels::FRONT_LEFT | Channels::FRONT_RIGHT
        };

        let mut params = CodecParameters::new();
        params
            .for_codec(Self::codec_for(header.layer))
            .with_sample_rate(header.sample_rate)
            .with_channels(channels)
            .with_max_frames_per_packet(header.samples_per_frame() as u64);
        params
    }

    /// Create a decoder for the stream whose first frame is `unit`.
    pub fn make_decoder(unit: &[u8]) -> Result<Box<dyn Decoder>> {
        let header = FrameHeader::parse(unit).ok_or_else(|| {
            DecodeError::Decoding("first unit does not start with an MPEG audio header".to_string())
        })?;

        let codec = Self::codec_for(header.layer);
        Self::validate_codec_support(codec)?;

        let decoder = symphonia::default::get_codecs()
            .make(&Self::codec_params(&header), &DecoderOptions::default())
            .map_err(|e| {
                error!("Could not open codec: {}", e);
                DecodeError::DecoderUnavailable(format!("Failed to create codec decoder: {}", e))
            })?;

        debug!(
            codec = Self::codec_name(codec),
            sample_rate = header.sample_rate,
            channels = header.channels(),
            "Codec opened"
        );
        Ok(decoder)
    }
}
