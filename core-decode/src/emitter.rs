//! # Frame Emitter
//!
//! Serializes decoded frames into a flat interleaved PCM byte stream.
//!
//! Samples are copied verbatim at the decoder's byte width, sample-index
//! major and channel-index minor, so planar input comes out interleaved and
//! packed input keeps its layout. No conversion, mixing or resampling.

use crate::config::ChannelPolicy;
use crate::error::{DecodeError, Result};
use crate::traits::DecodedFrame;
use std::io::Write;
use tracing::trace;

/// Writes decoded frames to an output sink under a [`ChannelPolicy`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameEmitter {
    policy: ChannelPolicy,
}

impl FrameEmitter {
    pub fn new(policy: ChannelPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> ChannelPolicy {
        self.policy
    }

    /// Write one frame, returning the number of bytes written.
    ///
    /// Exactly `samples × byte_width` bytes are written per emitted channel.
    pub fn emit<W: Write + ?Sized>(
        &self,
        frame: &DecodedFrame<'_>,
        byte_width: usize,
        sink: &mut W,
    ) -> Result<u64> {
        let emitted_channels = self.policy.emitted_channels(frame.channels);
        Self::check_planes(frame, emitted_channels, byte_width)?;

        for i in 0..frame.samples {
            for ch in 0..emitted_channels {
                sink.write_all(Self::sample_bytes(frame, byte_width, ch, i))?;
            }
        }

        let written = (frame.samples * emitted_channels * byte_width) as u64;
        trace!(
            samples = frame.samples,
            channels = emitted_channels,
            bytes = written,
            "Emitted frame"
        );
        Ok(written)
    }

    /// Bytes of sample `index` on channel `channel`.
    fn sample_bytes<'f>(
        frame: &DecodedFrame<'f>,
        byte_width: usize,
        channel: usize,
        index: usize,
    ) -> &'f [u8] {
        let planes: &'f [Vec<u8>] = frame.planes;
        let (plane, offset) = if frame.is_planar() {
            (&planes[channel], index * byte_width)
        } else {
            (&planes[0], (index * frame.channels + channel) * byte_width)
        };
        &plane[offset..offset + byte_width]
    }

    /// Only the planes of emitted channels have to be present.
    fn check_planes(
        frame: &DecodedFrame<'_>,
        emitted_channels: usize,
        byte_width: usize,
    ) -> Result<()> {
        if frame.samples == 0 || emitted_channels == 0 {
            return Ok(());
        }

        let (planes_needed, bytes_per_plane) = if frame.is_planar() {
            (emitted_channels, frame.samples * byte_width)
        } else {
            (1, frame.samples * frame.channels * byte_width)
        };

        if frame.planes.len() < planes_needed {
            return Err(DecodeError::MalformedFrame(format!(
                "expected {} planes, got {}",
                planes_needed,
                frame.planes.len()
            )));
        }

        if let Some(short) = frame.planes[..planes_needed]
            .iter()
            .find(|plane| plane.len() < bytes_per_plane)
        {
            return Err(DecodeError::MalformedFrame(format!(
                "plane holds {} bytes, {} required",
                short.len(),
                bytes_per_plane
            )));
        }

        Ok(())
    }
}
