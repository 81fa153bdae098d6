//! # Symphonia Engine
//!
//! [`CodecEngine`] backed by Symphonia's MPEG audio decoder.

use crate::decoder::format_detector::FormatDetector;
use crate::decoder::sample_converter::SampleConverter;
use crate::error::{DecodeError, Result};
use crate::traits::{CodecEngine, DecodedFrame, EngineFormat, Received, SampleEncoding};
use bytes::Bytes;
use std::collections::VecDeque;
use std::fmt::Display;
use symphonia::core::codecs::{Decoder, CODEC_TYPE_MP3};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::Packet;
use tracing::{debug, error, info, instrument, trace, warn};

/// Corrupt units tolerated in a row before decoding is abandoned.
const MAX_CONSECUTIVE_ERRORS: usize = 10;

/// Shape of the frame last written into the engine's planes.
#[derive(Debug, Clone, Copy)]
struct FrameShape {
    samples: usize,
    channels: usize,
    encoding: SampleEncoding,
}

/// Send/receive wrapper around a Symphonia MPEG audio decoder.
///
/// Symphonia decodes one packet per call, so submitted units are queued and
/// decoded lazily by [`CodecEngine::receive`]. The codec itself is opened on
/// the first unit, whose header fixes layer, sample rate and channel layout.
///
/// Corrupt units are skipped with a warning; [`MAX_CONSECUTIVE_ERRORS`] in a
/// row fail the run.
pub struct SymphoniaEngine {
    /// Opened on the first unit
    decoder: Option<Box<dyn Decoder>>,

    /// Units submitted but not yet decoded
    pending: VecDeque<Bytes>,

    /// End of stream has been signalled
    draining: bool,

    /// Every queued unit has been decoded after end of stream
    ended: bool,

    /// Byte planes of the last decoded frame
    planes: Vec<Vec<u8>>,

    /// Format of the last decoded frame
    format: EngineFormat,

    /// Presentation timestamp of the next unit, in samples
    timestamp: u64,

    consecutive_errors: usize,
}

impl SymphoniaEngine {
    /// Look up the MPEG audio decoder and prepare an engine around it.
    ///
    /// # Errors
    ///
    /// Returns `DecoderUnavailable` if Symphonia was built without it.
    #[instrument]
    pub fn open() -> Result<Self> {
        FormatDetector::validate_codec_support(CODEC_TYPE_MP3)?;
        info!("MPEG audio decoder ready");

        Ok(Self {
            decoder: None,
            pending: VecDeque::new(),
            draining: false,
            ended: false,
            planes: Vec::new(),
            format: EngineFormat::unopened(),
            timestamp: 0,
            consecutive_errors: 0,
        })
    }

    #[cfg(test)]
    fn pending_units(&self) -> usize {
        self.pending.len()
    }

    /// Decode queued units until one yields a frame.
    ///
    /// Returns `None` once the queue is empty. The frame's samples are left
    /// in `self.planes`.
    #[instrument(skip(self), level = "trace")]
    fn decode_next(&mut self) -> Result<Option<FrameShape>> {
        while let Some(unit) = self.pending.pop_front() {
            if self.decoder.is_none() {
                self.decoder = Some(FormatDetector::make_decoder(&unit)?);
            }

            let decoder = match self.decoder.as_mut() {
                Some(decoder) => decoder,
                None => {
                    return Err(DecodeError::DecoderUnavailable(
                        "decoder was not opened".to_string(),
                    ))
                }
            };

            let packet = Packet::new_from_slice(0, self.timestamp, 0, &unit);

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    let samples = decoded.frames();
                    let encoding = SampleConverter::to_planes(&decoded, &mut self.planes);
                    let channels = spec.channels.count();

                    if self.format.encoding != encoding || self.format.sample_rate != spec.rate {
                        debug!(
                            encoding = %encoding,
                            channels,
                            sample_rate = spec.rate,
                            "Decoder output format"
                        );
                    }

                    self.format = EngineFormat {
                        encoding,
                        channels: channels as u16,
                        sample_rate: spec.rate,
                    };
                    self.timestamp += samples as u64;
                    self.consecutive_errors = 0;

                    trace!(samples, timestamp = self.timestamp, "Decoded unit");
                    return Ok(Some(FrameShape {
                        samples,
                        channels,
                        encoding,
                    }));
                }
                Err(SymphoniaError::DecodeError(err)) => {
                    skip_corrupt(&mut self.consecutive_errors, err)?;
                }
                Err(SymphoniaError::IoError(err)) => {
                    skip_corrupt(&mut self.consecutive_errors, err)?;
                }
                Err(e) => {
                    error!("Fatal decode error: {}", e);
                    return Err(DecodeError::Decoding(format!(
                        "Failed to decode packet: {}",
                        e
                    )));
                }
            }
        }

        Ok(None)
    }
}

/// Count one skipped unit, failing once too many have been skipped in a row.
fn skip_corrupt(consecutive_errors: &mut usize, reason: impl Display) -> Result<()> {
    *consecutive_errors += 1;
    warn!(
        "Skipping corrupted packet (attempt {}/{}): {}",
        consecutive_errors, MAX_CONSECUTIVE_ERRORS, reason
    );

    if *consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
        error!("Too many consecutive decode errors, stream may be corrupted");
        return Err(DecodeError::Decoding(format!(
            "Decoder failure after {} failed packets: {}",
            MAX_CONSECUTIVE_ERRORS, reason
        )));
    }

    Ok(())
}

impl CodecEngine for SymphoniaEngine {
    fn submit(&mut self, unit: &[u8]) -> Result<()> {
        if self.draining {
            return Err(DecodeError::Submit(
                "end of stream was already signalled".to_string(),
            ));
        }

        if unit.is_empty() {
            debug!(pending = self.pending.len(), "End of stream signalled");
            self.draining = true;
        } else {
            self.pending.push_back(Bytes::copy_from_slice(unit));
        }

        Ok(())
    }

    fn receive(&mut self) -> Result<Received<'_>> {
        if self.ended {
            return Ok(Received::Ended);
        }

        match self.decode_next()? {
            Some(shape) => Ok(Received::Frame(DecodedFrame {
                samples: shape.samples,
                channels: shape.channels,
                encoding: shape.encoding,
                planes: &self.planes,
            })),
            None if self.draining => {
                self.ended = true;
                debug!(samples = self.timestamp, "Decoder drained");
                Ok(Received::Ended)
            }
            None => Ok(Received::Starved),
        }
    }

    fn format(&self) -> EngineFormat {
        self.format
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_reports_unopened_format() {
        let engine = SymphoniaEngine::open().unwrap();
        assert_eq!(engine.format(), EngineFormat::unopened());
        assert_eq!(engine.pending_units(), 0);
    }

    #[test]
    fn test_starved_until_fed() {
        let mut engine = SymphoniaEngine::open().unwrap();
        assert!(matches!(engine.receive().unwrap(), Received::Starved));
    }

    #[test]
    fn test_flush_on_empty_engine_ends() {
        let mut engine = SymphoniaEngine::open().unwrap();
        engine.submit(&[]).unwrap();

        assert!(matches!(engine.receive().unwrap(), Received::Ended));
        assert!(matches!(engine.receive().unwrap(), Received::Ended));
        assert!(matches!(engine.submit(&[1, 2, 3]), Err(DecodeError::Submit(_))));
    }

    #[test]
    fn test_units_are_queued_until_received() {
        let mut engine = SymphoniaEngine::open().unwrap();
        engine.submit(&[0xFF, 0xFB, 0x90, 0x00]).unwrap();
        engine.submit(&[0xFF, 0xFB, 0x90, 0x00]).unwrap();
        assert_eq!(engine.pending_units(), 2);
    }

    #[test]
    fn test_garbage_first_unit_is_fatal() {
        let mut engine = SymphoniaEngine::open().unwrap();
        engine.submit(&[0x12, 0x34, 0x56, 0x78]).unwrap();
        assert!(matches!(engine.receive(), Err(DecodeError::Decoding(_))));
    }
}
