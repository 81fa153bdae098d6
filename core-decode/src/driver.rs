//! # Decode Driver
//!
//! Submits compressed units to a [`CodecEngine`] and drains every frame it
//! produces into the [`FrameEmitter`].
//!
//! `Starved` and `Ended` stop a drain without error; any other failure is
//! fatal and poisons the driver so the engine is never fed again.

use crate::emitter::FrameEmitter;
use crate::error::{DecodeError, Result};
use crate::traits::{CodecEngine, Received};
use std::io::Write;
use tracing::{debug, error, instrument, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DriverState {
    Accepting,
    Ended,
    Failed,
}

/// Drives one engine for the duration of a run.
pub struct DecodeDriver<'e, E: CodecEngine + ?Sized> {
    engine: &'e mut E,
    emitter: FrameEmitter,
    state: DriverState,
    frames_emitted: u64,
    bytes_written: u64,
}

impl<'e, E: CodecEngine + ?Sized> DecodeDriver<'e, E> {
    pub fn new(engine: &'e mut E, emitter: FrameEmitter) -> Self {
        Self {
            engine,
            emitter,
            state: DriverState::Accepting,
            frames_emitted: 0,
            bytes_written: 0,
        }
    }

    /// Submit one unit and emit every frame it yields.
    ///
    /// Returns the number of frames emitted. Empty units are ignored: end of
    /// stream is signalled through [`DecodeDriver::flush`] only.
    #[instrument(skip_all, level = "trace", fields(len = unit.len()))]
    pub fn decode<W: Write + ?Sized>(&mut self, unit: &[u8], sink: &mut W) -> Result<usize> {
        if unit.is_empty() {
            return Ok(0);
        }

        self.submit(unit)?;
        self.drain(sink)
    }

    /// Signal end of stream and emit the frames the engine held back.
    #[instrument(skip_all)]
    pub fn flush<W: Write + ?Sized>(&mut self, sink: &mut W) -> Result<usize> {
        self.submit(&[])?;
        let frames = self.drain(sink)?;
        debug!(frames, "Flushed decoder");
        Ok(frames)
    }

    pub fn frames_emitted(&self) -> u64 {
        self.frames_emitted
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    #[cfg(test)]
    fn is_ended(&self) -> bool {
        self.state == DriverState::Ended
    }

    fn submit(&mut self, unit: &[u8]) -> Result<()> {
        match self.state {
            DriverState::Accepting => {}
            DriverState::Ended => {
                return Err(DecodeError::Submit(
                    "decoder already reached end of stream".to_string(),
                ))
            }
            DriverState::Failed => {
                return Err(DecodeError::Submit(
                    "decoder is in an error state".to_string(),
                ))
            }
        }

        self.engine.submit(unit).map_err(|e| {
            error!("Error submitting the packet to the decoder: {}", e);
            self.state = DriverState::Failed;
            e
        })
    }

    fn drain<W: Write + ?Sized>(&mut self, sink: &mut W) -> Result<usize> {
        let mut frames = 0;

        loop {
            let frame = match self.engine.receive() {
                Ok(Received::Frame(frame)) => frame,
                Ok(Received::Starved) => break,
                Ok(Received::Ended) => {
                    self.state = DriverState::Ended;
                    break;
                }
                Err(e) => {
                    error!("Error during decoding: {}", e);
                    self.state = DriverState::Failed;
                    return Err(e);
                }
            };

            let byte_width = match frame.encoding.bytes_per_sample() {
                Some(width) => width,
                None => {
                    error!("Failed to calculate data size for {}", frame.encoding);
                    self.state = DriverState::Failed;
                    return Err(DecodeError::UnknownSampleWidth(frame.encoding));
                }
            };

            let written = self.emitter.emit(&frame, byte_width, sink)?;
            self.bytes_written += written;
            self.frames_emitted += 1;
            frames += 1;
            trace!(
                samples = frame.samples,
                encoding = %frame.encoding,
                "Drained frame"
            );
        }

        Ok(frames)
    }
}
