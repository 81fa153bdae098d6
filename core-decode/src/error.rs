//! # Decode Error Types
//!
//! Error types for the streaming decode pipeline.
//!
//! Every variant except [`DecodeError::UnsupportedFormat`] is fatal: the run
//! stops, resources are released by ownership, and the process exits nonzero.
//! `UnsupportedFormat` only degrades the final console report.

use crate::traits::SampleEncoding;
use thiserror::Error;

/// Errors that can occur while converting a compressed stream to PCM.
#[derive(Error, Debug)]
pub enum DecodeError {
    // ========================================================================
    // Setup Errors
    // ========================================================================
    /// The codec engine could not be found or opened.
    #[error("Decoder unavailable: {0}")]
    DecoderUnavailable(String),

    /// Failed to open or read the compressed input.
    #[error("Input error: {0}")]
    SourceError(String),

    /// Failed to create or write the PCM output.
    #[error("Output error: {0}")]
    SinkError(String),

    /// Configuration values are inconsistent.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ========================================================================
    // Stream Errors
    // ========================================================================
    /// The parser rejected the input or reported an impossible consumption.
    #[error("Error while parsing: {0}")]
    Parse(String),

    /// The decoder refused a compressed unit.
    #[error("Error submitting the packet to the decoder: {0}")]
    Submit(String),

    /// The decoder failed while producing a frame.
    #[error("Error during decoding: {0}")]
    Decoding(String),

    /// A decoded frame carries an encoding with no known byte width.
    #[error("Failed to calculate data size for sample format {0}")]
    UnknownSampleWidth(SampleEncoding),

    /// A decoded frame's planes are shorter than its sample count implies.
    #[error("Malformed decoded frame: {0}")]
    MalformedFrame(String),

    // ========================================================================
    // Reporting Errors
    // ========================================================================
    /// The encoding has no raw PCM output name.
    #[error("sample format {0} is not supported as output format")]
    UnsupportedFormat(SampleEncoding),

    // ========================================================================
    // Generic Errors
    // ========================================================================
    /// I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl DecodeError {
    /// Returns `true` if the run cannot continue after this error.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, DecodeError::UnsupportedFormat(_))
    }
}

/// Result type for decode operations.
pub type Result<T> = std::result::Result<T, DecodeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_unsupported_format_is_recoverable() {
        assert!(!DecodeError::UnsupportedFormat(SampleEncoding::S64).is_fatal());
        assert!(DecodeError::Parse("bad".into()).is_fatal());
        assert!(DecodeError::UnknownSampleWidth(SampleEncoding::None).is_fatal());
        assert!(DecodeError::IoError(std::io::Error::new(std::io::ErrorKind::Other, "disk")).is_fatal());
    }

    #[test]
    fn test_messages_name_the_format() {
        let err = DecodeError::UnsupportedFormat(SampleEncoding::S64Planar);
        assert_eq!(
            err.to_string(),
            "sample format s64p is not supported as output format"
        );
    }
}
