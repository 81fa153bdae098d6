//! # Decode Configuration
//!
//! Configuration and statistics types for the streaming converter.

use crate::error::{DecodeError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How decoded channels are laid out in the output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChannelPolicy {
    /// Every channel, one sample per channel per sample index.
    #[default]
    Interleave,
    /// Channel 0 only.
    FirstChannel,
}

impl ChannelPolicy {
    /// Channels written per sample index for a stream of `channels`.
    pub fn emitted_channels(&self, channels: usize) -> usize {
        match self {
            ChannelPolicy::Interleave => channels,
            ChannelPolicy::FirstChannel => channels.min(1),
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            ChannelPolicy::Interleave => "all channels interleaved",
            ChannelPolicy::FirstChannel => "first channel only",
        }
    }
}

/// Converter configuration.
///
/// Controls the input window geometry and the channel layout of the output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeConfig {
    /// Capacity of the input window in bytes.
    ///
    /// Default: 20480 bytes.
    #[serde(default = "default_input_buffer_size")]
    pub input_buffer_size: usize,

    /// Remaining-byte count below which the window is compacted and refilled.
    ///
    /// Must exceed the parser's largest lookahead; MPEG audio frames top out
    /// at 2881 bytes.
    ///
    /// Default: 4096 bytes.
    #[serde(default = "default_refill_threshold")]
    pub refill_threshold: usize,

    /// Zeroed bytes reserved past the end of the window for parsers that
    /// read ahead.
    ///
    /// Default: 64 bytes.
    #[serde(default = "default_input_padding")]
    pub input_padding: usize,

    /// Output channel layout.
    #[serde(default)]
    pub channel_policy: ChannelPolicy,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            input_buffer_size: default_input_buffer_size(),
            refill_threshold: default_refill_threshold(),
            input_padding: default_input_padding(),
            channel_policy: ChannelPolicy::default(),
        }
    }
}

impl DecodeConfig {
    /// A tight window, mostly useful for exercising refills.
    pub fn small_window() -> Self {
        Self {
            input_buffer_size: 4096,
            refill_threshold: 3072,
            ..Default::default()
        }
    }

    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            DecodeError::InvalidConfig(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|e| {
            DecodeError::InvalidConfig(format!("cannot parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.input_buffer_size == 0 {
            return Err(DecodeError::InvalidConfig(
                "input_buffer_size must be > 0".to_string(),
            ));
        }

        if self.refill_threshold == 0 {
            return Err(DecodeError::InvalidConfig(
                "refill_threshold must be > 0".to_string(),
            ));
        }

        if self.refill_threshold >= self.input_buffer_size {
            return Err(DecodeError::InvalidConfig(
                "refill_threshold must be smaller than input_buffer_size".to_string(),
            ));
        }

        Ok(())
    }
}

// ============================================================================
// Default Functions (for serde)
// ============================================================================

fn default_input_buffer_size() -> usize {
    20480
}

fn default_refill_threshold() -> usize {
    4096
}

fn default_input_padding() -> usize {
    64
}

// ============================================================================
// Run Statistics
// ============================================================================

/// Counters collected over one conversion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DecodeStats {
    /// Bytes read from the input file.
    pub bytes_read: u64,
    /// Refill cycles, the initial fill included.
    pub refills: u64,
    /// Compressed units produced by the parser.
    pub units_parsed: u64,
    /// Units handed to the decoder (the flush sentinel excluded).
    pub units_submitted: u64,
    /// Frames written to the output.
    pub frames_emitted: u64,
    /// Frames that only came out during the final flush.
    pub flushed_frames: u64,
    /// Bytes written to the output.
    pub bytes_written: u64,
    /// Window bytes left unparsed at end of stream.
    pub trailing_bytes_dropped: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DecodeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.input_buffer_size, 20480);
        assert_eq!(config.refill_threshold, 4096);
        assert_eq!(config.channel_policy, ChannelPolicy::Interleave);
    }

    #[test]
    fn test_small_window_config() {
        let config = DecodeConfig::small_window();
        assert!(config.validate().is_ok());
        assert!(config.input_buffer_size < DecodeConfig::default().input_buffer_size);
    }

    #[test]
    fn test_config_validation() {
        let mut config = DecodeConfig::default();

        config.input_buffer_size = 0;
        assert!(config.validate().is_err());
        config.input_buffer_size = 20480;

        config.refill_threshold = 20480;
        assert!(config.validate().is_err());

        config.refill_threshold = 0;
        assert!(config.validate().is_err());
        config.refill_threshold = 4096;

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let config: DecodeConfig =
            serde_json::from_str(r#"{ "channel_policy": "first-channel" }"#).unwrap();
        assert_eq!(config.channel_policy, ChannelPolicy::FirstChannel);
        assert_eq!(config.input_buffer_size, 20480);
        assert_eq!(config.input_padding, 64);
    }

    #[test]
    fn test_emitted_channels() {
        assert_eq!(ChannelPolicy::Interleave.emitted_channels(2), 2);
        assert_eq!(ChannelPolicy::FirstChannel.emitted_channels(6), 1);
        assert_eq!(ChannelPolicy::FirstChannel.emitted_channels(0), 0);
    }
}
