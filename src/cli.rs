//! Command-line parsing.

use anyhow::Context;
use core_decode::{ChannelPolicy, DecodeConfig};
use core_runtime::logging::{LogFormat, LogLevel, LoggingConfig};
use std::path::PathBuf;
use thiserror::Error;

/// Parsed invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Decode(CliArgs),
    Help,
    Version,
}

/// Arguments of a decode invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    pub input: PathBuf,
    pub output: PathBuf,
    pub config_file: Option<PathBuf>,
    pub first_channel: bool,
    pub buffer_size: Option<usize>,
    pub refill_threshold: Option<usize>,
    pub log_format: LogFormat,
    pub log_level: LogLevel,
    /// Explicit `EnvFilter` directives, overriding level and environment
    pub log_filter: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UsageError {
    #[error("missing <{0}> argument")]
    MissingArgument(&'static str),

    #[error("unexpected argument '{0}'")]
    UnexpectedArgument(String),

    #[error("unknown option '{0}'")]
    UnknownOption(String),

    #[error("option '{0}' requires a value")]
    MissingValue(String),

    #[error("invalid value '{value}' for '{option}': {reason}")]
    InvalidValue {
        option: String,
        value: String,
        reason: String,
    },
}

pub fn usage(program: &str) -> String {
    format!(
        "Usage: {} [OPTIONS] <input> <output>\n\
         \n\
         Decode a raw MPEG audio elementary stream into headerless PCM.\n\
         \n\
         Options:\n\
         \x20     --first-channel           write channel 0 only\n\
         \x20     --buffer-size <bytes>     input window capacity\n\
         \x20     --refill-threshold <n>    refill when fewer bytes remain\n\
         \x20     --config <file>           JSON decode configuration\n\
         \x20     --log-format <format>     pretty, json or compact\n\
         \x20     --log-level <level>       trace, debug, info, warn or error\n\
         \x20     --log-filter <filter>     tracing filter directives, overrides the level\n\
         \x20 -h, --help                    print this help\n\
         \x20 -V, --version                 print the version",
        program
    )
}

/// Parse the arguments following the program name.
pub fn parse_args<I>(args: I) -> Result<Command, UsageError>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let mut positional = Vec::new();
    let mut config_file = None;
    let mut first_channel = false;
    let mut buffer_size = None;
    let mut refill_threshold = None;
    let mut log_format = LogFormat::default();
    let mut log_level = LogLevel::Warn;
    let mut log_filter = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(Command::Help),
            "-V" | "--version" => return Ok(Command::Version),
            "--first-channel" => first_channel = true,
            "--buffer-size" => buffer_size = Some(parse_value(&arg, value(&mut args, &arg)?)?),
            "--refill-threshold" => {
                refill_threshold = Some(parse_value(&arg, value(&mut args, &arg)?)?)
            }
            "--config" => config_file = Some(PathBuf::from(value(&mut args, &arg)?)),
            "--log-format" => log_format = parse_value(&arg, value(&mut args, &arg)?)?,
            "--log-level" => log_level = parse_value(&arg, value(&mut args, &arg)?)?,
            "--log-filter" => log_filter = Some(value(&mut args, &arg)?),
            "--" => positional.extend(args.by_ref()),
            option if option.starts_with('-') && option.len() > 1 => {
                return Err(UsageError::UnknownOption(option.to_string()))
            }
            _ => positional.push(arg),
        }
    }

    let mut positional = positional.into_iter();
    let input = positional
        .next()
        .ok_or(UsageError::MissingArgument("input"))?;
    let output = positional
        .next()
        .ok_or(UsageError::MissingArgument("output"))?;
    if let Some(extra) = positional.next() {
        return Err(UsageError::UnexpectedArgument(extra));
    }

    Ok(Command::Decode(CliArgs {
        input: PathBuf::from(input),
        output: PathBuf::from(output),
        config_file,
        first_channel,
        buffer_size,
        refill_threshold,
        log_format,
        log_level,
        log_filter,
    }))
}

fn value(args: &mut impl Iterator<Item = String>, option: &str) -> Result<String, UsageError> {
    args.next()
        .ok_or_else(|| UsageError::MissingValue(option.to_string()))
}

fn parse_value<T>(option: &str, value: String) -> Result<T, UsageError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| UsageError::InvalidValue {
        option: option.to_string(),
        reason: e.to_string(),
        value,
    })
}

impl CliArgs {
    /// Decode configuration: the JSON file if given, else defaults, with
    /// command-line flags applied on top.
    pub fn decode_config(&self) -> anyhow::Result<DecodeConfig> {
        let mut config = match &self.config_file {
            Some(path) => DecodeConfig::from_json_file(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?,
            None => DecodeConfig::default(),
        };

        if let Some(size) = self.buffer_size {
            config.input_buffer_size = size;
        }
        if let Some(threshold) = self.refill_threshold {
            config.refill_threshold = threshold;
        }
        if self.first_channel {
            config.channel_policy = ChannelPolicy::FirstChannel;
        }

        config.validate().context("Invalid decode configuration")?;
        Ok(config)
    }

    pub fn logging_config(&self) -> LoggingConfig {
        let config = LoggingConfig::default()
            .with_format(self.log_format)
            .with_level(self.log_level);

        match &self.log_filter {
            Some(filter) => config.with_filter(filter.as_str()),
            None => config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn decode(list: &[&str]) -> CliArgs {
        match parse_args(args(list)).unwrap() {
            Command::Decode(cli) => cli,
            other => panic!("expected decode command, got {:?}", other),
        }
    }

    #[test]
    fn test_positional_arguments() {
        let cli = decode(&["in.mp3", "out.pcm"]);
        assert_eq!(cli.input, PathBuf::from("in.mp3"));
        assert_eq!(cli.output, PathBuf::from("out.pcm"));
        assert!(!cli.first_channel);
        assert_eq!(cli.log_level, LogLevel::Warn);
    }

    #[test]
    fn test_missing_arguments() {
        assert_eq!(
            parse_args(args(&[])),
            Err(UsageError::MissingArgument("input"))
        );
        assert_eq!(
            parse_args(args(&["in.mp3"])),
            Err(UsageError::MissingArgument("output"))
        );
    }

    #[test]
    fn test_options_anywhere() {
        let cli = decode(&[
            "--first-channel",
            "in.mp3",
            "--buffer-size",
            "8192",
            "out.pcm",
            "--log-level",
            "debug",
        ]);
        assert!(cli.first_channel);
        assert_eq!(cli.buffer_size, Some(8192));
        assert_eq!(cli.log_level, LogLevel::Debug);
    }

    #[test]
    fn test_help_and_version_win() {
        assert_eq!(parse_args(args(&["in", "-h"])), Ok(Command::Help));
        assert_eq!(parse_args(args(&["--version"])), Ok(Command::Version));
    }

    #[test]
    fn test_bad_values() {
        assert!(matches!(
            parse_args(args(&["--buffer-size", "lots", "a", "b"])),
            Err(UsageError::InvalidValue { .. })
        ));
        assert!(matches!(
            parse_args(args(&["a", "b", "--log-format", "xml"])),
            Err(UsageError::InvalidValue { .. })
        ));
        assert_eq!(
            parse_args(args(&["a", "b", "--refill-threshold"])),
            Err(UsageError::MissingValue("--refill-threshold".to_string()))
        );
        assert_eq!(
            parse_args(args(&["a", "b", "--fast"])),
            Err(UsageError::UnknownOption("--fast".to_string()))
        );
        assert_eq!(
            parse_args(args(&["a", "b", "c"])),
            Err(UsageError::UnexpectedArgument("c".to_string()))
        );
    }

    #[test]
    fn test_dash_is_a_path() {
        let cli = decode(&["-", "--", "-out.pcm"]);
        assert_eq!(cli.input, PathBuf::from("-"));
        assert_eq!(cli.output, PathBuf::from("-out.pcm"));
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = decode(&[
            "--first-channel",
            "--buffer-size",
            "8192",
            "--refill-threshold",
            "3000",
            "a",
            "b",
        ]);
        let config = cli.decode_config().unwrap();

        assert_eq!(config.input_buffer_size, 8192);
        assert_eq!(config.refill_threshold, 3000);
        assert_eq!(config.channel_policy, ChannelPolicy::FirstChannel);
    }

    #[test]
    fn test_inconsistent_flags_are_rejected() {
        let cli = decode(&["--buffer-size", "1024", "a", "b"]);
        assert!(cli.decode_config().is_err());
    }

    #[test]
    fn test_log_filter_reaches_logging_config() {
        let cli = decode(&["--log-filter", "core_decode=trace", "a", "b"]);
        assert_eq!(cli.log_filter.as_deref(), Some("core_decode=trace"));
        assert_eq!(
            cli.logging_config().filter.as_deref(),
            Some("core_decode=trace")
        );

        let cli = decode(&["a", "b"]);
        assert_eq!(cli.logging_config().filter, None);
    }

    #[test]
    fn test_missing_config_file() {
        let cli = decode(&["--config", "/nonexistent/pcmdump.json", "a", "b"]);
        let err = cli.decode_config().unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to load configuration"));
    }
}
