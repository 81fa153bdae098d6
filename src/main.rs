//! # pcmdump
//!
//! Decodes a raw MPEG audio elementary stream into headerless PCM and prints
//! how to play the result back.
//!
//! ```text
//! pcmdump [OPTIONS] <input> <output>
//! ```
//!
//! Exit status: 0 on success (including an output format that cannot be
//! named), 1 on a fatal decode error, 2 on a usage error.

mod cli;

use anyhow::Context;
use cli::{CliArgs, Command};
use core_decode::{decode_file, DecodeError, FormatReport, RunReport};
use core_runtime::logging::{init_logging, strip_path};
use std::path::Path;
use std::process::ExitCode;
use tracing::{debug, info};

const EXIT_USAGE: u8 = 2;

fn main() -> ExitCode {
    let mut args = std::env::args();
    let program = args.next().unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string());

    println!("{} Version {}", program, env!("CARGO_PKG_VERSION"));

    let cli = match cli::parse_args(args) {
        Ok(Command::Decode(cli)) => cli,
        Ok(Command::Help) => {
            println!("{}", cli::usage(&program));
            return ExitCode::SUCCESS;
        }
        Ok(Command::Version) => return ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {}", program, e);
            eprintln!("{}", cli::usage(&program));
            return ExitCode::from(EXIT_USAGE);
        }
    };

    if let Err(e) = init_logging(cli.logging_config()) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    match convert(&cli) {
        Ok(report) => {
            print_report(&report, &cli.output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn convert(cli: &CliArgs) -> anyhow::Result<RunReport> {
    let config = cli.decode_config()?;

    info!(
        input = %strip_path(&cli.input.to_string_lossy()),
        output = %strip_path(&cli.output.to_string_lossy()),
        "Decoding"
    );

    let report = decode_file(&cli.input, &cli.output, &config)
        .with_context(|| format!("Failed to decode {}", cli.input.display()))?;

    debug!(report = %serde_json::to_string(&report)?, "Run report");
    Ok(report)
}

fn print_report(report: &RunReport, output: &Path) {
    if report.is_planar() {
        println!(
            "Warning: the sample format the decoder produced is planar ({}). \
             The output holds {}.",
            report.native.encoding,
            report.channel_policy.describe()
        );
    }

    match report.format {
        FormatReport::Resolved(_) => {
            if let Some(hint) = report.playback_hint(output) {
                println!("Play the output audio file with the command:\n{}", hint);
            }
        }
        FormatReport::Unsupported(encoding) => {
            eprintln!("{}", DecodeError::UnsupportedFormat(encoding));
        }
    }
}
