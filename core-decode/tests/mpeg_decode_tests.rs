//! File-to-file tests through the MPEG audio parser and the Symphonia engine.

use core_decode::{
    decode_file, ChannelPolicy, DecodeConfig, DecodeError, FormatReport, SampleEncoding,
};
use std::fs;
use std::path::PathBuf;

/// MPEG-1 Layer III, 128 kbps, 44.1 kHz, stereo, all-zero side info and
/// main data: decodes to 1152 samples of silence per channel.
fn silent_frame() -> Vec<u8> {
    let mut frame = vec![0u8; 417];
    frame[..4].copy_from_slice(&[0xFF, 0xFB, 0x90, 0x00]);
    frame
}

fn silent_stream(frames: usize) -> Vec<u8> {
    (0..frames).flat_map(|_| silent_frame()).collect()
}

/// Valid header, garbage side info and main data.
fn corrupt_frame() -> Vec<u8> {
    let mut frame = vec![0xA5u8; 417];
    frame[..4].copy_from_slice(&[0xFF, 0xFB, 0x90, 0x00]);
    frame
}

/// Bytes of PCM for `frames` stereo f32 Layer III frames.
fn pcm_len(frames: u64) -> u64 {
    frames * 1152 * 2 * 4
}

fn temp_path(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!("pcmdump-{}-{}", tag, uuid::Uuid::new_v4()))
}

struct TempFiles {
    input: PathBuf,
    output: PathBuf,
}

impl TempFiles {
    fn with_input(data: &[u8]) -> Self {
        let files = Self {
            input: temp_path("in.mp3"),
            output: temp_path("out.pcm"),
        };
        fs::write(&files.input, data).unwrap();
        files
    }
}

impl Drop for TempFiles {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.input);
        let _ = fs::remove_file(&self.output);
    }
}

#[test]
fn test_silent_stream_decodes_to_float_planar() {
    let files = TempFiles::with_input(&silent_stream(20));

    let report = decode_file(&files.input, &files.output, &DecodeConfig::default()).unwrap();

    assert_eq!(report.native.encoding, SampleEncoding::F32Planar);
    assert_eq!(report.native.channels, 2);
    assert_eq!(report.native.sample_rate, 44100);
    assert_eq!(report.stats.units_submitted, 20);
    assert!(report.stats.frames_emitted > 0);

    let written = fs::metadata(&files.output).unwrap().len();
    assert_eq!(written, report.stats.bytes_written);
    assert_eq!(written, pcm_len(report.stats.frames_emitted));

    match report.format {
        FormatReport::Resolved(descriptor) => {
            assert_eq!(descriptor.format.encoding, SampleEncoding::F32);
            assert_eq!(descriptor.channels, 2);
        }
        other => panic!("expected resolved format, got {:?}", other),
    }
}

#[test]
fn test_first_channel_halves_output() {
    let files = TempFiles::with_input(&silent_stream(10));
    let config = DecodeConfig {
        channel_policy: ChannelPolicy::FirstChannel,
        ..Default::default()
    };

    let report = decode_file(&files.input, &files.output, &config).unwrap();

    assert_eq!(report.emitted_channels, 1);
    assert_eq!(
        fs::metadata(&files.output).unwrap().len(),
        report.stats.frames_emitted * 1152 * 4
    );
}

#[test]
fn test_small_window_matches_default_window() {
    let mut data = b"ID3\x04\x00\x00\x00\x00\x00\x20".to_vec();
    data.extend([0u8; 32]);
    data.extend(silent_stream(30));
    data.extend([0x00, 0x12, 0x34]);

    let a = TempFiles::with_input(&data);
    let b = TempFiles::with_input(&data);

    decode_file(&a.input, &a.output, &DecodeConfig::default()).unwrap();
    decode_file(&b.input, &b.output, &DecodeConfig::small_window()).unwrap();

    assert_eq!(fs::read(&a.output).unwrap(), fs::read(&b.output).unwrap());
}

#[test]
fn test_stream_without_frames_reports_unsupported() {
    let files = TempFiles::with_input(&[0x00; 1000]);

    let report = decode_file(&files.input, &files.output, &DecodeConfig::default()).unwrap();

    assert_eq!(report.stats.units_parsed, 0);
    assert_eq!(report.format, FormatReport::Unsupported(SampleEncoding::None));
    assert_eq!(fs::metadata(&files.output).unwrap().len(), 0);
}

#[test]
fn test_missing_input_is_fatal() {
    let input = temp_path("missing.mp3");
    let output = temp_path("never.pcm");

    let err = decode_file(&input, &output, &DecodeConfig::default()).unwrap_err();

    assert!(matches!(err, DecodeError::SourceError(_)));
    assert!(!output.exists());
}

#[test]
fn test_sync_word_in_leading_junk_is_ignored() {
    let mut data = vec![0x00, 0xFF, 0xFB, 0x90, 0x00, 0x00];
    data.extend(silent_stream(10));
    let noisy = TempFiles::with_input(&data);
    let clean = TempFiles::with_input(&silent_stream(10));

    let report = decode_file(&noisy.input, &noisy.output, &DecodeConfig::default()).unwrap();
    decode_file(&clean.input, &clean.output, &DecodeConfig::default()).unwrap();

    assert_eq!(report.stats.units_submitted, 10);
    assert_eq!(
        fs::read(&noisy.output).unwrap(),
        fs::read(&clean.output).unwrap()
    );
}

#[test]
fn test_isolated_corrupt_frame_is_skipped() {
    let mut data = silent_stream(5);
    data.extend(corrupt_frame());
    data.extend(silent_stream(5));
    let files = TempFiles::with_input(&data);

    let report = decode_file(&files.input, &files.output, &DecodeConfig::default()).unwrap();

    assert_eq!(report.stats.units_submitted, 11);
    assert_eq!(report.stats.frames_emitted, 10);
    assert_eq!(fs::metadata(&files.output).unwrap().len(), pcm_len(10));
}

#[test]
fn test_run_of_corrupt_frames_is_fatal() {
    let data: Vec<u8> = (0..12).flat_map(|_| corrupt_frame()).collect();
    let files = TempFiles::with_input(&data);

    let err = decode_file(&files.input, &files.output, &DecodeConfig::default()).unwrap_err();

    assert!(matches!(err, DecodeError::Decoding(_)));
    assert!(err.is_fatal());

    // Output was closed on the error path and holds no samples
    let mut reopened = fs::OpenOptions::new().append(true).open(&files.output).unwrap();
    std::io::Write::write_all(&mut reopened, b"x").unwrap();
    drop(reopened);
    assert_eq!(fs::read(&files.output).unwrap(), b"x");
}
