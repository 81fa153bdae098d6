//! # MPEG Audio Frame Parser
//!
//! Splits a raw MPEG-1/2/2.5 audio elementary stream (layers I, II, III) into
//! frames.
//!
//! Frames lying wholly inside the input are handed back as views of it. A
//! frame cut by the end of the input is staged in the parser and completed on
//! later calls. Bytes that cannot start a frame are consumed and dropped, and
//! ID3v2 tags are skipped even when they span several inputs.
//!
//! After junk, a sync word only counts once the header of the next frame
//! follows it with the same version, layer and sample rate. The last frame of
//! the stream has no successor and is handed out by
//! [`BitstreamParser::finish`].

use crate::error::Result;
use crate::traits::{BitstreamParser, Parsed};
use tracing::{debug, trace};

/// Frame header size in bytes.
pub const HEADER_LEN: usize = 4;

/// Largest possible frame (MPEG-2.5 Layer II, 160 kbps, 8 kHz, padded).
pub const MAX_FRAME_LEN: usize = 2881;

const ID3_HEADER_LEN: usize = 10;

/// MPEG audio version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MpegVersion {
    Mpeg1,
    Mpeg2,
    /// Unofficial low-sample-rate extension
    Mpeg25,
}

/// MPEG audio layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MpegLayer {
    Layer1,
    Layer2,
    Layer3,
}

/// Bitrates in kbps, MPEG-1, indexed by layer then bitrate index.
const MPEG1_BITRATES: [[u32; 15]; 3] = [
    [0, 32, 64, 96, 128, 160, 192, 224, 256, 288, 320, 352, 384, 416, 448],
    [0, 32, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384],
    [0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320],
];

/// Bitrates in kbps, MPEG-2 and 2.5. Layers II and III share a table.
const MPEG2_BITRATES: [[u32; 15]; 3] = [
    [0, 32, 48, 56, 64, 80, 96, 112, 128, 144, 160, 176, 192, 224, 256],
    [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160],
    [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160],
];

const MPEG1_SAMPLE_RATES: [u32; 3] = [44100, 48000, 32000];
const MPEG2_SAMPLE_RATES: [u32; 3] = [22050, 24000, 16000];
const MPEG25_SAMPLE_RATES: [u32; 3] = [11025, 12000, 8000];

/// Decoded 4-byte frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub version: MpegVersion,
    pub layer: MpegLayer,
    /// A 16-bit CRC follows the header
    pub crc_protected: bool,
    /// Bitrate in bits per second
    pub bitrate: u32,
    /// Sample rate in Hz
    pub sample_rate: u32,
    pub padding: bool,
    /// 0 = stereo, 1 = joint stereo, 2 = dual channel, 3 = mono
    pub channel_mode: u8,
    /// Total frame size in bytes, header included
    pub frame_len: usize,
}

impl FrameHeader {
    /// Parse a header from the first four bytes of `bytes`.
    ///
    /// Returns `None` for anything that is not a decodable header, including
    /// free-format streams and reserved field values.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < HEADER_LEN || bytes[0] != 0xFF || bytes[1] & 0xE0 != 0xE0 {
            return None;
        }

        let version = match (bytes[1] >> 3) & 0x03 {
            0b11 => MpegVersion::Mpeg1,
            0b10 => MpegVersion::Mpeg2,
            0b00 => MpegVersion::Mpeg25,
            _ => return None,
        };

        let layer = match (bytes[1] >> 1) & 0x03 {
            0b11 => MpegLayer::Layer1,
            0b10 => MpegLayer::Layer2,
            0b01 => MpegLayer::Layer3,
            _ => return None,
        };

        let bitrate_index = (bytes[2] >> 4) as usize;
        let rate_index = ((bytes[2] >> 2) & 0x03) as usize;
        if bitrate_index == 0 || bitrate_index == 15 || rate_index == 3 {
            return None;
        }

        // Emphasis value 2 is reserved
        if bytes[3] & 0x03 == 0x02 {
            return None;
        }

        let layer_index = match layer {
            MpegLayer::Layer1 => 0,
            MpegLayer::Layer2 => 1,
            MpegLayer::Layer3 => 2,
        };

        let (bitrates, sample_rates) = match version {
            MpegVersion::Mpeg1 => (&MPEG1_BITRATES, &MPEG1_SAMPLE_RATES),
            MpegVersion::Mpeg2 => (&MPEG2_BITRATES, &MPEG2_SAMPLE_RATES),
            MpegVersion::Mpeg25 => (&MPEG2_BITRATES, &MPEG25_SAMPLE_RATES),
        };

        let bitrate = bitrates[layer_index][bitrate_index] * 1000;
        let sample_rate = sample_rates[rate_index];
        let padding = (bytes[2] >> 1) & 0x01 == 1;
        let pad = padding as usize;

        let frame_len = match (layer, version) {
            (MpegLayer::Layer1, _) => (12 * bitrate as usize / sample_rate as usize + pad) * 4,
            (MpegLayer::Layer2, _) | (MpegLayer::Layer3, MpegVersion::Mpeg1) => {
                144 * bitrate as usize / sample_rate as usize + pad
            }
            (MpegLayer::Layer3, _) => 72 * bitrate as usize / sample_rate as usize + pad,
        };

        Some(Self {
            version,
            layer,
            crc_protected: bytes[1] & 0x01 == 0,
            bitrate,
            sample_rate,
            padding,
            channel_mode: bytes[3] >> 6,
            frame_len,
        })
    }

    pub fn channels(&self) -> u16 {
        if self.channel_mode == 3 {
            1
        } else {
            2
        }
    }

    pub fn samples_per_frame(&self) -> usize {
        match (self.layer, self.version) {
            (MpegLayer::Layer1, _) => 384,
            (MpegLayer::Layer2, _) | (MpegLayer::Layer3, MpegVersion::Mpeg1) => 1152,
            (MpegLayer::Layer3, _) => 576,
        }
    }

    /// Returns `true` if `next` starts with a header of the same stream.
    pub fn is_followed_by(&self, next: &[u8]) -> bool {
        FrameHeader::parse(next).map_or(false, |next| {
            next.version == self.version
                && next.layer == self.layer
                && next.sample_rate == self.sample_rate
        })
    }
}

/// State of the frame at the front of the staging buffer.
enum Staged {
    Frame(usize),
    Incomplete,
    /// The next header is missing, so the sync word was not a frame.
    FalseSync,
}

/// Returns `true` if `prefix` (shorter than a header) could still grow into a
/// valid header.
fn could_start_header(prefix: &[u8]) -> bool {
    if prefix.len() >= HEADER_LEN {
        return FrameHeader::parse(prefix).is_some();
    }

    if let Some(&b0) = prefix.first() {
        if b0 != 0xFF {
            return false;
        }
    }

    if let Some(&b1) = prefix.get(1) {
        let version_reserved = (b1 >> 3) & 0x03 == 0b01;
        let layer_reserved = (b1 >> 1) & 0x03 == 0b00;
        if b1 & 0xE0 != 0xE0 || version_reserved || layer_reserved {
            return false;
        }
    }

    if let Some(&b2) = prefix.get(2) {
        let bitrate_index = b2 >> 4;
        if bitrate_index == 0 || bitrate_index == 15 || (b2 >> 2) & 0x03 == 3 {
            return false;
        }
    }

    true
}

/// Total size of an ID3v2 tag starting at `bytes`, footer included.
fn id3v2_tag_len(bytes: &[u8]) -> Option<usize> {
    if bytes.len() < ID3_HEADER_LEN || !bytes.starts_with(b"ID3") {
        return None;
    }

    if bytes[3] == 0xFF || bytes[4] == 0xFF || bytes[6..10].iter().any(|&b| b & 0x80 != 0) {
        return None;
    }

    let size = bytes[6..10]
        .iter()
        .fold(0usize, |acc, &b| (acc << 7) | b as usize);
    let footer = if bytes[5] & 0x10 != 0 { ID3_HEADER_LEN } else { 0 };

    Some(ID3_HEADER_LEN + size + footer)
}

/// Incremental MPEG audio frame splitter.
#[derive(Debug, Default)]
pub struct MpegAudioParser {
    /// Partial frame carried across calls
    staging: Vec<u8>,
    /// Bytes at the front of `staging` handed out by the previous call
    emitted: usize,
    /// Tag bytes still to discard
    skip: usize,
    /// Junk was dropped since the last frame, so the next sync needs confirming
    resyncing: bool,
    frames: u64,
    junk_bytes: u64,
}

impl MpegAudioParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames produced so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Bytes discarded while hunting for a frame sync.
    pub fn junk_bytes(&self) -> u64 {
        self.junk_bytes
    }

    /// Bytes of an incomplete frame currently held back.
    pub fn staged(&self) -> usize {
        self.staging.len() - self.emitted
    }

    /// Look for the next frame in `input` with nothing staged.
    fn scan<'a>(&'a mut self, input: &'a [u8]) -> Parsed<'a> {
        let mut pos = 0;

        while pos < input.len() {
            let rest = &input[pos..];

            if let Some(tag_len) = id3v2_tag_len(rest) {
                let taken = tag_len.min(rest.len());
                self.skip = tag_len - taken;
                self.note_junk(pos);
                debug!(tag_len, "Skipping ID3v2 tag");
                return Parsed::consumed(pos + taken);
            }

            if rest[0] == 0xFF {
                if rest.len() < HEADER_LEN {
                    if could_start_header(rest) {
                        self.note_junk(pos);
                        self.staging.extend_from_slice(rest);
                        return Parsed::consumed(input.len());
                    }
                } else if let Some(header) = FrameHeader::parse(rest) {
                    let len = header.frame_len;
                    let confirmed = !self.resyncing && pos == 0;
                    let needed = if confirmed { len } else { len + HEADER_LEN };

                    if rest.len() < needed {
                        self.note_junk(pos);
                        self.staging.extend_from_slice(rest);
                        return Parsed::consumed(input.len());
                    }

                    if confirmed || header.is_followed_by(&rest[len..]) {
                        self.note_junk(pos);
                        self.resyncing = false;
                        self.frames += 1;
                        trace!(len, "Frame in window");
                        return Parsed::unit(pos + len, &rest[..len]);
                    }

                    trace!(pos, "Sync word without a following frame");
                }
            }

            pos += 1;
        }

        self.note_junk(input.len());
        Parsed::consumed(input.len())
    }

    /// Grow the staged partial frame from `input`.
    fn top_up<'a>(&'a mut self, input: &'a [u8]) -> Parsed<'a> {
        let mut consumed = 0;

        loop {
            self.resync();

            match self.staged_frame() {
                Staged::Frame(len) => {
                    if consumed == 0 {
                        // Staging already held the whole frame; still take a byte.
                        self.staging.push(input[0]);
                        consumed = 1;
                    }
                    self.resyncing = false;
                    self.frames += 1;
                    self.emitted = len;
                    trace!(len, "Frame completed from staging");
                    return Parsed::unit(consumed, &self.staging[..len]);
                }
                Staged::FalseSync => {
                    self.staging.drain(..1);
                    self.note_junk(1);
                    continue;
                }
                Staged::Incomplete => {}
            }

            if self.staging.is_empty() {
                let rest = self.scan(&input[consumed..]);
                return Parsed {
                    consumed: consumed + rest.consumed,
                    unit: rest.unit,
                };
            }

            if consumed == input.len() {
                return Parsed::consumed(consumed);
            }

            let take = self.wanted().min(input.len() - consumed);
            self.staging
                .extend_from_slice(&input[consumed..consumed + take]);
            consumed += take;
        }
    }

    /// Drop staged bytes until they start with something header-like.
    fn resync(&mut self) {
        while !could_start_header(&self.staging) {
            let dropped = self.staging[1..]
                .iter()
                .position(|&b| b == 0xFF)
                .map_or(self.staging.len(), |p| p + 1);
            self.staging.drain(..dropped);
            self.note_junk(dropped);
        }
    }

    fn staged_frame(&self) -> Staged {
        let header = match FrameHeader::parse(&self.staging) {
            Some(header) => header,
            None => return Staged::Incomplete,
        };
        let len = header.frame_len;

        if !self.resyncing {
            if self.staging.len() >= len {
                Staged::Frame(len)
            } else {
                Staged::Incomplete
            }
        } else if self.staging.len() < len + HEADER_LEN {
            Staged::Incomplete
        } else if header.is_followed_by(&self.staging[len..]) {
            Staged::Frame(len)
        } else {
            Staged::FalseSync
        }
    }

    /// Bytes needed to finish the staged header or frame, plus the next
    /// header while resyncing.
    fn wanted(&self) -> usize {
        if self.staging.len() < HEADER_LEN {
            return HEADER_LEN - self.staging.len();
        }

        let lookahead = if self.resyncing { HEADER_LEN } else { 0 };
        FrameHeader::parse(&self.staging)
            .map_or(1, |header| {
                (header.frame_len + lookahead).saturating_sub(self.staging.len())
            })
            .max(1)
    }

    fn note_junk(&mut self, bytes: usize) {
        if bytes > 0 {
            self.resyncing = true;
            self.junk_bytes += bytes as u64;
            trace!(bytes, "Discarded bytes without frame sync");
        }
    }
}

impl BitstreamParser for MpegAudioParser {
    fn parse<'a>(&'a mut self, input: &'a [u8]) -> Result<Parsed<'a>> {
        if self.emitted > 0 {
            self.staging.drain(..self.emitted);
            self.emitted = 0;
        }

        if input.is_empty() {
            return Ok(Parsed::consumed(0));
        }

        if self.skip > 0 {
            let taken = self.skip.min(input.len());
            self.skip -= taken;
            return Ok(Parsed::consumed(taken));
        }

        if self.staging.is_empty() {
            Ok(self.scan(input))
        } else {
            Ok(self.top_up(input))
        }
    }

    fn finish(&mut self) -> Option<&[u8]> {
        if self.emitted > 0 {
            self.staging.drain(..self.emitted);
            self.emitted = 0;
        }

        let len = FrameHeader::parse(&self.staging)
            .map(|header| header.frame_len)
            .filter(|&len| self.staging.len() >= len)?;

        self.frames += 1;
        self.emitted = len;
        debug!(len, "Final frame taken without a successor");
        Some(&self.staging[..len])
    }
}
