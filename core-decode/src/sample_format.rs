//! # Sample Format Resolver
//!
//! Maps a packed sample encoding to the name raw-PCM tools use for it
//! (`-f s16le` and friends), picking the host byte order.

use crate::error::{DecodeError, Result};
use crate::traits::SampleEncoding;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Byte order of multi-byte samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endianness {
    Little,
    Big,
}

impl Endianness {
    /// Byte order of the machine running the converter.
    pub fn native() -> Self {
        if cfg!(target_endian = "big") {
            Endianness::Big
        } else {
            Endianness::Little
        }
    }
}

impl fmt::Display for Endianness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endianness::Little => f.write_str("little-endian"),
            Endianness::Big => f.write_str("big-endian"),
        }
    }
}

/// Raw PCM format name plus the byte order it implies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OutputFormat {
    pub encoding: SampleEncoding,
    pub name: &'static str,
    pub endianness: Endianness,
}

struct FormatEntry {
    encoding: SampleEncoding,
    big_endian: &'static str,
    little_endian: &'static str,
}

const FORMAT_TABLE: [FormatEntry; 5] = [
    FormatEntry {
        encoding: SampleEncoding::U8,
        big_endian: "u8",
        little_endian: "u8",
    },
    FormatEntry {
        encoding: SampleEncoding::S16,
        big_endian: "s16be",
        little_endian: "s16le",
    },
    FormatEntry {
        encoding: SampleEncoding::S32,
        big_endian: "s32be",
        little_endian: "s32le",
    },
    FormatEntry {
        encoding: SampleEncoding::F32,
        big_endian: "f32be",
        little_endian: "f32le",
    },
    FormatEntry {
        encoding: SampleEncoding::F64,
        big_endian: "f64be",
        little_endian: "f64le",
    },
];

/// Resolve `encoding` for the host byte order.
///
/// Only packed encodings appear in the table; callers convert planar
/// encodings with [`SampleEncoding::packed`] first.
pub fn resolve(encoding: SampleEncoding) -> Result<OutputFormat> {
    resolve_for(encoding, Endianness::native())
}

/// Resolve `encoding` for an explicit byte order.
pub fn resolve_for(encoding: SampleEncoding, endianness: Endianness) -> Result<OutputFormat> {
    let entry = FORMAT_TABLE
        .iter()
        .find(|entry| entry.encoding == encoding)
        .ok_or(DecodeError::UnsupportedFormat(encoding))?;

    let name = match endianness {
        Endianness::Big => entry.big_endian,
        Endianness::Little => entry.little_endian,
    };

    Ok(OutputFormat {
        encoding,
        name,
        endianness,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolves_every_table_entry() {
        let cases = [
            (SampleEncoding::U8, "u8", "u8"),
            (SampleEncoding::S16, "s16le", "s16be"),
            (SampleEncoding::S32, "s32le", "s32be"),
            (SampleEncoding::F32, "f32le", "f32be"),
            (SampleEncoding::F64, "f64le", "f64be"),
        ];

        for (encoding, le, be) in cases {
            assert_eq!(resolve_for(encoding, Endianness::Little).unwrap().name, le);
            assert_eq!(resolve_for(encoding, Endianness::Big).unwrap().name, be);
        }
    }

    #[test]
    fn test_native_resolution_matches_host() {
        let format = resolve(SampleEncoding::S16).unwrap();
        if cfg!(target_endian = "little") {
            assert_eq!(format.name, "s16le");
            assert_eq!(format.endianness, Endianness::Little);
        } else {
            assert_eq!(format.name, "s16be");
        }
    }

    #[test]
    fn test_unsupported_encodings() {
        for encoding in [
            SampleEncoding::None,
            SampleEncoding::S64,
            SampleEncoding::F32Planar,
        ] {
            match resolve(encoding) {
                Err(DecodeError::UnsupportedFormat(e)) => assert_eq!(e, encoding),
                other => panic!("expected UnsupportedFormat, got {:?}", other),
            }
        }
    }
}
