//! # Sample Plane Converter
//!
//! Copies Symphonia's decoded buffers into native-endian byte planes, one per
//! channel, without touching sample values.

use crate::traits::SampleEncoding;
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::conv::IntoSample;
use symphonia::core::sample::{i24, u24, Sample};

/// Converts Symphonia audio buffers into byte planes.
///
/// Symphonia always hands out planar buffers. Encodings with a raw PCM
/// counterpart (u8, i16, i32, f32, f64) are copied as-is; the odd widths are
/// widened to the nearest one that has a counterpart:
/// - i8, u16 → s16
/// - i24, u24, u32 → s32
pub struct SampleConverter;

impl SampleConverter {
    /// Fill `planes` from `buffer` and return the resulting encoding.
    ///
    /// `planes` is resized to the channel count; existing allocations are
    /// reused across calls.
    pub fn to_planes(buffer: &AudioBufferRef<'_>, planes: &mut Vec<Vec<u8>>) -> SampleEncoding {
        match buffer {
            AudioBufferRef::U8(buf) => {
                Self::copy_planes(&**buf, planes, |s: u8| [s]);
                SampleEncoding::U8Planar
            }
            AudioBufferRef::S16(buf) => {
                Self::copy_planes(&**buf, planes, |s: i16| s.to_ne_bytes());
                SampleEncoding::S16Planar
            }
            AudioBufferRef::S32(buf) => {
                Self::copy_planes(&**buf, planes, |s: i32| s.to_ne_bytes());
                SampleEncoding::S32Planar
            }
            AudioBufferRef::F32(buf) => {
                Self::copy_planes(&**buf, planes, |s: f32| s.to_ne_bytes());
                SampleEncoding::F32Planar
            }
            AudioBufferRef::F64(buf) => {
                Self::copy_planes(&**buf, planes, |s: f64| s.to_ne_bytes());
                SampleEncoding::F64Planar
            }
            AudioBufferRef::S8(buf) => {
                Self::copy_planes(&**buf, planes, |s: i8| {
                    IntoSample::<i16>::into_sample(s).to_ne_bytes()
                });
                SampleEncoding::S16Planar
            }
            AudioBufferRef::U16(buf) => {
                Self::copy_planes(&**buf, planes, |s: u16| {
                    IntoSample::<i16>::into_sample(s).to_ne_bytes()
                });
                SampleEncoding::S16Planar
            }
            AudioBufferRef::S24(buf) => {
                Self::copy_planes(&**buf, planes, |s: i24| {
                    IntoSample::<i32>::into_sample(s).to_ne_bytes()
                });
                SampleEncoding::S32Planar
            }
            AudioBufferRef::U24(buf) => {
                Self::copy_planes(&**buf, planes, |s: u24| {
                    IntoSample::<i32>::into_sample(s).to_ne_bytes()
                });
                SampleEncoding::S32Planar
            }
            AudioBufferRef::U32(buf) => {
                Self::copy_planes(&**buf, planes, |s: u32| {
                    IntoSample::<i32>::into_sample(s).to_ne_bytes()
                });
                SampleEncoding::S32Planar
            }
        }
    }

    fn copy_planes<T, const N: usize>(
        buf: &AudioBuffer<T>,
        planes: &mut Vec<Vec<u8>>,
        to_bytes: impl Fn(T) -> [u8; N],
    ) where
        T: Sample,
    {
        let channels = buf.spec().channels.count();
        let frames = buf.frames();

        planes.resize_with(channels, Vec::new);
        for (ch, plane) in planes.iter_mut().enumerate() {
            plane.clear();
            plane.reserve(frames * N);
            for &sample in &buf.chan(ch)[..frames] {
                plane.extend_from_slice(&to_bytes(sample));
            }
        }
    }
}
