//! Volume scaling and sample conversion
//!
//! A gain is a guest volume shifted left by one, so `0x10000` is unity and
//! `out = clamp_s16((sample * gain) >> 16)`. The scalar routines here are the
//! reference; the accelerated kernel must match them bit for bit.

#[cfg(target_arch = "x86_64")]
mod sse2;


use crate::channel::MAX_VOLUME;

/// Gain that leaves samples untouched.
pub const UNITY_GAIN: u32 = 0x10000;

/// Largest gain the accelerated kernel handles exactly.
pub const MAX_KERNEL_GAIN: u32 = MAX_VOLUME << 1;

/// Scaling gain for a guest volume.
#[inline]
pub fn gain_for(volume: u32) -> u32 {
    volume.min(MAX_VOLUME) << 1
}

/// Hard clip to the signed 16-bit range.
#[inline]
pub fn clamp_s16(value: i32) -> i16 {
    value.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

/// Scale one sample: `clamp_s16((sample * gain) >> 16)` with a flooring shift.
#[inline]
pub fn adjust_volume(sample: i16, gain: u32) -> i16 {
    let scaled = (sample as i64 * gain as i64) >> 16;
    scaled.clamp(i16::MIN as i64, i16::MAX as i64) as i16
}

/// Add interleaved samples into the 32-bit accumulator.
#[inline]
pub fn accumulate(acc: &mut [i32], samples: &[i16]) {
    for (a, &s) in acc.iter_mut().zip(samples) {
        *a += s as i32;
    }
}

/// Scale/clamp implementation chosen at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleKernel {
    /// Portable reference path
    Scalar,
    /// 128-bit integer SIMD, x86_64 only
    Sse2,
}

impl ScaleKernel {
    /// Pick the fastest kernel the running CPU supports.
    pub fn detect() -> Self {
        if accelerated_available() {
            Self::Sse2
        } else {
            Self::Scalar
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Scalar => "scalar",
            Self::Sse2 => "sse2",
        }
    }

    /// Scale interleaved little-endian stereo source bytes into `dst`.
    ///
    /// `dst[i]` takes the sample at `src[2 * i..2 * i + 2]`. `phase` is the
    /// interleave position of `dst[0]` (even = left), so a ring segment that
    /// starts on a right sample still gets the right gain.
    pub fn scale_stereo(self, src: &[u8], dst: &mut [i16], gains: [u32; 2], phase: usize) {
        debug_assert!(src.len() >= dst.len() * 2);
        let (src, dst) = if phase % 2 == 1 && !dst.is_empty() {
            dst[0] = adjust_volume(sample_at(src, 0), gains[1]);
            (&src[2..], &mut dst[1..])
        } else {
            (src, dst)
        };

        let [left, right] = gains;
        let exact = left % 2 == 0 && right % 2 == 0 && left.max(right) <= MAX_KERNEL_GAIN;
        if self == Self::Sse2 && exact && scale_accelerated(src, dst, left >> 1, right >> 1) {
            return;
        }
        scale_stereo_scalar(src, dst, gains);
    }

    /// Clamp accumulator values to 16 bits.
    pub fn clamp(self, acc: &[i32], dst: &mut [i16]) {
        debug_assert!(acc.len() >= dst.len());
        if self == Self::Sse2 && clamp_accelerated(acc, dst) {
            return;
        }
        clamp_scalar(acc, dst);
    }
}

/// Reference stereo scaler; `dst[0]` is a left sample.
pub fn scale_stereo_scalar(src: &[u8], dst: &mut [i16], gains: [u32; 2]) {
    for (i, out) in dst.iter_mut().enumerate() {
        *out = adjust_volume(sample_at(src, i), gains[i % 2]);
    }
}

/// Reference clamp.
pub fn clamp_scalar(acc: &[i32], dst: &mut [i16]) {
    for (out, &value) in dst.iter_mut().zip(acc) {
        *out = clamp_s16(value);
    }
}

#[inline]
fn sample_at(src: &[u8], index: usize) -> i16 {
    i16::from_le_bytes([src[index * 2], src[index * 2 + 1]])
}

#[cfg(target_arch = "x86_64")]
fn accelerated_available() -> bool {
    is_x86_feature_detected!("sse2")
}

#[cfg(not(target_arch = "x86_64"))]
fn accelerated_available() -> bool {
    false
}

#[cfg(target_arch = "x86_64")]
fn scale_accelerated(src: &[u8], dst: &mut [i16], left_volume: u32, right_volume: u32) -> bool {
    if !is_x86_feature_detected!("sse2") {
        return false;
    }
    // SAFETY: sse2 support was just checked.
    unsafe { sse2::scale_stereo(src, dst, left_volume as u16, right_volume as u16) };
    true
}

#[cfg(not(target_arch = "x86_64"))]
fn scale_accelerated(_src: &[u8], _dst: &mut [i16], _left_volume: u32, _right_volume: u32) -> bool {
    false
}

#[cfg(target_arch = "x86_64")]
fn clamp_accelerated(acc: &[i32], dst: &mut [i16]) -> bool {
    if !is_x86_feature_detected!("sse2") {
        return false;
    }
    // SAFETY: sse2 support was just checked.
    unsafe { sse2::clamp(acc, dst) };
    true
}

#[cfg(not(target_arch = "x86_64"))]
fn clamp_accelerated(_acc: &[i32], _dst: &mut [i16]) -> bool {
    false
}
