//! SSE2 scale and clamp kernels
//!
//! For an even gain `2 * v` with `v` in `[0, 0xFFFF]`,
//! `(s * 2v) >> 16 == (s * v) >> 15`, and `s * v` always fits in 32 bits.
//! The product is rebuilt from signed 16-bit multiplies: `mulhi` treats `v`
//! as signed, so lanes with `v >= 0x8000` add `s` back into the high half.

use std::arch::x86_64::*;

use super::{clamp_scalar, scale_stereo_scalar};

/// Samples handled per loop iteration.
const BLOCK: usize = 16;

/// Scale interleaved stereo; `dst[0]` is a left sample.
///
/// # Safety
/// The CPU must support SSE2 and `src` must hold `2 * dst.len()` bytes.
#[target_feature(enable = "sse2")]
pub(super) unsafe fn scale_stereo(src: &[u8], dst: &mut [i16], left: u16, right: u16) {
    let blocks = dst.len() / BLOCK;
    let mask_l: i16 = if left >= 0x8000 { -1 } else { 0 };
    let mask_r: i16 = if right >= 0x8000 { -1 } else { 0 };
    let (l, r) = (left as i16, right as i16);

    unsafe {
        let gain = _mm_setr_epi16(l, r, l, r, l, r, l, r);
        let mask = _mm_setr_epi16(mask_l, mask_r, mask_l, mask_r, mask_l, mask_r, mask_l, mask_r);
        let src_ptr = src.as_ptr();
        let dst_ptr = dst.as_mut_ptr();

        for block in 0..blocks {
            for half in 0..2 {
                let offset = block * BLOCK + half * 8;
                let s = _mm_loadu_si128(src_ptr.add(offset * 2) as *const __m128i);
                let lo = _mm_mullo_epi16(s, gain);
                let hi = _mm_add_epi16(_mm_mulhi_epi16(s, gain), _mm_and_si128(s, mask));
                let p0 = _mm_srai_epi32(_mm_unpacklo_epi16(lo, hi), 15);
                let p1 = _mm_srai_epi32(_mm_unpackhi_epi16(lo, hi), 15);
                _mm_storeu_si128(dst_ptr.add(offset) as *mut __m128i, _mm_packs_epi32(p0, p1));
            }
        }
    }

    let done = blocks * BLOCK;
    scale_stereo_scalar(
        &src[done * 2..],
        &mut dst[done..],
        [(left as u32) << 1, (right as u32) << 1],
    );
}

/// Saturate 32-bit accumulators into 16-bit samples.
///
/// # Safety
/// The CPU must support SSE2 and `acc` must hold `dst.len()` values.
#[target_feature(enable = "sse2")]
pub(super) unsafe fn clamp(acc: &[i32], dst: &mut [i16]) {
    let chunks = dst.len() / 8;

    unsafe {
        let acc_ptr = acc.as_ptr();
        let dst_ptr = dst.as_mut_ptr();
        for chunk in 0..chunks {
            let offset = chunk * 8;
            let a = _mm_loadu_si128(acc_ptr.add(offset) as *const __m128i);
            let b = _mm_loadu_si128(acc_ptr.add(offset + 4) as *const __m128i);
            _mm_storeu_si128(dst_ptr.add(offset) as *mut __m128i, _mm_packs_epi32(a, b));
        }
    }

    let done = chunks * 8;
    clamp_scalar(&acc[done..], &mut dst[done..]);
}
