//! Math backend selection and phase/value helpers shared by the waveform code.
//!
//! Design goals:
//! - `no_std` ready (guarded by the crate feature `no-std`)
//! - Math backend selection that works in both `std` and `no_std` contexts
//! - Optional `fast-math` approximations for the per-sample sine path
//! - Clean, side-effect free helpers that are easy to test
//!
//! Conventions:
//! - Phase positions are fractional cycles; `wrap01` maps them into [0, 1).
//! - All functions are `#[inline]` where useful to help the optimizer.

#![allow(clippy::excessive_precision)]

use core::f32::consts::PI;

use cfg_if::cfg_if;

// ----------------------------- Math backend selection -----------------------------

cfg_if! {
    // micromath preferred if explicitly requested (works in no_std)
    if #[cfg(feature = "micromath")] {
        use micromath::F32Ext as _;
        #[inline] fn m_sin(x: f32) -> f32 { x.sin() }
    // libm (C math) in no_std
    } else if #[cfg(feature = "no-std")] {
        #[inline] fn m_sin(x: f32) -> f32 { libm::sinf(x) }
    // std backend
    } else {
        #[inline] fn m_sin(x: f32) -> f32 { x.sin() }
    }
}

// --------------------------------- Constants -------------------------------------

/// 2π (one full cycle in radians)
pub const TAU: f32 = 2.0 * PI;

// --------------------------------- Utilities -------------------------------------

/// Wrap a phase position into [0, 1). Correct for negative inputs.
#[inline]
pub fn wrap01(p: f32) -> f32 {
    let r = p % 1.0;
    if r < 0.0 {
        r + 1.0
    } else {
        r
    }
}

#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Mask NaN/Inf to 0.0 so a degenerate value never reaches an audio buffer.
#[inline]
pub fn finite_or_zero(x: f32) -> f32 {
    if x.is_finite() {
        x
    } else {
        0.0
    }
}

// --------------------------------- Sine ------------------------------------------

/// Sine with range reduction into [-π, π] and a 5th-order minimax-style poly
/// when `fast-math` is enabled; exact otherwise. Max abs error ~1e-3 in the
/// fast path, fine for musical uses.
#[inline]
pub fn sin(x: f32) -> f32 {
    #[cfg(feature = "fast-math")]
    {
        // Range reduce to [-π, π].
        let k = (x / TAU).round();
        let xr = x - k * TAU;

        // 5th-order odd polynomial: sin(x) ≈ x * (a + b x^2 + c x^4)
        let x2 = xr * xr;
        return xr * (0.999_979_313_3 + x2 * (-0.166_624_432_0 + x2 * 0.008_308_978_98));
    }
    #[allow(unreachable_code)]
    m_sin(x)
}

// --------------------------------- Tests (std only) ------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap01_stays_in_unit_interval() {
        for p in [-3.75, -1.0, -0.25, 0.0, 0.25, 0.999, 1.0, 2.5, 1234.625] {
            let w = wrap01(p);
            assert!((0.0..1.0).contains(&w), "p={} w={}", p, w);
        }
    }

    #[test]
    fn wrap01_preserves_fraction() {
        assert!((wrap01(2.25) - 0.25).abs() < 1e-6);
        assert!((wrap01(-0.25) - 0.75).abs() < 1e-6);
    }

    #[test]
    fn finite_or_zero_masks_degenerates() {
        assert_eq!(finite_or_zero(f32::NAN), 0.0);
        assert_eq!(finite_or_zero(f32::INFINITY), 0.0);
        assert_eq!(finite_or_zero(f32::NEG_INFINITY), 0.0);
        assert_eq!(finite_or_zero(0.5), 0.5);
    }

    #[test]
    fn sin_matches_std_at_known_points() {
        for x in [0.0, 0.5, 1.0, -2.0, TAU, 10.0] {
            assert!((sin(x) - x.sin()).abs() < 2e-3, "x={}", x);
        }
    }
}
