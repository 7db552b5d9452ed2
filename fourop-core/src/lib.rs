#![cfg_attr(not(feature = "std"), no_std)]
//! fourop Core — no_std-ready FM synthesis primitives with optional fast-math.
//!
//! Features
//! - `std`      : (default) use the Rust standard library
//! - `no-std`   : build with `#![no_std]` and use `libm`/`micromath` math backends
//! - `fast-math`: enable a polynomial sine approximation for the formula strategy
//!
//! Modules
//! - [`dsp`]      : math backend, phase wrapping, interpolation, NaN masking
//! - [`wave`]     : wave types, formula evaluation, wavetables, `WaveformSource`
//! - [`operator`] : `Operator` nodes and the `ModSet` modulator index set
//!
//! Design
//! - No heap allocations; pure sample-by-sample primitives
//! - Graph recursion and thread plumbing live in `fourop-engine`; this crate
//!   only knows about a single oscillator at a time
//! - Friendly to embedded / real-time targets

pub mod dsp;
pub mod operator;
pub mod wave;

/// Number of operator slots in a synthesis graph. Small and fixed: FM
/// algorithms in this family are wired from a handful of operators.
pub const NUM_OPERATORS: usize = 4;

/// Commonly used types/functions for convenience:
pub mod prelude {
    pub use crate::dsp::{finite_or_zero, lerp, wrap01, TAU};
    pub use crate::operator::{ModSet, ModSetError, Operator};
    pub use crate::wave::{wave_sample, WaveType, Wavetable, WaveformSource, WAVETABLE_SIZE};
    pub use crate::NUM_OPERATORS;
}

#[cfg(test)]
mod smoke {

    #[test]
    fn prelude_exists() {
        use crate::prelude::*;
        let _ = wrap01(1.25);
        let _ = wave_sample(WaveType::Sine, 0.25);
        let op = Operator::idle();
        assert_eq!(op.wave_type(), WaveType::None);
    }
}
