//! Waveform generation: formula evaluation and precomputed wavetables.
//!
//! Two interchangeable strategies sit behind [`WaveformSource`]:
//! - `Formula`  : evaluate the waveform's closed form on every call. Exact,
//!   but costs a transcendental per sample for sine.
//! - `Table`    : precompute one cycle into a fixed 2048-entry table at
//!   build time and linearly interpolate between entries. O(1) per sample,
//!   quantization error bounded by `TAU / WAVETABLE_SIZE` for sine.
//!
//! Units:
//! - Phase positions are fractional **cycles**.
//! - The modulation input is in **radians**; every strategy evaluates the
//!   waveform at the cycle position `phase + modulation / TAU`, so the two
//!   strategies produce the same output for the same inputs.

use crate::dsp::{lerp, sin, wrap01, TAU};

/// Number of samples in one precomputed waveform cycle. Power of two so the
/// lookup can wrap with a mask.
pub const WAVETABLE_SIZE: usize = 2048;

/// Closed set of waveform shapes. `None` always yields silence.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum WaveType {
    #[default]
    None,
    Sine,
    Square,
    Triangle,
    Saw,
}

impl WaveType {
    /// Display name, polled by UI collaborators. `None` reads "Flat".
    pub fn name(self) -> &'static str {
        match self {
            WaveType::None => "Flat",
            WaveType::Sine => "Sine",
            WaveType::Square => "Square",
            WaveType::Triangle => "Triangle",
            WaveType::Saw => "Saw",
        }
    }

    /// Stable tag for single-word atomic telemetry.
    pub fn tag(self) -> u8 {
        match self {
            WaveType::None => 0,
            WaveType::Sine => 1,
            WaveType::Square => 2,
            WaveType::Triangle => 3,
            WaveType::Saw => 4,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(WaveType::None),
            1 => Some(WaveType::Sine),
            2 => Some(WaveType::Square),
            3 => Some(WaveType::Triangle),
            4 => Some(WaveType::Saw),
            _ => None,
        }
    }
}

/// Evaluate one waveform at a cycle position. Output is in [-1, 1].
#[inline]
pub fn wave_sample(wave: WaveType, phase01: f32) -> f32 {
    match wave {
        WaveType::None => 0.0,
        WaveType::Sine => sin(TAU * phase01),
        // +1 for the first half of the cycle, -1 for the second.
        WaveType::Square => {
            if wrap01(phase01) < 0.5 {
                1.0
            } else {
                -1.0
            }
        }
        // Linear ramp shifted so the cycle starts at 0 rising.
        WaveType::Triangle => (wrap01(phase01 + 0.75) - 0.5).abs() * 4.0 - 1.0,
        // Ramp from -1 to +1 with a discontinuous reset.
        WaveType::Saw => wrap01(phase01) * 2.0 - 1.0,
    }
}

/// One precomputed waveform cycle with linear interpolation between entries.
#[derive(Clone)]
pub struct Wavetable {
    wave: WaveType,
    table: [f32; WAVETABLE_SIZE],
}

impl Wavetable {
    /// Sample one full cycle of `wave` into the table. Done once at patch
    /// build time, never on the audio thread.
    pub fn build(wave: WaveType) -> Self {
        let mut table = [0.0f32; WAVETABLE_SIZE];
        for (i, slot) in table.iter_mut().enumerate() {
            *slot = wave_sample(wave, i as f32 / WAVETABLE_SIZE as f32);
        }
        Self { wave, table }
    }

    pub fn wave_type(&self) -> WaveType {
        self.wave
    }

    /// Look up a cycle position with linear interpolation, wrapping at the
    /// table seam.
    #[inline]
    pub fn sample(&self, phase01: f32) -> f32 {
        const MASK: usize = WAVETABLE_SIZE - 1;

        let x = wrap01(phase01) * WAVETABLE_SIZE as f32;
        let i0 = (x as usize) & MASK;
        let i1 = (i0 + 1) & MASK;
        let frac = x - (x as usize) as f32;
        lerp(self.table[i0], self.table[i1], frac)
    }
}

impl core::fmt::Debug for Wavetable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Wavetable")
            .field("wave", &self.wave)
            .field("size", &WAVETABLE_SIZE)
            .finish()
    }
}

/// A single oscillator's raw output for a phase position (cycles) and an
/// incoming modulation value (radians).
///
/// The two variants are interchangeable without touching the graph
/// evaluation code; which one a patch uses is a build-time choice.
#[derive(Clone, Debug)]
pub enum WaveformSource {
    Formula(WaveType),
    Table(Wavetable),
}

impl WaveformSource {
    pub fn formula(wave: WaveType) -> Self {
        WaveformSource::Formula(wave)
    }

    pub fn wavetable(wave: WaveType) -> Self {
        WaveformSource::Table(Wavetable::build(wave))
    }

    pub fn wave_type(&self) -> WaveType {
        match self {
            WaveformSource::Formula(w) => *w,
            WaveformSource::Table(t) => t.wave_type(),
        }
    }

    /// Raw sample in [-1, 1] at `phase01` cycles with `modulation` radians
    /// added to the phase argument.
    #[inline]
    pub fn sample(&self, phase01: f32, modulation: f32) -> f32 {
        let p = phase01 + modulation * (1.0 / TAU);
        match self {
            WaveformSource::Formula(w) => wave_sample(*w, p),
            WaveformSource::Table(t) => t.sample(p),
        }
    }
}

impl Default for WaveformSource {
    fn default() -> Self {
        WaveformSource::Formula(WaveType::None)
    }
}

// ------------------------------------ Tests --------------------------------------
