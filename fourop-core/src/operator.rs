//! FM operators: one oscillator node plus its modulator references.
//!
//! An [`Operator`] wraps a [`WaveformSource`] with frequency, amplitude,
//! phase-offset and the running phase accumulator. Which other operators
//! feed its phase argument is a [`ModSet`] of validated indices; the graph
//! layer owns the recursion that actually sums them.
//!
//! Realtime notes:
//! - `position` is the only field mutated per sample, and only by the
//!   audio thread.
//! - `evaluate` is pure with respect to `position`; advancing the phase is
//!   a separate step so the graph controls evaluation order.

use crate::dsp::{finite_or_zero, wrap01};
use crate::wave::{WaveformSource, WaveType};
use crate::NUM_OPERATORS;

/// Fixed-capacity set of modulator indices.
///
/// Replaces the classic "array of nullable operator pointers" pattern: an
/// index is either present or it is not, there is no sentinel value, and
/// out-of-range indices cannot be stored at all. Duplicate inserts are
/// rejected. Self-reference is a graph-level property and is checked where
/// the owning operator's index is known.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ModSet {
    slots: [u8; NUM_OPERATORS],
    len: u8,
}

impl ModSet {
    pub const fn empty() -> Self {
        Self {
            slots: [0; NUM_OPERATORS],
            len: 0,
        }
    }

    /// Build a set from a slice of indices. Fails on out-of-range or
    /// duplicate entries rather than silently dropping them.
    pub fn from_indices(indices: &[usize]) -> Result<Self, ModSetError> {
        let mut set = Self::empty();
        for &idx in indices {
            set.insert(idx)?;
        }
        Ok(set)
    }

    /// Insert an index. Rejects out-of-range indices and duplicates.
    pub fn insert(&mut self, idx: usize) -> Result<(), ModSetError> {
        if idx >= NUM_OPERATORS {
            return Err(ModSetError::OutOfRange(idx));
        }
        if self.contains(idx) {
            return Err(ModSetError::Duplicate(idx));
        }
        // len < NUM_OPERATORS is implied: NUM_OPERATORS distinct indices fit.
        self.slots[self.len as usize] = idx as u8;
        self.len += 1;
        Ok(())
    }

    pub fn contains(&self, idx: usize) -> bool {
        self.iter().any(|i| i == idx)
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.slots[..self.len as usize].iter().map(|&i| i as usize)
    }
}

/// Rejected [`ModSet`] mutation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ModSetError {
    /// Index is not a valid operator slot.
    OutOfRange(usize),
    /// Index is already in the set.
    Duplicate(usize),
}

impl core::fmt::Display for ModSetError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ModSetError::OutOfRange(i) => {
                write!(f, "modulator index {} out of range (0..{})", i, NUM_OPERATORS)
            }
            ModSetError::Duplicate(i) => write!(f, "modulator index {} listed twice", i),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ModSetError {}

/// One oscillator node in the synthesis graph.
#[derive(Clone, Debug)]
pub struct Operator {
    source: WaveformSource,
    /// If true, `freq` is a multiple of the engine's base frequency;
    /// otherwise it is absolute Hz.
    freq_is_ratio: bool,
    freq: f32,
    amp: f32,
    /// Static offset added to every evaluation, in cycles.
    phase_offset: f32,
    /// Running phase accumulator in cycles, kept in [0, 1).
    position: f32,
    mods: ModSet,
}

impl Operator {
    pub fn new(
        source: WaveformSource,
        freq_is_ratio: bool,
        freq: f32,
        amp: f32,
        phase_offset: f32,
        mods: ModSet,
    ) -> Self {
        Self {
            source,
            freq_is_ratio,
            freq,
            amp,
            phase_offset,
            position: 0.0,
            mods,
        }
    }

    /// Idle operator matching the startup defaults: silent wave, ratio mode,
    /// unit frequency, half amplitude, no modulators.
    pub fn idle() -> Self {
        Self::new(WaveformSource::default(), true, 1.0, 0.5, 0.0, ModSet::empty())
    }

    pub fn wave_type(&self) -> WaveType {
        self.source.wave_type()
    }

    pub fn amp(&self) -> f32 {
        self.amp
    }

    pub fn mods(&self) -> ModSet {
        self.mods
    }

    pub fn position(&self) -> f32 {
        self.position
    }

    /// Phase increment for one output sample, in cycles.
    ///
    /// Non-finite configuration masks to 0 so a bad value freezes the
    /// oscillator instead of spraying NaN through the accumulator.
    #[inline]
    pub fn interval_cycles(&self, base_freq: f32, sample_rate: f32) -> f32 {
        let effective = if self.freq_is_ratio {
            base_freq * self.freq
        } else {
            self.freq
        };
        finite_or_zero(effective / sample_rate)
    }

    /// Evaluate the operator at its current phase. Pure with respect to
    /// `position`; the graph advances the phase separately.
    #[inline]
    pub fn evaluate(&self, modulation: f32) -> f32 {
        finite_or_zero(self.amp * self.source.sample(self.position + self.phase_offset, modulation))
    }

    /// Add `interval_cycles` to the accumulator and wrap into [0, 1).
    ///
    /// A single subtraction would do for audio-rate intervals (always < 1
    /// below Nyquist); the full wrap also handles pathological inputs.
    #[inline]
    pub fn advance_phase(&mut self, interval_cycles: f32) {
        self.position = wrap01(self.position + interval_cycles);
    }

    /// Hard-reset the accumulator; used while the engine is muted so that
    /// re-enabling starts from a clean phase.
    #[inline]
    pub fn reset_phase(&mut self) {
        self.position = 0.0;
    }

    /// Carry the phase accumulator over from a previous incarnation of this
    /// slot when a new configuration is installed.
    pub fn inherit_position(&mut self, position: f32) {
        self.position = wrap01(position);
    }
}

// ------------------------------------ Tests --------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wave::WaveType;

    fn sine_op(freq: f32, amp: f32) -> Operator {
        Operator::new(
            WaveformSource::formula(WaveType::Sine),
            true,
            freq,
            amp,
            0.0,
            ModSet::empty(),
        )
    }

    #[test]
    fn modset_rejects_out_of_range_and_duplicates() {
        let mut set = ModSet::empty();
        assert_eq!(set.insert(NUM_OPERATORS), Err(ModSetError::OutOfRange(NUM_OPERATORS)));
        assert_eq!(set.insert(2), Ok(()));
        assert_eq!(set.insert(2), Err(ModSetError::Duplicate(2)));
        assert_eq!(set.len(), 1);
        assert!(set.contains(2));
    }

    #[test]
    fn modset_from_indices_roundtrip() {
        let set = ModSet::from_indices(&[0, 3, 1]).unwrap();
        let got: Vec<usize> = set.iter().collect();
        assert_eq!(got, vec![0, 3, 1]);
        assert!(ModSet::from_indices(&[0, 0]).is_err());
    }

    #[test]
    fn phase_wraps_and_tracks_fmod() {
        let mut op = sine_op(1.0, 1.0);
        let interval = 0.3f32;
        let n = 23;
        for _ in 0..n {
            op.advance_phase(interval);
        }
        let expected = (n as f32 * interval) % 1.0;
        assert!((op.position() - expected).abs() < 1e-4);
        assert!((0.0..1.0).contains(&op.position()));
    }

    #[test]
    fn phase_wraps_pathological_interval() {
        let mut op = sine_op(1.0, 1.0);
        op.advance_phase(7.65);
        assert!((0.0..1.0).contains(&op.position()));
        assert!((op.position() - 0.65).abs() < 1e-4);
    }

    #[test]
    fn evaluate_does_not_advance_phase() {
        let op = sine_op(1.0, 1.0);
        let before = op.position();
        let _ = op.evaluate(0.0);
        let _ = op.evaluate(1.0);
        assert_eq!(op.position(), before);
    }

    #[test]
    fn evaluate_scales_by_amp() {
        let mut op = sine_op(1.0, 0.25);
        op.advance_phase(0.25); // sine peak
        assert!((op.evaluate(0.0) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn phase_offset_applies_every_call() {
        let op = Operator::new(
            WaveformSource::formula(WaveType::Sine),
            true,
            1.0,
            1.0,
            0.25,
            ModSet::empty(),
        );
        assert!((op.evaluate(0.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn interval_uses_ratio_or_absolute() {
        let ratio = sine_op(2.0, 1.0);
        assert!((ratio.interval_cycles(440.0, 44_100.0) - 880.0 / 44_100.0).abs() < 1e-9);

        let abs = Operator::new(
            WaveformSource::formula(WaveType::Sine),
            false,
            1000.0,
            1.0,
            0.0,
            ModSet::empty(),
        );
        assert!((abs.interval_cycles(440.0, 44_100.0) - 1000.0 / 44_100.0).abs() < 1e-9);
    }

    #[test]
    fn degenerate_config_masks_to_silence() {
        let op = Operator::new(
            WaveformSource::formula(WaveType::Sine),
            true,
            f32::NAN,
            f32::INFINITY,
            0.0,
            ModSet::empty(),
        );
        assert_eq!(op.evaluate(0.0), 0.0);
        assert_eq!(op.interval_cycles(440.0, 44_100.0), 0.0);
    }
}
