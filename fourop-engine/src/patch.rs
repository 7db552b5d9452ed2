//! Patches: the control-side description of an operator graph.
//!
//! A [`Patch`] is plain data — wave types, frequencies, amplitudes and
//! modulator wiring for every operator slot plus the carrier index. It is
//! validated and compiled into an [`OperatorGraph`](crate::graph::OperatorGraph)
//! on the control thread; the audio thread only ever sees fully built,
//! already-valid graphs.
//!
//! Validation rejects, in order: a carrier index outside the slot range,
//! any operator listing itself as a modulator, and any modulation cycle
//! reachable from the carrier. A rejected patch has no effect; whatever
//! configuration was active stays active.

use fourop_core::operator::{ModSet, ModSetError};
use fourop_core::wave::WaveType;
use fourop_core::NUM_OPERATORS;

/// How an operator turns phase into samples.
///
/// `Formula` evaluates the closed form per sample; `Wavetable` compiles the
/// wave into a lookup table when the patch is built. Interchangeable; the
/// graph evaluation never looks at this choice again.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum SourceStrategy {
    #[default]
    Formula,
    Wavetable,
}

/// Control-side description of one operator slot.
#[derive(Copy, Clone, Debug)]
pub struct OperatorConfig {
    pub wave: WaveType,
    pub strategy: SourceStrategy,
    /// If true, `freq` multiplies the engine's base frequency; otherwise it
    /// is absolute Hz.
    pub freq_is_ratio: bool,
    pub freq: f32,
    pub amp: f32,
    /// Static phase offset in cycles.
    pub phase_offset: f32,
    pub mods: ModSet,
}

impl Default for OperatorConfig {
    /// Startup defaults for an unused slot: silent wave, ratio mode, unit
    /// frequency, half amplitude, no modulators.
    fn default() -> Self {
        Self {
            wave: WaveType::None,
            strategy: SourceStrategy::Formula,
            freq_is_ratio: true,
            freq: 1.0,
            amp: 0.5,
            phase_offset: 0.0,
            mods: ModSet::empty(),
        }
    }
}

/// A full graph description: every slot plus the carrier index.
#[derive(Copy, Clone, Debug)]
pub struct Patch {
    pub ops: [OperatorConfig; NUM_OPERATORS],
    pub carrier: usize,
}

impl Default for Patch {
    fn default() -> Self {
        Self {
            ops: [OperatorConfig::default(); NUM_OPERATORS],
            carrier: 0,
        }
    }
}

impl Patch {
    pub fn new(ops: [OperatorConfig; NUM_OPERATORS], carrier: usize) -> Self {
        Self { ops, carrier }
    }

    /// Check the structural invariants the audio thread relies on.
    pub fn validate(&self) -> Result<(), PatchError> {
        if self.carrier >= NUM_OPERATORS {
            return Err(PatchError::CarrierOutOfRange(self.carrier));
        }
        // Self-modulation would recurse on itself; rejected for every slot,
        // reachable or not, so a later carrier change cannot trip over it.
        for (i, op) in self.ops.iter().enumerate() {
            if op.mods.contains(i) {
                return Err(PatchError::SelfModulation(i));
            }
        }
        self.check_acyclic_from(self.carrier)
    }

    /// Depth-first cycle check over the modulation relation, restricted to
    /// slots reachable from `root`.
    fn check_acyclic_from(&self, root: usize) -> Result<(), PatchError> {
        #[derive(Copy, Clone, PartialEq)]
        enum Mark {
            Unvisited,
            OnStack,
            Done,
        }

        fn visit(
            ops: &[OperatorConfig; NUM_OPERATORS],
            marks: &mut [Mark; NUM_OPERATORS],
            node: usize,
        ) -> Result<(), PatchError> {
            match marks[node] {
                Mark::Done => return Ok(()),
                Mark::OnStack => return Err(PatchError::CycleDetected(node)),
                Mark::Unvisited => {}
            }
            marks[node] = Mark::OnStack;
            for dep in ops[node].mods.iter() {
                visit(ops, marks, dep)?;
            }
            marks[node] = Mark::Done;
            Ok(())
        }

        let mut marks = [Mark::Unvisited; NUM_OPERATORS];
        visit(&self.ops, &mut marks, root)
    }
}

/// A configuration the engine refused, surfaced synchronously to the
/// control thread. The previously active configuration remains in force.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PatchError {
    /// Carrier index is not a valid operator slot.
    CarrierOutOfRange(usize),
    /// Operator lists itself as a modulator.
    SelfModulation(usize),
    /// The modulation relation reachable from the carrier contains a cycle
    /// through this slot.
    CycleDetected(usize),
    /// Invalid modulator wiring while assembling the patch.
    Modulators(ModSetError),
    /// The control→audio handoff queue is full; retry after the audio
    /// thread has drained it.
    Busy,
}

impl From<ModSetError> for PatchError {
    fn from(err: ModSetError) -> Self {
        PatchError::Modulators(err)
    }
}

impl std::fmt::Display for PatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PatchError::CarrierOutOfRange(i) => {
                write!(f, "carrier index {} out of range (0..{})", i, NUM_OPERATORS)
            }
            PatchError::SelfModulation(i) => write!(f, "operator {} modulates itself", i),
            PatchError::CycleDetected(i) => {
                write!(f, "modulation cycle through operator {}", i)
            }
            PatchError::Modulators(err) => write!(f, "invalid modulator set: {}", err),
            PatchError::Busy => write!(f, "patch queue full; configuration not applied"),
        }
    }
}

impl std::error::Error for PatchError {}

// ------------------------------------ Tests --------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, amp: f32, mods: &[usize]) -> OperatorConfig {
        OperatorConfig {
            wave: WaveType::Sine,
            freq,
            amp,
            mods: ModSet::from_indices(mods).unwrap(),
            ..OperatorConfig::default()
        }
    }

    #[test]
    fn default_patch_is_valid_and_silent_shaped() {
        let patch = Patch::default();
        assert!(patch.validate().is_ok());
        assert_eq!(patch.ops[0].wave, WaveType::None);
        assert!(patch.ops[0].freq_is_ratio);
        assert_eq!(patch.ops[0].freq, 1.0);
        assert_eq!(patch.ops[0].amp, 0.5);
    }

    #[test]
    fn rejects_carrier_out_of_range() {
        let mut patch = Patch::default();
        patch.carrier = NUM_OPERATORS;
        assert_eq!(patch.validate(), Err(PatchError::CarrierOutOfRange(NUM_OPERATORS)));
    }

    #[test]
    fn rejects_self_modulation() {
        let mut patch = Patch::default();
        patch.ops[1] = sine(1.0, 1.0, &[1]);
        assert_eq!(patch.validate(), Err(PatchError::SelfModulation(1)));
    }

    #[test]
    fn rejects_two_node_cycle() {
        let mut patch = Patch::default();
        patch.carrier = 0;
        patch.ops[0] = sine(1.0, 0.3, &[1]);
        patch.ops[1] = sine(2.0, 5.0, &[0]);
        assert!(matches!(patch.validate(), Err(PatchError::CycleDetected(_))));
    }

    #[test]
    fn cycle_off_the_carrier_path_is_tolerated() {
        // Slots 2 and 3 form a cycle but the carrier never reaches them;
        // the acyclicity invariant is scoped to the audible subgraph.
        let mut patch = Patch::default();
        patch.carrier = 0;
        patch.ops[0] = sine(1.0, 0.3, &[1]);
        patch.ops[1] = sine(2.0, 5.0, &[]);
        patch.ops[2] = sine(1.0, 1.0, &[3]);
        patch.ops[3] = sine(1.0, 1.0, &[2]);
        assert!(patch.validate().is_ok());
    }

    #[test]
    fn accepts_diamond_fan_in() {
        // 0 <- {1, 2}, both <- 3: a DAG with fan-in is legal.
        let mut patch = Patch::default();
        patch.carrier = 0;
        patch.ops[0] = sine(1.0, 0.3, &[1, 2]);
        patch.ops[1] = sine(2.0, 1.0, &[3]);
        patch.ops[2] = sine(3.0, 1.0, &[3]);
        patch.ops[3] = sine(0.5, 1.0, &[]);
        assert!(patch.validate().is_ok());
    }
}
