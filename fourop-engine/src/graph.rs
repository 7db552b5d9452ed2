//! The operator graph and its per-sample evaluation.
//!
//! Evaluation recurses depth-first from the carrier, summing each node's
//! modulators into its phase argument (frequency modulation), then sampling
//! the node and advancing its phase by exactly one sample interval.
//!
//! Results are memoized per tick in a small fixed arena, so a modulator
//! shared by several targets is evaluated — and phase-advanced — exactly
//! once per output sample regardless of fan-in. The reference behavior this
//! engine descends from re-advanced a shared modulator once per incoming
//! edge, audibly detuning it; memoization also bounds the work to
//! O(NUM_OPERATORS) per sample for any wiring.
//!
//! Graphs only come into existence through [`OperatorGraph::from_patch`],
//! which runs full validation, so the audio thread never sees a cycle. The
//! memo arena still treats an in-progress slot as silent, so even a
//! violated invariant degrades to a dropped modulation input instead of
//! unbounded recursion.

use fourop_core::operator::Operator;
use fourop_core::wave::{WaveType, WaveformSource};
use fourop_core::NUM_OPERATORS;

use crate::patch::{Patch, PatchError, SourceStrategy};

/// Per-tick memo slot for one operator.
#[derive(Copy, Clone)]
enum Memo {
    Unvisited,
    InProgress,
    Done(f32),
}

/// A validated, fully built synthesis graph. Owned by the audio thread;
/// replaced wholesale when a new patch is published.
#[derive(Clone, Debug)]
pub struct OperatorGraph {
    ops: [Operator; NUM_OPERATORS],
    carrier: usize,
}

impl OperatorGraph {
    /// Validate `patch` and compile it into a runnable graph. Wavetables
    /// are built here, on the control side, never on the audio thread.
    pub fn from_patch(patch: &Patch) -> Result<Self, PatchError> {
        patch.validate()?;

        let ops = core::array::from_fn(|i| {
            let cfg = &patch.ops[i];
            let source = match cfg.strategy {
                SourceStrategy::Formula => WaveformSource::formula(cfg.wave),
                SourceStrategy::Wavetable => WaveformSource::wavetable(cfg.wave),
            };
            Operator::new(
                source,
                cfg.freq_is_ratio,
                cfg.freq,
                cfg.amp,
                cfg.phase_offset,
                cfg.mods,
            )
        });

        Ok(Self {
            ops,
            carrier: patch.carrier,
        })
    }

    pub fn carrier(&self) -> usize {
        self.carrier
    }

    /// Amplitude of the carrier operator (display/telemetry).
    pub fn carrier_amp(&self) -> f32 {
        self.ops[self.carrier].amp()
    }

    /// Wave type of the carrier operator (display/telemetry).
    pub fn carrier_wave(&self) -> WaveType {
        self.ops[self.carrier].wave_type()
    }

    /// Snapshot of every phase accumulator, in cycles.
    pub fn positions(&self) -> [f32; NUM_OPERATORS] {
        core::array::from_fn(|i| self.ops[i].position())
    }

    /// Zero every phase accumulator so the next evaluation starts clean.
    pub fn reset_phases(&mut self) {
        for op in &mut self.ops {
            op.reset_phase();
        }
    }

    /// Carry phase accumulators over from the graph this one replaces, so
    /// re-patching does not click the oscillators back to phase zero.
    pub fn inherit_positions(&mut self, prev: &OperatorGraph) {
        for (op, prev_op) in self.ops.iter_mut().zip(prev.ops.iter()) {
            op.inherit_position(prev_op.position());
        }
    }

    /// Produce one output sample: evaluate the carrier's full modulator
    /// subtree and advance every touched operator by one sample interval.
    #[inline]
    pub fn evaluate_carrier(&mut self, base_freq: f32, sample_rate: f32) -> f32 {
        let mut memo = [Memo::Unvisited; NUM_OPERATORS];
        Self::evaluate_node(&mut self.ops, &mut memo, self.carrier, base_freq, sample_rate)
    }

    fn evaluate_node(
        ops: &mut [Operator; NUM_OPERATORS],
        memo: &mut [Memo; NUM_OPERATORS],
        node: usize,
        base_freq: f32,
        sample_rate: f32,
    ) -> f32 {
        match memo[node] {
            Memo::Done(value) => return value,
            // Unreachable for validated graphs; a cycle contributes silence
            // instead of recursing.
            Memo::InProgress => return 0.0,
            Memo::Unvisited => {}
        }
        memo[node] = Memo::InProgress;

        // Modulator subtrees are fully evaluated (and phase-advanced)
        // before this node samples its waveform.
        let mods = ops[node].mods();
        let mut modulation = 0.0;
        for dep in mods.iter() {
            modulation += Self::evaluate_node(ops, memo, dep, base_freq, sample_rate);
        }

        let interval = ops[node].interval_cycles(base_freq, sample_rate);
        let sample = ops[node].evaluate(modulation);
        ops[node].advance_phase(interval);

        memo[node] = Memo::Done(sample);
        sample
    }
}

// ------------------------------------ Tests --------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::OperatorConfig;
    use fourop_core::operator::ModSet;

    const SR: f32 = 44_100.0;

    fn sine(freq: f32, amp: f32, mods: &[usize]) -> OperatorConfig {
        OperatorConfig {
            wave: WaveType::Sine,
            freq,
            amp,
            mods: ModSet::from_indices(mods).unwrap(),
            ..OperatorConfig::default()
        }
    }

    /// Reference two-operator patch: carrier at slot 3 (ratio 1.0, amp 0.3)
    /// modulated by slot 2 (ratio 2.0, amp 5.0).
    fn two_op_patch() -> Patch {
        let mut patch = Patch::default();
        patch.carrier = 3;
        patch.ops[3] = sine(1.0, 0.3, &[2]);
        patch.ops[2] = sine(2.0, 5.0, &[]);
        patch
    }

    #[test]
    fn from_patch_runs_validation() {
        let mut bad = Patch::default();
        bad.ops[0] = sine(1.0, 1.0, &[0]);
        assert!(OperatorGraph::from_patch(&bad).is_err());
        assert!(OperatorGraph::from_patch(&two_op_patch()).is_ok());
    }

    #[test]
    fn first_sample_of_reference_patch_is_zero() {
        // 0.3 * sin(0 + 5.0 * sin(0)) = 0
        let mut graph = OperatorGraph::from_patch(&two_op_patch()).unwrap();
        assert!(graph.evaluate_carrier(440.0, SR).abs() < 1e-6);
    }

    #[test]
    fn every_touched_operator_advances_each_tick() {
        let mut graph = OperatorGraph::from_patch(&two_op_patch()).unwrap();
        graph.evaluate_carrier(440.0, SR);
        let pos = graph.positions();
        assert!((pos[3] - 440.0 / SR).abs() < 1e-7);
        assert!((pos[2] - 880.0 / SR).abs() < 1e-7);
        // Slots outside the carrier's subtree stay parked.
        assert_eq!(pos[0], 0.0);
        assert_eq!(pos[1], 0.0);
    }

    #[test]
    fn shared_modulator_advances_exactly_once() {
        // Diamond: carrier 0 <- {1, 2}, both <- 3. Node 3 has fan-in 2 but
        // must advance by exactly one interval per tick.
        let mut patch = Patch::default();
        patch.carrier = 0;
        patch.ops[0] = sine(1.0, 0.3, &[1, 2]);
        patch.ops[1] = sine(2.0, 1.0, &[3]);
        patch.ops[2] = sine(3.0, 1.0, &[3]);
        patch.ops[3] = sine(0.5, 1.0, &[]);

        let mut graph = OperatorGraph::from_patch(&patch).unwrap();
        let ticks = 7;
        for _ in 0..ticks {
            graph.evaluate_carrier(440.0, SR);
        }
        let expected = (ticks as f32 * (0.5 * 440.0) / SR) % 1.0;
        assert!((graph.positions()[3] - expected).abs() < 1e-6);
    }

    #[test]
    fn fan_in_sums_both_modulators() {
        // Two DC-ish modulators (freq 0 => constant sin(phase_offset)).
        let mut patch = Patch::default();
        patch.carrier = 0;
        patch.ops[0] = sine(1.0, 1.0, &[1, 2]);
        patch.ops[1] = OperatorConfig {
            phase_offset: 0.25, // sin(π/2) = 1.0
            ..sine(0.0, 1.0, &[])
        };
        patch.ops[2] = OperatorConfig {
            phase_offset: 0.25,
            ..sine(0.0, 0.5, &[])
        };

        let mut graph = OperatorGraph::from_patch(&patch).unwrap();
        // Carrier at phase 0 sees modulation 1.0 + 0.5 radians.
        let got = graph.evaluate_carrier(440.0, SR);
        assert!((got - 1.5f32.sin()).abs() < 1e-5);
    }

    #[test]
    fn reset_phases_zeroes_all_positions() {
        let mut graph = OperatorGraph::from_patch(&two_op_patch()).unwrap();
        for _ in 0..100 {
            graph.evaluate_carrier(440.0, SR);
        }
        graph.reset_phases();
        assert_eq!(graph.positions(), [0.0; NUM_OPERATORS]);
    }

    #[test]
    fn inherit_positions_carries_phase_across_rebuild() {
        let mut graph = OperatorGraph::from_patch(&two_op_patch()).unwrap();
        for _ in 0..50 {
            graph.evaluate_carrier(440.0, SR);
        }
        let before = graph.positions();

        let mut swapped = OperatorGraph::from_patch(&two_op_patch()).unwrap();
        swapped.inherit_positions(&graph);
        assert_eq!(swapped.positions(), before);
    }

    #[test]
    fn wavetable_graph_tracks_formula_graph() {
        let mut formula = OperatorGraph::from_patch(&two_op_patch()).unwrap();

        let mut patch = two_op_patch();
        for op in &mut patch.ops {
            op.strategy = SourceStrategy::Wavetable;
        }
        let mut table = OperatorGraph::from_patch(&patch).unwrap();

        for _ in 0..500 {
            let a = formula.evaluate_carrier(440.0, SR);
            let b = table.evaluate_carrier(440.0, SR);
            assert!((a - b).abs() < 1e-2, "a={} b={}", a, b);
        }
    }
}
