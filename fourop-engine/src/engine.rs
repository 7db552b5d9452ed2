//! The audio-thread side: per-sample evaluation and PCM buffer filling.
//!
//! [`SynthEngine::next_sample`] is the only audio-thread entry point. It
//! must not allocate, lock, log or block: applying a pending patch is a
//! lock-free pop plus a fixed-size move, and evaluation is a bounded
//! recursion over `NUM_OPERATORS` slots.

use std::sync::Arc;

use rtrb::{Consumer, RingBuffer};

use crate::control::{Controls, SynthController};
use crate::graph::OperatorGraph;
use crate::patch::{Patch, PatchError};

/// Output bit depth of [`SynthEngine::fill_buffer`] (16-bit signed PCM).
pub const BIT_DEPTH: u32 = 16;

/// Full-scale magnitude for the integer sample format.
pub const SAMPLE_RANGE: f32 = ((1i32 << (BIT_DEPTH - 1)) - 1) as f32;

/// Sample rate the engine assumes when the host does not dictate one.
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Frames per callback in the reference playback setup; playback glue may
/// use it to size scratch buffers.
pub const BUFFER_SIZE: usize = 4096;

/// Replacement graphs that can be queued before `set_patch` reports Busy.
const PATCH_QUEUE_CAPACITY: usize = 4;

/// Owns one operator graph and the realtime end of the control handoff.
///
/// Constructed together with its [`SynthController`]; the engine moves into
/// the audio callback, the controller stays with the caller. The engine
/// starts muted with a base frequency of 440 Hz.
pub struct SynthEngine {
    sample_rate: f32,
    graph: OperatorGraph,
    shared: Arc<Controls>,
    patches: Consumer<OperatorGraph>,
}

impl SynthEngine {
    /// Build an engine from an initial patch. The sample rate is fixed for
    /// the engine's lifetime.
    pub fn new(sample_rate: f32, patch: &Patch) -> Result<(Self, SynthController), PatchError> {
        let graph = OperatorGraph::from_patch(patch)?;
        let shared = Arc::new(Controls::new(440.0, &graph));
        let (tx, rx) = RingBuffer::new(PATCH_QUEUE_CAPACITY);

        let engine = Self {
            sample_rate: sample_rate.max(1.0),
            graph,
            shared: Arc::clone(&shared),
            patches: rx,
        };
        let controller = SynthController::new(shared, tx);
        Ok((engine, controller))
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Install any graphs the control thread has published since the last
    /// sample, carrying phase accumulators over so oscillators keep running
    /// through a re-patch.
    #[inline]
    fn apply_pending_patches(&mut self) {
        while let Ok(mut graph) = self.patches.pop() {
            graph.inherit_positions(&self.graph);
            self.graph = graph;
        }
    }

    /// Produce the next mono sample, approximately in [-1, 1].
    ///
    /// While muted this returns exactly 0 and holds every phase accumulator
    /// at 0 — silence with no residual phase drift. A non-finite or
    /// non-positive base frequency is masked to silence as well.
    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        self.apply_pending_patches();

        if !self.shared.enabled() {
            self.graph.reset_phases();
            return 0.0;
        }

        let base_freq = self.shared.base_frequency();
        if !(base_freq.is_finite() && base_freq > 0.0) {
            return 0.0;
        }

        self.graph.evaluate_carrier(base_freq, self.sample_rate)
    }

    /// Render `out.len()` frames of mono 16-bit PCM. Never fails; every
    /// frame is written (zeros while muted).
    pub fn fill_buffer(&mut self, out: &mut [i16]) {
        for frame in out.iter_mut() {
            let sample = self.next_sample().clamp(-1.0, 1.0);
            *frame = (sample * SAMPLE_RANGE) as i16;
        }
    }

    /// Snapshot of every operator's phase accumulator (testing/diagnostics;
    /// call from the audio thread only).
    pub fn positions(&self) -> [f32; fourop_core::NUM_OPERATORS] {
        self.graph.positions()
    }
}

// ------------------------------------ Tests --------------------------------------
