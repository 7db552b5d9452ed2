//! Control-thread side of the engine: setters, telemetry, patch publishing.
//!
//! Two handoff mechanisms, both lock-free, per the engine's realtime
//! contract:
//! - Single-word state (`enabled`, `base_frequency`) and the telemetry
//!   mirror (carrier amplitude/wave) live in [`Controls`] as atomics. Each
//!   word is independently consistent; nothing on the audio thread ever
//!   observes a half-written value.
//! - Structural changes travel as whole, pre-validated
//!   [`OperatorGraph`](crate::graph::OperatorGraph)s over an SPSC ring
//!   buffer. The audio thread installs them between samples, so a new
//!   frequency can never pair with an old wave type mid-update.
//!
//! Atomic orderings are `Relaxed` throughout: every shared word is
//! self-contained and the ring buffer provides its own synchronization for
//! the structural path.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;

use fourop_core::wave::WaveType;
use rtrb::Producer;

use crate::graph::OperatorGraph;
use crate::patch::{Patch, PatchError};

/// Words shared between the control and audio threads.
pub(crate) struct Controls {
    enabled: AtomicBool,
    base_freq_bits: AtomicU32,
    // Telemetry mirror, written by the control thread on successful patch
    // publication and polled by display collaborators.
    carrier_amp_bits: AtomicU32,
    carrier_wave_tag: AtomicU8,
}

impl Controls {
    pub(crate) fn new(base_frequency: f32, graph: &OperatorGraph) -> Self {
        Self {
            enabled: AtomicBool::new(false),
            base_freq_bits: AtomicU32::new(base_frequency.to_bits()),
            carrier_amp_bits: AtomicU32::new(graph.carrier_amp().to_bits()),
            carrier_wave_tag: AtomicU8::new(graph.carrier_wave().tag()),
        }
    }

    pub(crate) fn enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub(crate) fn base_frequency(&self) -> f32 {
        f32::from_bits(self.base_freq_bits.load(Ordering::Relaxed))
    }
}

/// Handle the control thread keeps. Everything here is wait-free and safe
/// to call while the audio thread is rendering.
pub struct SynthController {
    shared: Arc<Controls>,
    patches: Producer<OperatorGraph>,
}

impl SynthController {
    pub(crate) fn new(shared: Arc<Controls>, patches: Producer<OperatorGraph>) -> Self {
        Self { shared, patches }
    }

    /// Global mute. Disabling also resets every phase accumulator on the
    /// audio side, so re-enabling starts from a clean phase.
    pub fn set_enabled(&self, enabled: bool) {
        self.shared.enabled.store(enabled, Ordering::Relaxed);
    }

    /// Frequency ratio-mode operators scale from, e.g. from a note-on
    /// event. Expected finite and > 0 while enabled; degenerate values are
    /// masked to silence by the audio side rather than validated here.
    pub fn set_base_frequency(&self, freq_hz: f32) {
        self.shared
            .base_freq_bits
            .store(freq_hz.to_bits(), Ordering::Relaxed);
    }

    /// Validate `patch`, build the replacement graph (wavetables included)
    /// and publish it to the audio thread as a single unit.
    ///
    /// On any error the active configuration is untouched.
    pub fn set_patch(&mut self, patch: &Patch) -> Result<(), PatchError> {
        let graph = OperatorGraph::from_patch(patch)?;
        let amp = graph.carrier_amp();
        let wave = graph.carrier_wave();

        self.patches.push(graph).map_err(|_| PatchError::Busy)?;

        self.shared
            .carrier_amp_bits
            .store(amp.to_bits(), Ordering::Relaxed);
        self.shared
            .carrier_wave_tag
            .store(wave.tag(), Ordering::Relaxed);
        Ok(())
    }

    // ------------------------- Display / telemetry -------------------------

    pub fn is_enabled(&self) -> bool {
        self.shared.enabled()
    }

    pub fn base_frequency(&self) -> f32 {
        self.shared.base_frequency()
    }

    /// Amplitude of the carrier in the most recently published patch.
    pub fn carrier_amp(&self) -> f32 {
        f32::from_bits(self.shared.carrier_amp_bits.load(Ordering::Relaxed))
    }

    /// Wave type of the carrier in the most recently published patch.
    pub fn carrier_wave(&self) -> WaveType {
        WaveType::from_tag(self.shared.carrier_wave_tag.load(Ordering::Relaxed))
            .unwrap_or(WaveType::None)
    }
}
