//! fourop Engine — operator graph, patches, and the realtime/control split.
//!
//! Crate layout:
//! - [`patch`]   : `Patch`/`OperatorConfig` descriptions and validation
//! - [`graph`]   : `OperatorGraph` with memoized recursive FM evaluation
//! - [`engine`]  : `SynthEngine`, the audio-thread entry points
//! - [`control`] : `SynthController`, lock-free setters and telemetry
//!
//! The audio thread never allocates, locks or performs I/O: configuration
//! errors are rejected on the control thread at patch time, and structural
//! changes arrive as whole pre-built graphs over an SPSC ring buffer.

pub mod control;
pub mod engine;
pub mod graph;
pub mod patch;

// Re-export some commonly used items to make downstream imports ergonomic.
pub use control::SynthController;
pub use engine::{SynthEngine, BIT_DEPTH, BUFFER_SIZE, DEFAULT_SAMPLE_RATE, SAMPLE_RANGE};
pub use graph::OperatorGraph;
pub use patch::{OperatorConfig, Patch, PatchError, SourceStrategy};

pub use fourop_core::operator::{ModSet, ModSetError, Operator};
pub use fourop_core::wave::WaveType;
pub use fourop_core::NUM_OPERATORS;
