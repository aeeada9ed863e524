//! Transcript emission.
//!
//! The bridge hands every finished [`Utterance`] to a [`TranscriptSink`] and
//! reads them back once at the end of the call for diagnostics. The default
//! sink is a [`TranscriptPipeline`]: a bounded publish queue drained into a
//! TTL-bounded [`TranscriptStore`].

mod pipeline;
mod sink;
mod store;

pub use pipeline::TranscriptPipeline;
pub use sink::{Role, TranscriptSink, Utterance};
pub use store::TranscriptStore;
