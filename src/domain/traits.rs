// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer only talks to these traits, so the
// SQuAD JSON loader and the CSV scalar writer can be swapped
// out (tests use an in-memory sink).

use anyhow::Result;

use crate::domain::example::Corpus;

// ─── CorpusSource ─────────────────────────────────────────────────────────────
/// Any component that can produce a flattened QA corpus.
///
/// Implementations:
///   - SquadLoader → reads a SQuAD v1/v2 JSON file
pub trait CorpusSource {
    fn load(&self) -> Result<Corpus>;
}

// ─── ScalarSink ───────────────────────────────────────────────────────────────
/// Receives one scalar per training or evaluation step.
///
/// `tag` names the series ("Training Loss", "Evaluation Loss"),
/// `step` is monotonically increasing within a series.
pub trait ScalarSink {
    fn add_scalar(&mut self, tag: &str, value: f64, step: usize) -> Result<()>;
}

impl<S: ScalarSink + ?Sized> ScalarSink for &mut S {
    fn add_scalar(&mut self, tag: &str, value: f64, step: usize) -> Result<()> {
        (**self).add_scalar(tag, value, step)
    }
}
