// ============================================================
// Layer 4 — Answer Aligner
// ============================================================
// Some SQuAD annotations point one or two characters past the
// real answer. For each answer we compute
//
//   answer_end = answer_start + len(text)
//
// and compare context[start..end] with the answer text. If it
// does not match we retry with both indices shifted back by 1,
// then by 2. The first match wins and sets `answer_end`.
//
// When no window matches, `answer_end` stays `None` and the
// tokenization adapter later turns it into the sentinel
// position. Nothing beyond a 2-character shift is attempted.
//
// Indices are characters. Slices clamp to the context length,
// and a shift that would move the start below 0 is skipped.

use crate::domain::example::{Answer, Corpus};

/// Largest backwards shift the aligner tries.
pub const MAX_SHIFT: usize = 2;

/// Outcome of aligning one answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    /// Matched after shifting back by this many characters (0 = exact)
    Shifted(usize),
    /// No window in 0..=MAX_SHIFT matched
    Unaligned,
}

/// Per-corpus alignment counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlignmentStats {
    /// `shifted[k]` counts answers matched with shift k
    pub shifted:   [usize; MAX_SHIFT + 1],
    pub unaligned: usize,
}

impl AlignmentStats {
    pub fn total(&self) -> usize {
        self.shifted.iter().sum::<usize>() + self.unaligned
    }
}

/// Slice `text` by character indices, clamped like a Python slice.
fn char_slice(text: &str, start: usize, end: usize) -> &str {
    let byte_at = |n: usize| {
        text.char_indices()
            .nth(n)
            .map(|(b, _)| b)
            .unwrap_or(text.len())
    };
    let start = byte_at(start);
    let end   = byte_at(end).max(start);
    &text[start..end]
}

/// Align one answer against its context, updating it in place.
pub fn align_answer(answer: &mut Answer, context: &str) -> Alignment {
    let start = answer.answer_start;
    let end   = start.saturating_add(answer.char_len());

    for shift in 0..=MAX_SHIFT {
        if shift > start {
            break;
        }
        if char_slice(context, start - shift, end - shift) == answer.text {
            answer.answer_start = start - shift;
            answer.answer_end   = Some(end - shift);
            return Alignment::Shifted(shift);
        }
    }

    Alignment::Unaligned
}

/// Align every answer of the corpus against its own context.
pub fn adjust_answer_indices(corpus: &mut Corpus) -> AlignmentStats {
    let mut stats = AlignmentStats::default();

    for (answer, context) in corpus.answers.iter_mut().zip(&corpus.contexts) {
        match align_answer(answer, context) {
            Alignment::Shifted(k) => stats.shifted[k] += 1,
            Alignment::Unaligned => {
                tracing::debug!(
                    "Answer '{}' at char {} not found within {} chars",
                    answer.text,
                    answer.answer_start,
                    MAX_SHIFT
                );
                stats.unaligned += 1;
            }
        }
    }

    tracing::info!(
        "Aligned {} answers: exact={} shift1={} shift2={} unaligned={}",
        stats.total(),
        stats.shifted[0],
        stats.shifted[1],
        stats.shifted[2],
        stats.unaligned,
    );
    stats
}
