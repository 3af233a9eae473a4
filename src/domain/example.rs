// ============================================================
// Layer 3 — Corpus Domain Types
// ============================================================
// A SQuAD file groups answers under questions under passages.
// We flatten that tree into one row per (passage, question,
// answer) triple, kept as three parallel sequences.
//
// Example:
//   Context:  "The city: Paris"
//   Question: "Which city?"
//   Answer:   text "Paris", answer_start 10, answer_end 15
//
// All offsets are CHARACTER offsets (Unicode scalar values),
// not byte offsets — this is what the JSON files contain.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// One gold answer span inside a context passage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    /// The answer text as written by the annotator
    pub text: String,

    /// Character index of the first answer character
    pub answer_start: usize,

    /// Exclusive character index one past the last answer character.
    /// `None` until the aligner has verified the span against the context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer_end: Option<usize>,
}

impl Answer {
    pub fn new(text: impl Into<String>, answer_start: usize) -> Self {
        Self {
            text:         text.into(),
            answer_start,
            answer_end:   None,
        }
    }

    /// Number of characters in the answer text
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// A borrowed view of one flattened row.
#[derive(Debug, Clone, Copy)]
pub struct Example<'a> {
    pub context:  &'a str,
    pub question: &'a str,
    pub answer:   &'a Answer,
}

/// The flattened corpus as parallel sequences.
///
/// Passages with several questions (or questions with several
/// answers) repeat their context; the repeats share one `Arc<str>`.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    pub contexts:  Vec<Arc<str>>,
    pub questions: Vec<String>,
    pub answers:   Vec<Answer>,
}

impl Corpus {
    pub fn push(&mut self, context: Arc<str>, question: impl Into<String>, answer: Answer) {
        self.contexts.push(context);
        self.questions.push(question.into());
        self.answers.push(answer);
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Example<'_>> {
        Some(Example {
            context:  self.contexts.get(index)?,
            question: self.questions.get(index)?,
            answer:   self.answers.get(index)?,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = Example<'_>> {
        self.contexts
            .iter()
            .zip(&self.questions)
            .zip(&self.answers)
            .map(|((context, question), answer)| Example { context, question, answer })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_len_counts_unicode_scalars() {
        let a = Answer::new("Café", 0);
        assert_eq!(a.char_len(), 4);
        assert_eq!(a.text.len(), 5);
    }

    #[test]
    fn test_iter_keeps_rows_parallel() {
        let ctx: Arc<str> = Arc::from("The city: Paris");
        let mut corpus = Corpus::default();
        corpus.push(ctx.clone(), "Which city?", Answer::new("Paris", 10));
        corpus.push(ctx, "Capital?", Answer::new("Paris", 10));

        let rows: Vec<_> = corpus.iter().collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].question, "Capital?");
        assert!(Arc::ptr_eq(&corpus.contexts[0], &corpus.contexts[1]));
        assert!(corpus.get(2).is_none());
    }
}
