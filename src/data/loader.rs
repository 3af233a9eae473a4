// ============================================================
// Layer 4 — Corpus Loader
// ============================================================
// Reads a SQuAD-style JSON file with serde and flattens it.
//
// File layout:
//   { "data": [
//       { "paragraphs": [
//           { "context": "...",
//             "qas": [
//               { "question": "...",
//                 "answers": [ { "text": "...", "answer_start": 42 } ] }
//             ] }
//       ] }
//   ] }
//
// One output row per answer, in file order. Unknown keys
// (title, id, is_impossible, plausible_answers, version) are
// ignored; missing required keys are a hard error.

use std::{fs, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::domain::example::{Answer, Corpus};
use crate::domain::traits::CorpusSource;

#[derive(Debug, Deserialize)]
struct SquadFile {
    data: Vec<SquadArticle>,
}

#[derive(Debug, Deserialize)]
struct SquadArticle {
    paragraphs: Vec<SquadParagraph>,
}

#[derive(Debug, Deserialize)]
struct SquadParagraph {
    context: String,
    qas:     Vec<SquadQuestion>,
}

#[derive(Debug, Deserialize)]
struct SquadQuestion {
    question: String,
    answers:  Vec<SquadAnswer>,
}

#[derive(Debug, Deserialize)]
struct SquadAnswer {
    text:         String,
    answer_start: usize,
}

/// Loads a SQuAD JSON corpus from disk.
pub struct SquadLoader {
    path: PathBuf,
}

impl SquadLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CorpusSource for SquadLoader {
    fn load(&self) -> Result<Corpus> {
        let json = fs::read_to_string(&self.path)
            .with_context(|| format!("Cannot read corpus '{}'", self.path.display()))?;
        let corpus = parse_corpus(&json)
            .with_context(|| format!("Malformed corpus '{}'", self.path.display()))?;

        tracing::info!(
            "Loaded {} (context, question, answer) rows from '{}'",
            corpus.len(),
            self.path.display()
        );
        if let Some(first) = corpus.get(0) {
            tracing::debug!("First row: '{}' → '{}'", first.question, first.answer.text);
        }
        Ok(corpus)
    }
}

/// Parse and flatten a SQuAD JSON document.
pub fn parse_corpus(json: &str) -> Result<Corpus> {
    let file: SquadFile = serde_json::from_str(json)?;
    let mut corpus = Corpus::default();

    for article in file.data {
        for paragraph in article.paragraphs {
            let context: Arc<str> = Arc::from(paragraph.context);
            for qa in paragraph.qas {
                for answer in qa.answers {
                    corpus.push(
                        Arc::clone(&context),
                        qa.question.as_str(),
                        Answer::new(answer.text, answer.answer_start),
                    );
                }
            }
        }
    }

    Ok(corpus)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "version": "v2.0",
        "data": [{
            "title": "France",
            "paragraphs": [
                {
                    "context": "The city: Paris",
                    "qas": [
                        { "id": "q1", "question": "Which city?",
                          "answers": [ { "text": "Paris", "answer_start": 10 },
                                       { "text": "Paris", "answer_start": 10 } ],
                          "is_impossible": false },
                        { "id": "q2", "question": "Which river?",
                          "answers": [], "plausible_answers": [ { "text": "Seine", "answer_start": 0 } ],
                          "is_impossible": true }
                    ]
                },
                {
                    "context": "Lyon is second.",
                    "qas": [ { "question": "Which is second?",
                               "answers": [ { "text": "Lyon", "answer_start": 0 } ] } ]
                }
            ]
        }]
    }"#;

    #[test]
    fn test_flattens_one_row_per_answer() {
        let corpus = parse_corpus(SAMPLE).unwrap();
        // 2 answers for q1, none for q2, 1 for the Lyon question
        assert_eq!(corpus.len(), 3);
        assert_eq!(corpus.questions, vec!["Which city?", "Which city?", "Which is second?"]);
        assert_eq!(&*corpus.contexts[2], "Lyon is second.");
        assert_eq!(corpus.answers[0].answer_start, 10);
        assert_eq!(corpus.answers[0].answer_end, None);
    }

    #[test]
    fn test_duplicate_contexts_share_storage() {
        let corpus = parse_corpus(SAMPLE).unwrap();
        assert!(Arc::ptr_eq(&corpus.contexts[0], &corpus.contexts[1]));
    }

    #[test]
    fn test_missing_key_is_an_error() {
        let json = r#"{ "data": [ { "paragraphs": [ { "context": "x" } ] } ] }"#;
        assert!(parse_corpus(json).is_err());
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(parse_corpus("{ not json").is_err());
    }

    #[test]
    fn test_loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let corpus = SquadLoader::new(file.path()).load().unwrap();
        assert_eq!(corpus.len(), 3);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = SquadLoader::new("does/not/exist.json").load().unwrap_err();
        assert!(err.to_string().contains("does/not/exist.json"));
    }
}
