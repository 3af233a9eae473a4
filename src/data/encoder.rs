// ============================================================
// Layer 4 — Tokenization Adapter
// ============================================================
// Turns (context, question) pairs into model inputs and maps
// each answer's character span onto token positions.
//
//   [CLS] context tokens [SEP] question tokens [SEP] [PAD]...
//    └──────── sequence 0 ───────┘ └─── sequence 1 ───┘
//
// The whole corpus is encoded in ONE call so that padding is
// to the longest pair of the corpus, not of each batch.
//
// Character → token mapping rules:
//   start: char_to_token(answer_start), else SENTINEL
//   end:   char_to_token(answer_end), else char_to_token(end - 1),
//          else SENTINEL
//
// SENTINEL is the configured max_length. It marks a position
// that the truncated encoding cannot represent; the loss
// ignores it.

use anyhow::{anyhow, Result};
use tokenizers::{
    EncodeInput, Encoding, PaddingParams, PaddingStrategy, Tokenizer, TruncationParams,
    TruncationStrategy,
};

use crate::data::dataset::EncodedExample;
use crate::domain::example::{Answer, Corpus};

/// Token positions aligned with the encodings, one per row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenPositions {
    pub start_positions: Vec<usize>,
    pub end_positions:   Vec<usize>,
    /// Rows whose start fell back to the sentinel
    pub sentinel_starts: usize,
    /// Rows whose end fell back to the sentinel
    pub sentinel_ends:   usize,
}

/// Wraps a tokenizer configured for truncated, padded pair encoding.
pub struct QaEncoder {
    tokenizer:  Tokenizer,
    max_length: usize,
}

impl QaEncoder {
    /// Configure `tokenizer` for longest-first truncation to
    /// `max_length` and corpus-wide longest padding.
    pub fn new(mut tokenizer: Tokenizer, max_length: usize) -> Result<Self> {
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length,
                strategy: TruncationStrategy::LongestFirst,
                ..Default::default()
            }))
            .map_err(|e| anyhow!("Cannot configure truncation: {e}"))?;
        let padding = padding_params(&tokenizer)?;
        tokenizer.with_padding(Some(padding));

        Ok(Self { tokenizer, max_length })
    }

    /// The out-of-range marker used for unrepresentable positions
    pub fn sentinel(&self) -> usize {
        self.max_length
    }

    /// Encode every (context, question) pair of the corpus in one batch.
    pub fn encode_pairs(&self, corpus: &Corpus) -> Result<Vec<Encoding>> {
        let inputs: Vec<EncodeInput> = corpus
            .iter()
            .map(|ex| (ex.context, ex.question).into())
            .collect();

        self.tokenizer
            .encode_batch_char_offsets(inputs, true)
            .map_err(|e| anyhow!("Tokenisation error: {e}"))
    }

    /// Full adapter: encode, map positions, and build dataset items.
    pub fn encode(&self, corpus: &Corpus) -> Result<(Vec<EncodedExample>, TokenPositions)> {
        let encodings = self.encode_pairs(corpus)?;
        let positions = add_token_positions(&encodings, &corpus.answers, self.sentinel());

        tracing::info!(
            "Encoded {} pairs to length {}; {} starts and {} ends fell back to sentinel {}",
            encodings.len(),
            encodings.first().map(|e| e.len()).unwrap_or(0),
            positions.sentinel_starts,
            positions.sentinel_ends,
            self.sentinel(),
        );

        Ok((build_examples(&encodings, &positions), positions))
    }
}

/// Batch-longest padding with the tokenizer's own pad token: the one in
/// its padding config if it has one, else its `[PAD]`.
fn padding_params(tokenizer: &Tokenizer) -> Result<PaddingParams> {
    if let Some(existing) = tokenizer.get_padding() {
        return Ok(PaddingParams { strategy: PaddingStrategy::BatchLongest, ..existing.clone() });
    }
    let pad_token = "[PAD]";
    let pad_id = tokenizer
        .token_to_id(pad_token)
        .ok_or_else(|| anyhow!("Tokenizer has no padding config and no {pad_token} token"))?;
    Ok(PaddingParams { pad_id, pad_token: pad_token.to_string(), ..Default::default() })
}

/// Map each answer's character span to token indices of sequence 0.
pub fn add_token_positions(
    encodings: &[Encoding],
    answers:   &[Answer],
    sentinel:  usize,
) -> TokenPositions {
    let mut out = TokenPositions::default();

    for (enc, answer) in encodings.iter().zip(answers) {
        let start = enc.char_to_token(answer.answer_start, 0).unwrap_or_else(|| {
            out.sentinel_starts += 1;
            sentinel
        });

        let end = answer
            .answer_end
            .and_then(|end| {
                enc.char_to_token(end, 0)
                    .or_else(|| end.checked_sub(1).and_then(|e| enc.char_to_token(e, 0)))
            })
            .unwrap_or_else(|| {
                out.sentinel_ends += 1;
                sentinel
            });

        out.start_positions.push(start);
        out.end_positions.push(end);
    }

    out
}

/// Zip encodings and positions into owned dataset items.
pub fn build_examples(encodings: &[Encoding], positions: &TokenPositions) -> Vec<EncodedExample> {
    encodings
        .iter()
        .zip(&positions.start_positions)
        .zip(&positions.end_positions)
        .map(|((enc, &start), &end)| EncodedExample {
            input_ids:      enc.get_ids().to_vec(),
            token_type_ids: enc.get_type_ids().to_vec(),
            attention_mask: enc.get_attention_mask().to_vec(),
            start_position: start,
            end_position:   end,
        })
        .collect()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::str::FromStr;
    use std::sync::Arc;

    use crate::data::aligner::adjust_answer_indices;

    /// Word-level BERT-style tokenizer over a fixed vocabulary.
    /// [PAD]=0 [UNK]=1 [CLS]=2 [SEP]=3, words from 4.
    pub(crate) fn word_tokenizer(words: &[&str]) -> Tokenizer {
        let mut vocab = serde_json::json!({ "[PAD]": 0, "[UNK]": 1, "[CLS]": 2, "[SEP]": 3 });
        for (i, w) in words.iter().enumerate() {
            vocab[*w] = serde_json::json!(i + 4);
        }
        let special = |id: u32, content: &str| serde_json::json!({
            "id": id, "content": content, "single_word": false, "lstrip": false,
            "rstrip": false, "normalized": false, "special": true
        });

        let json = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": [
                special(0, "[PAD]"), special(1, "[UNK]"), special(2, "[CLS]"), special(3, "[SEP]")
            ],
            "normalizer": {
                "type": "BertNormalizer",
                "clean_text": true,
                "handle_chinese_chars": true,
                "strip_accents": null,
                "lowercase": true
            },
            "pre_tokenizer": { "type": "Whitespace" },
            "post_processor": {
                "type": "BertProcessing",
                "sep": ["[SEP]", 3],
                "cls": ["[CLS]", 2]
            },
            "decoder": null,
            "model": { "type": "WordLevel", "vocab": vocab, "unk_token": "[UNK]" }
        });

        Tokenizer::from_str(&json.to_string()).unwrap()
    }

    fn corpus(rows: &[(&str, &str, &str, usize)]) -> Corpus {
        let mut corpus = Corpus::default();
        for &(context, question, text, start) in rows {
            corpus.push(Arc::from(context), question, Answer::new(text, start));
        }
        corpus
    }

    const WORDS: &[&str] = &[
        "the", "capital", "of", "france", "is", "paris", "where", "one", "two", "three",
        "four", "five", "six", "seven", "big",
    ];

    #[test]
    fn test_answer_span_maps_to_context_tokens() {
        // [CLS] the capital of france is paris [SEP] where is paris [SEP]
        //   0    1     2     3    4     5   6     7     8    9   10    11
        let mut c = corpus(&[("the capital of france is paris", "where is paris", "paris", 25)]);
        adjust_answer_indices(&mut c);

        let encoder  = QaEncoder::new(word_tokenizer(WORDS), 32).unwrap();
        let (examples, _) = encoder.encode(&c).unwrap();

        assert_eq!(examples.len(), 1);
        assert_eq!(examples[0].start_position, 6);
        // answer_end (30) is past the text, so end-1 is used
        assert_eq!(examples[0].end_position, 6);
        assert_eq!(examples[0].input_ids[6], 4 + 5); // "paris"
        assert_eq!(examples[0].token_type_ids[8], 1);
    }

    #[test]
    fn test_truncated_answer_yields_sentinel() {
        let max_length = 6;
        let mut c = corpus(&[(
            "one two three four five six seven paris",
            "where",
            "paris",
            34,
        )]);
        adjust_answer_indices(&mut c);
        assert_eq!(c.answers[0].answer_end, Some(39));

        let encoder  = QaEncoder::new(word_tokenizer(WORDS), max_length).unwrap();
        let (examples, _) = encoder.encode(&c).unwrap();

        assert_eq!(examples[0].input_ids.len(), max_length);
        assert_eq!(examples[0].start_position, max_length);
        assert_eq!(examples[0].end_position, max_length);
    }

    #[test]
    fn test_unaligned_answer_end_becomes_sentinel() {
        // Start 0 is wrong by more than two chars and stays unaligned
        let c = corpus(&[("the capital of france is paris", "where", "paris", 0)]);

        let encoder   = QaEncoder::new(word_tokenizer(WORDS), 32).unwrap();
        let encodings = encoder.encode_pairs(&c).unwrap();
        let positions = add_token_positions(&encodings, &c.answers, encoder.sentinel());

        assert_eq!(positions.start_positions, vec![1]);
        assert_eq!(positions.end_positions, vec![32]);
        assert_eq!(positions.sentinel_ends, 1);
        assert_eq!(positions.sentinel_starts, 0);
    }

    #[test]
    fn test_padding_is_corpus_wide_and_positions_bounded() {
        let mut c = corpus(&[
            ("the capital of france is paris", "where is paris", "paris", 25),
            ("paris is big", "where", "big", 9),
            ("one two three four five six seven paris", "where", "paris", 34),
        ]);
        adjust_answer_indices(&mut c);

        let encoder  = QaEncoder::new(word_tokenizer(WORDS), 10).unwrap();
        let (examples, _) = encoder.encode(&c).unwrap();

        let len = examples[0].input_ids.len();
        for ex in &examples {
            assert_eq!(ex.input_ids.len(), len);
            assert_eq!(ex.attention_mask.len(), len);
            assert!(ex.start_position <= encoder.sentinel());
            assert!(ex.end_position <= encoder.sentinel());
        }
        // "paris is big" is shorter than the longest pair, so it is padded
        assert_eq!(*examples[1].attention_mask.last().unwrap(), 0);
        assert_eq!(*examples[1].input_ids.last().unwrap(), 0);
    }

    #[test]
    fn test_configured_pad_token_is_kept() {
        let mut tokenizer = word_tokenizer(WORDS);
        tokenizer.with_padding(Some(PaddingParams {
            strategy:  PaddingStrategy::Fixed(64),
            pad_id:    1,
            pad_token: "[UNK]".to_string(),
            ..Default::default()
        }));
        let c = corpus(&[
            ("the capital of france is paris", "where is paris", "paris", 25),
            ("paris is big", "where", "big", 9),
        ]);

        let encoder = QaEncoder::new(tokenizer, 32).unwrap();
        let (examples, _) = encoder.encode(&c).unwrap();

        // batch-longest, not the configured fixed length
        assert_eq!(examples[0].input_ids.len(), 12);
        assert_eq!(*examples[1].input_ids.last().unwrap(), 1);
    }

    #[test]
    fn test_tokenizer_without_pad_token_is_rejected() {
        use std::collections::HashMap;
        use tokenizers::models::wordlevel::WordLevel;

        let vocab: HashMap<String, u32> =
            [("[UNK]".to_string(), 0), ("paris".to_string(), 1)].into_iter().collect();
        let model = WordLevel::builder()
            .vocab(vocab)
            .unk_token("[UNK]".to_string())
            .build()
            .unwrap();

        let err = QaEncoder::new(Tokenizer::new(model), 32).err().unwrap();
        assert!(err.to_string().contains("[PAD]"));
    }
}
