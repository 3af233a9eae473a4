use std::sync::Arc;

use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

/// One encoded (context, question) pair with its gold token span.
/// Sequence format: [CLS] context [SEP] question [SEP] [PAD]...
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedExample {
    pub input_ids:      Vec<u32>,
    pub token_type_ids: Vec<u32>,
    pub attention_mask: Vec<u32>,
    /// Token index of the answer start, or the sentinel
    pub start_position: usize,
    /// Token index of the answer end, or the sentinel
    pub end_position:   usize,
}

impl EncodedExample {
    pub fn seq_len(&self) -> usize {
        self.input_ids.len()
    }
}

/// In-memory dataset of encoded examples.
///
/// Shared behind an `Arc` so the full and half-size batch
/// sources can both read it without copying.
#[derive(Debug, Clone)]
pub struct SquadDataset {
    examples: Arc<Vec<EncodedExample>>,
}

impl SquadDataset {
    pub fn new(examples: Vec<EncodedExample>) -> Self {
        Self { examples: Arc::new(examples) }
    }
}

impl Dataset<EncodedExample> for SquadDataset {
    fn get(&self, index: usize) -> Option<EncodedExample> {
        self.examples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.examples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_len_and_get() {
        let ex = EncodedExample {
            input_ids:      vec![2, 5, 3],
            token_type_ids: vec![0, 0, 0],
            attention_mask: vec![1, 1, 1],
            start_position: 1,
            end_position:   1,
        };
        let ds = SquadDataset::new(vec![ex.clone(), ex]);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.get(0).unwrap().seq_len(), 3);
        assert!(ds.get(2).is_none());
    }
}
