// ============================================================
// Layer 2 — PrepareUseCase
// ============================================================
// Runs the data pipeline for both corpora:
//
//   Step 1: Load the tokenizer        (Layer 6 - infra)
//   Step 2: Load train / dev JSON     (Layer 4 - data)
//   Step 3: Align answer offsets      (Layer 4 - data)
//   Step 4: Encode + token positions  (Layer 4 - data)
//   Step 5: Wrap as Burn datasets     (Layer 4 - data)
//
// The `prepare` command stops here and prints the statistics;
// `train` continues with the returned datasets.

use std::path::PathBuf;

use anyhow::Result;
use tokenizers::Tokenizer;

use crate::data::{
    aligner::{adjust_answer_indices, AlignmentStats},
    dataset::SquadDataset,
    encoder::QaEncoder,
    loader::SquadLoader,
};
use crate::domain::traits::CorpusSource;

/// What happened to one corpus on its way to a dataset.
#[derive(Debug, Clone)]
pub struct SplitReport {
    pub name:      &'static str,
    pub rows:      usize,
    pub alignment: AlignmentStats,
    pub seq_len:   usize,
    pub sentinel_starts: usize,
    pub sentinel_ends:   usize,
}

impl SplitReport {
    pub fn print(&self, sentinel: usize) {
        println!("── {} ({} rows)", self.name, self.rows);
        println!(
            "   alignment: exact={} shift1={} shift2={} unaligned={}",
            self.alignment.shifted[0],
            self.alignment.shifted[1],
            self.alignment.shifted[2],
            self.alignment.unaligned
        );
        println!("   sequence length: {}", self.seq_len);
        println!(
            "   positions at sentinel {}: starts={} ends={}",
            sentinel, self.sentinel_starts, self.sentinel_ends
        );
    }
}

pub struct PreparedData {
    pub train:    SquadDataset,
    pub dev:      SquadDataset,
    pub reports:  [SplitReport; 2],
    pub sentinel: usize,
}

pub struct PrepareUseCase {
    train_path: PathBuf,
    dev_path:   PathBuf,
    max_length: usize,
}

impl PrepareUseCase {
    pub fn new(train_path: impl Into<PathBuf>, dev_path: impl Into<PathBuf>, max_length: usize) -> Self {
        Self { train_path: train_path.into(), dev_path: dev_path.into(), max_length }
    }

    pub fn execute(&self, tokenizer: Tokenizer) -> Result<PreparedData> {
        let encoder = QaEncoder::new(tokenizer, self.max_length)?;

        let (train, train_report) = prepare_split("train", &SquadLoader::new(&self.train_path), &encoder)?;
        let (dev, dev_report)     = prepare_split("dev", &SquadLoader::new(&self.dev_path), &encoder)?;

        Ok(PreparedData {
            train,
            dev,
            reports:  [train_report, dev_report],
            sentinel: encoder.sentinel(),
        })
    }
}

/// Load, align and encode one corpus.
pub fn prepare_split(
    name:    &'static str,
    source:  &impl CorpusSource,
    encoder: &QaEncoder,
) -> Result<(SquadDataset, SplitReport)> {
    let mut corpus = source.load()?;
    tracing::info!("Loaded {} {} rows", corpus.len(), name);

    let alignment = adjust_answer_indices(&mut corpus);

    let (examples, positions) = encoder.encode(&corpus)?;

    let report = SplitReport {
        name,
        rows: corpus.len(),
        alignment,
        seq_len: examples.first().map(|e| e.seq_len()).unwrap_or(0),
        sentinel_starts: positions.sentinel_starts,
        sentinel_ends:   positions.sentinel_ends,
    };

    Ok((SquadDataset::new(examples), report))
}
