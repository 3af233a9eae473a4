// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from a SQuAD JSON file to tensor batches:
//
//   train-v2.0.json / dev-v2.0.json
//       │
//       ▼
//   SquadLoader       → flattens passages/questions/answers
//       │
//       ▼
//   Aligner           → fixes off-by-one/two answer offsets
//       │
//       ▼
//   QaEncoder         → tokenises pairs, maps chars → tokens
//       │
//       ▼
//   SquadDataset      → implements Burn's Dataset trait
//       │
//       ▼
//   QaBatcher         → stacks samples into tensor batches
//       │
//       ▼
//   BatchSource       → shuffled full or half-size pools
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads SQuAD JSON into a flat corpus
pub mod loader;

/// Character-offset correction of answer spans
pub mod aligner;

/// Tokenization adapter: encodings + token positions
pub mod encoder;

/// Implements Burn's Dataset trait for encoded examples
pub mod dataset;

/// Implements Burn's Batcher trait and the shuffled batch sources
pub mod batcher;
