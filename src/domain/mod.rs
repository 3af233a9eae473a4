// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs and traits describing the SQuAD corpus:
// passages, questions and the character span of each answer.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O or network calls
//   - Only plain Rust structs, enums, and traits

// Answers, examples and the flattened corpus
pub mod example;

// Seams that the data and infra layers implement
pub mod traits;
