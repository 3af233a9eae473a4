// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All Burn model and optimisation code lives here.
//
//   model.rs     — BERT encoder + span head
//                  • Token, position and segment embeddings
//                  • Multi-head self-attention with padding mask
//                  • Feed-forward networks (GELU activation)
//                  • Post-layer normalisation, residuals
//                  • Two-logit start/end head, masked CE loss
//
//   trainer.rs   — FineTuner run context and the training loop
//
//   evaluator.rs — Gradient-free evaluation loop
//
// Reference: Devlin et al. (2019) BERT
//            Burn Book §3 (Building Blocks), §5 (Training)

/// BERT encoder with a question-answering span head
pub mod model;

/// Training loop owning model, optimiser and scalar sink
pub mod trainer;

/// Evaluation loop (loss only)
pub mod evaluator;
