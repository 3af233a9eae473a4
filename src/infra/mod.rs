// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns shared by the use cases:
//
//   pretrained.rs — Resolves a model id to tokenizer.json,
//                   config.json and pytorch_model.bin, from a
//                   local directory or the HuggingFace Hub.
//
//   checkpoint.rs — Loads the pretrained PyTorch encoder
//                   weights into the Burn model.
//
//   device.rs     — Picks the single wgpu device for the run.
//
//   metrics.rs    — Timestamped scalar log directory and the
//                   elapsed-time / averaging helpers.
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)

/// Pretrained file resolution (local or HuggingFace Hub)
pub mod pretrained;

/// PyTorch checkpoint → Burn record loading
pub mod checkpoint;

/// Compute device selection
pub mod device;

/// Scalar event logging
pub mod metrics;
