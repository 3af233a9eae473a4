// ============================================================
// Layer 6 — Pretrained Checkpoint Loader
// ============================================================
// Loads the encoder half of a HuggingFace BERT checkpoint
// (pytorch_model.bin) into our Burn modules with burn-import's
// PyTorchFileRecorder. The QA head is not in the checkpoint
// and keeps its fresh initialisation.
//
// HuggingFace key                              → our module path
//   bert.embeddings.word_embeddings.weight     → embeddings.word_embeddings.weight
//   bert.embeddings.LayerNorm.{weight,gamma}   → embeddings.layer_norm.gamma
//   bert.encoder.layer.N.attention.self.query  → encoder.layer.N.attention.query
//   bert.encoder.layer.N.attention.output.dense→ encoder.layer.N.attention.output
//   bert.encoder.layer.N.attention.output.LayerNorm → encoder.layer.N.attention_norm
//   bert.encoder.layer.N.intermediate.dense    → encoder.layer.N.intermediate
//   bert.encoder.layer.N.output.dense          → encoder.layer.N.output
//   bert.encoder.layer.N.output.LayerNorm      → encoder.layer.N.output_norm
//
// Remaps run in order on every key; Linear weights are
// transposed by the recorder. Keys with no matching field
// (pooler, MLM head) are ignored.
//
// Reference: Burn Book (Importing PyTorch models)

use std::path::Path;

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, Recorder},
};
use burn_import::pytorch::{LoadArgs, PyTorchFileRecorder};

use crate::ml::model::{BertModelRecord, BertQa};

/// (pattern, replacement) pairs applied in order.
pub const KEY_REMAPS: &[(&str, &str)] = &[
    (r"^bert\.(.*)$", "$1"),
    (r"^encoder\.layer\.([0-9]+)\.attention\.self\.(query|key|value)\.(.*)$", "encoder.layer.$1.attention.$2.$3"),
    (r"^encoder\.layer\.([0-9]+)\.attention\.output\.dense\.(.*)$", "encoder.layer.$1.attention.output.$2"),
    (r"^encoder\.layer\.([0-9]+)\.attention\.output\.LayerNorm\.(.*)$", "encoder.layer.$1.attention_norm.$2"),
    (r"^encoder\.layer\.([0-9]+)\.intermediate\.dense\.(.*)$", "encoder.layer.$1.intermediate.$2"),
    (r"^encoder\.layer\.([0-9]+)\.output\.dense\.(.*)$", "encoder.layer.$1.output.$2"),
    (r"^encoder\.layer\.([0-9]+)\.output\.LayerNorm\.(.*)$", "encoder.layer.$1.output_norm.$2"),
    (r"^embeddings\.LayerNorm\.(.*)$", "embeddings.layer_norm.$1"),
    (r"^(.*norm)\.(weight|gamma)$", "$1.gamma"),
    (r"^(.*norm)\.(bias|beta)$", "$1.beta"),
];

/// Replace the encoder weights of `model` with the checkpoint's.
pub fn load_encoder_weights<B: Backend>(
    model:  BertQa<B>,
    path:   &Path,
    device: &B::Device,
) -> Result<BertQa<B>> {
    let args = KEY_REMAPS
        .iter()
        .fold(LoadArgs::new(path.to_path_buf()), |args, (pattern, replacement)| {
            args.with_key_remap(pattern, replacement)
        });

    let record: BertModelRecord<B> = PyTorchFileRecorder::<FullPrecisionSettings>::default()
        .load(args, device)
        .with_context(|| format!("Cannot load encoder weights from '{}'", path.display()))?;

    tracing::info!("Loaded pretrained encoder weights from '{}'", path.display());

    let BertQa { bert, qa_outputs } = model;
    Ok(BertQa { bert: bert.load_record(record), qa_outputs })
}
