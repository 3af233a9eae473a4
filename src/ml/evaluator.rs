// ============================================================
// Layer 5 — Evaluation Loop
// ============================================================
// One pass over an evaluation source with a model on a plain
// (non-autodiff) backend. Gold positions are still fed in so
// the loss is comparable with training; no span is decoded.

use std::time::Instant;

use anyhow::Result;
use burn::prelude::*;

use crate::data::batcher::BatchSource;
use crate::domain::traits::ScalarSink;
use crate::infra::metrics::{format_elapsed, mean_or_nan};
use crate::ml::model::BertQa;

pub const EVAL_LOSS_TAG: &str = "Evaluation Loss";

/// Returns a single-element list holding the mean batch loss.
pub fn evaluate_model<B: Backend, S: ScalarSink>(
    model:       &BertQa<B>,
    source:      &BatchSource<B>,
    mut sink:    S,
    print_every: usize,
) -> Result<Vec<f64>> {
    let num_batches = source.num_batches();
    let print_every = print_every.max(1);
    let started     = Instant::now();
    let mut total_loss = 0.0f64;
    let mut batches = 0usize;

    println!("\n############ Evaluation ############");
    for (batch_idx, batch) in source.iter().enumerate() {
        let loss_val: f64 = model.forward_loss(batch).into_scalar().elem::<f64>();
        total_loss += loss_val;
        batches += 1;

        sink.add_scalar(EVAL_LOSS_TAG, loss_val, batch_idx)?;

        if (batch_idx + 1) % print_every == 0 {
            println!("Batch {} / {}, Loss: {:.1}", batch_idx + 1, num_batches, loss_val);
        }
    }

    if batches == 0 {
        tracing::warn!("Evaluation source is empty; reporting NaN loss");
    }
    let avg_loss = mean_or_nan(total_loss, batches);
    println!("Evaluation finished. Validation Loss: {}\n", avg_loss);
    println!("Total Evaluation Time: {}", format_elapsed(started.elapsed()));

    Ok(vec![avg_loss])
}
