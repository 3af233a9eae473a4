// ============================================================
// Layer 5 — Training Loop
// ============================================================
// FineTuner is the explicit run context: it owns the model,
// the optimiser and the scalar sink. Batch sources carry the
// device, so nothing here is process-global.
//
// Per batch:
//   forward(inputs, gold positions) → loss
//   loss.backward() → fresh gradients (Burn never accumulates
//                     across steps, so there is nothing to zero)
//   optimiser step → log "Training Loss" at the global step,
//                    counted across epochs
//
// Key Burn insight:
//   - Training runs on an AutodiffBackend
//   - model.valid() returns the model on the inner backend,
//     which is how evaluation disables gradient tracking
//
// Reference: Burn Book §5, Loshchilov & Hutter (2019) AdamW

use std::time::Instant;

use anyhow::Result;
use burn::{
    module::AutodiffModule,
    optim::{GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::data::batcher::BatchSource;
use crate::domain::traits::ScalarSink;
use crate::infra::metrics::{format_elapsed, mean_or_nan};
use crate::ml::evaluator::evaluate_model;
use crate::ml::model::BertQa;

pub const TRAIN_LOSS_TAG: &str = "Training Loss";

pub struct FineTuner<B, O, S>
where
    B: AutodiffBackend,
    O: Optimizer<BertQa<B>, B>,
    S: ScalarSink,
{
    model:       BertQa<B>,
    optim:       O,
    sink:        S,
    lr:          f64,
    print_every: usize,
}

impl<B, O, S> FineTuner<B, O, S>
where
    B: AutodiffBackend,
    O: Optimizer<BertQa<B>, B>,
    S: ScalarSink,
{
    pub fn new(model: BertQa<B>, optim: O, sink: S, lr: f64, print_every: usize) -> Self {
        Self { model, optim, sink, lr, print_every: print_every.max(1) }
    }

    #[cfg(test)]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Give back the sink so the caller can flush or inspect it.
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Run `epochs` passes over `source`; one average loss per epoch.
    /// "Training Loss" is keyed by a step counter running across epochs.
    pub fn train(&mut self, source: &BatchSource<B>, epochs: usize) -> Result<Vec<f64>> {
        let num_batches = source.num_batches();
        if num_batches == 0 {
            tracing::warn!("Training source is empty; epoch losses will be NaN");
        }
        let mut train_losses = Vec::with_capacity(epochs);
        let total_started = Instant::now();
        // Worker partitions can each end in a partial batch, so an
        // epoch may run more than `num_batches` batches.
        let mut step = 0usize;

        for epoch in 0..epochs {
            let epoch_started = Instant::now();
            let mut total_loss = 0.0f64;
            let mut batches = 0usize;

            println!("\n############ Train Epoch {} ############", epoch + 1);
            for (batch_idx, batch) in source.iter().enumerate() {
                let loss = self.model.forward_loss(batch);
                let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();

                // Backward pass + AdamW update
                let grads = GradientsParams::from_grads(loss.backward(), &self.model);
                self.model = self.optim.step(self.lr, self.model.clone(), grads);

                total_loss += loss_val;
                batches += 1;
                self.sink.add_scalar(TRAIN_LOSS_TAG, loss_val, step)?;
                step += 1;

                if (batch_idx + 1) % self.print_every == 0 {
                    println!("Batch {} / {}, Loss: {:.1}", batch_idx + 1, num_batches, loss_val);
                }
            }

            let avg_loss = mean_or_nan(total_loss, batches);
            train_losses.push(avg_loss);
            println!(
                "Epoch {} finished. Training Loss: {}, Time: {:.2}s\n",
                epoch + 1,
                avg_loss,
                epoch_started.elapsed().as_secs_f64()
            );
            tracing::debug!("Epoch {} average loss {:.4}", epoch + 1, avg_loss);
        }

        println!("Total Training Time: {}", format_elapsed(total_started.elapsed()));
        Ok(train_losses)
    }

    /// Evaluate the current weights on the non-autodiff backend.
    pub fn evaluate(&mut self, source: &BatchSource<B::InnerBackend>) -> Result<Vec<f64>> {
        let model = self.model.valid();
        evaluate_model(&model, source, &mut self.sink, self.print_every)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use burn::optim::AdamWConfig;

    use crate::data::batcher::Pool;
    use crate::data::dataset::{EncodedExample, SquadDataset};
    use crate::infra::metrics::RecordingSink;
    use crate::ml::evaluator::EVAL_LOSS_TAG;
    use crate::ml::model::tests::tiny_config;

    type B = Autodiff<NdArray>;

    fn dataset(n: usize) -> SquadDataset {
        SquadDataset::new(
            (0..n)
                .map(|i| EncodedExample {
                    input_ids:      vec![2, 4 + (i % 10) as u32, 5, 3, 6, 3],
                    token_type_ids: vec![0, 0, 0, 0, 1, 1],
                    attention_mask: vec![1, 1, 1, 1, 1, 1],
                    start_position: 1,
                    // every third row has a sentinel end
                    end_position:   if i % 3 == 0 { 512 } else { 2 },
                })
                .collect(),
        )
    }

    fn tuner() -> FineTuner<B, impl Optimizer<BertQa<B>, B>, RecordingSink> {
        let model: BertQa<B> = tiny_config().init(&Default::default());
        let optim = AdamWConfig::new().with_weight_decay(0.0).init::<B, BertQa<B>>();
        FineTuner::new(model, optim, RecordingSink::default(), 5e-5, 100)
    }

    #[test]
    fn test_train_returns_one_mean_per_epoch() {
        let ds     = dataset(5);
        let source = BatchSource::<B>::new(&ds, Pool::Full, 2, 0, Default::default());
        let mut ft = tuner();

        let losses = ft.train(&source, 2).unwrap();
        assert_eq!(losses.len(), 2);

        let events = ft.sink().series(TRAIN_LOSS_TAG);
        // 3 batches per epoch, global steps 0..6
        assert_eq!(events.iter().map(|e| e.step).collect::<Vec<_>>(), vec![0, 1, 2, 3, 4, 5]);

        for (epoch, avg) in losses.iter().enumerate() {
            let batch_losses: Vec<f64> = events[epoch * 3..epoch * 3 + 3].iter().map(|e| e.value).collect();
            let mean = batch_losses.iter().sum::<f64>() / 3.0;
            assert!(avg.is_finite());
            assert!((avg - mean).abs() < 1e-9);
        }
    }

    #[test]
    fn test_evaluate_returns_single_mean() {
        let ds       = dataset(7);
        let eval_src = BatchSource::<NdArray>::new(&ds, Pool::Full, 3, 0, Default::default());
        let mut ft   = tuner();

        let losses = ft.evaluate(&eval_src).unwrap();
        assert_eq!(losses.len(), 1);

        let events = ft.sink().series(EVAL_LOSS_TAG);
        assert_eq!(events.len(), 3);
        assert_eq!(events.iter().map(|e| e.step).collect::<Vec<_>>(), vec![0, 1, 2]);

        let mean = events.iter().map(|e| e.value).sum::<f64>() / 3.0;
        assert!((losses[0] - mean).abs() < 1e-9);
        assert!(ft.sink().series(TRAIN_LOSS_TAG).is_empty());
    }

    #[test]
    fn test_empty_source_gives_nan() {
        let ds     = dataset(0);
        let source = BatchSource::<B>::new(&ds, Pool::Full, 2, 0, Default::default());
        let mut ft = tuner();

        let losses = ft.train(&source, 1).unwrap();
        assert_eq!(losses.len(), 1);
        assert!(losses[0].is_nan());
    }

    #[test]
    fn test_worker_partitions_keep_steps_and_means_consistent() {
        // 2 workers x 5 items with batch 4 → two partial batches per epoch
        let ds     = dataset(10);
        let source = BatchSource::<B>::new(&ds, Pool::Full, 4, 2, Default::default());
        let mut ft = tuner();

        let losses = ft.train(&source, 2).unwrap();
        let events = ft.sink().series(TRAIN_LOSS_TAG);

        let steps: Vec<usize> = events.iter().map(|e| e.step).collect();
        assert_eq!(steps, (0..events.len()).collect::<Vec<_>>());
        assert_eq!(events.len() % 2, 0);

        let per_epoch = events.len() / 2;
        for (epoch, avg) in losses.iter().enumerate() {
            let slice = &events[epoch * per_epoch..(epoch + 1) * per_epoch];
            let mean  = slice.iter().map(|e| e.value).sum::<f64>() / per_epoch as f64;
            assert!((avg - mean).abs() < 1e-9);
        }

        let eval_src = BatchSource::<NdArray>::new(&ds, Pool::Full, 4, 2, Default::default());
        let eval = ft.evaluate(&eval_src).unwrap();
        let eval_events = ft.sink().series(EVAL_LOSS_TAG);
        let mean = eval_events.iter().map(|e| e.value).sum::<f64>() / eval_events.len() as f64;
        assert!((eval[0] - mean).abs() < 1e-9);
    }
}
