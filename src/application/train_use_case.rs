// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full fine-tuning pipeline in order:
//
//   Step 1: Pick the wgpu device         (Layer 6 - infra)
//   Step 2: Resolve pretrained files     (Layer 6 - infra)
//   Step 3: Load, align, encode corpora  (Layer 2 - prepare)
//   Step 4: Build model + load weights   (Layer 5 / 6)
//   Step 5: Open the scalar log run dir  (Layer 6 - infra)
//   Step 6: Build train / eval sources   (Layer 4 - data)
//   Step 7: Train, then evaluate         (Layer 5 - ml)
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Result};
use burn::{
    backend::{Autodiff, Wgpu},
    optim::AdamWConfig,
};
use serde::{Deserialize, Serialize};

use crate::application::prepare_use_case::PrepareUseCase;
use crate::data::batcher::{BatchSource, Pool};
use crate::infra::{
    checkpoint::load_encoder_weights,
    device::{select_device, DeviceChoice},
    metrics::{format_elapsed, timestamped_dir, ScalarWriter},
    pretrained::PretrainedStore,
};
use crate::ml::{
    model::{BertQa, BertQaConfig},
    trainer::FineTuner,
};

/// Gradient-tracking backend for the training loop
type TrainBackend = Autodiff<Wgpu>;
/// Plain backend for evaluation
type EvalBackend = Wgpu;

// ─── Training Configuration ──────────────────────────────────────────────────
// Every knob of a run. The defaults reproduce the stock
// bert-base-uncased SQuAD v2 fine-tune; a copy is written
// into the run's log directory as config.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub train_path:      PathBuf,
    pub dev_path:        PathBuf,
    pub model_id:        String,
    pub max_length:      usize,
    /// Batch size of a `full` pool
    pub batch_size:      usize,
    /// Batch size of a `half` pool
    pub half_batch_size: usize,
    pub train_pool:      Pool,
    pub eval_pool:       Pool,
    pub epochs:          usize,
    pub lr:              f64,
    pub weight_decay:    f32,
    pub epsilon:         f32,
    pub print_every:     usize,
    pub log_root:        PathBuf,
    pub num_workers:     usize,
    pub device:          DeviceChoice,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            train_path:      "./data/train-v2.0.json".into(),
            dev_path:        "./data/dev-v2.0.json".into(),
            model_id:        "bert-base-uncased".to_string(),
            max_length:      512,
            batch_size:      8,
            half_batch_size: 16,
            train_pool:      Pool::Full,
            eval_pool:       Pool::Full,
            epochs:          2,
            lr:              5e-5,
            weight_decay:    0.0,
            epsilon:         1e-6,
            print_every:     100,
            log_root:        "logs/fit".into(),
            num_workers:     0,
            device:          DeviceChoice::Auto,
        }
    }
}

impl TrainConfig {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 || self.half_batch_size == 0 {
            bail!("Batch sizes must be positive (got {} and {})", self.batch_size, self.half_batch_size);
        }
        if self.max_length < 2 {
            bail!("max_length must leave room for special tokens (got {})", self.max_length);
        }
        if self.lr.is_nan() || self.lr <= 0.0 {
            bail!("Learning rate must be positive (got {})", self.lr);
        }
        Ok(())
    }

    /// Truncated sequences must fit the encoder's position table.
    pub fn check_model(&self, model: &BertQaConfig) -> Result<()> {
        if self.max_length > model.max_position_embeddings {
            bail!(
                "max_length {} exceeds the {} positions of '{}'",
                self.max_length,
                model.max_position_embeddings,
                self.model_id
            );
        }
        Ok(())
    }

    /// Batch size used for a source drawing from `pool`.
    pub fn batch_size_for(&self, pool: Pool) -> usize {
        match pool {
            Pool::Full => self.batch_size,
            Pool::Half => self.half_batch_size,
        }
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

/// Per-epoch training averages and the single evaluation average.
#[derive(Debug, Clone)]
pub struct TrainOutcome {
    pub train_losses: Vec<f64>,
    pub eval_losses:  Vec<f64>,
    pub log_dir:      PathBuf,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<TrainOutcome> {
        let cfg = &self.config;
        cfg.validate()?;

        // ── Step 1: Device ────────────────────────────────────────────────────
        let device = select_device(cfg.device);

        // ── Step 2: Pretrained files ──────────────────────────────────────────
        let store = PretrainedStore::open(&cfg.model_id)?;
        let model_config = store.config()?;
        cfg.check_model(&model_config)?;
        let tokenizer = store.tokenizer()?;

        // ── Step 3: Data pipeline ─────────────────────────────────────────────
        let prepared = PrepareUseCase::new(&cfg.train_path, &cfg.dev_path, cfg.max_length)
            .execute(tokenizer)?;
        for report in &prepared.reports {
            report.print(prepared.sentinel);
        }

        // ── Step 4: Model ─────────────────────────────────────────────────────
        // Encoder weights from the checkpoint, QA head freshly initialised.
        let model: BertQa<TrainBackend> = model_config.init(&device);
        let model = load_encoder_weights(model, &store.weights()?, &device)?;

        let optim = AdamWConfig::new()
            .with_weight_decay(cfg.weight_decay)
            .with_epsilon(cfg.epsilon)
            .init::<TrainBackend, BertQa<TrainBackend>>();

        // ── Step 5: Scalar logs ───────────────────────────────────────────────
        let writer = ScalarWriter::create(timestamped_dir(&cfg.log_root))?;
        writer.write_json("config.json", cfg)?;
        let log_dir = writer.dir().to_path_buf();

        // ── Step 6: Batch sources ─────────────────────────────────────────────
        let train_source = BatchSource::<TrainBackend>::new(
            &prepared.train,
            cfg.train_pool,
            cfg.batch_size_for(cfg.train_pool),
            cfg.num_workers,
            device.clone(),
        );
        let eval_source = BatchSource::<EvalBackend>::new(
            &prepared.dev,
            cfg.eval_pool,
            cfg.batch_size_for(cfg.eval_pool),
            cfg.num_workers,
            device,
        );
        for (name, items, batch_size, batches) in [
            ("train", train_source.num_items(), train_source.batch_size(), train_source.num_batches()),
            ("eval", eval_source.num_items(), eval_source.batch_size(), eval_source.num_batches()),
        ] {
            tracing::info!("{name}: {items} examples in {batches} batches of {batch_size}");
        }

        // ── Step 7: Train and evaluate ────────────────────────────────────────
        println!("\nSTART TRAINING AND EVALUATION");
        let started = Instant::now();

        let mut tuner = FineTuner::new(model, optim, writer, cfg.lr, cfg.print_every);
        let train_losses = tuner.train(&train_source, cfg.epochs)?;
        let eval_losses  = tuner.evaluate(&eval_source)?;

        println!("Total Time: {}", format_elapsed(started.elapsed()));
        tuner.into_sink().close()?;

        Ok(TrainOutcome { train_losses, eval_losses, log_dir })
    }
}
