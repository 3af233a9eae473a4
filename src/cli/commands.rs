// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `train` and `prepare`, and all
// their configurable flags. Every default reproduces the stock
// run, so `squad-finetune train` alone is the full fine-tune.
//
// Reference: Rust Book §12 (Building a CLI Program)

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::application::train_use_case::TrainConfig;
use crate::data::batcher::Pool;
use crate::infra::device::DeviceChoice;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fine-tune the pretrained encoder on the train split, then evaluate on dev
    Train(TrainArgs),

    /// Run only the load / align / encode pipeline and print statistics
    Prepare(PrepareArgs),
}

/// Flags shared by both commands.
#[derive(Args, Debug, Clone)]
pub struct DataArgs {
    /// SQuAD-format training corpus
    #[arg(long, default_value = "./data/train-v2.0.json")]
    pub train_path: PathBuf,

    /// SQuAD-format evaluation corpus
    #[arg(long, default_value = "./data/dev-v2.0.json")]
    pub dev_path: PathBuf,

    /// HuggingFace model id, or a local directory holding its files
    #[arg(long, default_value = "bert-base-uncased")]
    pub model_id: String,

    /// Truncation length; also the sentinel for unmappable positions
    #[arg(long, default_value_t = 512)]
    pub max_length: usize,
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Batch size for a full pool
    #[arg(long, default_value_t = 8)]
    pub batch_size: usize,

    /// Batch size for a half pool
    #[arg(long, default_value_t = 16)]
    pub half_batch_size: usize,

    #[arg(long, value_enum, default_value_t = PoolArg::Full)]
    pub train_pool: PoolArg,

    #[arg(long, value_enum, default_value_t = PoolArg::Full)]
    pub eval_pool: PoolArg,

    #[arg(long, default_value_t = 2)]
    pub epochs: usize,

    /// AdamW learning rate
    #[arg(long, default_value_t = 5e-5)]
    pub lr: f64,

    #[arg(long, default_value_t = 0.0)]
    pub weight_decay: f32,

    #[arg(long, default_value_t = 1e-6)]
    pub epsilon: f32,

    /// Print a progress line every N batches
    #[arg(long, default_value_t = 100)]
    pub print_every: usize,

    /// Parent of the timestamped scalar log directories
    #[arg(long, default_value = "logs/fit")]
    pub log_root: PathBuf,

    /// Data loader prefetch threads (0 = load on the main thread)
    #[arg(long, default_value_t = 0)]
    pub num_workers: usize,

    #[arg(long, value_enum, default_value_t = DeviceArg::Auto)]
    pub device: DeviceArg,

    /// Discrete GPU index, used with `--device gpu`
    #[arg(long, default_value_t = 0)]
    pub gpu_index: usize,
}

#[derive(Args, Debug)]
pub struct PrepareArgs {
    #[command(flatten)]
    pub data: DataArgs,
}

/// clap-facing mirror of [`Pool`]
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolArg {
    Full,
    Half,
}

impl From<PoolArg> for Pool {
    fn from(p: PoolArg) -> Self {
        match p {
            PoolArg::Full => Pool::Full,
            PoolArg::Half => Pool::Half,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceArg {
    Auto,
    Cpu,
    Gpu,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        let device = match a.device {
            DeviceArg::Auto => DeviceChoice::Auto,
            DeviceArg::Cpu  => DeviceChoice::Cpu,
            DeviceArg::Gpu  => DeviceChoice::Gpu(a.gpu_index),
        };
        TrainConfig {
            train_path:      a.data.train_path,
            dev_path:        a.data.dev_path,
            model_id:        a.data.model_id,
            max_length:      a.data.max_length,
            batch_size:      a.batch_size,
            half_batch_size: a.half_batch_size,
            train_pool:      a.train_pool.into(),
            eval_pool:       a.eval_pool.into(),
            epochs:          a.epochs,
            lr:              a.lr,
            weight_decay:    a.weight_decay,
            epsilon:         a.epsilon,
            print_every:     a.print_every,
            log_root:        a.log_root,
            num_workers:     a.num_workers,
            device,
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    fn train_config(args: &[&str]) -> TrainConfig {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Train(a) => a.into(),
            other => panic!("expected train, got {other:?}"),
        }
    }

    #[test]
    fn test_bare_train_matches_default_config() {
        let from_cli = serde_json::to_value(train_config(&["squad-finetune", "train"])).unwrap();
        let default  = serde_json::to_value(TrainConfig::default()).unwrap();
        assert_eq!(from_cli, default);
    }

    #[test]
    fn test_flags_override_defaults() {
        let cfg = train_config(&[
            "squad-finetune", "train",
            "--train-pool", "half",
            "--epochs", "1",
            "--device", "gpu",
            "--gpu-index", "2",
            "--model-id", "./local-bert",
        ]);
        assert_eq!(cfg.train_pool, Pool::Half);
        assert_eq!(cfg.eval_pool, Pool::Full);
        assert_eq!(cfg.epochs, 1);
        assert_eq!(cfg.device, DeviceChoice::Gpu(2));
        assert_eq!(cfg.model_id, "./local-bert");
    }

    #[test]
    fn test_prepare_takes_data_flags() {
        let cli = Cli::try_parse_from(["squad-finetune", "prepare", "--max-length", "384"]).unwrap();
        match cli.command {
            Commands::Prepare(a) => assert_eq!(a.data.max_length, 384),
            other => panic!("expected prepare, got {other:?}"),
        }
    }
}
