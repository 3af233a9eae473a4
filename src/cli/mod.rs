// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with `clap`.
// All work is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `train`   — fine-tunes on the train split, evaluates on dev
//   2. `prepare` — runs the data pipeline only and reports on it
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, PrepareArgs, TrainArgs};

use crate::infra::pretrained::PretrainedStore;

#[derive(Parser, Debug)]
#[command(
    name = "squad-finetune",
    version = "0.1.0",
    about = "Fine-tune a pretrained BERT encoder for extractive QA on SQuAD-style data."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the matching use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)   => run_train(args),
            Commands::Prepare(args) => run_prepare(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Fine-tuning '{}' on {}", args.data.model_id, args.data.train_path.display());

    let outcome = TrainUseCase::new(args.into()).execute()?;

    for (epoch, loss) in outcome.train_losses.iter().enumerate() {
        println!("Epoch {} average training loss: {:.4}", epoch + 1, loss);
    }
    if let Some(loss) = outcome.eval_losses.first() {
        println!("Average evaluation loss: {:.4}", loss);
    }
    println!("Scalar logs written to {}", outcome.log_dir.display());
    Ok(())
}

fn run_prepare(args: PrepareArgs) -> Result<()> {
    use crate::application::prepare_use_case::PrepareUseCase;

    let data      = args.data;
    let tokenizer = PretrainedStore::open(&data.model_id)?.tokenizer()?;
    let prepared  = PrepareUseCase::new(&data.train_path, &data.dev_path, data.max_length)
        .execute(tokenizer)?;

    for report in &prepared.reports {
        report.print(prepared.sentinel);
    }
    Ok(())
}
