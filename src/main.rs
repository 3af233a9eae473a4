#![recursion_limit = "256"]

mod cli;
mod application;
mod domain;
mod data;
mod ml;
mod infra;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

fn main() -> Result<()> {
    // Warnings by default, crate info on top of RUST_LOG.
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env()?
        .add_directive("squad_finetune=info".parse()?);
    tracing_subscriber::fmt().with_env_filter(filter).init();

    Cli::parse().run()
}
