// ============================================================
// Layer 6 — Pretrained Store
// ============================================================
// Resolves a model identifier to the three files fine-tuning
// needs:
//
//   tokenizer.json     — vocabulary, normaliser, post-processor
//   config.json        — encoder hyperparameters
//   pytorch_model.bin  — encoder weights
//
// If the identifier names a local directory, files are read
// from it. Otherwise they are fetched from the HuggingFace Hub
// (and cached by hf-hub under ~/.cache/huggingface).

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use hf_hub::{api::sync::Api, Repo, RepoType};
use serde::Deserialize;
use tokenizers::Tokenizer;

use crate::ml::model::BertQaConfig;

pub const TOKENIZER_FILE: &str = "tokenizer.json";
pub const CONFIG_FILE:    &str = "config.json";
pub const WEIGHTS_FILE:   &str = "pytorch_model.bin";

/// The subset of a HuggingFace BERT `config.json` we consume.
#[derive(Debug, Clone, Deserialize)]
pub struct HubBertConfig {
    pub vocab_size:          usize,
    pub hidden_size:         usize,
    pub num_hidden_layers:   usize,
    pub num_attention_heads: usize,
    pub intermediate_size:   usize,
    #[serde(default = "default_max_position")]
    pub max_position_embeddings: usize,
    #[serde(default = "default_type_vocab")]
    pub type_vocab_size: usize,
    #[serde(default = "default_dropout")]
    pub hidden_dropout_prob: f64,
    #[serde(default = "default_dropout")]
    pub attention_probs_dropout_prob: f64,
    #[serde(default = "default_layer_norm_eps")]
    pub layer_norm_eps: f64,
}

fn default_max_position() -> usize { 512 }
fn default_type_vocab() -> usize { 2 }
fn default_dropout() -> f64 { 0.1 }
fn default_layer_norm_eps() -> f64 { 1e-12 }

impl From<HubBertConfig> for BertQaConfig {
    fn from(c: HubBertConfig) -> Self {
        BertQaConfig::new(
            c.vocab_size,
            c.hidden_size,
            c.num_hidden_layers,
            c.num_attention_heads,
            c.intermediate_size,
        )
        .with_max_position_embeddings(c.max_position_embeddings)
        .with_type_vocab_size(c.type_vocab_size)
        .with_hidden_dropout_prob(c.hidden_dropout_prob)
        .with_attention_probs_dropout_prob(c.attention_probs_dropout_prob)
        .with_layer_norm_eps(c.layer_norm_eps)
    }
}

enum Location {
    Local(PathBuf),
    Hub(hf_hub::api::sync::ApiRepo),
}

/// Where the pretrained files for one model identifier live.
pub struct PretrainedStore {
    model_id: String,
    location: Location,
}

impl PretrainedStore {
    /// Point at a local directory, or at the Hub repo `model_id`.
    pub fn open(model_id: &str) -> Result<Self> {
        let local = Path::new(model_id);
        let location = if local.is_dir() {
            tracing::info!("Using local pretrained files in '{}'", local.display());
            Location::Local(local.to_path_buf())
        } else {
            let api = Api::new().context("Failed to initialise HuggingFace Hub API")?;
            Location::Hub(api.repo(Repo::new(model_id.to_string(), RepoType::Model)))
        };
        Ok(Self { model_id: model_id.to_string(), location })
    }

    /// Resolve one file, downloading it on first use.
    pub fn file(&self, name: &str) -> Result<PathBuf> {
        match &self.location {
            Location::Local(dir) => {
                let path = dir.join(name);
                if !path.is_file() {
                    anyhow::bail!("'{}' has no {}", dir.display(), name);
                }
                Ok(path)
            }
            Location::Hub(repo) => {
                tracing::info!("Fetching {} for '{}'", name, self.model_id);
                repo.get(name)
                    .with_context(|| format!("Failed to download {} from '{}'", name, self.model_id))
            }
        }
    }

    pub fn tokenizer(&self) -> Result<Tokenizer> {
        let path = self.file(TOKENIZER_FILE)?;
        let tokenizer = Tokenizer::from_file(&path).map_err(|e| {
            anyhow!("Cannot load tokenizer from '{}': {}", path.display(), e)
        })?;
        tracing::info!(
            "Tokenizer loaded: {} (vocab size: {})",
            self.model_id,
            tokenizer.get_vocab_size(true)
        );
        Ok(tokenizer)
    }

    pub fn config(&self) -> Result<BertQaConfig> {
        let path = self.file(CONFIG_FILE)?;
        let json = std::fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;
        let cfg: HubBertConfig = serde_json::from_str(&json)
            .with_context(|| format!("Malformed encoder config '{}'", path.display()))?;
        Ok(cfg.into())
    }

    pub fn weights(&self) -> Result<PathBuf> {
        self.file(WEIGHTS_FILE)
    }
}
