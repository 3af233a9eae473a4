use burn::{
    nn::{
        attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::{gelu, log_softmax},
};

use crate::data::batcher::SquadBatch;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally — do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct BertQaConfig {
    pub vocab_size:          usize,
    pub hidden_size:         usize,
    pub num_hidden_layers:   usize,
    pub num_attention_heads: usize,
    pub intermediate_size:   usize,
    #[config(default = 512)]
    pub max_position_embeddings: usize,
    #[config(default = 2)]
    pub type_vocab_size: usize,
    #[config(default = 0.1)]
    pub hidden_dropout_prob: f64,
    #[config(default = 0.1)]
    pub attention_probs_dropout_prob: f64,
    #[config(default = 1e-12)]
    pub layer_norm_eps: f64,
}

impl BertQaConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> BertQa<B> {
        let bert = BertModel {
            embeddings: self.build_embeddings(device),
            encoder: BertEncoder {
                layer: (0..self.num_hidden_layers)
                    .map(|_| self.build_layer(device))
                    .collect(),
            },
        };
        let qa_outputs = LinearConfig::new(self.hidden_size, 2).init(device);
        BertQa { bert, qa_outputs }
    }

    fn layer_norm<B: Backend>(&self, device: &B::Device) -> LayerNorm<B> {
        LayerNormConfig::new(self.hidden_size)
            .with_epsilon(self.layer_norm_eps)
            .init(device)
    }

    fn build_embeddings<B: Backend>(&self, device: &B::Device) -> BertEmbeddings<B> {
        BertEmbeddings {
            word_embeddings: EmbeddingConfig::new(self.vocab_size, self.hidden_size).init(device),
            position_embeddings: EmbeddingConfig::new(self.max_position_embeddings, self.hidden_size)
                .init(device),
            token_type_embeddings: EmbeddingConfig::new(self.type_vocab_size, self.hidden_size)
                .init(device),
            layer_norm: self.layer_norm(device),
            dropout:    DropoutConfig::new(self.hidden_dropout_prob).init(),
        }
    }

    fn build_layer<B: Backend>(&self, device: &B::Device) -> BertLayer<B> {
        let attention = MultiHeadAttentionConfig::new(self.hidden_size, self.num_attention_heads)
            .with_dropout(self.attention_probs_dropout_prob)
            .init(device);
        BertLayer {
            attention,
            attention_norm: self.layer_norm(device),
            intermediate:   LinearConfig::new(self.hidden_size, self.intermediate_size).init(device),
            output:         LinearConfig::new(self.intermediate_size, self.hidden_size).init(device),
            output_norm:    self.layer_norm(device),
            dropout:        DropoutConfig::new(self.hidden_dropout_prob).init(),
        }
    }
}

// Field names mirror the HuggingFace checkpoint so the weight
// loader only needs a handful of key remaps.
#[derive(Module, Debug)]
pub struct BertEmbeddings<B: Backend> {
    pub word_embeddings:       Embedding<B>,
    pub position_embeddings:   Embedding<B>,
    pub token_type_embeddings: Embedding<B>,
    pub layer_norm:            LayerNorm<B>,
    pub dropout:               Dropout,
}

impl<B: Backend> BertEmbeddings<B> {
    pub fn forward(&self, input_ids: Tensor<B, 2, Int>, token_type_ids: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        let [batch_size, seq_len] = input_ids.dims();

        let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &input_ids.device())
            .unsqueeze::<2>()
            .expand([batch_size, seq_len]);

        let x = self.word_embeddings.forward(input_ids)
            + self.position_embeddings.forward(positions)
            + self.token_type_embeddings.forward(token_type_ids);
        self.dropout.forward(self.layer_norm.forward(x))
    }
}

#[derive(Module, Debug)]
pub struct BertLayer<B: Backend> {
    pub attention:      MultiHeadAttention<B>,
    pub attention_norm: LayerNorm<B>,
    pub intermediate:   Linear<B>,
    pub output:         Linear<B>,
    pub output_norm:    LayerNorm<B>,
    pub dropout:        Dropout,
}

impl<B: Backend> BertLayer<B> {
    /// `mask_pad` is true at padding positions.
    pub fn forward(&self, x: Tensor<B, 3>, mask_pad: Tensor<B, 2, Bool>) -> Tensor<B, 3> {
        let attn = self
            .attention
            .forward(MhaInput::self_attn(x.clone()).mask_pad(mask_pad))
            .context;
        let x = self.attention_norm.forward(x + self.dropout.forward(attn));

        let ffn = self.output.forward(gelu(self.intermediate.forward(x.clone())));
        self.output_norm.forward(x + self.dropout.forward(ffn))
    }
}

#[derive(Module, Debug)]
pub struct BertEncoder<B: Backend> {
    pub layer: Vec<BertLayer<B>>,
}

#[derive(Module, Debug)]
pub struct BertModel<B: Backend> {
    pub embeddings: BertEmbeddings<B>,
    pub encoder:    BertEncoder<B>,
}

impl<B: Backend> BertModel<B> {
    pub fn forward(
        &self,
        input_ids:      Tensor<B, 2, Int>,
        token_type_ids: Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2, Int>,
    ) -> Tensor<B, 3> {
        let mask_pad = attention_mask.equal_elem(0);
        let mut x = self.embeddings.forward(input_ids, token_type_ids);
        for layer in &self.encoder.layer {
            x = layer.forward(x, mask_pad.clone());
        }
        x
    }
}

/// Encoder with a two-logit span head on every token.
#[derive(Module, Debug)]
pub struct BertQa<B: Backend> {
    pub bert:       BertModel<B>,
    pub qa_outputs: Linear<B>,
}

pub struct QaModelOutput<B: Backend> {
    pub start_logits: Tensor<B, 2>,
    pub end_logits:   Tensor<B, 2>,
}

impl<B: Backend> BertQa<B> {
    /// [batch, seq_len] inputs → start_logits, end_logits: [batch, seq_len]
    pub fn forward(
        &self,
        input_ids:      Tensor<B, 2, Int>,
        token_type_ids: Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2, Int>,
    ) -> QaModelOutput<B> {
        let [batch_size, seq_len] = input_ids.dims();
        let x = self.bert.forward(input_ids, token_type_ids, attention_mask);

        // Project to 2 logits per token then split into start / end.
        let logits = self.qa_outputs.forward(x); // [batch, seq_len, 2]
        let start_logits = logits.clone()
            .slice([0..batch_size, 0..seq_len, 0..1])
            .reshape([batch_size, seq_len]);
        let end_logits = logits
            .slice([0..batch_size, 0..seq_len, 1..2])
            .reshape([batch_size, seq_len]);

        QaModelOutput { start_logits, end_logits }
    }

    /// Loss = (CE_start + CE_end) / 2, with out-of-sequence targets ignored.
    pub fn forward_loss(&self, batch: SquadBatch<B>) -> Tensor<B, 1> {
        let output = self.forward(batch.input_ids, batch.token_type_ids, batch.attention_mask);
        (span_cross_entropy(output.start_logits, batch.start_positions)
            + span_cross_entropy(output.end_logits, batch.end_positions))
            / 2.0_f64
    }
}

/// Mean cross-entropy of `targets` under `logits` ([batch, seq_len]).
///
/// Targets are clamped to `[0, seq_len]`; a target equal to `seq_len`
/// (which covers the sentinel) contributes nothing and is excluded from
/// the mean. A batch with no valid target yields 0.
pub fn span_cross_entropy<B: Backend>(logits: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> Tensor<B, 1> {
    let [_, seq_len] = logits.dims();

    let targets = targets.clamp(0, seq_len as i64);
    let valid   = targets.clone().lower_elem(seq_len as i64);
    let safe    = targets.mask_fill(valid.clone().bool_not(), 0);

    let picked = log_softmax(logits, 1)
        .gather(1, safe.unsqueeze_dim::<2>(1))
        .squeeze::<1>(1);
    let weights = valid.float();
    let count   = weights.clone().sum().clamp_min(1.0);

    (picked * weights).sum().neg() / count
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray;

    pub(crate) fn tiny_config() -> BertQaConfig {
        BertQaConfig::new(16, 8, 1, 2, 16)
            .with_max_position_embeddings(16)
            .with_hidden_dropout_prob(0.0)
            .with_attention_probs_dropout_prob(0.0)
    }

    fn ints<const D: usize>(values: Vec<i32>, shape: [usize; D]) -> Tensor<B, D, Int> {
        Tensor::<B, 1, Int>::from_ints(values.as_slice(), &Default::default()).reshape(shape)
    }

    #[test]
    fn test_forward_shapes() {
        let model: BertQa<B> = tiny_config().init(&Default::default());
        let out = model.forward(
            ints(vec![2, 5, 6, 3, 7, 3, 0], [1, 7]),
            ints(vec![0, 0, 0, 0, 1, 1, 0], [1, 7]),
            ints(vec![1, 1, 1, 1, 1, 1, 0], [1, 7]),
        );
        assert_eq!(out.start_logits.dims(), [1, 7]);
        assert_eq!(out.end_logits.dims(), [1, 7]);
    }

    #[test]
    fn test_uniform_logits_give_log_seq_len() {
        let logits = Tensor::<B, 2>::zeros([2, 4], &Default::default());
        let loss: f64 = span_cross_entropy(logits, ints(vec![1, 3], [2]))
            .into_scalar()
            .elem();
        assert!((loss - 4f64.ln()).abs() < 1e-5);
    }

    #[test]
    fn test_sentinel_targets_are_ignored() {
        // Row 1 has a sentinel target (512 > seq_len) and must not count.
        let logits = Tensor::<B, 2>::from_floats([[0.0, 0.0, 0.0, 0.0], [9.0, 0.0, 0.0, 0.0]], &Default::default());
        let loss: f64 = span_cross_entropy(logits, ints(vec![2, 512], [2]))
            .into_scalar()
            .elem();
        assert!((loss - 4f64.ln()).abs() < 1e-5);
    }

    #[test]
    fn test_all_ignored_batch_is_zero() {
        let logits = Tensor::<B, 2>::zeros([2, 4], &Default::default());
        let loss: f64 = span_cross_entropy(logits, ints(vec![4, 512], [2]))
            .into_scalar()
            .elem();
        assert_eq!(loss, 0.0);
    }
}
