use burn::{
    nn::{BiLstm, BiLstmConfig, Dropout, DropoutConfig, Embedding, EmbeddingConfig, LstmState},
    prelude::*,
};

#[derive(Config, Debug)]
pub struct EncoderConfig {
    pub vocab_size: usize,
    pub n_emb:      usize,
    pub n_hidden:   usize,
    #[config(default = 0.0)]
    pub dropout:    f64,
}

impl EncoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Encoder<B> {
        Encoder {
            embedding: EmbeddingConfig::new(self.vocab_size, self.n_emb).init(device),
            lstm:      BiLstmConfig::new(self.n_emb, self.n_hidden, true).init(device),
            dropout:   DropoutConfig::new(self.dropout).init(),
        }
    }
}

/// Embedding followed by a single-layer bidirectional LSTM.
#[derive(Module, Debug)]
pub struct Encoder<B: Backend> {
    embedding: Embedding<B>,
    lstm:      BiLstm<B>,
    dropout:   Dropout,
}

impl<B: Backend> Encoder<B> {
    /// tokens: [batch, len] → features [batch, len, 2 * n_hidden],
    /// final state with cell/hidden of shape [2, batch, n_hidden]
    /// (forward direction first).
    pub fn forward(&self, tokens: Tensor<B, 2, Int>) -> (Tensor<B, 3>, LstmState<B, 3>) {
        let emb = self.dropout.forward(self.embedding.forward(tokens));
        self.lstm.forward(emb, None)
    }
}
