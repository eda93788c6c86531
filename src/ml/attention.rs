use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::activation::softmax,
};

/// Large negative score given to masked positions before the softmax.
const MASKED_SCORE: f32 = -1.0e9;

#[derive(Config, Debug)]
pub struct SimpleAttentionConfig {
    /// Width of each attended feature vector
    pub n_features: usize,
    /// Width of the query (the decoder hidden state)
    pub n_hidden: usize,
}

impl SimpleAttentionConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> SimpleAttention<B> {
        SimpleAttention {
            key: LinearConfig::new(self.n_features, self.n_hidden)
                .with_bias(false)
                .init(device),
        }
    }
}

/// Bilinear attention: `score_s = (W f_s) · q`.
#[derive(Module, Debug)]
pub struct SimpleAttention<B: Backend> {
    key: Linear<B>,
}

impl<B: Backend> SimpleAttention<B> {
    /// query: [batch, n_hidden], features: [batch, len, n_features],
    /// mask: [batch, len] with `true` at positions to ignore.
    ///
    /// Returns (context [batch, n_features], weights [batch, len]).
    pub fn forward(
        &self,
        query:    Tensor<B, 2>,
        features: Tensor<B, 3>,
        mask:     Option<Tensor<B, 2, Bool>>,
    ) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let [batch, len, n_features] = features.dims();

        let keys   = self.key.forward(features.clone()); // [batch, len, n_hidden]
        let scores = keys
            .matmul(query.unsqueeze_dim::<3>(2)) // [batch, len, 1]
            .reshape([batch, len]);
        let scores = match mask {
            Some(mask) => scores.mask_fill(mask, MASKED_SCORE),
            None       => scores,
        };

        let weights = softmax(scores, 1);
        let context = weights
            .clone()
            .unsqueeze_dim::<3>(1) // [batch, 1, len]
            .matmul(features)
            .reshape([batch, n_features]);

        (context, weights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_weights_sum_to_one_and_respect_mask() {
        let device = Default::default();
        let att: SimpleAttention<TestBackend> = SimpleAttentionConfig::new(6, 4).init(&device);

        let query    = Tensor::<TestBackend, 2>::ones([2, 4], &device);
        let features = Tensor::<TestBackend, 3>::ones([2, 3, 6], &device);
        let mask     = Tensor::<TestBackend, 1, Int>::from_ints([0, 0, 1, 0, 0, 0], &device)
            .reshape([2, 3])
            .equal_elem(1);

        let (context, weights) = att.forward(query, features, Some(mask));
        assert_eq!(context.dims(), [2, 6]);
        assert_eq!(weights.dims(), [2, 3]);

        let w: Vec<f32> = weights.into_data().convert::<f32>().to_vec().unwrap();
        assert!((w[0] + w[1] + w[2] - 1.0).abs() < 1e-5);
        assert!(w[2] < 1e-6);
        assert!((w[3] + w[4] + w[5] - 1.0).abs() < 1e-5);
    }
}
