use ndarray::{Array2, ArrayView2};
use rand::Rng;
use rand::rngs::StdRng;

use super::fc_net::FcNet;
use super::gradient_net::GradientNet;
use super::optimizer::Optimizer;

pub const FIELD_EMBEDDING_DIM: usize = 8;
pub const ARM_HIDDEN_LAYERS: [usize; 2] = [32, 16];

/// Learned per-column embedding scaled by the column's value.
///
/// Row `i` is encoded as the concatenation of `x[i, j] * E[j]` over all
/// columns `j`, so every feature carries both its value and its identity.
#[derive(Debug, Clone)]
struct FieldEmbedding {
    e: Array2<f32>,
    de: Array2<f32>,
    x: Array2<f32>,
}

impl FieldEmbedding {
    fn new(fields: usize, dim: usize, rng: &mut StdRng) -> Self {
        let e = Array2::from_shape_fn((fields, dim), |_| rng.random_range(-0.5f32..0.5));
        Self {
            de: Array2::zeros(e.raw_dim()),
            x: Array2::zeros((0, fields)),
            e,
        }
    }

    fn dim(&self) -> usize {
        self.e.ncols()
    }

    fn encode(&self, x: ArrayView2<f32>) -> Array2<f32> {
        let (fields, dim) = self.e.dim();
        Array2::from_shape_fn((x.nrows(), fields * dim), |(i, col)| {
            let (j, k) = (col / dim, col % dim);
            x[[i, j]] * self.e[[j, k]]
        })
    }

    fn forward(&mut self, x: ArrayView2<f32>) -> Array2<f32> {
        self.x = x.to_owned();
        self.encode(x)
    }

    fn backward(&mut self, d: ArrayView2<f32>) {
        let dim = self.dim();
        for ((i, col), &g) in d.indexed_iter() {
            let (j, k) = (col / dim, col % dim);
            self.de[[j, k]] += self.x[[i, j]] * g;
        }
    }
}

/// Gradient net whose input goes through a field-embedding encoding before
/// the fully connected body.
#[derive(Debug, Clone)]
pub struct ArmNet {
    embedding: FieldEmbedding,
    body: FcNet,
}

impl ArmNet {
    pub fn new(columns: usize, embedding_dim: usize, hidden: &[usize], outputs: usize, rng: &mut StdRng) -> Self {
        let embedding = FieldEmbedding::new(columns, embedding_dim, rng);
        let body = FcNet::new(columns * embedding_dim, hidden, outputs, rng);
        Self { embedding, body }
    }
}

impl GradientNet for ArmNet {
    fn initialize(inputs: usize, outputs: usize, rng: &mut StdRng) -> Self {
        Self::new(inputs, FIELD_EMBEDDING_DIM, &ARM_HIDDEN_LAYERS, outputs, rng)
    }

    fn infer(&self, x: ArrayView2<f32>) -> Array2<f32> {
        self.body.infer(self.embedding.encode(x).view())
    }

    fn forward(&mut self, x: ArrayView2<f32>) -> Array2<f32> {
        let encoded = self.embedding.forward(x);
        self.body.forward(encoded.view())
    }

    fn backward(&mut self, d_out: Array2<f32>) {
        let d_encoded = self.body.backward_to_input(d_out);
        self.embedding.backward(d_encoded.view());
    }

    fn feature_extractor(&self, x: ArrayView2<f32>) -> Array2<f32> {
        self.body.feature_extractor(self.embedding.encode(x).view())
    }

    fn zero_grad(&mut self) {
        self.embedding.de.fill(0.0);
        self.body.zero_grad();
    }

    fn apply_gradients(&mut self, optimizer: &mut dyn Optimizer) {
        optimizer.update_params(self.embedding.e.view_mut(), self.embedding.de.view());
        self.body.apply_gradients(optimizer);
    }

    fn parameters(&self) -> Vec<f32> {
        let mut out: Vec<f32> = self.embedding.e.iter().copied().collect();
        out.extend(self.body.parameters());
        out
    }
}
