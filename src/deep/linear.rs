use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

/// Dense layer `y = W x (+ b)`.
///
/// Parameters flatten row by row: the weights of output `i` followed by its
/// bias (when the layer has one). Gradients use the same layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Linear {
    pub weights: Vec<Vec<f32>>, // [output_size][input_size]
    pub biases: Option<Vec<f32>>,
}

impl Linear {
    /// Create a layer with He-initialized weights and zero biases.
    ///
    /// # Arguments
    /// * `input_size` - Width of the input rows.
    /// * `output_size` - Width of the output rows.
    /// * `bias` - Whether the layer adds a bias term.
    /// * `rng` - Source of the initial weights.
    pub fn new<R: Rng + ?Sized>(input_size: usize, output_size: usize, bias: bool, rng: &mut R) -> Self {
        let std = (2.0 / input_size.max(1) as f32).sqrt();
        let weights = (0..output_size)
            .map(|_| {
                (0..input_size)
                    .map(|_| std * rng.sample::<f32, _>(StandardNormal))
                    .collect()
            })
            .collect();
        let biases = bias.then(|| vec![0.0; output_size]);
        Self { weights, biases }
    }

    /// Width of the expected input.
    pub fn input_size(&self) -> usize {
        self.weights.first().map_or(0, Vec::len)
    }

    /// Width of the produced output.
    pub fn output_size(&self) -> usize {
        self.weights.len()
    }

    fn row_stride(&self) -> usize {
        self.input_size() + usize::from(self.biases.is_some())
    }

    /// Number of trainable values, biases included.
    pub fn num_params(&self) -> usize {
        self.output_size() * self.row_stride()
    }

    /// Compute `W x (+ b)` for one input row.
    pub fn forward(&self, input: &[f32]) -> Vec<f32> {
        debug_assert_eq!(input.len(), self.input_size(), "input does not match weights");
        self.weights
            .iter()
            .enumerate()
            .map(|(i, w_row)| {
                let bias = self.biases.as_ref().map_or(0.0, |b| b[i]);
                w_row.iter().zip(input).map(|(w, x)| w * x).sum::<f32>() + bias
            })
            .collect()
    }

    /// Accumulate parameter gradients for one sample into `grad_params` and
    /// return the gradient w.r.t. the input.
    pub fn backward(&self, input: &[f32], grad_output: &[f32], grad_params: &mut [f32]) -> Vec<f32> {
        let input_size = self.input_size();
        let stride = self.row_stride();
        let mut grad_input = vec![0.0; input_size];

        for (i, (w_row, g)) in self.weights.iter().zip(grad_output).enumerate() {
            // Gradient w.r.t input: W^T * grad_output
            for (gi, w) in grad_input.iter_mut().zip(w_row) {
                *gi += w * g;
            }
            let row = &mut grad_params[i * stride..(i + 1) * stride];
            for (gp, x) in row.iter_mut().zip(input) {
                *gp += g * x;
            }
            if self.biases.is_some() {
                row[input_size] += g;
            }
        }
        grad_input
    }

    /// Append the parameters to `out` in the flat layout.
    pub fn write_params(&self, out: &mut Vec<f32>) {
        for (i, w_row) in self.weights.iter().enumerate() {
            out.extend_from_slice(w_row);
            if let Some(b) = &self.biases {
                out.push(b[i]);
            }
        }
    }

    /// Overwrite the parameters from the front of `params`, returning how many values were read.
    /// `params` must hold at least `num_params()` values.
    pub fn read_params(&mut self, params: &[f32]) -> usize {
        let input_size = self.input_size();
        let stride = self.row_stride();
        for (i, w_row) in self.weights.iter_mut().enumerate() {
            let row = &params[i * stride..(i + 1) * stride];
            w_row.copy_from_slice(&row[..input_size]);
            if let Some(b) = self.biases.as_mut() {
                b[i] = row[input_size];
            }
        }
        self.num_params()
    }
}
