//! Dense forward pass over the parsed layers.

use crate::error::{Result, VpuModelError};

/// One fully-connected layer: row-major weights plus bias.
#[derive(Debug, Clone)]
pub struct DenseLayer {
    in_dim: usize,
    out_dim: usize,
    weights: Vec<f32>,
    bias: Vec<f32>,
}

impl DenseLayer {
    /// Build a layer from its raw parts. `weights` is `out_dim` rows of
    /// `in_dim` columns.
    #[must_use]
    pub fn new(in_dim: usize, out_dim: usize, weights: Vec<f32>, bias: Vec<f32>) -> Self {
        debug_assert_eq!(weights.len(), in_dim * out_dim);
        debug_assert_eq!(bias.len(), out_dim);
        Self { in_dim, out_dim, weights, bias }
    }

    /// Input width.
    pub fn in_dim(&self) -> usize {
        self.in_dim
    }

    /// Output width.
    pub fn out_dim(&self) -> usize {
        self.out_dim
    }

    /// `y = W·x + b` into `out`.
    fn forward(&self, x: &[f32], out: &mut Vec<f32>) {
        out.clear();
        for row in 0..self.out_dim {
            let w = &self.weights[row * self.in_dim..(row + 1) * self.in_dim];
            let acc: f32 = w.iter().zip(x).map(|(wi, xi)| wi * xi).sum();
            out.push(acc + self.bias[row]);
        }
    }
}

/// Run the network on one descriptor: ReLU between layers, linear head.
///
/// # Errors
///
/// Returns [`VpuModelError::DescriptorWidthMismatch`] when the descriptor
/// does not match the first layer's input width.
pub fn forward_scalar(layers: &[DenseLayer], descriptor: &[f32]) -> Result<f32> {
    let Some(first) = layers.first() else {
        return Err(VpuModelError::parse_error("Network has no layers"));
    };
    if descriptor.len() != first.in_dim() {
        return Err(VpuModelError::DescriptorWidthMismatch {
            got: descriptor.len(),
            expected: first.in_dim(),
        });
    }

    let mut current = descriptor.to_vec();
    let mut next = Vec::new();
    let last = layers.len() - 1;
    for (idx, layer) in layers.iter().enumerate() {
        layer.forward(&current, &mut next);
        if idx != last {
            for v in &mut next {
                *v = v.max(0.0);
            }
        }
        std::mem::swap(&mut current, &mut next);
    }

    Ok(current[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_then_sum() {
        let layers = vec![
            DenseLayer::new(2, 2, vec![1.0, 0.0, 0.0, 1.0], vec![0.0, 0.0]),
            DenseLayer::new(2, 1, vec![1.0, 1.0], vec![0.5]),
        ];
        let y = forward_scalar(&layers, &[3.0, 4.0]).unwrap();
        assert!((y - 7.5).abs() < 1e-6);
    }

    #[test]
    fn relu_clamps_hidden_negatives() {
        // Hidden layer flips sign; ReLU zeroes it; head bias remains.
        let layers = vec![
            DenseLayer::new(1, 1, vec![-1.0], vec![0.0]),
            DenseLayer::new(1, 1, vec![1.0], vec![2.0]),
        ];
        let y = forward_scalar(&layers, &[5.0]).unwrap();
        assert!((y - 2.0).abs() < 1e-6);
    }

    #[test]
    fn width_mismatch_is_an_error() {
        let layers = vec![DenseLayer::new(2, 1, vec![1.0, 1.0], vec![0.0])];
        assert!(matches!(
            forward_scalar(&layers, &[1.0]),
            Err(VpuModelError::DescriptorWidthMismatch { got: 1, expected: 2 })
        ));
    }
}
