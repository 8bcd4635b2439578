use burn::nn::{Linear, LinearConfig};
use burn::prelude::*;
use burn::tensor::activation::sigmoid;

use crate::model::RecurrentHiddenWeights;

/// Configuration for a GRU cell with split input/hidden projections.
#[derive(Config, Debug)]
pub struct GruCellConfig {
    /// Input dimension.
    pub d_input: usize,
    /// Hidden state dimension.
    pub d_hidden: usize,
    /// Hidden state is clamped to `[-clip_value, clip_value]` after each step.
    #[config(default = "None")]
    pub clip_value: Option<f64>,
}

/// GRU cell whose hidden-to-hidden weights are kept in dedicated layers so
/// their L2 norm can be regularized separately from the input weights.
///
/// ```text
/// r, u = sigmoid(x_ru(x) + h_ru(h))
/// c    = tanh(x_c(x) + rh_c(r * h))
/// h'   = u * h + (1 - u) * c
/// ```
#[derive(Module, Debug)]
pub struct GruCell<B: Backend> {
    /// Input to reset/update gates: d_input → 2·d_hidden.
    x_ru: Linear<B>,
    /// Hidden to reset/update gates: d_hidden → 2·d_hidden (no bias).
    h_ru: Linear<B>,
    /// Input to candidate: d_input → d_hidden.
    x_c: Linear<B>,
    /// Gated hidden to candidate: d_hidden → d_hidden (no bias).
    rh_c: Linear<B>,
    d_hidden: usize,
    clip_value: f64,
}

impl GruCellConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> GruCell<B> {
        GruCell {
            x_ru: LinearConfig::new(self.d_input, 2 * self.d_hidden).init(device),
            h_ru: LinearConfig::new(self.d_hidden, 2 * self.d_hidden)
                .with_bias(false)
                .init(device),
            x_c: LinearConfig::new(self.d_input, self.d_hidden).init(device),
            rh_c: LinearConfig::new(self.d_hidden, self.d_hidden)
                .with_bias(false)
                .init(device),
            d_hidden: self.d_hidden,
            clip_value: self.clip_value.unwrap_or(f64::INFINITY),
        }
    }
}

impl<B: Backend> GruCell<B> {
    /// One recurrence step.
    ///
    /// Input shapes: `x (batch, d_input)`, `h (batch, d_hidden)`.
    /// Output shape: `(batch, d_hidden)`.
    pub fn forward(&self, x: Tensor<B, 2>, h: Tensor<B, 2>) -> Tensor<B, 2> {
        let [batch, _] = h.dims();
        let d = self.d_hidden;

        let gates = sigmoid(self.x_ru.forward(x.clone()) + self.h_ru.forward(h.clone()));
        let reset = gates.clone().slice([0..batch, 0..d]);
        let update = gates.slice([0..batch, d..2 * d]);

        let candidate = (self.x_c.forward(x) + self.rh_c.forward(reset * h.clone())).tanh();
        let next = update.clone() * h + (update.neg() + 1.0) * candidate;

        if self.clip_value.is_finite() {
            next.clamp(-self.clip_value, self.clip_value)
        } else {
            next
        }
    }

    pub fn d_hidden(&self) -> usize {
        self.d_hidden
    }
}

impl<B: Backend> RecurrentHiddenWeights<B> for GruCell<B> {
    /// Mean squared hidden-to-gate weight plus mean squared hidden-to-candidate weight.
    fn hidden_weight_l2_norm(&self) -> Tensor<B, 1> {
        let gate = self.h_ru.weight.val().powf_scalar(2.0).mean();
        let candidate = self.rh_c.weight.val().powf_scalar(2.0).mean();
        gate + candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::NdArray;
    use burn::backend::Autodiff;
    use burn::module::Param;
    use burn::optim::GradientsParams;
    use burn::tensor::Distribution;

    type TestBackend = NdArray<f32>;
    type TestAutodiffBackend = Autodiff<NdArray<f32>>;

    #[test]
    fn test_forward_shape() {
        let device = Default::default();
        let cell = GruCellConfig::new(6, 4).init::<TestBackend>(&device);
        let x = Tensor::<TestBackend, 2>::random([3, 6], Distribution::Normal(0.0, 1.0), &device);
        let h = Tensor::<TestBackend, 2>::zeros([3, 4], &device);
        assert_eq!(cell.forward(x, h).dims(), [3, 4]);
    }

    #[test]
    fn test_clip_bounds_hidden_state() {
        let device = Default::default();
        let cell = GruCellConfig::new(2, 3)
            .with_clip_value(Some(0.1))
            .init::<TestBackend>(&device);
        let x = Tensor::<TestBackend, 2>::random([4, 2], Distribution::Normal(0.0, 5.0), &device);
        let h = Tensor::<TestBackend, 2>::ones([4, 3], &device);
        let max_abs: f32 = cell.forward(x, h).abs().max().into_scalar().elem();
        assert!(max_abs <= 0.1 + 1e-6, "hidden state escaped clip: {max_abs}");
    }

    #[test]
    fn test_l2_norm_is_mean_square_of_hidden_weights() {
        let device = Default::default();
        let mut cell = GruCellConfig::new(2, 2).init::<TestBackend>(&device);
        cell.h_ru.weight = Param::from_tensor(Tensor::ones([2, 4], &device).mul_scalar(2.0));
        cell.rh_c.weight = Param::from_tensor(Tensor::ones([2, 2], &device).mul_scalar(3.0));

        let norm: f32 = cell.hidden_weight_l2_norm().into_scalar().elem();
        assert!((norm - 13.0).abs() < 1e-6, "expected 4 + 9, got {norm}");
    }

    #[test]
    fn test_l2_norm_ignores_input_weights() {
        let device = Default::default();
        let mut cell = GruCellConfig::new(2, 2).init::<TestBackend>(&device);
        let before: f32 = cell.hidden_weight_l2_norm().into_scalar().elem();
        cell.x_ru.weight = Param::from_tensor(Tensor::ones([2, 4], &device).mul_scalar(100.0));
        let after: f32 = cell.hidden_weight_l2_norm().into_scalar().elem();
        assert_eq!(before, after);
        assert!(after >= 0.0);
    }

    #[test]
    fn test_l2_gradient_reaches_hidden_weights() {
        let device = Default::default();
        let cell = GruCellConfig::new(3, 5).init::<TestAutodiffBackend>(&device);

        let grads = GradientsParams::from_grads(cell.hidden_weight_l2_norm().backward(), &cell);
        let grad = grads
            .get::<NdArray<f32>, 2>(cell.h_ru.weight.id)
            .expect("hidden weight should have gradient");
        let grad_sum: f32 = grad.abs().sum().into_scalar().elem();
        assert!(grad_sum > 0.0);
        assert!(grads.get::<NdArray<f32>, 2>(cell.x_ru.weight.id).is_none());
    }
}
