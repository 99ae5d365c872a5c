/*!
NaN-masked losses and validation metrics
*/
use crate::config::{LossKind, MetricKind};
use tch::{Kind, Tensor};

/// The mean squared error between two tensors of the same shape. NaN if they are empty.
pub fn mse(pred: &Tensor, label: &Tensor) -> Tensor {
    (pred - label).square().mean(Kind::Float)
}

/// Computes the training loss and the early stopping metric
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Evaluator {
    /// The loss to compute
    pub loss: LossKind,
    /// The metric to compute
    pub metric: MetricKind,
}

impl Evaluator {
    /// The loss over all samples whose label is not NaN
    pub fn loss(&self, pred: &Tensor, label: &Tensor) -> Tensor {
        let mask = label.isnan().logical_not();
        match self.loss {
            LossKind::Mse => mse(&pred.masked_select(&mask), &label.masked_select(&mask)),
        }
    }
    /// The metric over all samples whose label is finite. Higher is better.
    pub fn metric(&self, pred: &Tensor, label: &Tensor) -> Tensor {
        let mask = label.isfinite();
        let (pred, label) = (pred.masked_select(&mask), label.masked_select(&mask));
        match self.metric {
            MetricKind::NegLoss => -self.loss(&pred, &label),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EVALUATOR: Evaluator = Evaluator {
        loss: LossKind::Mse,
        metric: MetricKind::NegLoss,
    };

    fn value(t: &Tensor) -> f64 {
        t.double_value(&[])
    }

    #[test]
    fn loss_ignores_nan_labels() {
        let pred = Tensor::from(&[1.0f32, 2.0, 3.0, 4.0][..]);
        let label = Tensor::from(&[1.0f32, f32::NAN, 5.0, f32::NAN][..]);
        // Only (1, 1) and (3, 5) count: (0 + 4) / 2
        assert!((value(&EVALUATOR.loss(&pred, &label)) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn metric_is_negated_loss_over_finite_labels() {
        let pred = Tensor::from(&[0.0f32, 1.0, 2.0][..]);
        let label = Tensor::from(&[1.0f32, f32::INFINITY, 0.0][..]);
        // (1 + 4) / 2
        assert!((value(&EVALUATOR.metric(&pred, &label)) + 2.5).abs() < 1e-6);
    }

    #[test]
    fn all_missing_labels_give_nan() {
        let pred = Tensor::from(&[0.5f32, 1.5][..]);
        let label = Tensor::from(&[f32::NAN, f32::NAN][..]);
        assert!(value(&EVALUATOR.loss(&pred, &label)).is_nan());
        assert!(value(&EVALUATOR.metric(&pred, &label)).is_nan());
    }
}
