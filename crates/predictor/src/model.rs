//! Hand-rolled binary classifier: logistic regression trained by batch
//! gradient descent with an L2 penalty, falling back to a most-frequent-class
//! constant predictor when the training labels contain a single class. No
//! linear-algebra crate is reached for — the corpus carries none for this
//! domain, so the math is plain `Vec<f64>`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const LEARNING_RATE: f64 = 0.15;
const L2_PENALTY: f64 = 1e-3;

#[derive(Debug, Clone)]
pub enum TrainedClassifier {
    Logistic(LogisticModel),
    MostFrequent { occupied_probability: f64 },
}

impl TrainedClassifier {
    pub fn model_type(&self) -> &'static str {
        match self {
            TrainedClassifier::Logistic(_) => "logistic_regression",
            TrainedClassifier::MostFrequent { .. } => "dummy_most_frequent",
        }
    }

    /// P(occupied | features).
    pub fn predict_proba(&self, features: &[f64]) -> f64 {
        match self {
            TrainedClassifier::Logistic(model) => model.predict_proba(features),
            TrainedClassifier::MostFrequent {
                occupied_probability,
            } => *occupied_probability,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogisticModel {
    weights: Vec<f64>,
    bias: f64,
}

impl LogisticModel {
    pub fn predict_proba(&self, features: &[f64]) -> f64 {
        sigmoid(dot(&self.weights, features) + self.bias)
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Fits a [`LogisticModel`] via `max_iter` steps of full-batch gradient
/// descent. Weights are seeded from a small deterministic perturbation so two
/// runs against identical data and `random_state` produce identical models.
pub fn train_logistic(
    features: &[Vec<f64>],
    labels: &[f64],
    max_iter: usize,
    random_state: u64,
) -> LogisticModel {
    let dim = features.first().map(|f| f.len()).unwrap_or(0);
    let mut rng = StdRng::seed_from_u64(random_state);
    let mut weights: Vec<f64> = (0..dim).map(|_| rng.gen_range(-0.01..0.01)).collect();
    let mut bias = 0.0;
    let n = features.len().max(1) as f64;

    for _ in 0..max_iter {
        let mut grad_w = vec![0.0; dim];
        let mut grad_b = 0.0;
        for (row, &label) in features.iter().zip(labels.iter()) {
            let prediction = sigmoid(dot(&weights, row) + bias);
            let error = prediction - label;
            for (g, x) in grad_w.iter_mut().zip(row.iter()) {
                *g += error * x;
            }
            grad_b += error;
        }
        for (w, g) in weights.iter_mut().zip(grad_w.iter()) {
            *w -= LEARNING_RATE * (g / n + L2_PENALTY * *w);
        }
        bias -= LEARNING_RATE * (grad_b / n);
    }

    LogisticModel { weights, bias }
}

/// Fallback classifier for single-class training data: predicts the constant
/// occupancy probability implied by the one observed class.
pub fn train_most_frequent(labels: &[f64]) -> TrainedClassifier {
    let occupied_probability = labels.first().copied().unwrap_or(0.0);
    TrainedClassifier::MostFrequent {
        occupied_probability,
    }
}
