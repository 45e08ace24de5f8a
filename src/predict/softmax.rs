// Multinomial logistic regression trained by full-batch gradient descent.
//
// Inputs are L2-normalized before scoring, so the same learning rate works
// for the unit-length hashing embeddings and the unnormalized mean-pooled
// ONNX output. Weights start at zero, which makes training deterministic.

use tracing::{debug, warn};

use crate::error::PredictionError;

/// Hyperparameters for fitting a classifier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingConfig {
    /// Gradient descent step size.
    pub learning_rate: f64,
    /// Upper bound on full passes over the training data.
    pub max_iter: usize,
    /// Inverse regularization strength. The L2 penalty is `1 / (c * n)`.
    pub c: f64,
    /// Stop once the largest gradient component falls below this.
    pub tolerance: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.5,
            max_iter: 1000,
            c: 1.0,
            tolerance: 1e-5,
        }
    }
}

/// A fitted softmax classifier over labels of type `L`.
#[derive(Debug, Clone)]
pub struct SoftmaxClassifier<L> {
    labels: Vec<L>,
    /// One weight row per label, each `dim` long.
    weights: Vec<Vec<f64>>,
    bias: Vec<f64>,
    dim: usize,
}

impl<L: Clone + PartialEq> SoftmaxClassifier<L> {
    /// Fit a classifier on `(embedding, label)` pairs.
    ///
    /// The dimension is taken from the first sample; samples with another
    /// dimension are skipped. Returns `None` when nothing is left to train on.
    pub fn fit(samples: &[(&[f64], L)], config: &TrainingConfig) -> Option<Self> {
        let dim = samples.first()?.0.len();

        let mut labels: Vec<L> = Vec::new();
        let mut xs: Vec<Vec<f64>> = Vec::with_capacity(samples.len());
        let mut ys: Vec<usize> = Vec::with_capacity(samples.len());

        for (x, label) in samples {
            if x.len() != dim {
                warn!(expected = dim, actual = x.len(), "Skipping training sample with wrong dimension");
                continue;
            }
            let class = match labels.iter().position(|l| l == label) {
                Some(idx) => idx,
                None => {
                    labels.push(label.clone());
                    labels.len() - 1
                }
            };
            xs.push(normalize(x));
            ys.push(class);
        }

        if xs.is_empty() {
            return None;
        }

        let k = labels.len();
        let mut model = Self {
            labels,
            weights: vec![vec![0.0; dim]; k],
            bias: vec![0.0; k],
            dim,
        };

        // A single class needs no training: softmax over one logit is 1.
        if k > 1 {
            model.train(&xs, &ys, config);
        }

        Some(model)
    }

    fn train(&mut self, xs: &[Vec<f64>], ys: &[usize], config: &TrainingConfig) {
        let k = self.labels.len();
        let n = xs.len() as f64;
        let l2 = 1.0 / (config.c * n);

        let mut grad_w = vec![vec![0.0; self.dim]; k];
        let mut grad_b = vec![0.0; k];
        let mut iterations = 0;

        for _ in 0..config.max_iter {
            iterations += 1;
            for row in &mut grad_w {
                row.iter_mut().for_each(|g| *g = 0.0);
            }
            grad_b.iter_mut().for_each(|g| *g = 0.0);

            for (x, &y) in xs.iter().zip(ys) {
                let probs = self.probabilities(x);
                for (class, p) in probs.iter().enumerate() {
                    let err = (p - if class == y { 1.0 } else { 0.0 }) / n;
                    grad_b[class] += err;
                    for (g, xi) in grad_w[class].iter_mut().zip(x) {
                        *g += err * xi;
                    }
                }
            }

            let mut max_grad: f64 = 0.0;
            for class in 0..k {
                for (g, w) in grad_w[class].iter_mut().zip(&self.weights[class]) {
                    *g += l2 * w;
                    max_grad = max_grad.max(g.abs());
                }
                max_grad = max_grad.max(grad_b[class].abs());
            }

            for class in 0..k {
                for (w, g) in self.weights[class].iter_mut().zip(&grad_w[class]) {
                    *w -= config.learning_rate * g;
                }
                self.bias[class] -= config.learning_rate * grad_b[class];
            }

            if max_grad < config.tolerance {
                break;
            }
        }

        debug!(
            classes = k,
            samples = xs.len(),
            iterations,
            "Fitted softmax classifier"
        );
    }

    /// Class probabilities for an already-normalized input.
    fn probabilities(&self, x: &[f64]) -> Vec<f64> {
        let logits: Vec<f64> = self
            .weights
            .iter()
            .zip(&self.bias)
            .map(|(w, b)| w.iter().zip(x).map(|(wi, xi)| wi * xi).sum::<f64>() + b)
            .collect();

        let max = logits.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let exps: Vec<f64> = logits.iter().map(|l| (l - max).exp()).collect();
        let total: f64 = exps.iter().sum();
        exps.into_iter().map(|e| e / total).collect()
    }

    /// Probability of each label, in `labels()` order.
    pub fn predict_proba(&self, x: &[f64]) -> Result<Vec<f64>, PredictionError> {
        if x.len() != self.dim {
            return Err(PredictionError::DimensionMismatch {
                expected: self.dim,
                actual: x.len(),
            });
        }
        Ok(self.probabilities(&normalize(x)))
    }

    /// The most probable label and its probability. Ties go to the label
    /// seen first during training.
    pub fn predict(&self, x: &[f64]) -> Result<(L, f64), PredictionError> {
        let probs = self.predict_proba(x)?;
        let mut best = 0;
        for (i, p) in probs.iter().enumerate() {
            if *p > probs[best] {
                best = i;
            }
        }
        Ok((self.labels[best].clone(), probs[best]))
    }

    /// Labels in first-seen order.
    pub fn labels(&self) -> &[L] {
        &self.labels
    }

    pub fn dim(&self) -> usize {
        self.dim
    }
}

fn normalize(x: &[f64]) -> Vec<f64> {
    let norm = x.iter().map(|v| v * v).sum::<f64>().sqrt();
    if norm < f64::EPSILON {
        x.to_vec()
    } else {
        x.iter().map(|v| v / norm).collect()
    }
}
