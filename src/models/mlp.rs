//! Multilayer perceptron: one hidden ReLU layer, softmax output, trained
//! by full-batch gradient descent on the cross-entropy loss. The L2
//! penalty is applied as a proximal shrink so extreme strengths stay
//! stable; biases are not penalized.

use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{PipelineError, Result};
use crate::models::{argmax, check_fit_input, check_predict_input, class_count, not_fitted, Classifier};

struct Fitted {
    n_features: usize,
    n_classes: usize,
    w1: Array2<f32>,
    b1: Array1<f32>,
    w2: Array2<f32>,
    b2: Array1<f32>,
}

pub struct MlpClassifier {
    pub hidden: usize,
    /// L2 penalty strength, scaled by the sample count like the usual
    /// `alpha` convention.
    pub alpha: f32,
    pub max_iter: usize,
    pub learning_rate: f32,
    pub seed: u64,
    pub tol: f32,
    fitted: Option<Fitted>,
}

impl MlpClassifier {
    pub fn new(hidden: usize, alpha: f32, max_iter: usize, seed: u64) -> Self {
        Self {
            hidden,
            alpha,
            max_iter,
            learning_rate: 0.05,
            seed,
            tol: 1e-5,
            fitted: None,
        }
    }

    /// Xavier-uniform init in `(-sqrt(6/(fan_in+fan_out)), +...)`.
    fn init_layer(rng: &mut StdRng, fan_in: usize, fan_out: usize) -> Array2<f32> {
        let bound = (6.0 / (fan_in + fan_out) as f32).sqrt();
        let mut w = Array2::<f32>::zeros((fan_in, fan_out));
        for v in w.iter_mut() {
            *v = rng.gen_range(-bound..bound);
        }
        w
    }

    fn forward(fitted: &Fitted, x: &Array2<f32>) -> (Array2<f32>, Array2<f32>) {
        let mut hidden = x.dot(&fitted.w1) + &fitted.b1;
        hidden.mapv_inplace(|v| v.max(0.0));
        let logits = hidden.dot(&fitted.w2) + &fitted.b2;
        (hidden, logits)
    }

    fn softmax_rows(logits: &Array2<f32>) -> Array2<f32> {
        let mut out = logits.clone();
        for mut row in out.rows_mut() {
            let max = row.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
            row.mapv_inplace(|v| (v - max).exp());
            let sum: f32 = row.iter().sum();
            row.mapv_inplace(|v| v / sum);
        }
        out
    }

    fn probabilities(&self, x: &Array2<f32>) -> Result<Array2<f32>> {
        let fitted = self.fitted.as_ref().ok_or_else(|| not_fitted(self.name()))?;
        check_predict_input(self.name(), fitted.n_features, x)?;
        let (_, logits) = Self::forward(fitted, x);
        Ok(Self::softmax_rows(&logits))
    }
}

impl Classifier for MlpClassifier {
    fn name(&self) -> &str {
        "Neural Network"
    }

    fn fit(&mut self, x: &Array2<f32>, y: &[i32]) -> Result<()> {
        if self.hidden == 0 {
            return Err(PipelineError::Configuration(
                "hidden layer size must be at least 1".to_string(),
            ));
        }
        if self.alpha < 0.0 {
            return Err(PipelineError::Configuration(format!(
                "alpha must be non-negative, got {}",
                self.alpha
            )));
        }
        check_fit_input(x, y)?;
        let n_classes = class_count(y)?;
        if n_classes < 2 {
            return Err(PipelineError::Value(
                "the network needs at least two classes".to_string(),
            ));
        }

        let n = x.nrows();
        let d = x.ncols();
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut fitted = Fitted {
            n_features: d,
            n_classes,
            w1: Self::init_layer(&mut rng, d, self.hidden),
            b1: Array1::zeros(self.hidden),
            w2: Self::init_layer(&mut rng, self.hidden, n_classes),
            b2: Array1::zeros(n_classes),
        };

        let shrink = 1.0 / (1.0 + self.learning_rate * self.alpha / n as f32);
        let mut previous_loss = f32::INFINITY;
        for _ in 0..self.max_iter {
            let (hidden, logits) = Self::forward(&fitted, x);
            let probs = Self::softmax_rows(&logits);

            let mut loss = 0.0f32;
            let mut d_logits = probs;
            for (i, &label) in y.iter().enumerate() {
                let p = d_logits[[i, label as usize]].max(1e-12);
                loss -= p.ln();
                d_logits[[i, label as usize]] -= 1.0;
            }
            loss /= n as f32;
            d_logits /= n as f32;

            let d_w2 = hidden.t().dot(&d_logits);
            let d_b2 = d_logits.sum_axis(Axis(0));
            let mut d_hidden = d_logits.dot(&fitted.w2.t());
            // ReLU gate.
            for (dh, h) in d_hidden.iter_mut().zip(hidden.iter()) {
                if *h <= 0.0 {
                    *dh = 0.0;
                }
            }
            let d_w1 = x.t().dot(&d_hidden);
            let d_b1 = d_hidden.sum_axis(Axis(0));

            fitted.w1 = (&fitted.w1 - self.learning_rate * &d_w1) * shrink;
            fitted.b1 = &fitted.b1 - self.learning_rate * &d_b1;
            fitted.w2 = (&fitted.w2 - self.learning_rate * &d_w2) * shrink;
            fitted.b2 = &fitted.b2 - self.learning_rate * &d_b2;

            if (previous_loss - loss).abs() < self.tol {
                break;
            }
            previous_loss = loss;
        }

        self.fitted = Some(fitted);
        Ok(())
    }

    fn predict(&self, x: &Array2<f32>) -> Result<Vec<i32>> {
        let probs = self.probabilities(x)?;
        Ok(probs
            .rows()
            .into_iter()
            .map(|row| argmax(&row.to_vec()) as i32)
            .collect())
    }

    fn predict_proba(&self, x: &Array2<f32>) -> Option<Result<Array2<f32>>> {
        Some(self.probabilities(x))
    }
}
