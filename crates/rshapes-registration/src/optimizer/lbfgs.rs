//! L-BFGS optimizer.
//!
//! Limited-memory BFGS with the standard two-loop recursion and a
//! backtracking (Armijo) line search. The line search re-invokes the
//! objective closure, so a single outer step may cost several evaluations.

use std::collections::VecDeque;

use burn::config::Config;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use rshapes_core::Error;

use super::trait_::{dot, Evaluation, Objective, Optimizer};

/// L-BFGS configuration.
#[derive(Config, Debug)]
pub struct LbfgsConfig {
    /// Number of curvature pairs to keep.
    #[config(default = 10)]
    pub history_size: usize,
    /// Step scaling used before any curvature history exists.
    #[config(default = 1.0)]
    pub learning_rate: f64,
    /// Maximum objective evaluations per line search.
    #[config(default = 20)]
    pub max_line_search: usize,
    /// Armijo sufficient-decrease constant.
    #[config(default = 1e-4)]
    pub sufficient_decrease: f64,
}

impl LbfgsConfig {
    /// Initialize an L-BFGS optimizer.
    ///
    /// # Errors
    /// Returns an invalid configuration error for a zero history, a
    /// non-positive learning rate, a zero line-search budget or a
    /// sufficient-decrease constant outside (0, 1).
    pub fn init<B: Backend>(&self) -> rshapes_core::Result<Lbfgs<B>> {
        if self.history_size == 0 {
            return Err(Error::invalid_configuration(
                "L-BFGS history size must be at least 1",
            ));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(Error::invalid_configuration(format!(
                "learning rate must be positive and finite, got {}",
                self.learning_rate
            )));
        }
        if self.max_line_search == 0 {
            return Err(Error::invalid_configuration(
                "line search needs at least one evaluation",
            ));
        }
        if self.sufficient_decrease <= 0.0 || self.sufficient_decrease >= 1.0 {
            return Err(Error::invalid_configuration(format!(
                "sufficient-decrease constant must be in (0, 1), got {}",
                self.sufficient_decrease
            )));
        }
        Ok(Lbfgs {
            history_size: self.history_size,
            learning_rate: self.learning_rate,
            max_line_search: self.max_line_search,
            sufficient_decrease: self.sufficient_decrease,
            history: VecDeque::with_capacity(self.history_size),
            previous: None,
        })
    }
}

/// One stored curvature pair.
struct Correction<B: Backend> {
    /// Parameter difference `x_k - x_{k-1}`.
    s: Tensor<B, 1>,
    /// Gradient difference `g_k - g_{k-1}`.
    y: Tensor<B, 1>,
    /// `1 / (y^T s)`.
    rho: f64,
}

/// L-BFGS optimizer with curvature-guarded history.
pub struct Lbfgs<B: Backend> {
    history_size: usize,
    learning_rate: f64,
    max_line_search: usize,
    sufficient_decrease: f64,
    history: VecDeque<Correction<B>>,
    /// Flattened parameter and gradient of the previous step.
    previous: Option<(Tensor<B, 1>, Tensor<B, 1>)>,
}

impl<B: Backend> Lbfgs<B> {
    /// Two-loop recursion: approximate `H^{-1} g`.
    fn search_direction(&self, gradient: Tensor<B, 1>) -> Tensor<B, 1> {
        let mut q = gradient;
        let mut alphas = Vec::with_capacity(self.history.len());

        for correction in self.history.iter().rev() {
            let alpha = correction.rho * dot(&correction.s, &q);
            q = q - correction.y.clone().mul_scalar(alpha);
            alphas.push(alpha);
        }

        // Scale by gamma = (s^T y) / (y^T y) of the most recent pair, or fall
        // back to a plain gradient step.
        let mut r = match self.history.back() {
            Some(last) => {
                let gamma = dot(&last.s, &last.y) / dot(&last.y, &last.y);
                q.mul_scalar(gamma)
            }
            None => q.mul_scalar(self.learning_rate),
        };

        for (correction, alpha) in self.history.iter().zip(alphas.into_iter().rev()) {
            let beta = correction.rho * dot(&correction.y, &r);
            r = r + correction.s.clone().mul_scalar(alpha - beta);
        }

        r
    }

    fn update_history(&mut self, x: &Tensor<B, 1>, g: &Tensor<B, 1>) {
        if let Some((prev_x, prev_g)) = self.previous.take() {
            let s = x.clone() - prev_x;
            let y = g.clone() - prev_g;
            let ys = dot(&y, &s);
            // Only curvature pairs with y^T s > 0 keep the inverse Hessian
            // approximation positive definite.
            if ys > 1e-10 {
                if self.history.len() >= self.history_size {
                    self.history.pop_front();
                }
                self.history.push_back(Correction { s, y, rho: 1.0 / ys });
            }
        }
    }
}

impl<B: Backend> Optimizer<B> for Lbfgs<B> {
    fn step(
        &mut self,
        parameter: Tensor<B, 2>,
        objective: &mut Objective<'_, B>,
    ) -> rshapes_core::Result<(Tensor<B, 2>, f64)> {
        let shape = parameter.dims();
        let n = shape[0] * shape[1];

        let Evaluation { value, gradient } = objective(&parameter)?;
        let x = parameter.reshape([n]);
        let g = gradient.reshape([n]);

        self.update_history(&x, &g);
        let direction = self.search_direction(g.clone());
        let slope = dot(&g, &direction);

        // Backtracking line search along -direction.
        let mut step_size = 1.0;
        let mut candidate = x.clone() - direction.clone();
        for attempt in 0..self.max_line_search {
            let trial = objective(&candidate.clone().reshape(shape))?;
            if trial.value <= value - self.sufficient_decrease * step_size * slope
                || attempt + 1 == self.max_line_search
            {
                break;
            }
            step_size *= 0.5;
            candidate = x.clone() - direction.clone().mul_scalar(step_size);
        }

        self.previous = Some((x, g));
        Ok((candidate.reshape(shape), value))
    }

    fn name(&self) -> &'static str {
        "Lbfgs"
    }
}
