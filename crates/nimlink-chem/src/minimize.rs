//! Polak-Ribière conjugate-gradient minimiser with a backtracking line
//! search. Shared by embedding refinement and force-field optimisation.

use tracing::trace;

/// A differentiable function of a flat coordinate vector.
pub trait Objective {
    /// Returns the value at `x` and writes the gradient into `grad`
    /// (same length as `x`, overwritten).
    fn evaluate(&self, x: &[f64], grad: &mut [f64]) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinimizeOptions {
    pub max_iterations: u32,
    /// Converged once the largest gradient component falls below this.
    pub gradient_tolerance: f64,
    /// Converged once one step improves the value by less than this
    /// fraction of its magnitude.
    pub energy_tolerance: f64,
    /// Largest coordinate change tried by the first step of a line search.
    pub max_step: f64,
}

impl Default for MinimizeOptions {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            gradient_tolerance: 1e-3,
            energy_tolerance: 1e-8,
            max_step: 0.3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinimizeReport {
    pub value: f64,
    pub iterations: u32,
    pub converged: bool,
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn max_abs(v: &[f64]) -> f64 {
    v.iter().fold(0.0, |m, x| m.max(x.abs()))
}

/// Minimise `objective` starting from (and updating) `x`.
pub fn minimize<O: Objective + ?Sized>(
    objective: &O,
    x: &mut [f64],
    options: &MinimizeOptions,
) -> MinimizeReport {
    let n = x.len();
    let mut grad = vec![0.0; n];
    let mut value = objective.evaluate(x, &mut grad);
    let mut direction: Vec<f64> = grad.iter().map(|g| -g).collect();
    let mut trial = vec![0.0; n];
    let mut trial_grad = vec![0.0; n];

    for iteration in 0..options.max_iterations {
        if max_abs(&grad) < options.gradient_tolerance {
            return MinimizeReport {
                value,
                iterations: iteration,
                converged: true,
            };
        }

        let mut slope = dot(&grad, &direction);
        if slope >= 0.0 {
            // Not a descent direction; restart along the gradient.
            for (d, g) in direction.iter_mut().zip(&grad) {
                *d = -g;
            }
            slope = dot(&grad, &direction);
        }

        let largest = max_abs(&direction);
        let mut step = if largest > 0.0 {
            (options.max_step / largest).min(1.0)
        } else {
            0.0
        };

        let mut accepted = None;
        while step > 1e-14 {
            for i in 0..n {
                trial[i] = x[i] + step * direction[i];
            }
            let trial_value = objective.evaluate(&trial, &mut trial_grad);
            if trial_value.is_finite() && trial_value <= value + 1e-4 * step * slope {
                accepted = Some(trial_value);
                break;
            }
            step *= 0.5;
        }

        let Some(new_value) = accepted else {
            trace!(iteration, value, "line search made no progress");
            return MinimizeReport {
                value,
                iterations: iteration,
                converged: max_abs(&grad) < options.gradient_tolerance * 10.0,
            };
        };

        x.copy_from_slice(&trial);
        let improvement = value - new_value;

        let denom = dot(&grad, &grad);
        let beta = if denom > 0.0 {
            let num: f64 = trial_grad
                .iter()
                .zip(&grad)
                .map(|(new, old)| new * (new - old))
                .sum();
            (num / denom).max(0.0)
        } else {
            0.0
        };
        for (d, g) in direction.iter_mut().zip(&trial_grad) {
            *d = -g + beta * *d;
        }
        grad.copy_from_slice(&trial_grad);
        value = new_value;

        if improvement.abs() <= options.energy_tolerance * value.abs().max(1.0) {
            return MinimizeReport {
                value,
                iterations: iteration + 1,
                converged: true,
            };
        }
    }

    MinimizeReport {
        value,
        iterations: options.max_iterations,
        converged: max_abs(&grad) < options.gradient_tolerance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// f(x, y) = (x - 1)^2 + 10 (y + 2)^2
    struct Bowl;

    impl Objective for Bowl {
        fn evaluate(&self, x: &[f64], grad: &mut [f64]) -> f64 {
            grad[0] = 2.0 * (x[0] - 1.0);
            grad[1] = 20.0 * (x[1] + 2.0);
            (x[0] - 1.0).powi(2) + 10.0 * (x[1] + 2.0).powi(2)
        }
    }

    /// Rosenbrock valley, minimum at (1, 1).
    struct Rosenbrock;

    impl Objective for Rosenbrock {
        fn evaluate(&self, x: &[f64], grad: &mut [f64]) -> f64 {
            let (a, b) = (x[0], x[1]);
            grad[0] = -2.0 * (1.0 - a) - 400.0 * a * (b - a * a);
            grad[1] = 200.0 * (b - a * a);
            (1.0 - a).powi(2) + 100.0 * (b - a * a).powi(2)
        }
    }

    #[test]
    fn test_quadratic_bowl() {
        let mut x = vec![5.0, 5.0];
        let report = minimize(&Bowl, &mut x, &MinimizeOptions::default());
        assert!(report.value < 1e-4, "{report:?}");
        assert!((x[0] - 1.0).abs() < 1e-2);
        assert!((x[1] + 2.0).abs() < 1e-2);
    }

    #[test]
    fn test_rosenbrock_makes_progress() {
        let mut x = vec![-1.2, 1.0];
        let options = MinimizeOptions {
            max_iterations: 2000,
            energy_tolerance: 0.0,
            gradient_tolerance: 1e-6,
            ..MinimizeOptions::default()
        };
        let report = minimize(&Rosenbrock, &mut x, &options);
        assert!(report.value < 1.0, "{report:?}");
    }

    #[test]
    fn test_iteration_limit_is_respected() {
        let mut x = vec![-1.2, 1.0];
        let options = MinimizeOptions {
            max_iterations: 3,
            energy_tolerance: 0.0,
            gradient_tolerance: 0.0,
            ..MinimizeOptions::default()
        };
        let report = minimize(&Rosenbrock, &mut x, &options);
        assert_eq!(report.iterations, 3);
        assert!(!report.converged);
    }
}
