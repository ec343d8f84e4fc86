//! Maximum-likelihood fitting via Nelder-Mead
//!
//! Builds the packed parameter vector, runs a derivative-free simplex
//! search on the negative log-likelihood, and decodes the winning vertex
//! into [`DistributionParameters`]. The simplex search needs no gradient,
//! which keeps the fit robust where the Student's t likelihood turns
//! non-smooth near the degrees-of-freedom floor.

use crate::likelihood::{neg_log_likelihood_normal, neg_log_likelihood_student_t};
use crate::params::{
    DistributionFamily, DistributionParameters, MIN_DEGREES_OF_FREEDOM, pack, unpack,
};
use argmin::core::{CostFunction, Error as ArgminError, Executor, TerminationReason,
    TerminationStatus};
use argmin::solver::neldermead::NelderMead;
use ndarray::{Array1, Array2, Axis};
use thiserror::Error;

/// Iteration budget per free parameter.
const MAX_ITERS_PER_PARAM: u64 = 2000;

/// Simplex spread: relative step for nonzero coordinates, absolute for zero.
const SIMPLEX_RELATIVE_STEP: f64 = 0.05;
const SIMPLEX_ABSOLUTE_STEP: f64 = 0.00025;

/// Errors from the distribution estimator.
#[derive(Debug, Error)]
pub enum EstimatorError {
    /// Sample too small for the requested fit
    #[error(
        "Invalid sample: {actual} observations cannot identify {required} free parameters"
    )]
    InvalidSample {
        /// Free parameters of the requested family and dimension
        required: usize,
        /// Observations provided
        actual: usize,
    },

    /// Sample contains NaN or infinite entries
    #[error("Invalid sample: contains non-finite values")]
    NonFiniteSample,

    /// Initial guess does not match the sample's dimensionality
    #[error("Initial guess has dimension {guess}, sample has dimension {sample}")]
    GuessDimensionMismatch {
        /// Dimension of the supplied guess
        guess: usize,
        /// Dimension of the sample
        sample: usize,
    },

    /// The simplex search did not converge within its iteration budget
    #[error("Optimization diverged after {iterations} iterations")]
    OptimizationDiverged {
        /// Iterations consumed before giving up
        iterations: u64,
    },

    /// Solver setup or execution error from the optimization backend
    #[error("Optimizer backend error: {0}")]
    Backend(#[from] ArgminError),
}

struct NegativeLogLikelihood {
    sample: Array2<f64>,
    family: DistributionFamily,
    dimension: usize,
}

impl CostFunction for NegativeLogLikelihood {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, p: &Self::Param) -> Result<Self::Output, ArgminError> {
        let decoded = unpack(p, self.dimension);
        let nll = match self.family {
            DistributionFamily::Normal => neg_log_likelihood_normal(&self.sample, &decoded),
            DistributionFamily::StudentT => {
                neg_log_likelihood_student_t(&self.sample, &decoded)
            }
        };
        // A vertex that underflows the density must lose to every finite
        // vertex instead of poisoning the simplex.
        Ok(if nll.is_finite() { nll } else { f64::MAX })
    }
}

/// Fit `family` to `sample` (rows = observations) by maximum likelihood.
///
/// The optional `initial_guess` seeds the search; otherwise the sample
/// mean and per-coordinate standard deviations are used, with the degrees
/// of freedom starting at the dimension count for Student's t.
pub fn fit(
    sample: &Array2<f64>,
    family: DistributionFamily,
    initial_guess: Option<&DistributionParameters>,
) -> Result<DistributionParameters, EstimatorError> {
    let (n_obs, dimension) = sample.dim();
    let required = family.n_params(dimension);

    if dimension == 0 || n_obs < required.max(2) {
        return Err(EstimatorError::InvalidSample {
            required: required.max(2),
            actual: n_obs,
        });
    }
    if sample.iter().any(|v| !v.is_finite()) {
        return Err(EstimatorError::NonFiniteSample);
    }
    if let Some(guess) = initial_guess {
        if guess.dimension() != dimension {
            return Err(EstimatorError::GuessDimensionMismatch {
                guess: guess.dimension(),
                sample: dimension,
            });
        }
    }

    let x0 = match initial_guess {
        Some(guess) => initial_vector_from_guess(guess, family),
        None => initial_vector_from_sample(sample, family),
    };

    let problem = NegativeLogLikelihood {
        sample: sample.clone(),
        family,
        dimension,
    };

    let max_iters = MAX_ITERS_PER_PARAM * required as u64;
    let solver = NelderMead::new(initial_simplex(&x0)).with_sd_tolerance(1e-10)?;
    let result = Executor::new(problem, solver)
        .configure(|state| state.max_iters(max_iters))
        .run()?;

    let iterations = result.state.iter;
    let best_cost = result.state.best_cost;
    let converged = matches!(
        result.state.termination_status,
        TerminationStatus::Terminated(TerminationReason::SolverConverged)
    );
    let best = result
        .state
        .best_param
        .filter(|_| best_cost.is_finite() && best_cost < f64::MAX);

    match best {
        Some(best) if converged => Ok(decode_result(&best, dimension, family)),
        _ => Err(EstimatorError::OptimizationDiverged { iterations }),
    }
}

fn decode_result(
    params: &[f64],
    dimension: usize,
    family: DistributionFamily,
) -> DistributionParameters {
    let decoded = unpack(params, dimension);
    let scale = decoded.scale_matrix();
    match family {
        DistributionFamily::Normal => DistributionParameters::Normal {
            location: decoded.location,
            scale,
        },
        DistributionFamily::StudentT => DistributionParameters::StudentT {
            location: decoded.location,
            shape: scale,
            degrees_of_freedom: decoded.degrees_of_freedom,
        },
    }
}

/// Default start: sample means, diagonal factor of per-coordinate standard
/// deviations, degrees of freedom equal to the dimension count.
fn initial_vector_from_sample(sample: &Array2<f64>, family: DistributionFamily) -> Vec<f64> {
    let (n_obs, dimension) = sample.dim();
    let means = sample
        .mean_axis(Axis(0))
        .unwrap_or_else(|| Array1::zeros(dimension));

    let mut factor = Array2::<f64>::zeros((dimension, dimension));
    for j in 0..dimension {
        let column = sample.index_axis(Axis(1), j);
        let variance = column
            .iter()
            .map(|v| (v - means[j]).powi(2))
            .sum::<f64>()
            / n_obs as f64;
        factor[[j, j]] = variance.sqrt().max(1e-6);
    }

    let dof = match family {
        DistributionFamily::Normal => None,
        DistributionFamily::StudentT => Some((dimension as f64).max(1.0)),
    };
    pack(&means, &factor, dof)
}

fn initial_vector_from_guess(
    guess: &DistributionParameters,
    family: DistributionFamily,
) -> Vec<f64> {
    let dimension = guess.dimension();
    let factor = kelly_stats::cholesky(guess.scale()).unwrap_or_else(|_| {
        let mut fallback = Array2::<f64>::eye(dimension);
        for j in 0..dimension {
            fallback[[j, j]] = guess.scale()[[j, j]].abs().sqrt().max(1e-6);
        }
        fallback
    });

    let dof = match (family, guess) {
        (DistributionFamily::StudentT, DistributionParameters::StudentT {
            degrees_of_freedom,
            ..
        }) => Some(degrees_of_freedom.max(MIN_DEGREES_OF_FREEDOM)),
        (DistributionFamily::StudentT, _) => Some((dimension as f64).max(1.0)),
        (DistributionFamily::Normal, _) => None,
    };
    pack(guess.location(), &factor, dof)
}

/// Standard axis-step simplex around the starting vector.
fn initial_simplex(x0: &[f64]) -> Vec<Vec<f64>> {
    let mut simplex = Vec::with_capacity(x0.len() + 1);
    simplex.push(x0.to_vec());
    for i in 0..x0.len() {
        let mut vertex = x0.to_vec();
        vertex[i] = if vertex[i] != 0.0 {
            vertex[i] * (1.0 + SIMPLEX_RELATIVE_STEP)
        } else {
            SIMPLEX_ABSOLUTE_STEP
        };
        simplex.push(vertex);
    }
    simplex
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler;
    use approx::assert_relative_eq;
    use ndarray::array;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_rejects_tiny_sample() {
        let sample = array![[0.1], [0.2]];
        let result = fit(&sample, DistributionFamily::StudentT, None);
        assert!(matches!(
            result,
            Err(EstimatorError::InvalidSample { .. })
        ));
    }

    #[test]
    fn test_rejects_non_finite_sample() {
        let sample = array![[0.1], [f64::NAN], [0.3], [0.4], [0.5]];
        let result = fit(&sample, DistributionFamily::Normal, None);
        assert!(matches!(result, Err(EstimatorError::NonFiniteSample)));
    }

    #[test]
    fn test_rejects_mismatched_guess() {
        let sample = array![[0.1], [0.2], [0.3], [0.4]];
        let guess = DistributionParameters::Normal {
            location: array![0.0, 0.0],
            scale: ndarray::Array2::eye(2),
        };
        let result = fit(&sample, DistributionFamily::Normal, Some(&guess));
        assert!(matches!(
            result,
            Err(EstimatorError::GuessDimensionMismatch { guess: 2, sample: 1 })
        ));
    }

    #[test]
    fn test_normal_fit_recovers_sample_moments() {
        // MLE of a normal equals the sample mean and biased variance.
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let n = 4000;
        let sample = sampler::normal_sample(&mut rng, n, 0.7, 1.3);

        let mean = sample.sum() / n as f64;
        let biased_var = sample.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;

        let fitted = fit(&sample, DistributionFamily::Normal, None).unwrap();
        match fitted {
            DistributionParameters::Normal { location, scale } => {
                assert_relative_eq!(location[0], mean, epsilon = 1e-3);
                assert_relative_eq!(scale[[0, 0]], biased_var, max_relative = 1e-2);
            }
            other => panic!("expected normal parameters, got {other:?}"),
        }
    }

    #[test]
    fn test_normal_fit_two_dimensional() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let n = 3000;
        let mut data = ndarray::Array2::<f64>::zeros((n, 2));
        for i in 0..n {
            let z0 = sampler::standard_normal(&mut rng);
            let z1 = sampler::standard_normal(&mut rng);
            data[[i, 0]] = 0.5 + z0;
            // Correlated second coordinate.
            data[[i, 1]] = -0.3 + 0.6 * z0 + 0.8 * z1;
        }

        let fitted = fit(&data, DistributionFamily::Normal, None).unwrap();
        match fitted {
            DistributionParameters::Normal { location, scale } => {
                assert_relative_eq!(location[0], 0.5, epsilon = 0.1);
                assert_relative_eq!(location[1], -0.3, epsilon = 0.1);
                // Cov(x0, x1) = 0.6.
                assert_relative_eq!(scale[[0, 1]], 0.6, epsilon = 0.1);
            }
            other => panic!("expected normal parameters, got {other:?}"),
        }
    }

    #[test]
    fn test_fit_is_deterministic() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let sample = sampler::normal_sample(&mut rng, 500, 0.0, 1.0);
        let a = fit(&sample, DistributionFamily::Normal, None).unwrap();
        let b = fit(&sample, DistributionFamily::Normal, None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_caller_guess_is_honored() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let sample = sampler::normal_sample(&mut rng, 1000, 2.0, 0.5);
        let guess = DistributionParameters::Normal {
            location: array![2.0],
            scale: array![[0.25]],
        };
        let fitted = fit(&sample, DistributionFamily::Normal, Some(&guess)).unwrap();
        match fitted {
            DistributionParameters::Normal { location, .. } => {
                assert_relative_eq!(location[0], 2.0, epsilon = 0.1);
            }
            other => panic!("expected normal parameters, got {other:?}"),
        }
    }
}
