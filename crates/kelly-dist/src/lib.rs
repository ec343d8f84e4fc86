//! Maximum-likelihood distribution estimation
//!
//! Fits multivariate normal and Student's t distributions to observation
//! samples by minimizing the negative log-likelihood with a derivative-free
//! Nelder-Mead search. The scale matrix is parameterized through its
//! Cholesky factor so every candidate stays positive-definite, and the
//! log-density is evaluated through triangular solves rather than an
//! explicit determinant and inverse.
//!
//! The [`sampler`] module also provides a seedable ratio-of-uniforms normal
//! variate generator used to build synthetic samples in tests.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod estimator;
pub mod likelihood;
pub mod params;
pub mod sampler;

pub use estimator::{EstimatorError, fit};
pub use params::{DistributionFamily, DistributionParameters};
pub use sampler::{normal_sample, standard_normal, student_t_sample};
