//! Distribution families and fitted parameters
//!
//! The optimizer works on a flat parameter vector; this module defines the
//! packing: location entries first, then the rows of the lower-triangular
//! Cholesky factor of the scale matrix, then (for Student's t) the degrees
//! of freedom. Decoding clamps the factor's diagonal and the degrees of
//! freedom to small positive floors so the density stays defined at every
//! simplex vertex.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Smallest magnitude allowed for a Cholesky diagonal entry.
pub(crate) const MIN_DIAGONAL: f64 = 1e-10;

/// Lower bound on Student's t degrees of freedom.
pub(crate) const MIN_DEGREES_OF_FREEDOM: f64 = 1e-2;

/// Distribution family to fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistributionFamily {
    /// Multivariate normal: location vector and covariance matrix.
    Normal,
    /// Multivariate Student's t: location, shape matrix, degrees of freedom.
    StudentT,
}

impl DistributionFamily {
    /// Number of free parameters for a `dimension`-variate fit.
    pub const fn n_params(self, dimension: usize) -> usize {
        let base = dimension + dimension * (dimension + 1) / 2;
        match self {
            Self::Normal => base,
            Self::StudentT => base + 1,
        }
    }
}

/// Immutable result of a maximum-likelihood fit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum DistributionParameters {
    /// Multivariate normal parameters.
    Normal {
        /// Location (mean) vector.
        location: Array1<f64>,
        /// Covariance matrix (symmetric positive definite).
        scale: Array2<f64>,
    },
    /// Multivariate Student's t parameters.
    StudentT {
        /// Location vector.
        location: Array1<f64>,
        /// Shape matrix (symmetric positive definite).
        shape: Array2<f64>,
        /// Degrees of freedom (> 0).
        degrees_of_freedom: f64,
    },
}

impl DistributionParameters {
    /// The family these parameters belong to.
    pub const fn family(&self) -> DistributionFamily {
        match self {
            Self::Normal { .. } => DistributionFamily::Normal,
            Self::StudentT { .. } => DistributionFamily::StudentT,
        }
    }

    /// Dimensionality of the distribution.
    pub fn dimension(&self) -> usize {
        match self {
            Self::Normal { location, .. } | Self::StudentT { location, .. } => location.len(),
        }
    }

    /// Location vector.
    pub const fn location(&self) -> &Array1<f64> {
        match self {
            Self::Normal { location, .. } | Self::StudentT { location, .. } => location,
        }
    }

    /// Scale (normal) or shape (Student's t) matrix.
    pub const fn scale(&self) -> &Array2<f64> {
        match self {
            Self::Normal { scale, .. } => scale,
            Self::StudentT { shape, .. } => shape,
        }
    }
}

/// Decoded view of a packed parameter vector.
#[derive(Debug, Clone)]
pub(crate) struct PackedParams {
    pub location: Array1<f64>,
    /// Lower-triangular Cholesky factor of the scale matrix, diagonal
    /// already clamped positive.
    pub factor: Array2<f64>,
    /// Degrees of freedom, clamped; meaningful for Student's t only.
    pub degrees_of_freedom: f64,
}

impl PackedParams {
    /// Scale matrix `L·Lᵀ` implied by the factor.
    pub(crate) fn scale_matrix(&self) -> Array2<f64> {
        self.factor.dot(&self.factor.t())
    }
}

/// Flatten location, factor, and optional degrees of freedom into the
/// optimizer's parameter vector.
pub(crate) fn pack(
    location: &Array1<f64>,
    factor: &Array2<f64>,
    degrees_of_freedom: Option<f64>,
) -> Vec<f64> {
    let d = location.len();
    let mut params = Vec::with_capacity(DistributionFamily::Normal.n_params(d) + 1);
    params.extend(location.iter().copied());
    for i in 0..d {
        for j in 0..=i {
            params.push(factor[[i, j]]);
        }
    }
    if let Some(dof) = degrees_of_freedom {
        params.push(dof);
    }
    params
}

/// Decode the optimizer's parameter vector for a `dimension`-variate fit.
pub(crate) fn unpack(params: &[f64], dimension: usize) -> PackedParams {
    let location = Array1::from_iter(params[..dimension].iter().copied());

    let mut factor = Array2::<f64>::zeros((dimension, dimension));
    let mut cursor = dimension;
    for i in 0..dimension {
        for j in 0..=i {
            factor[[i, j]] = params[cursor];
            cursor += 1;
        }
    }
    // Keep the factor usable whatever the simplex proposes: the sign of a
    // diagonal entry does not change L·Lᵀ, so fold it away and floor.
    for i in 0..dimension {
        factor[[i, i]] = factor[[i, i]].abs().max(MIN_DIAGONAL);
    }

    let degrees_of_freedom = params
        .last()
        .copied()
        .unwrap_or(MIN_DEGREES_OF_FREEDOM)
        .max(MIN_DEGREES_OF_FREEDOM);

    PackedParams {
        location,
        factor,
        degrees_of_freedom,
    }
}
