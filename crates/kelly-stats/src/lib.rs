//! Shared data model and numeric utilities for the Kelly portfolio toolkit.
//!
//! This crate holds the value objects passed between the distribution
//! estimator, the allocation optimizer, and the portfolio simulator:
//! [`AssetStatistics`], [`Allocation`], and [`PortfolioSet`]. It also provides
//! the dense linear-algebra helpers (Cholesky factorization, eigenvalue
//! checks) and the streaming moment accumulator the other crates build on.
//!
//! All inputs are immutable once constructed; validation happens at
//! construction time so downstream code can assume well-formed values.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod linalg;
pub mod moments;
pub mod portfolio;
pub mod statistics;

pub use linalg::{
    cholesky, cholesky_log_determinant, cholesky_solve, is_positive_semi_definite,
    jacobi_eigenvalues, lu_solve,
};
pub use moments::{MomentAccumulator, lower_tail_mean, percentile};
pub use portfolio::{Allocation, PortfolioEntry, PortfolioSet};
pub use statistics::{AssetStatistics, ReturnSeries, StatsError};
