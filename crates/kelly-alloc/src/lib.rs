//! Growth-optimal portfolio allocation
//!
//! Solves the Kelly problem: maximize the expected log growth rate
//! `g(w) = wᵀμ − ½·wᵀΣw` subject to the budget constraint `Σw = 1`, with an
//! optional long-only restriction `w ≥ 0`.
//!
//! The unconstrained (long-short) solution comes from a single bordered
//! linear system. The long-only solution uses an active-set method that
//! repeatedly solves the same system on the unclamped assets, pinning the
//! most negative weight to zero until the KKT conditions hold.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod optimizer;

pub use optimizer::{AllocError, log_growth_rate, optimize};
