//! Statistics primitives shared by every engine: descriptive moments and
//! quantiles, covariance/correlation matrices with their Cholesky and
//! eigen factorizations, and the normal / chi-square distribution helpers.

pub mod descriptive;
pub mod distribution;
pub mod matrix;

pub use descriptive::{correlation, covariance, mean, quantile, std_dev};
pub use distribution::{chi_square_p_value, normal_pdf, normal_quantile, PValueMethod};
pub use matrix::{cholesky_lower, correlation_matrix, covariance_matrix, symmetric_eigen, EigenPair};
