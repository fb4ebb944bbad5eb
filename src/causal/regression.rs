//! Ordinary least squares
//!
//! Fits `y = b0 + b1*x1 + ... + bk*xk` by a QR decomposition of the design
//! matrix. Columns are scaled to unit length first so regressors on very
//! different scales (a 0/1 treatment next to an income) are handled alike.

use nalgebra::{DMatrix, DVector};

/// Smallest accepted |R_jj| for unit-length columns
const RANK_TOLERANCE: f64 = 1e-10;

/// Result of an OLS fit. Index 0 is the intercept.
#[derive(Debug, Clone, PartialEq)]
pub struct OlsFit {
    pub coefficients: Vec<f64>,
    pub std_errors: Vec<f64>,
    /// Residual variance, SSE / (n - p)
    pub residual_variance: f64,
    pub n_samples: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegressionError {
    /// Regressors are collinear (or the treatment is constant)
    Singular,
    /// Fewer observations than parameters plus one
    InsufficientData { samples: usize, parameters: usize },
    /// A regressor column has a different length than the response
    LengthMismatch,
}

impl std::fmt::Display for RegressionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegressionError::Singular => write!(f, "design matrix is singular"),
            RegressionError::InsufficientData {
                samples,
                parameters,
            } => write!(
                f,
                "{} samples are not enough to fit {} parameters",
                samples, parameters
            ),
            RegressionError::LengthMismatch => write!(f, "regressor lengths differ"),
        }
    }
}

impl std::error::Error for RegressionError {}

/// Fits `response` on an intercept plus the given regressor columns.
pub fn fit_ols(response: &[f64], regressors: &[Vec<f64>]) -> Result<OlsFit, RegressionError> {
    let n = response.len();
    let p = regressors.len() + 1;

    if regressors.iter().any(|column| column.len() != n) {
        return Err(RegressionError::LengthMismatch);
    }
    if n <= p {
        return Err(RegressionError::InsufficientData {
            samples: n,
            parameters: p,
        });
    }

    let design = DMatrix::from_fn(n, p, |i, j| if j == 0 { 1.0 } else { regressors[j - 1][i] });
    let y = DVector::from_column_slice(response);

    let scales: Vec<f64> = design.column_iter().map(|column| column.norm()).collect();
    if scales.iter().any(|s| !s.is_finite() || *s == 0.0) {
        return Err(RegressionError::Singular);
    }
    let scaled = DMatrix::from_fn(n, p, |i, j| design[(i, j)] / scales[j]);

    let qr = scaled.qr();
    let (q, r) = (qr.q(), qr.r());
    if r.diagonal().iter().any(|d| d.abs() < RANK_TOLERANCE) {
        return Err(RegressionError::Singular);
    }

    let scaled_coefficients = r
        .solve_upper_triangular(&(q.transpose() * &y))
        .ok_or(RegressionError::Singular)?;
    let coefficients = DVector::from_fn(p, |j, _| scaled_coefficients[j] / scales[j]);

    let residuals = &y - &design * &coefficients;
    let residual_variance = residuals.norm_squared() / (n - p) as f64;

    // (X'X)^-1 = D^-1 (R'R)^-1 D^-1 with D the column scales
    let r_inverse = r.try_inverse().ok_or(RegressionError::Singular)?;
    let covariance = &r_inverse * r_inverse.transpose();
    let std_errors = (0..p)
        .map(|j| (residual_variance * covariance[(j, j)]).max(0.0).sqrt() / scales[j])
        .collect();

    Ok(OlsFit {
        coefficients: coefficients.iter().copied().collect(),
        std_errors,
        residual_variance,
        n_samples: n,
    })
}
