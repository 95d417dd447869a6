//! Lag polynomial algebra
//!
//! Polynomials in the lag operator `L` are stored by ascending power, so
//! `[1.0, -0.5]` is `1 - 0.5 L`.

/// Polynomial in the lag operator
#[derive(Debug, Clone, PartialEq)]
pub struct LagPolynomial {
    coefficients: Vec<f64>,
}

impl LagPolynomial {
    /// The constant polynomial `1`
    pub fn one() -> Self {
        Self {
            coefficients: vec![1.0],
        }
    }

    /// Build from coefficients in ascending power
    pub fn from_coefficients(coefficients: Vec<f64>) -> Self {
        if coefficients.is_empty() {
            return Self::one();
        }
        Self { coefficients }
    }

    /// Autoregressive polynomial `1 - phi_1 L - ... - phi_p L^p`
    pub fn autoregressive(phi: &[f64]) -> Self {
        let mut coefficients = Vec::with_capacity(phi.len() + 1);
        coefficients.push(1.0);
        coefficients.extend(phi.iter().map(|c| -c));
        Self { coefficients }
    }

    /// Moving-average polynomial `1 + theta_1 L + ... + theta_q L^q`
    pub fn moving_average(theta: &[f64]) -> Self {
        let mut coefficients = Vec::with_capacity(theta.len() + 1);
        coefficients.push(1.0);
        coefficients.extend_from_slice(theta);
        Self { coefficients }
    }

    /// Coefficients in ascending power
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Highest power
    pub fn degree(&self) -> usize {
        self.coefficients.len() - 1
    }

    /// Product of two polynomials
    pub fn multiply(&self, other: &Self) -> Self {
        let mut product = vec![0.0; self.coefficients.len() + other.coefficients.len() - 1];
        for (i, a) in self.coefficients.iter().enumerate() {
            for (j, b) in other.coefficients.iter().enumerate() {
                product[i + j] += a * b;
            }
        }
        Self {
            coefficients: product,
        }
    }

    /// First `count` coefficients of the power series `self / denominator`.
    ///
    /// With `self = theta(L)` and `denominator = phi(L)` these are the
    /// psi-weights of the MA(infinity) representation. The denominator must
    /// have a unit constant term.
    pub fn divide_series(&self, denominator: &Self, count: usize) -> Vec<f64> {
        let mut psi = Vec::with_capacity(count);
        for j in 0..count {
            let numerator = self.coefficients.get(j).copied().unwrap_or(0.0);
            let feedback: f64 = (1..=j.min(denominator.degree()))
                .map(|k| denominator.coefficients[k] * psi[j - k])
                .sum();
            psi.push(numerator - feedback);
        }
        psi
    }
}

/// Whether the AR process `x_t = sum phi_i x_{t-i} + e_t` is stationary.
///
/// Uses the step-down (reverse Levinson) recursion: the process is
/// stationary exactly when every partial autocorrelation it implies lies
/// strictly inside (-1, 1).
pub fn is_stationary(phi: &[f64]) -> bool {
    let mut current = phi.to_vec();
    while let Some(&k) = current.last() {
        if !k.is_finite() || k.abs() >= 1.0 {
            return false;
        }
        let m = current.len();
        let denom = 1.0 - k * k;
        current = (0..m - 1)
            .map(|i| (current[i] + k * current[m - 2 - i]) / denom)
            .collect();
    }
    true
}

/// Whether the MA polynomial `1 + theta_1 L + ...` is invertible
pub fn is_invertible(theta: &[f64]) -> bool {
    let negated: Vec<f64> = theta.iter().map(|t| -t).collect();
    is_stationary(&negated)
}
