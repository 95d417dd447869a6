//! Moving average calculation implementations
//!
//! Contains the rolling averages used for trend estimation:
//! - Simple Moving Average (SMA), streaming over a trailing window
//! - Trailing rolling mean over a whole series
//! - Centered moving average (2xm average for even windows)

use crate::{MathError, Result};
use std::collections::VecDeque;

/// Simple Moving Average (SMA) implementation
#[derive(Debug, Clone)]
pub struct SimpleMovingAverage {
    period: usize,
    values: VecDeque<f64>,
    sum: f64,
}

impl SimpleMovingAverage {
    /// Create a new Simple Moving Average with the specified period
    pub fn new(period: usize) -> Result<Self> {
        if period == 0 {
            return Err(MathError::InvalidInput(
                "Period must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            period,
            values: VecDeque::with_capacity(period),
            sum: 0.0,
        })
    }

    /// Update the SMA with a new value
    pub fn update(&mut self, value: f64) {
        self.values.push_back(value);
        self.sum += value;

        if self.values.len() > self.period {
            if let Some(old_value) = self.values.pop_front() {
                self.sum -= old_value;
            }
        }
    }

    /// Get the current SMA value
    pub fn value(&self) -> Result<f64> {
        if self.values.len() < self.period {
            return Err(MathError::InsufficientData(format!(
                "Not enough data for SMA calculation. Need {} values, have {}.",
                self.period,
                self.values.len()
            )));
        }

        Ok(self.sum / self.period as f64)
    }
}

/// Trailing rolling mean over `window` points.
///
/// Position `i` holds the mean of `values[i + 1 - window..=i]`; the first
/// `window - 1` positions are `None`.
pub fn trailing_mean(values: &[f64], window: usize) -> Result<Vec<Option<f64>>> {
    let mut sma = SimpleMovingAverage::new(window)?;
    if values.len() < window {
        return Err(MathError::InsufficientData(format!(
            "Rolling mean over {} points needs at least {} values, got {}",
            window,
            window,
            values.len()
        )));
    }

    Ok(values
        .iter()
        .map(|&value| {
            sma.update(value);
            sma.value().ok()
        })
        .collect())
}

/// Centered moving average over `period` points.
///
/// Odd periods use a plain centered window. Even periods use the 2xm
/// average: `period + 1` points with half weight on both ends. In both cases
/// the first and last `period / 2` positions are `None`.
pub fn centered_mean(values: &[f64], period: usize) -> Result<Vec<Option<f64>>> {
    if period == 0 {
        return Err(MathError::InvalidInput(
            "Period must be greater than zero".to_string(),
        ));
    }

    let n = values.len();
    let half = period / 2;
    if n < period + (period + 1) % 2 {
        return Err(MathError::InsufficientData(format!(
            "Centered mean over {} points needs at least {} values, got {}",
            period,
            period + (period + 1) % 2,
            n
        )));
    }

    let mut result = vec![None; n];
    for (i, slot) in result.iter_mut().enumerate().take(n - half).skip(half) {
        let window = &values[i - half..=i + half];
        let value = if period % 2 == 1 {
            window.iter().sum::<f64>() / period as f64
        } else {
            let inner: f64 = window[1..window.len() - 1].iter().sum();
            let ends = 0.5 * (window[0] + window[window.len() - 1]);
            (inner + ends) / period as f64
        };
        *slot = Some(value);
    }

    Ok(result)
}
