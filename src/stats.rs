//! Statistical primitives shared by the analytical views.
//!
//! - [`erf`] / [`normal_cdf`]: standard normal CDF from the error function
//!   (Abramowitz & Stegun 7.1.26, absolute error below 1.5e-7).
//! - [`mean`] / [`sample_std_dev`]: running-sum moments with the n-1 divisor.
//! - [`trailing_bounds`]: mean ± k·σ over the `window` points before each index.
//! - [`LinearFit`]: ordinary least squares for a degree-1 polynomial.

use serde::Serialize;

pub fn erf(x: f64) -> f64 {
    const A1: f64 = 0.254_829_592;
    const A2: f64 = -0.284_496_736;
    const A3: f64 = 1.421_413_741;
    const A4: f64 = -1.453_152_027;
    const A5: f64 = 1.061_405_429;
    const P: f64 = 0.327_591_1;

    if x == 0.0 {
        return 0.0;
    }
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + P * x);
    let y = 1.0 - (((((A5 * t + A4) * t) + A3) * t + A2) * t + A1) * t * (-x * x).exp();
    sign * y
}

pub fn normal_cdf(z: f64) -> f64 {
    0.5 * (1.0 + erf(z / std::f64::consts::SQRT_2))
}

#[derive(Debug, Clone, Copy, Default)]
struct Moments {
    count: usize,
    sum: f64,
    sum_squares: f64,
}

impl Moments {
    fn from_values(values: &[f64]) -> Self {
        values.iter().fold(Moments::default(), |mut acc, value| {
            acc.count += 1;
            acc.sum += value;
            acc.sum_squares += value * value;
            acc
        })
    }

    fn mean(&self) -> Option<f64> {
        if self.count > 0 {
            Some(self.sum / self.count as f64)
        } else {
            None
        }
    }

    fn std_dev(&self) -> Option<f64> {
        if self.count < 2 {
            return None;
        }
        let mean = self.mean()?;
        let variance =
            (self.sum_squares - self.count as f64 * mean * mean) / (self.count as f64 - 1.0);
        Some(variance.max(0.0).sqrt())
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    Moments::from_values(values).mean()
}

pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    Moments::from_values(values).std_dev()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Band {
    pub mean: f64,
    pub std_dev: f64,
    pub lower: f64,
    pub upper: f64,
}

/// For each index `i`, the band built from `values[i - window..i]`.
///
/// Indices with fewer than `window` earlier points get `None`.
pub fn trailing_bounds(values: &[f64], window: usize, sigmas: f64) -> Vec<Option<Band>> {
    (0..values.len())
        .map(|idx| {
            if window == 0 || idx < window {
                return None;
            }
            let moments = Moments::from_values(&values[idx - window..idx]);
            let mean = moments.mean()?;
            let std_dev = moments.std_dev().unwrap_or(0.0);
            Some(Band {
                mean,
                std_dev,
                lower: mean - sigmas * std_dev,
                upper: mean + sigmas * std_dev,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    /// Least-squares line through `(x, y)` pairs; `None` with fewer than two
    /// points or when every `x` is identical.
    pub fn fit(points: &[(f64, f64)]) -> Option<Self> {
        if points.len() < 2 {
            return None;
        }
        let n = points.len() as f64;
        let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
        let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;
        let (sxy, sxx) = points.iter().fold((0.0, 0.0), |(sxy, sxx), (x, y)| {
            let dx = x - mean_x;
            (sxy + dx * (y - mean_y), sxx + dx * dx)
        });
        if sxx == 0.0 {
            return None;
        }
        let slope = sxy / sxx;
        Some(LinearFit {
            slope,
            intercept: mean_y - slope * mean_x,
        })
    }

    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}
