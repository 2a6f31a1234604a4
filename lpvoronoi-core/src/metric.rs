//! Lp distance metrics.

use crate::{Position, Result, VoronoiError};

/// Below this axis delta the normalized general-p cost collapses to zero.
const MIN_NORMALIZER: f64 = 1e-3;

/// Lp norm selector, `1 <= p <= inf`.
///
/// `p = 1`, `p = 2` and `p = inf` are distinguished variants with closed-form
/// costs; every other exponent goes through [`Metric::Lp`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Metric {
    Manhattan,
    #[default]
    Euclidean,
    Lp(f64),
    Chebyshev,
}

impl Metric {
    /// Build a metric from an exponent. `f64::INFINITY` selects Chebyshev.
    pub fn from_p(p: f64) -> Result<Self> {
        if p.is_nan() || p < 1.0 {
            return Err(VoronoiError::InvalidMetric(p));
        }
        Ok(if p.is_infinite() {
            Metric::Chebyshev
        } else if p == 1.0 {
            Metric::Manhattan
        } else if p == 2.0 {
            Metric::Euclidean
        } else {
            Metric::Lp(p)
        })
    }

    pub fn p(&self) -> f64 {
        match *self {
            Metric::Manhattan => 1.0,
            Metric::Euclidean => 2.0,
            Metric::Lp(p) => p,
            Metric::Chebyshev => f64::INFINITY,
        }
    }

    pub fn is_euclidean(&self) -> bool {
        self.p() == 2.0
    }

    /// Re-check a metric that may have been built directly as `Lp(p)`.
    pub fn validate(&self) -> Result<()> {
        Metric::from_p(self.p()).map(|_| ())
    }

    /// Cost of an axis delta under this norm.
    #[inline]
    pub fn cost(&self, dx: f64, dy: f64) -> f64 {
        let ax = dx.abs();
        let ay = dy.abs();
        match *self {
            Metric::Chebyshev => ax.max(ay),
            Metric::Manhattan => ax + ay,
            Metric::Euclidean => (dx * dx + dy * dy).sqrt(),
            Metric::Lp(p) => {
                // Normalize before exponentiation so large p neither overflows nor underflows.
                let m = ax.max(ay);
                if m < MIN_NORMALIZER {
                    return 0.0;
                }
                m * ((ax / m).powf(p) + (ay / m).powf(p)).powf(1.0 / p)
            }
        }
    }

    pub fn distance(&self, a: &Position, b: &Position) -> f64 {
        self.cost(b.x - a.x, b.y - a.y)
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Metric::Chebyshev => write!(f, "inf"),
            other => write!(f, "{}", other.p()),
        }
    }
}

impl std::str::FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let p = match s.trim().to_lowercase().as_str() {
            "inf" | "infinity" | "chebyshev" | "max" => f64::INFINITY,
            "manhattan" | "taxicab" => 1.0,
            "euclidean" => 2.0,
            other => other
                .parse::<f64>()
                .map_err(|_| format!("unknown metric '{}': expected a number >= 1 or 'inf'", s))?,
        };
        Metric::from_p(p).map_err(|e| e.to_string())
    }
}
