//! Series expansions that adjust a key function.
//!
//! A detection function with `m` expansion terms is
//! `key(x) · (1 + Σ_{j=1..m} a_j h_j(u))` with `u = x / hi`. The terms are
//! even in `u` (or cosine harmonics), so the adjustment leaves the shoulder
//! at zero flat.
use crate::detection::errors::DetectionError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Largest supported number of expansion terms.
pub const MAX_EXPANSIONS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SeriesKind {
    /// `cos((j + 1) π u)`.
    Cosine,
    /// Probabilists' Hermite polynomials `He_{2(j+1)}(u)`.
    Hermite,
    /// `u^{2(j+1)}`.
    SimplePolynomial,
}

impl SeriesKind {
    pub const ALL: [SeriesKind; 3] =
        [SeriesKind::Cosine, SeriesKind::Hermite, SeriesKind::SimplePolynomial];

    pub fn name(&self) -> &'static str {
        match self {
            SeriesKind::Cosine => "cosine",
            SeriesKind::Hermite => "hermite",
            SeriesKind::SimplePolynomial => "simple",
        }
    }

    /// `1 + Σ a_j h_j(u)` for the coefficients in `coefs` (term `j` is
    /// `coefs[j]`, 0-based).
    pub fn adjustment(&self, coefs: &[f64], u: f64) -> f64 {
        if coefs.is_empty() {
            return 1.0;
        }
        match self {
            SeriesKind::Cosine => {
                let pi_u = std::f64::consts::PI * u;
                1.0 + coefs.iter().enumerate().map(|(j, a)| a * ((j + 1) as f64 * pi_u).cos()).sum::<f64>()
            }
            SeriesKind::SimplePolynomial => {
                let u2 = u * u;
                let mut power = 1.0;
                let mut acc = 1.0;
                for a in coefs {
                    power *= u2;
                    acc += a * power;
                }
                acc
            }
            SeriesKind::Hermite => {
                // He_{n+1} = u He_n - n He_{n-1}, keeping the even orders.
                let mut prev = 1.0;
                let mut curr = u;
                let mut acc = 1.0;
                let mut j = 0;
                for n in 1..=2 * coefs.len() {
                    let next = u * curr - n as f64 * prev;
                    prev = curr;
                    curr = next;
                    if n % 2 == 1 {
                        acc += coefs[j] * curr;
                        j += 1;
                    }
                }
                acc
            }
        }
    }
}

impl std::fmt::Display for SeriesKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SeriesKind {
    type Err = DetectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cosine" | "cos" => Ok(SeriesKind::Cosine),
            "hermite" | "herm" => Ok(SeriesKind::Hermite),
            "simple" | "poly" | "polynomial" => Ok(SeriesKind::SimplePolynomial),
            _ => Err(DetectionError::UnknownSeries { name: s.to_string() }),
        }
    }
}
