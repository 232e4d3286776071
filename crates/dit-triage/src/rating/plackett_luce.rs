//! Plackett-Luce ranked update for single-member teams.
//!
//! For one round with teams ordered best first, let
//! `c = sqrt(Σ (σᵢ² + β²))` and `S_q = Σ_{i ≥ q} exp(μᵢ / c)`. For team `i`
//! and every `q ≤ i`, with `p = exp(μᵢ / c) / S_q`:
//!
//! ```text
//! Ω_i += [i == q] - p
//! Δ_i += p (1 - p)
//! ```
//!
//! then `μᵢ' = μᵢ + (σᵢ² / c) Ω_i` and
//! `σᵢ' = σᵢ · sqrt(max(1 - (σᵢ / c) Δ_i σᵢ² / c², κ))`.

use dit_core::config::RatingConfig;
use serde::{Deserialize, Serialize};

/// Gaussian belief about one issue's latent priority.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub mu: f64,
    pub sigma: f64,
}

impl Rating {
    /// The prior every issue starts from.
    #[must_use]
    pub const fn initial(config: &RatingConfig) -> Self {
        Self {
            mu: config.mu,
            sigma: config.sigma,
        }
    }

    /// Conservative point estimate `μ - zσ`.
    #[must_use]
    pub fn ordinal(&self, config: &RatingConfig) -> f64 {
        config.z.mul_add(-self.sigma, self.mu)
    }
}

/// Update `ranked` (best first) after one round. Fewer than two entries carry
/// no comparison and come back unchanged.
#[must_use]
pub fn rate(ranked: &[Rating], config: &RatingConfig) -> Vec<Rating> {
    if ranked.len() < 2 {
        return ranked.to_vec();
    }

    let beta_sq = config.beta * config.beta;
    let c = ranked
        .iter()
        .map(|r| r.sigma.mul_add(r.sigma, beta_sq))
        .sum::<f64>()
        .sqrt();

    let strengths: Vec<f64> = ranked.iter().map(|r| (r.mu / c).exp()).collect();

    // Suffix sums: everyone ranked at q or worse.
    let mut tail_sums = vec![0.0; ranked.len()];
    let mut running = 0.0;
    for (q, strength) in strengths.iter().enumerate().rev() {
        running += strength;
        tail_sums[q] = running;
    }

    ranked
        .iter()
        .enumerate()
        .map(|(i, rating)| {
            let mut omega = 0.0;
            let mut delta = 0.0;
            for (q, tail) in tail_sums.iter().enumerate().take(i + 1) {
                let p = strengths[i] / tail;
                omega += if q == i { 1.0 - p } else { -p };
                delta += p * (1.0 - p);
            }

            let sigma_sq = rating.sigma * rating.sigma;
            let gamma = rating.sigma / c;
            let shrink = (1.0 - gamma * delta * sigma_sq / (c * c)).max(config.kappa);

            Rating {
                mu: (sigma_sq / c).mul_add(omega, rating.mu),
                sigma: rating.sigma * shrink.sqrt(),
            }
        })
        .collect()
}
