//! Composite 0–100 health score.
//!
//! Every signal is turned into a factor `h = exp(-signal / scale)`, so a
//! zero signal is perfectly healthy and larger signals decay toward 0. The
//! score is the weighted geometric mean of the factors, scaled to 100.
//!
//! Two weight sets exist. [`HealthWeights::canonical`] feeds persisted
//! snapshots; [`HealthWeights::simulation`] drives what-if deltas. They are
//! not interchangeable: comparing a canonical score with a simulation score
//! is meaningless, comparing two scores from the same set is not.

use serde::Serialize;

/// Smallest factor fed to `ln`.
const MIN_FACTOR: f64 = 1e-9;

/// Weight and decay scale for one signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Term {
    /// Exponent in the geometric mean
    pub weight: f64,
    /// Signal value at which the factor drops to `1/e`
    pub scale: f64,
    /// Multiplier applied to the raw count before decay
    pub multiplier: f64,
}

impl Term {
    const fn new(weight: f64, scale: f64, multiplier: f64) -> Self {
        Self {
            weight,
            scale,
            multiplier,
        }
    }

    fn factor(&self, raw: f64) -> f64 {
        (-(raw * self.multiplier) / self.scale).exp()
    }
}

/// One weight set for [`health_score`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HealthWeights {
    /// Tangle, as a percentage of symbols in cycles
    pub tangle: Term,
    /// God-component count
    pub god_components: Term,
    /// Bottleneck count
    pub bottlenecks: Term,
    /// Layer violation count
    pub layer_violations: Term,
    /// Weight of the average per-file health term, if used
    pub file_health: Option<f64>,
}

impl HealthWeights {
    /// Weights for the persisted, snapshot-comparable score.
    #[must_use]
    pub const fn canonical() -> Self {
        Self {
            tangle: Term::new(0.30, 10.0, 1.0),
            god_components: Term::new(0.20, 5.0, 0.5),
            bottlenecks: Term::new(0.15, 4.0, 0.3),
            layer_violations: Term::new(0.15, 5.0, 1.0),
            file_health: Some(0.20),
        }
    }

    /// Weights for fast what-if simulation.
    #[must_use]
    pub const fn simulation() -> Self {
        Self {
            tangle: Term::new(0.30, 10.0, 1.0),
            god_components: Term::new(0.25, 5.0, 3.0),
            bottlenecks: Term::new(0.20, 4.0, 2.0),
            layer_violations: Term::new(0.25, 5.0, 1.0),
            file_health: None,
        }
    }
}

/// Raw inputs to the score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct HealthSignals {
    /// Fraction of symbols in non-trivial SCCs, `0..=1`
    pub tangle_ratio: f64,
    /// Degree outliers
    pub god_components: usize,
    /// Betweenness outliers
    pub bottlenecks: usize,
    /// Upward layer edges
    pub layer_violations: usize,
    /// Mean per-file health on a 0–10 scale, when known
    pub avg_file_health: Option<f64>,
}

/// Weighted geometric mean of the health factors, in `0..=100`.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn health_score(signals: &HealthSignals, weights: &HealthWeights) -> u32 {
    let tangle_pct = super::round_to(signals.tangle_ratio * 100.0, 2);
    let mut terms = vec![
        (weights.tangle.weight, weights.tangle.factor(tangle_pct)),
        (
            weights.god_components.weight,
            weights.god_components.factor(signals.god_components as f64),
        ),
        (
            weights.bottlenecks.weight,
            weights.bottlenecks.factor(signals.bottlenecks as f64),
        ),
        (
            weights.layer_violations.weight,
            weights.layer_violations.factor(signals.layer_violations as f64),
        ),
    ];
    if let Some(weight) = weights.file_health {
        let factor = signals
            .avg_file_health
            .map_or(1.0, |avg| (avg / 10.0).clamp(0.0, 1.0));
        terms.push((weight, factor));
    }

    let log_sum: f64 = terms
        .iter()
        .map(|&(w, h)| w * h.max(MIN_FACTOR).ln())
        .sum();
    (100.0 * log_sum.exp()).round().clamp(0.0, 100.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case::canonical(HealthWeights::canonical())]
    #[case::simulation(HealthWeights::simulation())]
    fn clean_graph_scores_100(#[case] weights: HealthWeights) {
        assert_eq!(health_score(&HealthSignals::default(), &weights), 100);
    }

    #[test]
    fn tangle_enters_as_percentage() {
        let signals = HealthSignals {
            tangle_ratio: 0.1,
            ..HealthSignals::default()
        };

        // exp(0.30 * -(10 / 10)) = 0.7408
        assert_eq!(health_score(&signals, &HealthWeights::simulation()), 74);
    }

    #[test]
    fn low_file_health_drags_canonical_score() {
        let signals = HealthSignals {
            avg_file_health: Some(5.0),
            ..HealthSignals::default()
        };

        // 0.5^0.20 = 0.8706
        assert_eq!(health_score(&signals, &HealthWeights::canonical()), 87);
        assert_eq!(health_score(&signals, &HealthWeights::simulation()), 100);
    }

    #[test]
    fn zero_file_health_is_floored_not_fatal() {
        let signals = HealthSignals {
            avg_file_health: Some(0.0),
            ..HealthSignals::default()
        };

        assert_eq!(health_score(&signals, &HealthWeights::canonical()), 2);
    }

    proptest! {
        #[test]
        fn score_is_bounded_and_monotone_in_violations(
            tangle in 0.0f64..=1.0,
            gods in 0usize..200,
            bns in 0usize..200,
            lv in 0usize..200,
        ) {
            let weights = HealthWeights::simulation();
            let signals = HealthSignals {
                tangle_ratio: tangle,
                god_components: gods,
                bottlenecks: bns,
                layer_violations: lv,
                avg_file_health: None,
            };
            let worse = HealthSignals { layer_violations: lv + 1, ..signals };

            let score = health_score(&signals, &weights);

            prop_assert!(score <= 100);
            prop_assert!(health_score(&worse, &weights) <= score);
        }
    }
}
