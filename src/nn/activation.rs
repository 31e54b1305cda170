//! Logistic activation, exact and tabulated.
//!
//! The tabulated form trades a small, bounded error for speed on the per-pixel
//! hot path. The table covers [`ALPHA_START`, -`ALPHA_START`] with
//! [`NUM_ALPHA`] entries, each holding the sigmoid at the centre of its cell.
//! Arguments outside the covered domain saturate to the first or last entry.

use serde::Deserialize;
use std::sync::LazyLock;

/// Lower edge of the tabulated domain.
pub const ALPHA_START: f64 = -10.0;

/// Number of entries in the activation table.
pub const NUM_ALPHA: usize = 100_000;

/// Largest deviation between [`sigmoid_tabulated`] and [`sigmoid`] over the
/// whole real line. Half a cell width times the maximum slope (0.25) is about
/// 2.5e-5 inside the domain; the saturated tails deviate by at most 4.6e-5.
pub const TABLE_EPSILON: f64 = 1e-4;

static ALPHA_TABLE: LazyLock<SigmoidTable> = LazyLock::new(SigmoidTable::new);

struct SigmoidTable {
    values: Box<[f64]>,
    rec_delta: f64,
}

impl SigmoidTable {
    fn new() -> Self {
        let delta = (-2.0 * ALPHA_START) / (NUM_ALPHA as f64 - 1.0);
        let values = (0..NUM_ALPHA)
            .map(|i| sigmoid(ALPHA_START + (i as f64 + 0.5) * delta))
            .collect::<Vec<f64>>()
            .into_boxed_slice();

        Self {
            values,
            rec_delta: 1.0 / delta,
        }
    }

    #[inline]
    fn lookup(&self, x: f64) -> f64 {
        let pos = (x - ALPHA_START) * self.rec_delta;
        // `max` turns NaN into 0.0, so the index always stays in bounds.
        let index = (pos.max(0.0) as usize).min(NUM_ALPHA - 1);
        self.values[index]
    }
}

/// How a network evaluates its neuron activation in `forward`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationMode {
    /// `1 / (1 + e^-x)` evaluated directly.
    Exact,
    /// Lookup in the shared precomputed table.
    #[default]
    Tabulated,
}

impl ActivationMode {
    #[inline]
    pub fn apply(self, x: f64) -> f64 {
        match self {
            ActivationMode::Exact => sigmoid(x),
            ActivationMode::Tabulated => sigmoid_tabulated(x),
        }
    }
}

#[inline]
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[inline]
pub fn sigmoid_tabulated(x: f64) -> f64 {
    ALPHA_TABLE.lookup(x)
}

/// Forces construction of the shared table so the first pixel does not pay for it.
pub fn warm_up_table() {
    LazyLock::force(&ALPHA_TABLE);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_matches_exact_within_epsilon() {
        let steps = 200_000;
        for i in 0..=steps {
            let x = -10.0 + 20.0 * i as f64 / steps as f64;
            let diff = (sigmoid_tabulated(x) - sigmoid(x)).abs();
            assert!(diff < TABLE_EPSILON, "x = {x}, diff = {diff}");
        }
    }

    #[test]
    fn test_table_saturates_outside_domain() {
        assert_eq!(sigmoid_tabulated(-10.5), sigmoid_tabulated(-1e6));
        assert_eq!(sigmoid_tabulated(10.5), sigmoid_tabulated(1e6));

        for x in [-1e6, -50.0, -10.5, 10.5, 50.0, 1e6] {
            let diff = (sigmoid_tabulated(x) - sigmoid(x)).abs();
            assert!(diff < TABLE_EPSILON, "x = {x}, diff = {diff}");
        }

        assert!(sigmoid(-50.0) < 1e-20);
        assert!(sigmoid(50.0) > 1.0 - 1e-20);
    }

    #[test]
    fn test_mode_dispatch() {
        assert_eq!(ActivationMode::Exact.apply(0.3), sigmoid(0.3));
        assert_eq!(ActivationMode::Tabulated.apply(0.3), sigmoid_tabulated(0.3));
        assert_eq!(ActivationMode::default(), ActivationMode::Tabulated);
    }
}
