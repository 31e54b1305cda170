use serde::Deserialize;

/// How water-leaving reflectance is obtained from TOSA reflectance.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RwDerivation {
    /// `RtosaRw` maps TOSA reflectance to `ln rw` directly.
    #[default]
    Direct,
    /// `rw = (rtosa - rpath) / (tdown · tup)` from the path and transmittance nets.
    PathAndTransmittance,
}

/// Which reflectance feeds the `RwIop` net.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IopInput {
    #[default]
    Angular,
    Normalized,
}

/// Residual between TOSA reflectance and its autoassociative reconstruction.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RtosaOosNorm {
    /// `Σ |ln r − ln r'|` over all NN bands.
    #[default]
    SumAbsLogDiff,
    /// `max |ln r − ln r'|` over all NN bands.
    MaxAbsLogDiff,
    /// `Σ |r − r'|` over NN bands `first..=last`.
    SumAbsDiff { first: usize, last: usize },
}

impl RtosaOosNorm {
    pub fn residual(self, rtosa: &[f64], reconstructed: &[f64]) -> f64 {
        let pairs = rtosa.iter().zip(reconstructed);
        match self {
            RtosaOosNorm::SumAbsLogDiff => pairs.map(|(r, a)| (r.ln() - a.ln()).abs()).sum(),
            RtosaOosNorm::MaxAbsLogDiff => pairs
                .map(|(r, a)| (r.ln() - a.ln()).abs())
                .fold(0.0, |acc, d| if d > acc || d.is_nan() { d } else { acc }),
            RtosaOosNorm::SumAbsDiff { first, last } => pairs
                .skip(first)
                .take(last + 1 - first)
                .map(|(r, a)| (r - a).abs())
                .sum(),
        }
    }
}

/// Direction of the downward-transmittance cloud test.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloudTest {
    /// Cloud risk when `tdown` exceeds the threshold.
    #[default]
    TransDownAbove,
    /// Cloud risk when `tdown` falls below the threshold.
    TransDownBelow,
}

impl CloudTest {
    pub fn is_cloud(self, trans_down: f64, threshold: f64) -> bool {
        match self {
            CloudTest::TransDownAbove => trans_down > threshold,
            CloudTest::TransDownBelow => trans_down < threshold,
        }
    }
}

/// Sources combined into the reported absolute uncertainties.
#[derive(Debug, Default, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UncertaintyMode {
    /// Uncertainty nets only.
    #[default]
    NetOnly,
    /// Uncertainty nets plus the first-order response of `RwIop` and `RwKd`
    /// to a log-space perturbation of every `ln rw` input, combined by
    /// root-sum-of-squares.
    NetAndSensitivity { rw_log_uncertainty: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oos_norms() {
        let e = std::f64::consts::E;
        let r = [1.0, e, 1.0];
        let a = [e, e, 1.0 / e];

        assert!((RtosaOosNorm::SumAbsLogDiff.residual(&r, &a) - 2.0).abs() < 1e-12);
        assert!((RtosaOosNorm::MaxAbsLogDiff.residual(&r, &a) - 1.0).abs() < 1e-12);

        let partial = RtosaOosNorm::SumAbsDiff { first: 1, last: 2 }.residual(&r, &a);
        assert!((partial - (1.0 - 1.0 / e)).abs() < 1e-12);
    }

    #[test]
    fn test_max_norm_keeps_nan() {
        let r = [1.0, f64::NAN];
        let a = [1.0, 1.0];
        assert!(RtosaOosNorm::MaxAbsLogDiff.residual(&r, &a).is_nan());
    }

    #[test]
    fn test_cloud_test_direction() {
        assert!(CloudTest::TransDownAbove.is_cloud(0.97, 0.955));
        assert!(!CloudTest::TransDownAbove.is_cloud(0.9, 0.955));
        assert!(CloudTest::TransDownBelow.is_cloud(0.9, 0.955));
    }

    #[test]
    fn test_tagged_variants_from_json() {
        let norm: RtosaOosNorm =
            serde_json::from_str(r#"{"sum_abs_diff": {"first": 8, "last": 11}}"#).unwrap();
        assert_eq!(norm, RtosaOosNorm::SumAbsDiff { first: 8, last: 11 });

        let mode: UncertaintyMode =
            serde_json::from_str(r#"{"net_and_sensitivity": {"rw_log_uncertainty": 0.05}}"#)
                .unwrap();
        assert_eq!(
            mode,
            UncertaintyMode::NetAndSensitivity {
                rw_log_uncertainty: 0.05
            }
        );

        let derivation: RwDerivation = serde_json::from_str("\"path_and_transmittance\"").unwrap();
        assert_eq!(derivation, RwDerivation::PathAndTransmittance);
    }
}
