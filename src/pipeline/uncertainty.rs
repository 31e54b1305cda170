//! Absolute uncertainties from the uncertainty nets and from first-order
//! sensitivity of the retrieval nets.
//!
//! The uncertainty nets report a log-space deviation `d` per quantity, turned
//! into an absolute value by `x · (1 − e^−d)`. The sensitivity term pushes a
//! log-space perturbation of every `ln rw` input through the Jacobian of the
//! retrieval net; `J·dx` is the resulting log-space change of each output.
//! Both contributions are treated as independent and combined by
//! root-sum-of-squares.

use super::pixel::{Iops, Uncertainties};
use crate::config::ConversionFactors;

/// Output order of the summed-uncertainty net.
const SUM_ADG: usize = 0;
const SUM_ATOT: usize = 1;
const SUM_BTOT: usize = 2;
const SUM_KD489: usize = 3;
const SUM_KDMIN: usize = 4;

/// Absolute uncertainty of `value` from a log-space deviation `d`.
#[inline]
pub fn from_log_deviation(value: f64, d: f64) -> f64 {
    value * (1.0 - (-d).exp())
}

/// Root-sum-of-squares of two independent contributions.
#[inline]
pub fn root_sum_square(a: f64, b: f64) -> f64 {
    a.hypot(b)
}

/// Uncertainties reported by `IopUnciop` (`d_iop`) and `IopUncsumiopUnckd` (`d_sum`).
pub fn from_nets(iops: &Iops, kd489: f64, kdmin: f64, d_iop: &[f64], d_sum: &[f64]) -> Uncertainties {
    let values = iops.to_array();
    let mut unc = [0.0; 5];
    for ((u, v), d) in unc.iter_mut().zip(values).zip(d_iop) {
        *u = from_log_deviation(v, *d);
    }

    Uncertainties {
        iops: Iops::from_array(unc),
        adg: from_log_deviation(iops.adg(), d_sum[SUM_ADG]),
        atot: from_log_deviation(iops.atot(), d_sum[SUM_ATOT]),
        btot: from_log_deviation(iops.btot(), d_sum[SUM_BTOT]),
        kd489: from_log_deviation(kd489, d_sum[SUM_KD489]),
        kdmin: from_log_deviation(kdmin, d_sum[SUM_KDMIN]),
        chl: f64::NAN,
        tsm: f64::NAN,
    }
}

/// Uncertainties implied by log-space output perturbations of `RwIop`
/// (`dlog_iop`) and `RwKd` (`dlog_kd`, ordered `kdmin, kd489`).
///
/// A sum `x + y` moves by `x·dlog_x + y·dlog_y`, so the perturbations of
/// summed quantities are added before taking the magnitude.
pub fn from_sensitivity(
    iops: &Iops,
    kd489: f64,
    kdmin: f64,
    dlog_iop: &[f64],
    dlog_kd: &[f64],
) -> Uncertainties {
    let [apig, adet, agelb, bpart, bwit] = iops.to_array();
    let d_apig = apig * dlog_iop[0];
    let d_adet = adet * dlog_iop[1];
    let d_agelb = agelb * dlog_iop[2];
    let d_bpart = bpart * dlog_iop[3];
    let d_bwit = bwit * dlog_iop[4];

    Uncertainties {
        iops: Iops::from_array([
            d_apig.abs(),
            d_adet.abs(),
            d_agelb.abs(),
            d_bpart.abs(),
            d_bwit.abs(),
        ]),
        adg: (d_adet + d_agelb).abs(),
        atot: (d_apig + d_adet + d_agelb).abs(),
        btot: (d_bpart + d_bwit).abs(),
        kd489: (kd489 * dlog_kd[1]).abs(),
        kdmin: (kdmin * dlog_kd[0]).abs(),
        chl: f64::NAN,
        tsm: f64::NAN,
    }
}

/// Field-wise root-sum-of-squares.
pub fn combine(net: &Uncertainties, sensitivity: &Uncertainties) -> Uncertainties {
    let iops: Vec<f64> = net
        .iops
        .to_array()
        .into_iter()
        .zip(sensitivity.iops.to_array())
        .map(|(a, b)| root_sum_square(a, b))
        .collect();

    Uncertainties {
        iops: Iops::from_slice(&iops),
        adg: root_sum_square(net.adg, sensitivity.adg),
        atot: root_sum_square(net.atot, sensitivity.atot),
        btot: root_sum_square(net.btot, sensitivity.btot),
        kd489: root_sum_square(net.kd489, sensitivity.kd489),
        kdmin: root_sum_square(net.kdmin, sensitivity.kdmin),
        chl: f64::NAN,
        tsm: f64::NAN,
    }
}

/// Fills in the concentration uncertainties from the IOP uncertainties.
pub fn with_concentrations(mut unc: Uncertainties, conversion: &ConversionFactors) -> Uncertainties {
    unc.chl = conversion.chl_fak * unc.iops.apig.powf(conversion.chl_exp);
    unc.tsm = conversion.tsm_fak_bpart * unc.iops.bpart + conversion.tsm_fak_bwit * unc.iops.bwit;
    unc
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iops() -> Iops {
        Iops::from_array([0.1, 0.2, 0.3, 1.0, 2.0])
    }

    #[test]
    fn test_from_log_deviation() {
        assert_eq!(from_log_deviation(2.0, 0.0), 0.0);
        let unc = from_log_deviation(2.0, 0.1);
        assert!((unc - 2.0 * (1.0 - (-0.1f64).exp())).abs() < 1e-15);
        assert!(unc < 2.0 * 0.1);
    }

    #[test]
    fn test_from_nets_uses_own_deviation_for_kdmin() {
        let d_sum = [0.1, 0.2, 0.3, 0.4, 0.5];
        let unc = from_nets(&iops(), 0.08, 0.05, &[0.1; 5], &d_sum);

        assert!((unc.kd489 - from_log_deviation(0.08, 0.4)).abs() < 1e-15);
        assert!((unc.kdmin - from_log_deviation(0.05, 0.5)).abs() < 1e-15);
        assert!((unc.adg - from_log_deviation(0.5, 0.1)).abs() < 1e-15);
        assert!((unc.iops.bwit - from_log_deviation(2.0, 0.1)).abs() < 1e-15);
    }

    #[test]
    fn test_sensitivity_of_sums_is_linear() {
        let dlog = [0.1, 0.1, -0.1, 0.2, 0.0];
        let unc = from_sensitivity(&iops(), 0.08, 0.05, &dlog, &[0.3, -0.2]);

        // adet and agelb move in opposite directions
        assert!((unc.adg - 0.01).abs() < 1e-15);
        assert!(unc.atot.abs() < 1e-15);
        assert!((unc.btot - 0.2).abs() < 1e-15);
        assert!((unc.kdmin - 0.015).abs() < 1e-15);
        assert!((unc.kd489 - 0.016).abs() < 1e-15);
    }

    #[test]
    fn test_combine_is_root_sum_square() {
        let a = from_nets(&iops(), 0.08, 0.05, &[0.1; 5], &[0.1; 5]);
        let b = from_sensitivity(&iops(), 0.08, 0.05, &[0.05; 5], &[0.05, 0.05]);
        let c = combine(&a, &b);

        assert!((c.iops.apig - (a.iops.apig.powi(2) + b.iops.apig.powi(2)).sqrt()).abs() < 1e-15);
        assert!(c.btot >= a.btot && c.btot >= b.btot);
        assert!(c.kdmin >= a.kdmin);
    }

    #[test]
    fn test_concentration_uncertainties() {
        let unc = with_concentrations(
            from_nets(&iops(), 0.08, 0.05, &[0.1; 5], &[0.1; 5]),
            &ConversionFactors::default(),
        );
        let expected_chl = 21.0 * unc.iops.apig.powf(1.04);
        let expected_tsm = 1.72 * unc.iops.bpart + 3.1 * unc.iops.bwit;
        assert!((unc.chl - expected_chl).abs() < 1e-15);
        assert!((unc.tsm - expected_tsm).abs() < 1e-15);
    }
}
