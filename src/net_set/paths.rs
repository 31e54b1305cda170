//! Relative resource paths of the named net sets, one per role in
//! [`NetRole::ALL`] order.

use super::NetRole;

const MERIS_STANDARD_PREFIX: &str = "meris/coastcolour_midtsm_20161012";

const MERIS_STANDARD: [&str; 10] = [
    "atmo_midtsm/rtosa_aann/31x7x31_786.7.net",
    "atmo_midtsm/rtosa_rpath/31x37_2058.3.net",
    "atmo_midtsm/rtosa_rw/37x77x57x37_727927.1.net",
    "atmo_midtsm/rtosa_trans/31x37_39553.7.net",
    "water_midtsm/iop_rw/17x97x47_490.7.net",
    "water_midtsm/iop_unciop/17x77x37_11486.7.net",
    "water_midtsm/iop_uncsumiop_unckd/17x77x37_9113.1.net",
    "water_midtsm/rw_iop/97x77x37_22393.1.net",
    "water_midtsm/rw_kd/97x77x7_376.3.net",
    "water_midtsm/rw_rwnorm/37x57x17_76.8.net",
];

const MERIS_EXTREME_PREFIX: &str = "meris/c2x/nn4snap_meris_hitsm_20151128";

const MERIS_EXTREME: [&str; 10] = [
    "rtosa_aann/31x7x31_1244.3.net",
    "rtosa_rpath/31x77x57x37_4701.4.net",
    "rtosa_rw/17x27x27x17_677356.6.net",
    "rtosa_trans/31x77x57x37_45461.2.net",
    "iop_rw/17x37x97x47_500.0.net",
    "iop_unciop/17x77x37_11486.7.net",
    "iop_uncsumiop_unckd/17x77x37_9113.1.net",
    "rw_iop/27x97x77x37_14746.2.net",
    "rw_kd/97x77x7_232.4.net",
    "rw_rwnorm/37x57x17_76.8.net",
];

pub(super) fn meris_standard() -> Vec<(NetRole, String)> {
    with_prefix(MERIS_STANDARD_PREFIX, &MERIS_STANDARD)
}

pub(super) fn meris_extreme() -> Vec<(NetRole, String)> {
    with_prefix(MERIS_EXTREME_PREFIX, &MERIS_EXTREME)
}

fn with_prefix(prefix: &str, paths: &[&str; 10]) -> Vec<(NetRole, String)> {
    NetRole::ALL
        .into_iter()
        .zip(paths)
        .map(|(role, path)| (role, format!("{}/{}", prefix, path)))
        .collect()
}
