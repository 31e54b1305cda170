//! Per-pixel inversion from TOA samples to water-leaving reflectance, IOPs,
//! Kd and their uncertainties.

use chrono::NaiveDate;
use std::f64::consts::PI;
use tracing::info;

use crate::config::{IopInput, PipelineConfig, RwDerivation, UncertaintyMode};
use crate::net_set::{NetRole, NetSet};
use crate::nn::{ActivationMode, NeuralNet, warm_up_table};
use crate::sensor::{IOP_COUNT, Sensor, ToaInput, WATER_PREFIX, solar_flux_correction};

pub mod error;
pub mod flags;
pub mod pixel;
pub mod uncertainty;

pub use error::PipelineError;
pub use flags::{Flag, QualityFlags};
pub use pixel::{Iops, PixelInput, PixelResult, Uncertainties};

/// Scale height used for the altitude pressure correction, in metres.
const PRESSURE_SCALE_HEIGHT: f64 = 8000.0;

/// Altitudes at or below this are treated as sea level, in metres.
const SEA_LEVEL_ALTITUDE: f64 = 10.0;

#[derive(Debug)]
struct RadianceConversion {
    scale: f64,
    solar_flux: Vec<f64>,
    /// Sensor default flux at mean Sun-Earth distance, corrected per date.
    per_date: bool,
}

impl RadianceConversion {
    fn to_reflectance(&self, radiance: &[f64], cos_sun: f64, date: Option<NaiveDate>) -> Vec<f64> {
        let factor = match date {
            Some(date) if self.per_date => solar_flux_correction(date),
            _ => 1.0,
        };
        radiance
            .iter()
            .zip(&self.solar_flux)
            .map(|(l, f0)| PI * l * self.scale / (f0 * factor) / cos_sun)
            .collect()
    }
}

/// Observation geometry derived once per pixel.
struct Geometry {
    sun_zenith: f64,
    view_zenith: f64,
    azi_diff_deg: f64,
    cos_sun: f64,
    cos_view: f64,
    x: f64,
    y: f64,
    z: f64,
}

impl Geometry {
    fn new(input: &PixelInput) -> Self {
        let cos_sun = input.sun_zenith.to_radians().cos();
        let cos_view = input.view_zenith.to_radians().cos();
        let sin_view = input.view_zenith.to_radians().sin();

        let mut azi_diff_deg = (180.0 + input.view_azimuth - input.sun_azimuth).abs();
        if azi_diff_deg > 180.0 {
            azi_diff_deg = 360.0 - azi_diff_deg;
        }
        let azi_diff_rad = azi_diff_deg.to_radians();

        Self {
            sun_zenith: input.sun_zenith,
            view_zenith: input.view_zenith,
            azi_diff_deg,
            cos_sun,
            cos_view,
            x: sin_view * azi_diff_rad.cos(),
            y: sin_view * azi_diff_rad.sin(),
            z: cos_view,
        }
    }
}

/// Runs the ten-net inversion for one sensor.
///
/// Immutable after construction; `process_pixel` takes `&self` and may be
/// called from many threads at once.
#[derive(Debug)]
pub struct InversionPipeline {
    config: PipelineConfig,
    nets: NetSet,
    radiance: Option<RadianceConversion>,
}

impl InversionPipeline {
    /// Checks the configuration and every net's shape against the sensor layout.
    pub fn new(config: PipelineConfig, nets: NetSet) -> Result<Self, PipelineError> {
        config.validate()?;
        let sensor = config.sensor();

        for (role, expected_in, expected_out) in expected_shapes(sensor) {
            let net = nets.get(role);
            if net.n_in() != expected_in || net.n_out() != expected_out {
                return Err(PipelineError::NetShape {
                    role,
                    sensor,
                    expected_in,
                    expected_out,
                    found_in: net.n_in(),
                    found_out: net.n_out(),
                });
            }
        }

        let radiance = match sensor.toa_input() {
            ToaInput::Radiance { scale } => {
                let solar_flux = config
                    .solar_flux()
                    .ok_or(PipelineError::MissingSolarFlux { sensor })?
                    .to_vec();
                Some(RadianceConversion {
                    scale,
                    solar_flux,
                    per_date: config.solar_flux_override().is_none(),
                })
            }
            ToaInput::Reflectance => None,
        };

        if config.activation() == ActivationMode::Tabulated {
            warm_up_table();
        }
        let nets = nets.with_activation(config.activation());

        info!(
            sensor = %sensor,
            rw_derivation = ?config.rw_derivation(),
            uncertainty = ?config.uncertainty(),
            "inversion pipeline ready"
        );

        Ok(Self {
            config,
            nets,
            radiance,
        })
    }

    /// Loads the configured net set and builds the pipeline.
    pub fn from_config(config: PipelineConfig) -> Result<Self, PipelineError> {
        let nets = NetSet::load(
            config.net_set(),
            config.sensor(),
            config.net_resource_root(),
        )?;
        Self::new(config, nets)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn sensor(&self) -> Sensor {
        self.config.sensor()
    }

    pub fn used_net_names(&self) -> &[String] {
        self.nets.used_net_names()
    }

    fn net(&self, role: NetRole) -> &NeuralNet {
        self.nets.get(role)
    }

    /// Inverts one pixel. Out-of-domain inputs yield flagged results, never errors.
    ///
    /// # Panics
    ///
    /// Panics if `input.toa` does not hold one value per sensor band.
    pub fn process_pixel(&self, input: &PixelInput) -> PixelResult {
        let sensor = self.config.sensor();
        assert_eq!(
            input.toa.len(),
            sensor.toa_band_count(),
            "one TOA sample per {} band expected",
            sensor
        );

        if !input.valid {
            return PixelResult::invalid(sensor);
        }

        let thresholds = self.config.thresholds();
        let temperature = self.config.temperature();
        let salinity = self.config.salinity();
        let geo = Geometry::new(input);
        let mut flags = QualityFlags::empty();

        // TOA reflectance, then gas-corrected TOSA reflectance on the NN bands.
        let r_toa = match &self.radiance {
            Some(conversion) => conversion.to_reflectance(&input.toa, geo.cos_sun, input.date),
            None => input.toa.clone(),
        };

        let mut r_tosa: Vec<f64> = sensor.nn_bands().iter().map(|&b| r_toa[b]).collect();
        if let Some(wv) = sensor.water_vapour_correction() {
            r_tosa[wv.target] /= wv.transmittance(&r_toa);
        }
        for (r, k) in r_tosa.iter_mut().zip(sensor.ozone_absorption()) {
            let tau = k * input.ozone / 1000.0;
            let trans_ozone = (-tau / geo.cos_sun).exp() * (-tau / geo.cos_view).exp();
            *r /= trans_ozone;
        }

        let alti_press = if input.altitude > SEA_LEVEL_ALTITUDE {
            input.pressure * (-input.altitude / PRESSURE_SCALE_HEIGHT).exp()
        } else {
            input.pressure
        };

        let nn_in: Vec<f64> = [
            geo.sun_zenith,
            geo.x,
            geo.y,
            geo.z,
            temperature,
            salinity,
            alti_press,
        ]
        .into_iter()
        .chain(r_tosa.iter().map(|r| r.ln()))
        .collect();

        // Atmosphere nets.
        let aann = self.net(NetRole::RtosaAann);
        flags.set(Flag::RtosaOor, aann.input_out_of_range(&nn_in));

        let rtosa_aann = exp_all(aann.forward(&nn_in));
        let rtosa_oos = self.config.rtosa_oos_norm().residual(&r_tosa, &rtosa_aann);
        flags.set(Flag::RtosaOos, !(rtosa_oos <= thresholds.rtosa_oos));

        let nb = sensor.nn_band_count();
        let rpath = exp_all(self.net(NetRole::RtosaRpath).forward(&nn_in));
        let trans = self.net(NetRole::RtosaTrans).forward(&nn_in);
        let tdown = trans[..nb].to_vec();
        let tup = trans[nb..2 * nb].to_vec();
        flags.set(
            Flag::CloudRisk,
            self.config
                .cloud_test()
                .is_cloud(tdown[sensor.cloud_band()], thresholds.cloud_trans_down),
        );

        let log_rw: Vec<f64> = match self.config.rw_derivation() {
            RwDerivation::Direct => self.net(NetRole::RtosaRw).forward(&nn_in),
            RwDerivation::PathAndTransmittance => r_tosa
                .iter()
                .zip(&rpath)
                .zip(tdown.iter().zip(&tup))
                .map(|((r, p), (td, tu))| ((r - p) / (tu * td)).ln())
                .collect(),
        };
        let rwa = exp_all(log_rw.clone());

        // Water nets.
        let wb = sensor.water_band_count();
        let water_prefix = [
            geo.sun_zenith,
            geo.view_zenith,
            geo.azi_diff_deg,
            temperature,
            salinity,
        ];
        let nn_in_inv = with_prefix(&water_prefix, &log_rw[..wb]);

        let log_rwn = self.net(NetRole::RwRwnorm).forward(&nn_in_inv);
        let iop_in = match self.config.iop_input() {
            IopInput::Angular => nn_in_inv.clone(),
            IopInput::Normalized => with_prefix(&water_prefix, &log_rwn),
        };
        let rwn = exp_all(log_rwn);

        let rw_iop = self.net(NetRole::RwIop);
        flags.set(Flag::RhowOor, rw_iop.input_out_of_range(&iop_in));

        let log_iops = rw_iop.forward(&iop_in);
        let iops = Iops::from_slice(&exp_all(log_iops.clone()));
        let margin = thresholds.log_bound_margin;

        flags.set(Flag::IopOor, rw_iop.output_out_of_range(&log_iops));
        for i in 0..IOP_COUNT {
            flags.set(Flag::IOP_AT_MAX[i], log_iops[i] > rw_iop.out_max()[i] - margin);
            flags.set(Flag::IOP_AT_MIN[i], log_iops[i] < rw_iop.out_min()[i] + margin);
        }

        // Forward net reconstruction of rw from the retrieved IOPs.
        let log_rw_fwd = self
            .net(NetRole::IopRw)
            .forward(&with_prefix(&water_prefix, &log_iops));
        let [a, b, c] = sensor.slope_bands();
        let s1 = ((log_rw[b] - log_rw[a]).abs() - (log_rw_fwd[b] - log_rw_fwd[a]).abs()).abs();
        let s2 = ((log_rw[c] - log_rw[b]).abs() - (log_rw_fwd[c] - log_rw_fwd[b]).abs()).abs();
        let rwa_oos = nan_max(s1, s2);
        flags.set(Flag::RhowOos, !(rwa_oos <= thresholds.rw_log_slope));

        // Kd, output 0 is ln kdmin and output 1 is ln kd489.
        let rw_kd = self.net(NetRole::RwKd);
        let log_kd = rw_kd.forward(&nn_in_inv);
        let kdmin = log_kd[0].exp();
        let kd489 = log_kd[1].exp();
        let (kd_min, kd_max) = (rw_kd.out_min(), rw_kd.out_max());
        flags.set(Flag::KdminOor, !(log_kd[0] >= kd_min[0] && log_kd[0] <= kd_max[0]));
        flags.set(Flag::Kd489Oor, !(log_kd[1] >= kd_min[1] && log_kd[1] <= kd_max[1]));
        flags.set(Flag::KdminAtMax, log_kd[0] > kd_max[0] - margin);
        flags.set(Flag::Kd489AtMax, log_kd[1] > kd_max[1] - margin);

        // Uncertainties.
        let d_iop = self.net(NetRole::IopUnciop).forward(&log_iops);
        let d_sum = self.net(NetRole::IopUncsumiopUnckd).forward(&log_iops);
        let mut unc = uncertainty::from_nets(&iops, kd489, kdmin, &d_iop, &d_sum);

        if let UncertaintyMode::NetAndSensitivity { rw_log_uncertainty } = self.config.uncertainty() {
            let dx: Vec<f64> = (0..iop_in.len())
                .map(|i| if i < WATER_PREFIX { 0.0 } else { rw_log_uncertainty })
                .collect();
            let dlog_iop = rw_iop.directional_derivative(&iop_in, &dx);
            let dlog_kd = rw_kd.directional_derivative(&nn_in_inv, &dx);
            let sensitivity =
                uncertainty::from_sensitivity(&iops, kd489, kdmin, &dlog_iop, &dlog_kd);
            unc = uncertainty::combine(&unc, &sensitivity);
        }

        let conversion = self.config.conversion();
        let uncertainties = uncertainty::with_concentrations(unc, conversion);

        flags.set(Flag::ValidPe, true);

        PixelResult {
            r_toa,
            r_tosa,
            rtosa_aann,
            rpath,
            tdown,
            tup,
            rwa,
            rwn,
            rtosa_oos,
            rwa_oos,
            adg: iops.adg(),
            atot: iops.atot(),
            btot: iops.btot(),
            chl: iops.chl(conversion),
            tsm: iops.tsm(conversion),
            iops,
            kd489,
            kdmin,
            uncertainties,
            flags,
        }
    }
}

/// `(role, n_in, n_out)` every net must have for `sensor`.
fn expected_shapes(sensor: Sensor) -> [(NetRole, usize, usize); 10] {
    let atmo = sensor.atmo_net_inputs();
    let water = sensor.water_net_inputs();
    let nb = sensor.nn_band_count();
    let wb = sensor.water_band_count();
    [
        (NetRole::RtosaAann, atmo, nb),
        (NetRole::RtosaRpath, atmo, nb),
        (NetRole::RtosaRw, atmo, nb),
        (NetRole::RtosaTrans, atmo, 2 * nb),
        (NetRole::IopRw, WATER_PREFIX + IOP_COUNT, wb),
        (NetRole::IopUnciop, IOP_COUNT, IOP_COUNT),
        (NetRole::IopUncsumiopUnckd, IOP_COUNT, 5),
        (NetRole::RwIop, water, IOP_COUNT),
        (NetRole::RwKd, water, 2),
        (NetRole::RwRwnorm, water, wb),
    ]
}

fn exp_all(mut values: Vec<f64>) -> Vec<f64> {
    values.iter_mut().for_each(|v| *v = v.exp());
    values
}

fn with_prefix(prefix: &[f64], values: &[f64]) -> Vec<f64> {
    prefix.iter().chain(values).copied().collect()
}

/// Maximum that propagates NaN.
fn nan_max(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else {
        a.max(b)
    }
}
