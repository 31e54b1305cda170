use serde::Deserialize;
use serde::Deserializer;
use serde::de::Error;

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::ancillary::{DEFAULT_OZONE, DEFAULT_PRESSURE};
use crate::net_set::NetSetId;
use crate::nn::ActivationMode;
use crate::sensor::Sensor;

pub mod error;
pub use error::ConfigError;

pub mod variants;
pub use variants::{CloudTest, IopInput, RtosaOosNorm, RwDerivation, UncertaintyMode};

const SALINITY_RANGE: (f64, f64) = (0.000028, 43.0);
const TEMPERATURE_RANGE: (f64, f64) = (0.000111, 36.0);
const OZONE_RANGE: (f64, f64) = (0.0, 1000.0);
const PRESSURE_RANGE: (f64, f64) = (800.0, 1040.0);

/// Flag thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Limit of the autoassociative reconstruction residual (`Rtosa_OOS`).
    pub rtosa_oos: f64,
    /// Limit of the forward/inverse log-slope mismatch (`Rhow_OOS`).
    pub rw_log_slope: f64,
    /// Downward transmittance limit of the cloud test.
    pub cloud_trans_down: f64,
    /// Log-space distance to a net output bound that counts as at the bound.
    pub log_bound_margin: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            rtosa_oos: 0.05,
            rw_log_slope: 0.1,
            cloud_trans_down: 0.955,
            log_bound_margin: 0.02,
        }
    }
}

/// IOP to concentration conversion.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConversionFactors {
    pub chl_exp: f64,
    pub chl_fak: f64,
    pub tsm_fak_bpart: f64,
    pub tsm_fak_bwit: f64,
}

impl Default for ConversionFactors {
    fn default() -> Self {
        Self {
            chl_exp: 1.04,
            chl_fak: 21.0,
            tsm_fak_bpart: 1.72,
            tsm_fak_bwit: 3.1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    sensor: Sensor,
    net_set: NetSetId,
    net_resource_root: PathBuf,
    activation: ActivationMode,
    salinity: f64,
    temperature: f64,
    ozone: Option<f64>,
    pressure: Option<f64>,
    thresholds: Thresholds,
    conversion: ConversionFactors,
    rw_derivation: RwDerivation,
    iop_input: IopInput,
    rtosa_oos_norm: RtosaOosNorm,
    cloud_test: CloudTest,
    uncertainty: UncertaintyMode,
    solar_flux: Option<Vec<f64>>,
}

// Deserializes through a helper so every value is range-checked before a
// PipelineConfig exists.
impl<'de> Deserialize<'de> for PipelineConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct ConfigHelper {
            sensor: Sensor,
            #[serde(default = "default_net_set")]
            net_set: NetSetId,
            #[serde(default = "default_resource_root")]
            net_resource_root: PathBuf,
            #[serde(default)]
            activation: ActivationMode,
            #[serde(default = "default_salinity")]
            salinity: f64,
            #[serde(default = "default_temperature")]
            temperature: f64,
            #[serde(default = "default_ozone")]
            ozone: Option<f64>,
            #[serde(default = "default_pressure")]
            pressure: Option<f64>,
            #[serde(default)]
            thresholds: Thresholds,
            #[serde(default)]
            conversion: ConversionFactors,
            #[serde(default)]
            rw_derivation: RwDerivation,
            #[serde(default)]
            iop_input: IopInput,
            #[serde(default)]
            rtosa_oos_norm: RtosaOosNorm,
            #[serde(default)]
            cloud_test: CloudTest,
            #[serde(default)]
            uncertainty: UncertaintyMode,
            solar_flux: Option<Vec<f64>>,
        }

        let helper = ConfigHelper::deserialize(deserializer)?;

        let config = PipelineConfig {
            sensor: helper.sensor,
            net_set: helper.net_set,
            net_resource_root: helper.net_resource_root,
            activation: helper.activation,
            salinity: helper.salinity,
            temperature: helper.temperature,
            ozone: helper.ozone,
            pressure: helper.pressure,
            thresholds: helper.thresholds,
            conversion: helper.conversion,
            rw_derivation: helper.rw_derivation,
            iop_input: helper.iop_input,
            rtosa_oos_norm: helper.rtosa_oos_norm,
            cloud_test: helper.cloud_test,
            uncertainty: helper.uncertainty,
            solar_flux: helper.solar_flux,
        };

        config.validate().map_err(D::Error::custom)?;
        Ok(config)
    }
}

fn default_net_set() -> NetSetId {
    NetSetId::Standard
}

fn default_resource_root() -> PathBuf {
    PathBuf::from("auxdata/nets")
}

fn default_salinity() -> f64 {
    35.0
}

fn default_temperature() -> f64 {
    15.0
}

fn default_ozone() -> Option<f64> {
    Some(DEFAULT_OZONE)
}

fn default_pressure() -> Option<f64> {
    Some(DEFAULT_PRESSURE)
}

fn check_open_interval(name: &'static str, value: f64, (min, max): (f64, f64)) -> Result<(), ConfigError> {
    if value > min && value < max {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            name,
            value,
            min,
            max,
        })
    }
}

fn check_positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { name, value })
    }
}

impl PipelineConfig {
    /// Defaults for `sensor` with the standard net set.
    pub fn new(sensor: Sensor) -> Self {
        Self {
            sensor,
            net_set: default_net_set(),
            net_resource_root: default_resource_root(),
            activation: ActivationMode::default(),
            salinity: default_salinity(),
            temperature: default_temperature(),
            ozone: default_ozone(),
            pressure: default_pressure(),
            thresholds: Thresholds::default(),
            conversion: ConversionFactors::default(),
            rw_derivation: RwDerivation::default(),
            iop_input: IopInput::default(),
            rtosa_oos_norm: RtosaOosNorm::default(),
            cloud_test: CloudTest::default(),
            uncertainty: UncertaintyMode::default(),
            solar_flux: None,
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<PipelineConfig, ConfigError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);

        let config: PipelineConfig = serde_json::from_reader(reader).map_err(ConfigError::from)?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_open_interval("salinity", self.salinity, SALINITY_RANGE)?;
        check_open_interval("temperature", self.temperature, TEMPERATURE_RANGE)?;
        if let Some(ozone) = self.ozone {
            check_open_interval("ozone", ozone, OZONE_RANGE)?;
        }
        if let Some(pressure) = self.pressure {
            check_open_interval("pressure", pressure, PRESSURE_RANGE)?;
        }

        let t = &self.thresholds;
        check_positive("thresholds.rtosa_oos", t.rtosa_oos)?;
        check_positive("thresholds.rw_log_slope", t.rw_log_slope)?;
        check_positive("thresholds.cloud_trans_down", t.cloud_trans_down)?;
        check_positive("thresholds.log_bound_margin", t.log_bound_margin)?;

        let c = &self.conversion;
        check_positive("conversion.chl_exp", c.chl_exp)?;
        check_positive("conversion.chl_fak", c.chl_fak)?;
        check_positive("conversion.tsm_fak_bpart", c.tsm_fak_bpart)?;
        check_positive("conversion.tsm_fak_bwit", c.tsm_fak_bwit)?;

        if let UncertaintyMode::NetAndSensitivity { rw_log_uncertainty } = self.uncertainty {
            check_positive("uncertainty.rw_log_uncertainty", rw_log_uncertainty)?;
        }

        if let RtosaOosNorm::SumAbsDiff { first, last } = self.rtosa_oos_norm {
            let bands = self.sensor.nn_band_count();
            if first > last || last >= bands {
                return Err(ConfigError::BandRange { first, last, bands });
            }
        }

        if let Some(flux) = &self.solar_flux {
            let expected = self.sensor.toa_band_count();
            if flux.len() != expected {
                return Err(ConfigError::SolarFluxLength {
                    expected,
                    found: flux.len(),
                });
            }
            for &value in flux {
                check_positive("solar_flux", value)?;
            }
        }

        Ok(())
    }

    pub fn with_net_set(mut self, net_set: NetSetId) -> Self {
        self.net_set = net_set;
        self
    }

    pub fn with_activation(mut self, activation: ActivationMode) -> Self {
        self.activation = activation;
        self
    }

    pub fn with_rw_derivation(mut self, rw_derivation: RwDerivation) -> Self {
        self.rw_derivation = rw_derivation;
        self
    }

    pub fn with_iop_input(mut self, iop_input: IopInput) -> Self {
        self.iop_input = iop_input;
        self
    }

    pub fn with_rtosa_oos_norm(mut self, norm: RtosaOosNorm) -> Self {
        self.rtosa_oos_norm = norm;
        self
    }

    pub fn with_cloud_test(mut self, cloud_test: CloudTest) -> Self {
        self.cloud_test = cloud_test;
        self
    }

    pub fn with_uncertainty(mut self, uncertainty: UncertaintyMode) -> Self {
        self.uncertainty = uncertainty;
        self
    }

    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_ancillary_fallback(mut self, ozone: Option<f64>, pressure: Option<f64>) -> Self {
        self.ozone = ozone;
        self.pressure = pressure;
        self
    }

    pub fn sensor(&self) -> Sensor {
        self.sensor
    }

    pub fn net_set(&self) -> &NetSetId {
        &self.net_set
    }

    pub fn net_resource_root(&self) -> &Path {
        &self.net_resource_root
    }

    pub fn activation(&self) -> ActivationMode {
        self.activation
    }

    pub fn salinity(&self) -> f64 {
        self.salinity
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Ozone fallback in DU.
    pub fn ozone(&self) -> Option<f64> {
        self.ozone
    }

    /// Surface-pressure fallback in hPa.
    pub fn pressure(&self) -> Option<f64> {
        self.pressure
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn conversion(&self) -> &ConversionFactors {
        &self.conversion
    }

    pub fn rw_derivation(&self) -> RwDerivation {
        self.rw_derivation
    }

    pub fn iop_input(&self) -> IopInput {
        self.iop_input
    }

    pub fn rtosa_oos_norm(&self) -> RtosaOosNorm {
        self.rtosa_oos_norm
    }

    pub fn cloud_test(&self) -> CloudTest {
        self.cloud_test
    }

    pub fn uncertainty(&self) -> UncertaintyMode {
        self.uncertainty
    }

    /// Configured solar flux, or the sensor default.
    pub fn solar_flux(&self) -> Option<&[f64]> {
        self.solar_flux_override()
            .or_else(|| self.sensor.default_solar_flux())
    }

    /// Solar flux given in the configuration. It is used as is, without the
    /// day-of-year correction applied to the sensor default.
    pub fn solar_flux_override(&self) -> Option<&[f64]> {
        self.solar_flux.as_deref()
    }
}
