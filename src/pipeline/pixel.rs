use chrono::NaiveDate;
use serde::Serialize;

use super::flags::QualityFlags;
use crate::config::ConversionFactors;
use crate::sensor::{IOP_COUNT, Sensor};

/// Raw per-pixel inputs. Ozone and pressure are already resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelInput {
    /// TOA radiances or reflectances, one per sensor band.
    pub toa: Vec<f64>,
    pub sun_zenith: f64,
    pub sun_azimuth: f64,
    pub view_zenith: f64,
    pub view_azimuth: f64,
    /// Surface altitude in metres.
    pub altitude: f64,
    /// Total ozone in DU.
    pub ozone: f64,
    /// Surface pressure in hPa.
    pub pressure: f64,
    /// Caller's valid-pixel predicate.
    pub valid: bool,
    /// Acquisition date. Scales the default solar flux of radiance sensors.
    pub date: Option<NaiveDate>,
}

/// Inherent optical properties in m⁻¹.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Iops {
    pub apig: f64,
    pub adet: f64,
    pub agelb: f64,
    pub bpart: f64,
    pub bwit: f64,
}

impl Iops {
    pub fn nan() -> Self {
        Self::from_array([f64::NAN; IOP_COUNT])
    }

    pub fn from_array([apig, adet, agelb, bpart, bwit]: [f64; IOP_COUNT]) -> Self {
        Self {
            apig,
            adet,
            agelb,
            bpart,
            bwit,
        }
    }

    /// Builds from the first five values of a net output.
    pub fn from_slice(values: &[f64]) -> Self {
        Self::from_array([values[0], values[1], values[2], values[3], values[4]])
    }

    pub fn to_array(self) -> [f64; IOP_COUNT] {
        [self.apig, self.adet, self.agelb, self.bpart, self.bwit]
    }

    /// Detritus plus gelbstoff absorption.
    pub fn adg(&self) -> f64 {
        self.adet + self.agelb
    }

    pub fn atot(&self) -> f64 {
        self.adg() + self.apig
    }

    pub fn btot(&self) -> f64 {
        self.bpart + self.bwit
    }

    /// Chlorophyll concentration in mg m⁻³.
    pub fn chl(&self, conversion: &ConversionFactors) -> f64 {
        self.apig.powf(conversion.chl_exp) * conversion.chl_fak
    }

    /// Total suspended matter in g m⁻³.
    pub fn tsm(&self, conversion: &ConversionFactors) -> f64 {
        self.bpart * conversion.tsm_fak_bpart + self.bwit * conversion.tsm_fak_bwit
    }
}

/// Absolute uncertainties of the retrieved quantities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Uncertainties {
    pub iops: Iops,
    pub adg: f64,
    pub atot: f64,
    pub btot: f64,
    pub kd489: f64,
    pub kdmin: f64,
    pub chl: f64,
    pub tsm: f64,
}

impl Uncertainties {
    pub fn nan() -> Self {
        Self {
            iops: Iops::nan(),
            adg: f64::NAN,
            atot: f64::NAN,
            btot: f64::NAN,
            kd489: f64::NAN,
            kdmin: f64::NAN,
            chl: f64::NAN,
            tsm: f64::NAN,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PixelResult {
    /// TOA reflectance, one per sensor band.
    pub r_toa: Vec<f64>,
    /// Gas-corrected TOSA reflectance, one per NN band.
    pub r_tosa: Vec<f64>,
    /// Autoassociative reconstruction of `r_tosa`.
    pub rtosa_aann: Vec<f64>,
    pub rpath: Vec<f64>,
    pub tdown: Vec<f64>,
    pub tup: Vec<f64>,
    /// Angular water-leaving reflectance, one per NN band.
    pub rwa: Vec<f64>,
    /// Nadir-normalised water-leaving reflectance, one per water band.
    pub rwn: Vec<f64>,
    pub rtosa_oos: f64,
    pub rwa_oos: f64,
    pub iops: Iops,
    pub adg: f64,
    pub atot: f64,
    pub btot: f64,
    pub chl: f64,
    pub tsm: f64,
    pub kd489: f64,
    pub kdmin: f64,
    pub uncertainties: Uncertainties,
    pub flags: QualityFlags,
}

impl PixelResult {
    /// NaN-filled result with every vector at its nominal length and no flag set.
    pub fn invalid(sensor: Sensor) -> Self {
        let nn = vec![f64::NAN; sensor.nn_band_count()];
        Self {
            r_toa: vec![f64::NAN; sensor.toa_band_count()],
            r_tosa: nn.clone(),
            rtosa_aann: nn.clone(),
            rpath: nn.clone(),
            tdown: nn.clone(),
            tup: nn.clone(),
            rwa: nn,
            rwn: vec![f64::NAN; sensor.water_band_count()],
            rtosa_oos: f64::NAN,
            rwa_oos: f64::NAN,
            iops: Iops::nan(),
            adg: f64::NAN,
            atot: f64::NAN,
            btot: f64::NAN,
            chl: f64::NAN,
            tsm: f64::NAN,
            kd489: f64::NAN,
            kdmin: f64::NAN,
            uncertainties: Uncertainties::nan(),
            flags: QualityFlags::empty(),
        }
    }
}
