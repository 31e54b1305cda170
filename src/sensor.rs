use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use std::f64::consts::PI;
use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sensor {
    Meris,
    Seawifs,
    Viirs,
}

/// How a sensor delivers its top-of-atmosphere samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ToaInput {
    /// Radiances, multiplied by `scale` before conversion to reflectance.
    Radiance { scale: f64 },
    /// Reflectances, used as they are.
    Reflectance,
}

/// MERIS band-709 water-vapour correction.
///
/// `trans = c0 + c1·X + c2·X² + c3·X³` with `X = r_toa[numerator] / r_toa[denominator]`,
/// and NN band `target` is divided by `trans`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaterVapourCorrection {
    pub numerator: usize,
    pub denominator: usize,
    pub target: usize,
    pub coefficients: [f64; 4],
}

impl WaterVapourCorrection {
    pub fn transmittance(&self, r_toa: &[f64]) -> f64 {
        let x = r_toa[self.numerator] / r_toa[self.denominator];
        let [c0, c1, c2, c3] = self.coefficients;
        c0 + (c1 + (c2 + c3 * x) * x) * x
    }
}

const MERIS_WAVELENGTHS: [f64; 15] = [
    412.691, 442.559, 489.882, 509.819, 559.694, 619.601, 664.573, 680.821, 708.329, 753.371,
    761.508, 778.409, 864.876, 884.944, 900.0,
];
const MERIS_NN_BANDS: [usize; 12] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 11, 12];
const MERIS_OZONE: [f64; 12] = [
    8.2e-04, 2.82e-03, 2.076e-02, 3.96e-02, 1.022e-01, 1.059e-01, 5.313e-02, 3.552e-02, 1.895e-02,
    8.38e-03, 7.2e-04, 0.0,
];
const MERIS_SOLAR_FLUX: [f64; 15] = [
    1724.724, 1889.8026, 1939.5339, 1940.1365, 1813.5457, 1660.3589, 1540.5198, 1480.7161,
    1416.1177, 1273.394, 1261.8658, 1184.0952, 963.94995, 935.23706, 900.659,
];

const SEAWIFS_WAVELENGTHS: [f64; 8] = [412.0, 443.0, 490.0, 510.0, 555.0, 670.0, 765.0, 865.0];
const SEAWIFS_NN_BANDS: [usize; 8] = [0, 1, 2, 3, 4, 5, 6, 7];
const SEAWIFS_OZONE: [f64; 8] = [0.0, 0.0027, 0.0205, 0.0382, 0.0898, 0.0463, 0.0083, 0.0];
const SEAWIFS_SOLAR_FLUX: [f64; 8] = [
    1735.518167, 1858.404314, 1981.076667, 1881.566829, 1874.005, 1537.254783, 1230.04,
    957.6122143,
];

const VIIRS_WAVELENGTHS: [f64; 7] = [410.0, 443.0, 486.0, 551.0, 671.0, 745.0, 862.0];
const VIIRS_NN_BANDS: [usize; 7] = [0, 1, 2, 3, 4, 5, 6];
const VIIRS_OZONE: [f64; 7] = [0.0, 0.0027, 0.0205, 0.0898, 0.0463, 0.0095, 0.0];

/// Leading geometry and ancillary slots of the atmosphere-net input vector.
pub const ATMO_PREFIX: usize = 7;

/// Leading geometry slots of the water-net input vectors.
pub const WATER_PREFIX: usize = 5;

/// Number of retrieved IOPs (`apig, adet, agelb, bpart, bwit`).
pub const IOP_COUNT: usize = 5;

impl Sensor {
    pub fn toa_input(self) -> ToaInput {
        match self {
            Sensor::Meris => ToaInput::Radiance { scale: 1.0 },
            Sensor::Seawifs => ToaInput::Radiance { scale: 10.0 },
            Sensor::Viirs => ToaInput::Reflectance,
        }
    }

    /// Centre wavelength of every TOA band, in nm.
    pub fn wavelengths(self) -> &'static [f64] {
        match self {
            Sensor::Meris => &MERIS_WAVELENGTHS,
            Sensor::Seawifs => &SEAWIFS_WAVELENGTHS,
            Sensor::Viirs => &VIIRS_WAVELENGTHS,
        }
    }

    pub fn toa_band_count(self) -> usize {
        self.wavelengths().len()
    }

    /// TOA band indices fed to the atmosphere nets, in net order.
    pub fn nn_bands(self) -> &'static [usize] {
        match self {
            Sensor::Meris => &MERIS_NN_BANDS,
            Sensor::Seawifs => &SEAWIFS_NN_BANDS,
            Sensor::Viirs => &VIIRS_NN_BANDS,
        }
    }

    pub fn nn_band_count(self) -> usize {
        self.nn_bands().len()
    }

    /// Leading NN bands that carry a water signal and feed the water nets.
    pub fn water_band_count(self) -> usize {
        match self {
            Sensor::Meris => 10,
            Sensor::Seawifs => 7,
            Sensor::Viirs => 6,
        }
    }

    /// NN band whose downward transmittance drives the cloud test.
    pub fn cloud_band(self) -> usize {
        match self {
            Sensor::Meris => 11,
            Sensor::Seawifs => 7,
            Sensor::Viirs => 6,
        }
    }

    /// Three water bands spanning the two log-slopes of the rw out-of-scope test.
    pub fn slope_bands(self) -> [usize; 3] {
        match self {
            Sensor::Meris | Sensor::Seawifs => [1, 4, 5],
            Sensor::Viirs => [1, 3, 4],
        }
    }

    /// Ozone absorption per NN band, in (DU/1000)⁻¹.
    pub fn ozone_absorption(self) -> &'static [f64] {
        match self {
            Sensor::Meris => &MERIS_OZONE,
            Sensor::Seawifs => &SEAWIFS_OZONE,
            Sensor::Viirs => &VIIRS_OZONE,
        }
    }

    /// Default extraterrestrial solar flux per TOA band, radiance sensors only.
    ///
    /// Tabulated at mean Sun-Earth distance; scale by [`solar_flux_correction`]
    /// for the acquisition day.
    pub fn default_solar_flux(self) -> Option<&'static [f64]> {
        match self {
            Sensor::Meris => Some(&MERIS_SOLAR_FLUX),
            Sensor::Seawifs => Some(&SEAWIFS_SOLAR_FLUX),
            Sensor::Viirs => None,
        }
    }

    pub fn water_vapour_correction(self) -> Option<WaterVapourCorrection> {
        match self {
            Sensor::Meris => Some(WaterVapourCorrection {
                numerator: 14,
                denominator: 13,
                target: 8,
                coefficients: [0.3832989, 1.6527957, -1.5635101, 0.5311913],
            }),
            Sensor::Seawifs | Sensor::Viirs => None,
        }
    }

    /// Input length of the atmosphere nets (`RtosaAann`, `RtosaRw`, `RtosaRpath`, `RtosaTrans`).
    pub fn atmo_net_inputs(self) -> usize {
        ATMO_PREFIX + self.nn_band_count()
    }

    /// Input length of the nets driven by water-leaving reflectance.
    pub fn water_net_inputs(self) -> usize {
        WATER_PREFIX + self.water_band_count()
    }
}

/// Sun-Earth distance factor for the extraterrestrial solar flux on `date`.
///
/// Fourier fit over the day angle `2π·(doy - 1) / days_in_year`, about 1.035 at
/// perihelion and 0.967 at aphelion.
pub fn solar_flux_correction(date: NaiveDate) -> f64 {
    let days_in_year = NaiveDate::from_ymd_opt(date.year(), 12, 31).map_or(365, |d| d.ordinal());
    let gamma = 2.0 * PI * f64::from(date.ordinal0()) / f64::from(days_in_year);
    1.000110
        + 0.034221 * gamma.cos()
        + 0.001280 * gamma.sin()
        + 0.000719 * (2.0 * gamma).cos()
        + 0.000077 * (2.0 * gamma).sin()
}

impl Display for Sensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sensor::Meris => write!(f, "MERIS"),
            Sensor::Seawifs => write!(f, "SeaWiFS"),
            Sensor::Viirs => write!(f, "VIIRS"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Sensor; 3] = [Sensor::Meris, Sensor::Seawifs, Sensor::Viirs];

    #[test]
    fn test_tables_are_consistent() {
        for sensor in ALL {
            assert_eq!(sensor.ozone_absorption().len(), sensor.nn_band_count(), "{sensor}");
            assert!(sensor.nn_bands().iter().all(|&b| b < sensor.toa_band_count()));
            assert!(sensor.water_band_count() <= sensor.nn_band_count());
            assert!(sensor.cloud_band() < sensor.nn_band_count());
            assert!(sensor.slope_bands().iter().all(|&b| b < sensor.water_band_count()));
            if let Some(flux) = sensor.default_solar_flux() {
                assert_eq!(flux.len(), sensor.toa_band_count());
            }
        }
    }

    #[test]
    fn test_reflectance_sensor_has_no_solar_flux() {
        assert_eq!(Sensor::Viirs.toa_input(), ToaInput::Reflectance);
        assert!(Sensor::Viirs.default_solar_flux().is_none());
        assert_eq!(
            Sensor::Seawifs.toa_input(),
            ToaInput::Radiance { scale: 10.0 }
        );
    }

    #[test]
    fn test_meris_input_sizes() {
        assert_eq!(Sensor::Meris.atmo_net_inputs(), 19);
        assert_eq!(Sensor::Meris.water_net_inputs(), 15);
        assert_eq!(Sensor::Meris.nn_bands()[10], 11);
    }

    #[test]
    fn test_water_vapour_polynomial() {
        let wv = Sensor::Meris.water_vapour_correction().unwrap();
        let mut r_toa = vec![0.05; 15];
        r_toa[13] = 0.04;
        r_toa[14] = 0.04;
        let expected = 0.3832989 + 1.6527957 - 1.5635101 + 0.5311913;
        assert!((wv.transmittance(&r_toa) - expected).abs() < 1e-12);
        assert!(Sensor::Viirs.water_vapour_correction().is_none());
    }

    #[test]
    fn test_solar_flux_correction_follows_the_orbit() {
        let jan_first = NaiveDate::from_ymd_opt(2008, 1, 1).unwrap();
        assert!((solar_flux_correction(jan_first) - 1.03505).abs() < 1e-9);

        let july = NaiveDate::from_ymd_opt(2008, 7, 4).unwrap();
        assert!((solar_flux_correction(july) - 0.967).abs() < 1e-3);

        let mean = (1..=365)
            .filter_map(|doy| NaiveDate::from_yo_opt(2007, doy))
            .map(solar_flux_correction)
            .sum::<f64>()
            / 365.0;
        assert!((mean - 1.000110).abs() < 1e-6);
    }

    #[test]
    fn test_deserialize_and_display() {
        let sensor: Sensor = serde_json::from_str("\"seawifs\"").unwrap();
        assert_eq!(sensor, Sensor::Seawifs);
        assert_eq!(sensor.to_string(), "SeaWiFS");
    }
}
