//! Parallel processing of many pixels against one shared pipeline.

use chrono::NaiveDateTime;
use rayon::prelude::*;
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::ancillary::AncillaryResolver;
use crate::pipeline::{Flag, InversionPipeline, PixelInput, PixelResult};

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse observations in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("observation {index} has {found} TOA values, {expected} expected")]
    ToaLength {
        index: usize,
        expected: usize,
        found: usize,
    },
}

fn default_valid() -> bool {
    true
}

/// One located pixel as read from a pixel file.
///
/// Ozone and pressure are optional; missing values are looked up through the
/// [`AncillaryResolver`].
#[derive(Debug, Clone, Deserialize)]
pub struct Observation {
    pub toa: Vec<f64>,
    pub sun_zenith: f64,
    pub sun_azimuth: f64,
    pub view_zenith: f64,
    pub view_azimuth: f64,
    #[serde(default)]
    pub altitude: f64,
    pub lat: f64,
    pub lon: f64,
    pub time: NaiveDateTime,
    pub ozone: Option<f64>,
    pub pressure: Option<f64>,
    #[serde(default = "default_valid")]
    pub valid: bool,
}

impl Observation {
    /// Reads a JSON array of observations.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Vec<Observation>, BatchError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| BatchError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_reader(BufReader::new(file)).map_err(|source| BatchError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    fn into_pixel(self, resolver: &AncillaryResolver) -> PixelInput {
        let (ozone, pressure) = match (self.ozone, self.pressure) {
            (Some(ozone), Some(pressure)) => (ozone, pressure),
            (ozone, pressure) => {
                let (o, p) = resolver.resolve(self.lat, self.lon, self.time);
                (ozone.unwrap_or(o), pressure.unwrap_or(p))
            }
        };

        PixelInput {
            toa: self.toa,
            sun_zenith: self.sun_zenith,
            sun_azimuth: self.sun_azimuth,
            view_zenith: self.view_zenith,
            view_azimuth: self.view_azimuth,
            altitude: self.altitude,
            ozone,
            pressure,
            valid: self.valid,
            date: Some(self.time.date()),
        }
    }
}

/// Counts over one processed batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    pub total: usize,
    pub valid: usize,
    /// Valid pixels without any quality flag raised.
    pub clean: usize,
    /// Per-flag counts, in [`Flag::ALL`] order without `Valid_PE`.
    pub flag_counts: Vec<(Flag, usize)>,
}

impl BatchSummary {
    pub fn from_results(results: &[PixelResult]) -> Self {
        let mut flag_counts: Vec<(Flag, usize)> = Flag::ALL
            .into_iter()
            .filter(|&f| f != Flag::ValidPe)
            .map(|f| (f, 0))
            .collect();

        let mut valid = 0;
        let mut clean = 0;
        for result in results {
            if !result.flags.contains(Flag::ValidPe) {
                continue;
            }
            valid += 1;
            if result.flags.is_clean() {
                clean += 1;
            }
            for (flag, count) in flag_counts.iter_mut() {
                if result.flags.contains(*flag) {
                    *count += 1;
                }
            }
        }

        Self {
            total: results.len(),
            valid,
            clean,
            flag_counts,
        }
    }

    pub fn count(&self, flag: Flag) -> usize {
        self.flag_counts
            .iter()
            .find(|(f, _)| *f == flag)
            .map_or(0, |(_, count)| *count)
    }
}

#[derive(Debug)]
pub struct BatchProcessor<'a> {
    pipeline: &'a InversionPipeline,
    resolver: &'a AncillaryResolver,
}

impl<'a> BatchProcessor<'a> {
    pub fn new(pipeline: &'a InversionPipeline, resolver: &'a AncillaryResolver) -> Self {
        BatchProcessor { pipeline, resolver }
    }

    /// Checks band counts and resolves ancillary data for every observation.
    pub fn prepare(&self, observations: Vec<Observation>) -> Result<Vec<PixelInput>, BatchError> {
        let expected = self.pipeline.sensor().toa_band_count();
        if let Some((index, obs)) = observations
            .iter()
            .enumerate()
            .find(|(_, obs)| obs.toa.len() != expected)
        {
            return Err(BatchError::ToaLength {
                index,
                expected,
                found: obs.toa.len(),
            });
        }

        Ok(observations
            .into_par_iter()
            .map(|obs| obs.into_pixel(self.resolver))
            .collect())
    }

    /// Inverts every pixel in parallel. Results keep the input order.
    pub fn process(&self, pixels: &[PixelInput]) -> Vec<PixelResult> {
        debug!(pixels = pixels.len(), "processing batch");
        let results: Vec<PixelResult> = pixels
            .par_iter()
            .map(|pixel| self.pipeline.process_pixel(pixel))
            .collect();

        info!(
            pixels = results.len(),
            valid = results.iter().filter(|r| r.flags.contains(Flag::ValidPe)).count(),
            "batch processed"
        );
        results
    }

    /// `prepare` followed by `process`.
    pub fn run(&self, observations: Vec<Observation>) -> Result<Vec<PixelResult>, BatchError> {
        let pixels = self.prepare(observations)?;
        Ok(self.process(&pixels))
    }
}
