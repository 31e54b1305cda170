//! Ozone and surface-pressure supply with constant fallbacks.

use chrono::NaiveDateTime;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_OZONE: f64 = 330.0;
pub const DEFAULT_PRESSURE: f64 = 1000.0;

#[derive(Error, Debug)]
pub enum AncillaryError {
    #[error("no {quantity} available at lat {lat}, lon {lon}, {time}")]
    Unavailable {
        quantity: &'static str,
        lat: f64,
        lon: f64,
        time: NaiveDateTime,
    },

    #[error("{0}")]
    Provider(String),

    #[error("no fallback {0} configured")]
    MissingFallback(&'static str),
}

/// Source of total ozone (DU) and surface pressure (hPa) for a position and time.
pub trait AncillaryProvider: Send + Sync {
    fn ozone(&self, lat: f64, lon: f64, time: NaiveDateTime) -> Result<f64, AncillaryError>;

    fn surface_pressure(&self, lat: f64, lon: f64, time: NaiveDateTime)
    -> Result<f64, AncillaryError>;
}

/// Provider returning the same values everywhere.
#[derive(Debug, Clone, Copy)]
pub struct ConstantAncillary {
    pub ozone: f64,
    pub pressure: f64,
}

impl Default for ConstantAncillary {
    fn default() -> Self {
        Self {
            ozone: DEFAULT_OZONE,
            pressure: DEFAULT_PRESSURE,
        }
    }
}

impl AncillaryProvider for ConstantAncillary {
    fn ozone(&self, _lat: f64, _lon: f64, _time: NaiveDateTime) -> Result<f64, AncillaryError> {
        Ok(self.ozone)
    }

    fn surface_pressure(
        &self,
        _lat: f64,
        _lon: f64,
        _time: NaiveDateTime,
    ) -> Result<f64, AncillaryError> {
        Ok(self.pressure)
    }
}

/// Wraps an optional provider and falls back to constants when it fails.
pub struct AncillaryResolver {
    provider: Option<Box<dyn AncillaryProvider>>,
    fallback: ConstantAncillary,
    warned: AtomicBool,
}

impl AncillaryResolver {
    /// Both fallback constants are mandatory, with or without a provider.
    pub fn new(
        provider: Option<Box<dyn AncillaryProvider>>,
        ozone: Option<f64>,
        pressure: Option<f64>,
    ) -> Result<Self, AncillaryError> {
        let fallback = ConstantAncillary {
            ozone: ozone.ok_or(AncillaryError::MissingFallback("ozone"))?,
            pressure: pressure.ok_or(AncillaryError::MissingFallback("pressure"))?,
        };
        Ok(Self {
            provider,
            fallback,
            warned: AtomicBool::new(false),
        })
    }

    /// Resolves `(ozone, pressure)`. Provider failures never propagate.
    pub fn resolve(&self, lat: f64, lon: f64, time: NaiveDateTime) -> (f64, f64) {
        let Some(provider) = &self.provider else {
            return (self.fallback.ozone, self.fallback.pressure);
        };

        let ozone = provider
            .ozone(lat, lon, time)
            .unwrap_or_else(|err| self.fall_back("ozone", &err, self.fallback.ozone));
        let pressure = provider
            .surface_pressure(lat, lon, time)
            .unwrap_or_else(|err| self.fall_back("pressure", &err, self.fallback.pressure));
        (ozone, pressure)
    }

    fn fall_back(&self, quantity: &str, err: &AncillaryError, value: f64) -> f64 {
        if self.warned.swap(true, Ordering::Relaxed) {
            debug!(quantity, error = %err, value, "ancillary fallback");
        } else {
            warn!(quantity, error = %err, value, "ancillary provider failed, using constant fallback");
        }
        value
    }
}

impl std::fmt::Debug for AncillaryResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AncillaryResolver")
            .field("provider", &self.provider.is_some())
            .field("fallback", &self.fallback)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    struct FailingOzone;

    impl AncillaryProvider for FailingOzone {
        fn ozone(&self, lat: f64, lon: f64, time: NaiveDateTime) -> Result<f64, AncillaryError> {
            Err(AncillaryError::Unavailable {
                quantity: "ozone",
                lat,
                lon,
                time,
            })
        }

        fn surface_pressure(
            &self,
            _lat: f64,
            _lon: f64,
            _time: NaiveDateTime,
        ) -> Result<f64, AncillaryError> {
            Ok(1013.25)
        }
    }

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2008, 7, 15)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_without_provider_uses_fallback() {
        let resolver =
            AncillaryResolver::new(None, Some(DEFAULT_OZONE), Some(DEFAULT_PRESSURE)).unwrap();
        assert_eq!(resolver.resolve(54.0, 7.0, noon()), (330.0, 1000.0));
    }

    #[test]
    fn test_failure_falls_back_per_quantity() {
        let resolver =
            AncillaryResolver::new(Some(Box::new(FailingOzone)), Some(300.0), Some(990.0)).unwrap();
        assert_eq!(resolver.resolve(54.0, 7.0, noon()), (300.0, 1013.25));
        // second failure takes the quiet path
        assert_eq!(resolver.resolve(55.0, 8.0, noon()), (300.0, 1013.25));
    }

    #[test]
    fn test_constant_provider() {
        let resolver = AncillaryResolver::new(
            Some(Box::new(ConstantAncillary {
                ozone: 250.0,
                pressure: 1020.0,
            })),
            Some(DEFAULT_OZONE),
            Some(DEFAULT_PRESSURE),
        )
        .unwrap();
        assert_eq!(resolver.resolve(0.0, 0.0, noon()), (250.0, 1020.0));
    }

    #[test]
    fn test_missing_fallback_is_rejected() {
        let err = AncillaryResolver::new(None, Some(DEFAULT_OZONE), None).unwrap_err();
        assert!(matches!(err, AncillaryError::MissingFallback("pressure")));
        let err = AncillaryResolver::new(Some(Box::new(FailingOzone)), None, Some(1000.0)).unwrap_err();
        assert!(matches!(err, AncillaryError::MissingFallback("ozone")));
    }
}
