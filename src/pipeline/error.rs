use thiserror::Error;

use crate::ancillary::AncillaryError;
use crate::config::ConfigError;
use crate::net_set::{NetRole, NetSetError};
use crate::sensor::Sensor;

/// Failures while setting up an inversion. Pixels themselves never fail.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    NetSet(#[from] NetSetError),

    #[error(transparent)]
    Ancillary(#[from] AncillaryError),

    #[error(
        "{role} net maps {found_in} -> {found_out} values, {sensor} needs {expected_in} -> {expected_out}"
    )]
    NetShape {
        role: NetRole,
        sensor: Sensor,
        expected_in: usize,
        expected_out: usize,
        found_in: usize,
        found_out: usize,
    },

    #[error("{sensor} needs a solar flux vector to convert radiances")]
    MissingSolarFlux { sensor: Sensor },
}
