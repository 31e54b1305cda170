use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{name} = {value} is outside ({min}, {max})")]
    OutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("{name} must be finite and positive, got {value}")]
    NotPositive { name: &'static str, value: f64 },

    #[error("solar flux needs {expected} values, got {found}")]
    SolarFluxLength { expected: usize, found: usize },

    #[error("band range {first}..={last} does not fit {bands} NN bands")]
    BandRange {
        first: usize,
        last: usize,
        bands: usize,
    },
}
