//! Error types for plotguard.
//!
//! Bad survey data is never an error: parse and validation failures are
//! reported through `GeometryState`. These errors cover store and
//! configuration failures only.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlotError {
    #[error("Plot not found: {0}")]
    UnknownPlot(String),

    #[error("Plot {plot} belongs to scope {actual}, not {expected}")]
    ScopeMismatch {
        plot: String,
        expected: String,
        actual: String,
    },

    #[error("Plot already exists: {0}")]
    DuplicatePlot(String),

    #[error("Plot {0} has no source record")]
    MissingSource(String),

    #[error("Plot {0} has no geometry")]
    MissingGeometry(String),

    #[error("No polygon field mapping configured")]
    NoPolygonMapping,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "toml")]
    #[error("TOML decode error: {0}")]
    TomlDecode(#[from] toml::de::Error),

    #[cfg(feature = "toml")]
    #[error("TOML encode error: {0}")]
    TomlEncode(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, PlotError>;
