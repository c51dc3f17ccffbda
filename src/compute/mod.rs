//! Pure geometry computation: vertex-format codec, polygon validation,
//! overlap detection and reason maintenance.
//!
//! Nothing in this module performs I/O. Malformed input is reported as data
//! (`None`, a diagnostic string, or a `GeometryState`), never as an error.

pub mod geoshape;
pub mod overlap;
pub mod reason;
pub mod validation;
