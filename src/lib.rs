//! Land-plot polygon parsing, validation and overlap detection.
//!
//! ```rust
//! use plotguard::store::ScopeShard;
//! use plotguard::sync::{Submission, ingest_submissions};
//! use plotguard::{FieldMappingConfig, GeometryState};
//! use serde_json::json;
//!
//! let mapping = FieldMappingConfig::default()
//!     .with_polygon_field("boundary")
//!     .with_plot_name_field("farmer");
//!
//! let a = json!({"boundary": "0 0 0 0; 0.001 0 0 0; 0.001 0.001 0 0; 0 0.001 0 0", "farmer": "Abebe"});
//! let b = json!({"boundary": "0.0005 0.0005 0 0; 0.0015 0.0005 0 0; 0.0015 0.0015 0 0; 0.0005 0.0015 0 0", "farmer": "Kebede"});
//!
//! let mut plots = ScopeShard::new("form-1");
//! let report = ingest_submissions(
//!     &mut plots,
//!     &mapping,
//!     vec![
//!         Submission::new("sub-a", a.as_object().cloned().unwrap()),
//!         Submission::new("sub-b", b.as_object().cloned().unwrap()),
//!     ],
//! )?;
//! assert_eq!(report.flagged, 2);
//! # Ok::<(), plotguard::PlotError>(())
//! ```

pub mod compute;
pub mod config;
pub mod error;
pub mod extract;
pub mod mapping;
pub mod store;
pub mod sync;

pub use config::Config;
pub use error::{PlotError, Result};

pub use geo::{Coord, LineString, Polygon};

pub use plotguard_types::{BoundingBox, FieldMappingConfig, GeometryState};

pub use compute::geoshape::{parse_polygon_text, parse_vertex_format, to_polygon_text, to_vertex_format};
pub use compute::overlap::{
    Candidate, OverlapEngine, OverlapOutcome, OverlapTarget, StateWrite, detect_overlaps,
    polygons_overlap, try_detect_overlaps,
};
pub use compute::reason::PlotRef;
pub use compute::validation::{InvalidPolygon, validate};

pub use extract::{GeometryIssue, PlotAttributes, extract, reset_geometry};

pub use store::{MemoryStore, PlotRecord, ScopeShard, ScopeStore, SourceRecord};

pub use sync::{GeometryEdit, GeometryPush, ScopeDriver, Submission, SyncReport};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {

    pub use crate::{Config, PlotError, Result};

    pub use geo::{Coord, Polygon};

    pub use crate::{BoundingBox, FieldMappingConfig, GeometryState};

    pub use crate::{detect_overlaps, extract, reset_geometry};

    pub use crate::{MemoryStore, PlotRecord, ScopeStore};

    pub use crate::sync::{Submission, ingest_submissions, resolve_review};
}
