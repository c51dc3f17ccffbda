//! # plotguard-types
//!
//! Core data types shared by the plotguard crates.
//!
//! - **Bounding boxes**: `BoundingBox`, the axis-aligned pre-filter envelope
//! - **Review state**: `GeometryState`, the four-way review status of a plot
//! - **Field mapping**: `FieldMappingConfig`, the per-form raw-record mapping
//!
//! All types are serializable with Serde and built on top of the `geo` crate's
//! geometric primitives.
//!
//! ## Examples
//!
//! ```rust
//! use plotguard_types::bbox::BoundingBox;
//! use plotguard_types::state::GeometryState;
//!
//! let plot = BoundingBox::new(9.0, 9.1, 38.7, 38.8);
//! let neighbor = BoundingBox::new(9.05, 9.2, 38.75, 38.9);
//! assert!(plot.intersects(&neighbor));
//!
//! let state = GeometryState::Unchecked;
//! assert!(state.needs_check());
//! ```

pub mod bbox;
pub mod mapping;
pub mod state;

pub use bbox::BoundingBox;
pub use mapping::FieldMappingConfig;
pub use state::GeometryState;
