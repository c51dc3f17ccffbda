//! Plot attribute derivation from raw submissions.
//!
//! [`extract`] is pure and total: the same record and mapping always give
//! the same attributes, so it serves both first-time derivation and
//! re-derivation after a mapping change.

use crate::compute::geoshape::{bounding_box, parse_vertex_format, to_polygon_text};
use crate::compute::validation::{InvalidPolygon, check_polygon};
use crate::config::Config;
use crate::mapping::{MappedFields, RawRecord, first_nonempty, join_plot_name, join_region};
use geo::{LineString, Polygon};
use plotguard_types::bbox::BoundingBox;
use plotguard_types::mapping::FieldMappingConfig;
use plotguard_types::state::GeometryState;

pub const NO_POLYGON_DATA: &str = "No polygon data found in submission.";
pub const PARSE_FAILURE: &str = "Failed to parse polygon geometry.";

/// Display name used when no mapped name field has a value.
pub const UNKNOWN_PLOT_NAME: &str = "Unknown";

/// Why a record produced no usable geometry.
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryIssue {
    /// The form has no polygon field mapping; geometry does not apply.
    NoMappingConfigured,
    /// Mapped polygon fields are all empty.
    MissingSourceData,
    /// The polygon value is not in the vertex format.
    ParseFailure,
    /// The polygon parsed but failed validation.
    ValidationFailure(InvalidPolygon),
}

impl GeometryIssue {
    /// Review state for a plot with this issue.
    pub fn state(&self) -> GeometryState {
        match self {
            GeometryIssue::NoMappingConfigured => GeometryState::NotApplicable,
            GeometryIssue::MissingSourceData => GeometryState::Flagged(NO_POLYGON_DATA.to_string()),
            GeometryIssue::ParseFailure => GeometryState::Flagged(PARSE_FAILURE.to_string()),
            GeometryIssue::ValidationFailure(invalid) => GeometryState::Flagged(invalid.to_string()),
        }
    }
}

/// Accepted geometry with its bounding box.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotGeometry {
    pub polygon: Polygon<f64>,
    pub bbox: BoundingBox,
}

/// Everything derived from one raw record.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotAttributes {
    /// `None` when no configured name field produced a value.
    pub plot_name: Option<String>,
    pub region: String,
    pub sub_region: String,
    pub polygon: Option<Polygon<f64>>,
    pub bounding_box: Option<BoundingBox>,
    /// Which configured field supplied the polygon string.
    pub polygon_source_field: Option<String>,
    pub state: GeometryState,
}

impl PlotAttributes {
    pub fn display_name(&self) -> &str {
        self.plot_name.as_deref().unwrap_or(UNKNOWN_PLOT_NAME)
    }

    /// Stored polygon text, when geometry is present.
    pub fn polygon_text(&self) -> Option<String> {
        self.polygon
            .as_ref()
            .map(|polygon| to_polygon_text(&polygon.exterior().0))
    }
}

/// Derive plot attributes from a raw record with the default thresholds.
///
/// # Examples
///
/// ```
/// use plotguard::extract::extract;
/// use plotguard::{FieldMappingConfig, GeometryState};
/// use serde_json::json;
///
/// let record = json!({
///     "boundary": "0.0 0.0 0 0; 0.001 0.0 0 0; 0.001 0.001 0 0; 0.0 0.001 0 0",
///     "farmer": "Abebe",
/// });
/// let mapping = FieldMappingConfig::default()
///     .with_polygon_field("boundary")
///     .with_plot_name_field("farmer");
///
/// let attrs = extract(record.as_object().unwrap(), &mapping);
/// assert_eq!(attrs.plot_name.as_deref(), Some("Abebe"));
/// assert_eq!(attrs.state, GeometryState::Unchecked);
/// assert!(attrs.bounding_box.is_some());
/// ```
pub fn extract(record: &RawRecord, mapping: &FieldMappingConfig) -> PlotAttributes {
    extract_with(record, mapping, &Config::default())
}

/// Derive plot attributes with explicit thresholds.
pub fn extract_with(record: &RawRecord, mapping: &FieldMappingConfig, config: &Config) -> PlotAttributes {
    let fields = MappedFields::from_config(mapping);

    let mut attrs = PlotAttributes {
        plot_name: join_plot_name(record, &fields.plot_name),
        region: join_region(record, &fields.region),
        sub_region: join_region(record, &fields.sub_region),
        polygon: None,
        bounding_box: None,
        polygon_source_field: None,
        state: GeometryState::Unchecked,
    };

    if fields.polygon.is_empty() {
        attrs.state = GeometryIssue::NoMappingConfigured.state();
        return attrs;
    }

    let Some((raw_polygon, source_field)) = first_nonempty(record, &fields.polygon) else {
        log::warn!("No polygon data found in fields: {:?}", fields.polygon);
        attrs.state = GeometryIssue::MissingSourceData.state();
        return attrs;
    };

    match geometry_from_ring(parse_vertex_format(&raw_polygon), config) {
        Ok(geometry) => {
            attrs.polygon = Some(geometry.polygon);
            attrs.bounding_box = Some(geometry.bbox);
            attrs.polygon_source_field = Some(source_field);
            attrs.state = GeometryState::Unchecked;
        }
        Err(issue) => {
            if issue == GeometryIssue::ParseFailure {
                log::warn!("Failed to parse polygon from field: {}", source_field);
            } else {
                log::warn!("Invalid polygon in field {}: {:?}", source_field, issue);
            }
            attrs.state = issue.state();
        }
    }

    attrs
}

/// Regenerate attributes from the original record, discarding manual edits.
///
/// Identical to [`extract`]; run overlap detection again afterwards.
pub fn reset_geometry(record: &RawRecord, mapping: &FieldMappingConfig) -> PlotAttributes {
    extract(record, mapping)
}

/// [`reset_geometry`] with explicit thresholds.
pub fn reset_geometry_with(record: &RawRecord, mapping: &FieldMappingConfig, config: &Config) -> PlotAttributes {
    extract_with(record, mapping, config)
}

/// Validate a parsed ring and build the stored geometry.
///
/// `None` means the source text could not be parsed.
pub fn geometry_from_ring(
    ring: Option<LineString<f64>>,
    config: &Config,
) -> Result<PlotGeometry, GeometryIssue> {
    let ring = ring.ok_or(GeometryIssue::ParseFailure)?;
    check_polygon(&ring.0, config).map_err(GeometryIssue::ValidationFailure)?;
    let bbox = bounding_box(&ring.0).ok_or(GeometryIssue::ParseFailure)?;
    Ok(PlotGeometry {
        polygon: Polygon::new(ring, vec![]),
        bbox,
    })
}
