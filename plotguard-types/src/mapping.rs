use serde::{Deserialize, Serialize};

/// Per-form mapping from raw submission keys to plot attributes.
///
/// Every field is an optional comma-separated list of raw-record keys.
/// `polygon_field` is an ordered fallback list; the other fields are joined.
/// Leaving `polygon_field` unset means geometry does not apply to the form.
///
/// # Example
///
/// ```rust
/// use plotguard_types::mapping::FieldMappingConfig;
///
/// let mapping = FieldMappingConfig::default()
///     .with_polygon_field("boundary, boundary_fallback")
///     .with_plot_name_field("first_name,last_name");
/// assert!(mapping.has_polygon_mapping());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMappingConfig {
    #[serde(default)]
    pub polygon_field: Option<String>,
    #[serde(default)]
    pub region_field: Option<String>,
    #[serde(default)]
    pub sub_region_field: Option<String>,
    #[serde(default)]
    pub plot_name_field: Option<String>,
}

impl FieldMappingConfig {
    pub fn with_polygon_field(mut self, spec: impl Into<String>) -> Self {
        self.polygon_field = Some(spec.into());
        self
    }

    pub fn with_region_field(mut self, spec: impl Into<String>) -> Self {
        self.region_field = Some(spec.into());
        self
    }

    pub fn with_sub_region_field(mut self, spec: impl Into<String>) -> Self {
        self.sub_region_field = Some(spec.into());
        self
    }

    pub fn with_plot_name_field(mut self, spec: impl Into<String>) -> Self {
        self.plot_name_field = Some(spec.into());
        self
    }

    /// Whether the polygon spec names at least one non-blank key.
    pub fn has_polygon_mapping(&self) -> bool {
        self.polygon_field
            .as_deref()
            .is_some_and(|spec| spec.split(',').any(|f| !f.trim().is_empty()))
    }
}
