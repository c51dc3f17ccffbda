//! Field mapping against raw submission records.
//!
//! A field spec is a comma-separated list of raw-record keys. Values are
//! trimmed; strings, numbers and booleans count as values, while `null`,
//! arrays and objects count as empty.

use plotguard_types::mapping::FieldMappingConfig;
use serde_json::{Map, Value};

/// Raw key/value record as received from the survey platform.
pub type RawRecord = Map<String, Value>;

pub const REGION_SEPARATOR: &str = " - ";

/// Split a comma-separated spec into trimmed, non-empty field names.
///
/// # Examples
///
/// ```
/// use plotguard::mapping::split_fields;
///
/// assert_eq!(split_fields(Some(" a, ,b ,")), vec!["a", "b"]);
/// assert!(split_fields(None).is_empty());
/// ```
pub fn split_fields(spec: Option<&str>) -> Vec<String> {
    spec.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// Trimmed text of a field, or `None` when missing or empty.
pub fn field_text(record: &RawRecord, field: &str) -> Option<String> {
    let text = match record.get(field)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// First non-empty value in field order, with the field that supplied it.
pub fn first_nonempty(record: &RawRecord, fields: &[String]) -> Option<(String, String)> {
    fields
        .iter()
        .find_map(|field| field_text(record, field).map(|value| (value, field.clone())))
}

/// Join every non-empty value in field order. Empty fields are skipped.
pub fn join_nonempty(record: &RawRecord, fields: &[String], separator: &str) -> String {
    fields
        .iter()
        .filter_map(|field| field_text(record, field))
        .collect::<Vec<_>>()
        .join(separator)
}

/// Region-style join with `" - "`.
pub fn join_region(record: &RawRecord, fields: &[String]) -> String {
    join_nonempty(record, fields, REGION_SEPARATOR)
}

/// Space-joined plot name; `None` when nothing is configured or found.
pub fn join_plot_name(record: &RawRecord, fields: &[String]) -> Option<String> {
    let name = join_nonempty(record, fields, " ");
    (!name.is_empty()).then_some(name)
}

/// Field lists resolved from a [`FieldMappingConfig`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappedFields {
    pub polygon: Vec<String>,
    pub region: Vec<String>,
    pub sub_region: Vec<String>,
    pub plot_name: Vec<String>,
}

impl MappedFields {
    pub fn from_config(config: &FieldMappingConfig) -> Self {
        Self {
            polygon: split_fields(config.polygon_field.as_deref()),
            region: split_fields(config.region_field.as_deref()),
            sub_region: split_fields(config.sub_region_field.as_deref()),
            plot_name: split_fields(config.plot_name_field.as_deref()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> RawRecord {
        match value {
            Value::Object(map) => map,
            _ => panic!("record must be an object"),
        }
    }

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_joins_non_empty() {
        let r = record(json!({"a": "X", "b": "Y", "c": "Z"}));
        assert_eq!(join_region(&r, &fields(&["a", "b", "c"])), "X - Y - Z");
    }

    #[test]
    fn test_skips_empty_and_missing() {
        let r = record(json!({"a": "X", "b": "  ", "d": null}));
        assert_eq!(join_region(&r, &fields(&["a", "b", "c", "d"])), "X");
    }

    #[test]
    fn test_empty_spec_returns_empty() {
        let r = record(json!({"a": "X"}));
        assert_eq!(join_region(&r, &split_fields(None)), "");
        assert_eq!(join_region(&r, &split_fields(Some(""))), "");
    }

    #[test]
    fn test_first_nonempty_reports_field() {
        let r = record(json!({"primary": "", "fallback": " 0 0; 1 1 ", "last": "x"}));
        let found = first_nonempty(&r, &fields(&["primary", "fallback", "last"]));
        assert_eq!(found, Some(("0 0; 1 1".to_string(), "fallback".to_string())));
        assert_eq!(first_nonempty(&r, &fields(&["missing"])), None);
    }

    #[test]
    fn test_plot_name() {
        let r = record(json!({"first": "Abebe", "last": "", "id": 17}));
        assert_eq!(join_plot_name(&r, &fields(&["first", "last"])), Some("Abebe".to_string()));
        assert_eq!(join_plot_name(&r, &fields(&["first", "id"])), Some("Abebe 17".to_string()));
        assert_eq!(join_plot_name(&r, &fields(&["last"])), None);
        assert_eq!(join_plot_name(&r, &[]), None);
    }

    #[test]
    fn test_non_scalar_values_are_empty() {
        let r = record(json!({"list": [1, 2], "obj": {"k": "v"}, "flag": true}));
        assert_eq!(field_text(&r, "list"), None);
        assert_eq!(field_text(&r, "obj"), None);
        assert_eq!(field_text(&r, "flag"), Some("true".to_string()));
    }

    #[test]
    fn test_mapped_fields_from_config() {
        let config = FieldMappingConfig::default()
            .with_polygon_field("boundary, boundary_alt")
            .with_region_field("region");
        let mapped = MappedFields::from_config(&config);
        assert_eq!(mapped.polygon, fields(&["boundary", "boundary_alt"]));
        assert_eq!(mapped.region, fields(&["region"]));
        assert!(mapped.sub_region.is_empty());
        assert!(mapped.plot_name.is_empty());
    }
}
