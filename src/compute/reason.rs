//! Reviewer-facing overlap reasons.
//!
//! Reasons are capped at a fixed number of characters; a truncated reason
//! ends with `...`. Appending a plot that a reason already mentions leaves
//! the reason untouched.

use crate::config::Config;
use serde::{Deserialize, Serialize};

pub const OVERLAP_PREFIX: &str = "Polygon overlaps with: ";

const ELLIPSIS: &str = "...";

/// Display name and instance identifier of a plot named in a reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlotRef {
    pub name: String,
    pub instance: String,
}

impl PlotRef {
    pub fn new(name: impl Into<String>, instance: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instance: instance.into(),
        }
    }

    /// `"<name> (<instance>)"`
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.instance)
    }
}

/// Build the reason for a plot that overlaps every plot in `overlaps`.
///
/// # Examples
///
/// ```
/// use plotguard::compute::reason::{PlotRef, build};
///
/// let reason = build(&[PlotRef::new("Abebe", "inst1"), PlotRef::new("Kebede", "inst2")]);
/// assert_eq!(reason, "Polygon overlaps with: Abebe (inst1), Kebede (inst2)");
/// ```
pub fn build(overlaps: &[PlotRef]) -> String {
    build_with(overlaps, Config::default().max_reason_len)
}

pub fn build_with(overlaps: &[PlotRef], max_len: usize) -> String {
    let labels = overlaps
        .iter()
        .map(PlotRef::label)
        .collect::<Vec<_>>()
        .join(", ");
    truncate(format!("{}{}", OVERLAP_PREFIX, labels), max_len)
}

/// Add a reference to `new_instance` to an existing reason.
///
/// Duplicate suppression is a substring test on the instance identifier,
/// which is coarse: an identifier that happens to occur inside other text of
/// the reason also counts as already present.
///
/// # Examples
///
/// ```
/// use plotguard::compute::reason::append;
///
/// let first = append(None, "Abebe", "inst1");
/// assert_eq!(first, "Polygon overlaps with: Abebe (inst1)");
/// assert_eq!(append(Some(&first), "Abebe", "inst1"), first);
///
/// let both = append(Some(&first), "Kebede", "inst2");
/// assert_eq!(
///     both,
///     "Polygon overlaps with: Abebe (inst1); Polygon overlaps with: Kebede (inst2)"
/// );
/// ```
pub fn append(existing: Option<&str>, new_name: &str, new_instance: &str) -> String {
    append_with(existing, new_name, new_instance, Config::default().max_reason_len)
}

pub fn append_with(
    existing: Option<&str>,
    new_name: &str,
    new_instance: &str,
    max_len: usize,
) -> String {
    let entry = format!("{}{} ({})", OVERLAP_PREFIX, new_name, new_instance);
    match existing.filter(|r| !r.is_empty()) {
        Some(reason) if reason.contains(new_instance) => reason.to_string(),
        Some(reason) => truncate(format!("{}; {}", reason, entry), max_len),
        None => truncate(entry, max_len),
    }
}

/// Cap `reason` at `max_len` characters, ending a cut reason with `...`.
pub fn truncate(reason: String, max_len: usize) -> String {
    if reason.chars().count() <= max_len {
        return reason;
    }
    let kept: String = reason
        .chars()
        .take(max_len.saturating_sub(ELLIPSIS.len()))
        .collect();
    kept + ELLIPSIS
}
