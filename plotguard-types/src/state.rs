use serde::{Deserialize, Serialize};

/// Review status of a plot's geometry.
///
/// `Unchecked` and `Clean` are deliberately distinct: only `Unchecked`
/// triggers an overlap test, and a `Clean` plot stays clean until its own
/// geometry or a neighbor's geometry changes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum GeometryState {
    /// No polygon mapping is configured for the plot's form.
    NotApplicable,
    /// Valid geometry that has not been tested for overlaps yet.
    Unchecked,
    /// Tested, no overlap found.
    Clean,
    /// A geometry problem or a confirmed overlap.
    Flagged(String),
}

impl GeometryState {
    /// Whether this state should trigger a new overlap test.
    pub fn needs_check(&self) -> bool {
        matches!(self, GeometryState::Unchecked)
    }

    pub fn is_flagged(&self) -> bool {
        matches!(self, GeometryState::Flagged(_))
    }

    pub fn is_clean(&self) -> bool {
        matches!(self, GeometryState::Clean)
    }

    /// The reviewer-facing reason, if flagged.
    pub fn reason(&self) -> Option<&str> {
        match self {
            GeometryState::Flagged(reason) => Some(reason),
            _ => None,
        }
    }

    /// State after a reviewer approved or rejected the plot.
    ///
    /// Any state resolves to `Clean` with the reason cleared.
    pub fn resolved(&self) -> Self {
        GeometryState::Clean
    }

    /// Map to the nullable `(flagged, reason)` column pair used by storage.
    ///
    /// # Examples
    ///
    /// ```
    /// use plotguard_types::state::GeometryState;
    ///
    /// assert_eq!(GeometryState::Unchecked.to_flag_columns(), (None, None));
    /// assert_eq!(GeometryState::Clean.to_flag_columns(), (Some(false), None));
    /// assert_eq!(
    ///     GeometryState::Flagged("overlap".into()).to_flag_columns(),
    ///     (Some(true), Some("overlap".to_string()))
    /// );
    /// ```
    pub fn to_flag_columns(&self) -> (Option<bool>, Option<String>) {
        match self {
            GeometryState::NotApplicable | GeometryState::Unchecked => (None, None),
            GeometryState::Clean => (Some(false), None),
            GeometryState::Flagged(reason) => (Some(true), Some(reason.clone())),
        }
    }

    /// Rebuild the state from the nullable column pair.
    ///
    /// A null flag is ambiguous in storage; it is `Unchecked` when the plot
    /// has geometry and `NotApplicable` otherwise. Missing and invalid
    /// geometry is always stored as flagged, so no other case maps to null.
    pub fn from_flag_columns(has_geometry: bool, flagged: Option<bool>, reason: Option<String>) -> Self {
        match flagged {
            None if has_geometry => GeometryState::Unchecked,
            None => GeometryState::NotApplicable,
            Some(false) => GeometryState::Clean,
            Some(true) => GeometryState::Flagged(reason.unwrap_or_default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_unchecked_needs_check() {
        assert!(GeometryState::Unchecked.needs_check());
        assert!(!GeometryState::Clean.needs_check());
        assert!(!GeometryState::NotApplicable.needs_check());
        assert!(!GeometryState::Flagged("x".into()).needs_check());
    }

    #[test]
    fn test_flag_columns_round_trip() {
        let states = [
            (true, GeometryState::Unchecked),
            (false, GeometryState::NotApplicable),
            (true, GeometryState::Clean),
            (false, GeometryState::Flagged("No polygon data found in submission.".into())),
            (true, GeometryState::Flagged("Polygon overlaps with: A (a)".into())),
        ];
        for (has_geometry, state) in states {
            let (flagged, reason) = state.to_flag_columns();
            assert_eq!(
                GeometryState::from_flag_columns(has_geometry, flagged, reason),
                state
            );
        }
    }

    #[test]
    fn test_resolved_clears_reason() {
        let flagged = GeometryState::Flagged("Polygon overlaps with: A (a)".into());
        let resolved = flagged.resolved();
        assert!(resolved.is_clean());
        assert_eq!(resolved.reason(), None);
    }

    #[test]
    fn test_serde_shape() {
        let json = serde_json::to_string(&GeometryState::Flagged("bad".into())).unwrap();
        assert_eq!(json, r#"{"status":"flagged","reason":"bad"}"#);
        let back: GeometryState = serde_json::from_str(r#"{"status":"unchecked"}"#).unwrap();
        assert_eq!(back, GeometryState::Unchecked);
    }
}
