//! Engine configuration.
//!
//! Thresholds used by validation and reason maintenance. The defaults are
//! the values reviewers expect; change them only with care, because every
//! stored reason and flag was produced under them.

use serde::de::Error;
use serde::{Deserialize, Serialize};

/// Engine configuration
///
/// # Example
///
/// ```rust
/// use plotguard::Config;
///
/// let config = Config::default();
/// assert_eq!(config.min_area_sq_meters, 10.0);
///
/// let json = r#"{ "min_area_sq_meters": 25.0 }"#;
/// let config = Config::from_json(json).unwrap();
/// assert_eq!(config.max_reason_len, 500);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Smallest accepted plot area in square meters
    #[serde(default = "Config::default_min_area_sq_meters")]
    pub min_area_sq_meters: f64,

    /// Maximum length of a stored reason, in characters
    #[serde(default = "Config::default_max_reason_len")]
    pub max_reason_len: usize,
}

impl Config {
    const fn default_min_area_sq_meters() -> f64 {
        10.0
    }

    const fn default_max_reason_len() -> usize {
        500
    }

    pub fn with_min_area(mut self, sq_meters: f64) -> Self {
        assert!(
            sq_meters.is_finite() && sq_meters >= 0.0,
            "Minimum area must be finite and non-negative"
        );
        self.min_area_sq_meters = sq_meters;
        self
    }

    pub fn with_max_reason_len(mut self, len: usize) -> Self {
        assert!(len > 3, "Reason length must leave room for the ellipsis");
        self.max_reason_len = len;
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if !self.min_area_sq_meters.is_finite() {
            return Err("Minimum area must be finite (not NaN or infinity)".to_string());
        }
        if self.min_area_sq_meters < 0.0 {
            return Err("Minimum area must not be negative".to_string());
        }
        if self.max_reason_len <= 3 {
            return Err("Reason length must be greater than 3".to_string());
        }
        Ok(())
    }

    /// Load configuration from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let config: Config = serde_json::from_str(json)?;
        if let Err(e) = config.validate() {
            return Err(Error::custom(e));
        }
        Ok(config)
    }

    /// Save configuration as JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load configuration from TOML string (requires toml feature)
    #[cfg(feature = "toml")]
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        let config: Config = toml::from_str(toml_str)?;
        if let Err(e) = config.validate() {
            return Err(toml::de::Error::custom(e));
        }
        Ok(config)
    }

    /// Save configuration as TOML string (requires toml feature)
    #[cfg(feature = "toml")]
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_area_sq_meters: Self::default_min_area_sq_meters(),
            max_reason_len: Self::default_max_reason_len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.min_area_sq_meters, 10.0);
        assert_eq!(config.max_reason_len, 500);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_json_round_trip() {
        let config = Config::default().with_min_area(25.0);
        let json = config.to_json().unwrap();
        assert_eq!(Config::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_json_rejects_invalid() {
        assert!(Config::from_json(r#"{ "max_reason_len": 2 }"#).is_err());
        assert!(Config::from_json(r#"{ "min_area_sq_meters": -1.0 }"#).is_err());
    }

    #[test]
    #[should_panic(expected = "Reason length")]
    fn test_builder_rejects_short_reason() {
        let _ = Config::default().with_max_reason_len(3);
    }

    #[cfg(feature = "toml")]
    #[test]
    fn test_toml_round_trip() {
        let config = Config::default().with_max_reason_len(200);
        let text = config.to_toml().unwrap();
        assert_eq!(Config::from_toml(&text).unwrap(), config);
    }
}
