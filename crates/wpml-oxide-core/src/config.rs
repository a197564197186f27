// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use crate::{ConvertError, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_ALTITUDE_M: f64 = 30.0;
pub const DEFAULT_ALTITUDE_PROPERTY: &str = "alt_m";
pub const MAX_ALTITUDE_OVERRIDE_M: f64 = 1200.0;

/// Size ceilings applied before and after parsing the inputs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Limits {
    pub max_points: usize,
    pub max_archive_bytes: usize,
    pub max_points_bytes: usize,
    /// Decompressed size of a single mission document
    pub max_entry_bytes: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_points: 1000,
            max_archive_bytes: 10 * 1024 * 1024,
            max_points_bytes: 5 * 1024 * 1024,
            max_entry_bytes: 10 * 1024 * 1024,
        }
    }
}

impl Limits {
    pub fn check_archive_size(&self, len: usize) -> Result<()> {
        check("Seed archive size", len, self.max_archive_bytes)
    }

    pub fn check_points_size(&self, len: usize) -> Result<()> {
        check("Point file size", len, self.max_points_bytes)
    }

    pub fn check_entry_size(&self, len: usize) -> Result<()> {
        check("Decompressed mission document size", len, self.max_entry_bytes)
    }

    pub fn check_point_count(&self, count: usize) -> Result<()> {
        if count < 2 {
            return Err(ConvertError::InvalidGeometry { found: count });
        }
        check("Waypoint count", count, self.max_points)
    }
}

fn check(what: &'static str, actual: usize, limit: usize) -> Result<()> {
    if actual > limit {
        return Err(ConvertError::CapacityExceeded {
            what,
            actual,
            limit,
        });
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertOptions {
    /// Applied to every waypoint in place of per-feature altitudes.
    #[serde(default)]
    pub altitude_override: Option<f64>,
    #[serde(default = "default_altitude")]
    pub default_altitude: f64,
    #[serde(default = "default_altitude_property")]
    pub altitude_property: String,
    #[serde(default)]
    pub limits: Limits,
}

fn default_altitude() -> f64 {
    DEFAULT_ALTITUDE_M
}

fn default_altitude_property() -> String {
    DEFAULT_ALTITUDE_PROPERTY.to_string()
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            altitude_override: None,
            default_altitude: DEFAULT_ALTITUDE_M,
            altitude_property: default_altitude_property(),
            limits: Limits::default(),
        }
    }
}

impl ConvertOptions {
    pub fn with_altitude_override(mut self, altitude: Option<f64>) -> Self {
        self.altitude_override = altitude;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(alt) = self.altitude_override {
            if !(0.0..=MAX_ALTITUDE_OVERRIDE_M).contains(&alt) {
                return Err(ConvertError::InvalidAltitude(alt));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_count_boundaries() {
        let limits = Limits::default();
        assert!(matches!(
            limits.check_point_count(1),
            Err(ConvertError::InvalidGeometry { found: 1 })
        ));
        assert!(limits.check_point_count(2).is_ok());
        assert!(limits.check_point_count(1000).is_ok());
        assert!(matches!(
            limits.check_point_count(1001),
            Err(ConvertError::CapacityExceeded { limit: 1000, .. })
        ));
    }

    #[test]
    fn test_byte_ceilings() {
        let limits = Limits::default();
        assert!(limits.check_archive_size(10 * 1024 * 1024).is_ok());
        assert!(limits.check_archive_size(10 * 1024 * 1024 + 1).is_err());
        assert!(limits.check_points_size(5 * 1024 * 1024 + 1).is_err());
        assert!(limits.check_entry_size(10 * 1024 * 1024).is_ok());
        assert!(matches!(
            limits.check_entry_size(10 * 1024 * 1024 + 1),
            Err(ConvertError::CapacityExceeded { limit, .. }) if limit == 10 * 1024 * 1024
        ));
    }

    #[test]
    fn test_altitude_override_range() {
        let opts = ConvertOptions::default();
        assert!(opts.clone().with_altitude_override(Some(0.0)).validate().is_ok());
        assert!(opts
            .clone()
            .with_altitude_override(Some(1200.0))
            .validate()
            .is_ok());
        assert!(matches!(
            opts.with_altitude_override(Some(-1.0)).validate(),
            Err(ConvertError::InvalidAltitude(_))
        ));
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let opts: ConvertOptions = serde_json::from_str(r#"{"altitude_override": 55.0}"#).unwrap();
        assert_eq!(opts.altitude_override, Some(55.0));
        assert_eq!(opts.default_altitude, 30.0);
        assert_eq!(opts.altitude_property, "alt_m");
        assert_eq!(opts.limits, Limits::default());

        let opts: ConvertOptions =
            serde_json::from_str(r#"{"limits": {"max_entry_bytes": 4096}}"#).unwrap();
        assert_eq!(opts.limits.max_entry_bytes, 4096);
        assert_eq!(opts.limits.max_points, 1000);
    }
}
