// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use crate::config::ConvertOptions;
use crate::{ConvertError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One waypoint in flight order. Longitude/latitude in degrees, altitude in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub lon: f64,
    pub lat: f64,
    pub alt: f64,
}

impl Point {
    pub fn new(lon: f64, lat: f64, alt: f64) -> Self {
        Self { lon, lat, alt }
    }
}

/// Reads a GeoJSON feature collection and returns its point features in order.
///
/// Non-point geometries are skipped. The altitude comes from the override when
/// set, otherwise from `options.altitude_property`, otherwise `options.default_altitude`.
pub fn extract_points(data: &[u8], options: &ConvertOptions) -> Result<Vec<Point>> {
    let doc: Value = serde_json::from_slice(data)
        .map_err(|e| ConvertError::MalformedInput(format!("not valid JSON: {}", e)))?;

    let features = doc
        .get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| ConvertError::MalformedInput("missing 'features' array".to_string()))?;

    let mut points = Vec::new();
    let mut defaulted = 0usize;

    for (i, feature) in features.iter().enumerate() {
        let geometry = match feature.get("geometry") {
            Some(g) if !g.is_null() => g,
            _ => continue,
        };
        let is_point = geometry
            .get("type")
            .and_then(Value::as_str)
            .map(|t| t.eq_ignore_ascii_case("point"))
            .unwrap_or(false);
        if !is_point {
            continue;
        }

        let (lon, lat) = read_lon_lat(geometry).ok_or_else(|| {
            ConvertError::MalformedInput(format!("feature {} has invalid point coordinates", i))
        })?;

        let alt = match options.altitude_override {
            Some(alt) => alt,
            None => match read_altitude(feature, &options.altitude_property) {
                Some(alt) => alt,
                None => {
                    defaulted += 1;
                    options.default_altitude
                }
            },
        };

        points.push(Point::new(lon, lat, alt));
    }

    if defaulted > 0 {
        log::warn!(
            "{} point(s) had no '{}' property; using default altitude {:.2} m",
            defaulted,
            options.altitude_property,
            options.default_altitude
        );
    }
    log::info!("Extracted {} points from {} features", points.len(), features.len());

    Ok(points)
}

fn read_lon_lat(geometry: &Value) -> Option<(f64, f64)> {
    let coords = geometry.get("coordinates")?.as_array()?;
    if coords.len() < 2 {
        return None;
    }
    Some((coords[0].as_f64()?, coords[1].as_f64()?))
}

// Exporters sometimes write numeric attributes as strings. Non-finite values
// ("NaN", "inf") count as missing.
fn read_altitude(feature: &Value, property: &str) -> Option<f64> {
    let alt = match feature.get("properties")?.get(property)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    alt.filter(|a: &f64| a.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn extract(doc: Value, options: &ConvertOptions) -> Result<Vec<Point>> {
        extract_points(doc.to_string().as_bytes(), options)
    }

    #[test]
    fn test_default_altitude_applied() {
        let doc = json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "geometry": {"type": "Point", "coordinates": [10.1234567, 20.7654321]}, "properties": {"alt_m": 45.5}},
                {"type": "Feature", "geometry": {"type": "Point", "coordinates": [10.2, 20.8]}}
            ]
        });
        let points = extract(doc, &ConvertOptions::default()).unwrap();
        assert_eq!(
            points,
            vec![
                Point::new(10.1234567, 20.7654321, 45.5),
                Point::new(10.2, 20.8, 30.0)
            ]
        );
    }

    #[test]
    fn test_override_wins_over_property() {
        let doc = json!({
            "features": [
                {"geometry": {"type": "Point", "coordinates": [1.0, 2.0]}, "properties": {"alt_m": 45.5}},
                {"geometry": {"type": "Point", "coordinates": [3.0, 4.0]}}
            ]
        });
        let opts = ConvertOptions::default().with_altitude_override(Some(80.0));
        let points = extract(doc, &opts).unwrap();
        assert!(points.iter().all(|p| p.alt == 80.0));
    }

    #[test]
    fn test_non_point_geometries_skipped() {
        let doc = json!({
            "features": [
                {"geometry": {"type": "LineString", "coordinates": [[0.0, 0.0], [1.0, 1.0]]}},
                {"geometry": null},
                {"geometry": {"type": "point", "coordinates": [5.0, 6.0, 99.0]}, "properties": {"alt_m": "12.5"}}
            ]
        });
        let points = extract(doc, &ConvertOptions::default()).unwrap();
        assert_eq!(points, vec![Point::new(5.0, 6.0, 12.5)]);
    }

    #[test]
    fn test_non_finite_altitude_falls_back_to_default() {
        let doc = json!({
            "features": [
                {"geometry": {"type": "Point", "coordinates": [1.0, 2.0]}, "properties": {"alt_m": "NaN"}},
                {"geometry": {"type": "Point", "coordinates": [3.0, 4.0]}, "properties": {"alt_m": "-inf"}},
                {"geometry": {"type": "Point", "coordinates": [5.0, 6.0]}, "properties": {"alt_m": " infinity "}}
            ]
        });
        let points = extract(doc, &ConvertOptions::default()).unwrap();
        assert_eq!(points.len(), 3);
        assert!(points.iter().all(|p| p.alt == 30.0));
    }

    #[test]
    fn test_malformed_documents() {
        let opts = ConvertOptions::default();
        assert!(matches!(
            extract_points(b"{not json", &opts),
            Err(ConvertError::MalformedInput(_))
        ));
        assert!(matches!(
            extract(json!({"type": "FeatureCollection"}), &opts),
            Err(ConvertError::MalformedInput(_))
        ));
        assert!(matches!(
            extract(json!({"features": [{"geometry": {"type": "Point", "coordinates": [1.0]}}]}), &opts),
            Err(ConvertError::MalformedInput(_))
        ));
    }
}
