//! Validation for plot polygons.
//!
//! Checks run in a fixed order and the first failure wins: vertex count,
//! then ring topology, then minimum area. The order decides which message a
//! surveyor sees when a polygon has several problems.

use crate::config::Config;
use geo::line_intersection::{LineIntersection, line_intersection};
use geo::{Coord, Line, LineString, RemoveRepeatedPoints};
use thiserror::Error;

/// Meters per degree of latitude, and of longitude at the equator.
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// Three distinct points plus the closing vertex.
pub const MIN_VERTICES: usize = 4;

/// Why a polygon was rejected. The `Display` text is shown to reviewers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidPolygon {
    #[error("Polygon has too few vertices. Minimum 3 distinct points required.")]
    TooFewVertices,

    #[error("Polygon lines intersect or cross each other.")]
    SelfIntersection,

    #[error("Polygon area is too small. Minimum {min_sq_meters:.0} square meters required.")]
    TooSmall { area_sq_meters: f64, min_sq_meters: f64 },
}

/// Validates a closed `(lon, lat)` ring with the default thresholds.
///
/// # Examples
///
/// ```
/// use geo::coord;
/// use plotguard::compute::validation::validate;
///
/// let square = [
///     coord! { x: 0.0, y: 0.0 },
///     coord! { x: 0.001, y: 0.0 },
///     coord! { x: 0.001, y: 0.001 },
///     coord! { x: 0.0, y: 0.001 },
///     coord! { x: 0.0, y: 0.0 },
/// ];
/// assert!(validate(&square).is_ok());
///
/// let bowtie = [
///     coord! { x: 0.0, y: 0.0 },
///     coord! { x: 1.0, y: 1.0 },
///     coord! { x: 1.0, y: 0.0 },
///     coord! { x: 0.0, y: 1.0 },
///     coord! { x: 0.0, y: 0.0 },
/// ];
/// assert!(validate(&bowtie).unwrap_err().contains("intersect"));
/// ```
pub fn validate(coords: &[Coord<f64>]) -> Result<(), String> {
    validate_with(coords, &Config::default())
}

/// Validates a ring against the thresholds in `config`.
pub fn validate_with(coords: &[Coord<f64>], config: &Config) -> Result<(), String> {
    check_polygon(coords, config).map_err(|e| e.to_string())
}

/// Typed form of [`validate_with`].
pub fn check_polygon(coords: &[Coord<f64>], config: &Config) -> Result<(), InvalidPolygon> {
    if coords.len() < MIN_VERTICES {
        return Err(InvalidPolygon::TooFewVertices);
    }

    if ring_self_intersects(coords) {
        return Err(InvalidPolygon::SelfIntersection);
    }

    let area = area_sq_meters(coords);
    if area < config.min_area_sq_meters {
        return Err(InvalidPolygon::TooSmall {
            area_sq_meters: area,
            min_sq_meters: config.min_area_sq_meters,
        });
    }

    Ok(())
}

/// Planar shoelace area converted to square meters.
///
/// Longitude degrees are scaled by the cosine of the mean vertex latitude.
pub fn area_sq_meters(coords: &[Coord<f64>]) -> f64 {
    if coords.is_empty() {
        return 0.0;
    }

    let twice_area: f64 = coords
        .windows(2)
        .map(|w| w[0].x * w[1].y - w[1].x * w[0].y)
        .sum();
    let area_deg = twice_area.abs() / 2.0;

    let mean_lat = coords.iter().map(|c| c.y).sum::<f64>() / coords.len() as f64;
    let m_per_deg_lat = METERS_PER_DEGREE;
    let m_per_deg_lon = METERS_PER_DEGREE * mean_lat.to_radians().cos();

    area_deg * m_per_deg_lat * m_per_deg_lon
}

/// Whether the closed ring crosses or touches itself.
///
/// Consecutive duplicate vertices are ignored. Adjacent edges may only meet
/// at their shared vertex; any contact between non-adjacent edges, and any
/// collinear overlap, is a self-intersection. A ring that collapses to fewer
/// than three distinct points is treated as self-intersecting.
fn ring_self_intersects(coords: &[Coord<f64>]) -> bool {
    let mut ring = LineString::from(coords.to_vec());
    ring.close();
    let ring = ring.remove_repeated_points();
    if ring.0.len() < MIN_VERTICES {
        return true;
    }

    let edges: Vec<Line<f64>> = ring.lines().collect();
    let count = edges.len();

    for i in 0..count {
        for j in (i + 1)..count {
            let adjacent = j == i + 1 || (i == 0 && j == count - 1);
            let Some(hit) = line_intersection(edges[i], edges[j]) else {
                continue;
            };
            match hit {
                LineIntersection::SinglePoint { .. } => {
                    if !adjacent {
                        return true;
                    }
                }
                LineIntersection::Collinear { intersection } => {
                    if !adjacent || intersection.start != intersection.end {
                        return true;
                    }
                }
            }
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::coord;

    fn ring(points: &[(f64, f64)]) -> Vec<Coord<f64>> {
        points.iter().map(|&(x, y)| coord! { x: x, y: y }).collect()
    }

    #[test]
    fn test_valid_large_polygon() {
        let coords = ring(&[(0.0, 0.0), (0.001, 0.0), (0.001, 0.001), (0.0, 0.001), (0.0, 0.0)]);
        assert_eq!(validate(&coords), Ok(()));
    }

    #[test]
    fn test_too_few_vertices() {
        let coords = ring(&[(0.0, 0.0), (1.0, 0.0), (0.0, 0.0)]);
        let msg = validate(&coords).unwrap_err();
        assert!(msg.contains("vertices"));
    }

    #[test]
    fn test_area_too_small() {
        let coords = ring(&[
            (0.0, 0.0),
            (0.000001, 0.0),
            (0.000001, 0.000001),
            (0.0, 0.000001),
            (0.0, 0.0),
        ]);
        let msg = validate(&coords).unwrap_err();
        assert!(msg.contains("small"));
        assert!(msg.contains("10 square meters"));
    }

    #[test]
    fn test_self_intersecting_bowtie() {
        let coords = ring(&[(0.0, 0.0), (1.0, 1.0), (1.0, 0.0), (0.0, 1.0), (0.0, 0.0)]);
        let msg = validate(&coords).unwrap_err();
        assert!(msg.to_lowercase().contains("intersect"));
    }

    #[test]
    fn test_vertex_check_runs_first() {
        // Degenerate and tiny, but the vertex message wins.
        let coords = ring(&[(0.0, 0.0), (0.0, 0.0), (0.0, 0.0)]);
        assert_eq!(
            check_polygon(&coords, &Config::default()),
            Err(InvalidPolygon::TooFewVertices)
        );
    }

    #[test]
    fn test_topology_check_runs_before_area() {
        // A tiny bowtie is reported as intersecting, not small.
        let coords = ring(&[
            (0.0, 0.0),
            (0.000001, 0.000001),
            (0.000001, 0.0),
            (0.0, 0.000001),
            (0.0, 0.0),
        ]);
        assert_eq!(
            check_polygon(&coords, &Config::default()),
            Err(InvalidPolygon::SelfIntersection)
        );
    }

    #[test]
    fn test_repeated_vertices_allowed() {
        let coords = ring(&[
            (0.0, 0.0),
            (0.001, 0.0),
            (0.001, 0.0),
            (0.001, 0.001),
            (0.0, 0.001),
            (0.0, 0.0),
        ]);
        assert_eq!(validate(&coords), Ok(()));
    }

    #[test]
    fn test_spike_is_self_intersection() {
        let coords = ring(&[(0.0, 0.0), (0.002, 0.0), (0.001, 0.0), (0.001, 0.001), (0.0, 0.0)]);
        assert_eq!(
            check_polygon(&coords, &Config::default()),
            Err(InvalidPolygon::SelfIntersection)
        );
    }

    #[test]
    fn test_ring_touching_itself_at_vertex() {
        let coords = ring(&[
            (0.0, 0.0),
            (0.002, 0.0),
            (0.001, 0.001),
            (0.002, 0.002),
            (0.0, 0.002),
            (0.001, 0.001),
            (0.0, 0.0),
        ]);
        assert_eq!(
            check_polygon(&coords, &Config::default()),
            Err(InvalidPolygon::SelfIntersection)
        );
    }

    #[test]
    fn test_area_latitude_correction() {
        let equator = ring(&[(0.0, 0.0), (0.001, 0.0), (0.001, 0.001), (0.0, 0.001), (0.0, 0.0)]);
        let north = ring(&[
            (0.0, 60.0),
            (0.001, 60.0),
            (0.001, 60.001),
            (0.0, 60.001),
            (0.0, 60.0),
        ]);
        let at_equator = area_sq_meters(&equator);
        let at_sixty = area_sq_meters(&north);

        // 0.001 deg squared at the equator, with the mean latitude of 5 vertices
        let expected = 0.000001 * METERS_PER_DEGREE * METERS_PER_DEGREE * (0.0004f64).to_radians().cos();
        assert!((at_equator - expected).abs() < 1e-6);
        // cos(60 deg) halves the longitude scale
        assert!((at_sixty / at_equator - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_configurable_min_area() {
        let coords = ring(&[(0.0, 0.0), (0.001, 0.0), (0.001, 0.001), (0.0, 0.001), (0.0, 0.0)]);
        let strict = Config::default().with_min_area(20_000.0);
        let msg = validate_with(&coords, &strict).unwrap_err();
        assert_eq!(msg, "Polygon area is too small. Minimum 20000 square meters required.");
    }
}
