//! Codec for the survey tool's vertex format and the polygon text format.
//!
//! The vertex format lists `lat lon alt acc` quadruples separated by `;`.
//! Internally coordinates are always `(lon, lat)`: `x` is longitude, `y` is
//! latitude. Altitude and accuracy are not tracked and serialize as `0`.

use geo::{Coord, LineString};
use once_cell::sync::Lazy;
use plotguard_types::bbox::BoundingBox;
use regex::Regex;

/// Minimum number of vertices before closing.
const MIN_RAW_VERTICES: usize = 3;

/// Longest input prefix echoed into logs.
const LOG_PREVIEW_CHARS: usize = 100;

static POLYGON_TEXT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^\s*POLYGON\s*\(\(\s*(.*?)\s*\)\)\s*$").expect("polygon text pattern")
});

/// Parse the vertex format into a closed `(lon, lat)` ring.
///
/// Returns `None` for empty input, fewer than three vertices, a segment with
/// fewer than two tokens, or any non-numeric coordinate. An unclosed ring is
/// closed by repeating its first vertex.
///
/// # Examples
///
/// ```
/// use plotguard::compute::geoshape::parse_vertex_format;
///
/// let ring = parse_vertex_format("9.0 38.7 0 0; 9.0 38.8 0 0; 9.1 38.8 0 0").unwrap();
/// assert_eq!(ring.0.len(), 4);
/// assert_eq!(ring.0[0].x, 38.7);
/// assert_eq!(ring.0[0].y, 9.0);
/// assert!(parse_vertex_format("not a polygon").is_none());
/// ```
pub fn parse_vertex_format(input: &str) -> Option<LineString<f64>> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    let mut coords = Vec::new();
    for segment in input.split(';').map(str::trim) {
        if segment.is_empty() {
            continue;
        }
        let mut tokens = segment.split_whitespace();
        let (Some(lat), Some(lon)) = (tokens.next(), tokens.next()) else {
            log::warn!("Failed to parse vertex format: {}", preview(input));
            return None;
        };
        let (Some(lat), Some(lon)) = (parse_number(lat), parse_number(lon)) else {
            log::warn!("Failed to parse vertex format: {}", preview(input));
            return None;
        };
        coords.push(Coord { x: lon, y: lat });
    }

    if coords.len() < MIN_RAW_VERTICES {
        return None;
    }

    let mut ring = LineString::new(coords);
    ring.close();
    Some(ring)
}

/// Serialize a ring as `POLYGON((lon lat, lon lat, ...))`.
///
/// # Examples
///
/// ```
/// use geo::coord;
/// use plotguard::compute::geoshape::to_polygon_text;
///
/// let coords = [
///     coord! { x: 0.0, y: 0.0 },
///     coord! { x: 1.0, y: 0.0 },
///     coord! { x: 1.0, y: 1.0 },
///     coord! { x: 0.0, y: 0.0 },
/// ];
/// assert_eq!(to_polygon_text(&coords), "POLYGON((0 0, 1 0, 1 1, 0 0))");
/// ```
pub fn to_polygon_text(coords: &[Coord<f64>]) -> String {
    let pairs = coords
        .iter()
        .map(|c| format!("{} {}", c.x, c.y))
        .collect::<Vec<_>>()
        .join(", ");
    format!("POLYGON(({}))", pairs)
}

/// Parse `POLYGON((lon lat, ...))` back into a ring.
///
/// The ring is closed if needed; vertex count is left to validation so that
/// an edited polygon with too few points gets the proper diagnostic.
pub fn parse_polygon_text(text: &str) -> Option<LineString<f64>> {
    let inner = POLYGON_TEXT_RE.captures(text)?.get(1)?.as_str();
    if inner.is_empty() {
        return None;
    }

    let mut coords = Vec::new();
    for pair in inner.split(',') {
        let mut tokens = pair.split_whitespace();
        let (Some(lon), Some(lat), None) = (tokens.next(), tokens.next(), tokens.next()) else {
            return None;
        };
        coords.push(Coord {
            x: parse_number(lon)?,
            y: parse_number(lat)?,
        });
    }

    let mut ring = LineString::new(coords);
    ring.close();
    Some(ring)
}

/// Serialize a ring back into the vertex format with zeroed altitude and accuracy.
///
/// # Examples
///
/// ```
/// use geo::coord;
/// use plotguard::compute::geoshape::to_vertex_format;
///
/// let coords = [coord! { x: 38.7, y: 9.0 }, coord! { x: 38.8, y: 9.1 }];
/// assert_eq!(to_vertex_format(&coords), "9 38.7 0 0; 9.1 38.8 0 0");
/// ```
pub fn to_vertex_format(coords: &[Coord<f64>]) -> String {
    coords
        .iter()
        .map(|c| format!("{} {} 0 0", c.y, c.x))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Convert stored polygon text into the vertex format for pushing back to
/// the survey platform.
pub fn polygon_text_to_vertex_format(text: &str) -> Option<String> {
    parse_polygon_text(text).map(|ring| to_vertex_format(&ring.0))
}

/// Bounding box of a ring.
pub fn bounding_box(coords: &[Coord<f64>]) -> Option<BoundingBox> {
    BoundingBox::from_coords(coords.iter().copied())
}

fn parse_number(token: &str) -> Option<f64> {
    token.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn preview(input: &str) -> String {
    input.chars().take(LOG_PREVIEW_CHARS).collect()
}
