use geo::{Coord, Rect};
use serde::{Deserialize, Serialize};

/// An axis-aligned bounding box in decimal degrees.
///
/// The four fields are stored separately so that a persistence layer can
/// index each of them on its own for the candidate pre-filter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// Create a new bounding box from its latitude and longitude extrema.
    ///
    /// # Examples
    ///
    /// ```
    /// use plotguard_types::bbox::BoundingBox;
    ///
    /// let bbox = BoundingBox::new(9.0, 9.1, 38.7, 38.8);
    /// assert_eq!(bbox.min_lon, 38.7);
    /// ```
    pub fn new(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        }
    }

    /// Compute the bounding box of a sequence of `(lon, lat)` coordinates.
    ///
    /// Returns `None` for an empty sequence.
    ///
    /// # Examples
    ///
    /// ```
    /// use geo::coord;
    /// use plotguard_types::bbox::BoundingBox;
    ///
    /// let coords = [
    ///     coord! { x: 38.7, y: 9.0 },
    ///     coord! { x: 38.8, y: 9.0 },
    ///     coord! { x: 38.8, y: 9.1 },
    /// ];
    /// let bbox = BoundingBox::from_coords(coords).unwrap();
    /// assert_eq!(bbox, BoundingBox::new(9.0, 9.1, 38.7, 38.8));
    /// ```
    pub fn from_coords<I>(coords: I) -> Option<Self>
    where
        I: IntoIterator<Item = Coord<f64>>,
    {
        let mut iter = coords.into_iter();
        let first = iter.next()?;
        let mut bbox = Self::new(first.y, first.y, first.x, first.x);
        for coord in iter {
            bbox.min_lat = bbox.min_lat.min(coord.y);
            bbox.max_lat = bbox.max_lat.max(coord.y);
            bbox.min_lon = bbox.min_lon.min(coord.x);
            bbox.max_lon = bbox.max_lon.max(coord.x);
        }
        Some(bbox)
    }

    /// Convert into a `geo::Rect` with `x = longitude`, `y = latitude`.
    pub fn to_rect(&self) -> Rect<f64> {
        Rect::new(
            geo::coord! { x: self.min_lon, y: self.min_lat },
            geo::coord! { x: self.max_lon, y: self.max_lat },
        )
    }

    /// Width in degrees of longitude.
    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    /// Height in degrees of latitude.
    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// Check if a `(lon, lat)` coordinate lies inside or on the box.
    pub fn contains(&self, coord: &Coord<f64>) -> bool {
        coord.x >= self.min_lon
            && coord.x <= self.max_lon
            && coord.y >= self.min_lat
            && coord.y <= self.max_lat
    }

    /// Check if this bounding box intersects with another.
    ///
    /// Boxes that only share an edge or a corner intersect.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        !(self.max_lon < other.min_lon
            || self.min_lon > other.max_lon
            || self.max_lat < other.min_lat
            || self.min_lat > other.max_lat)
    }

    /// Whether all four extrema are finite.
    pub fn is_finite(&self) -> bool {
        [self.min_lat, self.max_lat, self.min_lon, self.max_lon]
            .iter()
            .all(|v| v.is_finite())
    }
}

impl From<Rect<f64>> for BoundingBox {
    fn from(rect: Rect<f64>) -> Self {
        Self::new(rect.min().y, rect.max().y, rect.min().x, rect.max().x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::coord;

    #[test]
    fn test_from_coords_extrema() {
        let coords = vec![
            coord! { x: 0.0, y: 0.0 },
            coord! { x: 1.0, y: -2.0 },
            coord! { x: -3.0, y: 4.0 },
            coord! { x: 0.0, y: 0.0 },
        ];
        let bbox = BoundingBox::from_coords(coords).unwrap();
        assert_eq!(bbox.min_lon, -3.0);
        assert_eq!(bbox.max_lon, 1.0);
        assert_eq!(bbox.min_lat, -2.0);
        assert_eq!(bbox.max_lat, 4.0);
        assert_eq!(bbox.width(), 4.0);
        assert_eq!(bbox.height(), 6.0);
    }

    #[test]
    fn test_from_coords_empty() {
        assert!(BoundingBox::from_coords(Vec::new()).is_none());
    }

    #[test]
    fn test_intersects_is_inclusive() {
        let a = BoundingBox::new(0.0, 1.0, 0.0, 1.0);
        let edge = BoundingBox::new(0.0, 1.0, 1.0, 2.0);
        let corner = BoundingBox::new(1.0, 2.0, 1.0, 2.0);
        let far = BoundingBox::new(10.0, 11.0, 10.0, 11.0);

        assert!(a.intersects(&edge));
        assert!(a.intersects(&corner));
        assert!(!a.intersects(&far));
        assert!(far.intersects(&far));
    }

    #[test]
    fn test_rect_conversion() {
        let bbox = BoundingBox::new(9.0, 9.1, 38.7, 38.8);
        let rect = bbox.to_rect();
        assert_eq!(rect.min().x, 38.7);
        assert_eq!(rect.max().y, 9.1);
        assert_eq!(BoundingBox::from(rect), bbox);
        assert!(bbox.contains(&coord! { x: 38.75, y: 9.05 }));
        assert!(!bbox.contains(&coord! { x: 9.05, y: 38.75 }));
    }

    #[test]
    fn test_serializes_as_plain_fields() {
        let bbox = BoundingBox::new(9.0, 9.1, 38.7, 38.8);
        let json = serde_json::to_value(bbox).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"min_lat": 9.0, "max_lat": 9.1, "min_lon": 38.7, "max_lon": 38.8})
        );
        assert_eq!(serde_json::from_value::<BoundingBox>(json).unwrap(), bbox);
    }
}
