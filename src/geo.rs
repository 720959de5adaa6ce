/*!
 * Geographic calculations.
 *
 * Everything here treats the Earth as a sphere and latitude/longitude as plain WGS84 degrees.
 * No reprojection is ever done. Case clusters are small compared to the radius of the Earth, so
 * the simple approximations are plenty.
 */
use std::fmt::{self, Display};

/// Mean radius of the Earth used for all distance calculations.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/**
 * The simple great circle (haversine) distance calculation.
 *
 * Symmetric in its arguments and zero when both points are the same. There is no validation of
 * the inputs, NaN in means NaN out, and NaN never compares less than or equal to anything.
 *
 * #Arguments
 * * lat1 - the latitude of the first point in degrees.
 * * lon1 - the longitude of the first point in degrees.
 * * lat2 - the latitude of the second point in degrees.
 * * lon2 - the longitude of the second point in degrees.
 *
 * #Returns
 * The distance between the points in meters.
 */
pub fn distance_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_r = lat1.to_radians();
    let lon1_r = lon1.to_radians();
    let lat2_r = lat2.to_radians();
    let lon2_r = lon2.to_radians();

    let dlat2 = (lat2_r - lat1_r) / 2.0;
    let dlon2 = (lon2_r - lon1_r) / 2.0;

    let sin2_dlat = f64::powi(f64::sin(dlat2), 2);
    let sin2_dlon = f64::powi(f64::sin(dlon2), 2);

    // Clamp so rounding can't push the argument of asin past 1 for antipodal points.
    let h = (sin2_dlat + sin2_dlon * f64::cos(lat1_r) * f64::cos(lat2_r)).min(1.0);
    let arc = 2.0 * f64::asin(f64::sqrt(h));

    arc * EARTH_RADIUS_METERS
}

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coord {
    pub lat: f64,
    pub lon: f64,
}

impl Coord {
    /// Great circle distance to another coordinate in meters.
    pub fn distance_to(&self, other: Coord) -> f64 {
        distance_meters(self.lat, self.lon, other.lat, other.lon)
    }

    /// Are these coordinates within `eps` degrees of each other in both directions.
    pub fn is_close(&self, other: Coord, eps: f64) -> bool {
        (self.lat - other.lat).abs() <= eps && (self.lon - other.lon).abs() <= eps
    }

    /**
     * The point reached by travelling `distance` meters from here along a great circle.
     *
     * #Arguments
     * * bearing - the initial direction of travel in degrees clockwise from north.
     * * distance - how far to go in meters.
     */
    pub fn destination(&self, bearing: f64, distance: f64) -> Coord {
        let lat1 = self.lat.to_radians();
        let lon1 = self.lon.to_radians();
        let bearing = bearing.to_radians();
        let arc = distance / EARTH_RADIUS_METERS;

        let lat2 = f64::asin(lat1.sin() * arc.cos() + lat1.cos() * arc.sin() * bearing.cos());
        let lon2 = lon1
            + f64::atan2(
                bearing.sin() * arc.sin() * lat1.cos(),
                arc.cos() - lat1.sin() * lat2.sin(),
            );

        // Normalize the longitude back into -180 to 180.
        let lon = (lon2.to_degrees() + 540.0) % 360.0 - 180.0;

        Coord {
            lat: lat2.to_degrees(),
            lon,
        }
    }

    /**
     * The arithmetic mean of a group of coordinates.
     *
     * This is a planar mean, not a geodesic one. Returns `None` for an empty iterator.
     */
    pub fn mean<I: IntoIterator<Item = Coord>>(coords: I) -> Option<Coord> {
        let (lat_sum, lon_sum, count) = coords
            .into_iter()
            .fold((0.0, 0.0, 0usize), |(lat, lon, n), c| {
                (lat + c.lat, lon + c.lon, n + 1)
            });

        if count == 0 {
            return None;
        }

        Some(Coord {
            lat: lat_sum / count as f64,
            lon: lon_sum / count as f64,
        })
    }
}

impl Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(f, "({:.6}, {:.6})", self.lat, self.lon)
    }
}

/// A latitude/longitude aligned box described by its lower left and upper right corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub ll: Coord,
    pub ur: Coord,
}

impl BoundingBox {
    /// The smallest box containing all the coordinates, `None` if there are none.
    pub fn from_coords<I: IntoIterator<Item = Coord>>(coords: I) -> Option<Self> {
        let mut coords = coords.into_iter();
        let first = coords.next()?;

        let bbox = coords.fold(
            BoundingBox {
                ll: first,
                ur: first,
            },
            |mut bbox, c| {
                bbox.ll.lat = bbox.ll.lat.min(c.lat);
                bbox.ll.lon = bbox.ll.lon.min(c.lon);
                bbox.ur.lat = bbox.ur.lat.max(c.lat);
                bbox.ur.lon = bbox.ur.lon.max(c.lon);
                bbox
            },
        );

        Some(bbox)
    }

    /// Check if a coordinate is inside the box. Points on the edges are inside.
    pub fn contains(&self, coord: Coord, eps: f64) -> bool {
        coord.lat >= self.ll.lat - eps
            && coord.lat <= self.ur.lat + eps
            && coord.lon >= self.ll.lon - eps
            && coord.lon <= self.ur.lon + eps
    }
}

impl Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(f, "{} <---> {}", self.ll, self.ur)
    }
}

/// Anything that can be located with a single representative coordinate.
pub trait Geo {
    fn coord(&self) -> Coord;
}

impl Geo for Coord {
    fn coord(&self) -> Coord {
        *self
    }
}
