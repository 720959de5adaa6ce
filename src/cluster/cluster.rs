use crate::{
    config::ClusterConfig,
    event::PointEvent,
    geo::{BoundingBox, Coord, Geo},
};
use chrono::NaiveDate;
use rustc_hash::FxHashSet as HashSet;
use std::fmt::{self, Display};

/// A cluster is active if any member was notified at most this many days before the run date.
pub const ACTIVE_WINDOW_DAYS: i64 = 7;

/// Clusters are reported at least this much larger than the distance to their farthest member.
const RADIUS_PADDING: f64 = 1.1;

/// Identifies a cluster within one detection run, in the order clusters were discovered.
///
/// These are NOT stable across runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClusterId(pub usize);

impl Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(f, "cluster-{}", self.0)
    }
}

/**
 * The aggregate properties of a group of spatially and temporally linked case events.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub id: ClusterId,
    /// Average latitude of the members.
    pub center_lat: f64,
    /// Average longitude of the members.
    pub center_lng: f64,
    /// Distance from the center to the farthest member plus 10%, but never less than the search
    /// radius the cluster was found with.
    pub radius_meters: f64,
    /// Member events in the order they were absorbed into the cluster.
    pub members: Vec<PointEvent>,
    /// The number of events in this cluster.
    pub total_cases: usize,
    /// Earliest and latest event dates.
    pub date_range: (NaiveDate, NaiveDate),
    /// The number of distinct locations among the members.
    pub unique_locations: usize,
    /// Whether any member was notified within [ACTIVE_WINDOW_DAYS] of the run date.
    ///
    /// This depends on WHEN the detection ran, not just on the data. Running the same historical
    /// data again later may flip it to false.
    pub is_active: bool,
}

impl Cluster {
    /**
     * Aggregate a finished list of members into a cluster.
     *
     * #Arguments
     * id - the discovery order id.
     * members - at least one event.
     * config - the configuration the members were linked with.
     * today - the date used to decide if the cluster is still active.
     *
     * #Returns
     * `None` only if `members` is empty.
     */
    pub fn build(
        id: ClusterId,
        members: Vec<PointEvent>,
        config: &ClusterConfig,
        today: NaiveDate,
    ) -> Option<Self> {
        let center = Coord::mean(members.iter().map(Geo::coord))?;

        let max_distance = members
            .iter()
            .map(|m| m.coord().distance_to(center))
            .fold(0.0, f64::max);
        let radius_meters = f64::max(max_distance * RADIUS_PADDING, config.radius_meters);

        let first = members.iter().map(|m| m.timestamp).min()?;
        let last = members.iter().map(|m| m.timestamp).max()?;

        let unique_locations = members
            .iter()
            .map(|m| m.location_id)
            .collect::<HashSet<_>>()
            .len();

        let is_active = members
            .iter()
            .any(|m| today.signed_duration_since(m.timestamp).num_days() <= ACTIVE_WINDOW_DAYS);

        Some(Cluster {
            id,
            center_lat: center.lat,
            center_lng: center.lon,
            radius_meters,
            total_cases: members.len(),
            members,
            date_range: (first, last),
            unique_locations,
            is_active,
        })
    }

    /// The smallest latitude/longitude box holding every member.
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_coords(self.members.iter().map(Geo::coord)).unwrap_or(BoundingBox {
            ll: self.coord(),
            ur: self.coord(),
        })
    }

    /// Number of days from the first to the last case, inclusive of both.
    pub fn duration_days(&self) -> i64 {
        let (first, last) = self.date_range;
        last.signed_duration_since(first).num_days() + 1
    }
}

impl Geo for Cluster {
    fn coord(&self) -> Coord {
        Coord {
            lat: self.center_lat,
            lon: self.center_lng,
        }
    }
}

impl Display for Cluster {
    #[rustfmt::skip]
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        let (first, last) = self.date_range;

        writeln!(f, "              ID: {}", self.id)?;
        writeln!(f, "          Center: {:.6},{:.6}", self.center_lat, self.center_lng)?;
        writeln!(f, "      Radius (m): {:.0}", self.radius_meters)?;
        writeln!(f, "           Cases: {}", self.total_cases)?;
        writeln!(f, "       Locations: {}", self.unique_locations)?;
        writeln!(f, "      First Case: {}", first)?;
        writeln!(f, "       Last Case: {}", last)?;
        writeln!(f, " Duration (days): {}", self.duration_days())?;
        writeln!(f, "          Active: {}", if self.is_active { "yes" } else { "no" })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::event::EventId;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn event(id: u64, location_id: u64, lat: f64, lon: f64, timestamp: NaiveDate) -> PointEvent {
        PointEvent {
            id: EventId(id),
            location_id,
            latitude: lat,
            longitude: lon,
            timestamp,
            disease_label: "Dengue".to_owned(),
        }
    }

    #[test]
    fn test_build_statistics() {
        let config = ClusterConfig::default().with_radius_meters(200.0);
        let members = vec![
            event(1000, 1, -43.3000, -65.1000, date(2024, 1, 10)),
            event(1001, 1, -43.3000, -65.1000, date(2024, 1, 1)),
            event(2000, 2, -43.3010, -65.1000, date(2024, 1, 17)),
        ];

        let cluster = Cluster::build(ClusterId(4), members, &config, date(2024, 6, 1)).unwrap();

        assert_eq!(cluster.id.to_string(), "cluster-4");
        assert_eq!(cluster.total_cases, 3);
        assert_eq!(cluster.unique_locations, 2);
        assert_eq!(cluster.date_range, (date(2024, 1, 1), date(2024, 1, 17)));
        assert_eq!(cluster.duration_days(), 17);
        assert!(!cluster.is_active);

        assert!((cluster.center_lat - -43.300333333).abs() < 1.0e-6);
        assert!((cluster.center_lng - -65.1).abs() < 1.0e-9);

        // Members are inside the padded radius, and it's never smaller than the search radius.
        assert!(cluster.radius_meters >= config.radius_meters);
        for m in &cluster.members {
            assert!(m.coord().distance_to(cluster.coord()) <= cluster.radius_meters);
        }
    }

    #[test]
    fn test_radius_padding_on_large_cluster() {
        let config = ClusterConfig::default().with_radius_meters(10.0);
        let members = vec![
            event(1000, 1, 0.0, 0.0, date(2024, 1, 1)),
            event(2000, 2, 0.0, 0.01, date(2024, 1, 1)),
        ];

        let cluster = Cluster::build(ClusterId(0), members, &config, date(2024, 1, 1)).unwrap();

        let half_span = crate::geo::distance_meters(0.0, 0.0, 0.0, 0.005);
        assert!((cluster.radius_meters - half_span * 1.1).abs() < 1.0e-6);
    }

    #[test]
    fn test_activity_window() {
        let config = ClusterConfig::default();
        let members = vec![
            event(1000, 1, 0.0, 0.0, date(2024, 3, 1)),
            event(1001, 1, 0.0, 0.0, date(2024, 3, 10)),
        ];

        let active = |today| {
            Cluster::build(ClusterId(0), members.clone(), &config, today)
                .unwrap()
                .is_active
        };

        assert!(active(date(2024, 3, 10)));
        assert!(active(date(2024, 3, 17)));
        assert!(!active(date(2024, 3, 18)));
        // Cases dated after the run date still count.
        assert!(active(date(2024, 2, 1)));
    }

    #[test]
    fn test_empty_members() {
        let config = ClusterConfig::default();
        assert!(Cluster::build(ClusterId(0), vec![], &config, date(2024, 1, 1)).is_none());
    }

    #[test]
    fn test_bounding_box_holds_center() {
        let config = ClusterConfig::default();
        let members = vec![
            event(1000, 1, 10.0, 20.0, date(2024, 1, 1)),
            event(2000, 2, 10.001, 20.002, date(2024, 1, 2)),
            event(3000, 3, 10.002, 20.0, date(2024, 1, 3)),
        ];

        let cluster = Cluster::build(ClusterId(0), members, &config, date(2024, 1, 1)).unwrap();
        let bbox = cluster.bounding_box();

        assert!(bbox.contains(cluster.coord(), 0.0));
        assert_eq!(bbox.ll, Coord { lat: 10.0, lon: 20.0 });
        assert_eq!(bbox.ur, Coord { lat: 10.002, lon: 20.002 });
    }
}
