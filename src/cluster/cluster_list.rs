use crate::{
    cluster::{Cluster, ClusterEngine},
    config::ClusterConfig,
    event::{PointEvent, RawCaseRecord},
};
use chrono::NaiveDate;
use std::fmt::{self, Display};

/**
 * Keep a cluster list with metadata about the case set it was derived from.
 */
#[derive(Debug, Clone)]
pub struct ClusterList {
    /// Where the case records came from, usually a file name.
    pub source: String,
    /// The date activity was judged against.
    pub as_of: NaiveDate,
    /// How many records were supplied.
    pub num_records: usize,
    /// How many eligible events were scanned.
    pub num_events: usize,
    /// Clusters in discovery order.
    pub clusters: Vec<Cluster>,
    /// Eligible events that did not end up in any cluster.
    pub noise: Vec<PointEvent>,
}

impl ClusterList {
    /**
     * Run cluster detection over one case set and keep the results with their metadata.
     *
     * #Arguments
     * source - a name for the case set, only used for reporting.
     * records - the case records.
     * config - the detection configuration.
     * as_of - the date to judge cluster activity against.
     */
    pub fn from_records(
        source: &str,
        records: &[RawCaseRecord],
        config: &ClusterConfig,
        as_of: NaiveDate,
    ) -> Self {
        let engine = ClusterEngine::new(config);

        let events = engine.eligible_events(records);
        let clusters = engine.scan(&events, as_of);
        let noise = ClusterEngine::noise(&events, &clusters)
            .into_iter()
            .cloned()
            .collect();

        ClusterList {
            source: source.to_owned(),
            as_of,
            num_records: records.len(),
            num_events: events.len(),
            clusters,
            noise,
        }
    }

    /// The number of events that ended up in a cluster.
    pub fn num_clustered(&self) -> usize {
        self.clusters.iter().map(|c| c.total_cases).sum()
    }

    pub fn num_active(&self) -> usize {
        self.clusters.iter().filter(|c| c.is_active).count()
    }

    /// The cluster with the most cases, the earliest found wins ties.
    pub fn largest(&self) -> Option<&Cluster> {
        self.clusters
            .iter()
            .rev()
            .max_by_key(|c| c.total_cases)
    }
}

impl Display for ClusterList {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        writeln!(f, "         Source: {}", self.source)?;
        writeln!(f, "          As Of: {}", self.as_of)?;
        writeln!(f, "        Records: {}", self.num_records)?;
        writeln!(f, "Eligible Events: {}", self.num_events)?;
        writeln!(f, "       Clusters: {}", self.clusters.len())?;
        writeln!(f, "Active Clusters: {}", self.num_active())?;
        writeln!(f, "Clustered Cases: {}", self.num_clustered())?;
        writeln!(f, "          Noise: {}", self.noise.len())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(location_id: u64, lat: f64, dates: &[NaiveDate]) -> RawCaseRecord {
        RawCaseRecord {
            location_id,
            latitude: lat,
            longitude: 0.0,
            event_dates: dates.to_vec(),
            disease_label: "dengue".to_owned(),
            group_id: None,
        }
    }

    #[test]
    fn test_summary_counts() {
        let records = vec![
            record(1, 0.0, &[date(2024, 1, 1), date(2024, 1, 2), date(2024, 1, 3)]),
            record(2, 1.0, &[date(2024, 1, 1), date(2024, 1, 2), date(2024, 1, 3)]),
            record(3, 1.0, &[date(2024, 1, 4)]),
            record(4, 2.0, &[date(2024, 1, 1)]),
        ];

        let list =
            ClusterList::from_records("test", &records, &ClusterConfig::default(), date(2024, 1, 11));

        assert_eq!(list.num_records, 4);
        assert_eq!(list.num_events, 8);
        assert_eq!(list.clusters.len(), 2);
        assert_eq!(list.num_clustered(), 7);
        assert_eq!(list.noise.len(), 1);
        assert_eq!(list.noise[0].location_id, 4);
        assert_eq!(list.num_active(), 1);

        let largest = list.largest().unwrap();
        assert_eq!(largest.total_cases, 4);
        assert_eq!(largest.unique_locations, 2);
    }
}
