use super::{
    cluster::{Cluster, ClusterId},
    expander::expand_cluster,
    neighbors::{find_neighbors, VisitedSet},
};
use crate::{
    config::ClusterConfig,
    event::{index_events, PointEvent, RawCaseRecord},
    filter::CaseEventFilter,
};
use chrono::{NaiveDate, Utc};

/**
 * Drives a cluster detection run.
 *
 * The engine holds nothing but a borrowed configuration. All of the state for a run (the visited
 * set and the work queue) lives inside a single call, so one engine, or many, can be used from as
 * many threads as you like.
 *
 * Cost grows with the square of the number of eligible events, there is no spatial index. Callers
 * that need a deadline have to impose it themselves.
 */
#[derive(Debug, Clone, Copy)]
pub struct ClusterEngine<'c> {
    config: &'c ClusterConfig,
}

impl<'c> ClusterEngine<'c> {
    pub fn new(config: &'c ClusterConfig) -> Self {
        ClusterEngine { config }
    }

    pub fn config(&self) -> &ClusterConfig {
        self.config
    }

    /**
     * Detect clusters in a set of case records.
     *
     * Whether a cluster [is_active](Cluster::is_active) is judged against today's date (UTC), so
     * the same input can give different answers on different days. Use
     * [run_as_of](ClusterEngine::run_as_of) to pin the date.
     */
    pub fn run(&self, records: &[RawCaseRecord]) -> Vec<Cluster> {
        self.run_as_of(records, Utc::now().date_naive())
    }

    /// Detect clusters, judging activity against `today`.
    pub fn run_as_of(&self, records: &[RawCaseRecord], today: NaiveDate) -> Vec<Cluster> {
        let events = self.eligible_events(records);
        self.scan(&events, today)
    }

    /**
     * Filter and flatten records into the events a run works on.
     *
     * The events are sorted by date, oldest first. Events on the same date keep the order they
     * had in `records`.
     */
    pub fn eligible_events(&self, records: &[RawCaseRecord]) -> Vec<PointEvent> {
        let filter = CaseEventFilter::from_config(self.config);
        let eligible = filter.apply(records);

        let mut events = index_events(eligible.iter().copied());
        events.sort_by_key(|e| e.timestamp);

        log::debug!(
            "{} of {} records eligible, {} events",
            eligible.len(),
            records.len(),
            events.len()
        );

        events
    }

    /**
     * Find the clusters in a list of events.
     *
     * Seeds are tried in the order of `events`, so pass them in the order that
     * [eligible_events](ClusterEngine::eligible_events) produces to get the documented oldest
     * first behavior.
     *
     * #Returns
     * The clusters in the order they were found.
     */
    pub fn scan(&self, events: &[PointEvent], today: NaiveDate) -> Vec<Cluster> {
        let config = self.config;
        let mut clusters = vec![];

        // Not enough events to make even one cluster.
        if events.len() < config.min_linked_events.saturating_add(1) {
            log::debug!("only {} events, no clusters possible", events.len());
            return clusters;
        }

        let mut visited = VisitedSet::default();

        for seed in events {
            if visited.contains(&seed.id) {
                continue;
            }

            let direct_neighbors = find_neighbors(seed, events, config, &visited);
            if direct_neighbors.len() < config.min_linked_events {
                // Not a core point, but it may still end up as part of a later cluster.
                log::trace!("event {} has {} neighbors", seed.id, direct_neighbors.len());
                continue;
            }

            let members = expand_cluster(seed, direct_neighbors, events, config, &mut visited);

            if members.len() >= config.min_linked_events {
                let id = ClusterId(clusters.len());
                let members: Vec<PointEvent> = members.into_iter().cloned().collect();

                if let Some(cluster) = Cluster::build(id, members, config, today) {
                    log::debug!(
                        "{} with {} cases at {:.6},{:.6}",
                        cluster.id,
                        cluster.total_cases,
                        cluster.center_lat,
                        cluster.center_lng
                    );
                    clusters.push(cluster);
                }
            }
        }

        clusters
    }

    /**
     * The events that ended up in no cluster at all.
     *
     * #Arguments
     * events - the events the clusters were detected from.
     * clusters - the result of scanning `events`.
     */
    pub fn noise<'a>(events: &'a [PointEvent], clusters: &[Cluster]) -> Vec<&'a PointEvent> {
        let clustered: VisitedSet = clusters
            .iter()
            .flat_map(|c| c.members.iter().map(|m| m.id))
            .collect();

        events
            .iter()
            .filter(|e| !clustered.contains(&e.id))
            .collect()
    }
}

/**
 * Detect clusters in a set of case records.
 *
 * This is the same as `ClusterEngine::new(config).run(records)`. See
 * [ClusterEngine::run] for how the run date affects the result.
 */
pub fn detect_clusters(records: &[RawCaseRecord], config: &ClusterConfig) -> Vec<Cluster> {
    ClusterEngine::new(config).run(records)
}

#[cfg(test)]
mod test {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(location_id: u64, lat: f64, lon: f64, dates: &[NaiveDate]) -> RawCaseRecord {
        RawCaseRecord {
            location_id,
            latitude: lat,
            longitude: lon,
            event_dates: dates.to_vec(),
            disease_label: "Dengue".to_owned(),
            group_id: None,
        }
    }

    fn config() -> ClusterConfig {
        ClusterConfig::default()
            .with_radius_meters(200.0)
            .with_window_days(18)
            .with_min_linked_events(2)
    }

    #[test]
    fn test_events_sorted_stably_by_date() {
        let records = vec![
            record(1, 0.0, 0.0, &[date(2024, 1, 5), date(2024, 1, 1)]),
            record(2, 0.0, 0.0, &[date(2024, 1, 1)]),
        ];

        let config = config();
        let events = ClusterEngine::new(&config).eligible_events(&records);
        let ids: Vec<_> = events.iter().map(|e| e.id.0).collect();

        assert_eq!(ids, vec![1001, 2000, 1000]);
    }

    #[test]
    fn test_oldest_core_point_seeds_first() {
        // Two separate groups, the one listed second starts earlier and is found first.
        let records = vec![
            record(1, 10.0, 10.0, &[date(2024, 3, 1), date(2024, 3, 2), date(2024, 3, 3)]),
            record(2, -10.0, -10.0, &[date(2024, 1, 1), date(2024, 1, 2), date(2024, 1, 3)]),
        ];

        let config = config();
        let clusters = ClusterEngine::new(&config).run_as_of(&records, date(2024, 3, 5));

        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].id, ClusterId(0));
        assert_eq!(clusters[0].members[0].location_id, 2);
        assert!(!clusters[0].is_active);
        assert_eq!(clusters[1].id, ClusterId(1));
        assert_eq!(clusters[1].members[0].location_id, 1);
        assert!(clusters[1].is_active);
    }

    #[test]
    fn test_too_few_events_short_circuits() {
        let records = vec![record(1, 0.0, 0.0, &[date(2024, 1, 1), date(2024, 1, 2)])];

        let config = config();
        assert!(ClusterEngine::new(&config)
            .run_as_of(&records, date(2024, 1, 2))
            .is_empty());

        let config = config.with_min_linked_events(1);
        assert_eq!(
            ClusterEngine::new(&config)
                .run_as_of(&records, date(2024, 1, 2))
                .len(),
            1
        );
    }

    #[test]
    fn test_noise() {
        let records = vec![
            record(1, 0.0, 0.0, &[date(2024, 1, 1), date(2024, 1, 2), date(2024, 1, 3)]),
            record(2, 5.0, 5.0, &[date(2024, 1, 1)]),
            record(3, 0.0, 0.0, &[date(2024, 6, 1)]),
        ];

        let config = config();
        let engine = ClusterEngine::new(&config);
        let events = engine.eligible_events(&records);
        let clusters = engine.scan(&events, date(2024, 6, 1));

        assert_eq!(clusters.len(), 1);

        let noise: Vec<_> = ClusterEngine::noise(&events, &clusters)
            .iter()
            .map(|e| e.id.0)
            .collect();
        assert_eq!(noise, vec![2000, 3000]);
    }

    #[test]
    fn test_ineligible_records_ignored() {
        let mut flu = record(2, 0.0, 0.0, &[date(2024, 1, 1), date(2024, 1, 2)]);
        flu.disease_label = "Influenza".to_owned();

        let records = vec![record(1, 0.0, 0.0, &[date(2024, 1, 1)]), flu];

        let config = config();
        assert!(ClusterEngine::new(&config)
            .run_as_of(&records, date(2024, 1, 1))
            .is_empty());

        let config = config.with_diseases(["dengue", "influenza"]);
        let clusters = ClusterEngine::new(&config).run_as_of(&records, date(2024, 1, 1));
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].total_cases, 3);
    }
}
