use super::neighbors::{find_neighbors, VisitedSet};
use crate::{config::ClusterConfig, event::PointEvent};
use std::collections::VecDeque;

/**
 * Grow a cluster outward from a seed that already passed the core point test.
 *
 * This is a breadth first region grow. Every event reached is absorbed, but only events that
 * have at least `min_linked_events` unvisited neighbors of their own (core points) push those
 * neighbors onto the queue. Border points are absorbed without propagating the cluster.
 *
 * Neighbor counts are always taken against the live `visited` set, so an event's count shrinks
 * as the cluster around it fills in.
 *
 * #Arguments
 * seed - where to start, must not be in `visited` yet.
 * direct_neighbors - the seed's own neighbors, already computed for the core point test.
 * pool - every event taking part in this run.
 * visited - the run's visited set, updated with every absorbed event.
 *
 * #Returns
 * The members in the order they were absorbed, seed first.
 */
pub(crate) fn expand_cluster<'a>(
    seed: &'a PointEvent,
    direct_neighbors: Vec<&'a PointEvent>,
    pool: &'a [PointEvent],
    config: &ClusterConfig,
    visited: &mut VisitedSet,
) -> Vec<&'a PointEvent> {
    let mut members = vec![seed];
    visited.insert(seed.id);

    let mut queue: VecDeque<&'a PointEvent> = direct_neighbors.into();

    while let Some(current) = queue.pop_front() {
        // Queued more than once, or reached through a shorter path.
        if !visited.insert(current.id) {
            continue;
        }

        members.push(current);

        let neighbors = find_neighbors(current, pool, config, visited);
        if neighbors.len() >= config.min_linked_events {
            queue.extend(neighbors);
        }
    }

    members
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::event::EventId;
    use chrono::NaiveDate;

    fn event(id: u64, lat: f64, lon: f64) -> PointEvent {
        PointEvent {
            id: EventId(id),
            location_id: id / 1000,
            latitude: lat,
            longitude: lon,
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            disease_label: "Dengue".to_owned(),
        }
    }

    /// A string of events running north about 150 m apart, so each links only to its neighbors.
    fn chain(n: u64) -> Vec<PointEvent> {
        (0..n)
            .map(|i| event((i + 1) * 1000, i as f64 * 0.00135, 0.0))
            .collect()
    }

    fn ids(members: &[&PointEvent]) -> Vec<u64> {
        members.iter().map(|m| m.id.0).collect()
    }

    #[test]
    fn test_chain_grows_with_one_link() {
        let pool = chain(6);
        let config = ClusterConfig::default()
            .with_radius_meters(200.0)
            .with_min_linked_events(1);

        let mut visited = VisitedSet::default();
        let direct = find_neighbors(&pool[0], &pool, &config, &visited);
        let members = expand_cluster(&pool[0], direct, &pool, &config, &mut visited);

        assert_eq!(ids(&members), vec![1000, 2000, 3000, 4000, 5000, 6000]);
        assert_eq!(visited.len(), 6);
    }

    #[test]
    fn test_border_points_do_not_propagate() {
        let pool = chain(4);
        let config = ClusterConfig::default()
            .with_radius_meters(200.0)
            .with_min_linked_events(2);

        let mut visited = VisitedSet::default();
        let direct = find_neighbors(&pool[1], &pool, &config, &visited);
        assert_eq!(direct.len(), 2);

        let members = expand_cluster(&pool[1], direct, &pool, &config, &mut visited);

        // The third event only has one unvisited neighbor left when it is reached, so it joins as
        // a border point and the fourth is never pulled in.
        assert_eq!(ids(&members), vec![2000, 1000, 3000]);
        assert!(!visited.contains(&EventId(4000)));
    }

    #[test]
    fn test_breadth_first_order() {
        // A center with three spokes, the first spoke has one more event beyond it.
        let pool = vec![
            event(1000, 0.0, 0.0),
            event(2000, 0.00135, 0.0),
            event(3000, -0.00135, 0.0),
            event(4000, 0.0, 0.00135),
            event(5000, 0.0027, 0.0),
        ];
        let config = ClusterConfig::default()
            .with_radius_meters(200.0)
            .with_min_linked_events(1);

        let mut visited = VisitedSet::default();
        let direct = find_neighbors(&pool[0], &pool, &config, &visited);
        let members = expand_cluster(&pool[0], direct, &pool, &config, &mut visited);

        assert_eq!(ids(&members), vec![1000, 2000, 3000, 4000, 5000]);
    }
}
