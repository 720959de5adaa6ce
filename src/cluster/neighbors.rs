use crate::{
    config::ClusterConfig,
    event::{EventId, PointEvent},
    geo::Geo,
};
use rustc_hash::FxHashSet;

/// The events already absorbed into a cluster during one detection run.
pub type VisitedSet = FxHashSet<EventId>;

/**
 * Are these two events directly linked.
 *
 * Both conditions must hold, and both are inclusive: no more than `window_days` apart in time AND
 * no more than `radius_meters` apart in space.
 */
pub fn are_linked(left: &PointEvent, right: &PointEvent, config: &ClusterConfig) -> bool {
    // The date check is cheap, so it goes first.
    left.days_apart(right) <= config.window_days
        && left.coord().distance_to(right.coord()) <= config.radius_meters
}

/**
 * Find every event in `pool` directly linked to `seed`.
 *
 * The seed itself and anything in `visited` are never returned. The results keep the order of
 * `pool`, they are NOT sorted by distance.
 */
pub fn find_neighbors<'a>(
    seed: &PointEvent,
    pool: &'a [PointEvent],
    config: &ClusterConfig,
    visited: &VisitedSet,
) -> Vec<&'a PointEvent> {
    pool.iter()
        .filter(|other| other.id != seed.id)
        .filter(|other| !visited.contains(&other.id))
        .filter(|other| are_linked(seed, other, config))
        .collect()
}
