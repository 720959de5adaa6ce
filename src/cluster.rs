/*!
 * Types and functions for finding clusters.
 *
 * A cluster is a group of case events chained together by direct links, where two events are
 * linked when they are close in space AND close in time. Clusters grow outward from core points
 * (events with enough links of their own) the way DBSCAN does. Events that never join a cluster
 * are noise.
 */

pub use cluster::{Cluster, ClusterId, ACTIVE_WINDOW_DAYS};
pub use cluster_list::ClusterList;
pub use engine::{detect_clusters, ClusterEngine};
pub use neighbors::{are_linked, find_neighbors, VisitedSet};

mod cluster;
mod cluster_list;
mod engine;
mod expander;
mod neighbors;
