//! Find clusters of notified disease cases that are close together in both space and time.
//!
//! The entry point is [detect_clusters], or a [ClusterEngine] when more control is needed. Case
//! records come from somewhere else, [read_case_records] is provided for CSV files and
//! [KmlFile] for looking at the results on a map.
pub use cluster::{
    are_linked, detect_clusters, find_neighbors, Cluster, ClusterEngine, ClusterId, ClusterList,
    VisitedSet, ACTIVE_WINDOW_DAYS,
};
pub use config::ClusterConfig;
pub use error::{ConfigError, EpiClusterResult, RecordError};
pub use event::{
    index_events, EventId, PointEvent, RawCaseRecord, EVENT_ID_STRIDE, MAX_EVENTS_PER_LOCATION,
};
pub use filter::CaseEventFilter;
pub use geo::{distance_meters, BoundingBox, Coord, Geo, EARTH_RADIUS_METERS};
pub use kml::{KmlFile, KmlWriter};
pub use records::{parse_dates, read_case_records, read_case_records_from};

/**************************************************************************************************
 * Private Implementation
 *************************************************************************************************/
mod cluster;
mod config;
mod error;
mod event;
mod filter;
mod geo;
mod kml;
mod records;
