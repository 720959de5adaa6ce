/*!
 * Case records as delivered by a data source, and the atomic point events derived from them.
 *
 * A [RawCaseRecord] describes a place (usually a household or address) and every date a case was
 * notified there. The engine never works with records directly, [index_events] flattens them into
 * one [PointEvent] per place and date.
 */
use crate::geo::{Coord, Geo};
use chrono::NaiveDate;
use static_assertions::const_assert;
use std::fmt::{self, Display};

/// Event ids are `location_id * EVENT_ID_STRIDE + ordinal`.
pub const EVENT_ID_STRIDE: u64 = 1000;

/// The largest number of dated events a single location can contribute.
pub const MAX_EVENTS_PER_LOCATION: usize = 999;

const_assert!((MAX_EVENTS_PER_LOCATION as u64) < EVENT_ID_STRIDE);

/**
 * A case record as supplied by whatever fetches data for the engine.
 *
 * Coordinates are not validated. Garbage in (NaN or out of range) never links to anything, so
 * those events quietly fall out as noise.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct RawCaseRecord {
    /// Identifier of the physical site that produced the cases.
    pub location_id: u64,
    pub latitude: f64,
    pub longitude: f64,
    /// Every date a case was notified at this location, may be empty.
    pub event_dates: Vec<NaiveDate>,
    /// Free text name of the notified disease.
    pub disease_label: String,
    /// Optional membership in a caller defined group.
    pub group_id: Option<u64>,
}

/// Stable identifier of a [PointEvent], reproducible from the same input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(pub u64);

impl EventId {
    /// `None` if the id doesn't fit in a `u64`, so it would alias a smaller location's ids.
    fn new(location_id: u64, ordinal: usize) -> Option<Self> {
        debug_assert!(ordinal < MAX_EVENTS_PER_LOCATION);
        location_id
            .checked_mul(EVENT_ID_STRIDE)?
            .checked_add(ordinal as u64)
            .map(EventId)
    }
}

impl Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(f, "{}", self.0)
    }
}

/// One notified case at one place on one day.
#[derive(Debug, Clone, PartialEq)]
pub struct PointEvent {
    pub id: EventId,
    pub location_id: u64,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: NaiveDate,
    pub disease_label: String,
}

impl PointEvent {
    /// Whole days between the two events, always positive.
    pub fn days_apart(&self, other: &PointEvent) -> i64 {
        self.timestamp
            .signed_duration_since(other.timestamp)
            .num_days()
            .abs()
    }
}

impl Geo for PointEvent {
    fn coord(&self) -> Coord {
        Coord {
            lat: self.latitude,
            lon: self.longitude,
        }
    }
}

/**
 * Flatten records into one [PointEvent] per (location, event date) pair.
 *
 * Events come out in record order, and within a record in the order of its dates. Ordinals are
 * counted per location across all the records that share it, so ids never repeat.
 *
 * Two kinds of input are logged and skipped rather than given an id that collides with another
 * event's:
 * * dates past the first [MAX_EVENTS_PER_LOCATION] at a location. The cap is one below
 *   [EVENT_ID_STRIDE] on purpose, ordinal 999 would still fit but is never handed out.
 * * every event of a location whose id would overflow a `u64`.
 */
pub fn index_events<'a, I>(records: I) -> Vec<PointEvent>
where
    I: IntoIterator<Item = &'a RawCaseRecord>,
{
    use rustc_hash::FxHashMap as HashMap;

    let mut ordinals: HashMap<u64, usize> = HashMap::default();
    let mut events = vec![];

    for record in records {
        for &timestamp in &record.event_dates {
            let ordinal = ordinals.entry(record.location_id).or_insert(0);

            if *ordinal >= MAX_EVENTS_PER_LOCATION {
                log::warn!(
                    "location {} has more than {} dated events, skipping {}",
                    record.location_id,
                    MAX_EVENTS_PER_LOCATION,
                    timestamp
                );
                continue;
            }

            let id = match EventId::new(record.location_id, *ordinal) {
                Some(id) => id,
                None => {
                    log::warn!(
                        "location {} is too large to number its events, skipping from {}",
                        record.location_id,
                        timestamp
                    );
                    break;
                }
            };

            events.push(PointEvent {
                id,
                location_id: record.location_id,
                latitude: record.latitude,
                longitude: record.longitude,
                timestamp,
                disease_label: record.disease_label.clone(),
            });

            *ordinal += 1;
        }
    }

    events
}
