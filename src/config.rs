/*!
 * Parameters that control which cases are linked into clusters.
 */
use crate::error::ConfigError;

/**
 * Thresholds and eligibility rules for a cluster detection run.
 *
 * The engine never modifies a configuration. It also never validates one, a radius of zero just
 * means nothing links. Use [ClusterConfig::validate] at the edges of a program where the values
 * come from a user.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterConfig {
    /// Maximum distance in meters between two directly linked events (inclusive).
    pub radius_meters: f64,
    /// Maximum number of days between two directly linked events (inclusive).
    pub window_days: i64,
    /// How many *other* events a seed must be directly linked to before a cluster can grow from
    /// it.
    pub min_linked_events: usize,
    /// Case-insensitive substrings, a record is eligible if its disease label contains any one.
    pub disease_allowlist: Vec<String>,
    /// Records belonging to this group are eligible regardless of their disease label.
    pub target_group: Option<u64>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        ClusterConfig {
            radius_meters: 200.0,
            window_days: 18,
            min_linked_events: 2,
            disease_allowlist: vec!["dengue".to_owned(), "zika".to_owned(), "chikungunya".to_owned()],
            target_group: None,
        }
    }
}

impl ClusterConfig {
    pub fn with_radius_meters(mut self, radius_meters: f64) -> Self {
        self.radius_meters = radius_meters;
        self
    }

    pub fn with_window_days(mut self, window_days: i64) -> Self {
        self.window_days = window_days;
        self
    }

    pub fn with_min_linked_events(mut self, min_linked_events: usize) -> Self {
        self.min_linked_events = min_linked_events;
        self
    }

    /// Replace the disease allowlist. Empty entries are dropped, they would match everything.
    pub fn with_diseases<I, S>(mut self, diseases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.disease_allowlist = diseases
            .into_iter()
            .map(Into::into)
            .filter(|d| !d.trim().is_empty())
            .collect();
        self
    }

    pub fn with_target_group(mut self, group: Option<u64>) -> Self {
        self.target_group = group;
        self
    }

    /// Check that the thresholds are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.radius_meters.is_finite() && self.radius_meters > 0.0) {
            return Err(ConfigError {
                msg: "radius_meters must be a positive, finite number",
            });
        }

        if self.window_days <= 0 {
            return Err(ConfigError {
                msg: "window_days must be greater than zero",
            });
        }

        if self.min_linked_events == 0 {
            return Err(ConfigError {
                msg: "min_linked_events must be at least one",
            });
        }

        Ok(())
    }
}
