/*!
 * Decide which case records take part in cluster detection.
 */
use crate::{config::ClusterConfig, event::RawCaseRecord};

/**
 * Selects cluster eligible records.
 *
 * A record is eligible when its disease label contains any allowlist entry (ignoring case), or
 * when it belongs to the target group. An empty allowlist with no target group selects nothing.
 */
#[derive(Debug, Clone)]
pub struct CaseEventFilter {
    /// Lower cased allowlist entries.
    patterns: Vec<String>,
    target_group: Option<u64>,
}

impl CaseEventFilter {
    pub fn new(disease_allowlist: &[String], target_group: Option<u64>) -> Self {
        let patterns = disease_allowlist
            .iter()
            .map(|d| d.to_lowercase())
            .collect();

        CaseEventFilter {
            patterns,
            target_group,
        }
    }

    pub fn from_config(config: &ClusterConfig) -> Self {
        Self::new(&config.disease_allowlist, config.target_group)
    }

    /// Is this record cluster eligible.
    pub fn accepts(&self, record: &RawCaseRecord) -> bool {
        if self.target_group.is_some() && record.group_id == self.target_group {
            return true;
        }

        let label = record.disease_label.to_lowercase();
        self.patterns.iter().any(|p| label.contains(p.as_str()))
    }

    /// The eligible subset of `records`, in their original order.
    pub fn apply<'a>(&self, records: &'a [RawCaseRecord]) -> Vec<&'a RawCaseRecord> {
        records.iter().filter(|r| self.accepts(r)).collect()
    }
}
