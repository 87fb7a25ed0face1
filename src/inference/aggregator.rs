use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectSummary {
    pub total_records: u64,
    pub status_counts: BTreeMap<String, u64>,
    pub status_percentages: BTreeMap<String, f64>,
}

pub type SessionSummary = BTreeMap<String, SubjectSummary>;

#[derive(Debug, Clone, Default)]
struct SubjectCounters {
    total: u64,
    counts: BTreeMap<String, u64>,
}

/// 会话级状态统计，按主体名称累计
#[derive(Debug, Clone, Default)]
pub struct SessionAggregator {
    subjects: BTreeMap<String, SubjectCounters>,
}

impl SessionAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_status(&mut self, subject_name: &str, label: &str) {
        let counters = self.subjects.entry(subject_name.to_string()).or_default();
        counters.total += 1;
        *counters.counts.entry(label.to_string()).or_insert(0) += 1;
    }

    /// Recomputed from the live counters on every call.
    pub fn finalize(&self) -> SessionSummary {
        self.subjects
            .iter()
            .filter(|(_, c)| c.total > 0)
            .map(|(name, c)| {
                let status_percentages = c
                    .counts
                    .iter()
                    .map(|(label, count)| {
                        (label.clone(), round2(*count as f64 / c.total as f64 * 100.0))
                    })
                    .collect();
                (
                    name.clone(),
                    SubjectSummary {
                        total_records: c.total,
                        status_counts: c.counts.clone(),
                        status_percentages,
                    },
                )
            })
            .collect()
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seventy_thirty_split() {
        let mut agg = SessionAggregator::new();
        for _ in 0..70 {
            agg.record_status("Bob", "Focused");
        }
        for _ in 0..30 {
            agg.record_status("Bob", "Distracted");
        }
        let summary = agg.finalize();
        let bob = &summary["Bob"];
        assert_eq!(bob.total_records, 100);
        assert_eq!(bob.status_percentages["Focused"], 70.0);
        assert_eq!(bob.status_percentages["Distracted"], 30.0);
    }

    #[test]
    fn finalize_is_idempotent() {
        let mut agg = SessionAggregator::new();
        agg.record_status("Alice", "Focused");
        agg.record_status("Alice", "Confused");
        agg.record_status("Alice", "Confused");
        assert_eq!(agg.finalize(), agg.finalize());
        assert_eq!(agg.finalize()["Alice"].status_percentages["Confused"], 66.67);
    }

    #[test]
    fn empty_session_has_no_subjects() {
        assert!(SessionAggregator::new().finalize().is_empty());
    }
}
