//! Reporting utilities: batch summaries, rankings and formatted terminal output.

pub mod format;

use std::collections::BTreeMap;

use crate::app::pipeline::BatchEntry;
use crate::domain::{ClassificationLevel, ClassificationResult};

pub use format::*;

/// Number of successfully classified specimens per level.
pub fn level_counts(entries: &[BatchEntry]) -> BTreeMap<ClassificationLevel, usize> {
    let mut counts = BTreeMap::new();
    for r in entries.iter().filter_map(|e| e.outcome.as_ref().ok()) {
        *counts.entry(r.level).or_insert(0) += 1;
    }
    counts
}

/// The `top_n` highest-EMI results, most anomalous first.
pub fn rank_most_anomalous(entries: &[BatchEntry], top_n: usize) -> Vec<&ClassificationResult> {
    let mut sorted: Vec<&ClassificationResult> = entries.iter().filter_map(|e| e.outcome.as_ref().ok()).collect();
    sorted.sort_by(|a, b| b.emi.partial_cmp(&a.emi).unwrap_or(std::cmp::Ordering::Equal));
    sorted.truncate(top_n);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pipeline::classify_batch;
    use crate::config::EmiConfig;
    use crate::data::sample::{SampleConfig, generate_specimens};
    use crate::reference::MineralGroup;

    #[test]
    fn ranking_is_sorted_and_counts_add_up() {
        let specimens = generate_specimens(&SampleConfig {
            group: MineralGroup::CV,
            count: 8,
            seed: 5,
            scatter: 2.0,
        })
        .unwrap();
        let entries = classify_batch(&specimens, &EmiConfig::default());

        let ranked = rank_most_anomalous(&entries, 3);
        assert_eq!(ranked.len(), 3);
        assert!(ranked.windows(2).all(|w| w[0].emi >= w[1].emi));

        let ok = entries.iter().filter(|e| e.outcome.is_ok()).count();
        assert_eq!(level_counts(&entries).values().sum::<usize>(), ok);
    }
}
