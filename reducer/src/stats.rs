// stats.rs — Per-(pass, arg) worked/failed counters for the final report.

use std::collections::HashMap;

/// Accumulated outcome counts for one (pass, arg) pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassCounts {
    pub worked: u64,
    pub failed: u64,
}

/// Append-only statistics accumulator, mutated only by the test manager.
#[derive(Debug, Default)]
pub struct PassStatistic {
    counts: HashMap<(String, String), PassCounts>,
}

impl PassStatistic {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a committed variant.
    pub fn add_worked(&mut self, pass: &str, arg: &str) {
        self.entry(pass, arg).worked += 1;
    }

    /// Record a rejected variant or a pass error.
    pub fn add_failed(&mut self, pass: &str, arg: &str) {
        self.entry(pass, arg).failed += 1;
    }

    pub fn get(&self, pass: &str, arg: &str) -> PassCounts {
        self.counts
            .get(&(pass.to_string(), arg.to_string()))
            .copied()
            .unwrap_or_default()
    }

    /// Results ordered by descending worked count, then pass and arg name,
    /// for the end-of-run report.
    pub fn sorted_results(&self) -> Vec<(&str, &str, PassCounts)> {
        let mut rows: Vec<(&str, &str, PassCounts)> = self
            .counts
            .iter()
            .map(|((pass, arg), counts)| (pass.as_str(), arg.as_str(), *counts))
            .collect();
        rows.sort_by(|a, b| b.2.worked.cmp(&a.2.worked).then(a.0.cmp(b.0)).then(a.1.cmp(b.1)));
        rows
    }

    fn entry(&mut self, pass: &str, arg: &str) -> &mut PassCounts {
        self.counts
            .entry((pass.to_string(), arg.to_string()))
            .or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_accumulate() {
        let mut stats = PassStatistic::new();
        stats.add_worked("lines", "0");
        stats.add_worked("lines", "0");
        stats.add_failed("lines", "0");
        assert_eq!(
            stats.get("lines", "0"),
            PassCounts {
                worked: 2,
                failed: 1
            }
        );
    }

    #[test]
    fn sorted_results_order_by_worked_then_name() {
        let mut stats = PassStatistic::new();
        stats.add_failed("ternary", "b");
        stats.add_worked("lines", "0");
        stats.add_worked("lines", "0");
        stats.add_worked("comments", "0");
        let rows = stats.sorted_results();
        assert_eq!(rows[0].0, "lines");
        assert_eq!(rows[1].0, "comments");
        assert_eq!(rows[2].0, "ternary");
    }
}
