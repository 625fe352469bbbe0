//! Top-N ranking of entities by a derived metric.
//!
//! Sorting is stable and descending, so entities with equal values keep their
//! input order. Process lists come out of the reader sorted by PID, which makes
//! ties resolve to the lower PID first.

use std::str::FromStr;

use serde::Serialize;

use crate::delta::ProcessUsage;

/// Returns at most `n` items ordered by `metric`, highest first.
///
/// `n` larger than the input returns everything. NaN sorts above every number,
/// as in [`f64::total_cmp`].
pub fn top_n<T, F>(mut items: Vec<T>, metric: F, n: usize) -> Vec<T>
where
    F: Fn(&T) -> f64,
{
    items.sort_by(|a, b| metric(b).total_cmp(&metric(a)));
    items.truncate(n);
    items
}

/// Process ranking criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RankBy {
    /// CPU share over the last interval. New processes have no share yet and are left out.
    Cpu,
    /// Resident set size.
    Memory,
}

impl FromStr for RankBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cpu" => Ok(RankBy::Cpu),
            "memory" | "mem" | "ram" => Ok(RankBy::Memory),
            other => Err(format!("unknown ranking '{}', expected cpu or memory", other)),
        }
    }
}

pub fn rank_processes(usages: Vec<ProcessUsage>, by: RankBy, n: usize) -> Vec<ProcessUsage> {
    match by {
        RankBy::Cpu => {
            let matched: Vec<ProcessUsage> = usages.into_iter().filter(|p| !p.is_new).collect();
            top_n(matched, |p| p.cpu_percent, n)
        }
        RankBy::Memory => top_n(usages, |p| p.rss as f64, n),
    }
}

/// Name-based include/exclude filter. Exclusion wins over inclusion; an empty
/// include list admits everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessFilter {
    pub include_names: Vec<String>,
    pub exclude_names: Vec<String>,
}

impl ProcessFilter {
    pub fn new(include_names: Vec<String>, exclude_names: Vec<String>) -> Self {
        Self {
            include_names,
            exclude_names,
        }
    }

    /// Substring match against the process name.
    pub fn matches(&self, name: &str) -> bool {
        if self.exclude_names.iter().any(|s| name.contains(s.as_str())) {
            return false;
        }
        if !self.include_names.is_empty() {
            return self.include_names.iter().any(|s| name.contains(s.as_str()));
        }
        true
    }

    pub fn apply(&self, usages: Vec<ProcessUsage>) -> Vec<ProcessUsage> {
        if self.include_names.is_empty() && self.exclude_names.is_empty() {
            return usages;
        }
        usages.into_iter().filter(|p| self.matches(&p.name)).collect()
    }
}
