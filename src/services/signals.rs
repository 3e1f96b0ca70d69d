use std::collections::HashMap;

/// Weight of one search-filter occurrence
pub const SEARCH_WEIGHT: u32 = 1;

/// Weight of one product interaction; touching a product says more than filtering for it
pub const INTERACTION_WEIGHT: u32 = 2;

/// Accumulated weight per label
///
/// Labels remember the order they were first seen in, and ranking is a
/// stable sort, so equal scores rank by first appearance.
#[derive(Debug, Clone, Default)]
pub struct ScoredSignal {
    entries: Vec<(String, u32)>,
    index: HashMap<String, usize>,
}

impl ScoredSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, label: &str, weight: u32) {
        match self.index.get(label) {
            Some(&i) => self.entries[i].1 = self.entries[i].1.saturating_add(weight),
            None => {
                self.index.insert(label.to_string(), self.entries.len());
                self.entries.push((label.to_string(), weight));
            }
        }
    }

    /// Adds `weight` when a label is present, ignores absent labels
    pub fn add_opt(&mut self, label: Option<&str>, weight: u32) {
        if let Some(label) = label {
            self.add(label, weight);
        }
    }

    pub fn score(&self, label: &str) -> u32 {
        self.index
            .get(label)
            .map(|&i| self.entries[i].1)
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All labels with their scores, highest first
    pub fn ranked(&self) -> Vec<(&str, u32)> {
        let mut ranked: Vec<(&str, u32)> = self
            .entries
            .iter()
            .map(|(label, score)| (label.as_str(), *score))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
    }

    /// The `n` highest-scoring labels
    pub fn top(&self, n: usize) -> Vec<String> {
        self.ranked()
            .into_iter()
            .take(n)
            .map(|(label, _)| label.to_string())
            .collect()
    }
}
