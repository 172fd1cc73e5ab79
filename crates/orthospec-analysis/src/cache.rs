//! Caller-owned memoization of analysis results by specification digest.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use orthospec_dsl::digest::spec_digest_v1;
use orthospec_dsl::PatternGraph;

use crate::result::AnalysisResult;

pub struct AnalysisCache {
    entries: HashMap<String, Arc<AnalysisResult>>,
    lru: VecDeque<String>,
    max_entries: usize,
    hits: usize,
    misses: usize,
}

impl AnalysisCache {
    const DEFAULT_MAX_ENTRIES: usize = 32;

    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            lru: VecDeque::new(),
            max_entries: max_entries.max(1),
            hits: 0,
            misses: 0,
        }
    }

    /// Analyze `graph`, or return the result computed earlier for an identical
    /// specification.
    pub fn get_or_analyze(&mut self, graph: &PatternGraph) -> Arc<AnalysisResult> {
        let key = spec_digest_v1(graph.spec());
        if let Some(hit) = self.entries.get(&key).cloned() {
            self.hits += 1;
            self.touch(&key);
            return hit;
        }

        self.misses += 1;
        let result = Arc::new(crate::analyze(graph));
        self.insert(key, result.clone());
        result
    }

    pub fn get(&self, digest: &str) -> Option<Arc<AnalysisResult>> {
        self.entries.get(digest).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.lru.clear();
    }

    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.lru.iter().position(|k| k == key) {
            self.lru.remove(pos);
        }
        self.lru.push_back(key.to_string());
    }

    fn insert(&mut self, key: String, value: Arc<AnalysisResult>) {
        self.entries.insert(key.clone(), value);
        self.touch(&key);
        while self.lru.len() > self.max_entries {
            if let Some(oldest) = self.lru.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }
}

impl Default for AnalysisCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_ENTRIES)
    }
}
