// libjyutping/src/match_state.rs
//
// Per-session memo of dictionary matching.
//
// Three layers:
// - matched paths per graph node (trie positions reached by each syllable
//   path ending at the node), reused while the node survives graph merges
// - per-slot LRU of trie positions keyed by the syllable path string
//   ("nei|hou|"), shared by identical sub-paths anywhere in the input
// - per-slot LRU of resolved words keyed the same way, which skips the trie
//   enumeration entirely
//
// Cached and freshly computed results are interchangeable: the dictionary
// replays cached paths through the same emission code.

use ahash::{AHashMap, AHashSet};
use libchinese_core::{NodeId, TriePosition};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::rc::Rc;

/// Trie positions reached after `size` syllables, each with the number of
/// fuzzy finals used on the way.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TrieNodes {
    pub(crate) positions: Vec<(TriePosition, usize)>,
    pub(crate) size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PathOrigin {
    /// Empty path starting at the node.
    Start,
    /// Copied over a separator segment.
    Carried,
    /// Extended by one syllable ending at the node.
    Extended,
}

#[derive(Debug, Clone)]
pub(crate) struct MatchedPath {
    pub(crate) slot: usize,
    pub(crate) nodes: Rc<TrieNodes>,
    pub(crate) path: Vec<NodeId>,
    pub(crate) origin: PathOrigin,
}

impl MatchedPath {
    /// Number of syllables on the path.
    pub(crate) fn size(&self) -> usize {
        self.nodes.size
    }
}

/// A dictionary word reachable along one syllable path.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MatchResult {
    pub(crate) word: String,
    pub(crate) cost: f32,
    pub(crate) encoded: Vec<u8>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
}

impl CacheStats {
    /// Hit rate as a percentage, `None` before the first lookup.
    pub fn hit_rate(&self) -> Option<f32> {
        let total = self.hits + self.misses;
        if total == 0 {
            None
        } else {
            Some(self.hits as f32 / total as f32 * 100.0)
        }
    }
}

pub struct JyutpingMatchState {
    pub(crate) matched_paths: AHashMap<NodeId, Vec<MatchedPath>>,
    node_caches: Vec<LruCache<String, Rc<TrieNodes>>>,
    match_caches: Vec<LruCache<String, Rc<Vec<MatchResult>>>>,
    node_cache_size: NonZeroUsize,
    match_cache_size: NonZeroUsize,
    revisions: Vec<u64>,
    pub(crate) stats: CacheStats,
}

impl std::fmt::Debug for JyutpingMatchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JyutpingMatchState")
            .field("matched_nodes", &self.matched_paths.len())
            .field("revisions", &self.revisions)
            .field("stats", &self.stats)
            .finish()
    }
}

impl Default for JyutpingMatchState {
    fn default() -> Self {
        Self::new()
    }
}

impl JyutpingMatchState {
    pub fn new() -> Self {
        Self::with_capacity(1024, 2048)
    }

    /// Match state whose LRU caches hold at most the given number of
    /// entries per dictionary slot.
    pub fn with_capacity(node_cache_size: usize, match_cache_size: usize) -> Self {
        Self {
            matched_paths: AHashMap::new(),
            node_caches: Vec::new(),
            match_caches: Vec::new(),
            node_cache_size: NonZeroUsize::new(node_cache_size).unwrap_or(NonZeroUsize::MIN),
            match_cache_size: NonZeroUsize::new(match_cache_size).unwrap_or(NonZeroUsize::MIN),
            revisions: Vec::new(),
            stats: CacheStats::default(),
        }
    }

    /// Drop every memoized path and cache entry.
    pub fn clear(&mut self) {
        self.matched_paths.clear();
        self.node_caches.clear();
        self.match_caches.clear();
    }

    /// Forget matches of the given nodes and of every path crossing them.
    pub fn discard_node(&mut self, nodes: &AHashSet<NodeId>) {
        if nodes.is_empty() {
            return;
        }
        self.matched_paths.retain(|node, _| !nodes.contains(node));
        for paths in self.matched_paths.values_mut() {
            paths.retain(|p| !p.path.iter().any(|n| nodes.contains(n)));
        }
    }

    /// Forget everything derived from dictionary slot `idx`.
    ///
    /// Matched paths mix slots per node, so they are dropped as a whole.
    pub fn discard_dictionary(&mut self, idx: usize) {
        if let Some(cache) = self.node_caches.get_mut(idx) {
            cache.clear();
        }
        if let Some(cache) = self.match_caches.get_mut(idx) {
            cache.clear();
        }
        self.matched_paths.clear();
    }

    /// Compare against the current dictionary revisions and discard what
    /// went stale. Returns whether anything was discarded.
    pub fn sync(&mut self, revisions: &[u64]) -> bool {
        if self.revisions.as_slice() == revisions {
            return false;
        }
        if self.revisions.len() != revisions.len() {
            self.clear();
        } else {
            let stale: Vec<usize> = self
                .revisions
                .iter()
                .zip(revisions)
                .enumerate()
                .filter(|(_, (a, b))| a != b)
                .map(|(i, _)| i)
                .collect();
            for idx in stale {
                self.discard_dictionary(idx);
            }
        }
        tracing::debug!(?revisions, "match state synced with dictionary");
        self.revisions = revisions.to_vec();
        true
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Number of graph nodes with memoized paths.
    pub fn matched_node_count(&self) -> usize {
        self.matched_paths.len()
    }

    pub(crate) fn node_cache(&mut self, slot: usize) -> &mut LruCache<String, Rc<TrieNodes>> {
        while self.node_caches.len() <= slot {
            self.node_caches.push(LruCache::new(self.node_cache_size));
        }
        &mut self.node_caches[slot]
    }

    pub(crate) fn match_cache(
        &mut self,
        slot: usize,
    ) -> &mut LruCache<String, Rc<Vec<MatchResult>>> {
        while self.match_caches.len() <= slot {
            self.match_caches.push(LruCache::new(self.match_cache_size));
        }
        &mut self.match_caches[slot]
    }
}
