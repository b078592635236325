// core/src/trie_dictionary.rs
//
// Indexed collection of byte tries ("slots"). Slot 0 holds the shipped
// system dictionary and slot 1 the user dictionary; more slots can be added.
// Every mutation bumps the slot revision so that caches built on top of a
// slot can tell when they went stale.

use crate::trie::Trie;

/// Slot of the read-only system dictionary.
pub const SYSTEM_DICT: usize = 0;
/// Slot of the user dictionary grown by learning.
pub const USER_DICT: usize = 1;

#[derive(Debug, Clone)]
pub struct TrieDictionary {
    tries: Vec<Trie<f32>>,
    revisions: Vec<u64>,
}

impl Default for TrieDictionary {
    fn default() -> Self {
        Self::new()
    }
}

impl TrieDictionary {
    /// Create a dictionary with the system and user slots, both empty.
    pub fn new() -> Self {
        let mut dict = Self {
            tries: Vec::new(),
            revisions: Vec::new(),
        };
        dict.add_empty_dict();
        dict.add_empty_dict();
        dict
    }

    /// Append an empty slot and return its index.
    pub fn add_empty_dict(&mut self) -> usize {
        self.tries.push(Trie::new());
        self.revisions.push(0);
        self.tries.len() - 1
    }

    /// Drop every slot from `idx` on. The two built-in slots are kept.
    pub fn remove_from(&mut self, idx: usize) {
        let idx = idx.max(USER_DICT + 1);
        if idx < self.tries.len() {
            self.tries.truncate(idx);
            self.revisions.truncate(idx);
        }
    }

    pub fn dict_size(&self) -> usize {
        self.tries.len()
    }

    pub fn trie(&self, idx: usize) -> Option<&Trie<f32>> {
        self.tries.get(idx)
    }

    pub fn tries(&self) -> &[Trie<f32>] {
        &self.tries
    }

    /// Swap in a freshly built trie for `idx`.
    /// Returns `false` if the slot does not exist.
    pub fn replace_trie(&mut self, idx: usize, trie: Trie<f32>) -> bool {
        match self.tries.get_mut(idx) {
            Some(slot) => {
                *slot = trie;
                self.bump(idx);
                true
            }
            None => false,
        }
    }

    /// Insert or overwrite `key` in slot `idx`.
    pub fn add_word(&mut self, idx: usize, key: &[u8], cost: f32) -> bool {
        match self.tries.get_mut(idx) {
            Some(trie) => {
                trie.set(key, cost);
                self.bump(idx);
                true
            }
            None => false,
        }
    }

    pub fn remove_word(&mut self, idx: usize, key: &[u8]) -> bool {
        let removed = self
            .tries
            .get_mut(idx)
            .map(|trie| trie.erase(key))
            .unwrap_or(false);
        if removed {
            self.bump(idx);
        }
        removed
    }

    /// Revision counter of slot `idx`, or `None` for a missing slot.
    pub fn revision(&self, idx: usize) -> Option<u64> {
        self.revisions.get(idx).copied()
    }

    pub fn revisions(&self) -> &[u64] {
        &self.revisions
    }

    fn bump(&mut self, idx: usize) {
        if let Some(rev) = self.revisions.get_mut(idx) {
            *rev += 1;
        }
    }
}
