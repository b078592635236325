/// Byte-keyed prefix trie used as the storage of dictionary slots.
///
/// Nodes live in an arena and are addressed by a `TriePosition`, so a
/// traversal can be suspended at any node and resumed later by keeping the
/// position around. Children are kept sorted by byte, which makes `foreach`
/// enumerate keys in lexicographic order.
///
/// # Example
/// ```
/// use libchinese_core::trie::{Trie, TRIE_ROOT};
///
/// let mut trie = Trie::new();
/// trie.set(b"nei", 1.0f32);
/// trie.set(b"neihou", 2.0f32);
///
/// let pos = trie.traverse(TRIE_ROOT, b"nei").unwrap();
/// assert_eq!(trie.value_at(pos), Some(1.0));
///
/// let mut keys = Vec::new();
/// trie.foreach(pos, |key, _| {
///     keys.push(key.to_vec());
///     true
/// });
/// assert_eq!(keys, vec![b"nei".to_vec(), b"neihou".to_vec()]);
/// ```
use fst::{Map, MapBuilder, Streamer};

/// Position of a node inside a `Trie`.
pub type TriePosition = usize;

/// Position of the root node of every trie.
pub const TRIE_ROOT: TriePosition = 0;

#[derive(Debug, Clone)]
struct Node<V> {
    children: Vec<(u8, TriePosition)>,
    value: Option<V>,
    parent: TriePosition,
    byte: u8,
}

impl<V> Node<V> {
    fn new(parent: TriePosition, byte: u8) -> Self {
        Self {
            children: Vec::new(),
            value: None,
            parent,
            byte,
        }
    }

    fn child(&self, byte: u8) -> Option<TriePosition> {
        self.children
            .binary_search_by_key(&byte, |&(b, _)| b)
            .ok()
            .map(|i| self.children[i].1)
    }
}

#[derive(Debug, Clone)]
pub struct Trie<V> {
    nodes: Vec<Node<V>>,
    len: usize,
}

impl<V: Copy> Default for Trie<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Copy> Trie<V> {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(TRIE_ROOT, 0)],
            len: 0,
        }
    }

    /// Number of keys holding a value.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Insert or overwrite `key`.
    pub fn set(&mut self, key: &[u8], value: V) {
        let mut pos = TRIE_ROOT;
        for &byte in key {
            pos = match self.nodes[pos].child(byte) {
                Some(child) => child,
                None => {
                    let child = self.nodes.len();
                    self.nodes.push(Node::new(pos, byte));
                    let children = &mut self.nodes[pos].children;
                    let at = children.partition_point(|&(b, _)| b < byte);
                    children.insert(at, (byte, child));
                    child
                }
            };
        }
        if self.nodes[pos].value.replace(value).is_none() {
            self.len += 1;
        }
    }

    /// Exact lookup.
    pub fn get(&self, key: &[u8]) -> Option<V> {
        self.traverse(TRIE_ROOT, key)
            .and_then(|pos| self.value_at(pos))
    }

    /// Remove `key`, pruning branches left without any value.
    /// Returns whether the key was present.
    pub fn erase(&mut self, key: &[u8]) -> bool {
        let Some(mut pos) = self.traverse(TRIE_ROOT, key) else {
            return false;
        };
        if self.nodes[pos].value.take().is_none() {
            return false;
        }
        self.len -= 1;
        while pos != TRIE_ROOT
            && self.nodes[pos].value.is_none()
            && self.nodes[pos].children.is_empty()
        {
            let parent = self.nodes[pos].parent;
            let byte = self.nodes[pos].byte;
            self.nodes[parent].children.retain(|&(b, _)| b != byte);
            pos = parent;
        }
        true
    }

    /// Follow `bytes` starting from `pos`. `None` means there is no such path.
    pub fn traverse(&self, pos: TriePosition, bytes: &[u8]) -> Option<TriePosition> {
        let mut pos = pos;
        for &byte in bytes {
            pos = self.nodes.get(pos)?.child(byte)?;
        }
        Some(pos)
    }

    pub fn value_at(&self, pos: TriePosition) -> Option<V> {
        self.nodes.get(pos).and_then(|n| n.value)
    }

    /// Full key leading from the root to `pos`.
    pub fn key_of(&self, pos: TriePosition) -> Vec<u8> {
        let mut key = Vec::new();
        let mut cur = pos;
        while cur != TRIE_ROOT && cur < self.nodes.len() {
            key.push(self.nodes[cur].byte);
            cur = self.nodes[cur].parent;
        }
        key.reverse();
        key
    }

    /// Enumerate every key below `pos` (including `pos` itself) in
    /// lexicographic order. The callback receives the full key from the
    /// root and returns `false` to stop the enumeration.
    ///
    /// Returns `false` if the enumeration was stopped early.
    pub fn foreach<F>(&self, pos: TriePosition, mut callback: F) -> bool
    where
        F: FnMut(&[u8], V) -> bool,
    {
        if pos >= self.nodes.len() {
            return true;
        }
        let mut key = self.key_of(pos);
        self.foreach_from(pos, &mut key, &mut callback)
    }

    fn foreach_from<F>(&self, pos: TriePosition, key: &mut Vec<u8>, callback: &mut F) -> bool
    where
        F: FnMut(&[u8], V) -> bool,
    {
        let node = &self.nodes[pos];
        if let Some(value) = node.value {
            if !callback(key, value) {
                return false;
            }
        }
        for &(byte, child) in &node.children {
            key.push(byte);
            let keep_going = self.foreach_from(child, key, callback);
            key.pop();
            if !keep_going {
                return false;
            }
        }
        true
    }

    /// All `(key, value)` pairs in lexicographic key order.
    pub fn entries(&self) -> Vec<(Vec<u8>, V)> {
        let mut out = Vec::with_capacity(self.len);
        self.foreach(TRIE_ROOT, |key, value| {
            out.push((key.to_vec(), value));
            true
        });
        out
    }
}

impl Trie<f32> {
    /// Serialize into an `fst::Map` whose values are the `f32` bit patterns.
    pub fn to_fst_bytes(&self) -> Result<Vec<u8>, fst::Error> {
        let mut builder = MapBuilder::memory();
        for (key, value) in self.entries() {
            builder.insert(&key, u64::from(value.to_bits()))?;
        }
        builder.into_inner()
    }

    /// Rebuild a trie from the bytes produced by `to_fst_bytes`.
    pub fn from_fst_bytes(bytes: Vec<u8>) -> Result<Self, fst::Error> {
        let map = Map::new(bytes)?;
        let mut trie = Trie::new();
        let mut stream = map.stream();
        while let Some((key, value)) = stream.next() {
            // Values above u32::MAX never come out of `to_fst_bytes`.
            let bits = u32::try_from(value).unwrap_or(u32::MAX);
            trie.set(key, f32::from_bits(bits));
        }
        Ok(trie)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_overwrite() {
        let mut trie = Trie::new();
        trie.set(b"ab", 1.0f32);
        trie.set(b"ab", 2.0f32);
        trie.set(b"a", 3.0f32);
        assert_eq!(trie.len(), 2);
        assert_eq!(trie.get(b"ab"), Some(2.0));
        assert_eq!(trie.get(b"a"), Some(3.0));
        assert_eq!(trie.get(b"b"), None);
    }

    #[test]
    fn erase_prunes_empty_branches() {
        let mut trie = Trie::new();
        trie.set(b"abc", 1.0f32);
        trie.set(b"a", 2.0f32);
        assert!(trie.erase(b"abc"));
        assert!(!trie.erase(b"abc"));
        assert_eq!(trie.traverse(TRIE_ROOT, b"ab"), None);
        assert_eq!(trie.get(b"a"), Some(2.0));
        assert_eq!(trie.len(), 1);
    }

    #[test]
    fn foreach_is_sorted_and_stoppable() {
        let mut trie = Trie::new();
        for key in [&b"b"[..], b"ab", b"a", b"abc"] {
            trie.set(key, 0.0f32);
        }
        let keys: Vec<_> = trie.entries().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![b"a".to_vec(), b"ab".to_vec(), b"abc".to_vec(), b"b".to_vec()]);

        let mut seen = 0;
        let finished = trie.foreach(TRIE_ROOT, |_, _| {
            seen += 1;
            seen < 2
        });
        assert!(!finished);
        assert_eq!(seen, 2);
    }

    #[test]
    fn key_of_matches_traversal() {
        let mut trie = Trie::new();
        trie.set(b"\x41\x42\x01word", -1.5f32);
        let pos = trie.traverse(TRIE_ROOT, b"\x41\x42\x01").unwrap();
        assert_eq!(trie.key_of(pos), b"\x41\x42\x01".to_vec());
    }

    #[test]
    fn fst_round_trip_keeps_values() {
        let mut trie = Trie::new();
        trie.set("你".as_bytes(), -2.25f32);
        trie.set(b"abc", 0.0f32);
        trie.set(b"ab", -0.5f32);
        let bytes = trie.to_fst_bytes().unwrap();
        let back = Trie::from_fst_bytes(bytes).unwrap();
        assert_eq!(back.entries(), trie.entries());
    }
}
