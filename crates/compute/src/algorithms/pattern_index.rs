//! Substring occurrence counts over a host's symbol string.
//!
//! Every suffix is inserted into a trie whose nodes live in a flat arena
//! and refer to each other by index. A node's `count` is the number of
//! suffixes passing through it, which equals the number of occurrences of
//! the substring spelled by the path to it. Construction is O(n²) in the
//! string length; strings here are one symbol per analysis bucket.

use crate::symbols::Symbol;

type NodeId = usize;

const ROOT: NodeId = 0;

#[derive(Debug, Clone, Default)]
struct TrieNode {
    children: Vec<(Symbol, NodeId)>,
    count: usize,
}

/// Suffix trie supporting exact-substring occurrence counts.
#[derive(Debug, Clone)]
pub struct PatternIndex {
    nodes: Vec<TrieNode>,
    len: usize,
}

impl PatternIndex {
    pub fn build(symbols: &[Symbol]) -> Self {
        let mut index = Self {
            nodes: vec![TrieNode::default()],
            len: symbols.len(),
        };
        for start in 0..symbols.len() {
            index.insert_suffix(&symbols[start..]);
        }
        index
    }

    fn insert_suffix(&mut self, suffix: &[Symbol]) {
        let mut node = ROOT;
        for &sym in suffix {
            node = match self.child(node, sym) {
                Some(next) => next,
                None => {
                    let next = self.nodes.len();
                    self.nodes.push(TrieNode::default());
                    self.nodes[node].children.push((sym, next));
                    next
                }
            };
            self.nodes[node].count += 1;
        }
    }

    fn child(&self, node: NodeId, sym: Symbol) -> Option<NodeId> {
        self.nodes[node]
            .children
            .iter()
            .find(|(s, _)| *s == sym)
            .map(|(_, id)| *id)
    }

    /// Number of (possibly overlapping) occurrences of `pattern`.
    /// The empty pattern occurs once per position.
    pub fn count(&self, pattern: &[Symbol]) -> usize {
        if pattern.is_empty() {
            return self.len;
        }
        let mut node = ROOT;
        for &sym in pattern {
            match self.child(node, sym) {
                Some(next) => node = next,
                None => return 0,
            }
        }
        self.nodes[node].count
    }

    /// Whether the 3-symbol `window` is unexpected given this index.
    ///
    /// A window that occurs verbatim is expected. Otherwise its count is
    /// estimated from the two overlapping pairs as
    /// `count(ab) * count(bc) / count(b)`; an estimate below one occurrence
    /// marks the window as surprising. Windows containing a gap never are.
    pub fn is_surprising(&self, window: &[Symbol; 3]) -> bool {
        if window.iter().any(|s| s.is_gap()) {
            return false;
        }
        if self.count(window) > 0 {
            return false;
        }
        let middle = self.count(&window[1..2]);
        if middle == 0 {
            return true;
        }
        let expected =
            self.count(&window[0..2]) as f64 * self.count(&window[1..3]) as f64 / middle as f64;
        expected < 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn syms(s: &str) -> Vec<Symbol> {
        s.bytes()
            .map(|b| if b == b'X' { Symbol::GAP } else { Symbol::new((b - b'a') as usize) })
            .collect()
    }

    #[test]
    fn counts_overlapping_occurrences() {
        let idx = PatternIndex::build(&syms("abababc"));
        assert_eq!(idx.count(&syms("a")), 3);
        assert_eq!(idx.count(&syms("ab")), 3);
        assert_eq!(idx.count(&syms("aba")), 2);
        assert_eq!(idx.count(&syms("abc")), 1);
        assert_eq!(idx.count(&syms("ca")), 0);
        assert_eq!(idx.count(&syms("abababc")), 1);
        assert_eq!(idx.count(&syms("abababcd")), 0);
        assert_eq!(idx.count(&[]), 7);
    }

    #[test]
    fn empty_string_has_no_patterns() {
        let idx = PatternIndex::build(&[]);
        assert_eq!(idx.count(&syms("a")), 0);
        assert_eq!(idx.count(&[]), 0);
    }

    #[test]
    fn seen_window_is_not_surprising() {
        let idx = PatternIndex::build(&syms("abcabc"));
        assert!(!idx.is_surprising(&[Symbol::new(0), Symbol::new(1), Symbol::new(2)]));
    }

    #[test]
    fn window_derivable_from_pairs_is_not_surprising() {
        // "aab" never occurs; the pair estimate decides.
        let idx = PatternIndex::build(&syms("aaacabab"));
        let w = [Symbol::new(0), Symbol::new(0), Symbol::new(1)];
        assert_eq!(idx.count(&w), 0);
        // aa=2, ab=2, a=5 -> 0.8 < 1
        assert!(idx.is_surprising(&w));

        let idx = PatternIndex::build(&syms("aaaacabab"));
        assert_eq!(idx.count(&w), 0);
        // aa=3, ab=2, a=6 -> 1.0
        assert!(!idx.is_surprising(&w));
    }

    #[test]
    fn unseen_symbols_are_surprising() {
        let idx = PatternIndex::build(&syms("aaaa"));
        assert!(idx.is_surprising(&[Symbol::new(0), Symbol::new(3), Symbol::new(0)]));
    }

    #[test]
    fn windows_with_gaps_are_ignored() {
        let idx = PatternIndex::build(&syms("aaaa"));
        assert!(!idx.is_surprising(&[Symbol::new(0), Symbol::GAP, Symbol::new(5)]));
    }
}
