//! Segment trie over compiled patterns.
//!
//! Every pattern is inserted segment by segment; routes hang off the node
//! reached by their last segment. Matching walks the trie once per path
//! and visits each `(node, position)` pair at most once, so the cost
//! grows with the trie size and the path length, not with the number of
//! registered routes.

use crate::pattern::{Pattern, Segment};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default, Clone)]
struct Node {
    literals: HashMap<String, usize>,
    single: Option<usize>,
    multi: Option<usize>,
    routes: Vec<u64>,
}

#[derive(Debug, Clone)]
pub(crate) struct Trie {
    nodes: Vec<Node>,
}

impl Default for Trie {
    fn default() -> Self {
        Self {
            nodes: vec![Node::default()],
        }
    }
}

impl Trie {
    pub(crate) fn insert(&mut self, pattern: &Pattern, seq: u64) {
        let mut at = 0;
        for segment in pattern.segments() {
            at = match segment {
                Segment::Literal(lit) => match self.nodes[at].literals.get(lit).copied() {
                    Some(child) => child,
                    None => {
                        let child = self.push_node();
                        self.nodes[at].literals.insert(lit.clone(), child);
                        child
                    }
                },
                Segment::Single => match self.nodes[at].single {
                    Some(child) => child,
                    None => {
                        let child = self.push_node();
                        self.nodes[at].single = Some(child);
                        child
                    }
                },
                Segment::Multi => match self.nodes[at].multi {
                    Some(child) => child,
                    None => {
                        let child = self.push_node();
                        self.nodes[at].multi = Some(child);
                        child
                    }
                },
            };
        }
        self.nodes[at].routes.push(seq);
    }

    fn push_node(&mut self) -> usize {
        self.nodes.push(Node::default());
        self.nodes.len() - 1
    }

    /// Sequence numbers of every route whose pattern matches `path`,
    /// unordered and without duplicates.
    pub(crate) fn matching(&self, path: &[&str]) -> HashSet<u64> {
        let mut found = HashSet::new();
        let mut visited = HashSet::new();
        let mut stack = vec![(0usize, 0usize)];

        while let Some((at, pos)) = stack.pop() {
            if !visited.insert((at, pos)) {
                continue;
            }
            let node = &self.nodes[at];

            if let Some(multi) = node.multi {
                // `**` may swallow any number of the remaining segments.
                for next in pos..=path.len() {
                    stack.push((multi, next));
                }
            }

            if pos == path.len() {
                found.extend(node.routes.iter().copied());
                continue;
            }

            if let Some(&child) = node.literals.get(path[pos]) {
                stack.push((child, pos + 1));
            }
            if let Some(single) = node.single {
                stack.push((single, pos + 1));
            }
        }

        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trie(patterns: &[&str]) -> Trie {
        let mut t = Trie::default();
        for (i, p) in patterns.iter().enumerate() {
            t.insert(&Pattern::parse(p).unwrap(), i as u64);
        }
        t
    }

    fn hits(t: &Trie, path: &str) -> Vec<u64> {
        let parts: Vec<&str> = path.split('.').collect();
        let mut v: Vec<u64> = t.matching(&parts).into_iter().collect();
        v.sort();
        v
    }

    #[test]
    fn shared_prefixes_share_nodes() {
        let t = trie(&["user.created", "user.deleted", "user.*"]);
        // root, user, created, deleted, *
        assert_eq!(t.nodes.len(), 5);
    }

    #[test]
    fn collects_all_matching_routes() {
        let t = trie(&["user.created", "user.*", "user.**", "order.*", "**"]);
        assert_eq!(hits(&t, "user.created"), vec![0, 1, 2, 4]);
        assert_eq!(hits(&t, "user"), vec![2, 4]);
        assert_eq!(hits(&t, "user.created.extra"), vec![2, 4]);
        assert_eq!(hits(&t, "order.placed"), vec![3, 4]);
    }

    #[test]
    fn same_pattern_twice_keeps_both() {
        let t = trie(&["a.b", "a.b"]);
        assert_eq!(hits(&t, "a.b"), vec![0, 1]);
    }

    #[test]
    fn multi_in_the_middle() {
        let t = trie(&["a.**.z"]);
        assert_eq!(hits(&t, "a.z"), vec![0]);
        assert_eq!(hits(&t, "a.b.c.z"), vec![0]);
        assert!(hits(&t, "a.b.c").is_empty());
    }
}
