//! Per-term treap: a binary tree with BST order on document ids and
//! max-heap order on term frequencies.
//!
//! The tree is an arena of nodes addressed by index, so that traversal
//! cursors and ancestor stacks can reference nodes without claiming a
//! second ownership of them. A treap is built once per query term from the
//! term's postings and discarded when the query completes.
//!
//! Priorities are term frequencies, not random draws: a monotonic frequency
//! distribution can degrade the tree to a list (the score-bound arithmetic
//! in the traversals depends on priorities being real frequencies, so this
//! is kept). `TreapOptions::random_ties` mixes a random key into
//! equal-priority comparisons only.

use std::cmp::Ordering;

use crate::base::{DocId, IndexError, Result, TermFrequency};
use crate::postings::PostingStore;

/// Index of a node inside its treap's arena.
pub type NodeRef = usize;

#[derive(Clone, Copy)]
struct Node {
    docid: DocId,
    priority: TermFrequency,
    tiebreak: u64,
    left: Option<NodeRef>,
    right: Option<NodeRef>,
}

/// Treap construction options
#[derive(Clone, Copy, Default)]
pub struct TreapOptions {
    /// Break equal-priority merge comparisons with a random key instead of
    /// always keeping the left operand on top. Frequencies stay the primary
    /// priority; only ties are affected.
    pub random_ties: bool,
}

pub struct Treap {
    nodes: Vec<Node>,
    root: Option<NodeRef>,
    height: usize,
    options: TreapOptions,
}

impl Default for Treap {
    fn default() -> Self {
        Self::new()
    }
}

impl Treap {
    pub fn new() -> Self {
        Self::with_options(TreapOptions::default())
    }

    pub fn with_options(options: TreapOptions) -> Self {
        Self {
            nodes: Vec::new(),
            root: None,
            height: 0,
            options,
        }
    }

    /// Builds the treap of one term, checking every posting against the
    /// collection bound. Postings are inserted in ascending document order,
    /// as the index construction step produces them.
    pub fn from_postings(
        store: &PostingStore,
        d_bound: DocId,
        options: TreapOptions,
    ) -> Result<Self> {
        let mut postings = store.postings().to_vec();
        postings.sort_by_key(|p| p.docid);

        let mut treap = Self::with_options(options);
        for posting in postings {
            if posting.docid >= d_bound {
                return Err(IndexError::SentinelCollision {
                    docid: posting.docid,
                    bound: d_bound,
                });
            }
            if posting.frequency == 0 {
                return Err(IndexError::ZeroFrequency {
                    docid: posting.docid,
                });
            }
            treap.insert(posting.docid, posting.frequency)?;
        }
        Ok(treap)
    }

    /// Number of documents in the tree
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> Option<NodeRef> {
        self.root
    }

    /// Longest root-to-leaf edge count, recomputed after each insertion
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn docid(&self, node: NodeRef) -> DocId {
        self.nodes[node].docid
    }

    pub fn priority(&self, node: NodeRef) -> TermFrequency {
        self.nodes[node].priority
    }

    pub fn left(&self, node: NodeRef) -> Option<NodeRef> {
        self.nodes[node].left
    }

    pub fn right(&self, node: NodeRef) -> Option<NodeRef> {
        self.nodes[node].right
    }

    /// Inserts one (document, frequency) pair by splitting the root around
    /// `docid - 1` and merging the halves back around the new node.
    ///
    /// A duplicate document id indicates a corrupted posting store and is
    /// fatal.
    pub fn insert(&mut self, docid: DocId, frequency: TermFrequency) -> Result<()> {
        if docid == 0 {
            return Err(IndexError::ZeroDocument);
        }
        if self.lookup(docid) {
            return Err(IndexError::DuplicateDocument { docid });
        }

        let tiebreak = if self.options.random_ties {
            rand::random()
        } else {
            0
        };
        let node = self.alloc(Node {
            docid,
            priority: frequency,
            tiebreak,
            left: None,
            right: None,
        });

        self.root = match self.root {
            None => Some(node),
            Some(root) => {
                let (left, right) = self.split(Some(root), docid - 1);
                let left = self.merge(left, Some(node));
                self.merge(left, right)
            }
        };
        self.height = self.subtree_height(self.root);
        Ok(())
    }

    /// Smallest document id in the tree, by leftmost descent
    pub fn search_min_id(&self) -> Option<DocId> {
        let mut node = self.root?;
        while let Some(left) = self.nodes[node].left {
            node = left;
        }
        Some(self.nodes[node].docid)
    }

    fn lookup(&self, docid: DocId) -> bool {
        let mut current = self.root;
        while let Some(n) = current {
            current = match docid.cmp(&self.nodes[n].docid) {
                Ordering::Equal => return true,
                Ordering::Less => self.nodes[n].left,
                Ordering::Greater => self.nodes[n].right,
            };
        }
        false
    }

    fn alloc(&mut self, node: Node) -> NodeRef {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Partitions a subtree so that ids <= key end up in the left part and
    /// ids > key in the right part, rewiring child pointers along the
    /// partition boundary.
    fn split(
        &mut self,
        node: Option<NodeRef>,
        key: DocId,
    ) -> (Option<NodeRef>, Option<NodeRef>) {
        let Some(n) = node else {
            return (None, None);
        };
        if self.nodes[n].docid > key {
            let (left, boundary) = self.split(self.nodes[n].left, key);
            self.nodes[n].left = boundary;
            (left, Some(n))
        } else {
            let (boundary, right) = self.split(self.nodes[n].right, key);
            self.nodes[n].right = boundary;
            (Some(n), right)
        }
    }

    /// Merges two subtrees where every id in `left` is smaller than every
    /// id in `right`. The higher-priority root wins; ties keep the left
    /// side on top unless a random tiebreak was mixed in.
    fn merge(&mut self, left: Option<NodeRef>, right: Option<NodeRef>) -> Option<NodeRef> {
        match (left, right) {
            (None, right) => right,
            (left, None) => left,
            (Some(l), Some(r)) => {
                if self.heap_key(l) >= self.heap_key(r) {
                    let merged = self.merge(self.nodes[l].right, Some(r));
                    self.nodes[l].right = merged;
                    Some(l)
                } else {
                    let merged = self.merge(Some(l), self.nodes[r].left);
                    self.nodes[r].left = merged;
                    Some(r)
                }
            }
        }
    }

    fn heap_key(&self, node: NodeRef) -> (TermFrequency, u64) {
        (self.nodes[node].priority, self.nodes[node].tiebreak)
    }

    fn subtree_height(&self, root: Option<NodeRef>) -> usize {
        let Some(root) = root else {
            return 0;
        };
        // Explicit stack: the tree is not guaranteed balanced
        let mut max_depth = 0;
        let mut pending = vec![(root, 0usize)];
        while let Some((node, depth)) = pending.pop() {
            max_depth = max_depth.max(depth);
            if let Some(left) = self.nodes[node].left {
                pending.push((left, depth + 1));
            }
            if let Some(right) = self.nodes[node].right {
                pending.push((right, depth + 1));
            }
        }
        max_depth
    }
}
