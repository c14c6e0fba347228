//! Treap-based top-k retrieval: the capped result buffer, the final
//! ranking, and the per-query state shared by the intersection and union
//! traversals.

pub mod intersection;
pub mod union;

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use log::debug;

use crate::base::{DocId, Result, Score};
use crate::postings::PostingIndex;
use crate::treap::{NodeRef, Treap, TreapOptions};

pub use intersection::search_intersection;
pub use union::search_union;

/// A search function over pre-built query treaps
pub type SearchFn = fn(&[&str], &QueryTreaps, usize, DocId) -> Ranking;

/// A ranked result entry
#[derive(Clone, Copy, Debug)]
pub struct ScoredDocument {
    pub docid: DocId,
    pub score: Score,
}

impl std::fmt::Display for ScoredDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{})", self.docid, self.score)
    }
}

impl PartialEq for ScoredDocument {
    fn eq(&self, other: &Self) -> bool {
        self.score == other.score
    }
}

impl Eq for ScoredDocument {}

impl PartialOrd for ScoredDocument {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScoredDocument {
    // Reversed on score: the binary heap then keeps the worst kept result
    // on top, where eviction reads it in O(1)
    fn cmp(&self, other: &Self) -> Ordering {
        other.score.total_cmp(&self.score)
    }
}

/// Capped buffer of the k best-scored documents seen so far
pub struct TopDocuments {
    heap: BinaryHeap<ScoredDocument>,
    top_k: usize,
}

impl TopDocuments {
    pub fn new(top_k: usize) -> Self {
        Self {
            heap: BinaryHeap::new(),
            top_k,
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Adds a candidate and returns the updated lower bound L: the k-th
    /// best score once k results exist, negative infinity before that.
    pub fn add(&mut self, docid: DocId, score: Score) -> Score {
        if self.heap.len() < self.top_k {
            self.heap.push(ScoredDocument { docid, score });
        } else if self.heap.peek().map_or(false, |worst| worst.score < score) {
            self.heap.pop();
            self.heap.push(ScoredDocument { docid, score });
        }

        if self.heap.len() >= self.top_k {
            self.heap
                .peek()
                .map_or(Score::NEG_INFINITY, |worst| worst.score)
        } else {
            Score::NEG_INFINITY
        }
    }

    /// Consumes the buffer into the final descending ranking
    pub fn into_ranking(self) -> Ranking {
        Ranking(self.heap.into_sorted_vec().into_iter())
    }
}

/// Finite, non-restartable sequence of at most k scored documents in
/// strictly descending score order.
pub struct Ranking(std::vec::IntoIter<ScoredDocument>);

impl Iterator for Ranking {
    type Item = ScoredDocument;

    fn next(&mut self) -> Option<ScoredDocument> {
        self.0.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl ExactSizeIterator for Ranking {}

/// A query term's document frequency and posting treap
pub struct TermTreap {
    pub df: usize,
    pub treap: Treap,
}

/// One treap per query term, built for a single query and discarded with
/// it. The underlying `PostingIndex` stays shared and read-only.
pub type QueryTreaps = HashMap<String, TermTreap>;

/// Builds the per-term treaps for a query against the shared posting
/// index.
///
/// Terms absent from the index are skipped here and contribute nothing to
/// the query; corrupt postings (duplicate documents, ids colliding with
/// the sentinel) surface as errors.
pub fn build_treaps(index: &PostingIndex, query: &[impl AsRef<str>]) -> Result<QueryTreaps> {
    build_treaps_with_options(index, query, TreapOptions::default())
}

pub fn build_treaps_with_options(
    index: &PostingIndex,
    query: &[impl AsRef<str>],
    options: TreapOptions,
) -> Result<QueryTreaps> {
    let mut treaps = QueryTreaps::new();
    for term in query {
        let term = term.as_ref();
        if treaps.contains_key(term) {
            continue;
        }
        let Some(store) = index.term(term) else {
            debug!("Discarding term {:?}: not in the index", term);
            continue;
        };
        let treap = Treap::from_postings(store, index.d_bound(), options)?;
        treaps.insert(
            term.to_string(),
            TermTreap {
                df: store.df(),
                treap,
            },
        );
    }
    Ok(treaps)
}

/// Position of a per-term cursor: a treap node, or the sentinel that marks
/// "past the last document".
#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum Slot {
    Node(NodeRef),
    Sentinel,
}

/// Per-term traversal state: the active node, the ancestor stack pending a
/// re-visit (seeded with the sentinel), and the term's idf weight.
pub(crate) struct TermCursor<'a> {
    treap: &'a Treap,
    pub(crate) idf: Score,
    pub(crate) node: Slot,
    pub(crate) stack: Vec<Slot>,
    /// Earliest document this term can still land on (union forecast)
    pub(crate) next_doc: DocId,
    /// The sentinel id D
    bound: DocId,
}

impl<'a> TermCursor<'a> {
    fn new(treap: &'a Treap, idf: Score, min_id: DocId, bound: DocId) -> Self {
        let root = treap.root().expect("cursors are built on non-empty treaps");
        Self {
            treap,
            idf,
            node: Slot::Node(root),
            stack: vec![Slot::Sentinel],
            next_doc: min_id,
            bound,
        }
    }

    pub(crate) fn slot_id(&self, slot: Slot) -> DocId {
        match slot {
            Slot::Node(n) => self.treap.docid(n),
            Slot::Sentinel => self.bound,
        }
    }

    /// The sentinel carries priority D, an id used as a frequency
    pub(crate) fn slot_priority(&self, slot: Slot) -> Score {
        match slot {
            Slot::Node(n) => self.treap.priority(n) as Score,
            Slot::Sentinel => self.bound as Score,
        }
    }

    /// Document id of the active node
    pub(crate) fn id(&self) -> DocId {
        self.slot_id(self.node)
    }

    pub(crate) fn priority(&self) -> Score {
        self.slot_priority(self.node)
    }

    pub(crate) fn left(&self, slot: Slot) -> Option<NodeRef> {
        match slot {
            Slot::Node(n) => self.treap.left(n),
            Slot::Sentinel => None,
        }
    }

    pub(crate) fn right(&self, slot: Slot) -> Option<NodeRef> {
        match slot {
            Slot::Node(n) => self.treap.right(n),
            Slot::Sentinel => None,
        }
    }

    /// Id of the next ancestor pending a re-visit; one past the bound when
    /// the stack is exhausted.
    pub(crate) fn top_id(&self) -> DocId {
        self.stack
            .last()
            .map_or(self.bound + 1, |slot| self.slot_id(*slot))
    }
}

/// Assembles the traversal cursors for a query, in query order.
///
/// Duplicated terms keep their first occurrence; terms without a treap or
/// without postings are skipped and contribute no score, per the missing
/// term tolerance contract.
pub(crate) fn query_cursors<'a>(
    query: &[impl AsRef<str>],
    treaps: &'a QueryTreaps,
    d_bound: DocId,
) -> Vec<TermCursor<'a>> {
    let mut kept: Vec<&str> = Vec::new();
    let mut cursors = Vec::new();
    for term in query {
        let term = term.as_ref();
        if kept.contains(&term) {
            continue;
        }
        let Some(term_treap) = treaps.get(term) else {
            debug!("Term {:?} has no treap, skipping", term);
            continue;
        };
        if term_treap.df == 0 || term_treap.treap.is_empty() {
            debug!("Term {:?} has no postings, skipping", term);
            continue;
        }
        let min_id = term_treap
            .treap
            .search_min_id()
            .expect("non-empty treap has a minimum");
        let idf = (d_bound as Score / term_treap.df as Score).log10();
        kept.push(term);
        cursors.push(TermCursor::new(&term_treap.treap, idf, min_id, d_bound));
    }
    cursors
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_buffer_threshold() {
        let mut top = TopDocuments::new(3);
        assert_eq!(top.add(0, 0.1), Score::NEG_INFINITY);
        assert_eq!(top.add(1, 0.2), Score::NEG_INFINITY);

        // Third result fills the buffer: L becomes the worst kept score
        let mut threshold = top.add(2, 0.3);
        assert!((threshold - 0.1).abs() < 1e-12, "Expected 0.1 got {}", threshold);

        // Too low to enter
        threshold = top.add(3, 0.05);
        assert!((threshold - 0.1).abs() < 1e-12, "Expected 0.1 got {}", threshold);

        // Evicts the 0.1 entry
        threshold = top.add(4, 0.5);
        assert!((threshold - 0.2).abs() < 1e-12, "Expected 0.2 got {}", threshold);
    }

    #[test]
    fn test_buffer_keeps_k_largest() {
        let top_k = 10;
        let mut rng = rand::thread_rng();

        let mut top = TopDocuments::new(top_k);
        let mut scores: Vec<Score> = Vec::new();
        for docid in 0..10_000u64 {
            let score: Score = rng.gen();
            top.add(docid, score);
            scores.push(score);
        }
        assert_eq!(top.len(), top_k);

        scores.sort_by(|a, b| b.total_cmp(a));
        let observed: Vec<ScoredDocument> = top.into_ranking().collect();
        assert_eq!(observed.len(), top_k);
        for (expected, entry) in scores.iter().zip(observed.iter()) {
            assert_eq!(*expected, entry.score);
        }
    }

    #[test]
    fn test_ranking_is_descending() {
        let mut top = TopDocuments::new(5);
        for (docid, score) in [(1, 0.4), (2, 1.3), (3, 0.9)] {
            top.add(docid, score);
        }
        let ranked: Vec<ScoredDocument> = top.into_ranking().collect();
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].docid, 2);
        assert_eq!(ranked[1].docid, 3);
        assert_eq!(ranked[2].docid, 1);
    }
}
