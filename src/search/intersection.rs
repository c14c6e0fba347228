//! Intersection (logical AND) traversal: the k best documents containing
//! every query term, found by bound-pruned lazy descent over the per-term
//! treaps instead of a posting-list merge.

use log::debug;

use crate::base::{DocId, Score};
use crate::search::{query_cursors, QueryTreaps, Ranking, Slot, TermCursor, TopDocuments};

/// Traversal state of one intersection query: the document cursor d, the
/// optimistic bound U, the pruning threshold L and the per-term cursors.
struct IntersectionTraversal<'a> {
    cursors: Vec<TermCursor<'a>>,
    d: DocId,
    upper: Score,
    threshold: Score,
    results: TopDocuments,
}

impl<'a> IntersectionTraversal<'a> {
    /// Moves term `t` onto `slot`, adjusting U by the priority delta
    fn change_node(&mut self, t: usize, slot: Slot) {
        let cursor = &mut self.cursors[t];
        let delta = cursor.slot_priority(slot) - cursor.priority();
        self.upper += cursor.idf * delta;
        cursor.node = slot;
    }

    /// Advances the document cursor, popping for each term every ancestor
    /// the new cursor position has passed.
    fn change_doc(&mut self, new_d: DocId) {
        self.d = new_d;
        for t in 0..self.cursors.len() {
            let mut slot = self.cursors[t].node;
            while self.d >= self.cursors[t].top_id() {
                match self.cursors[t].stack.pop() {
                    Some(top) => slot = top,
                    None => break,
                }
            }
            self.change_node(t, slot);
        }
    }

    fn report(&mut self, docid: DocId, score: Score) {
        debug!("Intersection result: document {} scored {}", docid, score);
        self.threshold = self.results.add(docid, score);
    }

    /// Earliest ancestor re-entry point over all terms
    fn next_stack_doc(&self) -> DocId {
        self.cursors
            .iter()
            .map(|cursor| cursor.top_id())
            .min()
            .expect("at least one cursor")
    }
}

/// Searches for the `top_k` documents containing every term of `query`,
/// ranked by the sum of idf-weighted term frequencies.
///
/// Terms without a treap contribute nothing and do not constrain the
/// intersection; `d_bound` is the sentinel bound D, strictly greater than
/// every document id.
pub fn search_intersection(
    query: &[impl AsRef<str>],
    treaps: &QueryTreaps,
    top_k: usize,
    d_bound: DocId,
) -> Ranking {
    let cursors = query_cursors(query, treaps, d_bound);
    if cursors.is_empty() {
        return TopDocuments::new(top_k).into_ranking();
    }

    let upper = cursors
        .iter()
        .map(|cursor| cursor.idf * cursor.priority())
        .sum();
    let mut state = IntersectionTraversal {
        cursors,
        d: 1,
        upper,
        threshold: Score::NEG_INFINITY,
        results: TopDocuments::new(top_k),
    };

    while state.d < d_bound {
        // A term whose ancestor stack is exhausted has no candidates left,
        // so no further document can contain every term
        if state.cursors.iter().any(|cursor| cursor.stack.is_empty()) {
            debug!("Intersection exhausted at document {}", state.d);
            break;
        }

        // Nothing at or beyond d can beat the kept results while U <= L:
        // skip to the earliest ancestor re-entry point
        while state.upper <= state.threshold && state.d < d_bound {
            let next = state.next_stack_doc();
            state.change_doc(next);
        }
        if state.d >= d_bound {
            break;
        }

        let lagging = (0..state.cursors.len()).find(|&t| state.cursors[t].id() != state.d);
        match lagging {
            None => {
                // Full alignment: d is in every term's postings and U is
                // exactly its cumulative score
                let (docid, score) = (state.d, state.upper);
                state.report(docid, score);
                state.change_doc(docid + 1);
            }
            Some(t) => {
                let node = state.cursors[t].node;
                if state.d < state.cursors[t].id() {
                    match state.cursors[t].left(node) {
                        Some(left) => {
                            state.cursors[t].stack.push(node);
                            state.change_node(t, Slot::Node(left));
                        }
                        // No id between d and the current node: skip ahead
                        None => {
                            let skip_to = state.cursors[t].id();
                            state.change_doc(skip_to);
                        }
                    }
                } else {
                    match state.cursors[t].right(node) {
                        Some(right) => state.change_node(t, Slot::Node(right)),
                        None => {
                            // The stack bottom holds the sentinel, whose id
                            // exceeds d while the loop runs
                            let top = state.cursors[t]
                                .stack
                                .pop()
                                .expect("sentinel outlives the traversal");
                            state.change_node(t, top);
                            let skip_to = state.cursors[t].id();
                            state.change_doc(skip_to);
                        }
                    }
                }
            }
        }
    }

    state.results.into_ranking()
}
