//! Union (logical OR) traversal: the k best documents containing at least
//! one query term. Terms drop out of the query independently as their
//! posting streams exhaust.

use log::debug;

use crate::base::{DocId, Score};
use crate::search::{query_cursors, QueryTreaps, Ranking, Slot, TermCursor, TopDocuments};

/// Traversal state of one union query. Unlike the intersection bound, U is
/// rebuilt per document: it accrues a term's idf-weighted frequency when
/// that term's cursor lands on the document under the cursor, and is
/// cleared whenever the cursor moves to another document. U therefore only
/// ever holds contributions of the document currently under the cursor.
struct UnionTraversal<'a> {
    cursors: Vec<TermCursor<'a>>,
    d: DocId,
    upper: Score,
    threshold: Score,
    results: TopDocuments,
}

impl<'a> UnionTraversal<'a> {
    /// Moves term `t` onto `slot`; the term contributes to U when it lands
    /// on the cursor document itself.
    fn arrive(&mut self, t: usize, slot: Slot) {
        let cursor = &mut self.cursors[t];
        if cursor.slot_id(slot) == self.d {
            self.upper += cursor.idf * cursor.slot_priority(slot);
        }
        cursor.node = slot;
    }

    /// Advances the document cursor: the abandoned document's accruals are
    /// dropped, forecasts move forward with the cursor, and each term pops
    /// the ancestors the new position has passed.
    fn change_doc(&mut self, new_d: DocId) {
        self.d = new_d;
        self.upper = 0.;
        for t in 0..self.cursors.len() {
            self.cursors[t].next_doc = self.cursors[t].next_doc.max(new_d);
            let mut slot = self.cursors[t].node;
            while self.d >= self.cursors[t].top_id() {
                match self.cursors[t].stack.pop() {
                    Some(top) => slot = top,
                    None => break,
                }
            }
            self.arrive(t, slot);
        }
    }

    fn report(&mut self, docid: DocId, score: Score) {
        debug!("Union result: document {} scored {}", docid, score);
        self.threshold = self.results.add(docid, score);
    }

    fn next_stack_doc(&self) -> DocId {
        self.cursors
            .iter()
            .map(|cursor| cursor.top_id())
            .min()
            .expect("at least one cursor")
    }

    fn next_forecast_doc(&self) -> DocId {
        self.cursors
            .iter()
            .map(|cursor| cursor.next_doc)
            .min()
            .expect("at least one cursor")
    }
}

/// Searches for the `top_k` documents containing at least one term of
/// `query`, each ranked by the terms it actually contains.
pub fn search_union(
    query: &[impl AsRef<str>],
    treaps: &QueryTreaps,
    top_k: usize,
    d_bound: DocId,
) -> Ranking {
    let cursors = query_cursors(query, treaps, d_bound);
    if cursors.is_empty() {
        return TopDocuments::new(top_k).into_ranking();
    }

    let mut state = UnionTraversal {
        cursors,
        d: 1,
        upper: 0.,
        threshold: Score::NEG_INFINITY,
        results: TopDocuments::new(top_k),
    };
    // Arrival pass: terms whose first posting is document 1 contribute to
    // it right away
    state.change_doc(1);

    while state.d < d_bound {
        // Exhausted terms leave the query for good; the others carry on
        state.cursors.retain(|cursor| !cursor.stack.is_empty());
        if state.cursors.is_empty() {
            debug!("Union exhausted at document {}", state.d);
            break;
        }

        while state.upper <= state.threshold && state.d < d_bound {
            let next = state.next_stack_doc();
            state.change_doc(next);
        }
        if state.d >= d_bound {
            break;
        }

        // The cursor decision for d is final once no term can still land
        // on it: every term away from d has its forecast beyond d
        let mut is_final = true;
        let mut aligned = 0usize;
        let mut lagging: Option<usize> = None;
        for (t, cursor) in state.cursors.iter().enumerate() {
            if cursor.id() != state.d {
                if cursor.next_doc <= state.d {
                    is_final = false;
                    lagging = Some(t);
                }
            } else {
                aligned += 1;
            }
        }

        if is_final {
            if aligned > 0 {
                let (docid, score) = (state.d, state.upper);
                state.report(docid, score);
                state.change_doc(docid + 1);
            } else {
                // No term lands on d: jump to the earliest forecast
                let next = state.next_forecast_doc();
                state.change_doc(next);
            }
        } else {
            let t = lagging.expect("a lagging term pinned below the cursor");
            let node = state.cursors[t].node;
            if state.d < state.cursors[t].id() {
                match state.cursors[t].left(node) {
                    Some(left) => {
                        state.cursors[t].stack.push(node);
                        state.arrive(t, Slot::Node(left));
                    }
                    // No id between d and the current node: the term is
                    // pinned there
                    None => {
                        state.cursors[t].next_doc = state.cursors[t].id();
                    }
                }
            } else {
                match state.cursors[t].right(node) {
                    Some(right) => state.arrive(t, Slot::Node(right)),
                    None => {
                        let top = state.cursors[t]
                            .stack
                            .pop()
                            .expect("sentinel outlives the traversal");
                        state.arrive(t, top);
                        state.cursors[t].next_doc = state.cursors[t].id();
                    }
                }
            }
        }
    }

    state.results.into_ranking()
}
