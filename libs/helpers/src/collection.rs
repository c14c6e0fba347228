use std::collections::HashMap;

use log::debug;
use rand::{rngs::StdRng, SeedableRng};

use crate::documents::{create_document, term_name, TestDocument};
use treap_index::base::{DocId, Score, TermFrequency};
use treap_index::postings::PostingIndex;

/// A synthetic collection together with its exhaustive ground truth
pub struct TestCollection {
    pub vocabulary_size: usize,
    pub index: PostingIndex,
    /// Per document, the frequency of each term it contains
    pub documents: HashMap<DocId, HashMap<String, TermFrequency>>,
}

impl TestCollection {
    pub fn new(
        vocabulary_size: usize,
        document_count: DocId,
        lambda_words: f32,
        max_words: usize,
        seed: Option<u64>,
    ) -> Self {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        // Document ids start at 1; the sentinel bound is one past the last
        let mut index = PostingIndex::new(document_count + 1);
        let mut documents = HashMap::new();
        for docid in 1..=document_count {
            let document: TestDocument =
                create_document(lambda_words, max_words, vocabulary_size, &mut rng);
            let mut terms = HashMap::new();
            for tc in document.terms.iter() {
                let term = term_name(tc.term_ix);
                index
                    .add_posting(&term, docid, tc.count)
                    .expect("Error while adding a posting");
                terms.insert(term, tc.count);
            }
            documents.insert(docid, terms);
        }
        debug!(
            "Created a collection of {} documents over {} terms",
            document_count, vocabulary_size
        );

        Self {
            vocabulary_size,
            index,
            documents,
        }
    }

    /// The query terms the engine will actually use: indexed terms, first
    /// occurrence kept
    pub fn active_terms(&self, query: &[&str]) -> Vec<String> {
        let mut terms: Vec<String> = Vec::new();
        for term in query {
            if terms.iter().any(|t| t == term) {
                continue;
            }
            if self.index.term(term).is_some() {
                terms.push(term.to_string());
            }
        }
        terms
    }

    fn idf(&self, term: &str) -> Score {
        self.index.idf(term).expect("idf of an indexed term")
    }

    /// Exhaustive reference scores for a conjunctive query
    pub fn expected_intersection(&self, query: &[&str]) -> HashMap<DocId, Score> {
        let terms = self.active_terms(query);
        let mut expected = HashMap::new();
        if terms.is_empty() {
            return expected;
        }
        for (docid, frequencies) in self.documents.iter() {
            if terms.iter().all(|term| frequencies.contains_key(term)) {
                let score = terms
                    .iter()
                    .map(|term| self.idf(term) * frequencies[term] as Score)
                    .sum();
                expected.insert(*docid, score);
            }
        }
        expected
    }

    /// Exhaustive reference scores for a disjunctive query
    pub fn expected_union(&self, query: &[&str]) -> HashMap<DocId, Score> {
        let terms = self.active_terms(query);
        let mut expected = HashMap::new();
        for (docid, frequencies) in self.documents.iter() {
            let score: Score = terms
                .iter()
                .filter_map(|term| {
                    frequencies
                        .get(term)
                        .map(|count| self.idf(term) * *count as Score)
                })
                .sum();
            if terms.iter().any(|term| frequencies.contains_key(term)) {
                expected.insert(*docid, score);
            }
        }
        expected
    }
}
