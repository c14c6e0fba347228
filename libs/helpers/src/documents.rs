use rand::{self, RngCore};
use rand_distr::{Distribution, Poisson};
use std::cmp::min;

use treap_index::base::TermFrequency;

pub struct TermCount {
    pub term_ix: usize,
    pub count: TermFrequency,
}

pub struct TestDocument {
    pub terms: Vec<TermCount>,
}

/// Draws a synthetic document: a Poisson number of distinct terms sampled
/// from the vocabulary, each with a Poisson-shaped positive frequency.
pub fn create_document(
    lambda_words: f32,
    max_words: usize,
    vocabulary_size: usize,
    rng: &mut dyn RngCore,
) -> TestDocument {
    let poi = Poisson::new(lambda_words).unwrap();
    let num_words = 1 + poi.sample(rng) as usize;

    let term_ids =
        rand::seq::index::sample(rng, vocabulary_size, min(num_words, max_words)).into_vec();
    let frequencies = Poisson::new(1.5f32).unwrap();

    let mut document = TestDocument { terms: Vec::new() };
    for term_ix in term_ids.iter() {
        document.terms.push(TermCount {
            term_ix: *term_ix,
            count: 1 + frequencies.sample(rng) as TermFrequency,
        })
    }

    document
}

pub fn term_name(term_ix: usize) -> String {
    format!("t{}", term_ix)
}
