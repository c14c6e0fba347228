//! Per-term posting storage and the frequency-form inverted index.

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::base::{DocId, IndexError, Result, Score, TermFrequency};

pub const POSTINGS_CBOR: &str = "postings.cbor";

/// One term occurrence record: document id and in-document frequency
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct Posting {
    pub docid: DocId,
    pub frequency: TermFrequency,
}

impl fmt::Display for Posting {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({},{})", self.docid, self.frequency)
    }
}

/// The postings of a single term.
///
/// The document frequency is the number of stored postings, so the
/// `df == count(postings)` invariant holds by construction. The collection
/// is unordered; once the index is built it is never mutated again and can
/// be read from any number of concurrent queries.
#[derive(Serialize, Deserialize, Clone, Default)]
pub struct PostingStore {
    postings: Vec<Posting>,
}

impl PostingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Document frequency of the term
    pub fn df(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    pub fn postings(&self) -> &[Posting] {
        &self.postings
    }

    fn push(&mut self, posting: Posting) {
        self.postings.push(posting);
    }
}

/// Frequency-form inverted index: one posting store per term, plus the
/// document bound D that doubles as the traversal sentinel id and as the
/// idf numerator.
#[derive(Serialize, Deserialize)]
pub struct PostingIndex {
    terms: HashMap<String, PostingStore>,
    d_bound: DocId,
}

impl PostingIndex {
    /// `d_bound` must be strictly greater than every document id that will
    /// ever be added: the traversals use it as an "end of range" marker.
    pub fn new(d_bound: DocId) -> Self {
        Self {
            terms: HashMap::new(),
            d_bound,
        }
    }

    pub fn d_bound(&self) -> DocId {
        self.d_bound
    }

    /// Number of indexed terms
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn term(&self, term: &str) -> Option<&PostingStore> {
        self.terms.get(term)
    }

    /// Records one term occurrence count for a document.
    ///
    /// Duplicate (term, document) pairs are not detected here; they surface
    /// as a fatal error when the term's treap is built.
    pub fn add_posting(
        &mut self,
        term: &str,
        docid: DocId,
        frequency: TermFrequency,
    ) -> Result<()> {
        if docid == 0 {
            return Err(IndexError::ZeroDocument);
        }
        if docid >= self.d_bound {
            return Err(IndexError::SentinelCollision {
                docid,
                bound: self.d_bound,
            });
        }
        if frequency == 0 {
            return Err(IndexError::ZeroFrequency { docid });
        }
        self.terms
            .entry(term.to_string())
            .or_default()
            .push(Posting { docid, frequency });
        Ok(())
    }

    /// Inverse document frequency, `log10(D / df)`.
    ///
    /// `None` when the term is unknown or carries no postings, so callers
    /// skip the term instead of dividing by zero.
    pub fn idf(&self, term: &str) -> Option<Score> {
        let store = self.terms.get(term)?;
        if store.df() == 0 {
            return None;
        }
        Some((self.d_bound as Score / store.df() as Score).log10())
    }

    pub fn save(&self, folder: &Path) -> Result<()> {
        let path = folder.join(POSTINGS_CBOR);
        let file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        ciborium::ser::into_writer(self, file).map_err(|e| IndexError::Encode(e.to_string()))?;
        Ok(())
    }

    pub fn load(folder: &Path) -> Result<Self> {
        let path = folder.join(POSTINGS_CBOR);
        let file = File::options().read(true).open(path)?;
        ciborium::de::from_reader(file).map_err(|e| IndexError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_df_counts_postings() {
        let mut index = PostingIndex::new(100);
        index.add_posting("rust", 1, 3).unwrap();
        index.add_posting("rust", 7, 1).unwrap();
        index.add_posting("treap", 7, 2).unwrap();

        assert_eq!(index.term("rust").unwrap().df(), 2);
        assert_eq!(index.term("treap").unwrap().df(), 1);
        assert!(index.term("missing").is_none());
    }

    #[test]
    fn test_idf() {
        let mut index = PostingIndex::new(1000);
        index.add_posting("rust", 1, 1).unwrap();
        index.add_posting("rust", 2, 1).unwrap();

        let idf = index.idf("rust").unwrap();
        assert!((idf - (500f64).log10()).abs() < 1e-12);
        assert!(index.idf("missing").is_none());
    }

    #[test]
    fn test_rejects_invalid_postings() {
        let mut index = PostingIndex::new(10);
        assert!(matches!(
            index.add_posting("a", 0, 1),
            Err(IndexError::ZeroDocument)
        ));
        assert!(matches!(
            index.add_posting("a", 10, 1),
            Err(IndexError::SentinelCollision { docid: 10, bound: 10 })
        ));
        assert!(matches!(
            index.add_posting("a", 3, 0),
            Err(IndexError::ZeroFrequency { docid: 3 })
        ));
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = temp_dir::TempDir::new().expect("Could not create temporary directory");
        let mut index = PostingIndex::new(50);
        index.add_posting("alpha", 1, 2).unwrap();
        index.add_posting("alpha", 4, 1).unwrap();
        index.add_posting("beta", 4, 5).unwrap();
        index.save(dir.path()).expect("Error while saving the index");

        let loaded = PostingIndex::load(dir.path()).expect("Error while loading the index");
        assert_eq!(loaded.d_bound(), 50);
        assert_eq!(loaded.term("alpha").unwrap().df(), 2);
        assert_eq!(loaded.term("beta").unwrap().postings()[0].frequency, 5);
    }
}
