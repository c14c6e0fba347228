pub type DocId = u64;
pub type TermFrequency = u64;
pub type Score = f64;

use thiserror::Error;

/// Errors surfaced while building index structures.
///
/// Traversal-time anomalies (a query term missing from the index, a posting
/// stream running out mid-query) are absorbed by the search algorithms and
/// never reach this type: an empty ranking means "no results", an
/// `IndexError` means the posting data itself is invalid.
#[derive(Error, Debug)]
pub enum IndexError {
    /// The same document was inserted twice for one term.
    #[error("duplicate posting for document {docid}")]
    DuplicateDocument { docid: DocId },

    /// A document id colliding with (or beyond) the sentinel bound D.
    #[error("document {docid} collides with the sentinel bound {bound}")]
    SentinelCollision { docid: DocId, bound: DocId },

    /// Document ids start at 1; 0 is not addressable.
    #[error("document id 0 is reserved")]
    ZeroDocument,

    /// A posting that claims a term occurs zero times.
    #[error("zero frequency recorded for document {docid}")]
    ZeroFrequency { docid: DocId },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("error while encoding the index: {0}")]
    Encode(String),

    #[error("error while decoding the index: {0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, IndexError>;
