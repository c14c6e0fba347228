//! Top-k document retrieval over per-term treaps.
//!
//! Each query term gets a treap over its postings, ordered by document id
//! and heap-ordered by term frequency, so that pruned traversals can skip
//! whole id ranges whose best possible score cannot enter the current
//! top-k. Two traversals are provided: intersection (documents containing
//! every term) and union (documents containing at least one term), both
//! scoring with idf-weighted term frequencies.

pub mod base;
pub mod compress;
pub mod postings;
pub mod search;
pub mod treap;
