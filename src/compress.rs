//! Parentheses storage form for built treaps.
//!
//! A treap is viewed as a general tree (the left child becomes the first
//! child, the right child becomes the next sibling, all under a virtual
//! root) and written as its preorder parenthesization: `(` when entering a
//! node, `)` when leaving it, so a childless node reads `()`. This is a
//! write-only archival contract; the live query path never reads it back.

use crate::treap::{NodeRef, Treap};

pub fn parenthesize(treap: &Treap) -> String {
    let mut out = String::with_capacity(2 * (treap.len() + 1));
    out.push('(');
    if let Some(root) = treap.root() {
        write_siblings(treap, root, &mut out);
    }
    out.push(')');
    out
}

/// Writes `node` followed by the chain of its right descendants, which are
/// its next siblings in the general-tree view.
fn write_siblings(treap: &Treap, node: NodeRef, out: &mut String) {
    let mut current = Some(node);
    while let Some(n) = current {
        out.push('(');
        if let Some(left) = treap.left(n) {
            write_siblings(treap, left, out);
        }
        out.push(')');
        current = treap.right(n);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_tree() {
        assert_eq!(parenthesize(&Treap::new()), "()");
    }

    #[test]
    fn test_single_node() {
        let mut treap = Treap::new();
        treap.insert(1, 4).unwrap();
        assert_eq!(parenthesize(&treap), "(())");
    }

    #[test]
    fn test_right_chain_becomes_siblings() {
        // Decreasing priorities: 2 and 3 hang off the right spine of 1
        let mut treap = Treap::new();
        treap.insert(1, 3).unwrap();
        treap.insert(2, 2).unwrap();
        treap.insert(3, 1).unwrap();
        assert_eq!(parenthesize(&treap), "(()()())");
    }

    #[test]
    fn test_left_child_becomes_first_child() {
        // 2 is the root, 1 its left child
        let mut treap = Treap::new();
        treap.insert(1, 1).unwrap();
        treap.insert(2, 5).unwrap();
        assert_eq!(parenthesize(&treap), "((()))");
    }

    #[test]
    fn test_balanced_output() {
        let mut treap = Treap::new();
        for (docid, frequency) in [(71, 4), (163, 1), (326, 1), (332, 1), (365, 3)] {
            treap.insert(docid, frequency).unwrap();
        }
        let encoded = parenthesize(&treap);
        assert_eq!(encoded.len(), 2 * (treap.len() + 1));
        let mut depth = 0i64;
        for c in encoded.chars() {
            depth += if c == '(' { 1 } else { -1 };
            assert!(depth >= 0);
        }
        assert_eq!(depth, 0);
    }
}
