//! Bulk construction and rebalancing of document trees.

use crate::node::{
    char_len, flatten_into, Node, BASE_LEAF, BRANCH_SHIFT, MAX_BRANCH, MAX_LEAF, MAX_LEAF_LINES,
};
use compact_str::CompactString;
use smallvec::{smallvec, SmallVec};
use std::sync::Arc;
use tracing::trace;

/// Per-chunk char target for a document of `total` chars. Scaling the
/// target with the document keeps every branch near `1 << BRANCH_SHIFT`
/// children and the tree depth logarithmic.
pub(crate) fn chunk_target(total: usize) -> usize {
    BASE_LEAF.max(total >> BRANCH_SHIFT)
}

/// Build a balanced tree from validated line strings.
pub(crate) fn build(lines: Vec<CompactString>) -> Arc<Node> {
    let total = lines.iter().map(|line| char_len(line)).sum::<usize>() + lines.len() - 1;
    if total <= MAX_LEAF {
        return Arc::new(Node::leaf(lines));
    }

    let target = chunk_target(total);
    let count = lines.len();
    let mut leaves: Vec<Arc<Node>> = Vec::with_capacity(total / target + 1);
    let mut part: Vec<CompactString> = Vec::new();
    let mut part_len = 0;
    for (i, line) in lines.into_iter().enumerate() {
        part_len += char_len(&line);
        part.push(line);
        if i + 1 == count {
            break;
        }
        part_len += 1;
        if part_len >= target || part.len() >= MAX_LEAF_LINES {
            // The trailing empty line carries the chunk's final
            // separator; the next leaf's first line completes it.
            part.push(CompactString::default());
            leaves.push(Arc::new(Node::leaf(std::mem::take(&mut part))));
            part_len = 0;
        }
    }
    leaves.push(Arc::new(Node::leaf(part)));
    trace!(lines = count, len = total, leaves = leaves.len(), "bulk build");
    from_children(leaves)
}

/// Assemble document pieces into a balanced tree.
///
/// Pieces arrive in document order; adjacent pieces share a line at
/// their boundary. Totals at or below `MAX_LEAF` flatten into a single
/// leaf, small adjacent leaves are spliced together, and the rest are
/// grouped into branches around the chunk target. Already-balanced
/// subtrees of a fitting size pass through untouched.
pub(crate) fn from_children(pieces: Vec<Arc<Node>>) -> Arc<Node> {
    let total: usize = pieces.iter().map(|piece| piece.len()).sum();
    if total <= MAX_LEAF {
        let mut flat: Vec<CompactString> = Vec::new();
        for piece in &pieces {
            flatten_into(piece, &mut flat);
        }
        if flat.is_empty() {
            flat.push(CompactString::default());
        }
        return Arc::new(Node::leaf(flat));
    }

    let mut merged: Vec<Arc<Node>> = Vec::with_capacity(pieces.len());
    for piece in pieces {
        if piece.len() == 0 {
            continue;
        }
        if let Some(last) = merged.last() {
            if last.len() + piece.len() <= MAX_LEAF {
                if let (Node::Leaf { text: a, .. }, Node::Leaf { text: b, .. }) =
                    (&**last, &*piece)
                {
                    let spliced = splice_leaves(a, b);
                    merged.pop();
                    merged.push(spliced);
                    continue;
                }
            }
        }
        merged.push(piece);
    }
    if merged.len() == 1 {
        return merged.remove(0);
    }

    let mut grouper = Grouper::new(chunk_target(total));
    for node in merged {
        grouper.add(node);
    }
    grouper.finish()
}

/// Join two adjacent leaves, merging the line they share at the
/// boundary.
fn splice_leaves(a: &[CompactString], b: &[CompactString]) -> Arc<Node> {
    let mut text: Vec<CompactString> = Vec::with_capacity(a.len() + b.len() - 1);
    text.extend_from_slice(&a[..a.len() - 1]);
    let mut shared = a[a.len() - 1].clone();
    shared.push_str(&b[0]);
    text.push(shared);
    text.extend_from_slice(&b[1..]);
    Arc::new(Node::leaf(text))
}

/// Groups a run of nodes into branch-sized chunks around a target.
struct Grouper {
    target: usize,
    chunks: Vec<Arc<Node>>,
    cur: Vec<Arc<Node>>,
    cur_len: usize,
}

impl Grouper {
    fn new(target: usize) -> Grouper {
        Grouper {
            target,
            chunks: Vec::new(),
            cur: Vec::new(),
            cur_len: 0,
        }
    }

    fn add(&mut self, node: Arc<Node>) {
        // Oversized branches are re-chunked child by child so their
        // right-sized subtrees can be reused directly.
        let descend = if node.len() > self.target * 2 {
            match &*node {
                Node::Branch { children, .. } => Some(children.clone()),
                Node::Leaf { .. } => None,
            }
        } else {
            None
        };
        if let Some(children) = descend {
            for child in children {
                self.add(child);
            }
            return;
        }

        if node.len() >= self.target / 2 && (self.cur_len == 0 || self.cur_len >= self.target / 2)
        {
            self.flush();
            self.chunks.push(node);
        } else {
            if self.cur_len + node.len() > self.target {
                self.flush();
            }
            self.cur_len += node.len();
            self.cur.push(node);
        }
    }

    fn flush(&mut self) {
        self.cur_len = 0;
        match self.cur.len() {
            0 => {},
            1 => {
                if let Some(node) = self.cur.pop() {
                    self.chunks.push(node);
                }
            },
            _ => {
                let group = std::mem::take(&mut self.cur);
                self.chunks.push(from_children(group));
            },
        }
    }

    fn finish(mut self) -> Arc<Node> {
        self.flush();
        let mut chunks = self.chunks;
        while chunks.len() > MAX_BRANCH {
            let mut paired = Vec::with_capacity(chunks.len() / 2 + 1);
            let mut it = chunks.into_iter();
            while let Some(a) = it.next() {
                match it.next() {
                    Some(b) => paired.push(Arc::new(Node::branch(smallvec![a, b]))),
                    None => paired.push(a),
                }
            }
            chunks = paired;
        }
        match chunks.len() {
            0 => Arc::new(Node::leaf(vec![CompactString::default()])),
            1 => chunks.remove(0),
            _ => Arc::new(Node::branch(SmallVec::from_vec(chunks))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_lines(lines: &[&str]) -> Vec<CompactString> {
        lines.iter().map(|s| (*s).into()).collect()
    }

    /// Recompute metadata bottom-up and check structural invariants.
    fn check(node: &Node) -> (usize, usize) {
        match node {
            Node::Leaf { text, len } => {
                assert!(!text.is_empty());
                for line in text {
                    assert!(!line.contains('\n'));
                }
                let expect =
                    text.iter().map(|l| char_len(l)).sum::<usize>() + text.len() - 1;
                assert_eq!(*len, expect);
                (expect, text.len())
            },
            Node::Branch {
                children,
                len,
                lines,
            } => {
                assert!(children.len() >= 2, "underfull branch");
                assert!(children.len() <= MAX_BRANCH, "overfull branch");
                let mut total = 0;
                let mut total_lines = 0;
                for child in children.iter() {
                    assert!(child.len() > 0, "empty child");
                    let (l, ln) = check(child);
                    total += l;
                    total_lines += ln;
                }
                total_lines -= children.len() - 1;
                assert_eq!(*len, total);
                assert_eq!(*lines, total_lines);
                (total, total_lines)
            },
        }
    }

    #[test]
    fn small_input_is_one_leaf() {
        let node = build(to_lines(&["one", "two", "three"]));
        assert_eq!(node.height(), 0);
        assert_eq!(node.len(), 13);
        assert_eq!(node.lines(), 3);
        check(&node);
    }

    #[test]
    fn bulk_build_stays_shallow() {
        let line = "1234567890".repeat(10);
        let lines: Vec<CompactString> = (0..200).map(|_| line.as_str().into()).collect();
        let node = build(lines);
        assert_eq!(node.len(), 200 * 100 + 199);
        assert_eq!(node.lines(), 200);
        assert!(node.height() <= 1, "height {}", node.height());
        check(&node);

        let lines: Vec<CompactString> = (0..2000).map(|_| line.as_str().into()).collect();
        let node = build(lines);
        assert_eq!(node.len(), 2000 * 100 + 1999);
        assert_eq!(node.lines(), 2000);
        assert!(node.height() <= 1, "height {}", node.height());
        check(&node);
    }

    #[test]
    fn bulk_build_round_trips_content() {
        let lines: Vec<CompactString> =
            (0..500).map(|i| format!("line number {i}").into()).collect();
        let expected = lines.join("\n");
        let node = build(lines);
        let mut out = String::new();
        node.slice_into(0, node.len(), &mut out);
        assert_eq!(out, expected);
        check(&node);
    }

    #[test]
    fn deep_documents_stay_logarithmic() {
        let lines: Vec<CompactString> = (0..40_000).map(|i| format!("{i}").into()).collect();
        let node = build(lines);
        assert_eq!(node.lines(), 40_000);
        assert!(node.height() <= 4, "height {}", node.height());
        check(&node);
    }

    #[test]
    fn from_children_flattens_small_totals() {
        let a = Arc::new(Node::leaf(to_lines(&["on"])));
        let b = Arc::new(Node::leaf(to_lines(&["foo", "bar"])));
        let c = Arc::new(Node::leaf(to_lines(&["wo", "three"])));
        let node = from_children(vec![a, b, c]);
        assert_eq!(node.height(), 0);
        let mut out = String::new();
        node.slice_into(0, node.len(), &mut out);
        assert_eq!(out, "onfoo\nbarwo\nthree");
        check(&node);
    }

    #[test]
    fn from_children_drops_empty_pieces() {
        let line = "x".repeat(400);
        let a = Arc::new(Node::leaf(vec![line.as_str().into()]));
        let empty = Arc::new(Node::leaf(vec![CompactString::default()]));
        let b = Arc::new(Node::leaf(vec![line.as_str().into()]));
        let node = from_children(vec![a, empty, b]);
        assert_eq!(node.len(), 800);
        // the empty piece dissolves into the shared boundary line
        assert_eq!(node.lines(), 1);
        check(&node);
    }

    #[test]
    fn single_oversized_line_is_kept_whole() {
        let line = "y".repeat(3000);
        let node = build(vec![line.as_str().into()]);
        assert_eq!(node.height(), 0);
        assert_eq!(node.len(), 3000);
        assert_eq!(node.lines(), 1);
        check(&node);
    }
}
