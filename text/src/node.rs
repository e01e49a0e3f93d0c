//! Tree nodes and positional queries for the document tree.

use compact_str::CompactString;
use smallvec::SmallVec;
use std::sync::Arc;

/// Documents at or below this length are stored as a single leaf.
pub(crate) const MAX_LEAF: usize = 512;
/// Lower bound on the chunk target used when partitioning a document.
pub(crate) const BASE_LEAF: usize = 256;
/// Lines per leaf stay near this bound in bulk-built trees.
pub(crate) const MAX_LEAF_LINES: usize = 32;
/// Chunk target is `len >> BRANCH_SHIFT`, keeping child counts near
/// `1 << BRANCH_SHIFT` per branch.
pub(crate) const BRANCH_SHIFT: u32 = 5;
/// Branches hold between 2 and roughly this many children.
pub(crate) const MAX_BRANCH: usize = 64;

/// A node in the document tree.
///
/// A leaf holds a run of the document as line strings; the run's
/// chars are the lines joined by single `'\n'` separators. A branch
/// concatenates its children directly: the last line of one child and
/// the first line of the next form a single logical line, so branch
/// boundaries add no separator and share a line.
#[derive(Debug)]
pub(crate) enum Node {
    Leaf {
        /// Line strings; none contains a separator.
        text: Vec<CompactString>,
        /// Char count, including the `text.len() - 1` separators.
        len: usize,
    },
    Branch {
        /// 2+ children, each non-empty.
        children: SmallVec<[Arc<Node>; 4]>,
        /// Sum of child lengths.
        len: usize,
        /// Sum of child line counts minus one per shared boundary.
        lines: usize,
    },
}

impl Node {
    /// Create a leaf from its line strings.
    pub(crate) fn leaf(text: Vec<CompactString>) -> Node {
        debug_assert!(!text.is_empty(), "a leaf holds at least one line");
        let len = text.iter().map(|line| char_len(line)).sum::<usize>() + text.len() - 1;
        Node::Leaf { text, len }
    }

    /// Create a branch over the given children.
    pub(crate) fn branch(children: SmallVec<[Arc<Node>; 4]>) -> Node {
        debug_assert!(children.len() >= 2, "a branch holds at least two children");
        let len = children.iter().map(|child| child.len()).sum();
        let lines =
            children.iter().map(|child| child.lines()).sum::<usize>() - (children.len() - 1);
        Node::Branch {
            children,
            len,
            lines,
        }
    }

    /// Char count of this subtree, including internal separators.
    pub(crate) fn len(&self) -> usize {
        match self {
            Node::Leaf { len, .. } => *len,
            Node::Branch { len, .. } => *len,
        }
    }

    /// Logical line count of this subtree (always >= 1).
    pub(crate) fn lines(&self) -> usize {
        match self {
            Node::Leaf { text, .. } => text.len(),
            Node::Branch { lines, .. } => *lines,
        }
    }

    /// Longest root-to-leaf path in edges; 0 for a lone leaf.
    pub(crate) fn height(&self) -> usize {
        match self {
            Node::Leaf { .. } => 0,
            Node::Branch { children, .. } => {
                children
                    .iter()
                    .map(|child| child.height())
                    .max()
                    .unwrap_or(0)
                    + 1
            },
        }
    }

    /// Absolute offset of the `k`-th separator, `k` in `[1, lines - 1]`.
    pub(crate) fn sep_offset(&self, k: usize) -> usize {
        debug_assert!(k >= 1 && k < self.lines());
        match self {
            Node::Leaf { text, .. } => {
                let mut k = k;
                let mut offset = 0;
                for line in text {
                    offset += char_len(line);
                    if k == 1 {
                        return offset;
                    }
                    k -= 1;
                    offset += 1;
                }
                offset
            },
            Node::Branch { children, .. } => {
                let mut k = k;
                let mut base = 0;
                for child in children {
                    let seps = child.lines() - 1;
                    if k <= seps {
                        return base + child.sep_offset(k);
                    }
                    k -= seps;
                    base += child.len();
                }
                base
            },
        }
    }

    /// Number of separators at offsets strictly below `pos`.
    pub(crate) fn seps_before(&self, pos: usize) -> usize {
        debug_assert!(pos <= self.len());
        match self {
            Node::Leaf { text, .. } => {
                let mut offset = 0;
                let mut count = 0;
                for line in text.iter().take(text.len() - 1) {
                    offset += char_len(line);
                    if offset < pos {
                        count += 1;
                        offset += 1;
                    } else {
                        break;
                    }
                }
                count
            },
            Node::Branch { children, .. } => {
                let mut offset = 0;
                let mut count = 0;
                for child in children {
                    let end = offset + child.len();
                    if pos > end {
                        count += child.lines() - 1;
                        offset = end;
                    } else {
                        count += child.seps_before(pos - offset);
                        break;
                    }
                }
                count
            },
        }
    }

    /// Append chars `[from, to)` of this subtree to `out`.
    pub(crate) fn slice_into(&self, from: usize, to: usize, out: &mut String) {
        debug_assert!(from <= to && to <= self.len());
        if from == to {
            return;
        }
        match self {
            Node::Leaf { text, .. } => {
                let mut offset = 0;
                let mut first = true;
                for line in text {
                    if offset > to {
                        break;
                    }
                    let end = offset + char_len(line);
                    if end >= from {
                        if !first {
                            out.push('\n');
                        }
                        out.push_str(char_slice(
                            line,
                            from.saturating_sub(offset),
                            to.min(end) - offset,
                        ));
                        first = false;
                    }
                    offset = end + 1;
                }
            },
            Node::Branch { children, .. } => {
                let mut offset = 0;
                for child in children {
                    let end = offset + child.len();
                    if from < end && to > offset {
                        child.slice_into(
                            from.saturating_sub(offset),
                            (to - offset).min(child.len()),
                            out,
                        );
                    }
                    if end >= to {
                        break;
                    }
                    offset = end;
                }
            },
        }
    }
}

/// Slice a leaf's line list down to chars `[from, to)`, keeping the
/// partial boundary lines.
pub(crate) fn leaf_slice(text: &[CompactString], from: usize, to: usize) -> Node {
    let mut lines: Vec<CompactString> = Vec::new();
    let mut offset = 0;
    for line in text {
        if offset > to {
            break;
        }
        let end = offset + char_len(line);
        if end >= from {
            lines.push(CompactString::from(char_slice(
                line,
                from.saturating_sub(offset),
                to.min(end) - offset,
            )));
        }
        offset = end + 1;
    }
    if lines.is_empty() {
        lines.push(CompactString::default());
    }
    Node::leaf(lines)
}

/// Append a subtree's lines to `out`, splicing the shared line at
/// each boundary.
pub(crate) fn flatten_into(node: &Node, out: &mut Vec<CompactString>) {
    match node {
        Node::Leaf { text, .. } => {
            let mut lines = text.iter();
            if let Some(first) = lines.next() {
                match out.last_mut() {
                    Some(last) => last.push_str(first),
                    None => out.push(first.clone()),
                }
            }
            out.extend(lines.cloned());
        },
        Node::Branch { children, .. } => {
            for child in children {
                flatten_into(child, out);
            }
        },
    }
}

/// Char count of a line string.
pub(crate) fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Byte index of the `idx`-th char; `s.len()` when `idx` is past the end.
pub(crate) fn char_to_byte(s: &str, idx: usize) -> usize {
    s.char_indices().nth(idx).map(|(b, _)| b).unwrap_or(s.len())
}

/// Subslice by char indices.
pub(crate) fn char_slice(s: &str, from: usize, to: usize) -> &str {
    &s[char_to_byte(s, from)..char_to_byte(s, to)]
}
