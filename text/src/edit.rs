//! Persistent edits: replace and slice over the document tree.

use crate::builder::from_children;
use crate::node::{leaf_slice, Node};
use std::sync::Arc;
use tracing::trace;

/// Collect the pieces of `node` covering chars `[from, to)` into
/// `out`, in document order. Fully covered children are pushed by
/// reference; only the partially covered boundary leaves are sliced.
pub(crate) fn decompose(node: &Arc<Node>, from: usize, to: usize, out: &mut Vec<Arc<Node>>) {
    if from >= to {
        return;
    }
    if from == 0 && to == node.len() {
        out.push(Arc::clone(node));
        return;
    }
    match &**node {
        Node::Leaf { text, .. } => out.push(Arc::new(leaf_slice(text, from, to))),
        Node::Branch { children, .. } => {
            let mut offset = 0;
            for child in children {
                let end = offset + child.len();
                if from < end && to > offset {
                    decompose(
                        child,
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

/// Replace chars `[from, to)` of `root` with `insert`, reusing the
/// untouched prefix and suffix subtrees. Bounds are validated by the
/// caller.
pub(crate) fn replace(
    root: &Arc<Node>,
    from: usize,
    to: usize,
    insert: &Arc<Node>,
) -> Arc<Node> {
    trace!(from, to, insert = insert.len(), "replace");
    let mut parts = Vec::new();
    decompose(root, 0, from, &mut parts);
    if insert.len() > 0 {
        parts.push(Arc::clone(insert));
    }
    decompose(root, to, root.len(), &mut parts);
    from_children(parts)
}

/// Sub-document for chars `[from, to)`. Bounds are validated by the
/// caller.
pub(crate) fn slice(root: &Arc<Node>, from: usize, to: usize) -> Arc<Node> {
    let mut parts = Vec::new();
    decompose(root, from, to, &mut parts);
    from_children(parts)
}
