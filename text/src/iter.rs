//! Cursors over the document: text chunks, line breaks, and lines.

use crate::node::{char_len, char_to_byte, Node};
use compact_str::CompactString;

/// Iteration direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

impl Direction {
    pub(crate) fn sign(self) -> isize {
        match self {
            Direction::Forward => 1,
            Direction::Backward => -1,
        }
    }

    pub(crate) fn reversed(self) -> Direction {
        match self {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        }
    }

    fn is_forward(self) -> bool {
        self == Direction::Forward
    }
}

/// One step of iteration: a non-empty separator-free run of text, or
/// a single logical line break.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    Chunk(&'a str),
    LineBreak,
}

impl<'a> Token<'a> {
    /// The token's text; a break renders as the separator.
    pub fn as_str(&self) -> &'a str {
        match *self {
            Token::Chunk(s) => s,
            Token::LineBreak => "\n",
        }
    }

    /// Char weight of the token; a break counts as one.
    pub fn char_len(&self) -> usize {
        match *self {
            Token::Chunk(s) => char_len(s),
            Token::LineBreak => 1,
        }
    }
}

/// Slot state for a fresh descent into `node`.
///
/// Leaf slots are packed: a leaf with `n` lines alternates line and
/// separator positions, so the counter runs from 1 (before line 0) to
/// `2n` (after line `n - 1`). Branch slots hold the child index the
/// forward walk visits next; the index moves on forward pop and
/// backward push, so a partially consumed child frame can be unwound
/// in either direction.
fn init_slot(node: &Node, dir: Direction) -> usize {
    match (node, dir.is_forward()) {
        (_, true) => match node {
            Node::Leaf { .. } => 1,
            Node::Branch { .. } => 0,
        },
        (Node::Leaf { text, .. }, false) => text.len() * 2,
        (Node::Branch { children, .. }, false) => children.len(),
    }
}

/// Stack cursor over a tree, yielding tokens in either direction.
struct RawIter<'a> {
    nodes: Vec<&'a Node>,
    slots: Vec<usize>,
    dir: Direction,
}

impl<'a> RawIter<'a> {
    fn new(root: &'a Node, dir: Direction) -> RawIter<'a> {
        RawIter {
            nodes: vec![root],
            slots: vec![init_slot(root, dir)],
            dir,
        }
    }

    /// Advance `skip` chars in `dir`, then yield the next token in
    /// `dir`. `None` once the walk leaves the tree; the state stays
    /// valid for a walk in the opposite direction.
    fn next_inner(&mut self, mut skip: usize, dir: Direction) -> Option<Token<'a>> {
        let fwd = dir.is_forward();
        loop {
            let last = self.nodes.len() - 1;
            let node = self.nodes[last];
            let slot = self.slots[last];
            match node {
                Node::Leaf { text, .. } => {
                    let i = slot >> 1;
                    let exhausted = if fwd { i == text.len() } else { i == 0 };
                    if exhausted {
                        if last == 0 {
                            return None;
                        }
                        self.nodes.pop();
                        self.slots.pop();
                        if fwd {
                            self.slots[last - 1] += 1;
                        }
                        continue;
                    }
                    self.slots[last] = if fwd { slot + 1 } else { slot - 1 };
                    let sep = (slot & 1) == usize::from(!fwd);
                    if sep {
                        if skip == 0 {
                            return Some(Token::LineBreak);
                        }
                        skip -= 1;
                    } else {
                        let line: &'a str = if fwd {
                            text[i].as_str()
                        } else {
                            text[i - 1].as_str()
                        };
                        let len = char_len(line);
                        if len > skip {
                            let chunk = if skip == 0 {
                                line
                            } else if fwd {
                                &line[char_to_byte(line, skip)..]
                            } else {
                                &line[..char_to_byte(line, len - skip)]
                            };
                            return Some(Token::Chunk(chunk));
                        }
                        skip -= len;
                    }
                },
                Node::Branch { children, .. } => {
                    let exhausted = if fwd { slot == children.len() } else { slot == 0 };
                    if exhausted {
                        if last == 0 {
                            return None;
                        }
                        self.nodes.pop();
                        self.slots.pop();
                        if fwd {
                            self.slots[last - 1] += 1;
                        }
                        continue;
                    }
                    let child: &'a Node = if fwd {
                        &children[slot]
                    } else {
                        &children[slot - 1]
                    };
                    if skip >= child.len() {
                        skip -= child.len();
                        self.slots[last] = if fwd { slot + 1 } else { slot - 1 };
                    } else {
                        if !fwd {
                            self.slots[last] = slot - 1;
                        }
                        self.slots.push(init_slot(child, dir));
                        self.nodes.push(child);
                    }
                },
            }
        }
    }

    /// Seek-and-yield. A negative `skip` probes backwards first, then
    /// re-emits forward from the new position.
    fn step(&mut self, skip: isize) -> Option<Token<'a>> {
        if skip < 0 {
            let back = self.next_inner(skip.unsigned_abs(), self.dir.reversed());
            let replay = back.map_or(0, |token| token.char_len());
            self.next_inner(replay, self.dir)
        } else {
            self.next_inner(skip as usize, self.dir)
        }
    }
}

/// Token iterator over a char range of a document.
///
/// Produced by `Text::iter` and `Text::iter_range`. `step` seeks by a
/// signed char count before yielding; the plain `Iterator` impl is
/// `step(0)`. Chunks straddling a range edge are sliced so nothing
/// outside the range is emitted. Once exhausted it stays exhausted.
pub struct TextIter<'a> {
    raw: RawIter<'a>,
    raw_pos: usize,
    pos: usize,
    from: usize,
    to: usize,
    done: bool,
}

impl<'a> TextIter<'a> {
    pub(crate) fn new(
        root: &'a Node,
        from: usize,
        to: usize,
        dir: Direction,
    ) -> TextIter<'a> {
        debug_assert!(from <= to && to <= root.len());
        TextIter {
            raw: RawIter::new(root, dir),
            raw_pos: if dir.is_forward() { 0 } else { root.len() },
            pos: if dir.is_forward() { from } else { to },
            from,
            to,
            done: false,
        }
    }

    /// Iteration direction.
    pub fn direction(&self) -> Direction {
        self.raw.dir
    }

    /// Advance `|skip|` chars (with the iteration direction when
    /// positive, against it when negative, clamped to the range) and
    /// yield the next token. `None` marks the terminal state.
    pub fn step(&mut self, skip: isize) -> Option<Token<'a>> {
        if self.done {
            return None;
        }
        let dir = self.raw.dir;
        let sign = dir.sign();
        let desired = self.pos as isize + sign * skip;
        let new_pos = desired.clamp(self.from as isize, self.to as isize) as usize;
        let end = if dir.is_forward() { self.to } else { self.from };
        if new_pos == end {
            self.pos = new_pos;
            self.done = true;
            return None;
        }
        let raw_skip = sign * (new_pos as isize - self.raw_pos as isize);
        let Some(token) = self.raw.step(raw_skip) else {
            self.done = true;
            return None;
        };
        match token {
            Token::LineBreak => {
                let next = (new_pos as isize + sign) as usize;
                self.raw_pos = next;
                self.pos = next;
                Some(Token::LineBreak)
            },
            Token::Chunk(chunk) => {
                let len = char_len(chunk);
                self.raw_pos = (new_pos as isize + sign * len as isize) as usize;
                let avail = if dir.is_forward() {
                    self.to - new_pos
                } else {
                    new_pos - self.from
                };
                if len <= avail {
                    self.pos = self.raw_pos;
                    Some(Token::Chunk(chunk))
                } else {
                    self.pos = end;
                    let clipped = if dir.is_forward() {
                        &chunk[..char_to_byte(chunk, avail)]
                    } else {
                        &chunk[char_to_byte(chunk, len - avail)..]
                    };
                    Some(Token::Chunk(clipped))
                }
            },
        }
    }
}

impl<'a> Iterator for TextIter<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.step(0)
    }
}

/// Line iterator: one value per logical line, blank lines included.
pub struct LineIter<'a> {
    inner: Option<TextIter<'a>>,
    buf: CompactString,
    pending: bool,
}

impl<'a> LineIter<'a> {
    pub(crate) fn new(inner: TextIter<'a>) -> LineIter<'a> {
        LineIter {
            inner: Some(inner),
            buf: CompactString::default(),
            pending: true,
        }
    }

    /// An iterator that is done before yielding anything.
    pub(crate) fn empty() -> LineIter<'a> {
        LineIter {
            inner: None,
            buf: CompactString::default(),
            pending: false,
        }
    }

    /// Like `Iterator::next`, with an initial char seek applied to
    /// the underlying token cursor.
    pub fn step(&mut self, skip: isize) -> Option<CompactString> {
        let inner = self.inner.as_mut()?;
        let mut skip = skip;
        loop {
            match inner.step(skip) {
                Some(Token::Chunk(chunk)) => self.buf.push_str(chunk),
                Some(Token::LineBreak) => return Some(std::mem::take(&mut self.buf)),
                None => {
                    if self.pending {
                        self.pending = false;
                        return Some(std::mem::take(&mut self.buf));
                    }
                    return None;
                },
            }
            skip = 0;
        }
    }
}

impl<'a> Iterator for LineIter<'a> {
    type Item = CompactString;

    fn next(&mut self) -> Option<Self::Item> {
        self.step(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build;
    use compact_str::CompactString;
    use std::sync::Arc;

    fn doc(lines: &[&str]) -> Arc<Node> {
        build(lines.iter().map(|s| CompactString::from(*s)).collect())
    }

    fn collect_tokens<'a>(iter: TextIter<'a>) -> Vec<Token<'a>> {
        iter.collect()
    }

    fn render(tokens: &[Token<'_>]) -> String {
        tokens.iter().map(|t| t.as_str()).collect()
    }

    #[test]
    fn forward_tokens_reproduce_content() {
        let root = doc(&["ab", "cde", "", "", "f", "", "g"]);
        let tokens = collect_tokens(TextIter::new(&root, 0, root.len(), Direction::Forward));
        assert_eq!(render(&tokens), "ab\ncde\n\n\nf\n\ng");
        // empty lines contribute no chunk token
        assert!(tokens
            .iter()
            .all(|t| !matches!(t, Token::Chunk(s) if s.is_empty())));
    }

    #[test]
    fn reverse_is_the_mirror_of_forward() {
        let lines: Vec<&str> = vec!["alpha", "beta", "", "gamma delta", "x"];
        let root = doc(&lines);
        let fwd = collect_tokens(TextIter::new(&root, 0, root.len(), Direction::Forward));
        let mut rev =
            collect_tokens(TextIter::new(&root, 0, root.len(), Direction::Backward));
        rev.reverse();
        assert_eq!(fwd, rev);
    }

    #[test]
    fn reverse_mirrors_bulk_documents() {
        let lines: Vec<CompactString> = (0..600).map(|i| format!("line {i}").into()).collect();
        let root = build(lines);
        let fwd = collect_tokens(TextIter::new(&root, 0, root.len(), Direction::Forward));
        let mut rev =
            collect_tokens(TextIter::new(&root, 0, root.len(), Direction::Backward));
        rev.reverse();
        assert_eq!(fwd, rev);
    }

    #[test]
    fn seek_and_negative_seek() {
        let root = doc(&["one", "two", "three", "four"]);
        let mut iter = TextIter::new(&root, 0, root.len(), Direction::Forward);
        assert_eq!(iter.step(12), Some(Token::Chunk("e")));
        assert_eq!(iter.step(-12), Some(Token::Chunk("ne")));
        assert_eq!(iter.step(12), Some(Token::Chunk("our")));
        assert_eq!(iter.step(-1000), Some(Token::Chunk("one")));
    }

    #[test]
    fn range_clips_straddling_chunks() {
        let root = doc(&["one", "two", "three"]);
        // [2, 9) of "one\ntwo\nthree" is "e\ntwo\nt"
        let tokens = collect_tokens(TextIter::new(&root, 2, 9, Direction::Forward));
        assert_eq!(render(&tokens), "e\ntwo\nt");

        let mut rev = collect_tokens(TextIter::new(&root, 2, 9, Direction::Backward));
        rev.reverse();
        assert_eq!(tokens, rev);
    }

    #[test]
    fn exhausted_iterators_stay_done() {
        let root = doc(&["ab"]);
        let mut iter = TextIter::new(&root, 0, root.len(), Direction::Forward);
        assert_eq!(iter.step(0), Some(Token::Chunk("ab")));
        assert_eq!(iter.step(0), None);
        assert_eq!(iter.step(0), None);
        assert_eq!(iter.step(-5), None);
    }

    #[test]
    fn empty_document_yields_nothing() {
        let root = doc(&[""]);
        let mut iter = TextIter::new(&root, 0, 0, Direction::Forward);
        assert_eq!(iter.step(0), None);
    }

    #[test]
    fn line_iteration_includes_blanks() {
        let root = doc(&["ab", "cde", "", "", "f", "", "g"]);
        let lines: Vec<CompactString> =
            LineIter::new(TextIter::new(&root, 0, root.len(), Direction::Forward)).collect();
        assert_eq!(lines, vec!["ab", "cde", "", "", "f", "", "g"]);
    }

    #[test]
    fn line_iteration_covers_bulk_documents() {
        let lines: Vec<CompactString> = (0..300).map(|i| format!("row {i}").into()).collect();
        let root = build(lines.clone());
        assert!(root.height() >= 1);
        let collected: Vec<CompactString> =
            LineIter::new(TextIter::new(&root, 0, root.len(), Direction::Forward)).collect();
        assert_eq!(collected, lines);
    }

    #[test]
    fn empty_line_iterator_is_done_immediately() {
        let mut iter = LineIter::empty();
        assert_eq!(iter.next(), None);
    }
}
