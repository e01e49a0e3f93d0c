//! ferret_text - a persistent document tree for editor buffers.
//!
//! Documents are immutable trees of line-holding leaves. Every edit
//! returns a new [`Text`] that shares untouched subtrees with its
//! predecessors, so edits cost time proportional to the edit, not the
//! document, and old versions stay cheap to keep around.
//!
//! ## Key properties
//! - O(log n) random access by char offset or 1-based line number
//! - O(k + log n) `replace`, with structural sharing of both sides
//! - Forward and reverse token cursors with char-precise seeking
//! - Content equality that ignores how the tree happens to be chunked
//!
//! ## Example
//! ```
//! use ferret_text::Text;
//!
//! let doc = Text::of(["fn main() {", "}"]).unwrap();
//! let edited = doc.replace(11, 11, &Text::from("\n")).unwrap();
//! assert_eq!(edited.to_string(), "fn main() {\n\n}");
//! assert_eq!(edited.line(2).unwrap().text, "");
//! // the original version is untouched
//! assert_eq!(doc.to_string(), "fn main() {\n}");
//! ```

mod builder;
mod edit;
mod error;
mod iter;
mod node;

pub use error::{Result, TextError};
pub use iter::{Direction, LineIter, TextIter, Token};

use compact_str::CompactString;
use node::Node;
use std::{fmt, str::FromStr, sync::Arc};

/// A persistent text document.
///
/// Cloning is cheap (a reference-counted root). All edit operations
/// leave `self` untouched and return a new document.
#[derive(Debug, Clone)]
pub struct Text {
    root: Arc<Node>,
}

/// A logical line: its char bounds, 1-based number, and content.
///
/// `to` excludes the terminating separator, so a blank line has
/// `from == to`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub from: usize,
    pub to: usize,
    pub number: usize,
    pub text: CompactString,
}

impl Line {
    /// Char count of the line, separators excluded.
    pub fn len(&self) -> usize {
        self.to - self.from
    }

    pub fn is_empty(&self) -> bool {
        self.from == self.to
    }
}

impl Text {
    /// The document holding a single empty line.
    pub fn empty() -> Text {
        Text {
            root: Arc::new(Node::leaf(vec![CompactString::default()])),
        }
    }

    /// Build a document from line strings.
    ///
    /// The list must be non-empty and no line may contain `'\n'`.
    pub fn of<I, S>(lines: I) -> Result<Text>
    where
        I: IntoIterator<Item = S>,
        S: Into<CompactString>,
    {
        let lines: Vec<CompactString> = lines.into_iter().map(Into::into).collect();
        if lines.is_empty() {
            return Err(TextError::EmptyText);
        }
        for (i, line) in lines.iter().enumerate() {
            if line.contains('\n') {
                return Err(TextError::SeparatorInLine { line: i });
            }
        }
        Ok(Text {
            root: builder::build(lines),
        })
    }

    /// Char count, including one separator per internal line break.
    pub fn len(&self) -> usize {
        self.root.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Logical line count; at least 1.
    pub fn lines(&self) -> usize {
        self.root.lines()
    }

    /// Tree height in edges; 0 for a single-leaf document. Exposed
    /// for balance diagnostics.
    pub fn height(&self) -> usize {
        self.root.height()
    }

    /// Replace chars `[from, to)` with another document.
    ///
    /// The boundary lines splice: the last line before the cut joins
    /// the insert's first line, and the insert's last line joins the
    /// first line after the cut. An empty insert therefore fuses the
    /// two boundary lines into one.
    pub fn replace(&self, from: usize, to: usize, insert: &Text) -> Result<Text> {
        self.check_range(from, to)?;
        Ok(Text {
            root: edit::replace(&self.root, from, to, &insert.root),
        })
    }

    /// Append another document, sharing the seam line.
    pub fn append(&self, other: &Text) -> Text {
        Text {
            root: edit::replace(&self.root, self.len(), self.len(), &other.root),
        }
    }

    /// The sub-document covering chars `[from, to)`.
    pub fn slice(&self, from: usize, to: usize) -> Result<Text> {
        self.check_range(from, to)?;
        Ok(Text {
            root: edit::slice(&self.root, from, to),
        })
    }

    /// Chars `[from, to)` as a `String`.
    pub fn slice_string(&self, from: usize, to: usize) -> Result<String> {
        self.check_range(from, to)?;
        let mut out = String::new();
        self.root.slice_into(from, to, &mut out);
        Ok(out)
    }

    /// The line with the given 1-based number.
    pub fn line(&self, number: usize) -> Result<Line> {
        if number < 1 || number > self.lines() {
            return Err(TextError::InvalidLine {
                line: number,
                lines: self.lines(),
            });
        }
        Ok(self.line_unchecked(number))
    }

    /// The line enclosing the given char offset. An offset sitting on
    /// a separator belongs to the line that separator ends.
    pub fn line_at(&self, pos: usize) -> Result<Line> {
        if pos > self.len() {
            return Err(TextError::OutOfRange {
                pos,
                len: self.len(),
            });
        }
        Ok(self.line_unchecked(self.root.seps_before(pos) + 1))
    }

    fn line_unchecked(&self, number: usize) -> Line {
        let from = if number == 1 {
            0
        } else {
            self.root.sep_offset(number - 1) + 1
        };
        let to = if number == self.lines() {
            self.len()
        } else {
            self.root.sep_offset(number)
        };
        let mut text = String::new();
        self.root.slice_into(from, to, &mut text);
        Line {
            from,
            to,
            number,
            text: text.into(),
        }
    }

    /// Token cursor over the whole document.
    pub fn iter(&self, dir: Direction) -> TextIter<'_> {
        TextIter::new(&self.root, 0, self.len(), dir)
    }

    /// Token cursor clipped to `[min(from, to), max(from, to))`;
    /// `from > to` iterates in reverse. Bounds are clamped to the
    /// document.
    pub fn iter_range(&self, from: usize, to: usize) -> TextIter<'_> {
        let dir = if from > to {
            Direction::Backward
        } else {
            Direction::Forward
        };
        let a = from.min(self.len());
        let b = to.min(self.len());
        TextIter::new(&self.root, a.min(b), a.max(b), dir)
    }

    /// One value per logical line for line numbers `[start, end)`.
    /// Inverted or out-of-range bounds give an immediately-done
    /// iterator.
    pub fn iter_lines(&self, start: usize, end: usize) -> LineIter<'_> {
        if start < 1 || end <= start || end > self.lines() + 1 {
            return LineIter::empty();
        }
        let from = if start == 1 {
            0
        } else {
            self.root.sep_offset(start - 1) + 1
        };
        let last = end - 1;
        let to = if last == self.lines() {
            self.len()
        } else {
            self.root.sep_offset(last)
        };
        LineIter::new(TextIter::new(&self.root, from, to, Direction::Forward))
    }

    /// Line iterator over the whole document.
    pub fn iter_lines_all(&self) -> LineIter<'_> {
        self.iter_lines(1, self.lines() + 1)
    }

    /// The document as a JSON array of line strings.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Array(
            self.iter_lines_all()
                .map(|line| serde_json::Value::String(line.into()))
                .collect(),
        )
    }

    /// Rebuild a document from its JSON line-array form.
    pub fn from_json(value: &serde_json::Value) -> Result<Text> {
        let lines: Vec<String> = serde_json::from_value(value.clone())?;
        Text::of(lines)
    }

    fn check_range(&self, from: usize, to: usize) -> Result<()> {
        if to > self.len() {
            return Err(TextError::OutOfRange {
                pos: to,
                len: self.len(),
            });
        }
        if from > to {
            return Err(TextError::OutOfRange {
                pos: from,
                len: self.len(),
            });
        }
        Ok(())
    }
}

impl Default for Text {
    fn default() -> Text {
        Text::empty()
    }
}

impl fmt::Display for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in self.iter(Direction::Forward) {
            f.write_str(token.as_str())?;
        }
        Ok(())
    }
}

impl From<&str> for Text {
    fn from(text: &str) -> Text {
        // split never yields an empty list and the pieces cannot
        // contain the separator, so validation is not needed
        let lines: Vec<CompactString> = text.split('\n').map(CompactString::from).collect();
        Text {
            root: builder::build(lines),
        }
    }
}

impl FromStr for Text {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Text, Self::Err> {
        Ok(Text::from(s))
    }
}

impl PartialEq for Text {
    /// Content equality, independent of tree shape.
    fn eq(&self, other: &Text) -> bool {
        if Arc::ptr_eq(&self.root, &other.root) {
            return true;
        }
        if self.len() != other.len() || self.lines() != other.lines() {
            return false;
        }
        let mut a = self.iter(Direction::Forward);
        let mut b = other.iter(Direction::Forward);
        let (mut ra, mut rb): (&[u8], &[u8]) = (b"", b"");
        loop {
            if ra.is_empty() {
                match a.next() {
                    Some(token) => ra = token.as_str().as_bytes(),
                    None => return rb.is_empty() && b.next().is_none(),
                }
            }
            if rb.is_empty() {
                match b.next() {
                    Some(token) => rb = token.as_str().as_bytes(),
                    None => return false,
                }
            }
            let n = ra.len().min(rb.len());
            if ra[..n] != rb[..n] {
                return false;
            }
            ra = &ra[n..];
            rb = &rb[n..];
        }
    }
}

impl Eq for Text {}

impl serde::Serialize for Text {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeSeq;
        let mut seq = serializer.serialize_seq(Some(self.lines()))?;
        for line in self.iter_lines_all() {
            seq.serialize_element(line.as_str())?;
        }
        seq.end()
    }
}

impl<'de> serde::Deserialize<'de> for Text {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Text, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let lines = Vec::<String>::deserialize(deserializer)?;
        Text::of(lines).map_err(serde::de::Error::custom)
    }
}
