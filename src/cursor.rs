use tracing::trace;

/// A position-tracking view over the query text. Grammar rules consume
/// characters one at a time and rewind to an explicit checkpoint when a
/// candidate match falls through.
pub struct Cursor<'a> {
    text: &'a str,
    pos: usize,
}

/// An opaque position handle returned by [`Cursor::mark`]. Holding the
/// checkpoint as a value keeps backtracking explicit at every call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint(usize);

impl Checkpoint {
    /// Byte offset into the source text where the checkpoint was taken.
    pub fn offset(self) -> usize {
        self.0
    }
}

impl<'a> Cursor<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    /// The next character, advancing past it. `None` at end of input.
    pub fn next(&mut self) -> Option<char> {
        let c = self.text[self.pos..].chars().next()?;
        self.pos += c.len_utf8();
        trace!(pos = self.pos, c = %c, "consume");
        Some(c)
    }

    /// Record the current position before attempting a rule.
    pub fn mark(&mut self, rule: &str) -> Checkpoint {
        trace!(pos = self.pos, rule, "try");
        Checkpoint(self.pos)
    }

    /// Rewind to `checkpoint`, discarding everything consumed since the
    /// matching [`Cursor::mark`].
    pub fn reset(&mut self, checkpoint: Checkpoint) {
        trace!(from = self.pos, to = checkpoint.0, "rewind");
        self.pos = checkpoint.0;
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    /// The exact source text consumed between `checkpoint` and the current
    /// position.
    pub fn slice_from(&self, checkpoint: Checkpoint) -> &'a str {
        &self.text[checkpoint.0..self.pos]
    }
}
