//! Unified diff preview of an edit list.
//!
//! The diff is not recomputed from the two texts. Line correspondence comes
//! from the spans the applier reports: every edit touches a block of whole
//! lines, blocks that share a line are merged, and inside a block a greedy
//! common prefix and suffix become context. Everything between blocks is
//! unchanged by construction.
//!
//! Lines are the `'\n'`-separated pieces of the text, so a trailing newline
//! yields a final empty line. This keeps [`UnifiedDiff::patch`] exact.

use std::fmt;

use crate::error::EditError;

use super::apply::{AppliedSpan, LineIndex, apply_with_spans};
use super::model::Edit;

pub const DEFAULT_CONTEXT_LINES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffLineKind {
    Context,
    Addition,
    Deletion,
}

impl DiffLineKind {
    fn marker(&self) -> char {
        match self {
            DiffLineKind::Context => ' ',
            DiffLineKind::Addition => '+',
            DiffLineKind::Deletion => '-',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    pub kind: DiffLineKind,
    pub content: String,
    /// 1-indexed line in the original text, absent for additions.
    pub old_line: Option<usize>,
    /// 1-indexed line in the new text, absent for deletions.
    pub new_line: Option<usize>,
}

/// A 1-indexed line range. For an empty range, `start` is the line after
/// which the change happens (0 at the top of the file).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HunkRange {
    pub start: usize,
    pub len: usize,
}

impl HunkRange {
    /// Last line of the range, inclusive. `None` for an empty range.
    pub fn end(&self) -> Option<usize> {
        (self.len > 0).then(|| self.start + self.len - 1)
    }
}

impl fmt::Display for HunkRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.len == 1 {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{},{}", self.start, self.len)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffHunk {
    pub old: HunkRange,
    pub new: HunkRange,
    pub lines: Vec<DiffLine>,
}

/// Total line counts of both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffHeader {
    pub old_lines: usize,
    pub new_lines: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnifiedDiff {
    pub header: DiffHeader,
    pub hunks: Vec<DiffHunk>,
}

impl UnifiedDiff {
    /// No hunks: the edit list was empty or changed nothing.
    pub fn is_noop(&self) -> bool {
        self.hunks.is_empty()
    }

    pub fn additions(&self) -> usize {
        self.count(DiffLineKind::Addition)
    }

    pub fn deletions(&self) -> usize {
        self.count(DiffLineKind::Deletion)
    }

    fn count(&self, kind: DiffLineKind) -> usize {
        self.hunks
            .iter()
            .flat_map(|h| &h.lines)
            .filter(|l| l.kind == kind)
            .count()
    }

    /// Replay the hunks line by line onto `original`.
    ///
    /// Returns `None` if `original` does not match the diff's old side.
    pub fn patch(&self, original: &str) -> Option<String> {
        let old: Vec<&str> = original.split('\n').collect();
        if old.len() != self.header.old_lines {
            return None;
        }

        let mut out: Vec<&str> = Vec::with_capacity(self.header.new_lines);
        let mut cursor = 0;
        for hunk in &self.hunks {
            let hunk_start = if hunk.old.len == 0 {
                hunk.old.start
            } else {
                hunk.old.start - 1
            };
            if hunk_start < cursor || hunk_start > old.len() {
                return None;
            }
            out.extend_from_slice(&old[cursor..hunk_start]);
            cursor = hunk_start;

            for line in &hunk.lines {
                match line.kind {
                    DiffLineKind::Context | DiffLineKind::Deletion => {
                        if old.get(cursor) != Some(&line.content.as_str()) {
                            return None;
                        }
                        if line.kind == DiffLineKind::Context {
                            out.push(old[cursor]);
                        }
                        cursor += 1;
                    }
                    DiffLineKind::Addition => out.push(&line.content),
                }
            }
        }
        out.extend_from_slice(&old[cursor..]);
        Some(out.join("\n"))
    }
}

impl fmt::Display for UnifiedDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- original")?;
        writeln!(f, "+++ suggested")?;
        for hunk in &self.hunks {
            writeln!(f, "@@ -{} +{} @@", hunk.old, hunk.new)?;
            for line in &hunk.lines {
                writeln!(f, "{}{}", line.kind.marker(), line.content)?;
            }
        }
        Ok(())
    }
}

/// Build the unified diff that applying `edits` to `original` would produce.
pub fn generate_unified_diff(
    original: &str,
    edits: &[Edit],
    context_lines: usize,
) -> Result<UnifiedDiff, EditError> {
    let old_lines: Vec<&str> = original.split('\n').collect();
    if edits.is_empty() {
        return Ok(UnifiedDiff {
            header: DiffHeader {
                old_lines: old_lines.len(),
                new_lines: old_lines.len(),
            },
            hunks: Vec::new(),
        });
    }

    let applied = apply_with_spans(original, edits)?;
    let new_lines: Vec<&str> = applied.text.split('\n').collect();

    let old_chars: Vec<char> = original.chars().collect();
    let new_chars: Vec<char> = applied.text.chars().collect();
    let blocks = changed_blocks(
        &applied.spans,
        &LineIndex::new(&old_chars),
        &LineIndex::new(&new_chars),
    );

    let ops = line_ops(&blocks, &old_lines, &new_lines);
    let hunks = group_hunks(&ops, &old_lines, &new_lines, context_lines);

    Ok(UnifiedDiff {
        header: DiffHeader {
            old_lines: old_lines.len(),
            new_lines: new_lines.len(),
        },
        hunks,
    })
}

/// Inclusive 0-indexed line ranges touched on each side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Block {
    old_lo: usize,
    old_hi: usize,
    new_lo: usize,
    new_hi: usize,
}

fn changed_blocks(spans: &[AppliedSpan], old: &LineIndex, new: &LineIndex) -> Vec<Block> {
    let mut blocks: Vec<Block> = Vec::new();
    for span in spans {
        let block = Block {
            old_lo: old.line_of(span.old_start),
            old_hi: old.line_of(span.old_end),
            new_lo: new.line_of(span.new_start),
            new_hi: new.line_of(span.new_end),
        };
        match blocks.last_mut() {
            Some(last) if block.old_lo <= last.old_hi => {
                last.old_hi = last.old_hi.max(block.old_hi);
                last.new_hi = last.new_hi.max(block.new_hi);
            }
            _ => blocks.push(block),
        }
    }
    blocks
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineOp {
    Context { old: usize, new: usize },
    Delete { old: usize },
    Insert { new: usize },
}

impl LineOp {
    fn is_change(&self) -> bool {
        !matches!(self, LineOp::Context { .. })
    }
}

/// Walk the whole document, emitting one op per line.
fn line_ops(blocks: &[Block], old: &[&str], new: &[&str]) -> Vec<LineOp> {
    let mut ops = Vec::with_capacity(old.len().max(new.len()));
    let (mut o, mut n) = (0, 0);

    for block in blocks {
        while o < block.old_lo {
            ops.push(LineOp::Context { old: o, new: n });
            o += 1;
            n += 1;
        }

        let old_block = &old[block.old_lo..=block.old_hi];
        let new_block = &new[block.new_lo..=block.new_hi];
        let shortest = old_block.len().min(new_block.len());
        let prefix = old_block
            .iter()
            .zip(new_block)
            .take_while(|(a, b)| a == b)
            .count();
        let suffix = old_block
            .iter()
            .rev()
            .zip(new_block.iter().rev())
            .take(shortest - prefix)
            .take_while(|(a, b)| a == b)
            .count();

        for i in 0..prefix {
            ops.push(LineOp::Context {
                old: block.old_lo + i,
                new: block.new_lo + i,
            });
        }
        for i in prefix..old_block.len() - suffix {
            ops.push(LineOp::Delete {
                old: block.old_lo + i,
            });
        }
        for i in prefix..new_block.len() - suffix {
            ops.push(LineOp::Insert {
                new: block.new_lo + i,
            });
        }
        for i in 0..suffix {
            ops.push(LineOp::Context {
                old: block.old_hi + 1 - suffix + i,
                new: block.new_hi + 1 - suffix + i,
            });
        }

        o = block.old_hi + 1;
        n = block.new_hi + 1;
    }

    while o < old.len() {
        ops.push(LineOp::Context { old: o, new: n });
        o += 1;
        n += 1;
    }
    ops
}

fn group_hunks(ops: &[LineOp], old: &[&str], new: &[&str], context: usize) -> Vec<DiffHunk> {
    let changes: Vec<usize> = ops
        .iter()
        .enumerate()
        .filter(|(_, op)| op.is_change())
        .map(|(i, _)| i)
        .collect();

    // Group change indices whose context windows overlap or touch.
    let mut groups: Vec<(usize, usize)> = Vec::new();
    for &idx in &changes {
        match groups.last_mut() {
            Some((_, last)) if idx - *last - 1 <= 2 * context => *last = idx,
            _ => groups.push((idx, idx)),
        }
    }

    // Lines consumed on each side before op `i`.
    let mut consumed = Vec::with_capacity(ops.len() + 1);
    let (mut o, mut n) = (0, 0);
    for op in ops {
        consumed.push((o, n));
        match op {
            LineOp::Context { .. } => {
                o += 1;
                n += 1;
            }
            LineOp::Delete { .. } => o += 1,
            LineOp::Insert { .. } => n += 1,
        }
    }
    consumed.push((o, n));

    groups
        .into_iter()
        .map(|(first, last)| {
            let lo = first.saturating_sub(context);
            let hi = (last + context).min(ops.len() - 1);
            let lines: Vec<DiffLine> = ops[lo..=hi]
                .iter()
                .map(|op| match *op {
                    LineOp::Context { old: o, new: n } => DiffLine {
                        kind: DiffLineKind::Context,
                        content: old[o].to_string(),
                        old_line: Some(o + 1),
                        new_line: Some(n + 1),
                    },
                    LineOp::Delete { old: o } => DiffLine {
                        kind: DiffLineKind::Deletion,
                        content: old[o].to_string(),
                        old_line: Some(o + 1),
                        new_line: None,
                    },
                    LineOp::Insert { new: n } => DiffLine {
                        kind: DiffLineKind::Addition,
                        content: new[n].to_string(),
                        old_line: None,
                        new_line: Some(n + 1),
                    },
                })
                .collect();

            let (old_before, new_before) = consumed[lo];
            let (old_after, new_after) = consumed[hi + 1];
            DiffHunk {
                old: range(old_before, old_after - old_before),
                new: range(new_before, new_after - new_before),
                lines,
            }
        })
        .collect()
}

fn range(before: usize, len: usize) -> HunkRange {
    HunkRange {
        start: if len == 0 { before } else { before + 1 },
        len,
    }
}
