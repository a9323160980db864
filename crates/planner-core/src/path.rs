//! Dotted task identifiers.
//!
//! A [`TaskPath`] is the parsed form of an ID such as `"1.2.3"`: the 1-based
//! sibling position at every level from the root down. Paths are computed
//! from tree position whenever a task is read; they are never stored.

use std::fmt;
use std::str::FromStr;

use crate::error::PlanError;

/// Position of a task in the tree, one 1-based index per nesting level.
///
/// The empty path denotes the root list itself and is only used as a
/// prefix; parsing never produces it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskPath(Vec<usize>);

impl TaskPath {
    /// The empty prefix of top-level tasks.
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a path from 1-based segments.
    ///
    /// Returns `NotFound` if any segment is zero.
    pub fn from_segments(segments: Vec<usize>) -> Result<Self, PlanError> {
        if segments.is_empty() || segments.contains(&0) {
            let shown = segments
                .iter()
                .map(usize::to_string)
                .collect::<Vec<_>>()
                .join(".");
            return Err(PlanError::not_found(shown));
        }
        Ok(Self(segments))
    }

    pub fn segments(&self) -> &[usize] {
        &self.0
    }

    /// Nesting depth: 1 for top-level tasks, 0 for the root prefix.
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// The path of the `index`-th (1-based) child under this path.
    pub fn child(&self, index: usize) -> Self {
        let mut segments = Vec::with_capacity(self.0.len() + 1);
        segments.extend_from_slice(&self.0);
        segments.push(index);
        Self(segments)
    }

    /// Append a path that is relative to this one.
    pub fn join(&self, relative: &TaskPath) -> Self {
        let mut segments = self.0.clone();
        segments.extend_from_slice(&relative.0);
        Self(segments)
    }

    /// The path of the parent task, or `None` for top-level tasks and the
    /// root prefix.
    pub fn parent(&self) -> Option<Self> {
        match self.0.len() {
            0 | 1 => None,
            n => Some(Self(self.0[..n - 1].to_vec())),
        }
    }

    /// The 1-based index of this task among its siblings.
    pub fn local_index(&self) -> Option<usize> {
        self.0.last().copied()
    }
}

impl fmt::Display for TaskPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for segment in &self.0 {
            if !first {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
            first = false;
        }
        Ok(())
    }
}

impl FromStr for TaskPath {
    type Err = PlanError;

    /// Parse a dotted ID.
    ///
    /// Every malformed input (empty string, empty segment, sign, whitespace,
    /// non-digit, zero) is reported as `NotFound`: to a caller a malformed ID
    /// and a missing one are the same failure.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(PlanError::not_found(s));
        }

        let mut segments = Vec::new();
        for part in s.split('.') {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(PlanError::not_found(s));
            }
            let index: usize = part.parse().map_err(|_| PlanError::not_found(s))?;
            if index == 0 {
                return Err(PlanError::not_found(s));
            }
            segments.push(index);
        }

        Ok(Self(segments))
    }
}
