//! Key paths locating a table inside the SavedVariables structure

use crate::value::Key;
use std::fmt;

/// One step from the root table towards a nested value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// The outer saved-variables field (e.g. `["runsById"]`)
    Outer(String),
    /// Level 1: dungeon map id
    MapId(Key),
    /// Level 2: keystone level
    KeyLevel(Key),
    /// Level 3: run state bucket (e.g. "success")
    State(Key),
    /// Level 4: 1-based position of a run entry within its state bucket
    Run(usize),
    /// A named field inside a run or encounter table
    Field(String),
    /// 1-based position of an encounter inside `encounters`
    Encounter(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Outer(name) => write!(f, "[{:?}]", name),
            PathSegment::MapId(key) => write!(f, "mapId={}", KeyLabel(key)),
            PathSegment::KeyLevel(key) => write!(f, "keyLevel={}", KeyLabel(key)),
            PathSegment::State(key) => write!(f, "state={}", KeyLabel(key)),
            PathSegment::Run(position) => write!(f, "run#{}", position),
            PathSegment::Field(name) => write!(f, "field={:?}", name),
            PathSegment::Encounter(position) => write!(f, "encounter#{}", position),
        }
    }
}

struct KeyLabel<'a>(&'a Key);

impl fmt::Display for KeyLabel<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Key::String(s) => write!(f, "{:?}", s),
            Key::Index(i) => write!(f, "{}", i),
        }
    }
}

/// The sequence of segments leading to a table, root first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyPath(Vec<PathSegment>);

impl KeyPath {
    /// The empty path addressing the root table
    pub fn root() -> Self {
        Self::default()
    }

    /// A new path extended by one segment
    pub fn child(&self, segment: PathSegment) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment);
        Self(segments)
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "<root>");
        }
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}
