//! Dimensions, intervals, and iteration spaces.
//!
//! An [`IterationSpace`] is an ordered sequence of per-dimension
//! [`Interval`]s. Order is execution order: the first interval maps to the
//! outermost loop. Blocking is the only pass that introduces dimensions of
//! kind [`DimKind::Block`] and [`DimKind::Incr`]; everything upstream sees
//! plain `Time`/`Space` dimensions.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// The role a dimension plays in an iteration space.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DimKind {
    /// Stepping dimension; always carried sequentially.
    Time,
    /// Grid dimension; eligible for tiling and parallelization.
    Space,
    /// Tile dimension introduced by blocking, `level` 0 is outermost.
    Block {
        /// Nesting level of the tile, 0-based.
        level: u32,
    },
    /// Intra-tile dimension introduced by blocking; iterates within one
    /// tile of `parent`.
    Incr {
        /// Name of the innermost block dimension this one iterates within.
        parent: String,
    },
}

/// A named dimension of an iteration space.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimension {
    pub name: String,
    pub kind: DimKind,
}

impl Dimension {
    pub fn time(name: impl Into<String>) -> Self {
        Dimension {
            name: name.into(),
            kind: DimKind::Time,
        }
    }

    pub fn space(name: impl Into<String>) -> Self {
        Dimension {
            name: name.into(),
            kind: DimKind::Space,
        }
    }

    pub fn block(name: impl Into<String>, level: u32) -> Self {
        Dimension {
            name: name.into(),
            kind: DimKind::Block { level },
        }
    }

    pub fn incr(name: impl Into<String>, parent: impl Into<String>) -> Self {
        Dimension {
            name: name.into(),
            kind: DimKind::Incr {
                parent: parent.into(),
            },
        }
    }

    pub fn is_time(&self) -> bool {
        matches!(self.kind, DimKind::Time)
    }

    pub fn is_space(&self) -> bool {
        matches!(self.kind, DimKind::Space)
    }

    pub fn is_block(&self) -> bool {
        matches!(self.kind, DimKind::Block { .. })
    }

    pub fn is_incr(&self) -> bool {
        matches!(self.kind, DimKind::Incr { .. })
    }
}

/// Halo-relative bounds of one dimension.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval {
    pub dim: Dimension,
    pub lower: i64,
    pub upper: i64,
}

impl Interval {
    pub fn new(dim: Dimension, lower: i64, upper: i64) -> Self {
        Interval { dim, lower, upper }
    }
}

/// An ordered set of intervals, one per dimension.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IterationSpace {
    pub intervals: Vec<Interval>,
}

impl IterationSpace {
    pub fn new(intervals: Vec<Interval>) -> Self {
        IterationSpace { intervals }
    }

    pub fn dims(&self) -> impl Iterator<Item = &Dimension> {
        self.intervals.iter().map(|i| &i.dim)
    }

    pub fn dim_names(&self) -> BTreeSet<&str> {
        self.dims().map(|d| d.name.as_str()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.dims().any(|d| d.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// A copy with the named dimensions projected out.
    pub fn without(&self, names: &BTreeSet<String>) -> IterationSpace {
        IterationSpace {
            intervals: self
                .intervals
                .iter()
                .filter(|i| !names.contains(&i.dim.name))
                .cloned()
                .collect(),
        }
    }
}
