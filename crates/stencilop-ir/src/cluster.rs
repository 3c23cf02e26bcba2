//! Equation clusters.
//!
//! A [`Cluster`] groups statements that share one iteration space and one set
//! of guard conditions. A compilation unit is an ordered `Vec<Cluster>`;
//! order is execution order along unguarded dimensions. Cluster-level passes
//! consume the sequence by value and return a new sequence.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::dimension::IterationSpace;
use crate::expr::{Assignment, Expr};

/// Scheduling properties of a cluster.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ClusterProperty {
    /// The space dimensions carry no loop-carried dependence.
    Parallel,
    /// Must execute in iteration order.
    Sequential,
}

/// A group of statements over one iteration space.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub exprs: Vec<Assignment>,
    pub ispace: IterationSpace,
    pub guards: Vec<Expr>,
    pub properties: BTreeSet<ClusterProperty>,
}

impl Cluster {
    /// A parallel cluster with no guards.
    pub fn new(exprs: Vec<Assignment>, ispace: IterationSpace) -> Self {
        Cluster {
            exprs,
            ispace,
            guards: Vec::new(),
            properties: [ClusterProperty::Parallel].into_iter().collect(),
        }
    }

    pub fn with_guards(mut self, guards: Vec<Expr>) -> Self {
        self.guards = guards;
        self
    }

    pub fn sequential(mut self) -> Self {
        self.properties = [ClusterProperty::Sequential].into_iter().collect();
        self
    }

    pub fn is_parallel(&self) -> bool {
        self.properties.contains(&ClusterProperty::Parallel)
    }

    /// Names written by this cluster.
    pub fn writes(&self) -> BTreeSet<String> {
        self.exprs
            .iter()
            .filter_map(|a| a.write_name().map(str::to_string))
            .collect()
    }

    /// Names read by this cluster (right-hand sides and guards).
    pub fn reads(&self) -> BTreeSet<String> {
        let mut out: BTreeSet<String> = self.exprs.iter().flat_map(|a| a.reads()).collect();
        for g in &self.guards {
            out.extend(g.names());
        }
        out
    }

    /// Flow-, anti-, or output-dependence between two clusters. Used by
    /// topological fusion to decide which clusters may be reordered.
    pub fn depends(&self, other: &Cluster) -> bool {
        let w = self.writes();
        let ow = other.writes();
        !w.is_disjoint(&other.reads()) || !w.is_disjoint(&ow) || !ow.is_disjoint(&self.reads())
    }
}

/// Groups a flat ordered list of statements into maximal clusters.
///
/// Consecutive statements sharing an iteration space fold into one cluster;
/// a change of iteration space starts a new one. This is the boundary with
/// the symbolic front-end, which supplies lowered statements in program
/// order.
pub fn from_assignments(stmts: Vec<(Assignment, IterationSpace)>) -> Vec<Cluster> {
    let mut out: Vec<Cluster> = Vec::new();
    for (stmt, ispace) in stmts {
        match out.last_mut() {
            Some(last) if last.ispace == ispace && last.guards.is_empty() => {
                last.exprs.push(stmt);
            }
            _ => out.push(Cluster::new(vec![stmt], ispace)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimension::{Dimension, Interval};
    use crate::expr::Index;

    fn ispace(name: &str) -> IterationSpace {
        IterationSpace::new(vec![Interval::new(Dimension::space(name), 0, 0)])
    }

    fn assign(target: &str, read: &str) -> Assignment {
        Assignment::new(
            Expr::access(target, vec![Index::new("x", 0)]),
            Expr::access(read, vec![Index::new("x", 0)]),
        )
    }

    #[test]
    fn test_dependence() {
        let a = Cluster::new(vec![assign("u", "v")], ispace("x"));
        let b = Cluster::new(vec![assign("w", "u")], ispace("x"));
        let c = Cluster::new(vec![assign("p", "q")], ispace("x"));
        assert!(a.depends(&b));
        assert!(!a.depends(&c));
    }

    #[test]
    fn test_from_assignments_groups_by_ispace() {
        let stmts = vec![
            (assign("u", "v"), ispace("x")),
            (assign("w", "v"), ispace("x")),
            (assign("p", "q"), ispace("y")),
        ];
        let clusters = from_assignments(stmts);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].exprs.len(), 2);
        assert_eq!(clusters[1].exprs.len(), 1);
    }

    #[test]
    fn test_writes_and_reads() {
        let c = Cluster::new(vec![assign("u", "v")], ispace("x"));
        assert!(c.writes().contains("u"));
        assert!(c.reads().contains("v"));
    }
}
