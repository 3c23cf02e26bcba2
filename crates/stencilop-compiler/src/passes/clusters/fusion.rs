//! Cluster fusion.
//!
//! Merges adjacent clusters that share an iteration space and guard set into
//! one. The toposort variant first stably reorders *independent* clusters to
//! expose more adjacency; dependent clusters are never reordered. Fusion
//! reaches a fixed point: fusing an already-fused sequence is a no-op.

use anyhow::Result;

use stencilop_ir::Cluster;

use crate::context::BuildContext;

/// Merge adjacent compatible clusters until no more merges apply.
pub fn fuse(clusters: Vec<Cluster>, _ctx: &mut BuildContext) -> Result<Vec<Cluster>> {
    Ok(merge_adjacent(clusters))
}

/// Topologically reorder independent clusters, then fuse.
pub fn fuse_toposort(clusters: Vec<Cluster>, _ctx: &mut BuildContext) -> Result<Vec<Cluster>> {
    Ok(merge_adjacent(toposort(clusters)))
}

/// Move each cluster next to the closest earlier cluster with the same
/// iteration space, provided every cluster in between is independent of it.
fn toposort(mut clusters: Vec<Cluster>) -> Vec<Cluster> {
    let mut i = 1;
    while i < clusters.len() {
        let anchor = (0..i)
            .rev()
            .find(|&k| compatible(&clusters[k], &clusters[i]));
        if let Some(k) = anchor {
            if k + 1 < i && (k + 1..i).all(|j| !clusters[j].depends(&clusters[i])) {
                let c = clusters.remove(i);
                clusters.insert(k + 1, c);
            }
        }
        i += 1;
    }
    clusters
}

fn compatible(a: &Cluster, b: &Cluster) -> bool {
    a.ispace == b.ispace && a.guards == b.guards && a.properties == b.properties
}

fn merge_adjacent(clusters: Vec<Cluster>) -> Vec<Cluster> {
    let mut out: Vec<Cluster> = Vec::new();
    for c in clusters {
        match out.last_mut() {
            Some(last) if compatible(last, &c) => last.exprs.extend(c.exprs),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{OperatorOptions, Options, StrategyDefaults};
    use crate::platform::Platform;
    use stencilop_ir::{Assignment, Dimension, Expr, Index, Interval, IterationSpace};

    fn ctx() -> BuildContext {
        let options = Options::normalize(&OperatorOptions::new(), &StrategyDefaults::base());
        BuildContext::new(options, Platform::cpu64())
    }

    fn ispace(name: &str) -> IterationSpace {
        IterationSpace::new(vec![Interval::new(Dimension::space(name), 0, 0)])
    }

    fn cluster(target: &str, read: &str, dim: &str) -> Cluster {
        Cluster::new(
            vec![Assignment::new(
                Expr::access(target, vec![Index::new(dim, 0)]),
                Expr::access(read, vec![Index::new(dim, 0)]),
            )],
            ispace(dim),
        )
    }

    #[test]
    fn test_adjacent_same_ispace_fuse() {
        let cs = vec![cluster("u", "a", "x"), cluster("v", "b", "x")];
        let fused = fuse(cs, &mut ctx()).unwrap();
        assert_eq!(fused.len(), 1);
        assert_eq!(fused[0].exprs.len(), 2);
    }

    #[test]
    fn test_different_ispace_do_not_fuse() {
        let cs = vec![cluster("u", "a", "x"), cluster("v", "b", "y")];
        let fused = fuse(cs, &mut ctx()).unwrap();
        assert_eq!(fused.len(), 2);
    }

    #[test]
    fn test_fusion_fixed_point() {
        let cs = vec![cluster("u", "a", "x"), cluster("v", "b", "x")];
        let once = fuse(cs, &mut ctx()).unwrap();
        let twice = fuse(once.clone(), &mut ctx()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_toposort_exposes_fusion_across_independent_cluster() {
        // x-cluster, y-cluster, x-cluster: the trailing x-cluster is
        // independent of the y-cluster and moves up to fuse.
        let cs = vec![
            cluster("u", "a", "x"),
            cluster("v", "b", "y"),
            cluster("w", "c", "x"),
        ];
        let fused = fuse_toposort(cs, &mut ctx()).unwrap();
        assert_eq!(fused.len(), 2);
        assert_eq!(fused[0].exprs.len(), 2);
    }

    #[test]
    fn test_toposort_never_reorders_dependent_clusters() {
        // The trailing x-cluster reads v, written by the y-cluster in
        // between: it must stay put.
        let cs = vec![
            cluster("u", "a", "x"),
            cluster("v", "b", "y"),
            cluster("w", "v", "x"),
        ];
        let fused = fuse_toposort(cs, &mut ctx()).unwrap();
        assert_eq!(fused.len(), 3);
        assert!(fused[1].writes().contains("v"));
    }

    #[test]
    fn test_plain_fuse_does_not_reorder() {
        let cs = vec![
            cluster("u", "a", "x"),
            cluster("v", "b", "y"),
            cluster("w", "c", "x"),
        ];
        let fused = fuse(cs, &mut ctx()).unwrap();
        assert_eq!(fused.len(), 3);
    }
}
