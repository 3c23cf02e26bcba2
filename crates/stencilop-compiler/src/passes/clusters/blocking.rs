//! Loop blocking.
//!
//! Tiles the parallel space dimensions of a cluster into `blocklevels`
//! nested block dimensions plus an inner incremental dimension that iterates
//! within one tile. Blocking changes execution granularity only; computed
//! values are untouched.

use anyhow::Result;

use stencilop_ir::{Cluster, Dimension, Interval, IterationSpace};

use crate::context::BuildContext;
use crate::options::Options;

/// The blocking processor, parameterized over the normalized options.
pub struct Blocking {
    levels: u32,
}

impl Blocking {
    pub fn new(options: &Options) -> Self {
        Blocking {
            levels: options.blocklevels,
        }
    }

    pub fn process(&self, clusters: Vec<Cluster>) -> Vec<Cluster> {
        clusters
            .into_iter()
            .map(|c| self.block_cluster(c))
            .collect()
    }

    fn block_cluster(&self, mut cluster: Cluster) -> Cluster {
        let already_blocked = cluster.ispace.dims().any(Dimension::is_block);
        if !cluster.is_parallel() || already_blocked || self.levels == 0 {
            return cluster;
        }

        let space: Vec<Interval> = cluster
            .ispace
            .intervals
            .iter()
            .filter(|iv| iv.dim.is_space())
            .cloned()
            .collect();
        if space.is_empty() {
            return cluster;
        }

        let mut intervals: Vec<Interval> = cluster
            .ispace
            .intervals
            .iter()
            .filter(|iv| !iv.dim.is_space())
            .cloned()
            .collect();
        for level in 0..self.levels {
            for iv in &space {
                intervals.push(Interval::new(
                    Dimension::block(block_name(&iv.dim.name, level), level),
                    iv.lower,
                    iv.upper,
                ));
            }
        }
        for iv in &space {
            intervals.push(Interval::new(
                Dimension::incr(
                    iv.dim.name.clone(),
                    block_name(&iv.dim.name, self.levels - 1),
                ),
                iv.lower,
                iv.upper,
            ));
        }

        cluster.ispace = IterationSpace::new(intervals);
        cluster
    }
}

fn block_name(dim: &str, level: u32) -> String {
    format!("{}0_blk{}", dim, level)
}

pub fn blocking(clusters: Vec<Cluster>, ctx: &mut BuildContext) -> Result<Vec<Cluster>> {
    Ok(Blocking::new(&ctx.options).process(clusters))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{OperatorOptions, StrategyDefaults};
    use crate::platform::Platform;
    use stencilop_ir::{Assignment, DimKind, Expr, Index};

    fn ctx_with_levels(levels: u32) -> BuildContext {
        let raw = OperatorOptions::new().with_blocklevels(levels);
        let options = Options::normalize(&raw, &StrategyDefaults::base());
        BuildContext::new(options, Platform::cpu64())
    }

    fn txy_cluster() -> Cluster {
        Cluster::new(
            vec![Assignment::new(
                Expr::access(
                    "u",
                    vec![Index::new("t", 1), Index::new("x", 0), Index::new("y", 0)],
                ),
                Expr::access(
                    "u",
                    vec![Index::new("t", 0), Index::new("x", 1), Index::new("y", 0)],
                ),
            )],
            IterationSpace::new(vec![
                Interval::new(Dimension::time("t"), 0, 0),
                Interval::new(Dimension::space("x"), 0, 0),
                Interval::new(Dimension::space("y"), 0, 0),
            ]),
        )
    }

    #[test]
    fn test_single_level_blocking_shape() {
        let out = blocking(vec![txy_cluster()], &mut ctx_with_levels(1)).unwrap();
        let names: Vec<&str> = out[0].ispace.dims().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["t", "x0_blk0", "y0_blk0", "x", "y"]);
        let kinds: Vec<bool> = out[0].ispace.dims().map(Dimension::is_incr).collect();
        assert_eq!(kinds, vec![false, false, false, true, true]);
    }

    #[test]
    fn test_incr_dimension_parents_innermost_block() {
        let out = blocking(vec![txy_cluster()], &mut ctx_with_levels(2)).unwrap();
        let incr = out[0]
            .ispace
            .dims()
            .find(|d| d.name == "x")
            .unwrap()
            .clone();
        let DimKind::Incr { parent } = incr.kind else {
            panic!("x must become an incremental dimension");
        };
        assert_eq!(parent, "x0_blk1");
    }

    #[test]
    fn test_sequential_clusters_are_not_blocked() {
        let cluster = txy_cluster().sequential();
        let out = blocking(vec![cluster.clone()], &mut ctx_with_levels(1)).unwrap();
        assert_eq!(out[0].ispace, cluster.ispace);
    }

    #[test]
    fn test_blocking_is_idempotent() {
        let mut ctx = ctx_with_levels(1);
        let once = blocking(vec![txy_cluster()], &mut ctx).unwrap();
        let twice = blocking(once.clone(), &mut ctx).unwrap();
        assert_eq!(once, twice);
    }
}
