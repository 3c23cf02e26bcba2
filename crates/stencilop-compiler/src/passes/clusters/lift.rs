//! Lifting of invariant alias clusters.
//!
//! A cluster that only writes compiler temporaries and whose statements do
//! not vary along some of its iteration dimensions is recomputing the same
//! values once per invariant iteration. Lifting projects those dimensions
//! out of its iteration space, which relocates the computation outside the
//! invariant loop(s) at the cost of keeping the temporary array live across
//! them.

use std::collections::BTreeSet;

use anyhow::Result;

use stencilop_ir::{Cluster, SymbolRegistry};

use crate::context::BuildContext;

pub fn lift(clusters: Vec<Cluster>, _ctx: &mut BuildContext) -> Result<Vec<Cluster>> {
    Ok(clusters.into_iter().map(lift_cluster).collect())
}

fn lift_cluster(mut cluster: Cluster) -> Cluster {
    let writes_temporaries_only = cluster
        .exprs
        .iter()
        .all(|a| a.write_name().is_some_and(SymbolRegistry::is_generated));
    if !writes_temporaries_only {
        return cluster;
    }

    let mut used: BTreeSet<String> = BTreeSet::new();
    for a in &cluster.exprs {
        used.extend(a.target.dims());
        used.extend(a.rhs.dims());
    }
    for g in &cluster.guards {
        used.extend(g.dims());
    }

    let invariant: BTreeSet<String> = cluster
        .ispace
        .dims()
        .filter(|d| !used.contains(&d.name))
        .map(|d| d.name.clone())
        .collect();
    if !invariant.is_empty() {
        cluster.ispace = cluster.ispace.without(&invariant);
    }
    cluster
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

    fn xy_space() -> IterationSpace {
        IterationSpace::new(vec![
            Interval::new(Dimension::space("x"), 0, 0),
            Interval::new(Dimension::space("y"), 0, 0),
        ])
    }

    #[test]
    fn test_alias_cluster_drops_invariant_dimension() {
        let alias = Cluster::new(
            vec![Assignment::new(
                Expr::access("r0", vec![Index::new("x", 0)]),
                Expr::mul(
                    Expr::access("c", vec![Index::new("x", 0)]),
                    Expr::access("c", vec![Index::new("x", 0)]),
                ),
            )],
            xy_space(),
        );
        let out = lift(vec![alias], &mut ctx()).unwrap();
        assert!(!out[0].ispace.contains("y"));
        assert!(out[0].ispace.contains("x"));
    }

    #[test]
    fn test_user_data_is_never_lifted() {
        // Writes a user grid function; iteration space must survive intact
        // even though the statement is y-invariant.
        let cluster = Cluster::new(
            vec![Assignment::new(
                Expr::access("u", vec![Index::new("x", 0)]),
                Expr::access("c", vec![Index::new("x", 0)]),
            )],
            xy_space(),
        );
        let out = lift(vec![cluster], &mut ctx()).unwrap();
        assert!(out[0].ispace.contains("y"));
    }
}
