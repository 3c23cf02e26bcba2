//! Common-subexpression elimination.
//!
//! Keyed on the canonical textual form of each compound subexpression, as in
//! hash-based CSE. Repeated subexpressions within one cluster are computed
//! once into a fresh scalar temporary inserted before their first use. No
//! arithmetic is re-associated, so numerical semantics are preserved
//! exactly.

use anyhow::Result;
use indexmap::IndexMap;

use stencilop_ir::{Assignment, Cluster, Expr};

use crate::context::BuildContext;

pub fn cse(clusters: Vec<Cluster>, ctx: &mut BuildContext) -> Result<Vec<Cluster>> {
    Ok(clusters
        .into_iter()
        .map(|c| cse_cluster(c, ctx))
        .collect())
}

fn cse_cluster(mut cluster: Cluster, ctx: &mut BuildContext) -> Cluster {
    loop {
        let Some(candidate) = select_candidate(&cluster) else {
            break;
        };
        let name = ctx.registry.make_name("r");
        let sym = Expr::sym(name);
        let first_use = cluster
            .exprs
            .iter()
            .position(|a| a.rhs.contains(&candidate))
            .unwrap_or(0);
        for a in &mut cluster.exprs {
            a.rhs = a.rhs.replace(&candidate, &sym);
        }
        cluster
            .exprs
            .insert(first_use, Assignment::new(sym, candidate));
    }
    cluster
}

fn select_candidate(cluster: &Cluster) -> Option<Expr> {
    let writes = cluster.writes();
    let mut counts: IndexMap<String, (Expr, usize)> = IndexMap::new();
    for a in &cluster.exprs {
        for sub in a.rhs.subexprs() {
            counts
                .entry(sub.key())
                .or_insert_with(|| (sub.clone(), 0))
                .1 += 1;
        }
    }
    counts
        .values()
        .filter(|(e, count)| *count >= 2 && e.op_count() >= 1)
        // A candidate reading a value this cluster writes cannot be cached
        // ahead of the write.
        .filter(|(e, _)| e.names().is_disjoint(&writes))
        .max_by_key(|(e, _)| e.op_count())
        .map(|(e, _)| e.clone())
}
