//! Cross-iteration redundant-expression elimination (CIRE).
//!
//! Detects aliasing sub-expressions (dimension-invariant ones, or sums of
//! products recurring across statements) whose estimated operation count
//! meets the category's minimum cost, and rewrites them through a temporary
//! array computed in a dedicated alias cluster placed ahead of its consumer.
//! The alias cluster initially shares the consumer's iteration space; `lift`
//! subsequently drops the invariant dimensions.
//!
//! Tuned per category by the normalized `{repeats, mincost}` options.

use indexmap::IndexMap;

use anyhow::Result;

use stencilop_ir::{Assignment, Cluster, Expr, Index};

use crate::context::BuildContext;
use crate::options::CireCategory;

pub fn cire_invariants(clusters: Vec<Cluster>, ctx: &mut BuildContext) -> Result<Vec<Cluster>> {
    cire(clusters, CireCategory::Invariants, ctx)
}

pub fn cire_sops(clusters: Vec<Cluster>, ctx: &mut BuildContext) -> Result<Vec<Cluster>> {
    cire(clusters, CireCategory::SumsOfProducts, ctx)
}

/// Run CIRE for one category, `repeats` rounds or until no candidate
/// survives the cost threshold.
pub fn cire(
    mut clusters: Vec<Cluster>,
    category: CireCategory,
    ctx: &mut BuildContext,
) -> Result<Vec<Cluster>> {
    let config = ctx.options.cire.get(category);
    for _ in 0..config.repeats {
        let (next, changed) = cire_once(clusters, category, config.mincost, ctx);
        clusters = next;
        if !changed {
            break;
        }
    }
    Ok(clusters)
}

fn cire_once(
    clusters: Vec<Cluster>,
    category: CireCategory,
    mincost: usize,
    ctx: &mut BuildContext,
) -> (Vec<Cluster>, bool) {
    let mut out = Vec::new();
    let mut changed = false;
    for mut cluster in clusters {
        match select_candidate(&cluster, category, mincost) {
            Some(candidate) => {
                changed = true;
                let name = ctx.registry.make_name("r");
                let dims = candidate.dims();
                let indices: Vec<Index> = cluster
                    .ispace
                    .dims()
                    .filter(|d| dims.contains(&d.name))
                    .map(|d| Index::new(d.name.clone(), 0))
                    .collect();
                let access = Expr::access(name, indices);
                let alias = Cluster {
                    exprs: vec![Assignment::new(access.clone(), candidate.clone())],
                    ispace: cluster.ispace.clone(),
                    guards: cluster.guards.clone(),
                    properties: cluster.properties.clone(),
                };
                for a in &mut cluster.exprs {
                    a.rhs = a.rhs.replace(&candidate, &access);
                }
                out.push(alias);
                out.push(cluster);
            }
            None => out.push(cluster),
        }
    }
    (out, changed)
}

/// The most expensive qualifying alias candidate of a cluster, if any.
fn select_candidate(cluster: &Cluster, category: CireCategory, mincost: usize) -> Option<Expr> {
    let mut counts: IndexMap<String, (Expr, usize)> = IndexMap::new();
    for a in &cluster.exprs {
        for sub in a.rhs.subexprs() {
            counts
                .entry(sub.key())
                .or_insert_with(|| (sub.clone(), 0))
                .1 += 1;
        }
    }

    let ispace_dims: Vec<String> = cluster
        .ispace
        .dims()
        .map(|d| d.name.clone())
        .collect();

    counts
        .values()
        .filter(|(e, count)| {
            e.op_count() >= mincost
                && match category {
                    CireCategory::Invariants => {
                        ispace_dims.iter().any(|d| e.is_invariant(d))
                    }
                    CireCategory::SumsOfProducts => *count >= 2 && has_product(e),
                }
        })
        // Re-aliasing an entire right-hand side buys nothing.
        .filter(|(e, _)| !cluster.exprs.iter().any(|a| &a.rhs == e))
        // The alias executes ahead of the cluster; it must not read a value
        // the cluster itself writes at that point.
        .filter(|(e, _)| !cluster.exprs.iter().any(|a| e.contains(&a.target)))
        .max_by_key(|(e, _)| e.op_count())
        .map(|(e, _)| e.clone())
}

fn has_product(e: &Expr) -> bool {
    let mut found = false;
    e.visit(&mut |sub| {
        if matches!(sub, Expr::Mul(_, _)) {
            found = true;
        }
    });
    found
}
