//! Increment extraction.
//!
//! Rewrites accumulation statements `u = u + e` so the addend is computed
//! into a fresh scalar temporary ahead of the increment. Downstream passes
//! (CIRE, CSE, factorization) then see the addend as a first-class
//! expression.

use anyhow::Result;

use stencilop_ir::{Assignment, Cluster, Expr};

use crate::context::BuildContext;

pub fn extract_increments(clusters: Vec<Cluster>, ctx: &mut BuildContext) -> Result<Vec<Cluster>> {
    let mut out = Vec::with_capacity(clusters.len());
    for mut cluster in clusters {
        let mut exprs = Vec::with_capacity(cluster.exprs.len());
        for a in std::mem::take(&mut cluster.exprs) {
            match split_increment(&a) {
                Some(addend) => {
                    let name = ctx.registry.make_name("r");
                    exprs.push(Assignment::new(Expr::sym(name.clone()), addend));
                    exprs.push(Assignment::new(
                        a.target.clone(),
                        Expr::add(a.target.clone(), Expr::sym(name)),
                    ));
                }
                None => exprs.push(a),
            }
        }
        cluster.exprs = exprs;
        out.push(cluster);
    }
    Ok(out)
}

/// The non-trivial addend of a top-level increment, if the statement is one.
fn split_increment(a: &Assignment) -> Option<Expr> {
    let Expr::Add(l, r) = &a.rhs else {
        return None;
    };
    let addend = if **l == a.target {
        (**r).clone()
    } else if **r == a.target {
        (**l).clone()
    } else {
        return None;
    };
    (addend.op_count() >= 1).then_some(addend)
}
