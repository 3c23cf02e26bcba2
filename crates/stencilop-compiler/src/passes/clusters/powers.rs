//! Power optimization.
//!
//! Expands small integer powers into explicit multiplications (`x^2 → x*x`)
//! and collapses the trivial exponents. Larger or negative exponents are
//! left for the target compiler's math library.

use anyhow::Result;

use stencilop_ir::{Cluster, Expr};

use crate::context::BuildContext;

/// Exponents up to this bound are expanded into multiplication chains.
const MAX_EXPANDED_EXPONENT: i32 = 3;

pub fn optimize_pows(clusters: Vec<Cluster>, _ctx: &mut BuildContext) -> Result<Vec<Cluster>> {
    Ok(clusters
        .into_iter()
        .map(|mut c| {
            for a in &mut c.exprs {
                a.rhs = opt_pow(&a.rhs);
            }
            c
        })
        .collect())
}

fn opt_pow(e: &Expr) -> Expr {
    match e {
        Expr::Constant(_) | Expr::Symbol(_) | Expr::Access { .. } => e.clone(),
        Expr::Add(l, r) => Expr::add(opt_pow(l), opt_pow(r)),
        Expr::Sub(l, r) => Expr::sub(opt_pow(l), opt_pow(r)),
        Expr::Mul(l, r) => Expr::mul(opt_pow(l), opt_pow(r)),
        Expr::Div(l, r) => Expr::div(opt_pow(l), opt_pow(r)),
        Expr::Min(l, r) => Expr::min(opt_pow(l), opt_pow(r)),
        Expr::Pow(b, n) => {
            let base = opt_pow(b);
            match *n {
                0 => Expr::Constant(1.0),
                1 => base,
                n if (2..=MAX_EXPANDED_EXPONENT).contains(&n) => {
                    let mut out = base.clone();
                    for _ in 1..n {
                        out = Expr::mul(out, base.clone());
                    }
                    out
                }
                n => Expr::pow(base, n),
            }
        }
    }
}
