//! Factorization.
//!
//! Collects common multiplicands across the terms of a sum:
//! `a*b + a*c → a*(b+c)`. Applied bottom-up; reduces operation count
//! within floating-point re-association tolerance.

use std::collections::BTreeSet;

use anyhow::Result;
use indexmap::IndexMap;

use stencilop_ir::{Cluster, Expr};

use crate::context::BuildContext;

pub fn factorize(clusters: Vec<Cluster>, _ctx: &mut BuildContext) -> Result<Vec<Cluster>> {
    Ok(clusters
        .into_iter()
        .map(|mut c| {
            for a in &mut c.exprs {
                a.rhs = factor_expr(&a.rhs);
            }
            c
        })
        .collect())
}

fn factor_expr(e: &Expr) -> Expr {
    let rebuilt = match e {
        Expr::Constant(_) | Expr::Symbol(_) | Expr::Access { .. } => e.clone(),
        Expr::Add(l, r) => Expr::add(factor_expr(l), factor_expr(r)),
        Expr::Sub(l, r) => Expr::sub(factor_expr(l), factor_expr(r)),
        Expr::Mul(l, r) => Expr::mul(factor_expr(l), factor_expr(r)),
        Expr::Div(l, r) => Expr::div(factor_expr(l), factor_expr(r)),
        Expr::Min(l, r) => Expr::min(factor_expr(l), factor_expr(r)),
        Expr::Pow(b, n) => Expr::pow(factor_expr(b), *n),
    };
    match rebuilt {
        Expr::Add(_, _) => factor_sum(rebuilt),
        other => other,
    }
}

fn factor_sum(e: Expr) -> Expr {
    let mut terms = Vec::new();
    flatten_sum(&e, &mut terms);
    if terms.len() < 2 {
        return e;
    }

    // Count how many terms carry each factor, once per term.
    let mut counts: IndexMap<String, (Expr, usize)> = IndexMap::new();
    for term in &terms {
        let mut factors = Vec::new();
        flatten_product(term, &mut factors);
        let mut seen = BTreeSet::new();
        for factor in &factors {
            if seen.insert(factor.key()) {
                counts
                    .entry(factor.key())
                    .or_insert_with(|| (factor.clone(), 0))
                    .1 += 1;
            }
        }
    }

    let Some((common, _)) = counts
        .values()
        .filter(|(_, count)| *count >= 2)
        .max_by_key(|(_, count)| *count)
        .map(|(f, c)| (f.clone(), *c))
    else {
        return e;
    };

    let mut reduced = Vec::new();
    let mut rest = Vec::new();
    for term in terms {
        let mut factors = Vec::new();
        flatten_product(&term, &mut factors);
        match factors.iter().position(|f| f.key() == common.key()) {
            Some(i) => {
                factors.remove(i);
                reduced.push(rebuild_product(factors));
            }
            None => rest.push(term),
        }
    }

    let factored = Expr::mul(common, rebuild_sum(reduced));
    if rest.is_empty() {
        factored
    } else {
        Expr::add(factored, rebuild_sum(rest))
    }
}

fn flatten_sum(e: &Expr, out: &mut Vec<Expr>) {
    match e {
        Expr::Add(l, r) => {
            flatten_sum(l, out);
            flatten_sum(r, out);
        }
        other => out.push(other.clone()),
    }
}

fn flatten_product(e: &Expr, out: &mut Vec<Expr>) {
    match e {
        Expr::Mul(l, r) => {
            flatten_product(l, out);
            flatten_product(r, out);
        }
        other => out.push(other.clone()),
    }
}

fn rebuild_sum(terms: Vec<Expr>) -> Expr {
    terms
        .into_iter()
        .reduce(Expr::add)
        .unwrap_or(Expr::Constant(0.0))
}

fn rebuild_product(factors: Vec<Expr>) -> Expr {
    factors
        .into_iter()
        .reduce(Expr::mul)
        .unwrap_or(Expr::Constant(1.0))
}
