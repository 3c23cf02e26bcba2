//! Symbol definition and cast placement.
//!
//! For every symbol referenced in the final IET that is neither a parameter
//! nor already declared, [`DataManager::place_definitions`] inserts its
//! definition at the minimal enclosing scope valid on every execution path
//! reaching a use. [`DataManager::place_casts`] inserts the access casts for
//! the array parameters actually referenced. Parameters are only ever read;
//! the root signature is never modified.
//!
//! Symbol placement is the terminal IET mutation of every build: all other
//! passes run before it.

use std::collections::BTreeSet;

use anyhow::Result;
use indexmap::IndexSet;

use stencilop_ir::{DType, Expr, Graph, Node, Parameter, Pragma};

use crate::context::BuildContext;

#[derive(Debug, Default)]
pub struct DataManager;

impl DataManager {
    pub fn new() -> Self {
        DataManager
    }

    pub fn place_definitions(&self, graph: &mut Graph) -> Result<()> {
        let params: BTreeSet<String> = graph
            .parameters()
            .iter()
            .map(|p| p.name.clone())
            .collect();
        let mut defined: BTreeSet<String> = BTreeSet::new();
        graph.visit(&mut |n| {
            if let Node::Definition { name, .. } = n {
                defined.insert(name.clone());
            }
        });

        let mut referenced = IndexSet::new();
        for node in graph.body() {
            subtree_refs(node, &mut referenced);
        }

        let missing: Vec<String> = referenced
            .into_iter()
            .filter(|name| !params.contains(name) && !defined.contains(name))
            .collect();
        for name in missing {
            let dtype = infer_dtype(&name);
            place_one(graph.body_mut(), &name, dtype);
        }
        Ok(())
    }

    pub fn place_casts(&self, graph: &mut Graph) -> Result<()> {
        let params: Vec<Parameter> = graph.parameters().to_vec();
        let mut referenced = IndexSet::new();
        for node in graph.body() {
            subtree_refs(node, &mut referenced);
        }

        let body = graph.body_mut();
        let existing: BTreeSet<String> = body
            .iter()
            .filter_map(|n| match n {
                Node::Cast { name, .. } => Some(name.clone()),
                _ => None,
            })
            .collect();

        let at = insertion_index(body);
        let mut inserted = 0;
        for p in &params {
            if p.pointer && referenced.contains(&p.name) && !existing.contains(&p.name) {
                body.insert(
                    at + inserted,
                    Node::Cast {
                        name: p.name.clone(),
                        dtype: p.dtype,
                    },
                );
                inserted += 1;
            }
        }
        Ok(())
    }
}

/// Pass-contract wrapper: definitions then casts, the terminal pass.
pub fn place_symbols(graph: &mut Graph, _ctx: &mut BuildContext) -> Result<()> {
    let manager = DataManager::new();
    manager.place_definitions(graph)?;
    manager.place_casts(graph)?;
    Ok(())
}

/// Data symbols referenced anywhere in `node`'s subtree. Loop iterators are
/// loop-scoped and excluded.
fn subtree_refs(node: &Node, out: &mut IndexSet<String>) {
    own_refs(node, out);
    if let Some(body) = node.body() {
        for child in body {
            subtree_refs(child, out);
        }
    }
}

/// Data symbols referenced by the node itself, excluding its subtree.
fn own_refs(node: &Node, out: &mut IndexSet<String>) {
    match node {
        Node::Statement(a) => {
            expr_refs(&a.target, out);
            expr_refs(&a.rhs, out);
        }
        Node::Conditional { condition, .. } => expr_refs(condition, out),
        Node::Loop { pragmas, .. } => {
            for p in pragmas {
                if let Pragma::ParallelFor { nthreads, .. } = p {
                    out.insert(nthreads.clone());
                }
            }
        }
        Node::HaloExchange { arrays, .. } => {
            for a in arrays {
                out.insert(a.clone());
            }
        }
        Node::Prodder { name } => {
            out.insert(name.clone());
        }
        Node::Function { .. }
        | Node::Definition { .. }
        | Node::Cast { .. }
        | Node::Directive(_) => {}
    }
}

fn expr_refs(e: &Expr, out: &mut IndexSet<String>) {
    e.visit(&mut |sub| match sub {
        Expr::Symbol(name) => {
            out.insert(name.clone());
        }
        Expr::Access { array, .. } => {
            out.insert(array.clone());
        }
        _ => {}
    });
}

/// Insert one definition at the deepest scope containing every use.
fn place_one(body: &mut Vec<Node>, name: &str, dtype: DType) {
    let holders: Vec<usize> = body
        .iter()
        .enumerate()
        .filter(|(_, n)| {
            let mut refs = IndexSet::new();
            subtree_refs(n, &mut refs);
            refs.contains(name)
        })
        .map(|(i, _)| i)
        .collect();

    if holders.len() == 1 {
        let i = holders[0];
        let mut own = IndexSet::new();
        own_refs(&body[i], &mut own);
        if !own.contains(name) {
            if let Some(inner) = body[i].body_mut() {
                place_one(inner, name, dtype);
                return;
            }
        }
    }

    let at = insertion_index(body);
    body.insert(
        at,
        Node::Definition {
            name: name.to_string(),
            dtype,
        },
    );
}

/// First position past the leading declaration block.
fn insertion_index(body: &[Node]) -> usize {
    body.iter()
        .take_while(|n| {
            matches!(
                n,
                Node::Directive(_) | Node::Definition { .. } | Node::Cast { .. }
            )
        })
        .count()
}

fn infer_dtype(name: &str) -> DType {
    if name.starts_with("nthreads") || name.starts_with("prodder") {
        DType::Int32
    } else {
        DType::Float32
    }
}
