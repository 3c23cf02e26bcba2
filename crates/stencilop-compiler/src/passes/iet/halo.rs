//! Distributed-memory communication passes.
//!
//! `mpiize` injects halo exchanges at the minimal set of points sufficient
//! to keep boundary data consistent for the configured communication
//! scheme: once, ahead of the outermost space loop, inside the stepping
//! loop if there is one. A progress prodder is planted in the first space
//! loop so asynchronous communication advances during computation
//! (`hoist_prodders` later relocates it).
//!
//! `optimize_halospots` merges adjacent exchanges over the same scheme and
//! hoists exchanges out of loops that do not write the exchanged arrays.

use std::collections::BTreeSet;

use anyhow::Result;

use stencilop_ir::{Expr, Graph, Node};

use crate::context::BuildContext;

/// Inject halo exchanges for every array read at a nonzero stencil offset.
/// Skipped when distributed-memory parallelism is off; injected exactly
/// once per build.
pub fn mpiize(graph: &mut Graph, ctx: &mut BuildContext) -> Result<()> {
    let Some(scheme) = ctx.options.mpi.scheme() else {
        return Ok(());
    };
    if graph.any(|n| matches!(n, Node::HaloExchange { .. })) {
        return Ok(());
    }

    let mut arrays: BTreeSet<String> = BTreeSet::new();
    graph.visit(&mut |n| {
        if let Node::Statement(a) = n {
            collect_halo_reads(&a.rhs, &mut arrays);
        }
    });
    if arrays.is_empty() {
        return Ok(());
    }

    let exchange = Node::HaloExchange {
        arrays: arrays.into_iter().collect(),
        mode: scheme,
    };
    let prodder = ctx.registry.make_name("prodder");
    insert_exchange(graph.body_mut(), exchange, prodder);
    Ok(())
}

fn collect_halo_reads(e: &Expr, out: &mut BTreeSet<String>) {
    e.visit(&mut |sub| {
        if let Expr::Access { array, indices } = sub {
            if indices.iter().any(|i| i.offset != 0) {
                out.insert(array.clone());
            }
        }
    });
}

/// Place the exchange before the first non-stepping loop, descending
/// through stepping loops so the halo refreshes every step.
fn insert_exchange(body: &mut Vec<Node>, exchange: Node, prodder: String) {
    let Some(i) = body.iter().position(|n| matches!(n, Node::Loop { .. })) else {
        body.insert(0, exchange);
        return;
    };
    let stepping = matches!(&body[i], Node::Loop { dim, .. } if dim.is_time());
    if let Node::Loop { body: inner, .. } = &mut body[i] {
        if stepping {
            insert_exchange(inner, exchange, prodder);
            return;
        }
        inner.insert(0, Node::Prodder { name: prodder });
    }
    body.insert(i, exchange);
}

/// Merge and hoist halo exchanges already present in the tree.
pub fn optimize_halospots(graph: &mut Graph, _ctx: &mut BuildContext) -> Result<()> {
    optimize_body(graph.body_mut());
    Ok(())
}

fn optimize_body(body: &mut Vec<Node>) {
    for node in body.iter_mut() {
        if let Some(inner) = node.body_mut() {
            optimize_body(inner);
        }
    }

    // Hoist exchanges out of loops that do not write their arrays.
    let mut i = 0;
    while i < body.len() {
        let mut hoisted: Vec<Node> = Vec::new();
        if let Node::Loop { body: inner, .. } = &mut body[i] {
            let written = writes_in(inner);
            let mut kept = Vec::with_capacity(inner.len());
            for n in inner.drain(..) {
                match &n {
                    Node::HaloExchange { arrays, .. }
                        if arrays.iter().all(|a| !written.contains(a)) =>
                    {
                        hoisted.push(n)
                    }
                    _ => kept.push(n),
                }
            }
            *inner = kept;
        }
        let count = hoisted.len();
        for (k, n) in hoisted.into_iter().enumerate() {
            body.insert(i + k, n);
        }
        i += count + 1;
    }

    // Merge adjacent exchanges over the same scheme.
    let mut i = 0;
    while i + 1 < body.len() {
        let same_mode = matches!(
            (&body[i], &body[i + 1]),
            (
                Node::HaloExchange { mode: a, .. },
                Node::HaloExchange { mode: b, .. }
            ) if a == b
        );
        if same_mode {
            let Node::HaloExchange { arrays: merged, .. } = body.remove(i + 1) else {
                unreachable!("matched above");
            };
            if let Node::HaloExchange { arrays, .. } = &mut body[i] {
                for a in merged {
                    if !arrays.contains(&a) {
                        arrays.push(a);
                    }
                }
                arrays.sort();
            }
        } else {
            i += 1;
        }
    }
}

fn writes_in(body: &[Node]) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    for node in body {
        node.visit(&mut |n| {
            if let Node::Statement(a) = n {
                if let Some(w) = a.write_name() {
                    out.insert(w.to_string());
                }
            }
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{MpiMode, OperatorOptions, Options, StrategyDefaults};
    use crate::platform::Platform;
    use stencilop_ir::{
        iet, Assignment, Cluster, Dimension, HaloScheme, Index, Interval, IterationSpace,
    };

    fn ctx_with_mpi(mpi: MpiMode) -> BuildContext {
        let raw = OperatorOptions::new().with_mpi(mpi);
        let options = Options::normalize(&raw, &StrategyDefaults::base());
        BuildContext::new(options, Platform::cpu64())
    }

    fn stencil_graph() -> Graph {
        let cluster = Cluster::new(
            vec![Assignment::new(
                Expr::access("u", vec![Index::new("t", 1), Index::new("x", 0)]),
                Expr::add(
                    Expr::access("u", vec![Index::new("t", 0), Index::new("x", 1)]),
                    Expr::access("u", vec![Index::new("t", 0), Index::new("x", -1)]),
                ),
            )],
            IterationSpace::new(vec![
                Interval::new(Dimension::time("t"), 0, 0),
                Interval::new(Dimension::space("x"), 0, 0),
            ]),
        );
        iet::build(&[cluster]).unwrap()
    }

    #[test]
    fn test_mpiize_injects_exchange_inside_time_loop() {
        let mut g = stencil_graph();
        mpiize(&mut g, &mut ctx_with_mpi(MpiMode::Basic)).unwrap();
        let Node::Loop { dim, body, .. } = &g.body()[0] else {
            panic!("expected time loop");
        };
        assert!(dim.is_time());
        assert!(
            matches!(&body[0], Node::HaloExchange { arrays, mode } if arrays == &vec!["u".to_string()] && *mode == HaloScheme::Basic)
        );
    }

    #[test]
    fn test_mpiize_off_is_noop() {
        let mut g = stencil_graph();
        mpiize(&mut g, &mut ctx_with_mpi(MpiMode::Off)).unwrap();
        assert!(!g.any(|n| matches!(n, Node::HaloExchange { .. })));
    }

    #[test]
    fn test_mpiize_injects_exactly_once() {
        let mut g = stencil_graph();
        let mut ctx = ctx_with_mpi(MpiMode::Basic);
        mpiize(&mut g, &mut ctx).unwrap();
        mpiize(&mut g, &mut ctx).unwrap();
        assert_eq!(g.count(|n| matches!(n, Node::HaloExchange { .. })), 1);
    }

    #[test]
    fn test_mpiize_plants_prodder_in_space_loop() {
        let mut g = stencil_graph();
        mpiize(&mut g, &mut ctx_with_mpi(MpiMode::Basic)).unwrap();
        assert!(g.any(|n| matches!(n, Node::Prodder { .. })));
    }

    #[test]
    fn test_halospot_merge() {
        let mut g = stencil_graph();
        g.body_mut().insert(
            0,
            Node::HaloExchange {
                arrays: vec!["u".to_string()],
                mode: HaloScheme::Basic,
            },
        );
        g.body_mut().insert(
            1,
            Node::HaloExchange {
                arrays: vec!["v".to_string()],
                mode: HaloScheme::Basic,
            },
        );
        optimize_halospots(&mut g, &mut ctx_with_mpi(MpiMode::Basic)).unwrap();
        assert_eq!(g.count(|n| matches!(n, Node::HaloExchange { .. })), 1);
        let Node::HaloExchange { arrays, .. } = &g.body()[0] else {
            panic!("expected merged exchange first");
        };
        assert_eq!(arrays, &vec!["u".to_string(), "v".to_string()]);
    }

    #[test]
    fn test_halospot_hoists_out_of_read_only_loop() {
        let mut g = stencil_graph();
        // Plant an exchange of an array the loop nest never writes.
        let Node::Loop { body, .. } = &mut g.body_mut()[0] else {
            panic!("expected time loop");
        };
        body.insert(
            0,
            Node::HaloExchange {
                arrays: vec!["coeffs".to_string()],
                mode: HaloScheme::Basic,
            },
        );
        optimize_halospots(&mut g, &mut ctx_with_mpi(MpiMode::Basic)).unwrap();
        // Hoisted all the way to the function body.
        assert!(
            matches!(&g.body()[0], Node::HaloExchange { arrays, .. } if arrays == &vec!["coeffs".to_string()])
        );
    }
}
