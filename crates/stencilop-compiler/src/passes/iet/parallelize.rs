//! SIMD and shared-memory parallelism annotation.
//!
//! [`Parallelizer::make_simd`] marks innermost parallel loops as
//! vectorizable at the platform's lane width. [`Parallelizer::make_parallel`]
//! marks outermost parallel loops for thread-level execution, collapsing
//! perfectly nested parallel chains, and names the thread-count symbol
//! through the build's registry. The root signature is never touched; the
//! symbol is defined internally by symbol placement.

use anyhow::Result;

use stencilop_ir::{Graph, Node, Pragma, SymbolRegistry};

use crate::context::BuildContext;

pub struct Parallelizer<'a> {
    registry: &'a mut SymbolRegistry,
}

impl<'a> Parallelizer<'a> {
    pub fn new(registry: &'a mut SymbolRegistry) -> Self {
        Parallelizer { registry }
    }

    /// Annotate innermost eligible loops as vectorizable.
    pub fn make_simd(&mut self, graph: &mut Graph, width: usize) -> Result<()> {
        simd_body(graph.body_mut(), width);
        Ok(())
    }

    /// Annotate outermost eligible loops for thread-level parallelism.
    pub fn make_parallel(&mut self, graph: &mut Graph) -> Result<()> {
        let nthreads = self.registry.make_name("nthreads");
        parallel_body(graph.body_mut(), &nthreads);
        Ok(())
    }
}

fn simd_body(body: &mut Vec<Node>, width: usize) {
    for node in body.iter_mut() {
        if let Node::Loop {
            parallel,
            pragmas,
            body: inner,
            ..
        } = node
        {
            if *parallel && innermost(inner) {
                if !pragmas.iter().any(|p| matches!(p, Pragma::Simd { .. })) {
                    pragmas.push(Pragma::Simd { width });
                }
            } else {
                simd_body(inner, width);
            }
        } else if let Some(inner) = node.body_mut() {
            simd_body(inner, width);
        }
    }
}

fn innermost(body: &[Node]) -> bool {
    !body.iter().any(|n| {
        let mut has_loop = false;
        n.visit(&mut |sub| {
            if matches!(sub, Node::Loop { .. }) {
                has_loop = true;
            }
        });
        has_loop
    })
}

fn parallel_body(body: &mut Vec<Node>, nthreads: &str) {
    for node in body.iter_mut() {
        if let Node::Loop {
            dim,
            parallel,
            pragmas,
            body: inner,
            ..
        } = node
        {
            if *parallel && !dim.is_time() {
                let collapse = 1 + collapse_chain(inner);
                if !pragmas
                    .iter()
                    .any(|p| matches!(p, Pragma::ParallelFor { .. }))
                {
                    pragmas.push(Pragma::ParallelFor {
                        collapse,
                        nthreads: nthreads.to_string(),
                    });
                }
                // Outermost annotation; nested loops stay unannotated.
            } else {
                parallel_body(inner, nthreads);
            }
        } else if let Some(inner) = node.body_mut() {
            parallel_body(inner, nthreads);
        }
    }
}

/// Length of the perfectly nested parallel loop chain under `body`.
fn collapse_chain(body: &[Node]) -> usize {
    if body.len() == 1 {
        if let Node::Loop {
            parallel: true,
            body: inner,
            ..
        } = &body[0]
        {
            return 1 + collapse_chain(inner);
        }
    }
    0
}

/// Pass-contract wrapper around [`Parallelizer::make_simd`].
pub fn make_simd(graph: &mut Graph, ctx: &mut BuildContext) -> Result<()> {
    let width = ctx.platform.simd_items(4);
    Parallelizer::new(&mut ctx.registry).make_simd(graph, width)
}

/// Pass-contract wrapper around [`Parallelizer::make_parallel`].
pub fn make_parallel(graph: &mut Graph, ctx: &mut BuildContext) -> Result<()> {
    Parallelizer::new(&mut ctx.registry).make_parallel(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{OperatorOptions, Options, StrategyDefaults};
    use crate::platform::Platform;
    use stencilop_ir::{
        iet, Assignment, Cluster, Dimension, Expr, Index, Interval, IterationSpace,
    };

    fn ctx() -> BuildContext {
        let options = Options::normalize(&OperatorOptions::new(), &StrategyDefaults::base());
        BuildContext::new(options, Platform::cpu64())
    }

    fn txy_graph() -> Graph {
        let cluster = Cluster::new(
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
        );
        iet::build(&[cluster]).unwrap()
    }

    #[test]
    fn test_simd_marks_only_innermost() {
        let mut g = txy_graph();
        make_simd(&mut g, &mut ctx()).unwrap();
        let mut simd_dims = Vec::new();
        g.visit(&mut |n| {
            if let Node::Loop { dim, pragmas, .. } = n {
                if pragmas.iter().any(|p| matches!(p, Pragma::Simd { .. })) {
                    simd_dims.push(dim.name.clone());
                }
            }
        });
        assert_eq!(simd_dims, vec!["y".to_string()]);
    }

    #[test]
    fn test_simd_width_follows_platform() {
        let mut g = txy_graph();
        let options = Options::normalize(&OperatorOptions::new(), &StrategyDefaults::base());
        let mut ctx = BuildContext::new(options, Platform::cpu64_avx512());
        make_simd(&mut g, &mut ctx).unwrap();
        g.visit(&mut |n| {
            if let Node::Loop { pragmas, .. } = n {
                for p in pragmas {
                    if let Pragma::Simd { width } = p {
                        assert_eq!(*width, 16);
                    }
                }
            }
        });
    }

    #[test]
    fn test_parallel_marks_outermost_space_loop() {
        let mut g = txy_graph();
        make_parallel(&mut g, &mut ctx()).unwrap();
        let mut marked = Vec::new();
        g.visit(&mut |n| {
            if let Node::Loop { dim, pragmas, .. } = n {
                if let Some(Pragma::ParallelFor { collapse, nthreads }) = pragmas
                    .iter()
                    .find(|p| matches!(p, Pragma::ParallelFor { .. }))
                {
                    marked.push((dim.name.clone(), *collapse, nthreads.clone()));
                }
            }
        });
        // Only the outer space loop carries the pragma; the perfectly
        // nested y loop is collapsed into it.
        assert_eq!(marked, vec![("x".to_string(), 2, "nthreads0".to_string())]);
    }

    #[test]
    fn test_time_loop_never_parallel() {
        let mut g = txy_graph();
        make_parallel(&mut g, &mut ctx()).unwrap();
        g.visit(&mut |n| {
            if let Node::Loop { dim, pragmas, .. } = n {
                if dim.is_time() {
                    assert!(pragmas.is_empty());
                }
            }
        });
    }
}
