//! Prodder hoisting.
//!
//! Prodders are point probes advancing asynchronous progress (communication,
//! mostly). Inside a space loop they fire once per iteration; hoisting moves
//! them after the enclosing loop, cutting the per-iteration overhead.
//! Stepping loops are a barrier: a prodder must still fire once per step, so
//! it is never hoisted past a time loop.

use anyhow::Result;

use stencilop_ir::{Graph, Node};

use crate::context::BuildContext;

pub fn hoist_prodders(graph: &mut Graph, _ctx: &mut BuildContext) -> Result<()> {
    hoist_body(graph.body_mut());
    Ok(())
}

fn hoist_body(body: &mut Vec<Node>) {
    let mut i = 0;
    while i < body.len() {
        let mut extracted: Vec<Node> = Vec::new();
        if let Node::Loop {
            dim, body: inner, ..
        } = &mut body[i]
        {
            hoist_body(inner);
            if !dim.is_time() {
                let mut kept = Vec::with_capacity(inner.len());
                for n in inner.drain(..) {
                    if matches!(n, Node::Prodder { .. }) {
                        extracted.push(n);
                    } else {
                        kept.push(n);
                    }
                }
                *inner = kept;
            }
        } else if let Some(inner) = body[i].body_mut() {
            hoist_body(inner);
        }
        let count = extracted.len();
        for (k, n) in extracted.into_iter().enumerate() {
            body.insert(i + 1 + k, n);
        }
        i += 1 + count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{OperatorOptions, Options, StrategyDefaults};
    use crate::platform::Platform;
    use stencilop_ir::{Bound, Dimension};

    fn ctx() -> BuildContext {
        let options = Options::normalize(&OperatorOptions::new(), &StrategyDefaults::base());
        BuildContext::new(options, Platform::cpu64())
    }

    fn space_loop(name: &str, body: Vec<Node>) -> Node {
        Node::Loop {
            dim: Dimension::space(name),
            lower: Bound::Fixed(0),
            upper: Bound::Fixed(0),
            pragmas: Vec::new(),
            parallel: true,
            body,
        }
    }

    fn time_loop(body: Vec<Node>) -> Node {
        Node::Loop {
            dim: Dimension::time("t"),
            lower: Bound::Fixed(0),
            upper: Bound::Fixed(0),
            pragmas: Vec::new(),
            parallel: false,
            body,
        }
    }

    fn prodder() -> Node {
        Node::Prodder {
            name: "prodder0".to_string(),
        }
    }

    fn graph_with(body: Vec<Node>) -> Graph {
        Graph::new(Node::Function {
            name: "kernel".to_string(),
            parameters: Vec::new(),
            body,
        })
        .unwrap()
    }

    #[test]
    fn test_prodder_hoisted_out_of_space_loops() {
        let mut g = graph_with(vec![time_loop(vec![space_loop(
            "x",
            vec![space_loop("y", vec![prodder()])],
        )])]);
        hoist_prodders(&mut g, &mut ctx()).unwrap();

        // The prodder lands in the time-loop body, after the space nest.
        let Node::Loop { body, .. } = &g.body()[0] else {
            panic!("expected time loop");
        };
        assert_eq!(body.len(), 2);
        assert!(matches!(body[1], Node::Prodder { .. }));
        // And the space loops no longer contain it.
        let Node::Loop { body: x_body, .. } = &body[0] else {
            panic!("expected space loop");
        };
        assert!(x_body.iter().all(|n| !matches!(n, Node::Prodder { .. })));
    }

    #[test]
    fn test_prodder_not_hoisted_past_time_loop() {
        let mut g = graph_with(vec![time_loop(vec![prodder()])]);
        hoist_prodders(&mut g, &mut ctx()).unwrap();
        let Node::Loop { body, .. } = &g.body()[0] else {
            panic!("expected time loop");
        };
        assert!(matches!(body[0], Node::Prodder { .. }));
        assert_eq!(g.body().len(), 1);
    }
}
