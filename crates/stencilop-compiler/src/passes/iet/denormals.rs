//! Denormal flushing.

use anyhow::Result;

use stencilop_ir::{Directive, Graph, Node};

use crate::context::BuildContext;

/// Insert the flush-denormals directive at the top of the kernel body.
/// A runtime-flag effect only; the tree structure is otherwise untouched.
pub fn avoid_denormals(graph: &mut Graph, _ctx: &mut BuildContext) -> Result<()> {
    let body = graph.body_mut();
    let present = body
        .first()
        .is_some_and(|n| matches!(n, Node::Directive(Directive::FlushDenormals)));
    if !present {
        body.insert(0, Node::Directive(Directive::FlushDenormals));
    }
    Ok(())
}
