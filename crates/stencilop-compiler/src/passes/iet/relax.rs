//! Incremental-dimension relaxation.
//!
//! Once blocking is in effect, the extent of a boundary block is smaller
//! than the tile size. This pass rewrites the upper bound of every
//! incremental-dimension loop to a block-clamped bound so boundary blocks
//! may have non-uniform extent.

use anyhow::Result;

use stencilop_ir::{Bound, DimKind, Graph, Node};

use crate::context::BuildContext;

pub fn relax_incr_dimensions(graph: &mut Graph, _ctx: &mut BuildContext) -> Result<()> {
    relax_body(graph.body_mut());
    Ok(())
}

fn relax_body(body: &mut Vec<Node>) {
    for node in body.iter_mut() {
        if let Node::Loop { dim, upper, .. } = node {
            if let DimKind::Incr { parent } = &dim.kind {
                if let Bound::Fixed(extent) = upper {
                    *upper = Bound::Relaxed {
                        parent: parent.clone(),
                        extent: *extent,
                    };
                }
            }
        }
        if let Some(inner) = node.body_mut() {
            relax_body(inner);
        }
    }
}
