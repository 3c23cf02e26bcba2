//! Dead temporary elimination.
//!
//! Upstream rewrites (CIRE, CSE, fusion) can leave compiler temporaries that
//! nothing reads any more. This pass removes their defining statements and
//! drops clusters emptied by the removal, iterating to a fixed point since
//! killing one temporary can orphan its inputs. User data is never touched.

use std::collections::BTreeSet;

use anyhow::Result;

use stencilop_ir::{Cluster, SymbolRegistry};

use crate::context::BuildContext;

pub fn eliminate_arrays(
    mut clusters: Vec<Cluster>,
    _ctx: &mut BuildContext,
) -> Result<Vec<Cluster>> {
    loop {
        let mut reads: BTreeSet<String> = BTreeSet::new();
        for c in &clusters {
            reads.extend(c.reads());
        }

        let mut changed = false;
        for c in &mut clusters {
            let before = c.exprs.len();
            c.exprs.retain(|a| match a.write_name() {
                Some(w) => !SymbolRegistry::is_generated(w) || reads.contains(w),
                None => true,
            });
            changed |= c.exprs.len() != before;
        }

        let before = clusters.len();
        clusters.retain(|c| !c.exprs.is_empty());
        changed |= clusters.len() != before;

        if !changed {
            return Ok(clusters);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{OperatorOptions, Options, StrategyDefaults};
    use crate::platform::Platform;
    use stencilop_ir::{Assignment, Dimension, Expr, Index, Interval, IterationSpace};

    fn ctx() -> BuildContext {
        let options = Options::normalize(&OperatorOptions::new(), &StrategyDefaults::base());
        BuildContext::new(options, Platform::cpu64())
    }

    fn x_space() -> IterationSpace {
        IterationSpace::new(vec![Interval::new(Dimension::space("x"), 0, 0)])
    }

    #[test]
    fn test_unread_temporary_removed() {
        let dead = Cluster::new(
            vec![Assignment::new(
                Expr::access("r0", vec![Index::new("x", 0)]),
                Expr::access("u", vec![Index::new("x", 0)]),
            )],
            x_space(),
        );
        let live = Cluster::new(
            vec![Assignment::new(
                Expr::access("v", vec![Index::new("x", 0)]),
                Expr::access("u", vec![Index::new("x", 0)]),
            )],
            x_space(),
        );
        let out = eliminate_arrays(vec![dead, live.clone()], &mut ctx()).unwrap();
        assert_eq!(out, vec![live]);
    }

    #[test]
    fn test_chained_dead_temporaries_removed() {
        // r1 reads r0; neither is read by user data.
        let r0 = Cluster::new(
            vec![Assignment::new(
                Expr::access("r0", vec![Index::new("x", 0)]),
                Expr::access("u", vec![Index::new("x", 0)]),
            )],
            x_space(),
        );
        let r1 = Cluster::new(
            vec![Assignment::new(
                Expr::access("r1", vec![Index::new("x", 0)]),
                Expr::access("r0", vec![Index::new("x", 0)]),
            )],
            x_space(),
        );
        let out = eliminate_arrays(vec![r0, r1], &mut ctx()).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_read_temporary_kept() {
        let alias = Cluster::new(
            vec![Assignment::new(
                Expr::access("r0", vec![Index::new("x", 0)]),
                Expr::access("u", vec![Index::new("x", 0)]),
            )],
            x_space(),
        );
        let consumer = Cluster::new(
            vec![Assignment::new(
                Expr::access("v", vec![Index::new("x", 0)]),
                Expr::access("r0", vec![Index::new("x", 0)]),
            )],
            x_space(),
        );
        let out = eliminate_arrays(vec![alias.clone(), consumer.clone()], &mut ctx()).unwrap();
        assert_eq!(out, vec![alias, consumer]);
    }

    #[test]
    fn test_user_arrays_never_removed() {
        let unread = Cluster::new(
            vec![Assignment::new(
                Expr::access("out", vec![Index::new("x", 0)]),
                Expr::access("u", vec![Index::new("x", 0)]),
            )],
            x_space(),
        );
        let out = eliminate_arrays(vec![unread.clone()], &mut ctx()).unwrap();
        assert_eq!(out, vec![unread]);
    }
}
