//! The pass libraries.
//!
//! Every cluster-level pass has the shape
//! `fn(Vec<Cluster>, &mut BuildContext) -> Result<Vec<Cluster>>` and every
//! IET-level pass the shape `fn(&mut Graph, &mut BuildContext) -> Result<()>`.
//! The fixed strategies reference these functions directly; the custom
//! pipeline engine reaches them through its per-stage mapper tables.

pub mod clusters;
pub mod iet;
