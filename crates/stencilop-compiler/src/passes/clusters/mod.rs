//! Cluster-level transformation passes.
//!
//! All passes here are value-to-value over the ordered cluster sequence:
//! they never mutate a cluster in place, which keeps them composable and
//! individually testable. Fresh temporaries come from the build's
//! [`SymbolRegistry`](stencilop_ir::SymbolRegistry).

mod arrays;
mod blocking;
mod cire;
mod cse;
mod factorize;
mod fusion;
mod increments;
mod lift;
mod powers;

pub use arrays::eliminate_arrays;
pub use blocking::{blocking, Blocking};
pub use cire::{cire, cire_invariants, cire_sops};
pub use cse::cse;
pub use factorize::factorize;
pub use fusion::{fuse, fuse_toposort};
pub use increments::extract_increments;
pub use lift::lift;
pub use powers::optimize_pows;
