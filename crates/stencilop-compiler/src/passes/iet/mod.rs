//! IET-level transformation passes.
//!
//! These passes mutate the imperative execution tree in place. None of them
//! alters the root function's parameter list; symbol placement
//! ([`place_symbols`]) only adds definitions and casts, and always runs as
//! the final pass of every build.

mod data;
mod denormals;
mod halo;
mod parallelize;
mod prodders;
mod relax;

pub use data::{place_symbols, DataManager};
pub use denormals::avoid_denormals;
pub use halo::{mpiize, optimize_halospots};
pub use parallelize::{make_parallel, make_simd, Parallelizer};
pub use prodders::hoist_prodders;
pub use relax::relax_incr_dimensions;
