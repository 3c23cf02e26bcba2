//! Intermediate representations for the stencilop compiler.
//!
//! stencilop lowers symbolic stencil equations into parallel, cache-aware
//! imperative kernels. Two representations carry a build from equations to
//! emitted code:
//!
//! 1. **Clusters** ([`Cluster`]): groups of assignment statements sharing
//!    one iteration space. Cluster-level passes are value-to-value: they
//!    consume an ordered `Vec<Cluster>` and return a new one, which keeps
//!    each pass composable and testable in isolation.
//! 2. **The imperative execution tree** ([`iet::Graph`]): nested loops,
//!    guarded bodies, communication points, and symbol declarations rooted
//!    at the kernel entry function. IET-level passes mutate the tree in
//!    place; none of them may alter the root's parameter list.
//!
//! The [`SymbolRegistry`] spans both stages of a build, handing out fresh
//! temporary names so that no two passes can collide.
//!
//! # Examples
//!
//! ```
//! use stencilop_ir::{cluster, iet, Assignment, Dimension, Expr, Index, Interval, IterationSpace};
//!
//! let ispace = IterationSpace::new(vec![Interval::new(Dimension::space("x"), 0, 0)]);
//! let stmt = Assignment::new(
//!     Expr::access("v", vec![Index::new("x", 0)]),
//!     Expr::mul(
//!         Expr::Constant(0.5),
//!         Expr::access("u", vec![Index::new("x", 1)]),
//!     ),
//! );
//! let clusters = cluster::from_assignments(vec![(stmt, ispace)]);
//! let graph = iet::build(&clusters).unwrap();
//! assert_eq!(graph.parameters().iter().filter(|p| p.pointer).count(), 2);
//! ```

pub mod cluster;
mod dimension;
mod error;
mod expr;
pub mod iet;
mod registry;

pub use cluster::{Cluster, ClusterProperty};
pub use dimension::{DimKind, Dimension, Interval, IterationSpace};
pub use error::IrError;
pub use expr::{Assignment, Expr, Index};
pub use iet::{Bound, DType, Directive, Graph, HaloScheme, Node, Parameter, Pragma};
pub use registry::SymbolRegistry;
