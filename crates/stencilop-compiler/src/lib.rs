//! Operator specialization for stencilop.
//!
//! This crate turns a lowered cluster sequence into a parallel, cache-aware
//! imperative kernel by orchestrating two pass pipelines:
//!
//! 1. **Cluster pipeline**: value-to-value rewrites over the ordered
//!    cluster sequence (fusion, invariant hoisting, blocking, flop
//!    reduction, dead-temporary elimination).
//! 2. **IET pipeline**: in-place mutation of the imperative execution tree
//!    (denormal flushing, halo communication, bound relaxation, SIMD and
//!    thread annotation, prodder hoisting, symbol placement).
//!
//! Pipelines come in two flavours. The fixed [`Strategy`] values run
//! hard-coded pass orders (`noop`, `base`, `openmp`, `fsg`, `fsg-openmp`).
//! The [`CustomPipeline`] engine accepts a user-ordered list of named
//! passes, validated against a closed vocabulary before anything runs.
//! Both flavours share one sequential executor ([`pipeline`]) and one
//! normalized [`Options`] value per build.
//!
//! A build is atomic: it either completes with a fully specialized kernel
//! or fails with nothing usable. Configuration errors
//! ([`ConfigurationError`]) are detected before the first pass, and a
//! failing pass aborts the rest of its pipeline.
//!
//! # Examples
//!
//! ```
//! use stencilop_compiler::{specialize, OperatorOptions, Platform, Strategy};
//! use stencilop_ir::{Assignment, Cluster, Dimension, Expr, Index, Interval, IterationSpace};
//!
//! let ispace = IterationSpace::new(vec![
//!     Interval::new(Dimension::time("t"), 0, 0),
//!     Interval::new(Dimension::space("x"), 0, 0),
//! ]);
//! let stmt = Assignment::new(
//!     Expr::access("u", vec![Index::new("t", 1), Index::new("x", 0)]),
//!     Expr::mul(
//!         Expr::Constant(0.5),
//!         Expr::add(
//!             Expr::access("u", vec![Index::new("t", 0), Index::new("x", 1)]),
//!             Expr::access("u", vec![Index::new("t", 0), Index::new("x", -1)]),
//!         ),
//!     ),
//! );
//! let clusters = vec![Cluster::new(vec![stmt], ispace)];
//!
//! let built = specialize(
//!     clusters,
//!     &Strategy::base(),
//!     &OperatorOptions::new(),
//!     Platform::cpu64(),
//! )
//! .unwrap();
//! assert!(!built.timings.is_empty());
//! ```
//!
//! A custom pipeline with an invalid token never runs a pass:
//!
//! ```
//! use stencilop_compiler::{CustomPipeline, ConfigurationError};
//!
//! let err = CustomPipeline::parse(&["cse", "bogus"]).unwrap_err();
//! assert!(matches!(err, ConfigurationError::UnknownPasses { .. }));
//! ```

mod context;
pub mod custom;
mod error;
mod options;
pub mod passes;
pub mod pipeline;
mod platform;
pub mod strategy;


pub use context::BuildContext;
pub use custom::{CustomPipeline, PassId};
pub use error::ConfigurationError;
pub use options::{
    CireCategory, CireConfig, CireOptions, MpiMode, OperatorOptions, Options, StrategyDefaults,
};
pub use pipeline::PassTimings;
pub use platform::Platform;
pub use strategy::{ClusterSchedule, IetSchedule, Strategy};

use anyhow::Result;

use stencilop_ir::{iet, Cluster, Graph};

/// The product of one specialization build.
#[derive(Debug)]
pub struct Specialized {
    /// The optimized cluster sequence, after the cluster pipeline.
    pub clusters: Vec<Cluster>,
    /// The specialized IET, after the IET pipeline.
    pub graph: Graph,
    /// Wall-clock record of every pass, in execution order.
    pub timings: PassTimings,
}

/// Run one atomic build under a fixed strategy: normalize options,
/// specialize the clusters, lower to an IET, specialize the IET.
pub fn specialize(
    clusters: Vec<Cluster>,
    strategy: &Strategy,
    options: &OperatorOptions,
    platform: Platform,
) -> Result<Specialized> {
    let normalized = strategy.normalize_options(options)?;
    let mut ctx = BuildContext::new(normalized, platform);
    let clusters = strategy.specialize_clusters(clusters, &mut ctx)?;
    let mut graph = iet::build(&clusters)?;
    strategy.specialize_iet(&mut graph, &mut ctx)?;
    Ok(Specialized {
        clusters,
        graph,
        timings: ctx.into_timings(),
    })
}

/// Run one atomic build under a custom mode. The token sequence is
/// validated before anything else happens.
pub fn specialize_custom(
    clusters: Vec<Cluster>,
    mode: &[&str],
    options: &OperatorOptions,
    platform: Platform,
) -> Result<Specialized> {
    let custom = CustomPipeline::parse(mode)?;
    let normalized = custom.normalize_options(options);
    let mut ctx = BuildContext::new(normalized, platform);
    let clusters = custom.specialize_clusters(clusters, &mut ctx)?;
    let mut graph = iet::build(&clusters)?;
    custom.specialize_iet(&mut graph, &mut ctx)?;
    Ok(Specialized {
        clusters,
        graph,
        timings: ctx.into_timings(),
    })
}
