//! Specialization strategies.
//!
//! A strategy is a data value pairing a cluster-pipeline descriptor with an
//! IET-pipeline descriptor and a defaults record. Sharing a pipeline between
//! strategies is descriptor reuse ([`Strategy::fsg_openmp`] carries the same
//! [`IetSchedule`] value as [`Strategy::openmp`]), never a type-hierarchy
//! trick. Pass ordering inside each schedule is hard-coded; the fixed
//! strategies reference pass functions directly and never dispatch through
//! string identifiers.
//!
//! | Strategy | Cluster pipeline | IET pipeline |
//! |---|---|---|
//! | `noop` | (none) | mpi? → openmp? → symbol placement |
//! | `base` | topofuse → cire(inv)+lift → blocking → flop reduction → fuse → dead-temp elimination | denormals → halospots → mpi? → relax → simd → prodders → symbol placement |
//! | `openmp` | as `base` | as `base`, plus thread parallelism after simd |
//! | `fsg` | as `base` with blocking deferred to last | as `base` |
//! | `fsg-openmp` | as `fsg` | as `openmp` |

use anyhow::Result;

use stencilop_ir::{Cluster, Graph};

use crate::context::BuildContext;
use crate::error::ConfigurationError;
use crate::options::{OperatorOptions, Options, StrategyDefaults};
use crate::passes::{clusters, iet};
use crate::pipeline::{run_cluster_pipeline, run_iet_pipeline, ClusterPass, IetPass};

/// Which cluster-stage pipeline a strategy runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClusterSchedule {
    /// No cluster optimization.
    Noop,
    /// Blocking before the flop-reduction passes.
    Base,
    /// Blocking deferred until after flop reduction; pays off on small
    /// grids where tiling-first costs more than it saves.
    Fsg,
}

/// Which IET-stage pipeline a strategy runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IetSchedule {
    /// Parallelism injection and symbol placement only.
    Noop,
    /// The full single-threaded pipeline with SIMD annotation.
    Base,
    /// `Base` plus shared-memory thread parallelism.
    OpenMp,
}

/// A fixed specialization strategy.
#[derive(Clone, Debug)]
pub struct Strategy {
    pub name: &'static str,
    pub defaults: StrategyDefaults,
    pub clusters: ClusterSchedule,
    pub iet: IetSchedule,
}

impl Strategy {
    pub fn noop() -> Self {
        Strategy {
            name: "noop",
            defaults: StrategyDefaults::base(),
            clusters: ClusterSchedule::Noop,
            iet: IetSchedule::Noop,
        }
    }

    pub fn base() -> Self {
        Strategy {
            name: "base",
            defaults: StrategyDefaults::base(),
            clusters: ClusterSchedule::Base,
            iet: IetSchedule::Base,
        }
    }

    pub fn openmp() -> Self {
        Strategy {
            name: "openmp",
            defaults: StrategyDefaults::base(),
            clusters: ClusterSchedule::Base,
            iet: IetSchedule::OpenMp,
        }
    }

    pub fn fsg() -> Self {
        Strategy {
            name: "fsg",
            defaults: StrategyDefaults::base(),
            clusters: ClusterSchedule::Fsg,
            iet: IetSchedule::Base,
        }
    }

    /// FSG cluster schedule composed with the OpenMP IET schedule.
    pub fn fsg_openmp() -> Self {
        let openmp = Self::openmp();
        Strategy {
            name: "fsg-openmp",
            defaults: StrategyDefaults::base(),
            clusters: Self::fsg().clusters,
            iet: openmp.iet,
        }
    }

    /// Every fixed strategy, for exhaustive checks.
    pub fn all() -> Vec<Strategy> {
        vec![
            Self::noop(),
            Self::base(),
            Self::openmp(),
            Self::fsg(),
            Self::fsg_openmp(),
        ]
    }

    /// Merge caller options with this strategy's defaults. Runs before any
    /// pass; a rejected build leaves nothing behind.
    pub fn normalize_options(
        &self,
        raw: &OperatorOptions,
    ) -> Result<Options, ConfigurationError> {
        if self.clusters == ClusterSchedule::Fsg && raw.min_storage {
            return Err(ConfigurationError::MinStorageWithFsg);
        }
        Ok(Options::normalize(raw, &self.defaults))
    }

    /// Run this strategy's cluster pipeline. Deterministic for identical
    /// inputs; call exactly once per build.
    pub fn specialize_clusters(
        &self,
        input: Vec<Cluster>,
        ctx: &mut BuildContext,
    ) -> Result<Vec<Cluster>> {
        let passes = match self.clusters {
            ClusterSchedule::Noop => Vec::new(),
            ClusterSchedule::Base => vec![
                ClusterPass::new("topofuse", clusters::fuse_toposort),
                ClusterPass::new("cire-invariants", clusters::cire_invariants),
                ClusterPass::new("lift", clusters::lift),
                ClusterPass::new("blocking", clusters::blocking),
                ClusterPass::new("extract-increments", clusters::extract_increments),
                ClusterPass::new("cire-sops", clusters::cire_sops),
                ClusterPass::new("factorize", clusters::factorize),
                ClusterPass::new("opt-pows", clusters::optimize_pows),
                ClusterPass::new("cse", clusters::cse),
                ClusterPass::new("fuse", clusters::fuse),
                ClusterPass::new("eliminate-arrays", clusters::eliminate_arrays),
            ],
            ClusterSchedule::Fsg => vec![
                ClusterPass::new("topofuse", clusters::fuse_toposort),
                ClusterPass::new("cire-invariants", clusters::cire_invariants),
                ClusterPass::new("lift", clusters::lift),
                ClusterPass::new("extract-increments", clusters::extract_increments),
                ClusterPass::new("cire-sops", clusters::cire_sops),
                ClusterPass::new("factorize", clusters::factorize),
                ClusterPass::new("opt-pows", clusters::optimize_pows),
                ClusterPass::new("cse", clusters::cse),
                ClusterPass::new("fuse", clusters::fuse),
                ClusterPass::new("eliminate-arrays", clusters::eliminate_arrays),
                ClusterPass::new("blocking", clusters::blocking),
            ],
        };
        run_cluster_pipeline(passes, input, ctx)
    }

    /// Run this strategy's IET pipeline. Symbol placement is
    /// unconditionally the terminal pass.
    pub fn specialize_iet(&self, graph: &mut Graph, ctx: &mut BuildContext) -> Result<()> {
        let mut passes = Vec::new();
        match self.iet {
            IetSchedule::Noop => {
                if ctx.options.mpi.is_enabled() {
                    passes.push(IetPass::new("mpi", iet::mpiize));
                }
                if ctx.options.openmp {
                    passes.push(IetPass::new("openmp", iet::make_parallel));
                }
            }
            IetSchedule::Base | IetSchedule::OpenMp => {
                passes.push(IetPass::new("denormals", iet::avoid_denormals));
                passes.push(IetPass::new("optcomms", iet::optimize_halospots));
                if ctx.options.mpi.is_enabled() {
                    passes.push(IetPass::new("mpi", iet::mpiize));
                }
                passes.push(IetPass::new("relax-incr-dims", iet::relax_incr_dimensions));
                passes.push(IetPass::new("simd", iet::make_simd));
                if self.iet == IetSchedule::OpenMp {
                    passes.push(IetPass::new("openmp", iet::make_parallel));
                }
                passes.push(IetPass::new("prodders", iet::hoist_prodders));
            }
        }
        passes.push(IetPass::new("place-symbols", iet::place_symbols));
        run_iet_pipeline(passes, graph, ctx)
    }
}
