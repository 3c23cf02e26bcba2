//! The custom pipeline engine.
//!
//! A caller may assemble an arbitrary, named, validated pipeline instead of
//! a fixed strategy. The vocabulary is the closed set of [`PassId`]s;
//! parsing an unknown token fails the build before any pass executes
//! (all-or-nothing). Per build, one mapper table per stage binds the
//! identifiers that apply to that stage; iterating the caller's order, a
//! token absent from the current stage's table is skipped, not errored.
//! That skip is the single place where "missing" is not an error.
//!
//! After the named IET sequence, globally requested parallelism is
//! force-appended: `mpi`/`openmp` run even when the custom list omits them,
//! so a custom pipeline can never suppress requested parallelism. Symbol
//! placement runs last, unconditionally, exactly as in the fixed
//! strategies.

use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use indexmap::IndexMap;

use stencilop_ir::{Cluster, Graph};

use crate::context::BuildContext;
use crate::error::ConfigurationError;
use crate::options::{OperatorOptions, Options, StrategyDefaults};
use crate::passes::{clusters, iet};
use crate::pipeline::{
    run_cluster_pipeline, run_iet_pipeline, ClusterPass, ClusterPassFn, IetPass, IetPassFn,
};

/// The closed vocabulary of custom-pipeline pass identifiers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PassId {
    Blocking,
    Denormals,
    Optcomms,
    Openmp,
    Mpi,
    Simd,
    Prodders,
    Topofuse,
    Fuse,
    Factorize,
    CireSops,
    Cse,
    Lift,
    OptPows,
}

impl PassId {
    pub const ALL: [PassId; 14] = [
        PassId::Blocking,
        PassId::Denormals,
        PassId::Optcomms,
        PassId::Openmp,
        PassId::Mpi,
        PassId::Simd,
        PassId::Prodders,
        PassId::Topofuse,
        PassId::Fuse,
        PassId::Factorize,
        PassId::CireSops,
        PassId::Cse,
        PassId::Lift,
        PassId::OptPows,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PassId::Blocking => "blocking",
            PassId::Denormals => "denormals",
            PassId::Optcomms => "optcomms",
            PassId::Openmp => "openmp",
            PassId::Mpi => "mpi",
            PassId::Simd => "simd",
            PassId::Prodders => "prodders",
            PassId::Topofuse => "topofuse",
            PassId::Fuse => "fuse",
            PassId::Factorize => "factorize",
            PassId::CireSops => "cire-sops",
            PassId::Cse => "cse",
            PassId::Lift => "lift",
            PassId::OptPows => "opt-pows",
        }
    }
}

impl fmt::Display for PassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PassId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PassId::ALL
            .iter()
            .find(|id| id.as_str() == s)
            .copied()
            .ok_or(())
    }
}

/// A user-ordered, validated custom pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CustomPipeline {
    passes: Vec<PassId>,
    defaults: StrategyDefaults,
}

impl CustomPipeline {
    /// Validate a token sequence against the vocabulary. Fail-fast: any
    /// unknown token rejects the whole pipeline and no pass runs.
    pub fn parse<S: AsRef<str>>(mode: &[S]) -> Result<Self, ConfigurationError> {
        let mut passes = Vec::with_capacity(mode.len());
        let mut unknown = Vec::new();
        for token in mode {
            match token.as_ref().parse() {
                Ok(id) => passes.push(id),
                Err(()) => unknown.push(token.as_ref().to_string()),
            }
        }
        if !unknown.is_empty() {
            return Err(ConfigurationError::UnknownPasses { passes: unknown });
        }
        Ok(Self::from_ids(passes))
    }

    /// A pipeline from identifiers already valid by construction.
    pub fn from_ids(passes: Vec<PassId>) -> Self {
        CustomPipeline {
            passes,
            defaults: StrategyDefaults::base(),
        }
    }

    pub fn passes(&self) -> &[PassId] {
        &self.passes
    }

    pub fn normalize_options(&self, raw: &OperatorOptions) -> Options {
        Options::normalize(raw, &self.defaults)
    }

    fn cluster_mapper() -> IndexMap<PassId, ClusterPassFn> {
        IndexMap::from([
            (PassId::Blocking, clusters::blocking as ClusterPassFn),
            (PassId::Topofuse, clusters::fuse_toposort),
            (PassId::Fuse, clusters::fuse),
            (PassId::Lift, lift_with_cire),
            (PassId::CireSops, clusters::cire_sops),
            (PassId::Cse, clusters::cse),
            (PassId::Factorize, clusters::factorize),
            (PassId::OptPows, clusters::optimize_pows),
        ])
    }

    fn iet_mapper() -> IndexMap<PassId, IetPassFn> {
        IndexMap::from([
            (PassId::Denormals, iet::avoid_denormals as IetPassFn),
            (PassId::Optcomms, iet::optimize_halospots),
            (PassId::Blocking, iet::relax_incr_dimensions),
            (PassId::Openmp, iet::make_parallel),
            (PassId::Mpi, iet::mpiize),
            (PassId::Simd, iet::make_simd),
            (PassId::Prodders, iet::hoist_prodders),
        ])
    }

    /// Run the cluster-stage slice of the custom pipeline, in caller order.
    pub fn specialize_clusters(
        &self,
        input: Vec<Cluster>,
        ctx: &mut BuildContext,
    ) -> Result<Vec<Cluster>> {
        let mapper = Self::cluster_mapper();
        let mut resolved = Vec::new();
        for id in &self.passes {
            match mapper.get(id) {
                Some(f) => resolved.push(ClusterPass::new(id.as_str(), *f)),
                // Stage mismatch: the token binds in the IET stage only.
                // Skipped, not an error.
                None => {}
            }
        }
        run_cluster_pipeline(resolved, input, ctx)
    }

    /// Run the IET-stage slice, force-append globally requested
    /// parallelism, then place symbols.
    pub fn specialize_iet(&self, graph: &mut Graph, ctx: &mut BuildContext) -> Result<()> {
        let mapper = Self::iet_mapper();
        let mut resolved = Vec::new();
        for id in &self.passes {
            match mapper.get(id) {
                Some(f) => resolved.push(IetPass::new(id.as_str(), *f)),
                // Stage mismatch: the token binds in the cluster stage only.
                // Skipped, not an error.
                None => {}
            }
        }
        if ctx.options.mpi.is_enabled() && !self.passes.contains(&PassId::Mpi) {
            resolved.push(IetPass::new("mpi", iet::mpiize));
        }
        if ctx.options.openmp && !self.passes.contains(&PassId::Openmp) {
            resolved.push(IetPass::new("openmp", iet::make_parallel));
        }
        resolved.push(IetPass::new("place-symbols", iet::place_symbols));
        run_iet_pipeline(resolved, graph, ctx)
    }
}

/// The `lift` token selects invariant hoisting followed by lifting, the
/// same pairing the fixed strategies run.
fn lift_with_cire(input: Vec<Cluster>, ctx: &mut BuildContext) -> Result<Vec<Cluster>> {
    clusters::lift(clusters::cire_invariants(input, ctx)?, ctx)
}
