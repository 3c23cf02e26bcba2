//! The pipeline executor.
//!
//! A single generic primitive shared by the fixed strategies and the custom
//! pipeline engine: given an ordered list of already-resolved passes, apply
//! each in turn, threading output to input for cluster passes and mutating
//! the shared graph in place for IET passes. Execution order equals the
//! caller-supplied order exactly; there is no reordering, no dependency
//! inference, and no parallel execution of passes. A failing pass aborts
//! the remainder of the pipeline; a partial result is never returned as a
//! success.

use std::fmt;
use std::time::{Duration, Instant};

use anyhow::Result;

use stencilop_ir::{Cluster, Graph};

use crate::context::BuildContext;

/// Plain-function form of a cluster-level pass, used by the per-stage
/// mapper tables of the custom engine.
pub type ClusterPassFn = fn(Vec<Cluster>, &mut BuildContext) -> Result<Vec<Cluster>>;

/// Plain-function form of an IET-level pass.
pub type IetPassFn = fn(&mut Graph, &mut BuildContext) -> Result<()>;

/// A resolved, named cluster-level pass.
pub struct ClusterPass<'a> {
    name: String,
    run: Box<dyn FnMut(Vec<Cluster>, &mut BuildContext) -> Result<Vec<Cluster>> + 'a>,
}

impl<'a> ClusterPass<'a> {
    pub fn new(
        name: impl Into<String>,
        run: impl FnMut(Vec<Cluster>, &mut BuildContext) -> Result<Vec<Cluster>> + 'a,
    ) -> Self {
        ClusterPass {
            name: name.into(),
            run: Box::new(run),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A resolved, named IET-level pass.
pub struct IetPass<'a> {
    name: String,
    run: Box<dyn FnMut(&mut Graph, &mut BuildContext) -> Result<()> + 'a>,
}

impl<'a> IetPass<'a> {
    pub fn new(
        name: impl Into<String>,
        run: impl FnMut(&mut Graph, &mut BuildContext) -> Result<()> + 'a,
    ) -> Self {
        IetPass {
            name: name.into(),
            run: Box::new(run),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Apply cluster passes in order, threading the sequence through.
pub fn run_cluster_pipeline(
    passes: Vec<ClusterPass<'_>>,
    mut clusters: Vec<Cluster>,
    ctx: &mut BuildContext,
) -> Result<Vec<Cluster>> {
    for mut pass in passes {
        let started = Instant::now();
        clusters = (pass.run)(clusters, ctx)?;
        ctx.timings.record(&pass.name, started.elapsed());
    }
    Ok(clusters)
}

/// Apply IET passes in order, mutating the shared graph in place.
pub fn run_iet_pipeline(
    passes: Vec<IetPass<'_>>,
    graph: &mut Graph,
    ctx: &mut BuildContext,
) -> Result<()> {
    for mut pass in passes {
        let started = Instant::now();
        (pass.run)(graph, ctx)?;
        ctx.timings.record(&pass.name, started.elapsed());
    }
    Ok(())
}

/// Wall-clock record of every pass run during one build, in execution
/// order.
#[derive(Clone, Debug, Default)]
pub struct PassTimings {
    entries: Vec<(String, Duration)>,
}

impl PassTimings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, name: &str, elapsed: Duration) {
        self.entries.push((name.to_string(), elapsed));
    }

    /// Pass names in execution order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn total(&self) -> Duration {
        self.entries.iter().map(|(_, d)| *d).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Duration)> {
        self.entries.iter().map(|(n, d)| (n.as_str(), *d))
    }
}

impl fmt::Display for PassTimings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Pass timings ({} passes):", self.entries.len())?;
        for (name, elapsed) in &self.entries {
            writeln!(f, "  {:<24} {:?}", name, elapsed)?;
        }
        write!(f, "  total: {:?}", self.total())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{OperatorOptions, Options, StrategyDefaults};
    use crate::platform::Platform;
    use anyhow::bail;

    fn ctx() -> BuildContext {
        let options = Options::normalize(&OperatorOptions::new(), &StrategyDefaults::base());
        BuildContext::new(options, Platform::cpu64())
    }

    #[test]
    fn test_passes_run_in_caller_order() {
        let mut ctx = ctx();
        let passes = vec![
            ClusterPass::new("first", |cs, _ctx| Ok(cs)),
            ClusterPass::new("second", |cs, _ctx| Ok(cs)),
            ClusterPass::new("third", |cs, _ctx| Ok(cs)),
        ];
        run_cluster_pipeline(passes, Vec::new(), &mut ctx).unwrap();
        assert_eq!(ctx.timings.names(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_failure_aborts_remainder() {
        let mut ctx = ctx();
        let passes = vec![
            ClusterPass::new("ok", |cs, _ctx| Ok(cs)),
            ClusterPass::new("boom", |_cs, _ctx| bail!("pass failure")),
            ClusterPass::new("never", |cs, _ctx| Ok(cs)),
        ];
        let err = run_cluster_pipeline(passes, Vec::new(), &mut ctx).unwrap_err();
        assert!(err.to_string().contains("pass failure"));
        // The failing pass records nothing; the trailing pass never ran.
        assert_eq!(ctx.timings.names(), vec!["ok"]);
    }

    #[test]
    fn test_timings_display() {
        let mut timings = PassTimings::new();
        timings.record("fuse", Duration::from_millis(1));
        let rendered = timings.to_string();
        assert!(rendered.contains("fuse"));
        assert!(rendered.contains("total"));
    }
}
