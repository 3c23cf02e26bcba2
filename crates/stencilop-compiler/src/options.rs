//! Build options and per-strategy defaults.
//!
//! Callers supply an [`OperatorOptions`] with any subset of knobs set. Each
//! strategy carries an immutable [`StrategyDefaults`] record; normalization
//! merges the two into an [`Options`] value exactly once per build, before
//! any pass runs, and the result is immutable for the remainder of the
//! build. Normalization also consolidates the four CIRE scalars into the two
//! per-category `{repeats, mincost}` structures the passes consume.

use serde::{Deserialize, Serialize};

use stencilop_ir::HaloScheme;

/// Distributed-memory communication mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MpiMode {
    /// No distributed-memory parallelism.
    #[default]
    Off,
    /// Face-neighbour halo exchanges.
    Basic,
    /// Face and diagonal-neighbour halo exchanges.
    Diagonal,
}

impl MpiMode {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, MpiMode::Off)
    }

    /// The halo-exchange scheme this mode selects, if any.
    pub fn scheme(&self) -> Option<HaloScheme> {
        match self {
            MpiMode::Off => None,
            MpiMode::Basic => Some(HaloScheme::Basic),
            MpiMode::Diagonal => Some(HaloScheme::Diagonal),
        }
    }
}

/// The CIRE candidate categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CireCategory {
    /// Sub-expressions invariant along one or more iteration dimensions.
    /// Hoisting them buys flops at the cost of a potentially large
    /// temporary array.
    Invariants,
    /// Redundant sums of products recurring across expressions.
    SumsOfProducts,
}

/// Per-category CIRE tuning.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CireConfig {
    /// Number of detection/rewrite rounds.
    pub repeats: u32,
    /// Minimum operation count of a candidate worth extracting.
    pub mincost: usize,
}

/// CIRE tuning for both categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CireOptions {
    pub invariants: CireConfig,
    pub sops: CireConfig,
}

impl CireOptions {
    pub fn get(&self, category: CireCategory) -> CireConfig {
        match category {
            CireCategory::Invariants => self.invariants,
            CireCategory::SumsOfProducts => self.sops,
        }
    }
}

/// Caller-supplied raw options; unset knobs fall back to strategy defaults.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OperatorOptions {
    pub mpi: MpiMode,
    pub openmp: bool,
    pub blocklevels: Option<u32>,
    pub cire_repeats_inv: Option<u32>,
    pub cire_repeats_sops: Option<u32>,
    pub cire_mincost_inv: Option<usize>,
    pub cire_mincost_sops: Option<usize>,
    /// Storage-minimizing tiling; mutually exclusive with the FSG
    /// strategies.
    pub min_storage: bool,
}

impl OperatorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mpi(mut self, mpi: MpiMode) -> Self {
        self.mpi = mpi;
        self
    }

    pub fn with_openmp(mut self, openmp: bool) -> Self {
        self.openmp = openmp;
        self
    }

    pub fn with_blocklevels(mut self, levels: u32) -> Self {
        self.blocklevels = Some(levels);
        self
    }

    pub fn with_cire_repeats(mut self, inv: u32, sops: u32) -> Self {
        self.cire_repeats_inv = Some(inv);
        self.cire_repeats_sops = Some(sops);
        self
    }

    pub fn with_cire_mincost(mut self, inv: usize, sops: usize) -> Self {
        self.cire_mincost_inv = Some(inv);
        self.cire_mincost_sops = Some(sops);
        self
    }

    pub fn with_min_storage(mut self, min_storage: bool) -> Self {
        self.min_storage = min_storage;
        self
    }
}

/// Immutable per-strategy configuration defaults, merged with the caller's
/// options during normalization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyDefaults {
    /// Loop blocking depth: 1 tiles once, 2 adds sub-blocks, and so on.
    pub block_levels: u32,
    pub cire_invariants: CireConfig,
    pub cire_sops: CireConfig,
}

impl StrategyDefaults {
    /// The defaults shared by every CPU strategy.
    pub fn base() -> Self {
        StrategyDefaults {
            block_levels: 1,
            cire_invariants: CireConfig {
                repeats: 1,
                mincost: 50,
            },
            cire_sops: CireConfig {
                repeats: 5,
                mincost: 10,
            },
        }
    }
}

/// Normalized build options; immutable once constructed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Options {
    pub mpi: MpiMode,
    pub openmp: bool,
    pub blocklevels: u32,
    pub cire: CireOptions,
    pub min_storage: bool,
}

impl Options {
    /// Merge caller options with a strategy's defaults. Runs exactly once
    /// per build, before any pass.
    pub fn normalize(raw: &OperatorOptions, defaults: &StrategyDefaults) -> Options {
        Options {
            mpi: raw.mpi,
            openmp: raw.openmp,
            blocklevels: raw.blocklevels.unwrap_or(defaults.block_levels),
            cire: CireOptions {
                invariants: CireConfig {
                    repeats: raw
                        .cire_repeats_inv
                        .unwrap_or(defaults.cire_invariants.repeats),
                    mincost: raw
                        .cire_mincost_inv
                        .unwrap_or(defaults.cire_invariants.mincost),
                },
                sops: CireConfig {
                    repeats: raw.cire_repeats_sops.unwrap_or(defaults.cire_sops.repeats),
                    mincost: raw.cire_mincost_sops.unwrap_or(defaults.cire_sops.mincost),
                },
            },
            min_storage: raw.min_storage,
        }
    }
}
