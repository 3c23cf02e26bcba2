//! Configuration errors.
//!
//! The orchestration layer raises exactly one error kind of its own:
//! [`ConfigurationError`]. It is fatal to the build, detected before any
//! transformation pass executes, and never leaves a partially specialized
//! representation behind. Pass-internal failures are not interpreted here;
//! they propagate unchanged as [`anyhow::Error`] and abort the remaining
//! pipeline.

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("unknown passes {passes:?}")]
    UnknownPasses { passes: Vec<String> },
    #[error("`min-storage` cannot be combined with an FSG strategy: the two drive tiling in opposite directions")]
    MinStorageWithFsg,
}
