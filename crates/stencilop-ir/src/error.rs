//! Error types for the IR.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IrError {
    #[error("IET root must be a function definition")]
    RootNotFunction,
    #[error("Interval for dimension {dim} is degenerate: [{lower}, {upper}]")]
    InvalidInterval { dim: String, lower: i64, upper: i64 },
    #[error("Cluster {index} has no expressions")]
    EmptyCluster { index: usize },
}
