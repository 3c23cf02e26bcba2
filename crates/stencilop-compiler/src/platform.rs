//! Target platform description.

use serde::{Deserialize, Serialize};

/// The machine a kernel is specialized for. Supplied by the caller,
/// read-only for the whole build; no pass mutates it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    pub name: String,
    /// SIMD register width in bytes.
    pub simd_reg_bytes: usize,
    pub cache_line_bytes: usize,
}

impl Platform {
    /// A generic 64-bit CPU with 256-bit vector registers.
    pub fn cpu64() -> Self {
        Platform {
            name: "cpu64".to_string(),
            simd_reg_bytes: 32,
            cache_line_bytes: 64,
        }
    }

    /// A CPU with 512-bit vector registers.
    pub fn cpu64_avx512() -> Self {
        Platform {
            name: "cpu64-avx512".to_string(),
            simd_reg_bytes: 64,
            cache_line_bytes: 64,
        }
    }

    /// Number of lanes of an `item_bytes`-wide element per vector register.
    pub fn simd_items(&self, item_bytes: usize) -> usize {
        (self.simd_reg_bytes / item_bytes).max(1)
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::cpu64()
    }
}
