//! Construction-time errors.
//!
//! Workload-level failures never surface here; they travel as sentinel
//! cycle codes (see [`crate::cycles`]). Only contract violations while
//! wiring a cost model to a serialized predictor are real errors.

use thiserror::Error;

/// Result type alias for cost-model construction.
pub type Result<T> = std::result::Result<T, CostModelError>;

/// Errors raised while constructing a [`crate::VPUCostModel`].
#[derive(Debug, Error)]
pub enum CostModelError {
    /// The predictor declares a descriptor layout no preprocessor produces.
    #[error("No preprocessing stage for input interface version {version}")]
    UnsupportedInputVersion {
        /// Version the predictor was trained against.
        version: u32,
    },

    /// The predictor declares result semantics this build does not know.
    #[error("Predictor output interface version {version} is not supported")]
    UnsupportedOutputVersion {
        /// Version found in the container.
        version: u32,
    },
}
