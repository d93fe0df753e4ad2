//! Cost model for the VPU neural-inference accelerator family.
//!
//! Given a DPU workload (operation, tensor shapes, datatypes, kernel
//! geometry, execution mode), this crate answers four coupled questions:
//!
//! 1. How many device clock cycles will it take? (learned predictor,
//!    gated by validation, with an analytic fallback)
//! 2. How many cycles would an ideal MAC-bound dispatch take? (analytic)
//! 3. What is its activity factor / relative energy against the reference
//!    power virus?
//! 4. Is the workload valid for the target generation at all?
//!
//! # Quick start
//!
//! ```no_run
//! use vpu_cost::{VPUCostModel, DPUWorkload, VPUTensor};
//! use vpu_cost::{DataType, ExecutionMode, Operation, VPUDevice};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut model = VPUCostModel::new("predictor.vpnn")?;
//!
//! let workload = DPUWorkload::dense(
//!     VPUDevice::V27,
//!     Operation::Convolution,
//!     VPUTensor::new(56, 56, 64, 1, DataType::UInt8),
//!     VPUTensor::new(56, 56, 64, 1, DataType::UInt8),
//!     [3, 3],
//!     [1, 1],
//!     [1, 1, 1, 1],
//!     ExecutionMode::Cuboid16x16,
//! );
//!
//! let info = model.dpu_info(&workload);
//! println!("{info}");
//! # Ok(())
//! # }
//! ```
//!
//! A façade instance serializes all operations internally; construct one
//! per thread for parallel estimation.

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_precision_loss)]

mod cache;
mod cost_model;
mod cycles;
mod error;
pub mod performance;
mod power;
mod preprocessing;
mod shave;
mod types;
pub mod validation;

pub use cache::LruCache;
pub use cost_model::VPUCostModel;
pub use cycles::{Cycles, CyclesInterfaceType, SanityReport};
pub use error::{CostModelError, Result};
pub use power::VPUPowerFactorLUT;
pub use preprocessing::{
    Preprocessing, PreprocessingFactory, PreprocessingLatest, PreprocessingV1, PreprocessingV10,
    PreprocessingV11, LATEST_VERSION,
};
pub use shave::{ShaveCatalog, ShaveKernel};
pub use types::{
    DMAWorkload, DPUInfoPack, DPUWorkload, DataType, ExecutionMode, IsiStrategy, Layout,
    MemoryLocation, Operation, SHAVEWorkload, SWOperation, VPUDevice, VPUSubsystem, VPUTensor,
};

/// Commonly used types.
pub mod prelude {
    pub use crate::{
        Cycles, CyclesInterfaceType, DMAWorkload, DPUInfoPack, DPUWorkload, DataType,
        ExecutionMode, Operation, Result, SHAVEWorkload, SWOperation, SanityReport, VPUCostModel,
        VPUDevice, VPUTensor,
    };
}
