#![deny(unsafe_code)]

//! Serialized cycle-predictor parser and runtime.
//!
//! The cost model's learned predictor ships as a flat binary container
//! holding its interface versions, expected input shape, and dense-layer
//! weights. This crate parses that container and runs the forward pass.
//!
//! # Format
//!
//! Little-endian throughout:
//!
//! - **Magic** (4 bytes): `VPNN`
//! - **Container version** (u32): currently 1
//! - **Input interface version** (u32): selects the descriptor layout
//! - **Output interface version** (u32): selects result semantics
//! - **Batch size** (u32), **descriptor width** (u32): the input tensor
//!   shape the network was trained against
//! - **Layer count** (u32), then per layer: in/out dims and row-major
//!   f32 weights followed by the bias vector
//!
//! # Example
//!
//! ```no_run
//! use vpu_models::PredictorModel;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let model = PredictorModel::from_file("predictor.vpnn")?;
//! println!("input interface: v{}", model.input_interface_version());
//! println!("input shape: {:?}", model.input_shape());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

mod error;
mod model;
mod parser;
mod runtime;

pub use error::{Result, VpuModelError};
pub use model::PredictorModel;
pub use parser::{ModelHeader, MODEL_MAGIC};
pub use runtime::DenseLayer;
