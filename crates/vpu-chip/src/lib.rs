//! Silicon model for the VPU neural-inference accelerator family.
//!
//! This crate has **no dependencies** and **no hardware access** — it is a
//! pure model of the silicon: device generations, MAC array geometry, CMX
//! scratchpad capacities, DMA engine timing, and the DVFS/power parameter
//! tables.
//!
//! Everything here is a data table. Estimation formulas live in `vpu-cost`;
//! this crate only answers "what does generation X have".
//!
//! # Crate organisation
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`device`] | Device generations, execution modes, memory locations |
//! | [`mac`] | MAC array sizes per (device, execution mode) |
//! | [`memory`] | CMX scratchpad capacity and alignment |
//! | [`dma`] | DMA bandwidth and latency tables |
//! | [`power`] | DVFS points, power-virus ceilings, C_dyn/leakage tables |

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod device;
pub mod dma;
pub mod mac;
pub mod memory;
pub mod power;

pub use device::{ExecutionMode, MemoryLocation, VPUDevice, VPUSubsystem};
pub use power::DvfsPoint;
