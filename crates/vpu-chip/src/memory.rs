//! CMX scratchpad capacities.
//!
//! The CMX is the on-chip memory a DPU workload must fully reside in;
//! its capacity is the hard bound the workload validator enforces.

use crate::device::VPUDevice;

/// CMX scratchpad capacity in bytes for one tile.
#[must_use]
pub fn cmx_size_bytes(device: VPUDevice) -> u32 {
    match device {
        VPUDevice::V20 | VPUDevice::V21 => 1024 * 1024,
        VPUDevice::V27 | VPUDevice::V40 => 2 * 1024 * 1024,
        VPUDevice::Unknown => 0,
    }
}

/// Alignment in bytes applied to each tensor allocation in CMX.
#[must_use]
pub fn cmx_alignment(device: VPUDevice) -> u32 {
    match device {
        VPUDevice::Unknown => 1,
        _ => 32,
    }
}

/// Round `bytes` up to the CMX allocation alignment of `device`.
#[must_use]
pub fn align_cmx(device: VPUDevice, bytes: u64) -> u64 {
    let a = u64::from(cmx_alignment(device));
    bytes.div_ceil(a) * a
}
