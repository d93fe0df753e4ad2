//! DMA engine timing tables.
//!
//! A transfer costs a fixed setup latency plus a bandwidth-limited payload
//! term; both depend on the generation and the memories involved.

use crate::device::{MemoryLocation, VPUDevice};

/// Sustained DMA bandwidth in bytes per DPU clock cycle when one endpoint
/// is `location`. The effective bandwidth of a transfer is the minimum over
/// its two endpoints.
#[must_use]
pub fn bandwidth_bytes_per_cycle(device: VPUDevice, location: MemoryLocation) -> u32 {
    use MemoryLocation as L;
    use VPUDevice as D;
    match (device, location) {
        (D::V20 | D::V21, L::Dram) => 20,
        (D::V27, L::Dram) => 27,
        (D::V40, L::Dram) => 32,
        (D::V20 | D::V21, L::Cmx) => 32,
        (D::V27, L::Cmx) => 64,
        (D::V40, L::Cmx) => 128,
        (_, L::Upa) => 16,
        (_, L::Csram) => 24,
        (D::Unknown, _) => 0,
    }
}

/// Fixed per-transfer setup latency in DPU clock cycles, charged for the
/// source memory.
#[must_use]
pub fn latency_cycles(device: VPUDevice, source: MemoryLocation) -> u32 {
    use MemoryLocation as L;
    use VPUDevice as D;
    match (device, source) {
        (D::V20 | D::V21, L::Dram) => 100,
        (D::V27 | D::V40, L::Dram) => 250,
        (_, L::Cmx) => 16,
        (_, L::Upa) => 500,
        (_, L::Csram) => 50,
        (D::Unknown, _) => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dram_slower_than_cmx() {
        for device in VPUDevice::ALL {
            assert!(
                bandwidth_bytes_per_cycle(device, MemoryLocation::Dram)
                    < bandwidth_bytes_per_cycle(device, MemoryLocation::Cmx),
                "{device}"
            );
        }
    }

    #[test]
    fn dram_latency_dominates_cmx() {
        assert!(
            latency_cycles(VPUDevice::V27, MemoryLocation::Dram)
                > latency_cycles(VPUDevice::V27, MemoryLocation::Cmx)
        );
    }
}
