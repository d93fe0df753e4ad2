//! MAC array geometry per (device, execution mode).

use crate::device::{ExecutionMode, VPUDevice};

/// Number of MAC units engaged by one DPU in the given execution mode.
///
/// Returns 0 for (device, mode) pairs the hardware does not support;
/// callers treat 0 as "not computable".
#[must_use]
pub fn mac_units(device: VPUDevice, mode: ExecutionMode) -> u32 {
    use ExecutionMode as M;
    use VPUDevice as D;
    match (device, mode) {
        (D::V20 | D::V21, M::Vector | M::Matrix) => 256,
        // fp16 compute runs the array at half rate
        (D::V20 | D::V21, M::VectorFp16) => 128,
        (D::V27 | D::V40, M::Cuboid4x16 | M::Cuboid8x16 | M::Cuboid16x16) => 2048,
        _ => 0,
    }
}

/// Sustained fraction of the peak MAC rate the pipeline achieves.
///
/// A table entry, not a law: today every generation sustains the full rate
/// on well-formed workloads.
#[must_use]
pub fn pipeline_efficiency(device: VPUDevice) -> f32 {
    match device {
        VPUDevice::V20 | VPUDevice::V21 | VPUDevice::V27 | VPUDevice::V40 => 1.0,
        VPUDevice::Unknown => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v20_vector_array() {
        assert_eq!(mac_units(VPUDevice::V20, ExecutionMode::Vector), 256);
        assert_eq!(mac_units(VPUDevice::V20, ExecutionMode::VectorFp16), 128);
    }

    #[test]
    fn cuboid_array() {
        assert_eq!(mac_units(VPUDevice::V27, ExecutionMode::Cuboid16x16), 2048);
        assert_eq!(mac_units(VPUDevice::V40, ExecutionMode::Cuboid4x16), 2048);
    }

    #[test]
    fn invalid_pairs_are_zero() {
        // Cuboid modes do not exist before V27, vector modes not after V21.
        assert_eq!(mac_units(VPUDevice::V20, ExecutionMode::Cuboid16x16), 0);
        assert_eq!(mac_units(VPUDevice::V27, ExecutionMode::Vector), 0);
        assert_eq!(mac_units(VPUDevice::Unknown, ExecutionMode::Vector), 0);
    }
}
