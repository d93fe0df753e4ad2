//! Per-device valid-value tables.
//!
//! One static table per generation lists what the silicon accepts:
//! operations, execution modes, ISI strategies, and the broadcast range.
//! CMX capacity comes from the silicon model.

use crate::types::{ExecutionMode, IsiStrategy, Operation, VPUDevice};
use vpu_chip::memory;

/// What one device generation accepts.
#[derive(Debug, Clone, Copy)]
pub struct DeviceValidValues {
    /// The generation this table describes.
    pub device: VPUDevice,
    /// Operations the DPU can execute.
    pub operations: &'static [Operation],
    /// Valid execution modes.
    pub execution_modes: &'static [ExecutionMode],
    /// Valid inter-slice strategies.
    pub isi_strategies: &'static [IsiStrategy],
    /// Upper bound on `output_write_tiles`.
    pub output_write_tiles_max: u32,
}

const COMMON_OPERATIONS: &[Operation] = &[
    Operation::Convolution,
    Operation::CmConvolution,
    Operation::DwConvolution,
    Operation::AvePool,
    Operation::MaxPool,
    Operation::Eltwise,
];

const V20_CONFIG: DeviceValidValues = DeviceValidValues {
    device: VPUDevice::V20,
    operations: COMMON_OPERATIONS,
    execution_modes: &[
        ExecutionMode::Vector,
        ExecutionMode::Matrix,
        ExecutionMode::VectorFp16,
    ],
    isi_strategies: &[
        IsiStrategy::Clustering,
        IsiStrategy::SplitOverH,
        IsiStrategy::HaloReads,
    ],
    output_write_tiles_max: 2,
};

const V21_CONFIG: DeviceValidValues = DeviceValidValues {
    device: VPUDevice::V21,
    ..V20_CONFIG
};

const V27_CONFIG: DeviceValidValues = DeviceValidValues {
    device: VPUDevice::V27,
    operations: COMMON_OPERATIONS,
    execution_modes: &[
        ExecutionMode::Cuboid4x16,
        ExecutionMode::Cuboid8x16,
        ExecutionMode::Cuboid16x16,
    ],
    isi_strategies: &[
        IsiStrategy::Clustering,
        IsiStrategy::SplitOverH,
        IsiStrategy::SplitOverK,
    ],
    output_write_tiles_max: 6,
};

const V40_CONFIG: DeviceValidValues = DeviceValidValues {
    device: VPUDevice::V40,
    ..V27_CONFIG
};

/// Table for a device, or `None` when the generation is not supported.
#[must_use]
pub fn config_for(device: VPUDevice) -> Option<&'static DeviceValidValues> {
    match device {
        VPUDevice::V20 => Some(&V20_CONFIG),
        VPUDevice::V21 => Some(&V21_CONFIG),
        VPUDevice::V27 => Some(&V27_CONFIG),
        VPUDevice::V40 => Some(&V40_CONFIG),
        VPUDevice::Unknown => None,
    }
}

impl DeviceValidValues {
    /// CMX scratchpad capacity for this generation.
    #[must_use]
    pub fn cmx_size_bytes(&self) -> u32 {
        memory::cmx_size_bytes(self.device)
    }

    /// True when the DPU can execute `op`.
    #[must_use]
    pub fn supports_operation(&self, op: Operation) -> bool {
        self.operations.contains(&op)
    }

    /// True when `mode` is a valid execution mode here.
    #[must_use]
    pub fn supports_execution_mode(&self, mode: ExecutionMode) -> bool {
        self.execution_modes.contains(&mode)
    }

    /// True when `strategy` is a valid ISI strategy here.
    #[must_use]
    pub fn supports_isi_strategy(&self, strategy: IsiStrategy) -> bool {
        self.isi_strategies.contains(&strategy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_real_generation_has_a_table() {
        for device in VPUDevice::ALL {
            assert!(config_for(device).is_some(), "{device}");
        }
        assert!(config_for(VPUDevice::Unknown).is_none());
    }

    #[test]
    fn execution_modes_split_by_generation() {
        let v20 = config_for(VPUDevice::V20).unwrap();
        assert!(v20.supports_execution_mode(ExecutionMode::Vector));
        assert!(!v20.supports_execution_mode(ExecutionMode::Cuboid16x16));

        let v27 = config_for(VPUDevice::V27).unwrap();
        assert!(v27.supports_execution_mode(ExecutionMode::Cuboid16x16));
        assert!(!v27.supports_execution_mode(ExecutionMode::Vector));
    }

    #[test]
    fn halo_reads_is_pre_v27_only() {
        assert!(config_for(VPUDevice::V20)
            .unwrap()
            .supports_isi_strategy(IsiStrategy::HaloReads));
        assert!(!config_for(VPUDevice::V27)
            .unwrap()
            .supports_isi_strategy(IsiStrategy::HaloReads));
    }

    #[test]
    fn invalid_operation_never_listed() {
        for device in VPUDevice::ALL {
            assert!(!config_for(device).unwrap().supports_operation(Operation::Invalid));
        }
    }
}
