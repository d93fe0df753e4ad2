//! Workload data model: tensors, DPU/DMA/SHAVE workload records, and the
//! all-in-one [`DPUInfoPack`] result.

use crate::cycles::{Cycles, CyclesInterfaceType};
use std::fmt;

pub use vpu_chip::{ExecutionMode, MemoryLocation, VPUDevice, VPUSubsystem};

/// DPU hardware operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Dense convolution.
    Convolution,
    /// Compressed / channel-major convolution (input channels below 16).
    CmConvolution,
    /// Depthwise convolution.
    DwConvolution,
    /// Average pooling (normalized to depthwise convolution downstream).
    AvePool,
    /// Max pooling.
    MaxPool,
    /// Element-wise operation over two tensors.
    Eltwise,
    /// Placeholder for an unrecognized operation; always rejected.
    Invalid,
}

impl Operation {
    /// All operations, in descriptor one-hot order.
    pub const ALL: [Self; 7] = [
        Self::Convolution,
        Self::CmConvolution,
        Self::DwConvolution,
        Self::AvePool,
        Self::MaxPool,
        Self::Eltwise,
        Self::Invalid,
    ];

    /// True for operations that cannot change the channel count.
    #[must_use]
    pub fn is_channel_preserving(self) -> bool {
        matches!(
            self,
            Self::Eltwise | Self::DwConvolution | Self::MaxPool | Self::AvePool
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Convolution => "CONVOLUTION",
            Self::CmConvolution => "CM_CONVOLUTION",
            Self::DwConvolution => "DW_CONVOLUTION",
            Self::AvePool => "AVEPOOL",
            Self::MaxPool => "MAXPOOL",
            Self::Eltwise => "ELTWISE",
            Self::Invalid => "INVALID",
        })
    }
}

/// Element type of a tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Unsigned 8-bit integer.
    UInt8,
    /// Signed 8-bit integer (normalized to `UInt8` by validation).
    Int8,
    /// IEEE half precision.
    Float16,
    /// Brain floating point.
    BFloat16,
}

impl DataType {
    /// All data types, in descriptor one-hot order.
    pub const ALL: [Self; 4] = [Self::UInt8, Self::Int8, Self::Float16, Self::BFloat16];

    /// Bytes per element.
    #[must_use]
    pub const fn bytes(self) -> u32 {
        match self {
            Self::UInt8 | Self::Int8 => 1,
            Self::Float16 | Self::BFloat16 => 2,
        }
    }

    /// True for floating-point compute.
    #[must_use]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::Float16 | Self::BFloat16)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::UInt8 => "UINT8",
            Self::Int8 => "INT8",
            Self::Float16 => "FLOAT16",
            Self::BFloat16 => "BFLOAT16",
        })
    }
}

/// Tensor memory layout (ODU permutation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Layout {
    /// Channel-minor default.
    #[default]
    Zxy,
    /// X-minor.
    Xzy,
    /// Y-major.
    Yxz,
    /// Y-major, X-minor.
    Yzx,
    /// Channel-major.
    Zyx,
    /// Row-major.
    Xyz,
}

impl Layout {
    /// All layouts, in descriptor one-hot order.
    pub const ALL: [Self; 6] = [
        Self::Zxy,
        Self::Xzy,
        Self::Yxz,
        Self::Yzx,
        Self::Zyx,
        Self::Xyz,
    ];
}

/// Inter-slice interaction strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IsiStrategy {
    /// No inter-tile traffic.
    #[default]
    Clustering,
    /// Activations split over height.
    SplitOverH,
    /// Weights split over output channels.
    SplitOverK,
    /// Halo region reads from neighbour tiles (pre-V27 only).
    HaloReads,
}

impl IsiStrategy {
    /// All strategies, in descriptor one-hot order.
    pub const ALL: [Self; 4] = [
        Self::Clustering,
        Self::SplitOverH,
        Self::SplitOverK,
        Self::HaloReads,
    ];
}

impl fmt::Display for IsiStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Clustering => "CLUSTERING",
            Self::SplitOverH => "SPLIT_OVER_H",
            Self::SplitOverK => "SPLIT_OVER_K",
            Self::HaloReads => "HALO_READS",
        })
    }
}

/// A tensor as the DPU sees it: shape `(x, y, channels, batch)`, element
/// type, layout, and whether the sparsity engine is enabled for it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VPUTensor {
    shape: [u32; 4],
    dtype: DataType,
    layout: Layout,
    sparsity_enabled: bool,
}

impl VPUTensor {
    /// Dense tensor with the default layout.
    #[must_use]
    pub fn new(x: u32, y: u32, channels: u32, batch: u32, dtype: DataType) -> Self {
        Self {
            shape: [x, y, channels, batch],
            dtype,
            layout: Layout::default(),
            sparsity_enabled: false,
        }
    }

    /// Same tensor with an explicit layout.
    #[must_use]
    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    /// Same tensor with the sparsity engine toggled.
    #[must_use]
    pub fn with_sparsity(mut self, enabled: bool) -> Self {
        self.sparsity_enabled = enabled;
        self
    }

    /// Width.
    #[must_use]
    pub const fn x(&self) -> u32 {
        self.shape[0]
    }

    /// Height.
    #[must_use]
    pub const fn y(&self) -> u32 {
        self.shape[1]
    }

    /// Channel count.
    #[must_use]
    pub const fn channels(&self) -> u32 {
        self.shape[2]
    }

    /// Batch count.
    #[must_use]
    pub const fn batches(&self) -> u32 {
        self.shape[3]
    }

    /// Rewrite the channel count (validation uses this to align
    /// channel-preserving operations).
    pub fn set_channels(&mut self, channels: u32) {
        self.shape[2] = channels;
    }

    /// Element type.
    #[must_use]
    pub const fn dtype(&self) -> DataType {
        self.dtype
    }

    /// Rewrite the element type (datatype normalization).
    pub fn set_dtype(&mut self, dtype: DataType) {
        self.dtype = dtype;
    }

    /// Memory layout.
    #[must_use]
    pub const fn layout(&self) -> Layout {
        self.layout
    }

    /// Whether the sparsity engine is enabled.
    #[must_use]
    pub const fn sparsity_enabled(&self) -> bool {
        self.sparsity_enabled
    }

    /// Element count.
    #[must_use]
    pub fn volume(&self) -> u64 {
        self.shape.iter().map(|&d| u64::from(d)).product()
    }

    /// Byte size: `volume × bytes(dtype)`.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.volume() * u64::from(self.dtype.bytes())
    }
}

impl fmt::Display for VPUTensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}x{}x{}x{}] {}",
            self.shape[0], self.shape[1], self.shape[2], self.shape[3], self.dtype
        )
    }
}

/// A single DPU workload: one operation over concrete tensors.
///
/// Passed by value to the public API; validation may rewrite the local copy
/// (operation normalization, channel alignment, datatype canonicalization)
/// but never the caller's.
#[derive(Debug, Clone, PartialEq)]
pub struct DPUWorkload {
    /// Target generation.
    pub device: VPUDevice,
    /// Operation to execute.
    pub op: Operation,
    /// Activation input. Weights (input 1) are deduced per operation.
    pub inputs: [VPUTensor; 1],
    /// Output tensor.
    pub outputs: [VPUTensor; 1],
    /// Kernel size `(width, height)`.
    pub kernel: [u32; 2],
    /// Stride `(width, height)`.
    pub stride: [u32; 2],
    /// Padding `(top, bottom, left, right)`.
    pub padding: [u32; 4],
    /// DPU execution mode.
    pub execution_mode: ExecutionMode,
    /// Fraction of zero activations, `[0, 1]`.
    pub input_sparsity_rate: f32,
    /// Whether weight sparsity acceleration is enabled.
    pub weight_sparsity_enabled: bool,
    /// Fraction of zero weights, `[0, 1]`.
    pub weight_sparsity_rate: f32,
    /// How many tiles the output is broadcast to (1 = no broadcast).
    pub output_write_tiles: u32,
    /// Inter-slice interaction strategy.
    pub isi_strategy: IsiStrategy,
}

impl DPUWorkload {
    /// Dense workload with no sparsity, no broadcast, clustering strategy.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn dense(
        device: VPUDevice,
        op: Operation,
        input: VPUTensor,
        output: VPUTensor,
        kernel: [u32; 2],
        stride: [u32; 2],
        padding: [u32; 4],
        execution_mode: ExecutionMode,
    ) -> Self {
        Self {
            device,
            op,
            inputs: [input],
            outputs: [output],
            kernel,
            stride,
            padding,
            execution_mode,
            input_sparsity_rate: 0.0,
            weight_sparsity_enabled: false,
            weight_sparsity_rate: 0.0,
            output_write_tiles: 1,
            isi_strategy: IsiStrategy::Clustering,
        }
    }
}

impl fmt::Display for DPUWorkload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} in {} out {} k{}x{} s{}x{} p[{},{},{},{}] {}",
            self.device,
            self.op,
            self.inputs[0],
            self.outputs[0],
            self.kernel[0],
            self.kernel[1],
            self.stride[0],
            self.stride[1],
            self.padding[0],
            self.padding[1],
            self.padding[2],
            self.padding[3],
            self.execution_mode,
        )
    }
}

/// A DMA transfer between two memories.
#[derive(Debug, Clone, PartialEq)]
pub struct DMAWorkload {
    /// Target generation.
    pub device: VPUDevice,
    /// Source tensor.
    pub input: VPUTensor,
    /// Destination tensor.
    pub output: VPUTensor,
    /// Source memory.
    pub input_location: MemoryLocation,
    /// Destination memory.
    pub output_location: MemoryLocation,
    /// Broadcast count when the destination is CMX.
    pub output_write_tiles: u32,
}

/// A software (SHAVE) kernel described by its own cost parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SWOperation {
    /// Target generation.
    pub device: VPUDevice,
    /// Input tensors.
    pub inputs: Vec<VPUTensor>,
    /// Output tensors (the first drives the cost).
    pub outputs: Vec<VPUTensor>,
    /// Kernel throughput in bytes per cycle.
    pub kernel_efficiency: f32,
    /// Fixed startup cost in cycles.
    pub latency: u32,
}

/// A SHAVE kernel invocation resolved by name against the device catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct SHAVEWorkload {
    device: VPUDevice,
    name: String,
    inputs: Vec<VPUTensor>,
    outputs: Vec<VPUTensor>,
}

impl SHAVEWorkload {
    /// Describe a kernel invocation.
    #[must_use]
    pub fn new(
        device: VPUDevice,
        name: impl Into<String>,
        inputs: Vec<VPUTensor>,
        outputs: Vec<VPUTensor>,
    ) -> Self {
        Self {
            device,
            name: name.into(),
            inputs,
            outputs,
        }
    }

    /// Target generation.
    #[must_use]
    pub const fn device(&self) -> VPUDevice {
        self.device
    }

    /// SHAVE function name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Input tensors.
    #[must_use]
    pub fn inputs(&self) -> &[VPUTensor] {
        &self.inputs
    }

    /// Output tensors.
    #[must_use]
    pub fn outputs(&self) -> &[VPUTensor] {
        &self.outputs
    }
}

/// Everything the cost model can say about one DPU workload, computed in a
/// single pass. Zero in any numeric field means "not computable / error".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DPUInfoPack {
    /// Estimated execution cycles (or a sentinel error code).
    pub dpu_cycles: CyclesInterfaceType,
    /// Findings collected while validating the workload.
    pub err_info: String,

    /// Relative energy in power-virus-cycles.
    pub energy: f32,

    /// Power activity factor (sparsity-aware, virus-ceiling clamped).
    pub power_activity_factor: f32,
    /// MAC utilization against sparse-adjusted ideal cycles.
    pub power_mac_utilization: f32,
    /// Ideal cycles with hardware sparsity benefits applied.
    pub power_ideal_cycles: u64,
    /// MAC operations after sparsity skipping.
    pub sparse_mac_operations: u64,

    /// Efficiency activity factor (dense, unclamped).
    pub efficiency_activity_factor: f32,
    /// MAC utilization against dense ideal cycles.
    pub efficiency_mac_utilization: f32,
    /// Ideal cycles with no sparsity benefit.
    pub efficiency_ideal_cycles: u64,
    /// Mathematical maximum MAC operations.
    pub dense_mac_operations: u64,

    /// Analytic hardware lower bound.
    pub hw_theoretical_cycles: u64,
}

impl fmt::Display for DPUInfoPack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "DPUInfoPack:")?;
        writeln!(
            f,
            "  dpu_cycles: {} ({})",
            self.dpu_cycles,
            Cycles::to_error_text(self.dpu_cycles)
        )?;
        writeln!(f, "  err_info: {}", self.err_info)?;
        writeln!(f, "  energy: {}", self.energy)?;
        writeln!(f, "  power_activity_factor: {}", self.power_activity_factor)?;
        writeln!(f, "  power_mac_utilization: {}", self.power_mac_utilization)?;
        writeln!(f, "  power_ideal_cycles: {}", self.power_ideal_cycles)?;
        writeln!(f, "  sparse_mac_operations: {}", self.sparse_mac_operations)?;
        writeln!(
            f,
            "  efficiency_activity_factor: {}",
            self.efficiency_activity_factor
        )?;
        writeln!(
            f,
            "  efficiency_mac_utilization: {}",
            self.efficiency_mac_utilization
        )?;
        writeln!(f, "  efficiency_ideal_cycles: {}", self.efficiency_ideal_cycles)?;
        writeln!(f, "  dense_mac_operations: {}", self.dense_mac_operations)?;
        write!(f, "  hw_theoretical_cycles: {}", self.hw_theoretical_cycles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tensor_size_follows_dtype() {
        let t8 = VPUTensor::new(16, 16, 64, 1, DataType::UInt8);
        let t16 = VPUTensor::new(16, 16, 64, 1, DataType::Float16);
        assert_eq!(t8.volume(), 16 * 16 * 64);
        assert_eq!(t8.size(), 16 * 16 * 64);
        assert_eq!(t16.size(), 2 * 16 * 16 * 64);
    }

    #[test]
    fn channel_preserving_set() {
        assert!(Operation::Eltwise.is_channel_preserving());
        assert!(Operation::DwConvolution.is_channel_preserving());
        assert!(Operation::MaxPool.is_channel_preserving());
        assert!(Operation::AvePool.is_channel_preserving());
        assert!(!Operation::Convolution.is_channel_preserving());
        assert!(!Operation::CmConvolution.is_channel_preserving());
    }

    #[test]
    fn set_channels_rewrites_shape() {
        let mut t = VPUTensor::new(8, 8, 32, 1, DataType::UInt8);
        t.set_channels(64);
        assert_eq!(t.channels(), 64);
        assert_eq!(t.size(), 8 * 8 * 64);
    }

    #[test]
    fn workload_display_is_compact() {
        let wl = DPUWorkload::dense(
            VPUDevice::V27,
            Operation::Convolution,
            VPUTensor::new(16, 16, 64, 1, DataType::UInt8),
            VPUTensor::new(16, 16, 64, 1, DataType::UInt8),
            [1, 1],
            [1, 1],
            [0, 0, 0, 0],
            ExecutionMode::Cuboid16x16,
        );
        let s = wl.to_string();
        assert!(s.contains("V27"));
        assert!(s.contains("CONVOLUTION"));
        assert!(s.contains("k1x1"));
    }
}
