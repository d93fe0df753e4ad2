//! Per-operation dynamic constraints.
//!
//! Each DPU operation has its own rules for weight deduction, sparsity,
//! strategy filtering, and tensor correlation. The rules live behind one
//! trait with an instance per operation, dispatched through
//! [`OperationsBehavior`].

use crate::types::{DPUWorkload, IsiStrategy, Operation, VPUTensor};
use std::fmt::Write as _;
use vpu_chip::memory;

/// Operation-specific validation and deduction hooks.
pub trait OperationConstraints: Sync {
    /// Weight (input 1) volume in elements, not bytes.
    fn input_1_volume(&self, wl: &DPUWorkload) -> u64;

    /// Aligned CMX byte size of the weights. Weight elements share the
    /// activation datatype.
    fn input_1_aligned_size_bytes(&self, wl: &DPUWorkload) -> u64 {
        let bytes = self.input_1_volume(wl) * u64::from(wl.inputs[0].dtype().bytes());
        memory::align_cmx(wl.device, bytes)
    }

    /// Deduce the weight tensor from activations and output. `None` for
    /// weightless operations.
    fn deduce_input_1(&self, wl: &DPUWorkload) -> Option<VPUTensor> {
        let volume = self.input_1_volume(wl);
        if volume == 0 {
            return None;
        }
        let volume = u32::try_from(volume).unwrap_or(u32::MAX);
        Some(VPUTensor::new(1, 1, volume, 1, wl.inputs[0].dtype()))
    }

    /// Remove strategies this operation cannot run under.
    fn filter_isi_strategies(&self, base: &[IsiStrategy]) -> Vec<IsiStrategy> {
        base.to_vec()
    }

    /// Clamp the broadcast bound for this operation.
    fn filter_output_write_tiles(&self, device_max: u32) -> u32 {
        device_max
    }

    /// Tighten kernel dimensions when the strategy demands it. Returns
    /// true when the kernel was changed.
    fn normalize_kernel_dimension(&self, _strategy: IsiStrategy, _kernel: &mut [u32; 2]) -> bool {
        false
    }

    /// Clamp or disable sparsity the operation cannot use.
    fn limit_sparsity(&self, _wl: &mut DPUWorkload) {}

    /// Check that output dimensions follow from input, kernel, stride, and
    /// padding. Appends findings to `info` on failure.
    fn check_input_output_correlation(&self, wl: &DPUWorkload, info: &mut String) -> bool {
        check_kernel_geometry(wl, info) && check_spatial_correlation(wl, info)
    }

    /// Check the operation's sparsity rules. Appends findings on failure.
    fn check_sparsity(&self, wl: &DPUWorkload, info: &mut String) -> bool {
        check_rate_ranges(wl, info)
    }
}

/// Kernel, stride, and padding sanity shared by all sliding operations.
fn check_kernel_geometry(wl: &DPUWorkload, info: &mut String) -> bool {
    if wl.kernel[0] == 0 || wl.kernel[1] == 0 {
        let _ = write!(info, "kernel must be positive, got {}x{}", wl.kernel[0], wl.kernel[1]);
        return false;
    }
    if wl.stride[0] == 0 || wl.stride[1] == 0 {
        let _ = write!(info, "stride must be positive, got {}x{}", wl.stride[0], wl.stride[1]);
        return false;
    }
    // padding[top, bottom] bounded by kernel height, [left, right] by width
    let bounds = [wl.kernel[1], wl.kernel[1], wl.kernel[0], wl.kernel[0]];
    for (idx, (&pad, &kernel)) in wl.padding.iter().zip(bounds.iter()).enumerate() {
        if pad > kernel - 1 {
            let _ = write!(info, "padding[{idx}]={pad} exceeds kernel-1={}", kernel - 1);
            return false;
        }
    }
    true
}

/// `out = floor((in + pad_sum − kernel) / stride) + 1` in both dimensions.
fn check_spatial_correlation(wl: &DPUWorkload, info: &mut String) -> bool {
    let input = &wl.inputs[0];
    let output = &wl.outputs[0];

    let expected = |in_dim: u32, pads: u32, kernel: u32, stride: u32| -> Option<u32> {
        let padded = in_dim + pads;
        if padded < kernel {
            return None;
        }
        Some((padded - kernel) / stride + 1)
    };

    let expected_x = expected(
        input.x(),
        wl.padding[2] + wl.padding[3],
        wl.kernel[0],
        wl.stride[0],
    );
    let expected_y = expected(
        input.y(),
        wl.padding[0] + wl.padding[1],
        wl.kernel[1],
        wl.stride[1],
    );

    match (expected_x, expected_y) {
        (Some(x), Some(y)) if x == output.x() && y == output.y() => true,
        (Some(x), Some(y)) => {
            let _ = write!(
                info,
                "output {}x{} does not match derived {}x{}",
                output.x(),
                output.y(),
                x,
                y
            );
            false
        }
        _ => {
            let _ = write!(info, "kernel larger than padded input");
            false
        }
    }
}

fn check_rate_ranges(wl: &DPUWorkload, info: &mut String) -> bool {
    if !(0.0..=1.0).contains(&wl.input_sparsity_rate) {
        let _ = write!(info, "input sparsity rate {} outside [0,1]", wl.input_sparsity_rate);
        return false;
    }
    if wl.weight_sparsity_enabled && !(0.0..=1.0).contains(&wl.weight_sparsity_rate) {
        let _ = write!(info, "weight sparsity rate {} outside [0,1]", wl.weight_sparsity_rate);
        return false;
    }
    true
}

/// Dense convolution: weights are `kx·ky·ic·oc`.
struct ConvolutionConstraints;

impl OperationConstraints for ConvolutionConstraints {
    fn input_1_volume(&self, wl: &DPUWorkload) -> u64 {
        u64::from(wl.kernel[0])
            * u64::from(wl.kernel[1])
            * u64::from(wl.inputs[0].channels())
            * u64::from(wl.outputs[0].channels())
    }
}

/// Compressed convolution: same weight shape as dense convolution but the
/// input channel count is known to be small.
struct CmConvolutionConstraints;

impl OperationConstraints for CmConvolutionConstraints {
    fn input_1_volume(&self, wl: &DPUWorkload) -> u64 {
        ConvolutionConstraints.input_1_volume(wl)
    }
}

/// Depthwise convolution (and its AVEPOOL alias): weights are `kx·ky·oc`.
struct DwConvolutionConstraints;

impl OperationConstraints for DwConvolutionConstraints {
    fn input_1_volume(&self, wl: &DPUWorkload) -> u64 {
        u64::from(wl.kernel[0]) * u64::from(wl.kernel[1]) * u64::from(wl.outputs[0].channels())
    }
}

/// Max pooling: a weight-table-shaped allocation, no weight sparsity.
struct MaxPoolConstraints;

impl OperationConstraints for MaxPoolConstraints {
    fn input_1_volume(&self, wl: &DPUWorkload) -> u64 {
        DwConvolutionConstraints.input_1_volume(wl)
    }

    fn limit_sparsity(&self, wl: &mut DPUWorkload) {
        if wl.weight_sparsity_enabled {
            tracing::warn!("MAXPOOL cannot use weight sparsity, disabling");
            wl.weight_sparsity_enabled = false;
            wl.weight_sparsity_rate = 0.0;
        }
    }
}

/// Element-wise: no weights, kernel fixed at 1x1, no split-over-K.
struct EltwiseConstraints;

impl OperationConstraints for EltwiseConstraints {
    fn input_1_volume(&self, _wl: &DPUWorkload) -> u64 {
        0
    }

    fn filter_isi_strategies(&self, base: &[IsiStrategy]) -> Vec<IsiStrategy> {
        base.iter()
            .copied()
            .filter(|s| *s != IsiStrategy::SplitOverK)
            .collect()
    }

    fn filter_output_write_tiles(&self, _device_max: u32) -> u32 {
        // element-wise results are consumed locally, no broadcast
        1
    }

    fn limit_sparsity(&self, wl: &mut DPUWorkload) {
        if wl.weight_sparsity_enabled {
            tracing::warn!("ELTWISE has no weights, disabling weight sparsity");
            wl.weight_sparsity_enabled = false;
            wl.weight_sparsity_rate = 0.0;
        }
    }

    fn check_input_output_correlation(&self, wl: &DPUWorkload, info: &mut String) -> bool {
        if wl.kernel != [1, 1] {
            let _ = write!(info, "ELTWISE kernel must be 1x1, got {}x{}", wl.kernel[0], wl.kernel[1]);
            return false;
        }
        let input = &wl.inputs[0];
        let output = &wl.outputs[0];
        if input.x() != output.x() || input.y() != output.y() {
            let _ = write!(
                info,
                "ELTWISE requires equal spatial dims, in {}x{} out {}x{}",
                input.x(),
                input.y(),
                output.x(),
                output.y()
            );
            return false;
        }
        true
    }
}

/// The rejected placeholder operation.
struct InvalidConstraints;

impl OperationConstraints for InvalidConstraints {
    fn input_1_volume(&self, _wl: &DPUWorkload) -> u64 {
        0
    }

    fn check_input_output_correlation(&self, _wl: &DPUWorkload, info: &mut String) -> bool {
        let _ = write!(info, "INVALID operation has no constraints");
        false
    }
}

static CONVOLUTION: ConvolutionConstraints = ConvolutionConstraints;
static CM_CONVOLUTION: CmConvolutionConstraints = CmConvolutionConstraints;
static DW_CONVOLUTION: DwConvolutionConstraints = DwConvolutionConstraints;
static MAX_POOL: MaxPoolConstraints = MaxPoolConstraints;
static ELTWISE: EltwiseConstraints = EltwiseConstraints;
static INVALID: InvalidConstraints = InvalidConstraints;

/// Maps each operation to its constraint object.
pub struct OperationsBehavior;

impl OperationsBehavior {
    /// The constraint object for an operation.
    #[must_use]
    pub fn get(op: Operation) -> &'static dyn OperationConstraints {
        match op {
            Operation::Convolution => &CONVOLUTION,
            Operation::CmConvolution => &CM_CONVOLUTION,
            Operation::DwConvolution | Operation::AvePool => &DW_CONVOLUTION,
            Operation::MaxPool => &MAX_POOL,
            Operation::Eltwise => &ELTWISE,
            Operation::Invalid => &INVALID,
        }
    }
}
