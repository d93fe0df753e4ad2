//! Workload validation and sanitization.
//!
//! [`DpuSanitizer`] runs an ordered pipeline over a workload: normalization
//! rewrites first (semantics-preserving, logged), then device, memory,
//! correlation, sparsity, and mode checks. The pipeline stops at the first
//! failing condition, recording it in the [`SanityReport`].

mod constraints;
mod valid_values;

pub use constraints::{OperationConstraints, OperationsBehavior};
pub use valid_values::{config_for, DeviceValidValues};

use crate::cycles::{Cycles, SanityReport};
use crate::types::{DataType, DPUWorkload, Operation, VPUDevice};
use vpu_chip::memory;

/// The DPU workload sanitizer.
#[derive(Debug, Clone, Copy, Default)]
pub struct DpuSanitizer;

impl DpuSanitizer {
    /// A sanitizer over the built-in device tables.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Validate and normalize a workload in place.
    ///
    /// On success the workload may differ from the input (operation
    /// rewrites, channel alignment, datatype canonicalization) but keeps
    /// its semantics. On failure `report` carries the first-failing
    /// condition and the workload must not be used downstream.
    pub fn check_and_sanitize(&self, wl: &mut DPUWorkload, report: &mut SanityReport) {
        report.reset();

        self.rewrite_avgpool(wl);
        if !self.rewrite_compressed_conv(wl, report) {
            return;
        }
        self.align_channel_preserving(wl);

        let Some(config) = config_for(wl.device) else {
            report.report_error(
                Cycles::ERROR_INVALID_INPUT_CONFIGURATION,
                format!("device {} is not supported", wl.device),
            );
            return;
        };

        if wl.op == Operation::Invalid || !config.supports_operation(wl.op) {
            report.report_error(
                Cycles::ERROR_INVALID_INPUT_OPERATION,
                format!("operation {} not supported on {}", wl.op, wl.device),
            );
            return;
        }
        let behavior = OperationsBehavior::get(wl.op);

        let footprint = self.compute_cmx_footprint(wl);
        let capacity = u64::from(config.cmx_size_bytes());
        if footprint > capacity {
            report.report_error(
                Cycles::ERROR_INPUT_TOO_BIG,
                format!("workload needs {footprint} B of CMX, capacity is {capacity} B"),
            );
            return;
        }

        if behavior.normalize_kernel_dimension(wl.isi_strategy, &mut wl.kernel) {
            tracing::warn!("Kernel normalized to {}x{}", wl.kernel[0], wl.kernel[1]);
        }

        let mut info = String::new();
        if !behavior.check_input_output_correlation(wl, &mut info) {
            report.report_error(Cycles::ERROR_INVALID_INPUT_CONFIGURATION, info);
            return;
        }

        behavior.limit_sparsity(wl);
        if !self.check_device_sparsity(wl, &mut info) || !behavior.check_sparsity(wl, &mut info) {
            report.report_error(Cycles::ERROR_INVALID_INPUT_CONFIGURATION, info);
            return;
        }

        if !config.supports_execution_mode(wl.execution_mode) {
            report.report_error(
                Cycles::ERROR_INVALID_INPUT_CONFIGURATION,
                format!("execution mode {} invalid on {}", wl.execution_mode, wl.device),
            );
            return;
        }

        let owt_max = behavior.filter_output_write_tiles(config.output_write_tiles_max);
        if wl.output_write_tiles == 0 || wl.output_write_tiles > owt_max {
            report.report_error(
                Cycles::ERROR_INVALID_INPUT_CONFIGURATION,
                format!(
                    "output_write_tiles {} outside 1..={owt_max}",
                    wl.output_write_tiles
                ),
            );
            return;
        }
        let strategies = behavior.filter_isi_strategies(config.isi_strategies);
        if !strategies.contains(&wl.isi_strategy) {
            report.report_error(
                Cycles::ERROR_INVALID_INPUT_CONFIGURATION,
                format!("ISI strategy {} invalid for {} on {}", wl.isi_strategy, wl.op, wl.device),
            );
            return;
        }

        self.normalize_datatypes(wl);
    }

    /// AVEPOOL executes as a depthwise convolution on every generation.
    fn rewrite_avgpool(&self, wl: &mut DPUWorkload) {
        if wl.op == Operation::AvePool {
            tracing::warn!("Workload with AVEPOOL changed to DW_CONVOLUTION");
            wl.op = Operation::DwConvolution;
        }
    }

    /// On V27 and later, a convolution with 1 < input channels < 16 runs
    /// as a compressed convolution. A single input channel has no valid
    /// compressed form and is rejected.
    fn rewrite_compressed_conv(&self, wl: &mut DPUWorkload, report: &mut SanityReport) -> bool {
        if wl.device >= VPUDevice::V27 && wl.device != VPUDevice::Unknown
            && wl.op == Operation::Convolution
        {
            let ic = wl.inputs[0].channels();
            if ic == 1 {
                report.report_error(
                    Cycles::ERROR_INVALID_INPUT_CONFIGURATION,
                    "CONVOLUTION with a single input channel has no compressed form",
                );
                return false;
            }
            if ic < 16 {
                tracing::warn!("CONVOLUTION with compressed IC[2..15] transformed to CM_CONV");
                wl.op = Operation::CmConvolution;
            }
        }
        true
    }

    /// Channel-preserving operations cannot change the channel count;
    /// input channels are rewritten to match the output.
    fn align_channel_preserving(&self, wl: &mut DPUWorkload) {
        if wl.op.is_channel_preserving() {
            let out_channels = wl.outputs[0].channels();
            if wl.inputs[0].channels() != out_channels {
                tracing::warn!(
                    "Changed input channels from {} to {}",
                    wl.inputs[0].channels(),
                    out_channels
                );
                wl.inputs[0].set_channels(out_channels);
            }
        }
    }

    /// Weight sparsity acceleration does not exist before V27.
    fn check_device_sparsity(&self, wl: &DPUWorkload, info: &mut String) -> bool {
        if wl.weight_sparsity_enabled && wl.device < VPUDevice::V27 {
            info.push_str("weight sparsity is not available before V27");
            return false;
        }
        true
    }

    /// Int8 rides the UInt8 path; mixed float in/out canonicalizes to
    /// Float16.
    fn normalize_datatypes(&self, wl: &mut DPUWorkload) {
        for tensor in wl.inputs.iter_mut().chain(wl.outputs.iter_mut()) {
            if tensor.dtype() == DataType::Int8 {
                tracing::warn!("INT8 tensor normalized to UINT8");
                tensor.set_dtype(DataType::UInt8);
            }
        }
        let in_dtype = wl.inputs[0].dtype();
        let out_dtype = wl.outputs[0].dtype();
        if in_dtype.is_float() && out_dtype.is_float() && in_dtype != out_dtype {
            tracing::warn!("Mixed float datatypes canonicalized to FLOAT16");
            wl.inputs[0].set_dtype(DataType::Float16);
            wl.outputs[0].set_dtype(DataType::Float16);
        }
    }

    /// Aligned CMX byte footprint: activations, deduced weights, output.
    #[must_use]
    pub fn compute_cmx_footprint(&self, wl: &DPUWorkload) -> u64 {
        let behavior = OperationsBehavior::get(wl.op);
        memory::align_cmx(wl.device, wl.inputs[0].size())
            + behavior.input_1_aligned_size_bytes(wl)
            + memory::align_cmx(wl.device, wl.outputs[0].size())
    }
}
