//! Analytic estimators: ideal MAC counts, theoretical DPU cycles, DMA
//! transfer cycles, and software-kernel cycles.
//!
//! These are closed-form lower bounds, independent of the learned
//! predictor. The façade uses them as fallback and as the reference for
//! utilization and energy.

use crate::types::{DMAWorkload, DPUWorkload, MemoryLocation, Operation, SWOperation};
use vpu_chip::{dma, mac};

/// Mathematical maximum MAC operations for the workload: every output
/// element touched by every tap of the kernel.
#[must_use]
pub fn dense_mac_count(wl: &DPUWorkload) -> u64 {
    let out = &wl.outputs[0];
    let spatial = u64::from(out.x()) * u64::from(out.y()) * u64::from(out.batches());
    let oc = u64::from(out.channels());
    let ic = u64::from(wl.inputs[0].channels());
    let kernel = u64::from(wl.kernel[0]) * u64::from(wl.kernel[1]);

    match wl.op {
        Operation::Convolution | Operation::CmConvolution => spatial * oc * ic * kernel,
        // one MAC (or comparison) per tap per output element
        Operation::DwConvolution | Operation::AvePool | Operation::MaxPool => {
            spatial * oc * kernel
        }
        Operation::Eltwise => spatial * oc,
        Operation::Invalid => 0,
    }
}

/// MAC operations the hardware actually performs once the sparsity engines
/// skip zero weights and zero activations.
#[must_use]
pub fn sparse_mac_count(wl: &DPUWorkload) -> u64 {
    let mut macs = dense_mac_count(wl) as f64;
    if wl.weight_sparsity_enabled {
        macs *= f64::from(1.0 - wl.weight_sparsity_rate.clamp(0.0, 1.0));
    }
    if wl.inputs[0].sparsity_enabled() {
        macs *= f64::from(1.0 - wl.input_sparsity_rate.clamp(0.0, 1.0));
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    {
        macs.ceil() as u64
    }
}

fn cycles_for_macs(wl: &DPUWorkload, macs: u64, efficiency: f32) -> u64 {
    let units = mac::mac_units(wl.device, wl.execution_mode);
    if units == 0 || efficiency <= 0.0 {
        return 0;
    }
    let throughput = f64::from(units) * f64::from(efficiency);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    {
        (macs as f64 / throughput).ceil() as u64
    }
}

/// Analytic hardware lower bound: dense MACs over the sustained MAC rate.
#[must_use]
pub fn dpu_theoretical_cycles(wl: &DPUWorkload) -> u64 {
    cycles_for_macs(wl, dense_mac_count(wl), mac::pipeline_efficiency(wl.device))
}

/// Ideal cycles for power estimation: sparse-adjusted MACs at peak rate.
#[must_use]
pub fn dpu_power_ideal_cycles(wl: &DPUWorkload) -> u64 {
    cycles_for_macs(wl, sparse_mac_count(wl), 1.0)
}

/// Ideal cycles for efficiency estimation: dense MACs at peak rate.
/// Sparsity gives no credit here, so utilization against this reference can
/// exceed 1.
#[must_use]
pub fn dpu_efficiency_ideal_cycles(wl: &DPUWorkload) -> u64 {
    cycles_for_macs(wl, dense_mac_count(wl), 1.0)
}

/// Cycles for a DMA transfer: fixed source latency plus the payload over
/// the slower of the two endpoint bandwidths. Broadcasting multiplies the
/// payload only when the destination is CMX.
#[must_use]
pub fn dma_theoretical_cycles(wl: &DMAWorkload) -> u32 {
    let mut bytes = wl.input.size().max(wl.output.size());
    if wl.output_location == MemoryLocation::Cmx && wl.output_write_tiles > 1 {
        bytes *= u64::from(wl.output_write_tiles);
    }

    let bandwidth = dma::bandwidth_bytes_per_cycle(wl.device, wl.input_location)
        .min(dma::bandwidth_bytes_per_cycle(wl.device, wl.output_location));
    if bandwidth == 0 {
        return 0;
    }

    let latency = u64::from(dma::latency_cycles(wl.device, wl.input_location));
    let cycles = latency + bytes.div_ceil(u64::from(bandwidth));
    u32::try_from(cycles).unwrap_or(u32::MAX)
}

/// Cycles for a software kernel: output bytes over the kernel's sustained
/// throughput plus its startup latency.
#[must_use]
pub fn shave_theoretical_cycles(op: &SWOperation) -> u32 {
    let Some(output) = op.outputs.first() else {
        return 0;
    };
    if op.kernel_efficiency <= 0.0 {
        return 0;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let payload = (output.size() as f64 / f64::from(op.kernel_efficiency)).ceil() as u64;
    u32::try_from(payload + u64::from(op.latency)).unwrap_or(u32::MAX)
}
